use bytes::Bytes;
use crate::compression::delta::DeltaEncoder;
use crate::compression::vbyte::VByteEncoder;
use crate::core::error::{Error, Result};
use crate::token::position::PositionSpec;
use crate::token::record::TokenRecord;

pub const HAS_PARENT: u32 = 1;
pub const HAS_POSITION_RANGE: u32 = 2;
pub const HAS_POSITION_SET: u32 = 4;
pub const HAS_OFFSET: u32 = 8;
pub const HAS_REALOFFSET: u32 = 16;
pub const HAS_PAYLOAD: u32 = 32;

const KNOWN_FLAGS: u32 =
    HAS_PARENT | HAS_POSITION_RANGE | HAS_POSITION_SET | HAS_OFFSET | HAS_REALOFFSET | HAS_PAYLOAD;

/// A decoded record whose term text has not been resolved yet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenEntry {
    pub id: u32,
    pub parent_id: Option<u32>,
    pub position: PositionSpec,
    pub offset: Option<(u32, u32)>,
    pub real_offset: Option<(u32, u32)>,
    pub payload: Option<Bytes>,
    pub term_ref: u64,
}

impl TokenEntry {
    pub fn into_record(self, value: String) -> TokenRecord {
        TokenRecord {
            id: self.id,
            parent_id: self.parent_id,
            position: self.position,
            offset: self.offset,
            real_offset: self.real_offset,
            payload: self.payload,
            value,
        }
    }
}

/// Binary layout of one token record:
///
/// ```text
/// id, flags, [parent_id], position, [offset], [real_offset], [payload], term_ref
/// ```
///
/// All integers are vbyte. Ranges and offsets are `(start, length)`; a
/// position set is `count, first, delta...` with every delta >= 1.
pub struct TokenCodec;

impl TokenCodec {
    pub fn encode(record: &TokenRecord, term_ref: u64) -> Result<Vec<u8>> {
        let mut output = Vec::with_capacity(16);
        Self::encode_into(&mut output, record, term_ref)?;
        Ok(output)
    }

    pub fn encode_into(output: &mut Vec<u8>, record: &TokenRecord, term_ref: u64) -> Result<()> {
        record.position.validate()?;

        let mut flags = 0;
        if record.parent_id.is_some() {
            flags |= HAS_PARENT;
        }
        match record.position {
            PositionSpec::Single(_) => {}
            PositionSpec::Range { .. } => flags |= HAS_POSITION_RANGE,
            PositionSpec::Set(_) => flags |= HAS_POSITION_SET,
        }
        if record.offset.is_some() {
            flags |= HAS_OFFSET;
        }
        if record.real_offset.is_some() {
            flags |= HAS_REALOFFSET;
        }
        if record.payload.is_some() {
            flags |= HAS_PAYLOAD;
        }

        VByteEncoder::encode_u32(output, record.id);
        VByteEncoder::encode_u32(output, flags);
        if let Some(parent_id) = record.parent_id {
            VByteEncoder::encode_u32(output, parent_id);
        }
        match &record.position {
            PositionSpec::Single(p) => VByteEncoder::encode_u32(output, *p as u32),
            PositionSpec::Range { start, end } => {
                VByteEncoder::encode_u32(output, *start as u32);
                VByteEncoder::encode_u32(output, (end - start) as u32);
            }
            PositionSpec::Set(positions) => DeltaEncoder::encode_increasing(output, positions)?,
        }
        if let Some(offset) = record.offset {
            Self::encode_offset(output, offset)?;
        }
        if let Some(real_offset) = record.real_offset {
            Self::encode_offset(output, real_offset)?;
        }
        if let Some(payload) = &record.payload {
            VByteEncoder::encode_u32(output, length_prefix(payload.len())?);
            output.extend_from_slice(payload);
        }
        VByteEncoder::encode_u64(output, term_ref);
        Ok(())
    }

    /// Length-prefixed form used inside the object store. The prefix is the
    /// record boundary the decoder enforces.
    pub fn encode_framed(output: &mut Vec<u8>, record: &TokenRecord, term_ref: u64) -> Result<()> {
        let body = Self::encode(record, term_ref)?;
        VByteEncoder::encode_u32(output, length_prefix(body.len())?);
        output.extend_from_slice(&body);
        Ok(())
    }

    fn encode_offset(output: &mut Vec<u8>, (start, end): (u32, u32)) -> Result<()> {
        if end < start {
            return Err(Error::invalid_argument(format!("Offset end {} before start {}", end, start)));
        }
        VByteEncoder::encode_u32(output, start);
        VByteEncoder::encode_u32(output, end - start);
        Ok(())
    }

    /// Decodes exactly one record body; leftover bytes are corruption.
    pub fn decode(body: &[u8]) -> Result<TokenEntry> {
        let mut reader = RecordReader { bytes: body, pos: 0 };

        let id = reader.read_u32()?;
        let flags = reader.read_u32()?;
        if flags & !KNOWN_FLAGS != 0 {
            return Err(Error::corrupt(format!("Unknown flag bits {:#x}", flags)));
        }
        if flags & HAS_POSITION_RANGE != 0 && flags & HAS_POSITION_SET != 0 {
            return Err(Error::corrupt("Both position range and position set flags set"));
        }

        let parent_id = if flags & HAS_PARENT != 0 { Some(reader.read_u32()?) } else { None };

        let position = if flags & HAS_POSITION_RANGE != 0 {
            let start = reader.read_position()?;
            let length = reader.read_u32()?;
            let end = start.checked_add_unsigned(length)
                .ok_or_else(|| Error::corrupt("Position range overflow"))?;
            PositionSpec::Range { start, end }
        } else if flags & HAS_POSITION_SET != 0 {
            let (positions, consumed) = DeltaEncoder::decode_increasing(reader.remaining())?;
            reader.pos += consumed;
            PositionSpec::Set(positions)
        } else {
            PositionSpec::Single(reader.read_position()?)
        };

        let offset = if flags & HAS_OFFSET != 0 { Some(reader.read_offset()?) } else { None };
        let real_offset = if flags & HAS_REALOFFSET != 0 { Some(reader.read_offset()?) } else { None };
        let payload = if flags & HAS_PAYLOAD != 0 {
            let length = reader.read_u32()? as usize;
            Some(Bytes::copy_from_slice(reader.read_bytes(length)?))
        } else {
            None
        };
        let term_ref = reader.read_u64()?;

        if reader.pos != body.len() {
            return Err(Error::corrupt(format!(
                "{} trailing bytes after record", body.len() - reader.pos
            )));
        }

        Ok(TokenEntry { id, parent_id, position, offset, real_offset, payload, term_ref })
    }

    /// Decodes a length-prefixed record at the start of `input`, returns
    /// (entry, bytes_consumed).
    pub fn decode_framed(input: &[u8]) -> Result<(TokenEntry, usize)> {
        let (length, prefix) = VByteEncoder::decode_u32(input)?;
        let end = prefix + length as usize;
        if end > input.len() {
            return Err(Error::corrupt(format!(
                "Record of {} bytes runs past the end of the store", length
            )));
        }
        Ok((Self::decode(&input[prefix..end])?, end))
    }
}

/// Bounded reader over one record body.
struct RecordReader<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> RecordReader<'a> {
    fn remaining(&self) -> &'a [u8] {
        &self.bytes[self.pos..]
    }

    fn read_u32(&mut self) -> Result<u32> {
        let (value, consumed) = VByteEncoder::decode_u32(self.remaining())
            .map_err(|e| Error::corrupt(format!("Record truncated: {}", e.context)))?;
        self.pos += consumed;
        Ok(value)
    }

    fn read_u64(&mut self) -> Result<u64> {
        let (value, consumed) = VByteEncoder::decode_u64(self.remaining())
            .map_err(|e| Error::corrupt(format!("Record truncated: {}", e.context)))?;
        self.pos += consumed;
        Ok(value)
    }

    fn read_position(&mut self) -> Result<i32> {
        let value = self.read_u32()?;
        i32::try_from(value).map_err(|_| Error::corrupt(format!("Position {} out of range", value)))
    }

    fn read_offset(&mut self) -> Result<(u32, u32)> {
        let start = self.read_u32()?;
        let length = self.read_u32()?;
        let end = start.checked_add(length).ok_or_else(|| Error::corrupt("Offset overflow"))?;
        Ok((start, end))
    }

    fn read_bytes(&mut self, length: usize) -> Result<&'a [u8]> {
        if length > self.bytes.len() - self.pos {
            return Err(Error::corrupt("Payload runs past the record boundary"));
        }
        let slice = &self.bytes[self.pos..self.pos + length];
        self.pos += length;
        Ok(slice)
    }
}

/// Length of a payload or record body as stored in its vbyte prefix.
fn length_prefix(len: usize) -> Result<u32> {
    u32::try_from(len).map_err(|_| Error::invalid_argument(format!("Length {} does not fit a u32 prefix", len)))
}
