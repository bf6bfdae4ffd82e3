use std::fs;
use std::path::Path;
use std::sync::Arc;
use bytes::Bytes;
use tracing::debug;
use crate::compression::vbyte::VByteEncoder;
use crate::core::error::{Error, Result};
use crate::mmap::MmapFile;

/// Immutable random-access byte store.
pub enum StoreBytes {
    Owned(Bytes),
    Mapped(MmapFile),
}

impl StoreBytes {
    /// Opens a store file, mapped or read into memory. Empty files are never
    /// mapped.
    pub fn open<P: AsRef<Path>>(path: P, use_mmap: bool) -> Result<Self> {
        let path = path.as_ref();
        let len = fs::metadata(path)?.len();

        let store = if use_mmap && len > 0 {
            StoreBytes::Mapped(MmapFile::open_read_only(path)?)
        } else {
            StoreBytes::Owned(Bytes::from(fs::read(path)?))
        };
        debug!(path = %path.display(), len, mapped = store.is_mapped(), "opened store");
        Ok(store)
    }

    pub fn as_slice(&self) -> &[u8] {
        match self {
            StoreBytes::Owned(bytes) => bytes,
            StoreBytes::Mapped(file) => file.data(),
        }
    }

    pub fn len(&self) -> usize {
        self.as_slice().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn is_mapped(&self) -> bool {
        matches!(self, StoreBytes::Mapped(_))
    }
}

impl From<Vec<u8>> for StoreBytes {
    fn from(bytes: Vec<u8>) -> Self {
        StoreBytes::Owned(Bytes::from(bytes))
    }
}

/// Independent seek cursor over a shared store. Each iterator owns its own.
pub struct StoreCursor {
    store: Arc<StoreBytes>,
    pos: usize,
}

impl StoreCursor {
    pub fn new(store: Arc<StoreBytes>) -> Self {
        StoreCursor { store, pos: 0 }
    }

    pub fn seek(&mut self, offset: u64) -> Result<()> {
        let offset = usize::try_from(offset)
            .map_err(|_| Error::corrupt(format!("Offset {} out of range", offset)))?;
        if offset > self.store.len() {
            return Err(Error::corrupt(format!(
                "Seek to {} past end of store ({} bytes)", offset, self.store.len()
            )));
        }
        self.pos = offset;
        Ok(())
    }

    pub fn position(&self) -> u64 {
        self.pos as u64
    }

    /// Bytes from the current position to the end of the store.
    pub fn remaining(&self) -> &[u8] {
        &self.store.as_slice()[self.pos..]
    }

    pub fn advance(&mut self, n: usize) -> Result<()> {
        if n > self.store.len() - self.pos {
            return Err(Error::corrupt("Read past end of store"));
        }
        self.pos += n;
        Ok(())
    }

    pub fn read_vu32(&mut self) -> Result<u32> {
        let (value, consumed) = VByteEncoder::decode_u32(self.remaining())?;
        self.pos += consumed;
        Ok(value)
    }

    pub fn read_vu64(&mut self) -> Result<u64> {
        let (value, consumed) = VByteEncoder::decode_u64(self.remaining())?;
        self.pos += consumed;
        Ok(value)
    }

    pub fn read_bytes(&mut self, n: usize) -> Result<&[u8]> {
        let start = self.pos;
        self.advance(n)?;
        Ok(&self.store.as_slice()[start..start + n])
    }
}
