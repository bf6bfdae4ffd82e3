use crate::core::error::{Error, Result};

/// Variable byte encoding for unsigned integers (best for small integers)
pub struct VByteEncoder;

impl VByteEncoder {
    /// Encode single u32 value
    /// Values < 128 use 1 byte, < 16384 use 2 bytes, etc.
    pub fn encode_u32(output: &mut Vec<u8>, value: u32) {
        Self::encode_u64(output, value as u64);
    }

    pub fn encode_u64(output: &mut Vec<u8>, mut value: u64) {
        while value >= 128 {
            output.push((value & 127) as u8 | 128);  // Set continuation bit
            value >>= 7;
        }
        output.push(value as u8);  // Last byte without continuation bit
    }

    /// Number of bytes `value` occupies once encoded
    pub fn encoded_len(mut value: u64) -> usize {
        let mut len = 1;
        while value >= 128 {
            value >>= 7;
            len += 1;
        }
        len
    }

    /// Decode single u32 value, returns (value, bytes_consumed)
    pub fn decode_u32(input: &[u8]) -> Result<(u32, usize)> {
        let (value, consumed) = Self::decode_with_limit(input, 5)?;
        let value = u32::try_from(value)
            .map_err(|_| Error::corrupt("VByte overflow for u32"))?;
        Ok((value, consumed))
    }

    /// Decode single u64 value, returns (value, bytes_consumed)
    pub fn decode_u64(input: &[u8]) -> Result<(u64, usize)> {
        Self::decode_with_limit(input, 10)
    }

    fn decode_with_limit(input: &[u8], max_bytes: usize) -> Result<(u64, usize)> {
        let mut value = 0u64;
        let mut shift = 0u32;

        for (i, &byte) in input.iter().enumerate() {
            if i == max_bytes {
                return Err(Error::corrupt("VByte overflow"));
            }
            let chunk = (byte & 127) as u64;
            if shift == 63 && chunk > 1 {
                return Err(Error::corrupt("VByte overflow"));
            }
            value |= chunk << shift;

            if byte & 128 == 0 {  // No continuation bit
                return Ok((value, i + 1));
            }
            shift += 7;
        }

        Err(Error::corrupt("Incomplete VByte"))
    }

    /// Encode array of u32 values
    pub fn encode_u32_list(nums: &[u32]) -> Vec<u8> {
        let mut output = Vec::new();
        for &num in nums {
            Self::encode_u32(&mut output, num);
        }
        output
    }

    /// Decode array of u32 values
    pub fn decode_u32_list(data: &[u8]) -> Result<Vec<u32>> {
        let mut nums = Vec::new();
        let mut pos = 0;

        while pos < data.len() {
            let (value, consumed) = Self::decode_u32(&data[pos..])?;
            nums.push(value);
            pos += consumed;
        }

        Ok(nums)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn small_values_take_one_byte() {
        let mut out = Vec::new();
        VByteEncoder::encode_u32(&mut out, 127);
        assert_eq!(out, vec![127]);
        assert_eq!(VByteEncoder::encoded_len(127), 1);
        assert_eq!(VByteEncoder::encoded_len(128), 2);
    }

    #[test]
    fn list_decodes_back() {
        let nums = vec![0, 1, 300, 16_384, u32::MAX];
        let bytes = VByteEncoder::encode_u32_list(&nums);
        assert_eq!(VByteEncoder::decode_u32_list(&bytes).unwrap(), nums);
    }

    #[test]
    fn u64_extremes() {
        let mut out = Vec::new();
        VByteEncoder::encode_u64(&mut out, u64::MAX);
        assert_eq!(out.len(), 10);
        assert_eq!(VByteEncoder::decode_u64(&out).unwrap(), (u64::MAX, 10));
    }

    #[test]
    fn truncated_input_is_corrupt() {
        let err = VByteEncoder::decode_u32(&[0x80, 0x80]).unwrap_err();
        assert!(err.is_corrupt());
    }

    #[test]
    fn u64_value_does_not_fit_u32() {
        let mut out = Vec::new();
        VByteEncoder::encode_u64(&mut out, u32::MAX as u64 + 1);
        assert!(VByteEncoder::decode_u32(&out).unwrap_err().is_corrupt());
    }

    #[test]
    fn overlong_u64_is_rejected() {
        let bytes = [0xFF; 11];
        assert!(VByteEncoder::decode_u64(&bytes).unwrap_err().is_corrupt());
    }
}
