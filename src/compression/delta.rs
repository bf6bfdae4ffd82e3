use crate::compression::vbyte::VByteEncoder;
use crate::core::error::{Error, Result};

/// Delta encoding for strictly increasing integer sets
pub struct DeltaEncoder;

impl DeltaEncoder {
    /// Writes `count`, the first value absolute, then one delta (>= 1) per
    /// following value. Values must be non-negative and strictly increasing.
    pub fn encode_increasing(output: &mut Vec<u8>, values: &[i32]) -> Result<()> {
        VByteEncoder::encode_u32(output, values.len() as u32);

        let mut previous: Option<i32> = None;
        for &value in values {
            let delta = match previous {
                None if value < 0 => {
                    return Err(Error::invalid_argument(format!("Negative position {}", value)));
                }
                None => value as u32,
                Some(prev) if value <= prev => {
                    return Err(Error::invalid_argument(format!(
                        "Position set not strictly increasing at {}", value
                    )));
                }
                Some(prev) => (value - prev) as u32,
            };
            VByteEncoder::encode_u32(output, delta);
            previous = Some(value);
        }
        Ok(())
    }

    /// Inverse of [`encode_increasing`](Self::encode_increasing), returns
    /// (values, bytes_consumed). A zero delta or a value past `i32::MAX`
    /// marks the record as corrupt.
    pub fn decode_increasing(input: &[u8]) -> Result<(Vec<i32>, usize)> {
        let (count, mut pos) = VByteEncoder::decode_u32(input)?;
        if count == 0 {
            return Err(Error::corrupt("Empty position set"));
        }
        // Every entry takes at least one byte; refuse counts the input cannot hold.
        if count as usize > input.len() - pos {
            return Err(Error::corrupt(format!("Position set of {} entries overruns record", count)));
        }

        let mut values = Vec::with_capacity(count as usize);
        let mut current: i64 = 0;
        for i in 0..count {
            let (delta, consumed) = VByteEncoder::decode_u32(&input[pos..])?;
            pos += consumed;
            if i > 0 && delta == 0 {
                return Err(Error::corrupt("Non-increasing delta in position set"));
            }
            current += delta as i64;
            if current > i32::MAX as i64 {
                return Err(Error::corrupt("Position overflow in position set"));
            }
            values.push(current as i32);
        }

        Ok((values, pos))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn increasing_set_is_delta_coded() {
        let mut out = Vec::new();
        DeltaEncoder::encode_increasing(&mut out, &[3, 4, 10]).unwrap();
        assert_eq!(out, vec![3, 3, 1, 6]);
        assert_eq!(DeltaEncoder::decode_increasing(&out).unwrap(), (vec![3, 4, 10], 4));
    }

    #[test]
    fn zero_delta_is_corrupt() {
        let err = DeltaEncoder::decode_increasing(&[2, 5, 0]).unwrap_err();
        assert!(err.is_corrupt());
    }

    #[test]
    fn first_position_may_be_zero() {
        let mut out = Vec::new();
        DeltaEncoder::encode_increasing(&mut out, &[0, 2]).unwrap();
        assert_eq!(DeltaEncoder::decode_increasing(&out).unwrap().0, vec![0, 2]);
    }

    #[test]
    fn unsorted_input_is_rejected_on_encode() {
        let mut out = Vec::new();
        assert!(DeltaEncoder::encode_increasing(&mut out, &[5, 5]).is_err());
        assert!(DeltaEncoder::encode_increasing(&mut out, &[-1]).is_err());
    }

    #[test]
    fn count_larger_than_input_is_corrupt() {
        assert!(DeltaEncoder::decode_increasing(&[9, 1]).unwrap_err().is_corrupt());
    }
}
