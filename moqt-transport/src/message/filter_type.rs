use crate::coding::{Decode, DecodeError, Encode, EncodeError};

/// Governs where a subscription starts and stops delivering objects.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum FilterType {
    /// Start at the first object of the group after the largest currently produced.
    LatestGroup = 0x1,
    /// Start at the object after the largest currently produced.
    LatestObject = 0x2,
    /// Start at a caller-specified location.
    AbsoluteStart = 0x3,
    /// Start and stop at caller-specified locations.
    AbsoluteRange = 0x4,
}

impl Encode for FilterType {
    fn encode<W: bytes::BufMut>(&self, w: &mut W) -> Result<(), EncodeError> {
        (*self as u64).encode(w)
    }
}

impl Decode for FilterType {
    fn decode<R: bytes::Buf>(r: &mut R) -> Result<Self, DecodeError> {
        match u64::decode(r)? {
            0x1 => Ok(Self::LatestGroup),
            0x2 => Ok(Self::LatestObject),
            0x3 => Ok(Self::AbsoluteStart),
            0x4 => Ok(Self::AbsoluteRange),
            _ => Err(DecodeError::InvalidFilterType),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::{Bytes, BytesMut};

    #[test]
    fn encode_decode() {
        for (ft, val) in [
            (FilterType::LatestGroup, 0x01),
            (FilterType::LatestObject, 0x02),
            (FilterType::AbsoluteStart, 0x03),
            (FilterType::AbsoluteRange, 0x04),
        ] {
            let mut buf = BytesMut::new();
            ft.encode(&mut buf).unwrap();
            assert_eq!(buf.to_vec(), vec![val]);
            assert_eq!(FilterType::decode(&mut buf).unwrap(), ft);
        }
    }

    #[test]
    fn decode_bad_value() {
        let mut buf: Bytes = vec![0x05].into();
        assert!(matches!(
            FilterType::decode(&mut buf),
            Err(DecodeError::InvalidFilterType)
        ));
    }
}
