use crate::coding::{Decode, DecodeError, Encode, EncodeError};

/// Fetch variants.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum FetchType {
    /// A standalone fetch of a caller-specified range.
    Standalone = 0x1,
    /// Joins an existing subscription, starting a number of groups back.
    RelativeJoining = 0x2,
    /// Joins an existing subscription, starting at an absolute group.
    AbsoluteJoining = 0x3,
}

impl Encode for FetchType {
    fn encode<W: bytes::BufMut>(&self, w: &mut W) -> Result<(), EncodeError> {
        (*self as u64).encode(w)
    }
}

impl Decode for FetchType {
    fn decode<R: bytes::Buf>(r: &mut R) -> Result<Self, DecodeError> {
        match u64::decode(r)? {
            0x1 => Ok(Self::Standalone),
            0x2 => Ok(Self::RelativeJoining),
            0x3 => Ok(Self::AbsoluteJoining),
            _ => Err(DecodeError::InvalidFetchType),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::{Bytes, BytesMut};

    #[test]
    fn encode_decode() {
        for ft in [
            FetchType::Standalone,
            FetchType::RelativeJoining,
            FetchType::AbsoluteJoining,
        ] {
            let mut buf = BytesMut::new();
            ft.encode(&mut buf).unwrap();
            assert_eq!(FetchType::decode(&mut buf).unwrap(), ft);
        }
    }

    #[test]
    fn decode_bad_value() {
        let mut buf: Bytes = vec![0x04].into();
        assert!(matches!(
            FetchType::decode(&mut buf),
            Err(DecodeError::InvalidFetchType)
        ));
    }
}
