use crate::coding::{Decode, DecodeError, Encode, EncodeError};

/// Status of an object as reported by the publisher.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ObjectStatus {
    Available = 0x0,
    DoesNotExist = 0x1,
    EndOfGroup = 0x3,
    EndOfTrack = 0x4,
    EndOfSubgroup = 0x5,
}

impl Decode for ObjectStatus {
    fn decode<B: bytes::Buf>(r: &mut B) -> Result<Self, DecodeError> {
        match u64::decode(r)? {
            0x0 => Ok(Self::Available),
            0x1 => Ok(Self::DoesNotExist),
            0x3 => Ok(Self::EndOfGroup),
            0x4 => Ok(Self::EndOfTrack),
            0x5 => Ok(Self::EndOfSubgroup),
            _ => Err(DecodeError::InvalidObjectStatus),
        }
    }
}

impl Encode for ObjectStatus {
    fn encode<W: bytes::BufMut>(&self, w: &mut W) -> Result<(), EncodeError> {
        (*self as u64).encode(w)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::{Bytes, BytesMut};

    #[test]
    fn encode_decode() {
        for status in [
            ObjectStatus::Available,
            ObjectStatus::DoesNotExist,
            ObjectStatus::EndOfGroup,
            ObjectStatus::EndOfTrack,
            ObjectStatus::EndOfSubgroup,
        ] {
            let mut buf = BytesMut::new();
            status.encode(&mut buf).unwrap();
            assert_eq!(ObjectStatus::decode(&mut buf).unwrap(), status);
        }
    }

    #[test]
    fn decode_bad_value() {
        let mut buf: Bytes = vec![0x02].into();
        assert!(matches!(
            ObjectStatus::decode(&mut buf).unwrap_err(),
            DecodeError::InvalidObjectStatus
        ));
    }
}
