use crate::coding::{Decode, DecodeError, Encode, EncodeError};

/// Sent by the subscriber to abandon an in-progress Fetch.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct FetchCancel {
    /// The request ID of the FETCH to cancel.
    pub id: u64,
}

impl Decode for FetchCancel {
    fn decode<R: bytes::Buf>(r: &mut R) -> Result<Self, DecodeError> {
        let id = u64::decode(r)?;
        Ok(Self { id })
    }
}

impl Encode for FetchCancel {
    fn encode<W: bytes::BufMut>(&self, w: &mut W) -> Result<(), EncodeError> {
        self.id.encode(w)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::BytesMut;

    #[test]
    fn encode_decode() {
        let mut buf = BytesMut::new();

        let msg = FetchCancel { id: 12345 };
        msg.encode(&mut buf).unwrap();
        assert_eq!(FetchCancel::decode(&mut buf).unwrap(), msg);
    }
}
