use crate::coding::{Decode, DecodeError, Encode, EncodeError};

/// Sent by the publisher to accept a SubscribeAnnounces.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct SubscribeAnnouncesOk {
    /// The request ID of the SUBSCRIBE_ANNOUNCES this message is replying to.
    pub id: u64,
}

impl Decode for SubscribeAnnouncesOk {
    fn decode<R: bytes::Buf>(r: &mut R) -> Result<Self, DecodeError> {
        let id = u64::decode(r)?;
        Ok(Self { id })
    }
}

impl Encode for SubscribeAnnouncesOk {
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

        let msg = SubscribeAnnouncesOk { id: 12345 };
        msg.encode(&mut buf).unwrap();
        assert_eq!(SubscribeAnnouncesOk::decode(&mut buf).unwrap(), msg);
    }
}
