use crate::coding::{Decode, DecodeError, Encode, EncodeError, ReasonPhrase};

/// Sent by the publisher when a subscription has ended on its side.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct SubscribeDone {
    /// The request ID of the SUBSCRIBE that is done.
    pub id: u64,

    /// Why the subscription ended.
    pub status_code: u64,

    /// The number of data streams the publisher opened for this subscription,
    /// so the subscriber knows when it has drained them all.
    pub stream_count: u64,

    pub reason_phrase: ReasonPhrase,
}

impl Decode for SubscribeDone {
    fn decode<R: bytes::Buf>(r: &mut R) -> Result<Self, DecodeError> {
        let id = u64::decode(r)?;
        let status_code = u64::decode(r)?;
        let stream_count = u64::decode(r)?;
        let reason_phrase = ReasonPhrase::decode(r)?;

        Ok(Self {
            id,
            status_code,
            stream_count,
            reason_phrase,
        })
    }
}

impl Encode for SubscribeDone {
    fn encode<W: bytes::BufMut>(&self, w: &mut W) -> Result<(), EncodeError> {
        self.id.encode(w)?;
        self.status_code.encode(w)?;
        self.stream_count.encode(w)?;
        self.reason_phrase.encode(w)?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::BytesMut;

    #[test]
    fn encode_decode() {
        let mut buf = BytesMut::new();

        let msg = SubscribeDone {
            id: 12345,
            status_code: 0x0,
            stream_count: 7,
            reason_phrase: ReasonPhrase("track ended".to_string()),
        };
        msg.encode(&mut buf).unwrap();
        assert_eq!(SubscribeDone::decode(&mut buf).unwrap(), msg);
    }
}
