use crate::coding::{Decode, DecodeError, Encode, EncodeError, KeyValuePairs, TrackNamespace};

/// Sent by the subscriber to be notified of announces matching a namespace prefix.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct SubscribeAnnounces {
    /// The request ID
    pub id: u64,

    /// The namespace prefix to match against announced namespaces.
    pub track_namespace_prefix: TrackNamespace,

    /// Optional parameters
    pub params: KeyValuePairs,
}

impl Decode for SubscribeAnnounces {
    fn decode<R: bytes::Buf>(r: &mut R) -> Result<Self, DecodeError> {
        let id = u64::decode(r)?;
        let track_namespace_prefix = TrackNamespace::decode(r)?;
        let params = KeyValuePairs::decode(r)?;

        Ok(Self {
            id,
            track_namespace_prefix,
            params,
        })
    }
}

impl Encode for SubscribeAnnounces {
    fn encode<W: bytes::BufMut>(&self, w: &mut W) -> Result<(), EncodeError> {
        self.id.encode(w)?;
        self.track_namespace_prefix.encode(w)?;
        self.params.encode(w)?;

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

        let msg = SubscribeAnnounces {
            id: 12345,
            track_namespace_prefix: TrackNamespace::from_utf8_path("example/chat555"),
            params: Default::default(),
        };
        msg.encode(&mut buf).unwrap();
        assert_eq!(SubscribeAnnounces::decode(&mut buf).unwrap(), msg);
    }
}
