use crate::coding::{Decode, DecodeError, Encode, EncodeError, KeyValuePairs, TrackNamespace};

/// Sent by a potential subscriber to learn the current status of a track
/// without subscribing to it.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct TrackStatusRequest {
    /// The request ID
    pub id: u64,

    /// Track properties
    pub track_namespace: TrackNamespace,
    pub track_name: String,

    /// Optional parameters
    pub params: KeyValuePairs,
}

impl Decode for TrackStatusRequest {
    fn decode<R: bytes::Buf>(r: &mut R) -> Result<Self, DecodeError> {
        let id = u64::decode(r)?;
        let track_namespace = TrackNamespace::decode(r)?;
        let track_name = String::decode(r)?;
        let params = KeyValuePairs::decode(r)?;

        Ok(Self {
            id,
            track_namespace,
            track_name,
            params,
        })
    }
}

impl Encode for TrackStatusRequest {
    fn encode<W: bytes::BufMut>(&self, w: &mut W) -> Result<(), EncodeError> {
        self.id.encode(w)?;
        self.track_namespace.encode(w)?;
        self.track_name.encode(w)?;
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

        let msg = TrackStatusRequest {
            id: 12345,
            track_namespace: TrackNamespace::from_utf8_path("test/path"),
            track_name: "videotrack".to_string(),
            params: Default::default(),
        };
        msg.encode(&mut buf).unwrap();
        assert_eq!(TrackStatusRequest::decode(&mut buf).unwrap(), msg);
    }
}
