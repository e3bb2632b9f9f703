use crate::coding::{Decode, DecodeError, Encode, EncodeError};

/// Sent by the subscriber to ask the publisher to start a new group, e.g. to
/// force a fresh sync point on a media track.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct NewGroupRequest {
    /// The request ID of the SUBSCRIBE this request applies to.
    pub id: u64,

    /// The track alias of the subscribed track.
    pub track_alias: u64,
}

impl Decode for NewGroupRequest {
    fn decode<R: bytes::Buf>(r: &mut R) -> Result<Self, DecodeError> {
        let id = u64::decode(r)?;
        let track_alias = u64::decode(r)?;

        Ok(Self { id, track_alias })
    }
}

impl Encode for NewGroupRequest {
    fn encode<W: bytes::BufMut>(&self, w: &mut W) -> Result<(), EncodeError> {
        self.id.encode(w)?;
        self.track_alias.encode(w)?;

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

        let msg = NewGroupRequest {
            id: 12345,
            track_alias: 100,
        };
        msg.encode(&mut buf).unwrap();
        assert_eq!(NewGroupRequest::decode(&mut buf).unwrap(), msg);
    }
}
