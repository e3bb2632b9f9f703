use crate::coding::{
    Decode, DecodeError, Encode, EncodeError, KeyValuePairs, Location, TrackNamespace,
};
use crate::message::GroupOrder;

/// Sent by the publisher to push a track to the subscriber without waiting
/// for a SUBSCRIBE.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Publish {
    /// The request ID
    pub id: u64,

    /// Track properties
    pub track_namespace: TrackNamespace,
    pub track_name: String,

    /// The identifier that objects for this track will use.
    pub track_alias: u64,

    /// Order groups will be delivered in
    pub group_order: GroupOrder,

    /// The largest location produced so far, if any content exists.
    pub largest_location: Option<Location>,

    /// Whether objects should be forwarded immediately.
    pub forward: bool,

    /// Optional parameters
    pub params: KeyValuePairs,
}

impl Decode for Publish {
    fn decode<R: bytes::Buf>(r: &mut R) -> Result<Self, DecodeError> {
        let id = u64::decode(r)?;
        let track_namespace = TrackNamespace::decode(r)?;
        let track_name = String::decode(r)?;
        let track_alias = u64::decode(r)?;
        let group_order = GroupOrder::decode(r)?;
        let content_exists = bool::decode(r)?;
        let largest_location = match content_exists {
            true => Some(Location::decode(r)?),
            false => None,
        };
        let forward = bool::decode(r)?;
        let params = KeyValuePairs::decode(r)?;

        Ok(Self {
            id,
            track_namespace,
            track_name,
            track_alias,
            group_order,
            largest_location,
            forward,
            params,
        })
    }
}

impl Encode for Publish {
    fn encode<W: bytes::BufMut>(&self, w: &mut W) -> Result<(), EncodeError> {
        self.id.encode(w)?;
        self.track_namespace.encode(w)?;
        self.track_name.encode(w)?;
        self.track_alias.encode(w)?;
        self.group_order.encode(w)?;
        self.largest_location.is_some().encode(w)?;
        if let Some(largest) = &self.largest_location {
            largest.encode(w)?;
        }
        self.forward.encode(w)?;
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

        let msg = Publish {
            id: 12345,
            track_namespace: TrackNamespace::from_utf8_path("test/path"),
            track_name: "videotrack".to_string(),
            track_alias: 100,
            group_order: GroupOrder::Ascending,
            largest_location: Some(Location::new(10, 2)),
            forward: true,
            params: Default::default(),
        };
        msg.encode(&mut buf).unwrap();
        assert_eq!(Publish::decode(&mut buf).unwrap(), msg);

        let msg = Publish {
            largest_location: None,
            ..msg
        };
        msg.encode(&mut buf).unwrap();
        assert_eq!(Publish::decode(&mut buf).unwrap(), msg);
    }
}
