use crate::coding::{Decode, DecodeError, Encode, EncodeError, KeyValuePairs, Location};

/// Sent by the subscriber to narrow or re-prioritize an active Subscribe.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct SubscribeUpdate {
    /// The request ID of the SUBSCRIBE this message is updating.
    pub id: u64,

    /// The starting location
    pub start_location: Location,
    /// The end Group ID, plus 1. A value of 0 means the subscription is open-ended.
    pub end_group_id: u64,

    /// Subscriber Priority
    pub subscriber_priority: u8,

    /// Forward Flag
    pub forward: bool,

    /// Optional parameters
    pub params: KeyValuePairs,
}

impl Decode for SubscribeUpdate {
    fn decode<R: bytes::Buf>(r: &mut R) -> Result<Self, DecodeError> {
        let id = u64::decode(r)?;
        let start_location = Location::decode(r)?;
        let end_group_id = u64::decode(r)?;
        let subscriber_priority = u8::decode(r)?;
        let forward = bool::decode(r)?;
        let params = KeyValuePairs::decode(r)?;

        Ok(Self {
            id,
            start_location,
            end_group_id,
            subscriber_priority,
            forward,
            params,
        })
    }
}

impl Encode for SubscribeUpdate {
    fn encode<W: bytes::BufMut>(&self, w: &mut W) -> Result<(), EncodeError> {
        self.id.encode(w)?;
        self.start_location.encode(w)?;
        self.end_group_id.encode(w)?;
        self.subscriber_priority.encode(w)?;
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

        let mut kvps = KeyValuePairs::new();
        kvps.set_intvalue(124, 456);

        let msg = SubscribeUpdate {
            id: 12345,
            start_location: Location::new(5, 0),
            end_group_id: 0,
            subscriber_priority: 64,
            forward: true,
            params: kvps,
        };
        msg.encode(&mut buf).unwrap();
        assert_eq!(SubscribeUpdate::decode(&mut buf).unwrap(), msg);
    }
}
