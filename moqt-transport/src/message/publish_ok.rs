use crate::coding::{Decode, DecodeError, Encode, EncodeError, KeyValuePairs, Location};
use crate::message::{FilterType, GroupOrder};

/// Sent by the subscriber to accept a Publish, echoing the subscription
/// properties it wants applied.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct PublishOk {
    /// The request ID of the PUBLISH this message is replying to
    pub id: u64,

    /// Whether objects should be forwarded.
    pub forward: bool,

    /// Subscriber Priority
    pub subscriber_priority: u8,
    pub group_order: GroupOrder,

    /// Filter type
    pub filter_type: FilterType,

    /// The starting location. Only present for "AbsoluteStart" and "AbsoluteRange" filter types.
    pub start_location: Option<Location>,
    /// End group id, inclusive. Only present for the "AbsoluteRange" filter type.
    pub end_group_id: Option<u64>,

    /// Optional parameters
    pub params: KeyValuePairs,
}

impl Decode for PublishOk {
    fn decode<R: bytes::Buf>(r: &mut R) -> Result<Self, DecodeError> {
        let id = u64::decode(r)?;
        let forward = bool::decode(r)?;
        let subscriber_priority = u8::decode(r)?;
        let group_order = GroupOrder::decode(r)?;
        let filter_type = FilterType::decode(r)?;

        let start_location: Option<Location>;
        let end_group_id: Option<u64>;
        match filter_type {
            FilterType::AbsoluteStart => {
                start_location = Some(Location::decode(r)?);
                end_group_id = None;
            }
            FilterType::AbsoluteRange => {
                start_location = Some(Location::decode(r)?);
                end_group_id = Some(u64::decode(r)?);
            }
            _ => {
                start_location = None;
                end_group_id = None;
            }
        }

        let params = KeyValuePairs::decode(r)?;

        Ok(Self {
            id,
            forward,
            subscriber_priority,
            group_order,
            filter_type,
            start_location,
            end_group_id,
            params,
        })
    }
}

impl Encode for PublishOk {
    fn encode<W: bytes::BufMut>(&self, w: &mut W) -> Result<(), EncodeError> {
        self.id.encode(w)?;
        self.forward.encode(w)?;
        self.subscriber_priority.encode(w)?;
        self.group_order.encode(w)?;
        self.filter_type.encode(w)?;

        match self.filter_type {
            FilterType::AbsoluteStart => match &self.start_location {
                Some(start) => start.encode(w)?,
                None => return Err(EncodeError::MissingField("StartLocation".to_string())),
            },
            FilterType::AbsoluteRange => {
                match &self.start_location {
                    Some(start) => start.encode(w)?,
                    None => return Err(EncodeError::MissingField("StartLocation".to_string())),
                }
                match self.end_group_id {
                    Some(end_group) => end_group.encode(w)?,
                    None => return Err(EncodeError::MissingField("EndGroupId".to_string())),
                }
            }
            _ => {}
        }

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

        let msg = PublishOk {
            id: 12345,
            forward: true,
            subscriber_priority: 127,
            group_order: GroupOrder::Publisher,
            filter_type: FilterType::LatestGroup,
            start_location: None,
            end_group_id: None,
            params: Default::default(),
        };
        msg.encode(&mut buf).unwrap();
        assert_eq!(PublishOk::decode(&mut buf).unwrap(), msg);

        let msg = PublishOk {
            filter_type: FilterType::AbsoluteRange,
            start_location: Some(Location::new(5, 0)),
            end_group_id: Some(6),
            ..msg
        };
        msg.encode(&mut buf).unwrap();
        assert_eq!(PublishOk::decode(&mut buf).unwrap(), msg);
    }
}
