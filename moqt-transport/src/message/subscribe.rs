use crate::coding::{
    Decode, DecodeError, Encode, EncodeError, KeyValuePairs, Location, TrackNamespace,
};
use crate::message::{FilterType, GroupOrder};

/// Sent by the subscriber to request all matching objects for a track.
///
/// Objects are delivered under the provided track alias instead of the full
/// track name, to save bytes.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Subscribe {
    /// The subscription request ID
    pub id: u64,

    /// The identifier that objects for this track will use in Subgroups or Datagrams.
    pub track_alias: u64,

    /// Track properties
    pub track_namespace: TrackNamespace,
    pub track_name: String,

    /// Subscriber Priority
    pub subscriber_priority: u8,
    pub group_order: GroupOrder,

    /// Forward Flag
    pub forward: bool,

    /// Filter type
    pub filter_type: FilterType,

    /// The starting location. Only present for "AbsoluteStart" and "AbsoluteRange" filter types.
    pub start_location: Option<Location>,
    /// End group id, inclusive. Only present for the "AbsoluteRange" filter type.
    pub end_group_id: Option<u64>,
    /// End object id within the end group, inclusive. Absent means the entire end group.
    /// Only present for the "AbsoluteRange" filter type.
    pub end_object_id: Option<u64>,

    /// Optional parameters
    pub params: KeyValuePairs,
}

impl Subscribe {
    /// Post-decode validation: a range must not end before it starts.
    pub fn validate(&self) -> Result<(), DecodeError> {
        if self.filter_type != FilterType::AbsoluteRange {
            return Ok(());
        }

        let start = self
            .start_location
            .ok_or_else(|| DecodeError::InvalidContents("missing start location".to_string()))?;
        let end_group = self
            .end_group_id
            .ok_or_else(|| DecodeError::InvalidContents("missing end group".to_string()))?;

        if end_group < start.group_id {
            return Err(DecodeError::InvalidContents(
                "subscribe range ends before it starts".to_string(),
            ));
        }
        if let Some(end_object) = self.end_object_id {
            if end_group == start.group_id && end_object < start.object_id {
                return Err(DecodeError::InvalidContents(
                    "subscribe range ends before it starts".to_string(),
                ));
            }
        }

        Ok(())
    }
}

impl Decode for Subscribe {
    fn decode<R: bytes::Buf>(r: &mut R) -> Result<Self, DecodeError> {
        let id = u64::decode(r)?;
        let track_alias = u64::decode(r)?;

        let track_namespace = TrackNamespace::decode(r)?;
        let track_name = String::decode(r)?;

        let subscriber_priority = u8::decode(r)?;
        let group_order = GroupOrder::decode(r)?;

        let forward = bool::decode(r)?;

        let filter_type = FilterType::decode(r)?;
        let start_location: Option<Location>;
        let end_group_id: Option<u64>;
        let end_object_id: Option<u64>;
        match filter_type {
            FilterType::AbsoluteStart => {
                start_location = Some(Location::decode(r)?);
                end_group_id = None;
                end_object_id = None;
            }
            FilterType::AbsoluteRange => {
                start_location = Some(Location::decode(r)?);
                end_group_id = Some(u64::decode(r)?);
                // On the wire 0 means "the entire end group", otherwise id + 1.
                end_object_id = match u64::decode(r)? {
                    0 => None,
                    n => Some(n - 1),
                };
            }
            _ => {
                start_location = None;
                end_group_id = None;
                end_object_id = None;
            }
        }

        let params = KeyValuePairs::decode(r)?;

        Ok(Self {
            id,
            track_alias,
            track_namespace,
            track_name,
            subscriber_priority,
            group_order,
            forward,
            filter_type,
            start_location,
            end_group_id,
            end_object_id,
            params,
        })
    }
}

impl Encode for Subscribe {
    fn encode<W: bytes::BufMut>(&self, w: &mut W) -> Result<(), EncodeError> {
        self.id.encode(w)?;
        self.track_alias.encode(w)?;

        self.track_namespace.encode(w)?;
        self.track_name.encode(w)?;

        self.subscriber_priority.encode(w)?;
        self.group_order.encode(w)?;

        self.forward.encode(w)?;

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
                match self.end_object_id {
                    Some(end_object) => (end_object + 1).encode(w)?,
                    None => 0u64.encode(w)?,
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

    fn subscribe(filter_type: FilterType) -> Subscribe {
        Subscribe {
            id: 12345,
            track_alias: 100,
            track_namespace: TrackNamespace::from_utf8_path("test/path"),
            track_name: "audiotrack".to_string(),
            subscriber_priority: 127,
            group_order: GroupOrder::Publisher,
            forward: true,
            filter_type,
            start_location: None,
            end_group_id: None,
            end_object_id: None,
            params: Default::default(),
        }
    }

    #[test]
    fn encode_decode() {
        let mut buf = BytesMut::new();

        let msg = subscribe(FilterType::LatestGroup);
        msg.encode(&mut buf).unwrap();
        let decoded = Subscribe::decode(&mut buf).unwrap();
        assert_eq!(decoded, msg);
        decoded.validate().unwrap();

        let msg = Subscribe {
            start_location: Some(Location::new(5, 0)),
            ..subscribe(FilterType::AbsoluteStart)
        };
        msg.encode(&mut buf).unwrap();
        assert_eq!(Subscribe::decode(&mut buf).unwrap(), msg);

        // Range with and without an end object.
        let msg = Subscribe {
            start_location: Some(Location::new(5, 0)),
            end_group_id: Some(6),
            end_object_id: Some(3),
            ..subscribe(FilterType::AbsoluteRange)
        };
        msg.encode(&mut buf).unwrap();
        let decoded = Subscribe::decode(&mut buf).unwrap();
        assert_eq!(decoded, msg);
        decoded.validate().unwrap();

        let msg = Subscribe {
            start_location: Some(Location::new(5, 0)),
            end_group_id: Some(6),
            end_object_id: None,
            ..subscribe(FilterType::AbsoluteRange)
        };
        msg.encode(&mut buf).unwrap();
        assert_eq!(Subscribe::decode(&mut buf).unwrap(), msg);
    }

    #[test]
    fn encode_missing_fields() {
        let mut buf = BytesMut::new();

        let msg = subscribe(FilterType::AbsoluteStart);
        assert!(matches!(
            msg.encode(&mut buf).unwrap_err(),
            EncodeError::MissingField(_)
        ));
    }

    #[test]
    fn validate_rejects_backwards_range() {
        let msg = Subscribe {
            start_location: Some(Location::new(6, 0)),
            end_group_id: Some(5),
            end_object_id: None,
            ..subscribe(FilterType::AbsoluteRange)
        };
        assert!(msg.validate().is_err());

        let msg = Subscribe {
            start_location: Some(Location::new(5, 4)),
            end_group_id: Some(5),
            end_object_id: Some(3),
            ..subscribe(FilterType::AbsoluteRange)
        };
        assert!(msg.validate().is_err());
    }
}
