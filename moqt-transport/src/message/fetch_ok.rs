use crate::coding::{Decode, DecodeError, Encode, EncodeError, KeyValuePairs, Location};
use crate::message::GroupOrder;

/// Sent by the publisher to accept a Fetch.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct FetchOk {
    /// The request ID of the FETCH this message is replying to
    pub id: u64,

    /// Order groups will be delivered in
    pub group_order: GroupOrder,

    /// Whether the fetch range runs to the end of the track.
    pub end_of_track: bool,

    /// The largest location that will be delivered by this fetch.
    pub end_location: Location,

    /// Optional parameters
    pub params: KeyValuePairs,
}

impl Decode for FetchOk {
    fn decode<R: bytes::Buf>(r: &mut R) -> Result<Self, DecodeError> {
        let id = u64::decode(r)?;
        let group_order = GroupOrder::decode(r)?;
        let end_of_track = bool::decode(r)?;
        let end_location = Location::decode(r)?;
        let params = KeyValuePairs::decode(r)?;

        Ok(Self {
            id,
            group_order,
            end_of_track,
            end_location,
            params,
        })
    }
}

impl Encode for FetchOk {
    fn encode<W: bytes::BufMut>(&self, w: &mut W) -> Result<(), EncodeError> {
        self.id.encode(w)?;
        self.group_order.encode(w)?;
        self.end_of_track.encode(w)?;
        self.end_location.encode(w)?;
        self.params.encode(w)?;

        Ok(())
    }
}
