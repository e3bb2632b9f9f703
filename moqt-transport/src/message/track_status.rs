use crate::coding::{Decode, DecodeError, Encode, EncodeError, KeyValuePairs, Location};

/// Current production state of a track.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum TrackStatusCode {
    InProgress = 0x0,
    DoesNotExist = 0x1,
    NotStarted = 0x2,
    Finished = 0x3,
    RelayUnavailable = 0x4,
}

impl Encode for TrackStatusCode {
    fn encode<W: bytes::BufMut>(&self, w: &mut W) -> Result<(), EncodeError> {
        (*self as u64).encode(w)
    }
}

impl Decode for TrackStatusCode {
    fn decode<R: bytes::Buf>(r: &mut R) -> Result<Self, DecodeError> {
        match u64::decode(r)? {
            0x0 => Ok(Self::InProgress),
            0x1 => Ok(Self::DoesNotExist),
            0x2 => Ok(Self::NotStarted),
            0x3 => Ok(Self::Finished),
            0x4 => Ok(Self::RelayUnavailable),
            _ => Err(DecodeError::InvalidTrackStatusCode),
        }
    }
}

/// Sent by the publisher in reply to a TrackStatusRequest.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct TrackStatus {
    /// The request ID of the TRACK_STATUS_REQUEST this message is replying to.
    pub id: u64,

    pub status_code: TrackStatusCode,

    /// The largest location produced so far; only meaningful while in progress
    /// or finished.
    pub largest_location: Option<Location>,

    /// Optional parameters
    pub params: KeyValuePairs,
}

impl Decode for TrackStatus {
    fn decode<R: bytes::Buf>(r: &mut R) -> Result<Self, DecodeError> {
        let id = u64::decode(r)?;
        let status_code = TrackStatusCode::decode(r)?;
        let largest_location = match status_code {
            TrackStatusCode::InProgress | TrackStatusCode::Finished => {
                Some(Location::decode(r)?)
            }
            _ => None,
        };
        let params = KeyValuePairs::decode(r)?;

        Ok(Self {
            id,
            status_code,
            largest_location,
            params,
        })
    }
}

impl Encode for TrackStatus {
    fn encode<W: bytes::BufMut>(&self, w: &mut W) -> Result<(), EncodeError> {
        self.id.encode(w)?;
        self.status_code.encode(w)?;
        match self.status_code {
            TrackStatusCode::InProgress | TrackStatusCode::Finished => {
                match &self.largest_location {
                    Some(largest) => largest.encode(w)?,
                    None => {
                        return Err(EncodeError::MissingField("LargestLocation".to_string()))
                    }
                }
            }
            _ => {}
        }
        self.params.encode(w)?;

        Ok(())
    }
}
