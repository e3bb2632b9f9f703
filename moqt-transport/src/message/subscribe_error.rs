use crate::coding::{Decode, DecodeError, Encode, EncodeError, ReasonPhrase};

/// Typed SUBSCRIBE_ERROR codes.
///
/// `LegacyTrackNotExist` (0xF0) is not in the draft registry but is emitted
/// by some deployed implementations; whether we send it is a session
/// configuration choice.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum SubscribeErrorCode {
    InternalError = 0x0,
    Unauthorized = 0x1,
    Timeout = 0x2,
    NotSupported = 0x3,
    TrackDoesNotExist = 0x4,
    InvalidRange = 0x5,
    RetryTrackAlias = 0x6,
    LegacyTrackNotExist = 0xF0,
}

impl Encode for SubscribeErrorCode {
    fn encode<W: bytes::BufMut>(&self, w: &mut W) -> Result<(), EncodeError> {
        (*self as u64).encode(w)
    }
}

impl Decode for SubscribeErrorCode {
    fn decode<R: bytes::Buf>(r: &mut R) -> Result<Self, DecodeError> {
        match u64::decode(r)? {
            0x0 => Ok(Self::InternalError),
            0x1 => Ok(Self::Unauthorized),
            0x2 => Ok(Self::Timeout),
            0x3 => Ok(Self::NotSupported),
            0x4 => Ok(Self::TrackDoesNotExist),
            0x5 => Ok(Self::InvalidRange),
            0x6 => Ok(Self::RetryTrackAlias),
            0xF0 => Ok(Self::LegacyTrackNotExist),
            _ => Err(DecodeError::InvalidValue),
        }
    }
}

/// Sent by the publisher to reject a Subscribe.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct SubscribeError {
    /// The request ID of the SUBSCRIBE this message is replying to
    pub id: u64,

    pub error_code: SubscribeErrorCode,
    pub reason_phrase: ReasonPhrase,

    /// An alias the subscriber may retry with when the code is RetryTrackAlias.
    pub track_alias: u64,
}

impl Decode for SubscribeError {
    fn decode<R: bytes::Buf>(r: &mut R) -> Result<Self, DecodeError> {
        let id = u64::decode(r)?;
        let error_code = SubscribeErrorCode::decode(r)?;
        let reason_phrase = ReasonPhrase::decode(r)?;
        let track_alias = u64::decode(r)?;

        Ok(Self {
            id,
            error_code,
            reason_phrase,
            track_alias,
        })
    }
}

impl Encode for SubscribeError {
    fn encode<W: bytes::BufMut>(&self, w: &mut W) -> Result<(), EncodeError> {
        self.id.encode(w)?;
        self.error_code.encode(w)?;
        self.reason_phrase.encode(w)?;
        self.track_alias.encode(w)?;

        Ok(())
    }
}
