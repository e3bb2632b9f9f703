use super::BoundsExceeded;
use std::str;

/// A decode error.
#[derive(thiserror::Error, Debug, Clone)]
pub enum DecodeError {
    /// Not enough bytes in the buffer yet; the argument is how many more are needed.
    /// This is not fatal, the caller is expected to retry once more data arrives.
    #[error("fill the buffer: {0} bytes needed")]
    More(usize),

    #[error("invalid string")]
    InvalidString(#[from] str::Utf8Error),

    #[error("invalid message: 0x{0:x}")]
    InvalidMessage(u64),

    #[error("invalid role: 0x{0:x}")]
    InvalidRole(u64),

    #[error("invalid value")]
    InvalidValue,

    #[error("invalid filter type")]
    InvalidFilterType,

    #[error("invalid group order")]
    InvalidGroupOrder,

    #[error("invalid fetch type")]
    InvalidFetchType,

    #[error("invalid object status")]
    InvalidObjectStatus,

    #[error("invalid datagram type")]
    InvalidDatagramType,

    #[error("invalid stream header type")]
    InvalidHeaderType,

    #[error("invalid track status code")]
    InvalidTrackStatusCode,

    #[error("missing parameter")]
    MissingParameter,

    #[error("invalid parameter")]
    InvalidParameter,

    #[error("duplicate parameter: key={0}")]
    DuplicateParameter(u64),

    #[error("key value pair length exceeded")]
    KeyValuePairLengthExceeded(),

    #[error("field bounds exceeded: {0}")]
    FieldBoundsExceeded(String),

    /// The payload length in a message frame did not match the encoded payload.
    #[error("message length mismatch")]
    LengthMismatch,

    /// A message failed its post-decode validation.
    #[error("invalid message contents: {0}")]
    InvalidContents(String),

    #[error("varint bounds exceeded")]
    BoundsExceeded(#[from] BoundsExceeded),
}

pub trait Decode: Sized {
    fn decode<B: bytes::Buf>(buf: &mut B) -> Result<Self, DecodeError>;

    /// Helper: return Err(DecodeError::More) if the buffer holds fewer than `required` bytes.
    fn decode_remaining<B: bytes::Buf>(buf: &mut B, required: usize) -> Result<(), DecodeError> {
        let needed = required.saturating_sub(buf.remaining());
        if needed > 0 {
            Err(DecodeError::More(needed))
        } else {
            Ok(())
        }
    }
}

impl From<std::string::FromUtf8Error> for DecodeError {
    fn from(err: std::string::FromUtf8Error) -> Self {
        DecodeError::InvalidString(err.utf8_error())
    }
}

impl Decode for Vec<u8> {
    /// Decode a byte vector with a varint length prefix.
    fn decode<B: bytes::Buf>(r: &mut B) -> Result<Self, DecodeError> {
        let size = usize::decode(r)?;
        Self::decode_remaining(r, size)?;

        let mut buf = vec![0; size];
        r.copy_to_slice(&mut buf);
        Ok(buf)
    }
}
