use crate::coding;
use crate::setup;

#[derive(thiserror::Error, Debug, Clone)]
pub enum SessionError {
    #[error("webtransport session: {0}")]
    Session(#[from] web_transport::SessionError),

    #[error("webtransport write: {0}")]
    Write(#[from] web_transport::WriteError),

    #[error("webtransport read: {0}")]
    Read(#[from] web_transport::ReadError),

    #[error("encode error: {0}")]
    Encode(#[from] coding::EncodeError),

    #[error("decode error: {0}")]
    Decode(#[from] coding::DecodeError),

    #[error("unsupported versions: client={0:?} server={1:?}")]
    Version(setup::Versions, setup::Versions),

    /// A control message arrived that the negotiated role cannot send.
    #[error("role violation")]
    RoleViolation,

    /// A request id or track alias collided with an existing one.
    #[error("duplicate")]
    Duplicate,

    /// Request ids are exhausted until the peer raises MAX_REQUEST_ID.
    #[error("request ids exhausted")]
    RequestIdExhausted,

    /// A connect URI or caller-supplied argument was unusable.
    #[error("invalid params: {0}")]
    InvalidParams(String),

    #[error("no request or track matches")]
    NotFound,

    #[error("wrong size")]
    WrongSize,

    #[error("internal error: {0}")]
    Internal(String),
}

impl SessionError {
    /// The termination code sent over the wire when this error closes the
    /// session.
    pub fn code(&self) -> u64 {
        match self {
            // INTERNAL_ERROR
            Self::Session(_)
            | Self::Read(_)
            | Self::Write(_)
            | Self::Encode(_)
            | Self::Internal(_) => 0x1,
            // PROTOCOL_VIOLATION: malformed or invalid messages
            Self::Decode(_) | Self::WrongSize | Self::RoleViolation => 0x3,
            // DUPLICATE_TRACK_ALIAS
            Self::Duplicate => 0x5,
            // TOO_MANY_REQUESTS
            Self::RequestIdExhausted => 0x6,
            // VERSION_NEGOTIATION_FAILED
            Self::Version(..) => 0x15,
            // Local-only errors never reach the wire but need a value.
            Self::InvalidParams(_) | Self::NotFound => 0x1,
        }
    }

    /// Whether the error is a protocol violation that must terminate the
    /// session.
    pub fn is_fatal(&self) -> bool {
        !matches!(
            self,
            Self::RequestIdExhausted | Self::InvalidParams(_) | Self::NotFound
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coding::DecodeError;

    #[test]
    fn codes() {
        assert_eq!(SessionError::RoleViolation.code(), 0x3);
        assert_eq!(SessionError::Duplicate.code(), 0x5);
        assert_eq!(
            SessionError::Decode(DecodeError::InvalidMessage(0x3f)).code(),
            0x3
        );
        assert_eq!(
            SessionError::Version(Default::default(), Default::default()).code(),
            0x15
        );
    }

    #[test]
    fn backpressure_is_not_fatal() {
        assert!(!SessionError::RequestIdExhausted.is_fatal());
        assert!(SessionError::RoleViolation.is_fatal());
    }
}
