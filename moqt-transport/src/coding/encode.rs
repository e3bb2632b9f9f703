use super::BoundsExceeded;

/// An encode error.
#[derive(thiserror::Error, Debug, Clone)]
pub enum EncodeError {
    /// The writer ran out of space; the argument is how many more bytes are needed.
    #[error("short buffer: {0} bytes needed")]
    More(usize),

    #[error("varint too large")]
    BoundsExceeded(#[from] BoundsExceeded),

    #[error("invalid value")]
    InvalidValue,

    #[error("missing field: {0}")]
    MissingField(String),

    #[error("field bounds exceeded: {0}")]
    FieldBoundsExceeded(String),

    #[error("message bounds exceeded")]
    MsgBoundsExceeded,
}

pub trait Encode: Sized {
    fn encode<W: bytes::BufMut>(&self, w: &mut W) -> Result<(), EncodeError>;

    /// Helper: return Err(EncodeError::More) if the writer cannot take `required` more bytes.
    fn encode_remaining<W: bytes::BufMut>(buf: &mut W, required: usize) -> Result<(), EncodeError> {
        let needed = required.saturating_sub(buf.remaining_mut());
        if needed > 0 {
            Err(EncodeError::More(needed))
        } else {
            Ok(())
        }
    }
}

impl Encode for Vec<u8> {
    /// Encode a byte vector with a varint length prefix.
    fn encode<W: bytes::BufMut>(&self, w: &mut W) -> Result<(), EncodeError> {
        self.len().encode(w)?;
        Self::encode_remaining(w, self.len())?;
        w.put_slice(self);
        Ok(())
    }
}
