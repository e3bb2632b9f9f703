use crate::coding::{Decode, DecodeError, Encode, EncodeError, ReasonPhrase};

/// Sent by the publisher to reject a Fetch.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct FetchError {
    /// The request ID of the FETCH this message is replying to
    pub id: u64,

    pub error_code: u64,
    pub reason_phrase: ReasonPhrase,
}

impl Decode for FetchError {
    fn decode<R: bytes::Buf>(r: &mut R) -> Result<Self, DecodeError> {
        let id = u64::decode(r)?;
        let error_code = u64::decode(r)?;
        let reason_phrase = ReasonPhrase::decode(r)?;

        Ok(Self {
            id,
            error_code,
            reason_phrase,
        })
    }
}

impl Encode for FetchError {
    fn encode<W: bytes::BufMut>(&self, w: &mut W) -> Result<(), EncodeError> {
        self.id.encode(w)?;
        self.error_code.encode(w)?;
        self.reason_phrase.encode(w)?;

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

        let msg = FetchError {
            id: 12345,
            error_code: 0x5,
            reason_phrase: ReasonPhrase("invalid range".to_string()),
        };
        msg.encode(&mut buf).unwrap();
        assert_eq!(FetchError::decode(&mut buf).unwrap(), msg);
    }
}
