use crate::coding::{Decode, DecodeError, Encode, EncodeError};

/// Sent by the server to ask the session to drain and reconnect elsewhere.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct GoAway {
    /// Where to reconnect; empty means the same server.
    pub new_session_uri: String,
}

impl Decode for GoAway {
    fn decode<R: bytes::Buf>(r: &mut R) -> Result<Self, DecodeError> {
        let new_session_uri = String::decode(r)?;
        Ok(Self { new_session_uri })
    }
}

impl Encode for GoAway {
    fn encode<W: bytes::BufMut>(&self, w: &mut W) -> Result<(), EncodeError> {
        self.new_session_uri.encode(w)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::BytesMut;

    #[test]
    fn encode_decode() {
        let mut buf = BytesMut::new();

        let msg = GoAway {
            new_session_uri: "moq://example.com:1234".to_string(),
        };
        msg.encode(&mut buf).unwrap();
        assert_eq!(GoAway::decode(&mut buf).unwrap(), msg);
    }
}
