use super::{Decode, DecodeError, Encode, EncodeError};

impl Encode for String {
    /// Encode a string with a varint length prefix.
    fn encode<W: bytes::BufMut>(&self, w: &mut W) -> Result<(), EncodeError> {
        self.len().encode(w)?;
        Self::encode_remaining(w, self.len())?;
        w.put(self.as_ref());
        Ok(())
    }
}

impl Decode for String {
    fn decode<R: bytes::Buf>(r: &mut R) -> Result<Self, DecodeError> {
        let size = usize::decode(r)?;
        Self::decode_remaining(r, size)?;

        let mut buf = vec![0; size];
        r.copy_to_slice(&mut buf);
        Ok(String::from_utf8(buf)?)
    }
}

/// A bounded, human-readable reason carried by error and cancel messages.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct ReasonPhrase(pub String);

impl ReasonPhrase {
    /// The max phrase length.
    pub const MAX_LEN: usize = 1024;
}

impl Encode for ReasonPhrase {
    fn encode<W: bytes::BufMut>(&self, w: &mut W) -> Result<(), EncodeError> {
        if self.0.len() > ReasonPhrase::MAX_LEN {
            return Err(EncodeError::FieldBoundsExceeded("ReasonPhrase".to_string()));
        }
        self.0.encode(w)
    }
}

impl Decode for ReasonPhrase {
    fn decode<R: bytes::Buf>(r: &mut R) -> Result<Self, DecodeError> {
        let size = usize::decode(r)?;
        if size > ReasonPhrase::MAX_LEN {
            return Err(DecodeError::FieldBoundsExceeded("ReasonPhrase".to_string()));
        }

        Self::decode_remaining(r, size)?;
        let mut buf = vec![0; size];
        r.copy_to_slice(&mut buf);
        Ok(ReasonPhrase(String::from_utf8(buf)?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::{Bytes, BytesMut};

    #[test]
    fn encode_decode() {
        let mut buf = BytesMut::new();

        let s = "teststring".to_string();
        s.encode(&mut buf).unwrap();
        #[rustfmt::skip]
        assert_eq!(buf.to_vec(), vec![
            0x0a, // length
            0x74, 0x65, 0x73, 0x74, 0x73, 0x74, 0x72, 0x69, 0x6e, 0x67]);
        assert_eq!(String::decode(&mut buf).unwrap(), s);

        let r = ReasonPhrase("gone away".to_string());
        r.encode(&mut buf).unwrap();
        assert_eq!(ReasonPhrase::decode(&mut buf).unwrap(), r);
    }

    #[test]
    fn reason_phrase_too_large() {
        let mut buf = BytesMut::new();

        let r = ReasonPhrase("x".repeat(ReasonPhrase::MAX_LEN + 1));
        let encoded = r.encode(&mut buf);
        assert!(matches!(
            encoded.unwrap_err(),
            EncodeError::FieldBoundsExceeded(_)
        ));

        // Length prefix of 1025, then zeroes.
        let mut data = vec![0u8; 1027];
        data[0] = 0x44;
        data[1] = 0x01;
        let mut buf: Bytes = data.into();
        let decoded = ReasonPhrase::decode(&mut buf);
        assert!(matches!(
            decoded.unwrap_err(),
            DecodeError::FieldBoundsExceeded(_)
        ));
    }
}
