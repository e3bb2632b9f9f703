use super::{ParameterType, Version, Versions};
use crate::coding::{Decode, DecodeError, Encode, EncodeError, KeyValuePairs};

/// Sent by the server in response to the CLIENT_SETUP.
#[derive(Clone, Debug)]
pub struct Server {
    /// The version chosen from the client's list.
    pub version: Version,

    /// A name identifying this endpoint in logs on the other side.
    pub endpoint_id: String,

    /// Additional parameters, including any we don't understand.
    pub params: KeyValuePairs,
}

impl Server {
    pub const TYPE: u64 = 0x21;
}

impl Decode for Server {
    fn decode<R: bytes::Buf>(r: &mut R) -> Result<Self, DecodeError> {
        let typ = u64::decode(r)?;
        if typ != Self::TYPE {
            return Err(DecodeError::InvalidMessage(typ));
        }

        let len = usize::decode(r)?;
        Self::decode_remaining(r, len)?;

        let version = Version::decode(r)?;
        let params = KeyValuePairs::decode(r)?;

        let endpoint_id = match params.get_bytes(ParameterType::EndpointId.into()) {
            Some(bytes) => String::from_utf8_lossy(bytes).to_string(),
            None => String::new(),
        };

        Ok(Self {
            version,
            endpoint_id,
            params,
        })
    }
}

impl Encode for Server {
    fn encode<W: bytes::BufMut>(&self, w: &mut W) -> Result<(), EncodeError> {
        Self::TYPE.encode(w)?;

        let mut buf = Vec::new();
        self.version.encode(&mut buf)?;

        let mut params = self.params.clone();
        if !self.endpoint_id.is_empty() {
            params.set_bytesvalue(
                ParameterType::EndpointId.into(),
                self.endpoint_id.as_bytes().to_vec(),
            );
        }
        params.encode(&mut buf)?;

        buf.len().encode(w)?;
        Self::encode_remaining(w, buf.len())?;
        w.put_slice(&buf);

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
        let server = Server {
            version: Version::DRAFT_14,
            endpoint_id: "moqt-server".to_string(),
            params: Default::default(),
        };

        server.encode(&mut buf).unwrap();
        let decoded = Server::decode(&mut buf).unwrap();
        assert_eq!(decoded.version, server.version);
        assert_eq!(decoded.endpoint_id, server.endpoint_id);
    }
}
