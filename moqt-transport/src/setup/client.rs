use super::{ParameterType, Role, Versions};
use crate::coding::{Decode, DecodeError, Encode, EncodeError, KeyValuePairs};

/// Sent by the client as the first message on the control stream.
#[derive(Clone, Debug)]
pub struct Client {
    /// The list of supported versions in preferred order.
    pub versions: Versions,

    /// Indicate if the client is a publisher, a subscriber, or both.
    pub role: Role,

    /// WebTransport-style path; optional over raw QUIC.
    pub path: Option<String>,

    /// A name identifying this endpoint in logs on the other side.
    pub endpoint_id: String,

    /// Additional parameters, including any we don't understand.
    pub params: KeyValuePairs,
}

impl Client {
    pub const TYPE: u64 = 0x20;
}

impl Decode for Client {
    fn decode<R: bytes::Buf>(r: &mut R) -> Result<Self, DecodeError> {
        let typ = u64::decode(r)?;
        if typ != Self::TYPE {
            return Err(DecodeError::InvalidMessage(typ));
        }

        let len = usize::decode(r)?;
        Self::decode_remaining(r, len)?;

        let versions = Versions::decode(r)?;
        let params = KeyValuePairs::decode(r)?;

        let role = match params.get_int(ParameterType::Role.into()) {
            Some(0x1) => Role::Publisher,
            Some(0x2) => Role::Subscriber,
            Some(0x3) => Role::Both,
            Some(value) => return Err(DecodeError::InvalidRole(value)),
            None => return Err(DecodeError::MissingParameter),
        };

        let path = match params.get_bytes(ParameterType::Path.into()) {
            Some(bytes) => Some(
                String::from_utf8(bytes.to_vec())
                    .map_err(|_| DecodeError::InvalidParameter)?,
            ),
            None => None,
        };

        let endpoint_id = match params.get_bytes(ParameterType::EndpointId.into()) {
            Some(bytes) => String::from_utf8_lossy(bytes).to_string(),
            None => String::new(),
        };

        Ok(Self {
            versions,
            role,
            path,
            endpoint_id,
            params,
        })
    }
}

impl Encode for Client {
    fn encode<W: bytes::BufMut>(&self, w: &mut W) -> Result<(), EncodeError> {
        Self::TYPE.encode(w)?;

        let mut buf = Vec::new();
        self.versions.encode(&mut buf)?;

        let mut params = self.params.clone();
        params.set_intvalue(ParameterType::Role.into(), self.role as u64);
        if let Some(path) = &self.path {
            params.set_bytesvalue(ParameterType::Path.into(), path.as_bytes().to_vec());
        }
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
    use super::super::Version;
    use super::*;
    use bytes::BytesMut;

    #[test]
    fn encode_decode() {
        let mut buf = BytesMut::new();
        let client = Client {
            versions: [Version::DRAFT_14].into(),
            role: Role::Both,
            path: None,
            endpoint_id: "moqt-client".to_string(),
            params: Default::default(),
        };

        client.encode(&mut buf).unwrap();
        let decoded = Client::decode(&mut buf).unwrap();
        assert_eq!(decoded.versions, client.versions);
        assert_eq!(decoded.role, client.role);
        assert_eq!(decoded.path, None);
        assert_eq!(decoded.endpoint_id, client.endpoint_id);
    }

    #[test]
    fn decode_missing_role() {
        let mut buf = BytesMut::new();

        // Hand-build a CLIENT_SETUP with no role parameter.
        let mut payload = Vec::new();
        let versions: Versions = [Version::DRAFT_14].into();
        versions.encode(&mut payload).unwrap();
        KeyValuePairs::new().encode(&mut payload).unwrap();

        Client::TYPE.encode(&mut buf).unwrap();
        payload.len().encode(&mut buf).unwrap();
        buf.extend_from_slice(&payload);

        assert!(matches!(
            Client::decode(&mut buf).unwrap_err(),
            DecodeError::MissingParameter
        ));
    }
}
