use crate::coding::{Decode, DecodeError, Encode, EncodeError};
use crate::data::{ExtensionHeaders, ObjectStatus};

/// Header of a fetch stream: one QUIC stream per fetch.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct FetchHeader {
    /// The request id of the FETCH this stream answers.
    pub request_id: u64,
}

impl Decode for FetchHeader {
    fn decode<R: bytes::Buf>(r: &mut R) -> Result<Self, DecodeError> {
        let request_id = u64::decode(r)?;
        Ok(Self { request_id })
    }
}

impl Encode for FetchHeader {
    fn encode<W: bytes::BufMut>(&self, w: &mut W) -> Result<(), EncodeError> {
        self.request_id.encode(w)
    }
}

/// One object within a fetch stream, payload excluded.
///
/// Unlike subgroup streams, every object restates its group and subgroup so
/// a single fetch stream can cross group boundaries.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct FetchObject {
    pub group_id: u64,
    pub subgroup_id: u64,
    pub object_id: u64,

    /// Publisher priority, where **smaller** values are sent first.
    pub publisher_priority: u8,

    pub payload_length: usize,
    pub status: ObjectStatus,

    pub extension_headers: ExtensionHeaders,
    pub immutable_extension_headers: ExtensionHeaders,
}

impl Decode for FetchObject {
    fn decode<R: bytes::Buf>(r: &mut R) -> Result<Self, DecodeError> {
        let group_id = u64::decode(r)?;
        let subgroup_id = u64::decode(r)?;
        let object_id = u64::decode(r)?;
        let publisher_priority = u8::decode(r)?;
        let payload_length = usize::decode(r)?;
        let status = ObjectStatus::decode(r)?;
        let extension_headers = ExtensionHeaders::decode(r)?;
        let immutable_extension_headers = ExtensionHeaders::decode(r)?;

        Ok(Self {
            group_id,
            subgroup_id,
            object_id,
            publisher_priority,
            payload_length,
            status,
            extension_headers,
            immutable_extension_headers,
        })
    }
}

impl Encode for FetchObject {
    fn encode<W: bytes::BufMut>(&self, w: &mut W) -> Result<(), EncodeError> {
        self.group_id.encode(w)?;
        self.subgroup_id.encode(w)?;
        self.object_id.encode(w)?;
        self.publisher_priority.encode(w)?;
        self.payload_length.encode(w)?;
        self.status.encode(w)?;
        self.extension_headers.encode(w)?;
        self.immutable_extension_headers.encode(w)?;
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

        let header = FetchHeader { request_id: 17 };
        header.encode(&mut buf).unwrap();
        assert_eq!(buf.to_vec(), vec![0x11]);
        assert_eq!(FetchHeader::decode(&mut buf).unwrap(), header);

        let mut ext = ExtensionHeaders::new();
        ext.set_bytesvalue(1, vec![0xAA, 0xBB]);

        let obj = FetchObject {
            group_id: 5,
            subgroup_id: 0,
            object_id: 3,
            publisher_priority: 64,
            payload_length: 12,
            status: ObjectStatus::Available,
            extension_headers: ext,
            immutable_extension_headers: ExtensionHeaders::new(),
        };
        obj.encode(&mut buf).unwrap();
        assert_eq!(FetchObject::decode(&mut buf).unwrap(), obj);
    }
}
