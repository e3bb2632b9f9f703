use crate::coding::{Decode, DecodeError, Encode, EncodeError};
use crate::data::{ExtensionHeaders, ObjectStatus, StreamHeaderType};

/// Header of a subgroup stream: one QUIC stream per (group, subgroup).
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct SubgroupHeader {
    pub header_type: StreamHeaderType,

    /// The track alias assigned by the subscription.
    pub track_alias: u64,

    /// The group sequence number.
    pub group_id: u64,

    /// Present only for header types that carry an explicit subgroup id;
    /// otherwise the subgroup id is implied (zero or first object id).
    pub subgroup_id: Option<u64>,

    /// Publisher priority, where **smaller** values are sent first.
    pub publisher_priority: u8,
}

impl SubgroupHeader {
    /// Decode the fields that follow an already-consumed header type.
    pub(super) fn decode_fields<R: bytes::Buf>(
        header_type: StreamHeaderType,
        r: &mut R,
    ) -> Result<Self, DecodeError> {
        let track_alias = u64::decode(r)?;
        let group_id = u64::decode(r)?;
        let subgroup_id = match header_type.has_subgroup_id() {
            true => Some(u64::decode(r)?),
            false => None,
        };
        let publisher_priority = u8::decode(r)?;

        Ok(Self {
            header_type,
            track_alias,
            group_id,
            subgroup_id,
            publisher_priority,
        })
    }

    pub(super) fn encode_fields<W: bytes::BufMut>(&self, w: &mut W) -> Result<(), EncodeError> {
        self.track_alias.encode(w)?;
        self.group_id.encode(w)?;
        if self.header_type.has_subgroup_id() {
            match self.subgroup_id {
                Some(subgroup_id) => subgroup_id.encode(w)?,
                None => return Err(EncodeError::MissingField("SubgroupId".to_string())),
            }
        }
        self.publisher_priority.encode(w)?;

        Ok(())
    }
}

impl Decode for SubgroupHeader {
    fn decode<R: bytes::Buf>(r: &mut R) -> Result<Self, DecodeError> {
        let header_type = StreamHeaderType::decode(r)?;
        if !header_type.is_subgroup() {
            return Err(DecodeError::InvalidHeaderType);
        }
        Self::decode_fields(header_type, r)
    }
}

impl Encode for SubgroupHeader {
    fn encode<W: bytes::BufMut>(&self, w: &mut W) -> Result<(), EncodeError> {
        self.header_type.encode(w)?;
        self.encode_fields(w)
    }
}

/// One object within a subgroup stream, payload excluded.
///
/// The payload's `payload_length` bytes follow on the stream and are read
/// separately so large objects stream through without double-buffering.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct SubgroupObject {
    pub object_id: u64,
    pub payload_length: usize,
    pub status: ObjectStatus,
}

impl Decode for SubgroupObject {
    fn decode<R: bytes::Buf>(r: &mut R) -> Result<Self, DecodeError> {
        let object_id = u64::decode(r)?;
        let payload_length = usize::decode(r)?;
        let status = ObjectStatus::decode(r)?;

        Ok(Self {
            object_id,
            payload_length,
            status,
        })
    }
}

impl Encode for SubgroupObject {
    fn encode<W: bytes::BufMut>(&self, w: &mut W) -> Result<(), EncodeError> {
        self.object_id.encode(w)?;
        self.payload_length.encode(w)?;
        self.status.encode(w)?;
        Ok(())
    }
}

/// Subgroup object variant for header types that carry extension headers.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct SubgroupObjectExt {
    pub object_id: u64,
    pub payload_length: usize,
    pub status: ObjectStatus,
    pub extension_headers: ExtensionHeaders,
}

impl Decode for SubgroupObjectExt {
    fn decode<R: bytes::Buf>(r: &mut R) -> Result<Self, DecodeError> {
        let object_id = u64::decode(r)?;
        let payload_length = usize::decode(r)?;
        let status = ObjectStatus::decode(r)?;
        let extension_headers = ExtensionHeaders::decode(r)?;

        Ok(Self {
            object_id,
            payload_length,
            status,
            extension_headers,
        })
    }
}

impl Encode for SubgroupObjectExt {
    fn encode<W: bytes::BufMut>(&self, w: &mut W) -> Result<(), EncodeError> {
        self.object_id.encode(w)?;
        self.payload_length.encode(w)?;
        self.status.encode(w)?;
        self.extension_headers.encode(w)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::BytesMut;

    #[test]
    fn encode_decode_header() {
        let mut buf = BytesMut::new();

        let header = SubgroupHeader {
            header_type: StreamHeaderType::SubgroupId,
            track_alias: 12,
            group_id: 7,
            subgroup_id: Some(2),
            publisher_priority: 127,
        };
        header.encode(&mut buf).unwrap();
        assert_eq!(SubgroupHeader::decode(&mut buf).unwrap(), header);

        // Implied subgroup id omits the field on the wire.
        let header = SubgroupHeader {
            header_type: StreamHeaderType::SubgroupZeroId,
            track_alias: 12,
            group_id: 7,
            subgroup_id: None,
            publisher_priority: 127,
        };
        header.encode(&mut buf).unwrap();
        assert_eq!(buf.len(), 4);
        assert_eq!(SubgroupHeader::decode(&mut buf).unwrap(), header);
    }

    #[test]
    fn encode_header_missing_subgroup_id() {
        let mut buf = BytesMut::new();

        let header = SubgroupHeader {
            header_type: StreamHeaderType::SubgroupId,
            track_alias: 12,
            group_id: 7,
            subgroup_id: None,
            publisher_priority: 127,
        };
        assert!(matches!(
            header.encode(&mut buf).unwrap_err(),
            EncodeError::MissingField(_)
        ));
    }

    #[test]
    fn encode_decode_objects() {
        let mut buf = BytesMut::new();

        let obj = SubgroupObject {
            object_id: 42,
            payload_length: 1000,
            status: ObjectStatus::Available,
        };
        obj.encode(&mut buf).unwrap();
        assert_eq!(SubgroupObject::decode(&mut buf).unwrap(), obj);

        let mut ext = ExtensionHeaders::new();
        ext.set_intvalue(2, 77);
        let obj = SubgroupObjectExt {
            object_id: 43,
            payload_length: 0,
            status: ObjectStatus::EndOfGroup,
            extension_headers: ext,
        };
        obj.encode(&mut buf).unwrap();
        assert_eq!(SubgroupObjectExt::decode(&mut buf).unwrap(), obj);
    }
}
