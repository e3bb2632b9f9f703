use crate::coding::{Decode, DecodeError, Encode, EncodeError};
use crate::data::{FetchHeader, SubgroupHeader};
use std::fmt;

/// The varint carried in the first bytes of every unidirectional stream,
/// selecting the framing that follows.
#[repr(u64)]
#[derive(Copy, Debug, Clone, Eq, PartialEq)]
pub enum StreamHeaderType {
    SubgroupZeroId = 0x10,
    SubgroupZeroIdExt = 0x11,
    SubgroupFirstObjectId = 0x12,
    SubgroupFirstObjectIdExt = 0x13,
    SubgroupId = 0x14,
    SubgroupIdExt = 0x15,
    Fetch = 0x5,
}

impl StreamHeaderType {
    pub fn is_subgroup(&self) -> bool {
        (0x10..=0x15).contains(&(*self as u64))
    }

    pub fn is_fetch(&self) -> bool {
        *self == StreamHeaderType::Fetch
    }

    pub fn has_extension_headers(&self) -> bool {
        matches!(
            *self,
            StreamHeaderType::SubgroupZeroIdExt
                | StreamHeaderType::SubgroupFirstObjectIdExt
                | StreamHeaderType::SubgroupIdExt
                | StreamHeaderType::Fetch
        )
    }

    /// Whether an explicit subgroup id follows the group id.
    pub fn has_subgroup_id(&self) -> bool {
        matches!(
            *self,
            StreamHeaderType::SubgroupId | StreamHeaderType::SubgroupIdExt
        )
    }
}

impl Encode for StreamHeaderType {
    fn encode<W: bytes::BufMut>(&self, w: &mut W) -> Result<(), EncodeError> {
        (*self as u64).encode(w)
    }
}

impl Decode for StreamHeaderType {
    fn decode<R: bytes::Buf>(r: &mut R) -> Result<Self, DecodeError> {
        match u64::decode(r)? {
            0x10 => Ok(Self::SubgroupZeroId),
            0x11 => Ok(Self::SubgroupZeroIdExt),
            0x12 => Ok(Self::SubgroupFirstObjectId),
            0x13 => Ok(Self::SubgroupFirstObjectIdExt),
            0x14 => Ok(Self::SubgroupId),
            0x15 => Ok(Self::SubgroupIdExt),
            0x05 => Ok(Self::Fetch),
            value => {
                log::warn!("invalid stream header type: {:#x}", value);
                Err(DecodeError::InvalidHeaderType)
            }
        }
    }
}

impl fmt::Display for StreamHeaderType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?} ({:#x})", self, *self as u64)
    }
}

/// The fully-parsed header opening a unidirectional stream.
#[derive(Clone, Debug)]
pub struct StreamHeader {
    pub header_type: StreamHeaderType,
    pub subgroup: Option<SubgroupHeader>,
    pub fetch: Option<FetchHeader>,
}

impl Decode for StreamHeader {
    fn decode<R: bytes::Buf>(r: &mut R) -> Result<Self, DecodeError> {
        let header_type = StreamHeaderType::decode(r)?;

        if header_type.is_fetch() {
            Ok(Self {
                header_type,
                subgroup: None,
                fetch: Some(FetchHeader::decode(r)?),
            })
        } else {
            Ok(Self {
                header_type,
                subgroup: Some(SubgroupHeader::decode_fields(header_type, r)?),
                fetch: None,
            })
        }
    }
}

impl Encode for StreamHeader {
    fn encode<W: bytes::BufMut>(&self, w: &mut W) -> Result<(), EncodeError> {
        self.header_type.encode(w)?;

        if self.header_type.is_fetch() {
            match &self.fetch {
                Some(fetch) => fetch.encode(w),
                None => Err(EncodeError::MissingField("FetchHeader".to_string())),
            }
        } else {
            match &self.subgroup {
                Some(subgroup) => subgroup.encode_fields(w),
                None => Err(EncodeError::MissingField("SubgroupHeader".to_string())),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::{Bytes, BytesMut};

    #[test]
    fn encode_decode_types() {
        for t in [
            StreamHeaderType::SubgroupZeroId,
            StreamHeaderType::SubgroupZeroIdExt,
            StreamHeaderType::SubgroupFirstObjectId,
            StreamHeaderType::SubgroupFirstObjectIdExt,
            StreamHeaderType::SubgroupId,
            StreamHeaderType::SubgroupIdExt,
            StreamHeaderType::Fetch,
        ] {
            let mut buf = BytesMut::new();
            t.encode(&mut buf).unwrap();
            assert_eq!(StreamHeaderType::decode(&mut buf).unwrap(), t);
        }
    }

    #[test]
    fn decode_bad_type() {
        let mut buf: Bytes = vec![0x3f].into();
        assert!(matches!(
            StreamHeaderType::decode(&mut buf).unwrap_err(),
            DecodeError::InvalidHeaderType
        ));
    }

    #[test]
    fn predicates() {
        assert!(StreamHeaderType::SubgroupId.is_subgroup());
        assert!(StreamHeaderType::SubgroupId.has_subgroup_id());
        assert!(!StreamHeaderType::SubgroupZeroId.has_subgroup_id());
        assert!(StreamHeaderType::SubgroupIdExt.has_extension_headers());
        assert!(StreamHeaderType::Fetch.is_fetch());
        assert!(StreamHeaderType::Fetch.has_extension_headers());
        assert!(!StreamHeaderType::Fetch.is_subgroup());
    }
}
