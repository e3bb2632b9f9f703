use crate::coding::{Decode, DecodeError, Encode, EncodeError};
use crate::data::{ExtensionHeaders, ObjectStatus};

/// Datagram object variants: the type selects whether extension headers are
/// present and whether the datagram carries a payload or only a status.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum DatagramType {
    ObjectNoExtensions = 0x0,
    ObjectWithExtensions = 0x1,
    StatusNoExtensions = 0x4,
    StatusWithExtensions = 0x5,
}

impl DatagramType {
    pub fn has_extension_headers(&self) -> bool {
        matches!(
            self,
            DatagramType::ObjectWithExtensions | DatagramType::StatusWithExtensions
        )
    }

    pub fn is_status(&self) -> bool {
        matches!(
            self,
            DatagramType::StatusNoExtensions | DatagramType::StatusWithExtensions
        )
    }
}

impl Decode for DatagramType {
    fn decode<B: bytes::Buf>(r: &mut B) -> Result<Self, DecodeError> {
        match u64::decode(r)? {
            0x0 => Ok(Self::ObjectNoExtensions),
            0x1 => Ok(Self::ObjectWithExtensions),
            0x4 => Ok(Self::StatusNoExtensions),
            0x5 => Ok(Self::StatusWithExtensions),
            _ => Err(DecodeError::InvalidDatagramType),
        }
    }
}

impl Encode for DatagramType {
    fn encode<W: bytes::BufMut>(&self, w: &mut W) -> Result<(), EncodeError> {
        (*self as u64).encode(w)
    }
}

/// A complete object delivered in a single unreliable datagram.
///
/// Lost datagrams are not retransmitted; the subscriber simply never sees
/// the object.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Datagram {
    pub datagram_type: DatagramType,

    /// The track alias assigned by the subscription.
    pub track_alias: u64,

    pub group_id: u64,
    pub object_id: u64,

    /// Publisher priority, where **smaller** values are sent first.
    pub publisher_priority: u8,

    pub extension_headers: Option<ExtensionHeaders>,

    /// Present for status-only datagram types.
    pub status: Option<ObjectStatus>,

    /// Present for payload-carrying datagram types; runs to the end of the
    /// datagram.
    pub payload: Option<bytes::Bytes>,
}

impl Decode for Datagram {
    fn decode<R: bytes::Buf>(r: &mut R) -> Result<Self, DecodeError> {
        let datagram_type = DatagramType::decode(r)?;
        let track_alias = u64::decode(r)?;
        let group_id = u64::decode(r)?;
        let object_id = u64::decode(r)?;
        let publisher_priority = u8::decode(r)?;

        let extension_headers = match datagram_type.has_extension_headers() {
            true => Some(ExtensionHeaders::decode(r)?),
            false => None,
        };

        let (status, payload) = match datagram_type.is_status() {
            true => (Some(ObjectStatus::decode(r)?), None),
            false => (None, Some(r.copy_to_bytes(r.remaining()))),
        };

        Ok(Self {
            datagram_type,
            track_alias,
            group_id,
            object_id,
            publisher_priority,
            extension_headers,
            status,
            payload,
        })
    }
}

impl Encode for Datagram {
    fn encode<W: bytes::BufMut>(&self, w: &mut W) -> Result<(), EncodeError> {
        self.datagram_type.encode(w)?;
        self.track_alias.encode(w)?;
        self.group_id.encode(w)?;
        self.object_id.encode(w)?;
        self.publisher_priority.encode(w)?;

        if self.datagram_type.has_extension_headers() {
            match &self.extension_headers {
                Some(extension_headers) => extension_headers.encode(w)?,
                None => return Err(EncodeError::MissingField("ExtensionHeaders".to_string())),
            }
        }

        if self.datagram_type.is_status() {
            match &self.status {
                Some(status) => status.encode(w)?,
                None => return Err(EncodeError::MissingField("Status".to_string())),
            }
        } else {
            match &self.payload {
                Some(payload) => {
                    Self::encode_remaining(w, payload.len())?;
                    w.put_slice(payload);
                }
                None => return Err(EncodeError::MissingField("Payload".to_string())),
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::{Bytes, BytesMut};

    #[test]
    fn encode_decode() {
        let mut ext = ExtensionHeaders::new();
        ext.set_bytesvalue(123, vec![0x00, 0x01, 0x02, 0x03]);

        let cases = [
            Datagram {
                datagram_type: DatagramType::ObjectNoExtensions,
                track_alias: 12,
                group_id: 10,
                object_id: 1234,
                publisher_priority: 127,
                extension_headers: None,
                status: None,
                payload: Some(Bytes::from("payload")),
            },
            Datagram {
                datagram_type: DatagramType::ObjectWithExtensions,
                track_alias: 12,
                group_id: 10,
                object_id: 1234,
                publisher_priority: 127,
                extension_headers: Some(ext.clone()),
                status: None,
                payload: Some(Bytes::from("payload")),
            },
            Datagram {
                datagram_type: DatagramType::StatusNoExtensions,
                track_alias: 12,
                group_id: 10,
                object_id: 1234,
                publisher_priority: 127,
                extension_headers: None,
                status: Some(ObjectStatus::EndOfTrack),
                payload: None,
            },
            Datagram {
                datagram_type: DatagramType::StatusWithExtensions,
                track_alias: 12,
                group_id: 10,
                object_id: 1234,
                publisher_priority: 127,
                extension_headers: Some(ext),
                status: Some(ObjectStatus::EndOfTrack),
                payload: None,
            },
        ];

        for msg in cases {
            let mut buf = BytesMut::new();
            msg.encode(&mut buf).unwrap();
            assert_eq!(Datagram::decode(&mut buf).unwrap(), msg);
        }
    }

    #[test]
    fn encode_missing_fields() {
        let mut buf = BytesMut::new();

        // Extensions promised by the type but absent.
        let msg = Datagram {
            datagram_type: DatagramType::ObjectWithExtensions,
            track_alias: 12,
            group_id: 10,
            object_id: 1234,
            publisher_priority: 127,
            extension_headers: None,
            status: None,
            payload: Some(Bytes::from("payload")),
        };
        assert!(matches!(
            msg.encode(&mut buf).unwrap_err(),
            EncodeError::MissingField(_)
        ));

        // Status type without a status.
        let msg = Datagram {
            datagram_type: DatagramType::StatusNoExtensions,
            track_alias: 12,
            group_id: 10,
            object_id: 1234,
            publisher_priority: 127,
            extension_headers: None,
            status: None,
            payload: None,
        };
        assert!(matches!(
            msg.encode(&mut buf).unwrap_err(),
            EncodeError::MissingField(_)
        ));

        // Object type without a payload.
        let msg = Datagram {
            datagram_type: DatagramType::ObjectNoExtensions,
            track_alias: 12,
            group_id: 10,
            object_id: 1234,
            publisher_priority: 127,
            extension_headers: None,
            status: None,
            payload: None,
        };
        assert!(matches!(
            msg.encode(&mut buf).unwrap_err(),
            EncodeError::MissingField(_)
        ));
    }
}
