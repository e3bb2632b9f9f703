use super::{Decode, DecodeError, Encode, EncodeError};
use bytes::Buf;
use std::collections::HashMap;
use std::fmt;

/// A parameter value: even keys carry a varint, odd keys carry opaque bytes.
#[derive(Clone, Eq, PartialEq)]
pub enum Value {
    IntValue(u64),
    BytesValue(Vec<u8>),
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::IntValue(v) => write!(f, "{}", v),
            Value::BytesValue(bytes) => {
                // Show up to 16 bytes in hex for readability
                let preview: Vec<String> =
                    bytes.iter().take(16).map(|b| format!("{:02X}", b)).collect();
                write!(f, "[{}]", preview.join(" "))
            }
        }
    }
}

#[derive(Clone, Eq, PartialEq)]
pub struct KeyValuePair {
    pub key: u64,
    pub value: Value,
}

impl KeyValuePair {
    pub fn new_int(key: u64, value: u64) -> Self {
        Self {
            key,
            value: Value::IntValue(value),
        }
    }

    pub fn new_bytes(key: u64, value: Vec<u8>) -> Self {
        Self {
            key,
            value: Value::BytesValue(value),
        }
    }
}

impl Decode for KeyValuePair {
    fn decode<R: bytes::Buf>(r: &mut R) -> Result<Self, DecodeError> {
        let key = u64::decode(r)?;

        if key % 2 == 0 {
            // VarInt variant
            let value = u64::decode(r)?;
            Ok(KeyValuePair::new_int(key, value))
        } else {
            // Bytes variant
            let length = usize::decode(r)?;
            if length > u16::MAX as usize {
                log::warn!(
                    "key value pair too long: key={} length={} (max={})",
                    key,
                    length,
                    u16::MAX
                );
                return Err(DecodeError::KeyValuePairLengthExceeded());
            }

            Self::decode_remaining(r, length)?;
            let mut buf = vec![0; length];
            r.copy_to_slice(&mut buf);
            Ok(KeyValuePair::new_bytes(key, buf))
        }
    }
}

impl Encode for KeyValuePair {
    fn encode<W: bytes::BufMut>(&self, w: &mut W) -> Result<(), EncodeError> {
        match &self.value {
            Value::IntValue(v) => {
                // key must be even for IntValue
                if self.key % 2 != 0 {
                    return Err(EncodeError::InvalidValue);
                }
                self.key.encode(w)?;
                (*v).encode(w)?;
                Ok(())
            }
            Value::BytesValue(v) => {
                // key must be odd for BytesValue
                if self.key % 2 == 0 {
                    return Err(EncodeError::InvalidValue);
                }
                self.key.encode(w)?;
                v.len().encode(w)?;
                Self::encode_remaining(w, v.len())?;
                w.put_slice(v);
                Ok(())
            }
        }
    }
}

impl fmt::Debug for KeyValuePair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{{}: {:?}}}", self.key, self.value)
    }
}

/// The parameter map carried by control messages, prefixed by its total byte length.
#[derive(Default, Clone, Eq, PartialEq)]
pub struct KeyValuePairs(pub HashMap<u64, KeyValuePair>);

impl KeyValuePairs {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_intvalue(&mut self, key: u64, value: u64) {
        self.0.insert(key, KeyValuePair::new_int(key, value));
    }

    pub fn set_bytesvalue(&mut self, key: u64, value: Vec<u8>) {
        self.0.insert(key, KeyValuePair::new_bytes(key, value));
    }

    pub fn has(&self, key: u64) -> bool {
        self.0.contains_key(&key)
    }

    pub fn get(&self, key: u64) -> Option<&KeyValuePair> {
        self.0.get(&key)
    }

    pub fn get_int(&self, key: u64) -> Option<u64> {
        match self.0.get(&key) {
            Some(KeyValuePair {
                value: Value::IntValue(v),
                ..
            }) => Some(*v),
            _ => None,
        }
    }

    pub fn get_bytes(&self, key: u64) -> Option<&[u8]> {
        match self.0.get(&key) {
            Some(KeyValuePair {
                value: Value::BytesValue(v),
                ..
            }) => Some(v.as_slice()),
            _ => None,
        }
    }
}

impl Decode for KeyValuePairs {
    fn decode<R: bytes::Buf>(r: &mut R) -> Result<Self, DecodeError> {
        // Total byte length of the encoded pairs.
        let length = usize::decode(r)?;
        Self::decode_remaining(r, length)?;

        if length == 0 {
            return Ok(KeyValuePairs::new());
        }

        // Decode from the exact slice holding the pairs so framing stays intact.
        let mut buf = vec![0u8; length];
        r.copy_to_slice(&mut buf);
        let mut kvps_bytes = bytes::Bytes::from(buf);

        let mut kvps = HashMap::new();
        while kvps_bytes.has_remaining() {
            let kvp = KeyValuePair::decode(&mut kvps_bytes)?;
            if kvps.contains_key(&kvp.key) {
                return Err(DecodeError::DuplicateParameter(kvp.key));
            }
            kvps.insert(kvp.key, kvp);
        }

        Ok(KeyValuePairs(kvps))
    }
}

impl Encode for KeyValuePairs {
    fn encode<W: bytes::BufMut>(&self, w: &mut W) -> Result<(), EncodeError> {
        let mut tmp = bytes::BytesMut::new();
        for kvp in self.0.values() {
            kvp.encode(&mut tmp)?;
        }

        (tmp.len() as u64).encode(w)?;
        w.put_slice(&tmp);

        Ok(())
    }
}

impl fmt::Debug for KeyValuePairs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{ ")?;
        for (i, kv) in self.0.values().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{:?}", kv)?;
        }
        write!(f, " }}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::{Bytes, BytesMut};

    #[test]
    fn encode_decode_keyvaluepair() {
        let mut buf = BytesMut::new();

        // Odd key with an int value is illegal.
        let kvp = KeyValuePair::new_int(1, 0);
        assert!(matches!(
            kvp.encode(&mut buf).unwrap_err(),
            EncodeError::InvalidValue
        ));

        let kvp = KeyValuePair::new_int(0, 0);
        kvp.encode(&mut buf).unwrap();
        assert_eq!(buf.to_vec(), vec![0x00, 0x00]);
        assert_eq!(KeyValuePair::decode(&mut buf).unwrap(), kvp);

        let kvp = KeyValuePair::new_int(100, 100);
        kvp.encode(&mut buf).unwrap();
        assert_eq!(buf.to_vec(), vec![0x40, 0x64, 0x40, 0x64]);
        assert_eq!(KeyValuePair::decode(&mut buf).unwrap(), kvp);

        // Even key with a bytes value is illegal.
        let kvp = KeyValuePair::new_bytes(0, vec![0x01, 0x02]);
        assert!(matches!(
            kvp.encode(&mut buf).unwrap_err(),
            EncodeError::InvalidValue
        ));

        let kvp = KeyValuePair::new_bytes(1, vec![0x01, 0x02, 0x03, 0x04, 0x05]);
        kvp.encode(&mut buf).unwrap();
        assert_eq!(
            buf.to_vec(),
            vec![0x01, 0x05, 0x01, 0x02, 0x03, 0x04, 0x05]
        );
        assert_eq!(KeyValuePair::decode(&mut buf).unwrap(), kvp);
    }

    #[test]
    fn encode_decode_keyvaluepairs() {
        let mut buf = BytesMut::new();

        let mut kvps = KeyValuePairs::new();
        kvps.set_bytesvalue(1, vec![0x01, 0x02, 0x03, 0x04, 0x05]);
        kvps.encode(&mut buf).unwrap();
        #[rustfmt::skip]
        assert_eq!(buf.to_vec(), vec![
            0x07, // total length
            0x01, 0x05, 0x01, 0x02, 0x03, 0x04, 0x05]);
        assert_eq!(KeyValuePairs::decode(&mut buf).unwrap(), kvps);

        let mut kvps = KeyValuePairs::new();
        kvps.set_intvalue(0, 0);
        kvps.set_intvalue(100, 100);
        kvps.set_bytesvalue(1, vec![0x01, 0x02, 0x03, 0x04, 0x05]);
        kvps.encode(&mut buf).unwrap();
        // Map iteration order is not stable, so only check framing.
        let buf_vec = buf.to_vec();
        assert_eq!(14, buf_vec.len());
        assert_eq!(13, buf_vec[0]);
        assert_eq!(KeyValuePairs::decode(&mut buf).unwrap(), kvps);
    }

    #[test]
    fn decode_duplicate() {
        // Two pairs with key=0.
        let mut buf: Bytes = vec![0x04, 0x00, 0x01, 0x00, 0x02].into();
        assert!(matches!(
            KeyValuePairs::decode(&mut buf).unwrap_err(),
            DecodeError::DuplicateParameter(0)
        ));
    }
}
