use std::collections::btree_map::Entry;
use std::collections::BTreeMap;

use crate::coding::{KeyValuePair, Value};
use crate::data::{ExtensionHeaders, ObjectStatus};

/// QUIC stream handling mode used to send objects, or how an object arrived.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum TrackMode {
    Datagram,
    StreamPerObject,
    StreamPerGroup,
    StreamPerTrack,
}

/// Application-facing extension map attached to objects.
///
/// Keys are 62-bit values. Even keys carry a numeric value of at most 8
/// bytes; odd keys carry opaque bytes. Equality follows those semantics:
/// even values compare numerically with zero-extension, odd values compare
/// byte-exact, and key order never matters.
#[derive(Clone, Debug, Default, Eq)]
pub struct Extensions(BTreeMap<u64, Vec<u8>>);

impl Extensions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert only if the key is absent. Returns whether it was inserted.
    pub fn try_insert(&mut self, key: u64, value: Vec<u8>) -> bool {
        match self.0.entry(key) {
            Entry::Vacant(entry) => {
                entry.insert(value);
                true
            }
            Entry::Occupied(_) => false,
        }
    }

    pub fn set(&mut self, key: u64, value: Vec<u8>) {
        self.0.insert(key, value);
    }

    pub fn set_numeric(&mut self, key: u64, value: u64) {
        self.0.insert(key, value.to_le_bytes().to_vec());
    }

    pub fn get(&self, key: u64) -> Option<&[u8]> {
        self.0.get(&key).map(|v| v.as_slice())
    }

    pub fn has(&self, key: u64) -> bool {
        self.0.contains_key(&key)
    }

    pub fn remove(&mut self, key: u64) -> bool {
        self.0.remove(&key).is_some()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    fn compare_entry(key: u64, lhs: &[u8], rhs: &[u8]) -> bool {
        if key % 2 != 0 {
            // Odd keys are byte equality.
            return lhs == rhs;
        }

        // Even keys are numeric equality: the shorter value is zero-extended.
        if lhs.len() > 8 || rhs.len() > 8 {
            return false;
        }
        let (short, long) = if lhs.len() <= rhs.len() {
            (lhs, rhs)
        } else {
            (rhs, lhs)
        };
        if short != &long[..short.len()] {
            return false;
        }
        long[short.len()..].iter().all(|&b| b == 0)
    }

    /// Convert to the wire representation.
    pub fn to_wire(&self) -> ExtensionHeaders {
        let mut headers = ExtensionHeaders::new();
        for (&key, value) in &self.0 {
            if key % 2 == 0 {
                let mut bytes = [0u8; 8];
                let len = value.len().min(8);
                bytes[..len].copy_from_slice(&value[..len]);
                headers.set_intvalue(key, u64::from_le_bytes(bytes));
            } else {
                headers.set_bytesvalue(key, value.clone());
            }
        }
        headers
    }
}

impl PartialEq for Extensions {
    fn eq(&self, other: &Self) -> bool {
        self.0.len() == other.0.len()
            && self.0.iter().all(|(&key, lhs)| {
                other
                    .0
                    .get(&key)
                    .map(|rhs| Self::compare_entry(key, lhs, rhs))
                    .unwrap_or(false)
            })
    }
}

impl From<&ExtensionHeaders> for Extensions {
    fn from(headers: &ExtensionHeaders) -> Self {
        let mut extensions = Extensions::new();
        for kvp in &headers.0 {
            match kvp {
                KeyValuePair {
                    key,
                    value: Value::IntValue(v),
                } => extensions.set(*key, v.to_le_bytes().to_vec()),
                KeyValuePair {
                    key,
                    value: Value::BytesValue(v),
                } => extensions.set(*key, v.clone()),
            }
        }
        extensions
    }
}

/// Object headers passed when sending and receiving an object; they describe
/// the object itself, the payload travels alongside.
#[derive(Clone, Debug, PartialEq)]
pub struct ObjectHeaders {
    /// Application-defined order of generation.
    pub group_id: u64,
    pub object_id: u64,

    /// Starts at 0, monotonically increases by 1 within a group.
    pub subgroup_id: u64,

    /// Length of the object payload.
    pub payload_length: usize,

    /// Status of the object at the publisher.
    pub status: ObjectStatus,

    /// Priority of the object, lower value is better.
    pub priority: Option<u8>,

    /// Object time to live in milliseconds.
    pub ttl_ms: Option<u32>,

    /// Mode to use when sending, or how the object was received.
    pub track_mode: Option<TrackMode>,

    pub extensions: Option<Extensions>,
    pub immutable_extensions: Option<Extensions>,
}

impl ObjectHeaders {
    /// Minimal headers for an available object.
    pub fn available(group_id: u64, object_id: u64) -> Self {
        Self {
            group_id,
            object_id,
            subgroup_id: 0,
            payload_length: 0,
            status: ObjectStatus::Available,
            priority: None,
            ttl_ms: None,
            track_mode: None,
            extensions: None,
            immutable_extensions: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn even_keys_compare_numerically() {
        let mut a = Extensions::new();
        let mut b = Extensions::new();

        // Same number, different widths: equal after zero-extension.
        a.set(2, vec![0x2A]);
        b.set(2, vec![0x2A, 0x00, 0x00, 0x00]);
        assert_eq!(a, b);

        // A non-zero spill byte breaks equality.
        let mut c = Extensions::new();
        c.set(2, vec![0x2A, 0x01]);
        assert_ne!(a, c);

        // set_numeric always stores 8 bytes, still equal to the short form.
        let mut d = Extensions::new();
        d.set_numeric(2, 0x2A);
        assert_eq!(a, d);
    }

    #[test]
    fn odd_keys_compare_byte_exact() {
        let mut a = Extensions::new();
        let mut b = Extensions::new();

        a.set(3, vec![0x2A]);
        b.set(3, vec![0x2A, 0x00]);
        // Trailing zeroes matter for odd keys.
        assert_ne!(a, b);

        let mut c = Extensions::new();
        c.set(3, vec![0x2A]);
        assert_eq!(a, c);
    }

    #[test]
    fn order_does_not_affect_equality() {
        let mut a = Extensions::new();
        a.set(3, vec![1, 2, 3]);
        a.set_numeric(2, 500);
        a.set(5, vec![9]);

        let mut b = Extensions::new();
        b.set(5, vec![9]);
        b.set(3, vec![1, 2, 3]);
        b.set_numeric(2, 500);

        assert_eq!(a, b);
    }

    #[test]
    fn try_insert_is_insert_if_absent() {
        let mut ext = Extensions::new();
        assert!(ext.try_insert(3, vec![1]));
        assert!(!ext.try_insert(3, vec![2]));
        assert_eq!(ext.get(3), Some(&[1u8][..]));
    }

    #[test]
    fn wire_round_trip() {
        let mut ext = Extensions::new();
        ext.set_numeric(2, 77);
        ext.set(3, vec![0xAA, 0xBB]);

        let wire = ext.to_wire();
        let back = Extensions::from(&wire);
        assert_eq!(ext, back);
    }
}
