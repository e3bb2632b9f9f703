use super::{Decode, DecodeError, Encode, EncodeError};
use core::hash::{Hash, Hasher};
use std::collections::hash_map::DefaultHasher;

/// Hash a slice of bytes to a deterministic 64-bit value.
pub fn hash_bytes(bytes: &[u8]) -> u64 {
    let mut hasher = DefaultHasher::new();
    hasher.write(bytes);
    hasher.finish()
}

/// Combine (aka add) a hash into an existing hash, returning the new value.
pub fn hash_combine(existing: u64, add: u64) -> u64 {
    existing
        ^ add
            .wrapping_add(0x9e3779b9)
            .wrapping_add(existing << 6)
            .wrapping_add(add >> 2)
}

/// One element of a namespace tuple: an opaque byte vector.
#[derive(Clone, Debug, Default, Eq, PartialEq, Hash)]
pub struct TupleField {
    pub value: Vec<u8>,
}

impl TupleField {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_utf8(s: &str) -> Self {
        Self {
            value: s.as_bytes().to_vec(),
        }
    }

    /// The 64-bit hash of this element's bytes.
    pub fn hash_value(&self) -> u64 {
        hash_bytes(&self.value)
    }
}

impl Decode for TupleField {
    fn decode<R: bytes::Buf>(r: &mut R) -> Result<Self, DecodeError> {
        let size = usize::decode(r)?;
        Self::decode_remaining(r, size)?;
        let mut buf = vec![0; size];
        r.copy_to_slice(&mut buf);
        Ok(Self { value: buf })
    }
}

impl Encode for TupleField {
    fn encode<W: bytes::BufMut>(&self, w: &mut W) -> Result<(), EncodeError> {
        self.value.len().encode(w)?;
        Self::encode_remaining(w, self.value.len())?;
        w.put_slice(&self.value);
        Ok(())
    }
}

/// An ordered tuple of opaque byte vectors naming a group of tracks.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct TrackNamespace {
    pub fields: Vec<TupleField>,
}

impl TrackNamespace {
    pub const MAX_FIELDS: usize = 32;

    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, field: TupleField) {
        self.fields.push(field);
    }

    pub fn clear(&mut self) {
        self.fields.clear();
    }

    pub fn from_utf8_path(path: &str) -> Self {
        let mut tuple = TrackNamespace::new();
        for part in path.split('/') {
            tuple.add(TupleField::from_utf8(part));
        }
        tuple
    }

    pub fn to_utf8_path(&self) -> String {
        let mut path = String::new();
        for field in &self.fields {
            path.push('/');
            path.push_str(&String::from_utf8_lossy(&field.value));
        }
        path
    }

    /// True if every element of `self` equals the corresponding leading element of `other`.
    /// Every namespace is a prefix of itself.
    pub fn is_prefix_of(&self, other: &Self) -> bool {
        self.fields.len() <= other.fields.len()
            && self.fields.iter().zip(&other.fields).all(|(a, b)| a == b)
    }

    /// True if one namespace is a prefix of the other.
    pub fn has_same_prefix(&self, other: &Self) -> bool {
        self.is_prefix_of(other) || other.is_prefix_of(self)
    }

    /// The running hash_combine of the element hashes.
    pub fn hash_value(&self) -> u64 {
        self.fields
            .iter()
            .fold(0, |acc, field| hash_combine(acc, field.hash_value()))
    }
}

impl Hash for TrackNamespace {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.fields.hash(state);
    }
}

impl Decode for TrackNamespace {
    fn decode<R: bytes::Buf>(r: &mut R) -> Result<Self, DecodeError> {
        let count = usize::decode(r)?;
        if count > Self::MAX_FIELDS {
            return Err(DecodeError::FieldBoundsExceeded(
                "TrackNamespace tuples".to_string(),
            ));
        }

        let mut fields = Vec::new();
        for _ in 0..count {
            fields.push(TupleField::decode(r)?);
        }
        Ok(Self { fields })
    }
}

impl Encode for TrackNamespace {
    fn encode<W: bytes::BufMut>(&self, w: &mut W) -> Result<(), EncodeError> {
        if self.fields.len() > Self::MAX_FIELDS {
            return Err(EncodeError::FieldBoundsExceeded(
                "TrackNamespace tuples".to_string(),
            ));
        }
        self.fields.len().encode(w)?;
        for field in &self.fields {
            field.encode(w)?;
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
        let mut buf = BytesMut::new();

        let t = TrackNamespace::from_utf8_path("test/path/to/resource");
        t.encode(&mut buf).unwrap();
        #[rustfmt::skip]
        assert_eq!(buf.to_vec(), vec![
            0x04, // 4 tuple fields
            0x04, 0x74, 0x65, 0x73, 0x74, // "test"
            0x04, 0x70, 0x61, 0x74, 0x68, // "path"
            0x02, 0x74, 0x6f, // "to"
            0x08, 0x72, 0x65, 0x73, 0x6f, 0x75, 0x72, 0x63, 0x65]); // "resource"
        let decoded = TrackNamespace::decode(&mut buf).unwrap();
        assert_eq!(decoded, t);
    }

    #[test]
    fn decode_too_large() {
        let mut data: Vec<u8> = vec![0x00; 256];
        data[0] = (TrackNamespace::MAX_FIELDS + 1) as u8;
        let mut buf: Bytes = data.into();
        let decoded = TrackNamespace::decode(&mut buf);
        assert!(matches!(
            decoded.unwrap_err(),
            DecodeError::FieldBoundsExceeded(_)
        ));
    }

    #[test]
    fn prefix_relations() {
        let a = TrackNamespace::from_utf8_path("example/chat555");
        let b = TrackNamespace::from_utf8_path("example/chat555/user1");
        let c = TrackNamespace::from_utf8_path("example/chat556");

        // Reflexive.
        assert!(a.is_prefix_of(&a));

        assert!(a.is_prefix_of(&b));
        assert!(!b.is_prefix_of(&a));
        assert!(!a.is_prefix_of(&c));
        assert!(!c.is_prefix_of(&b));

        assert!(a.has_same_prefix(&b));
        assert!(b.has_same_prefix(&a));
        assert!(!a.has_same_prefix(&c));

        // Antisymmetric: mutual prefixes are equal.
        let a2 = TrackNamespace::from_utf8_path("example/chat555");
        assert!(a.is_prefix_of(&a2) && a2.is_prefix_of(&a));
        assert_eq!(a, a2);

        // Transitive.
        let d = TrackNamespace::from_utf8_path("example/chat555/user1/dev1");
        assert!(a.is_prefix_of(&b) && b.is_prefix_of(&d));
        assert!(a.is_prefix_of(&d));
    }

    #[test]
    fn hash_stability() {
        let ns = TrackNamespace::from_utf8_path("example/chat555/user1/dev1/time1");

        // The namespace hash is the running combine of element hashes.
        let mut expected = 0u64;
        for field in &ns.fields {
            expected = hash_combine(expected, hash_bytes(&field.value));
        }
        assert_eq!(ns.hash_value(), expected);

        // Equal namespaces hash equal; a different element changes the hash.
        let same = TrackNamespace::from_utf8_path("example/chat555/user1/dev1/time1");
        assert_eq!(ns.hash_value(), same.hash_value());

        let different = TrackNamespace::from_utf8_path("example/chat555/user1/dev1/time2");
        assert_ne!(ns.hash_value(), different.hash_value());
    }
}
