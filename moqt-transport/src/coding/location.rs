use crate::coding::{Decode, DecodeError, Encode, EncodeError};

/// A (group, object) pair, ordered group-first.
#[derive(Default, Debug, Clone, Copy, Eq, PartialEq, Ord, PartialOrd)]
pub struct Location {
    pub group_id: u64,
    pub object_id: u64,
}

impl Location {
    pub fn new(group_id: u64, object_id: u64) -> Self {
        Self {
            group_id,
            object_id,
        }
    }
}

impl Decode for Location {
    fn decode<R: bytes::Buf>(r: &mut R) -> Result<Self, DecodeError> {
        let group_id = u64::decode(r)?;
        let object_id = u64::decode(r)?;
        Ok(Location::new(group_id, object_id))
    }
}

impl Encode for Location {
    fn encode<W: bytes::BufMut>(&self, w: &mut W) -> Result<(), EncodeError> {
        self.group_id.encode(w)?;
        self.object_id.encode(w)?;
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

        let loc = Location::new(12345, 67890);
        loc.encode(&mut buf).unwrap();

        #[rustfmt::skip]
        assert_eq!(
            buf.to_vec(),
            vec![
                0x70, 0x39, // 12345
                0x80, 0x01, 0x09, 0x32 // 67890
            ]
        );
        assert_eq!(Location::decode(&mut buf).unwrap(), loc);
    }

    #[test]
    fn ordering_is_group_first() {
        assert!(Location::new(1, 2) < Location::new(1, 5));
        assert!(Location::new(1, 5) < Location::new(2, 1));
        assert!(Location::new(2, 1) < Location::new(2, 2));
        assert!(Location::new(2, 6) == Location::new(2, 6));
    }
}
