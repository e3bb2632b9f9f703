use crate::coding::{Decode, DecodeError, Encode, EncodeError};

/// Whether an endpoint intends to publish, subscribe, or both.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Role {
    Publisher = 0x1,
    Subscriber = 0x2,
    Both = 0x3,
}

impl Role {
    pub fn is_publisher(&self) -> bool {
        matches!(self, Self::Publisher | Self::Both)
    }

    pub fn is_subscriber(&self) -> bool {
        matches!(self, Self::Subscriber | Self::Both)
    }
}

impl Encode for Role {
    fn encode<W: bytes::BufMut>(&self, w: &mut W) -> Result<(), EncodeError> {
        (*self as u64).encode(w)
    }
}

impl Decode for Role {
    fn decode<R: bytes::Buf>(r: &mut R) -> Result<Self, DecodeError> {
        match u64::decode(r)? {
            0x1 => Ok(Self::Publisher),
            0x2 => Ok(Self::Subscriber),
            0x3 => Ok(Self::Both),
            value => Err(DecodeError::InvalidRole(value)),
        }
    }
}
