// Variable-length integers as defined by the QUIC wire format.
// The two high bits of the first byte select a 1, 2, 4 or 8 byte encoding.

use std::convert::TryFrom;
use std::fmt;

use super::{Decode, DecodeError, Encode, EncodeError};

/// A value was larger than the maximum representable varint (2^62 - 1).
#[derive(thiserror::Error, Debug, Clone, Copy, Eq, PartialEq)]
#[error("value too large for varint encoding")]
pub struct BoundsExceeded;

/// An integer less than 2^62.
///
/// Values of this type are suitable for encoding as QUIC variable-length integers.
#[derive(Default, Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct VarInt(u64);

impl VarInt {
    pub const ZERO: VarInt = VarInt(0);

    /// The largest representable value.
    pub const MAX: VarInt = VarInt((1 << 62) - 1);

    /// Construct from a u32, which always fits.
    pub const fn from_u32(x: u32) -> Self {
        VarInt(x as u64)
    }

    /// Extract the integer value.
    pub const fn into_inner(self) -> u64 {
        self.0
    }

    /// The number of bytes this value occupies on the wire.
    pub const fn size(self) -> usize {
        match self.0 {
            0..=0x3f => 1,
            0x40..=0x3fff => 2,
            0x4000..=0x3fff_ffff => 4,
            _ => 8,
        }
    }

    /// The total encoded length implied by the first byte alone.
    pub const fn size_from_first_byte(b: u8) -> usize {
        match b >> 6 {
            0b00 => 1,
            0b01 => 2,
            0b10 => 4,
            _ => 8,
        }
    }
}

impl From<VarInt> for u64 {
    fn from(x: VarInt) -> Self {
        x.0
    }
}

impl From<u8> for VarInt {
    fn from(x: u8) -> Self {
        VarInt(x.into())
    }
}

impl From<u16> for VarInt {
    fn from(x: u16) -> Self {
        VarInt(x.into())
    }
}

impl From<u32> for VarInt {
    fn from(x: u32) -> Self {
        VarInt(x.into())
    }
}

impl TryFrom<u64> for VarInt {
    type Error = BoundsExceeded;

    fn try_from(x: u64) -> Result<Self, BoundsExceeded> {
        if x <= Self::MAX.0 {
            Ok(VarInt(x))
        } else {
            Err(BoundsExceeded)
        }
    }
}

impl TryFrom<usize> for VarInt {
    type Error = BoundsExceeded;

    fn try_from(x: usize) -> Result<Self, BoundsExceeded> {
        VarInt::try_from(x as u64)
    }
}

impl TryFrom<VarInt> for u32 {
    type Error = BoundsExceeded;

    fn try_from(x: VarInt) -> Result<Self, BoundsExceeded> {
        u32::try_from(x.0).map_err(|_| BoundsExceeded)
    }
}

impl fmt::Debug for VarInt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl fmt::Display for VarInt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl Decode for VarInt {
    fn decode<B: bytes::Buf>(r: &mut B) -> Result<Self, DecodeError> {
        Self::decode_remaining(r, 1)?;
        let b = r.get_u8();

        match b >> 6 {
            0b00 => Ok(VarInt(b as u64)),
            0b01 => {
                Self::decode_remaining(r, 1)?;
                let x = ((b as u64 & 0x3f) << 8) | r.get_u8() as u64;
                Ok(VarInt(x))
            }
            0b10 => {
                Self::decode_remaining(r, 3)?;
                let mut x = b as u64 & 0x3f;
                for _ in 0..3 {
                    x = (x << 8) | r.get_u8() as u64;
                }
                Ok(VarInt(x))
            }
            _ => {
                Self::decode_remaining(r, 7)?;
                let mut x = b as u64 & 0x3f;
                for _ in 0..7 {
                    x = (x << 8) | r.get_u8() as u64;
                }
                Ok(VarInt(x))
            }
        }
    }
}

impl Encode for VarInt {
    fn encode<W: bytes::BufMut>(&self, w: &mut W) -> Result<(), EncodeError> {
        let x = self.0;
        match self.size() {
            1 => {
                Self::encode_remaining(w, 1)?;
                w.put_u8(x as u8);
            }
            2 => {
                Self::encode_remaining(w, 2)?;
                w.put_u16(x as u16 | 0x4000);
            }
            4 => {
                Self::encode_remaining(w, 4)?;
                w.put_u32(x as u32 | 0x8000_0000);
            }
            _ => {
                Self::encode_remaining(w, 8)?;
                w.put_u64(x | 0xc000_0000_0000_0000);
            }
        }

        Ok(())
    }
}

impl Decode for u64 {
    fn decode<B: bytes::Buf>(r: &mut B) -> Result<Self, DecodeError> {
        Ok(VarInt::decode(r)?.into_inner())
    }
}

impl Encode for u64 {
    fn encode<W: bytes::BufMut>(&self, w: &mut W) -> Result<(), EncodeError> {
        VarInt::try_from(*self)?.encode(w)
    }
}

impl Decode for usize {
    fn decode<B: bytes::Buf>(r: &mut B) -> Result<Self, DecodeError> {
        Ok(VarInt::decode(r)?.into_inner() as usize)
    }
}

impl Encode for usize {
    fn encode<W: bytes::BufMut>(&self, w: &mut W) -> Result<(), EncodeError> {
        VarInt::try_from(*self)?.encode(w)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::{Bytes, BytesMut};

    const VALUE_1BYTE: u64 = 0x12;
    const VALUE_2BYTE: u64 = 0x1234;
    const VALUE_4BYTE: u64 = 0x123456;
    const VALUE_8BYTE: u64 = 0x123456789;

    #[test]
    fn encode_known_values() {
        let cases: &[(u64, &[u8])] = &[
            (VALUE_1BYTE, &[0x12]),
            (VALUE_2BYTE, &[0x52, 0x34]),
            (VALUE_4BYTE, &[0x80, 0x12, 0x34, 0x56]),
            (VALUE_8BYTE, &[0xC0, 0, 0, 0x1, 0x23, 0x45, 0x67, 0x89]),
        ];

        for (value, expected) in cases {
            let mut buf = BytesMut::new();
            value.encode(&mut buf).unwrap();
            assert_eq!(buf.to_vec(), *expected);

            let decoded = u64::decode(&mut buf).unwrap();
            assert_eq!(decoded, *value);
        }
    }

    #[test]
    fn round_trip_boundaries() {
        // Boundaries of each encoded width.
        let values = [
            0u64,
            0x3f,
            0x40,
            0x3fff,
            0x4000,
            0x3fff_ffff,
            0x4000_0000,
            (1 << 62) - 1,
        ];
        let sizes = [1, 1, 2, 2, 4, 4, 8, 8];

        for (value, size) in values.iter().zip(sizes) {
            let mut buf = BytesMut::new();
            value.encode(&mut buf).unwrap();
            assert_eq!(buf.len(), size, "value {:#x}", value);
            assert_eq!(u64::decode(&mut buf).unwrap(), *value);
        }
    }

    #[test]
    fn size_from_first_byte() {
        for value in [VALUE_1BYTE, VALUE_2BYTE, VALUE_4BYTE, VALUE_8BYTE] {
            let mut buf = BytesMut::new();
            value.encode(&mut buf).unwrap();
            assert_eq!(VarInt::size_from_first_byte(buf[0]), buf.len());
            assert_eq!(VarInt::try_from(value).unwrap().size(), buf.len());
        }
    }

    #[test]
    fn decode_truncated() {
        // An empty buffer needs at least one byte.
        let mut buf = Bytes::new();
        assert!(matches!(
            VarInt::decode(&mut buf).unwrap_err(),
            DecodeError::More(1)
        ));

        // A 4-byte encoding missing its tail.
        let mut buf = Bytes::from_static(&[0x80, 0x12]);
        assert!(matches!(
            VarInt::decode(&mut buf).unwrap_err(),
            DecodeError::More(_)
        ));
    }

    #[test]
    fn encode_out_of_range() {
        let mut buf = BytesMut::new();
        let encoded = u64::MAX.encode(&mut buf);
        assert!(matches!(
            encoded.unwrap_err(),
            EncodeError::BoundsExceeded(_)
        ));
    }
}
