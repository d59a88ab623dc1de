//! Wire primitives for the protocol-769 (1.21.4) Minecraft client.
//!
//! This crate is the leaf of the workspace: varint/string encoding, fixed
//! width big-endian primitives, the packed `position` type, and the
//! length-prefixed frame codec used by every higher layer. It intentionally
//! knows nothing about packet ids, connection phases, or chunk formats.

mod buffer;
mod nbt;
mod stream;

use std::borrow::Cow;
use std::io::{self, Read, Write};

use byteorder::{BigEndian, ReadBytesExt, WriteBytesExt};
use thiserror::Error;

#[cfg(feature = "derive")]
pub use mc_protocol_derive::{Decode, Encode};

pub use buffer::Buffer;
pub use nbt::{NbtCompound, NbtError, NbtValue};
pub use stream::FramedStream;

/// Maximum byte length of a protocol string, per the wire spec.
pub const MAX_STRING_BYTES: usize = 131_068;
/// Maximum character length of a protocol string, per the wire spec.
pub const MAX_STRING_CHARS: usize = 32_767;

#[derive(Error, Debug)]
pub enum ProtocolError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
    #[error("VarInt too large")]
    VarIntTooLarge,
    #[error("string too long: {len} > {max}")]
    StringTooLong { len: usize, max: usize },
    #[error("invalid UTF-8 in protocol string: {0}")]
    InvalidUtf8(#[from] std::string::FromUtf8Error),
    #[error("truncated read: wanted {wanted} bytes, had {available}")]
    Truncated { wanted: usize, available: usize },
    #[error("peer closed the connection")]
    PeerClosed,
}

pub type Result<T> = std::result::Result<T, ProtocolError>;

/// A type that can serialize itself onto a writer in wire format.
pub trait Encode {
    fn encode<W: Write>(&self, writer: &mut W) -> Result<()>;
}

/// A type that can deserialize itself from a reader in wire format.
pub trait Decode<'a>: Sized {
    fn decode<R: Read>(reader: &mut R) -> Result<Self>;
}

// --- VarInt ----------------------------------------------------------------

/// Reads a protocol VarInt: up to 5 bytes, 7 data bits per byte, LSB group
/// first, continuation bit in the high bit. Fails after a 6th continuation
/// byte.
pub fn read_varint<R: Read>(reader: &mut R) -> Result<i32> {
    let mut result: i32 = 0;
    let mut shift = 0u32;
    loop {
        let byte = reader.read_u8()?;
        result |= i32::from(byte & 0x7F) << shift;
        if byte & 0x80 == 0 {
            break;
        }
        shift += 7;
        if shift >= 35 {
            return Err(ProtocolError::VarIntTooLarge);
        }
    }
    Ok(result)
}

/// Writes a protocol VarInt. Negative values are reinterpreted as unsigned
/// `x + 2^32` before encoding, matching the protocol's two's-complement
/// convention.
pub fn write_varint<W: Write>(writer: &mut W, value: i32) -> Result<()> {
    let mut value = value as u32;
    loop {
        let mut byte = (value & 0x7F) as u8;
        value >>= 7;
        if value != 0 {
            byte |= 0x80;
        }
        writer.write_u8(byte)?;
        if value == 0 {
            break;
        }
    }
    Ok(())
}

// --- Primitive Encode/Decode -------------------------------------------------

impl Encode for bool {
    fn encode<W: Write>(&self, writer: &mut W) -> Result<()> {
        writer.write_u8(u8::from(*self))?;
        Ok(())
    }
}

impl Decode<'_> for bool {
    fn decode<R: Read>(reader: &mut R) -> Result<Self> {
        Ok(reader.read_u8()? != 0)
    }
}

impl Encode for u8 {
    fn encode<W: Write>(&self, writer: &mut W) -> Result<()> {
        writer.write_u8(*self)?;
        Ok(())
    }
}

impl Decode<'_> for u8 {
    fn decode<R: Read>(reader: &mut R) -> Result<Self> {
        Ok(reader.read_u8()?)
    }
}

impl Encode for i8 {
    fn encode<W: Write>(&self, writer: &mut W) -> Result<()> {
        writer.write_i8(*self)?;
        Ok(())
    }
}

impl Decode<'_> for i8 {
    fn decode<R: Read>(reader: &mut R) -> Result<Self> {
        Ok(reader.read_i8()?)
    }
}

impl Encode for i16 {
    fn encode<W: Write>(&self, writer: &mut W) -> Result<()> {
        writer.write_i16::<BigEndian>(*self)?;
        Ok(())
    }
}

impl Decode<'_> for i16 {
    fn decode<R: Read>(reader: &mut R) -> Result<Self> {
        Ok(reader.read_i16::<BigEndian>()?)
    }
}

impl Encode for u16 {
    fn encode<W: Write>(&self, writer: &mut W) -> Result<()> {
        writer.write_u16::<BigEndian>(*self)?;
        Ok(())
    }
}

impl Decode<'_> for u16 {
    fn decode<R: Read>(reader: &mut R) -> Result<Self> {
        Ok(reader.read_u16::<BigEndian>()?)
    }
}

impl Encode for i32 {
    fn encode<W: Write>(&self, writer: &mut W) -> Result<()> {
        writer.write_i32::<BigEndian>(*self)?;
        Ok(())
    }
}

impl Decode<'_> for i32 {
    fn decode<R: Read>(reader: &mut R) -> Result<Self> {
        Ok(reader.read_i32::<BigEndian>()?)
    }
}

impl Encode for i64 {
    fn encode<W: Write>(&self, writer: &mut W) -> Result<()> {
        writer.write_i64::<BigEndian>(*self)?;
        Ok(())
    }
}

impl Decode<'_> for i64 {
    fn decode<R: Read>(reader: &mut R) -> Result<Self> {
        Ok(reader.read_i64::<BigEndian>()?)
    }
}

impl Encode for f32 {
    fn encode<W: Write>(&self, writer: &mut W) -> Result<()> {
        writer.write_f32::<BigEndian>(*self)?;
        Ok(())
    }
}

impl Decode<'_> for f32 {
    fn decode<R: Read>(reader: &mut R) -> Result<Self> {
        Ok(reader.read_f32::<BigEndian>()?)
    }
}

impl Encode for f64 {
    fn encode<W: Write>(&self, writer: &mut W) -> Result<()> {
        writer.write_f64::<BigEndian>(*self)?;
        Ok(())
    }
}

impl Decode<'_> for f64 {
    fn decode<R: Read>(reader: &mut R) -> Result<Self> {
        Ok(reader.read_f64::<BigEndian>()?)
    }
}

/// A protocol VarInt, as a distinct type for fields that are semantically
/// variable-length rather than fixed-width.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct VarInt(pub i32);

impl Encode for VarInt {
    fn encode<W: Write>(&self, writer: &mut W) -> Result<()> {
        write_varint(writer, self.0)
    }
}

impl Decode<'_> for VarInt {
    fn decode<R: Read>(reader: &mut R) -> Result<Self> {
        Ok(VarInt(read_varint(reader)?))
    }
}

impl From<i32> for VarInt {
    fn from(v: i32) -> Self {
        VarInt(v)
    }
}

impl From<VarInt> for i32 {
    fn from(v: VarInt) -> Self {
        v.0
    }
}

// --- Strings -----------------------------------------------------------------

/// Reads a length-prefixed UTF-8 protocol string, enforcing the byte and
/// character length caps from the wire spec.
pub fn read_utf<R: Read>(reader: &mut R) -> Result<String> {
    let len = read_varint(reader)? as usize;
    if len > MAX_STRING_BYTES {
        return Err(ProtocolError::StringTooLong {
            len,
            max: MAX_STRING_BYTES,
        });
    }
    let mut buf = vec![0u8; len];
    reader.read_exact(&mut buf)?;
    let s = String::from_utf8(buf)?;
    if s.chars().count() > MAX_STRING_CHARS {
        return Err(ProtocolError::StringTooLong {
            len: s.chars().count(),
            max: MAX_STRING_CHARS,
        });
    }
    Ok(s)
}

/// Writes a length-prefixed UTF-8 protocol string.
pub fn write_utf<W: Write>(writer: &mut W, s: &str) -> Result<()> {
    let bytes = s.as_bytes();
    write_varint(writer, bytes.len() as i32)?;
    writer.write_all(bytes)?;
    Ok(())
}

impl Encode for str {
    fn encode<W: Write>(&self, writer: &mut W) -> Result<()> {
        write_utf(writer, self)
    }
}

impl Encode for String {
    fn encode<W: Write>(&self, writer: &mut W) -> Result<()> {
        write_utf(writer, self.as_str())
    }
}

impl Decode<'_> for String {
    fn decode<R: Read>(reader: &mut R) -> Result<Self> {
        read_utf(reader)
    }
}

impl<'a> Encode for Cow<'a, str> {
    fn encode<W: Write>(&self, writer: &mut W) -> Result<()> {
        write_utf(writer, self.as_ref())
    }
}

// --- Option<T> / Vec<T> ------------------------------------------------------

impl<T: Encode> Encode for Option<T> {
    fn encode<W: Write>(&self, writer: &mut W) -> Result<()> {
        match self {
            Some(v) => {
                true.encode(writer)?;
                v.encode(writer)
            }
            None => false.encode(writer),
        }
    }
}

impl<'a, T: Decode<'a>> Decode<'a> for Option<T> {
    fn decode<R: Read>(reader: &mut R) -> Result<Self> {
        if bool::decode(reader)? {
            Ok(Some(T::decode(reader)?))
        } else {
            Ok(None)
        }
    }
}

impl<T: Encode> Encode for Vec<T> {
    fn encode<W: Write>(&self, writer: &mut W) -> Result<()> {
        write_varint(writer, self.len() as i32)?;
        for item in self {
            item.encode(writer)?;
        }
        Ok(())
    }
}

impl<'a, T: Decode<'a>> Decode<'a> for Vec<T> {
    fn decode<R: Read>(reader: &mut R) -> Result<Self> {
        let len = read_varint(reader)? as usize;
        let mut vec = Vec::with_capacity(len.min(1 << 16));
        for _ in 0..len {
            vec.push(T::decode(reader)?);
        }
        Ok(vec)
    }
}

// --- Uuid ---------------------------------------------------------------------

/// A 128-bit player/entity UUID, sent as two big-endian u64 halves.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Uuid(pub u128);

impl Encode for Uuid {
    fn encode<W: Write>(&self, writer: &mut W) -> Result<()> {
        writer.write_u64::<BigEndian>((self.0 >> 64) as u64)?;
        writer.write_u64::<BigEndian>(self.0 as u64)?;
        Ok(())
    }
}

impl Decode<'_> for Uuid {
    fn decode<R: Read>(reader: &mut R) -> Result<Self> {
        let high = u128::from(reader.read_u64::<BigEndian>()?);
        let low = u128::from(reader.read_u64::<BigEndian>()?);
        Ok(Uuid((high << 64) | low))
    }
}

// --- Position -------------------------------------------------------------

/// A packed block position: `x = val >> 38`, `y = (val << 52) >> 52`
/// (sign-extended 12 bits), `z = (val << 26) >> 38` (sign-extended 26 bits).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Position {
    pub x: i32,
    pub y: i16,
    pub z: i32,
}

impl Encode for Position {
    fn encode<W: Write>(&self, writer: &mut W) -> Result<()> {
        let packed = ((i64::from(self.x) & 0x3FF_FFFF) << 38)
            | ((i64::from(self.z) & 0x3FF_FFFF) << 12)
            | (i64::from(self.y) & 0xFFF);
        writer.write_i64::<BigEndian>(packed)?;
        Ok(())
    }
}

impl Decode<'_> for Position {
    fn decode<R: Read>(reader: &mut R) -> Result<Self> {
        let packed = reader.read_i64::<BigEndian>()?;
        let x = (packed >> 38) as i32;
        let y = (packed << 52 >> 52) as i16;
        let z = (packed << 26 >> 38) as i32;
        Ok(Position { x, y, z })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn roundtrip_varint(n: i32) -> Vec<u8> {
        let mut buf = Vec::new();
        write_varint(&mut buf, n).unwrap();
        assert_eq!(read_varint(&mut buf.as_slice()).unwrap(), n);
        buf
    }

    #[test]
    fn varint_known_encodings() {
        assert_eq!(roundtrip_varint(0), vec![0x00]);
        assert_eq!(roundtrip_varint(1), vec![0x01]);
        assert_eq!(roundtrip_varint(127), vec![0x7f]);
        assert_eq!(roundtrip_varint(128), vec![0x80, 0x01]);
        assert_eq!(roundtrip_varint(255), vec![0xff, 0x01]);
        assert_eq!(
            roundtrip_varint(2_147_483_647),
            vec![0xff, 0xff, 0xff, 0xff, 0x07]
        );
        assert_eq!(roundtrip_varint(-1), vec![0xff, 0xff, 0xff, 0xff, 0x0f]);
        assert_eq!(
            roundtrip_varint(-2_147_483_648),
            vec![0x80, 0x80, 0x80, 0x80, 0x08]
        );
    }

    #[test]
    fn varint_roundtrip_is_total_over_i32() {
        for n in [
            0,
            1,
            -1,
            42,
            -42,
            i32::MAX,
            i32::MIN,
            i32::MAX / 2,
            i32::MIN / 2,
        ] {
            let mut buf = Vec::new();
            write_varint(&mut buf, n).unwrap();
            assert_eq!(read_varint(&mut buf.as_slice()).unwrap(), n);
        }
    }

    #[test]
    fn varint_too_large_fails() {
        let bytes = [0xff, 0xff, 0xff, 0xff, 0xff, 0xff];
        let err = read_varint(&mut &bytes[..]).unwrap_err();
        assert!(matches!(err, ProtocolError::VarIntTooLarge));
    }

    #[test]
    fn utf_roundtrip() {
        let s = "hello, world! \u{1F980}";
        let mut buf = Vec::new();
        write_utf(&mut buf, s).unwrap();
        let decoded = read_utf(&mut buf.as_slice()).unwrap();
        assert_eq!(decoded, s);
    }

    #[test]
    fn utf_rejects_oversize_length() {
        let mut buf = Vec::new();
        write_varint(&mut buf, (MAX_STRING_BYTES + 1) as i32).unwrap();
        buf.extend(std::iter::repeat(b'a').take(MAX_STRING_BYTES + 1));
        let err = read_utf(&mut buf.as_slice()).unwrap_err();
        assert!(matches!(err, ProtocolError::StringTooLong { .. }));
    }

    #[test]
    fn position_roundtrip_example_from_spec() {
        let packed: i64 = 0x0000_0001_8000_0001u64 as i64;
        let pos = Position::decode(&mut &packed.to_be_bytes()[..]).unwrap();
        assert_eq!(
            pos,
            Position {
                x: 0,
                y: 1,
                z: -32768
            }
        );
    }

    #[test]
    fn position_roundtrip_arbitrary() {
        let pos = Position { x: 7, y: -3, z: 42 };
        let mut buf = Vec::new();
        pos.encode(&mut buf).unwrap();
        let decoded = Position::decode(&mut buf.as_slice()).unwrap();
        assert_eq!(decoded, pos);
    }

    #[test]
    fn uuid_roundtrip() {
        let uuid = Uuid(0xde60_78a8_56ec_4cf9_b883_2a46_025a_e261);
        let mut buf = Vec::new();
        uuid.encode(&mut buf).unwrap();
        let decoded = Uuid::decode(&mut buf.as_slice()).unwrap();
        assert_eq!(decoded, uuid);
    }
}
