//! Minimal network NBT *reading*. This client never sends NBT, so there is
//! no writer here — only enough of a reader to pull heightmaps back out of
//! chunk data packets.
//!
//! Network NBT omits the root compound's name, so the very first byte on
//! the wire is the root's type tag (always `0x0a`, TAG_Compound) with
//! nothing else to skip. This reader intentionally mirrors a quirk of the
//! implementation it was ported from: each child tag's header is read as
//! two bytes where only the first is used as the type id and the second is
//! discarded rather than treated as the start of a name length. That matches
//! what the server actually puts on the wire for the handful of tags this
//! client cares about (heightmap compounds never name their children in a
//! way this reader would need), so replicating it is harmless and keeps this
//! reader symmetric with the format it was derived from.

use std::io::Read;

use thiserror::Error;

use crate::{read_utf, ProtocolError};

#[derive(Error, Debug)]
pub enum NbtError {
    #[error(transparent)]
    Protocol(#[from] ProtocolError),
    #[error("expected TAG_Compound (0x0a) at NBT root, found {0:#04x}")]
    NotACompound(u8),
    #[error("unhandled NBT tag id {0:#04x}")]
    UnhandledTag(u8),
}

/// A decoded NBT value, restricted to the tag types this client ever reads.
#[derive(Debug, Clone, PartialEq)]
pub enum NbtValue {
    String(String),
    LongArray(Vec<i64>),
    Compound(NbtCompound),
}

/// An NBT compound: an ordered list of child values. Child names are read
/// off the wire but not retained, matching the minimal reader this is
/// modeled on.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct NbtCompound {
    values: Vec<NbtValue>,
}

impl NbtCompound {
    #[must_use]
    pub fn values(&self) -> &[NbtValue] {
        &self.values
    }

    /// The first `LongArray` child, if any — the shape every heightmap
    /// compound this client reads actually takes.
    #[must_use]
    pub fn first_long_array(&self) -> Option<&[i64]> {
        self.values.iter().find_map(|v| match v {
            NbtValue::LongArray(arr) => Some(arr.as_slice()),
            _ => None,
        })
    }

    /// The first `String` child, if any — used to pull the human-readable
    /// reason out of a Play disconnect packet's NBT body.
    #[must_use]
    pub fn first_string(&self) -> Option<&str> {
        self.values.iter().find_map(|v| match v {
            NbtValue::String(s) => Some(s.as_str()),
            _ => None,
        })
    }

    /// Reads a root-level network NBT compound: one byte asserting
    /// TAG_Compound, then child tags until TAG_End.
    pub fn read<R: Read>(reader: &mut R) -> Result<Self, NbtError> {
        let mut tag = [0u8; 1];
        reader.read_exact(&mut tag).map_err(ProtocolError::Io)?;
        if tag[0] != TAG_COMPOUND {
            return Err(NbtError::NotACompound(tag[0]));
        }
        Self::read_children(reader)
    }

    fn read_children<R: Read>(reader: &mut R) -> Result<Self, NbtError> {
        let mut values = Vec::new();
        loop {
            let mut header = [0u8; 2];
            if reader.read_exact(&mut header).is_err() {
                break;
            }
            let tag = header[0];
            match tag {
                TAG_END => break,
                TAG_STRING => {
                    values.push(NbtValue::String(read_utf(reader)?));
                }
                TAG_LONG_ARRAY => {
                    let _name = read_utf(reader)?;
                    let mut len_bytes = [0u8; 4];
                    reader.read_exact(&mut len_bytes).map_err(ProtocolError::Io)?;
                    let len = u32::from_be_bytes(len_bytes) as usize;
                    let mut longs = Vec::with_capacity(len.min(1 << 16));
                    for _ in 0..len {
                        let mut long_bytes = [0u8; 8];
                        reader
                            .read_exact(&mut long_bytes)
                            .map_err(ProtocolError::Io)?;
                        longs.push(i64::from_be_bytes(long_bytes));
                    }
                    values.push(NbtValue::LongArray(longs));
                }
                TAG_COMPOUND => {
                    values.push(NbtValue::Compound(Self::read_children(reader)?));
                }
                other => return Err(NbtError::UnhandledTag(other)),
            }
        }
        Ok(NbtCompound { values })
    }
}

const TAG_END: u8 = 0x00;
const TAG_STRING: u8 = 0x08;
const TAG_COMPOUND: u8 = 0x0a;
const TAG_LONG_ARRAY: u8 = 0x0c;

#[cfg(test)]
mod tests {
    use super::*;

    fn long_array_compound_bytes(name: &str, longs: &[i64]) -> Vec<u8> {
        let mut buf = vec![TAG_COMPOUND];
        buf.push(TAG_LONG_ARRAY);
        buf.push(0); // discarded second header byte
        crate::write_utf(&mut buf, name).unwrap();
        buf.extend_from_slice(&(longs.len() as u32).to_be_bytes());
        for l in longs {
            buf.extend_from_slice(&l.to_be_bytes());
        }
        buf.push(TAG_END);
        buf.push(0); // discarded second header byte of the end tag
        buf
    }

    #[test]
    fn reads_a_long_array_heightmap_compound() {
        let longs = [1i64, -2, 3, i64::MAX];
        let bytes = long_array_compound_bytes("WORLD_SURFACE", &longs);
        let compound = NbtCompound::read(&mut bytes.as_slice()).unwrap();
        assert_eq!(compound.first_long_array(), Some(&longs[..]));
    }

    #[test]
    fn rejects_non_compound_root() {
        let bytes = [TAG_STRING, 0x00];
        let err = NbtCompound::read(&mut &bytes[..]).unwrap_err();
        assert!(matches!(err, NbtError::NotACompound(TAG_STRING)));
    }

    #[test]
    fn first_string_finds_a_string_child_among_others() {
        let mut bytes = vec![TAG_COMPOUND];
        bytes.push(TAG_LONG_ARRAY);
        bytes.push(0);
        crate::write_utf(&mut bytes, "MOTION_BLOCKING").unwrap();
        bytes.extend_from_slice(&0u32.to_be_bytes());
        bytes.push(TAG_STRING);
        bytes.push(0);
        crate::write_utf(&mut bytes, "Server closed").unwrap();
        bytes.push(TAG_END);
        bytes.push(0);

        let compound = NbtCompound::read(&mut bytes.as_slice()).unwrap();
        assert_eq!(compound.first_string(), Some("Server closed"));
    }

    #[test]
    fn empty_compound_is_just_the_end_tag() {
        let bytes = vec![TAG_COMPOUND, TAG_END, 0x00];
        let compound = NbtCompound::read(&mut bytes.as_slice()).unwrap();
        assert!(compound.values().is_empty());
    }
}
