//! Chunk column decoding: paletted containers, bit-packed long arrays,
//! heightmaps, and the 24-section overworld chunk column.

mod heightmap;
mod palette;
mod section;

use mc_data::BlockRegistry;
use mc_protocol::{Buffer, NbtCompound, NbtError, ProtocolError};
use thiserror::Error;

pub use heightmap::Heightmap;
pub use palette::PalettedContainer;
pub use section::ChunkSection;

pub const SECTIONS_PER_COLUMN: usize = 24;
pub const SECTION_VOLUME: usize = 16 * 16 * 16;
/// Biome entries per section: a 4x4x4 grid, one entry per 4-block cube.
pub const BIOME_VOLUME: usize = 4 * 4 * 4;

#[derive(Error, Debug)]
pub enum ChunkError {
    #[error(transparent)]
    Protocol(#[from] ProtocolError),
    #[error("invalid heightmap NBT: {0}")]
    InvalidNbt(#[from] NbtError),
    #[error("unsupported palette: bits_per_entry={0} (direct palettes are not implemented)")]
    UnsupportedPalette(u8),
    #[error("chunk section produced {found} entries, expected {expected}")]
    SectionEntryCountMismatch { found: usize, expected: usize },
}

/// A fully decoded chunk column: 24 vertically stacked 16x16x16 sections,
/// identified by `(chunk_x, chunk_z)`.
#[derive(Debug, Clone)]
pub struct Chunk {
    pub chunk_x: i32,
    pub chunk_z: i32,
    pub heightmaps: NbtCompound,
    pub sections: Vec<ChunkSection>,
}

impl Chunk {
    /// Looks up the resolved global block id at column-local coordinates.
    /// `x` and `z` are in `0..16`; `y` is the world-space y coordinate,
    /// covering the 24-section overworld range `-64..320`.
    #[must_use]
    pub fn block_at(&self, x: usize, y: i32, z: usize) -> Option<i32> {
        let section_index = usize::try_from((y + 64) / 16).ok()?;
        let section = self.sections.get(section_index)?;
        let local_y = usize::try_from((y + 64).rem_euclid(16)).ok()?;
        Some(section.block_at(x, local_y, z))
    }

    /// Decodes the first `TAG_Long_Array` heightmap found in this column's
    /// NBT compound (in practice the server's first child is
    /// `MOTION_BLOCKING`).
    #[must_use]
    pub fn heightmap(&self) -> Option<Heightmap> {
        self.heightmaps
            .first_long_array()
            .map(Heightmap::decode)
    }
}

/// Reads one full chunk column from `buf`: coordinates, heightmap NBT, the
/// data-section length prefix, and 24 chunk sections. Trailing block-entity
/// and lighting bytes are left unread; the caller discards the remainder of
/// the frame.
pub fn read_chunk(registry: &BlockRegistry, buf: &mut Buffer) -> Result<Chunk, ChunkError> {
    let chunk_x: i32 = buf.read()?;
    let chunk_z: i32 = buf.read()?;

    let heightmaps = NbtCompound::read(buf)?;

    let _data_section_len = buf.read_varint()?;

    let mut sections = Vec::with_capacity(SECTIONS_PER_COLUMN);
    for _ in 0..SECTIONS_PER_COLUMN {
        sections.push(section::read_section(registry, buf)?);
    }

    tracing::debug!(chunk_x, chunk_z, "decoded chunk column");

    Ok(Chunk {
        chunk_x,
        chunk_z,
        heightmaps,
        sections,
    })
}

/// Decodes a single bit-packed long into its entries, least-significant
/// bits first. Padding bits at the top of the long (`64 mod bits_per_entry`)
/// are discarded and never carried into the next long.
pub(crate) fn decode_long(bits_per_entry: u8, mut value: u64) -> Vec<u32> {
    let mut remaining_bits = 64u32;
    let bpe = u32::from(bits_per_entry);
    let mask = (1u64 << bpe) - 1;
    let mut entries = Vec::with_capacity((64 / bpe.max(1)) as usize);
    while remaining_bits >= bpe {
        entries.push((value & mask) as u32);
        value >>= bpe;
        remaining_bits -= bpe;
    }
    entries
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decode_long_splits_lsb_first_with_no_cross_long_carry() {
        // bpe=4, long=0x0000_0000_0000_0210 -> entries [0,1,2,0,0,...]
        let entries = decode_long(4, 0x0000_0000_0000_0210);
        assert_eq!(entries.len(), 16);
        assert_eq!(&entries[..4], &[0, 1, 2, 0]);
        assert!(entries[4..].iter().all(|&e| e == 0));
    }
}
