//! Paletted container decode: `<bits_per_entry><palette><data_len><longs>`.

use mc_protocol::Buffer;

use crate::{decode_long, ChunkError};

/// A decoded paletted container, resolved to global registry ids. Holds
/// `expected_entries` cells: `SECTION_VOLUME` (4096) for a block container,
/// `BIOME_VOLUME` (64) for a biome container — the two share the wire
/// format but not the grid size.
#[derive(Debug, Clone)]
pub struct PalettedContainer {
    /// Global ids, one per cell, in `y*256 + z*16 + x` order for blocks (a
    /// coarser 4x4x4 raster order for biomes).
    pub entries: Vec<i32>,
    /// The raw palette values as they appeared on the wire (kept for
    /// diagnostics; biome containers never resolve these further).
    pub palette: Vec<i32>,
}

impl PalettedContainer {
    /// Reads one paletted container expected to hold exactly
    /// `expected_entries` cells. `bits_per_entry >= 9` fails with
    /// `UnsupportedPalette`, since direct palettes are not implemented.
    pub fn read(buf: &mut Buffer, expected_entries: usize) -> Result<Self, ChunkError> {
        let bits_per_entry: u8 = buf.read()?;
        let palette = read_palette(bits_per_entry, buf)?;
        let data_len = buf.read_varint()? as usize;

        let entries = if bits_per_entry == 0 {
            vec![palette[0]; expected_entries]
        } else {
            let mut local_indices = Vec::with_capacity(expected_entries);
            for _ in 0..data_len {
                let long: i64 = buf.read()?;
                local_indices.extend(decode_long(bits_per_entry, long as u64));
            }
            if local_indices.len() != expected_entries {
                return Err(ChunkError::SectionEntryCountMismatch {
                    found: local_indices.len(),
                    expected: expected_entries,
                });
            }
            local_indices
                .into_iter()
                .map(|index| palette[index as usize])
                .collect()
        };

        Ok(PalettedContainer { entries, palette })
    }
}

fn read_palette(bits_per_entry: u8, buf: &mut Buffer) -> Result<Vec<i32>, ChunkError> {
    match bits_per_entry {
        0 => Ok(vec![buf.read_varint()?]),
        1..=8 => {
            let len = buf.read_varint()? as usize;
            let mut palette = Vec::with_capacity(len);
            for _ in 0..len {
                palette.push(buf.read_varint()?);
            }
            Ok(palette)
        }
        other => Err(ChunkError::UnsupportedPalette(other)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{BIOME_VOLUME, SECTION_VOLUME};

    #[test]
    fn single_value_palette_fills_every_entry() {
        let mut buf = Buffer::new(vec![0x00, 0x01, 0x00]);
        let container = PalettedContainer::read(&mut buf, SECTION_VOLUME).unwrap();
        assert_eq!(container.entries.len(), SECTION_VOLUME);
        assert!(container.entries.iter().all(|&id| id == 1));
    }

    #[test]
    fn indirect_bpe4_resolves_through_palette() {
        let mut data = vec![0x04u8]; // bits_per_entry
        mc_protocol::write_varint(&mut data, 3).unwrap(); // palette_len = 3
        for v in [10, 20, 30] {
            mc_protocol::write_varint(&mut data, v).unwrap();
        }
        mc_protocol::write_varint(&mut data, 256).unwrap(); // data_len -- 256 longs of bpe=4 -> 4096 entries
        let mut longs = Vec::new();
        longs.extend_from_slice(&0x0000_0000_0000_0210i64.to_be_bytes());
        for _ in 1..256 {
            longs.extend_from_slice(&0i64.to_be_bytes());
        }
        data.extend(longs);

        let mut buf = Buffer::new(data);
        let container = PalettedContainer::read(&mut buf, SECTION_VOLUME).unwrap();
        assert_eq!(container.entries.len(), SECTION_VOLUME);
        assert_eq!(
            &container.entries[..4],
            &[10, 20, 30, 10]
        );
        assert!(container.entries[4..16].iter().all(|&id| id == 10));
    }

    #[test]
    fn indirect_biome_palette_resolves_at_64_entries_not_4096() {
        // bpe=2 (within the 1..=3 biome range), palette of 2 biome ids, one
        // data long holding floor(64/2)=32 entries -> two longs for 64 total.
        let mut data = vec![0x02u8]; // bits_per_entry
        mc_protocol::write_varint(&mut data, 2).unwrap(); // palette_len = 2
        for v in [5, 9] {
            mc_protocol::write_varint(&mut data, v).unwrap();
        }
        mc_protocol::write_varint(&mut data, 2).unwrap(); // data_len -- 2 longs of bpe=2 -> 64 entries
        data.extend_from_slice(&0b01i64.to_be_bytes()); // entry 0 = 1 -> biome id 9
        data.extend_from_slice(&0i64.to_be_bytes());

        let mut buf = Buffer::new(data);
        let container = PalettedContainer::read(&mut buf, BIOME_VOLUME).unwrap();
        assert_eq!(container.entries.len(), BIOME_VOLUME);
        assert_eq!(container.entries[0], 9);
        assert!(container.entries[1..].iter().all(|&id| id == 5));
    }

    #[test]
    fn direct_palette_is_rejected() {
        let mut buf = Buffer::new(vec![0x09, 0x00]);
        let err = PalettedContainer::read(&mut buf, SECTION_VOLUME).unwrap_err();
        assert!(matches!(err, ChunkError::UnsupportedPalette(9)));
    }

    #[test]
    fn mismatched_entry_count_is_an_error() {
        let mut data = vec![0x04u8, 0x01, 10, 0x01];
        data.extend_from_slice(&0i64.to_be_bytes());
        let mut buf = Buffer::new(data);
        let err = PalettedContainer::read(&mut buf, SECTION_VOLUME).unwrap_err();
        assert!(matches!(err, ChunkError::SectionEntryCountMismatch { .. }));
    }
}
