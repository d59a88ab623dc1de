//! Heightmap decode: a long array of 9-bit entries (`height + 64`), stored
//! row-major (z outer, x inner) over a 16x16 grid.

use crate::decode_long;

/// Bits needed per entry for a world height of 256 (`ceil(log2(256+1))`).
const HEIGHTMAP_BITS_PER_ENTRY: u8 = 9;
/// World bottom offset: a stored entry of `0` means y = -64.
const WORLD_BOTTOM: i32 = -64;

/// A decoded 16x16 heightmap, one entry per `(x, z)` column.
#[derive(Debug, Clone)]
pub struct Heightmap {
    heights: Vec<i32>,
}

impl Heightmap {
    /// Decodes a heightmap's long array into world-space heights.
    #[must_use]
    pub fn decode(longs: &[i64]) -> Self {
        let mut heights = Vec::with_capacity(256);
        for &long in longs {
            heights.extend(
                decode_long(HEIGHTMAP_BITS_PER_ENTRY, long as u64)
                    .into_iter()
                    .map(|entry| entry as i32 + WORLD_BOTTOM),
            );
        }
        heights.truncate(256);
        Heightmap { heights }
    }

    /// The height at column `(x, z)`, each in `0..16`.
    #[must_use]
    pub fn height_at(&self, x: usize, z: usize) -> i32 {
        self.heights[z * 16 + x]
    }
}
