//! Tile to chunk addressing.
//!
//! Chunks are square blocks of `2^chunk_shift` tiles per side, so splitting an
//! absolute tile coordinate is a shift and a mask. `>>` on `i32` is an
//! arithmetic shift, which floors toward negative infinity: tile -1 lands in
//! chunk -1 at inner offset `dimension - 1`, not in chunk 0.
//!
//! The layer (`z`) is not chunked; a chunk's z is the tile z.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkLayout {
    chunk_shift: u32,
    chunk_mask: i32,
    chunk_dimension: i32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ChunkPosition {
    pub chunk_x: i32,
    pub chunk_y: i32,
    pub chunk_z: i32,
    pub inner_x: i32,
    pub inner_y: i32,
}

impl ChunkLayout {
    pub const MAX_SHIFT: u32 = 8;

    pub fn new(chunk_shift: u32) -> Self {
        let chunk_shift = chunk_shift.clamp(1, Self::MAX_SHIFT);
        let chunk_dimension = 1i32 << chunk_shift;
        Self {
            chunk_shift,
            chunk_mask: chunk_dimension - 1,
            chunk_dimension,
        }
    }

    pub fn shift(&self) -> u32 {
        self.chunk_shift
    }

    pub fn mask(&self) -> i32 {
        self.chunk_mask
    }

    pub fn dimension(&self) -> i32 {
        self.chunk_dimension
    }

    pub fn tiles_per_chunk(&self) -> usize {
        let dimension = self.chunk_dimension as usize;
        dimension * dimension
    }

    pub fn chunk_position_of(&self, tile_x: i32, tile_y: i32, tile_z: i32) -> ChunkPosition {
        ChunkPosition {
            chunk_x: tile_x >> self.chunk_shift,
            chunk_y: tile_y >> self.chunk_shift,
            chunk_z: tile_z,
            inner_x: tile_x & self.chunk_mask,
            inner_y: tile_y & self.chunk_mask,
        }
    }

    /// Chunk coordinate containing `tile` along one horizontal axis.
    pub fn chunk_coord(&self, tile: i32) -> i32 {
        tile >> self.chunk_shift
    }
}

impl Default for ChunkLayout {
    fn default() -> Self {
        Self::new(4)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_layout_is_sixteen_tiles() {
        let layout = ChunkLayout::default();
        assert_eq!(layout.dimension(), 16);
        assert_eq!(layout.mask(), 15);
        assert_eq!(layout.tiles_per_chunk(), 256);
    }

    #[test]
    fn positive_tiles_split_into_chunk_and_offset() {
        let layout = ChunkLayout::new(4);
        let p = layout.chunk_position_of(37, 16, 2);
        assert_eq!((p.chunk_x, p.inner_x), (2, 5));
        assert_eq!((p.chunk_y, p.inner_y), (1, 0));
        assert_eq!(p.chunk_z, 2);
    }

    #[test]
    fn negative_tiles_floor_toward_negative_infinity() {
        let layout = ChunkLayout::new(4);
        let p = layout.chunk_position_of(-1, -16, 0);
        assert_eq!((p.chunk_x, p.inner_x), (-1, 15));
        assert_eq!((p.chunk_y, p.inner_y), (-1, 0));

        let p = layout.chunk_position_of(-17, -33, -3);
        assert_eq!((p.chunk_x, p.inner_x), (-2, 15));
        assert_eq!((p.chunk_y, p.inner_y), (-3, 15));
        assert_eq!(p.chunk_z, -3);
    }

    #[test]
    fn mapping_is_total_over_the_i32_range() {
        let layout = ChunkLayout::new(4);
        for tile in [i32::MIN, i32::MIN + 1, -1, 0, 1, i32::MAX - 1, i32::MAX] {
            let p = layout.chunk_position_of(tile, tile, 0);
            assert!((0..16).contains(&p.inner_x));
            // chunk * dimension + inner reconstructs the tile without overflow.
            let rebuilt = (i64::from(p.chunk_x) << 4) + i64::from(p.inner_x);
            assert_eq!(rebuilt, i64::from(tile));
        }
    }

    #[test]
    fn shift_is_clamped_to_supported_range() {
        assert_eq!(ChunkLayout::new(0).shift(), 1);
        assert_eq!(ChunkLayout::new(40).shift(), ChunkLayout::MAX_SHIFT);
    }
}
