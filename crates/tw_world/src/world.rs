//! The world: tile metrics, chunk addressing and the sparse chunk store, all
//! backed by one arena that lives for the session.

use glam::Vec2;
use tw_core::MemoryArena;

use crate::chunk::{ChunkLayout, ChunkPosition};
use crate::entity::LowIndex;
use crate::error::WorldError;
use crate::position::{self, WorldDifference, WorldPosition};
use crate::store::{ChunkId, ChunkStore};

pub const TILE_UNSET: u32 = 0;
pub const TILE_FLOOR: u32 = 1;
pub const TILE_WALL: u32 = 2;
pub const TILE_STAIRS_UP: u32 = 3;
pub const TILE_STAIRS_DOWN: u32 = 4;

pub fn is_tile_value_empty(value: u32) -> bool {
    matches!(value, TILE_FLOOR | TILE_STAIRS_UP | TILE_STAIRS_DOWN)
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WorldStats {
    pub chunks: usize,
    pub chained_chunks: usize,
    pub overflow_blocks: usize,
    pub arena_used: usize,
    pub arena_size: usize,
}

#[derive(Debug, Clone)]
pub struct World {
    tile_side_in_meters: f32,
    layout: ChunkLayout,
    store: ChunkStore,
    arena: MemoryArena,
}

impl World {
    pub fn new(tile_side_in_meters: f32, layout: ChunkLayout, arena: MemoryArena) -> Self {
        Self {
            tile_side_in_meters,
            layout,
            store: ChunkStore::new(),
            arena,
        }
    }

    pub fn tile_side_in_meters(&self) -> f32 {
        self.tile_side_in_meters
    }

    pub fn layout(&self) -> ChunkLayout {
        self.layout
    }

    pub fn canonicalize(&self, position: WorldPosition) -> WorldPosition {
        position::canonicalize(self.tile_side_in_meters, position)
    }

    pub fn map_into_tile_space(&self, base: WorldPosition, offset: Vec2) -> WorldPosition {
        position::map_into_tile_space(self.tile_side_in_meters, base, offset)
    }

    pub fn subtract(&self, a: &WorldPosition, b: &WorldPosition) -> WorldDifference {
        position::subtract(self.tile_side_in_meters, a, b)
    }

    pub fn chunk_position_of(&self, tile_x: i32, tile_y: i32, tile_z: i32) -> ChunkPosition {
        self.layout.chunk_position_of(tile_x, tile_y, tile_z)
    }

    /// Read-only lookup; never allocates.
    pub fn chunk(&self, chunk_x: i32, chunk_y: i32, chunk_z: i32) -> Option<ChunkId> {
        self.store.find(chunk_x, chunk_y, chunk_z)
    }

    pub fn chunk_or_create(
        &mut self,
        chunk_x: i32,
        chunk_y: i32,
        chunk_z: i32,
    ) -> Result<ChunkId, WorldError> {
        self.store
            .find_or_create(chunk_x, chunk_y, chunk_z, &mut self.arena)
    }

    pub fn tile_value(&self, tile_x: i32, tile_y: i32, tile_z: i32) -> u32 {
        let p = self.chunk_position_of(tile_x, tile_y, tile_z);
        let Some(id) = self.chunk(p.chunk_x, p.chunk_y, p.chunk_z) else {
            return TILE_UNSET;
        };
        match self.store.chunk(id).tiles {
            Some(tiles) => self.arena.read::<u32>(tiles, self.tile_slot(&p)),
            None => TILE_UNSET,
        }
    }

    pub fn set_tile_value(
        &mut self,
        tile_x: i32,
        tile_y: i32,
        tile_z: i32,
        value: u32,
    ) -> Result<(), WorldError> {
        let p = self.chunk_position_of(tile_x, tile_y, tile_z);
        let id = self.chunk_or_create(p.chunk_x, p.chunk_y, p.chunk_z)?;

        let existing = self.store.chunk(id).tiles;
        let tiles = match existing {
            Some(tiles) => tiles,
            None => {
                let count = self.layout.tiles_per_chunk();
                let tiles = self.arena.push_array::<u32>(count)?;
                for slot in 0..count {
                    self.arena.write(tiles, slot, TILE_FLOOR);
                }
                self.store.chunk_mut(id).tiles = Some(tiles);
                tiles
            }
        };
        let slot = self.tile_slot(&p);
        self.arena.write(tiles, slot, value);
        Ok(())
    }

    pub fn is_tile_empty(&self, position: &WorldPosition) -> bool {
        is_tile_value_empty(self.tile_value(position.tile_x, position.tile_y, position.tile_z))
    }

    fn tile_slot(&self, p: &ChunkPosition) -> usize {
        (p.inner_y * self.layout.dimension() + p.inner_x) as usize
    }

    fn chunk_of(&self, position: &WorldPosition) -> ChunkPosition {
        self.chunk_position_of(position.tile_x, position.tile_y, position.tile_z)
    }

    /// Moves `index` between chunk entity lists. `old` is `None` for an
    /// entity entering the world.
    pub fn change_entity_location(
        &mut self,
        index: LowIndex,
        old: Option<&WorldPosition>,
        new: &WorldPosition,
    ) -> Result<(), WorldError> {
        let new_chunk = self.chunk_of(new);
        if let Some(old) = old {
            let old_chunk = self.chunk_of(old);
            if (old_chunk.chunk_x, old_chunk.chunk_y, old_chunk.chunk_z)
                == (new_chunk.chunk_x, new_chunk.chunk_y, new_chunk.chunk_z)
            {
                return Ok(());
            }
        }

        let to = self.chunk_or_create(new_chunk.chunk_x, new_chunk.chunk_y, new_chunk.chunk_z)?;
        self.store.add_entity(to, index, &mut self.arena)?;

        if let Some(old) = old {
            let old_chunk = self.chunk_of(old);
            let removed = self
                .chunk(old_chunk.chunk_x, old_chunk.chunk_y, old_chunk.chunk_z)
                .is_some_and(|from| self.store.remove_entity(from, index));
            if !removed {
                log::warn!(
                    "Entity {index} was not listed in chunk ({}, {}, {})",
                    old_chunk.chunk_x,
                    old_chunk.chunk_y,
                    old_chunk.chunk_z
                );
            }
        }
        Ok(())
    }

    pub fn entities_in_chunk(
        &self,
        chunk_x: i32,
        chunk_y: i32,
        chunk_z: i32,
    ) -> impl Iterator<Item = LowIndex> + '_ {
        self.chunk(chunk_x, chunk_y, chunk_z)
            .into_iter()
            .flat_map(move |id| self.store.entities_in(id))
    }

    pub fn stats(&self) -> WorldStats {
        WorldStats {
            chunks: self.store.chunk_count(),
            chained_chunks: self.store.chained_chunk_count(),
            overflow_blocks: self.store.overflow_block_count(),
            arena_used: self.arena.used(),
            arena_size: self.arena.size(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tw_core::megabytes;

    fn world() -> World {
        World::new(1.4, ChunkLayout::new(4), MemoryArena::new(megabytes(1)))
    }

    #[test]
    fn chunk_lookup_creates_only_on_request() {
        let mut world = world();
        assert!(world.chunk(5, -3, 0).is_none());
        let id = world.chunk_or_create(5, -3, 0).expect("in range");
        assert_eq!(world.chunk(5, -3, 0), Some(id));
    }

    #[test]
    fn unwritten_tiles_read_as_unset() {
        let world = world();
        assert_eq!(world.tile_value(3, 4, 0), TILE_UNSET);
        assert!(!world.is_tile_empty(&WorldPosition::centered_tile_point(3, 4, 0)));
    }

    #[test]
    fn tile_writes_fill_new_chunks_with_floor() {
        let mut world = world();
        world.set_tile_value(-1, -1, 0, TILE_WALL).expect("room");
        assert_eq!(world.tile_value(-1, -1, 0), TILE_WALL);
        // Same chunk (-1, -1), untouched tile.
        assert_eq!(world.tile_value(-16, -16, 0), TILE_FLOOR);
        // Other layer is a different chunk.
        assert_eq!(world.tile_value(-1, -1, 1), TILE_UNSET);
        assert!(world.is_tile_empty(&WorldPosition::centered_tile_point(-2, -1, 0)));
        assert!(!world.is_tile_empty(&WorldPosition::centered_tile_point(-1, -1, 0)));
    }

    #[test]
    fn empty_tile_values() {
        assert!(is_tile_value_empty(TILE_FLOOR));
        assert!(is_tile_value_empty(TILE_STAIRS_UP));
        assert!(is_tile_value_empty(TILE_STAIRS_DOWN));
        assert!(!is_tile_value_empty(TILE_WALL));
        assert!(!is_tile_value_empty(TILE_UNSET));
    }

    #[test]
    fn entity_moves_between_chunk_lists() {
        let mut world = world();
        let index = LowIndex::new(1);
        let a = WorldPosition::centered_tile_point(1, 1, 0);
        let b = WorldPosition::centered_tile_point(2, 1, 0);
        let c = WorldPosition::centered_tile_point(20, 1, 0);

        world.change_entity_location(index, None, &a).expect("room");
        assert_eq!(world.entities_in_chunk(0, 0, 0).collect::<Vec<_>>(), vec![index]);

        world.change_entity_location(index, Some(&a), &b).expect("room");
        assert_eq!(world.entities_in_chunk(0, 0, 0).count(), 1);

        world.change_entity_location(index, Some(&b), &c).expect("room");
        assert_eq!(world.entities_in_chunk(0, 0, 0).count(), 0);
        assert_eq!(world.entities_in_chunk(1, 0, 0).collect::<Vec<_>>(), vec![index]);
        assert_eq!(world.entities_in_chunk(9, 9, 9).count(), 0);
    }

    #[test]
    fn tile_block_is_charged_to_the_arena() {
        let mut world = world();
        let before = world.stats().arena_used;
        world.set_tile_value(0, 0, 0, TILE_FLOOR).expect("room");
        assert_eq!(world.stats().arena_used - before, 256 * 4);
        assert_eq!(world.stats().chunks, 1);
    }
}
