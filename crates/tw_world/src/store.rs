//! Sparse chunk storage.
//!
//! A fixed hash table of [`WorldChunk`] records keyed by chunk coordinates.
//! Slot collisions chain further chunk nodes off the slot; chain nodes and
//! overflow entity blocks live in growable vectors addressed by typed ids, and
//! every one of them is paid for out of the world arena so the world's memory
//! budget is still enforced.
//!
//! Each chunk lists the entities currently inside it: an inline block of
//! [`ENTITY_BLOCK_CAPACITY`] indices plus a chain of overflow blocks. Overflow
//! blocks are always full; removal fills holes from the inline block, and an
//! emptied inline block pulls the next overflow block in and recycles it.

use std::iter;

use tw_core::{ArenaBlock, MemoryArena};

use crate::entity::LowIndex;
use crate::error::WorldError;

pub const CHUNK_HASH_SIZE: usize = 4096;
pub const ENTITY_BLOCK_CAPACITY: usize = 16;
/// Chunk coordinates must stay strictly inside this margin. Keeps repeated
/// coordinate additions far away from overflow.
pub const CHUNK_SAFE_MARGIN: i32 = i32::MAX / 64;
const CHUNK_UNINITIALIZED: i32 = i32::MAX;

const _: () = assert!(CHUNK_HASH_SIZE.is_power_of_two());

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ChunkId(u32);

impl ChunkId {
    fn get(self) -> usize {
        self.0 as usize
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
struct BlockId(u32);

impl BlockId {
    fn get(self) -> usize {
        self.0 as usize
    }
}

#[derive(Debug, Clone)]
struct WorldEntityBlock {
    entity_count: usize,
    low_entity_index: [LowIndex; ENTITY_BLOCK_CAPACITY],
    next: Option<BlockId>,
}

impl WorldEntityBlock {
    fn empty() -> Self {
        Self {
            entity_count: 0,
            low_entity_index: [LowIndex::NULL; ENTITY_BLOCK_CAPACITY],
            next: None,
        }
    }

    fn entities(&self) -> &[LowIndex] {
        &self.low_entity_index[..self.entity_count]
    }

    fn is_full(&self) -> bool {
        self.entity_count == ENTITY_BLOCK_CAPACITY
    }

    fn position_of(&self, index: LowIndex) -> Option<usize> {
        self.entities().iter().position(|&i| i == index)
    }
}

#[derive(Debug, Clone)]
pub struct WorldChunk {
    chunk_x: i32,
    chunk_y: i32,
    chunk_z: i32,
    pub(crate) tiles: Option<ArenaBlock>,
    first_block: WorldEntityBlock,
    next_in_hash: Option<ChunkId>,
}

impl WorldChunk {
    fn uninitialized() -> Self {
        Self::claimed(CHUNK_UNINITIALIZED, 0, 0)
    }

    fn claimed(chunk_x: i32, chunk_y: i32, chunk_z: i32) -> Self {
        Self {
            chunk_x,
            chunk_y,
            chunk_z,
            tiles: None,
            first_block: WorldEntityBlock::empty(),
            next_in_hash: None,
        }
    }

    fn is_uninitialized(&self) -> bool {
        self.chunk_x == CHUNK_UNINITIALIZED
    }

    fn matches(&self, chunk_x: i32, chunk_y: i32, chunk_z: i32) -> bool {
        self.chunk_x == chunk_x && self.chunk_y == chunk_y && self.chunk_z == chunk_z
    }

    pub fn coords(&self) -> (i32, i32, i32) {
        (self.chunk_x, self.chunk_y, self.chunk_z)
    }
}

/// Table slot for a chunk triple. Distinct triples such as `(7, 0, 0)` and
/// `(0, 19, 0)` can share a slot and are chained.
pub fn chunk_hash(chunk_x: i32, chunk_y: i32, chunk_z: i32) -> usize {
    let hash = chunk_x
        .wrapping_mul(19)
        .wrapping_add(chunk_y.wrapping_mul(7))
        .wrapping_add(chunk_z.wrapping_mul(3)) as u32;
    hash as usize & (CHUNK_HASH_SIZE - 1)
}

fn in_safe_margin(coord: i32) -> bool {
    coord > -CHUNK_SAFE_MARGIN && coord < CHUNK_SAFE_MARGIN
}

#[derive(Debug, Clone)]
pub struct ChunkStore {
    /// The first `CHUNK_HASH_SIZE` records are the table slots; chained nodes
    /// are appended after them.
    chunks: Vec<WorldChunk>,
    blocks: Vec<WorldEntityBlock>,
    free_blocks: Vec<BlockId>,
}

impl ChunkStore {
    pub fn new() -> Self {
        Self {
            chunks: vec![WorldChunk::uninitialized(); CHUNK_HASH_SIZE],
            blocks: Vec::new(),
            free_blocks: Vec::new(),
        }
    }

    pub fn chunk(&self, id: ChunkId) -> &WorldChunk {
        &self.chunks[id.get()]
    }

    pub(crate) fn chunk_mut(&mut self, id: ChunkId) -> &mut WorldChunk {
        &mut self.chunks[id.get()]
    }

    /// Number of distinct chunks in use.
    pub fn chunk_count(&self) -> usize {
        self.chunks.iter().filter(|c| !c.is_uninitialized()).count()
    }

    pub fn chained_chunk_count(&self) -> usize {
        self.chunks.len() - CHUNK_HASH_SIZE
    }

    pub fn overflow_block_count(&self) -> usize {
        self.blocks.len() - self.free_blocks.len()
    }

    /// Read-only lookup. Coordinates outside the safe margin can never have
    /// been created, so they simply miss.
    pub fn find(&self, chunk_x: i32, chunk_y: i32, chunk_z: i32) -> Option<ChunkId> {
        let mut id = ChunkId(chunk_hash(chunk_x, chunk_y, chunk_z) as u32);
        loop {
            let chunk = &self.chunks[id.get()];
            if chunk.is_uninitialized() {
                return None;
            }
            if chunk.matches(chunk_x, chunk_y, chunk_z) {
                return Some(id);
            }
            id = chunk.next_in_hash?;
        }
    }

    pub fn find_or_create(
        &mut self,
        chunk_x: i32,
        chunk_y: i32,
        chunk_z: i32,
        arena: &mut MemoryArena,
    ) -> Result<ChunkId, WorldError> {
        if !(in_safe_margin(chunk_x) && in_safe_margin(chunk_y) && in_safe_margin(chunk_z)) {
            return Err(WorldError::ChunkOutOfRange {
                chunk_x,
                chunk_y,
                chunk_z,
            });
        }

        let mut id = ChunkId(chunk_hash(chunk_x, chunk_y, chunk_z) as u32);
        loop {
            let chunk = &mut self.chunks[id.get()];
            if chunk.is_uninitialized() {
                *chunk = WorldChunk::claimed(chunk_x, chunk_y, chunk_z);
                return Ok(id);
            }
            if chunk.matches(chunk_x, chunk_y, chunk_z) {
                return Ok(id);
            }
            match chunk.next_in_hash {
                Some(next) => id = next,
                None => {
                    arena.push_struct::<WorldChunk>()?;
                    let new_id = ChunkId(self.chunks.len() as u32);
                    self.chunks[id.get()].next_in_hash = Some(new_id);
                    self.chunks
                        .push(WorldChunk::claimed(chunk_x, chunk_y, chunk_z));
                    log::debug!(
                        "Chunk ({chunk_x}, {chunk_y}, {chunk_z}) chained off hash slot {}",
                        chunk_hash(chunk_x, chunk_y, chunk_z)
                    );
                    return Ok(new_id);
                }
            }
        }
    }

    fn allocate_block(&mut self, arena: &mut MemoryArena) -> Result<BlockId, WorldError> {
        if let Some(id) = self.free_blocks.pop() {
            self.blocks[id.get()] = WorldEntityBlock::empty();
            return Ok(id);
        }
        arena.push_struct::<WorldEntityBlock>()?;
        let id = BlockId(self.blocks.len() as u32);
        self.blocks.push(WorldEntityBlock::empty());
        log::debug!("Allocated overflow entity block {}", id.get());
        Ok(id)
    }

    pub fn add_entity(
        &mut self,
        chunk: ChunkId,
        index: LowIndex,
        arena: &mut MemoryArena,
    ) -> Result<(), WorldError> {
        if self.chunks[chunk.get()].first_block.is_full() {
            let spill = self.allocate_block(arena)?;
            let first = &mut self.chunks[chunk.get()].first_block;
            let full = std::mem::replace(first, WorldEntityBlock::empty());
            first.next = Some(spill);
            self.blocks[spill.get()] = full;
        }

        let first = &mut self.chunks[chunk.get()].first_block;
        first.low_entity_index[first.entity_count] = index;
        first.entity_count += 1;
        Ok(())
    }

    /// Returns false when `index` was not listed in `chunk`.
    pub fn remove_entity(&mut self, chunk: ChunkId, index: LowIndex) -> bool {
        let Self {
            chunks,
            blocks,
            free_blocks,
        } = self;
        let first = &mut chunks[chunk.get()].first_block;

        let hole: Option<(Option<BlockId>, usize)> = match first.position_of(index) {
            Some(slot) => Some((None, slot)),
            None => {
                let mut cursor = first.next;
                let mut found = None;
                while let Some(id) = cursor {
                    let block = &blocks[id.get()];
                    if let Some(slot) = block.position_of(index) {
                        found = Some((Some(id), slot));
                        break;
                    }
                    cursor = block.next;
                }
                found
            }
        };
        let Some((block, slot)) = hole else {
            return false;
        };

        // Fill the hole with the last entry of the inline block.
        first.entity_count -= 1;
        let last = first.low_entity_index[first.entity_count];
        match block {
            None => first.low_entity_index[slot] = last,
            Some(id) => blocks[id.get()].low_entity_index[slot] = last,
        }

        if first.entity_count == 0 {
            if let Some(next) = first.next {
                *first = blocks[next.get()].clone();
                free_blocks.push(next);
            }
        }
        true
    }

    pub fn entities_in(&self, chunk: ChunkId) -> impl Iterator<Item = LowIndex> + '_ {
        let first = &self.chunks[chunk.get()].first_block;
        iter::successors(Some(first), move |block| {
            block.next.map(|next| &self.blocks[next.get()])
        })
        .flat_map(|block| block.entities().iter().copied())
    }
}

impl Default for ChunkStore {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn arena() -> MemoryArena {
        MemoryArena::new(1 << 20)
    }

    #[test]
    fn lookup_misses_until_created() {
        let mut store = ChunkStore::new();
        let mut arena = arena();
        assert!(store.find(5, -3, 0).is_none());
        let id = store.find_or_create(5, -3, 0, &mut arena).expect("in range");
        assert_eq!(store.find(5, -3, 0), Some(id));
        assert_eq!(store.chunk(id).coords(), (5, -3, 0));
    }

    #[test]
    fn repeated_creation_returns_same_chunk() {
        let mut store = ChunkStore::new();
        let mut arena = arena();
        let a = store.find_or_create(1, 2, 3, &mut arena).expect("in range");
        let b = store.find_or_create(1, 2, 3, &mut arena).expect("in range");
        assert_eq!(a, b);
        assert_eq!(store.chunk_count(), 1);
    }

    #[test]
    fn colliding_triples_chain_and_stay_distinct() {
        // 19*7 == 7*19, so (7, 0, 0) and (0, 19, 0) hash to the same slot.
        assert_eq!(chunk_hash(7, 0, 0), chunk_hash(0, 19, 0));

        let mut store = ChunkStore::new();
        let mut arena = arena();
        let a = store.find_or_create(7, 0, 0, &mut arena).expect("in range");
        let used_before = arena.used();
        let b = store.find_or_create(0, 19, 0, &mut arena).expect("in range");
        assert_ne!(a, b);
        assert_eq!(store.chained_chunk_count(), 1);
        assert!(arena.used() > used_before, "chain node is charged to the arena");

        assert_eq!(store.find(7, 0, 0), Some(a));
        assert_eq!(store.find(0, 19, 0), Some(b));
        assert_eq!(store.find_or_create(0, 19, 0, &mut arena), Ok(b));
    }

    #[test]
    fn coordinates_outside_margin_are_rejected() {
        let mut store = ChunkStore::new();
        let mut arena = arena();
        let err = store
            .find_or_create(CHUNK_SAFE_MARGIN, 0, 0, &mut arena)
            .expect_err("outside margin");
        assert!(matches!(err, WorldError::ChunkOutOfRange { .. }));
        assert!(store.find(CHUNK_SAFE_MARGIN, 0, 0).is_none());
        assert!(store.find_or_create(0, 0, -CHUNK_SAFE_MARGIN + 1, &mut arena).is_ok());
    }

    #[test]
    fn exhausted_arena_fails_chaining() {
        let mut store = ChunkStore::new();
        let mut arena = MemoryArena::new(0);
        store.find_or_create(7, 0, 0, &mut arena).expect("slot claim is free");
        let err = store
            .find_or_create(0, 19, 0, &mut arena)
            .expect_err("no room for a chain node");
        assert!(matches!(err, WorldError::Arena(_)));
        assert!(store.find(0, 19, 0).is_none());
    }

    #[test]
    fn entity_blocks_overflow_and_compact() {
        let mut store = ChunkStore::new();
        let mut arena = arena();
        let chunk = store.find_or_create(0, 0, 0, &mut arena).expect("in range");

        let indices: Vec<LowIndex> = (1..=40).map(LowIndex::new).collect();
        for &index in &indices {
            store.add_entity(chunk, index, &mut arena).expect("room");
        }
        assert_eq!(store.overflow_block_count(), 2);
        let mut listed: Vec<LowIndex> = store.entities_in(chunk).collect();
        listed.sort();
        assert_eq!(listed, indices);

        // Newest first: the inline block drains, then pulls the next block in.
        for &index in indices.iter().rev() {
            assert!(store.remove_entity(chunk, index));
            let remaining: Vec<LowIndex> = store.entities_in(chunk).collect();
            assert!(!remaining.contains(&index));
        }
        assert_eq!(store.entities_in(chunk).count(), 0);
        assert_eq!(store.overflow_block_count(), 0);
    }

    #[test]
    fn freed_blocks_are_reused_before_arena_grows() {
        let mut store = ChunkStore::new();
        let mut arena = arena();
        let chunk = store.find_or_create(0, 0, 0, &mut arena).expect("in range");
        for i in 1..=17 {
            store.add_entity(chunk, LowIndex::new(i), &mut arena).expect("room");
        }
        let used = arena.used();
        assert!(store.remove_entity(chunk, LowIndex::new(17)));
        assert_eq!(store.overflow_block_count(), 0);
        store.add_entity(chunk, LowIndex::new(17), &mut arena).expect("room");
        assert_eq!(arena.used(), used);
    }

    #[test]
    fn removing_unknown_entity_reports_false() {
        let mut store = ChunkStore::new();
        let mut arena = arena();
        let chunk = store.find_or_create(0, 0, 0, &mut arena).expect("in range");
        store.add_entity(chunk, LowIndex::new(1), &mut arena).expect("room");
        assert!(!store.remove_entity(chunk, LowIndex::new(2)));
        assert_eq!(store.entities_in(chunk).count(), 1);
    }
}
