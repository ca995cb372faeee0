//! Linear bump allocator over a caller-owned block of bytes.
//!
//! The arena never frees individual allocations. `used` only grows until the
//! whole arena is reset or dropped, which ties every allocation's lifetime to
//! the subsystem that owns the arena (for the world, the whole session).
//!
//! Allocations are handed out as [`ArenaBlock`] handles (offset + length)
//! instead of pointers, so the struct owning the arena can move or be cloned
//! without invalidating anything that refers into it.

use std::mem::size_of;
use std::ops::Range;

use bytemuck::Pod;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ArenaError {
    #[error("arena out of memory: requested {requested} bytes, {remaining} remaining")]
    OutOfMemory { requested: usize, remaining: usize },
}

/// A region previously handed out by [`MemoryArena::push_size`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ArenaBlock {
    offset: usize,
    len: usize,
}

impl ArenaBlock {
    pub fn offset(self) -> usize {
        self.offset
    }

    pub fn len(self) -> usize {
        self.len
    }

    pub fn is_empty(self) -> bool {
        self.len == 0
    }

    fn range(self) -> Range<usize> {
        self.offset..self.offset + self.len
    }
}

#[derive(Debug, Clone)]
pub struct MemoryArena {
    storage: Vec<u8>,
    used: usize,
}

impl MemoryArena {
    /// Allocates a zeroed backing block of `size` bytes.
    pub fn new(size: usize) -> Self {
        Self::from_storage(vec![0; size])
    }

    /// Takes ownership of an existing block. Contents are expected to be zeroed.
    pub fn from_storage(storage: Vec<u8>) -> Self {
        Self { storage, used: 0 }
    }

    pub fn size(&self) -> usize {
        self.storage.len()
    }

    pub fn used(&self) -> usize {
        self.used
    }

    pub fn remaining(&self) -> usize {
        self.storage.len() - self.used
    }

    pub fn push_size(&mut self, byte_count: usize) -> Result<ArenaBlock, ArenaError> {
        let remaining = self.remaining();
        if byte_count > remaining {
            return Err(ArenaError::OutOfMemory {
                requested: byte_count,
                remaining,
            });
        }

        let block = ArenaBlock {
            offset: self.used,
            len: byte_count,
        };
        self.used += byte_count;
        Ok(block)
    }

    pub fn push_struct<T>(&mut self) -> Result<ArenaBlock, ArenaError> {
        self.push_size(size_of::<T>())
    }

    pub fn push_array<T>(&mut self, count: usize) -> Result<ArenaBlock, ArenaError> {
        let byte_count = count
            .checked_mul(size_of::<T>())
            .ok_or(ArenaError::OutOfMemory {
                requested: usize::MAX,
                remaining: self.remaining(),
            })?;
        self.push_size(byte_count)
    }

    pub fn bytes(&self, block: ArenaBlock) -> &[u8] {
        &self.storage[block.range()]
    }

    pub fn bytes_mut(&mut self, block: ArenaBlock) -> &mut [u8] {
        &mut self.storage[block.range()]
    }

    /// Reads element `index` of a block allocated with [`push_array::<T>`].
    ///
    /// Blocks carry no alignment guarantee, so elements are copied out
    /// unaligned.
    ///
    /// [`push_array::<T>`]: MemoryArena::push_array
    pub fn read<T: Pod>(&self, block: ArenaBlock, index: usize) -> T {
        let stride = size_of::<T>();
        let start = index * stride;
        bytemuck::pod_read_unaligned(&self.bytes(block)[start..start + stride])
    }

    pub fn write<T: Pod>(&mut self, block: ArenaBlock, index: usize, value: T) {
        let stride = size_of::<T>();
        let start = index * stride;
        self.bytes_mut(block)[start..start + stride].copy_from_slice(bytemuck::bytes_of(&value));
    }

    /// Carves `size` bytes off the unused tail into an independent arena.
    ///
    /// The parent shrinks by `size`; bytes already handed out are untouched.
    pub fn split_off(&mut self, size: usize) -> Result<MemoryArena, ArenaError> {
        let remaining = self.remaining();
        if size > remaining {
            return Err(ArenaError::OutOfMemory {
                requested: size,
                remaining,
            });
        }
        let tail = self.storage.split_off(self.storage.len() - size);
        self.storage.shrink_to_fit();
        Ok(Self::from_storage(tail))
    }

    /// Forgets every allocation. The used region is zeroed so later pushes
    /// still hand out cleared memory.
    pub fn reset(&mut self) {
        self.storage[..self.used].fill(0);
        self.used = 0;
    }
}

pub const fn kilobytes(value: usize) -> usize {
    value * 1024
}

pub const fn megabytes(value: usize) -> usize {
    kilobytes(value) * 1024
}
