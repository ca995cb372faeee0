use thiserror::Error;
use tw_core::ArenaError;

use crate::entity::LowIndex;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WorldError {
    #[error("world arena exhausted: {0}")]
    Arena(#[from] ArenaError),
    #[error("chunk ({chunk_x}, {chunk_y}, {chunk_z}) is outside the safe coordinate margin")]
    ChunkOutOfRange {
        chunk_x: i32,
        chunk_y: i32,
        chunk_z: i32,
    },
    #[error("low entity capacity of {capacity} exceeded")]
    LowEntityCapacityExceeded { capacity: usize },
    #[error("high entity capacity of {capacity} exceeded")]
    HighEntityCapacityExceeded { capacity: usize },
    #[error("no low entity with index {0}")]
    UnknownEntity(LowIndex),
}
