pub mod camera;
pub mod chunk;
pub mod entity;
pub mod error;
pub mod movement;
pub mod position;
pub mod sim;
pub mod store;
pub mod world;

pub use camera::CameraConfig;
pub use chunk::{ChunkLayout, ChunkPosition};
pub use entity::{EntityStore, EntityType, Facing, HighEntity, HighIndex, LowEntity, LowIndex};
pub use error::WorldError;
pub use movement::MoveSpec;
pub use position::{canonicalize, map_into_tile_space, subtract, WorldDifference, WorldPosition};
pub use sim::{Simulation, SimulationConfig, HERO_HEIGHT, HERO_WIDTH};
pub use store::{chunk_hash, ChunkId, ChunkStore, CHUNK_HASH_SIZE, ENTITY_BLOCK_CAPACITY};
pub use world::{
    is_tile_value_empty, World, WorldStats, TILE_FLOOR, TILE_STAIRS_DOWN, TILE_STAIRS_UP,
    TILE_UNSET, TILE_WALL,
};
