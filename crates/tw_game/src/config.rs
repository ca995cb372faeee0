use serde::Deserialize;
use std::path::Path;

use tw_core::{megabytes, PlatformFiles};
use tw_world::{CameraConfig, ChunkLayout, MoveSpec, SimulationConfig};

#[derive(Debug, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct GameConfig {
    pub tile_side_in_meters: f32,
    pub tile_side_in_pixels: f32,
    pub chunk_shift: u32,
    pub screen_tiles_x: i32,
    pub screen_tiles_y: i32,
    pub active_screens: i32,
    pub permanent_storage_mb: usize,
    pub transient_storage_mb: usize,
    pub low_entity_capacity: usize,
    pub high_entity_capacity: usize,
    pub movement: MovementConfig,
    pub world_gen: WorldGenConfig,
}

#[derive(Debug, Deserialize, Clone, Copy, PartialEq)]
#[serde(default)]
pub struct MovementConfig {
    pub acceleration: f32,
    pub drag: f32,
    pub collision_iterations: u32,
    pub jump_speed: f32,
    pub gravity: f32,
    pub time_epsilon: f32,
}

#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(default)]
pub struct WorldGenConfig {
    pub seed: u64,
    /// Rooms in the generated walk; each room is one screen.
    pub screens: u32,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            tile_side_in_meters: 1.4,
            tile_side_in_pixels: 60.0,
            chunk_shift: 4,
            screen_tiles_x: 17,
            screen_tiles_y: 9,
            active_screens: 3,
            permanent_storage_mb: 64,
            transient_storage_mb: 16,
            low_entity_capacity: 100_000,
            high_entity_capacity: 256,
            movement: MovementConfig::default(),
            world_gen: WorldGenConfig::default(),
        }
    }
}

impl Default for MovementConfig {
    fn default() -> Self {
        let params = MoveSpec::default();
        Self {
            acceleration: params.acceleration,
            drag: params.drag,
            collision_iterations: params.collision_iterations,
            jump_speed: params.jump_speed,
            gravity: params.gravity,
            time_epsilon: params.time_epsilon,
        }
    }
}

impl Default for WorldGenConfig {
    fn default() -> Self {
        Self {
            seed: 1234,
            screens: 100,
        }
    }
}

impl GameConfig {
    pub fn meters_to_pixels(&self) -> f32 {
        self.tile_side_in_pixels / self.tile_side_in_meters
    }

    pub fn permanent_storage_bytes(&self) -> usize {
        megabytes(self.permanent_storage_mb)
    }

    pub fn transient_storage_bytes(&self) -> usize {
        megabytes(self.transient_storage_mb)
    }

    pub fn simulation_config(&self) -> SimulationConfig {
        SimulationConfig {
            tile_side_in_meters: self.tile_side_in_meters,
            chunk_shift: self.chunk_shift,
            low_entity_capacity: self.low_entity_capacity,
            high_entity_capacity: self.high_entity_capacity,
            camera: CameraConfig {
                screen_tiles_x: self.screen_tiles_x,
                screen_tiles_y: self.screen_tiles_y,
                active_screens: self.active_screens,
            },
            movement: MoveSpec {
                acceleration: self.movement.acceleration,
                drag: self.movement.drag,
                collision_iterations: self.movement.collision_iterations,
                jump_speed: self.movement.jump_speed,
                gravity: self.movement.gravity,
                time_epsilon: self.movement.time_epsilon,
            },
        }
    }
}

/// Reads the config through the platform file capability. A missing or empty
/// file falls back to defaults.
pub fn load_config(files: &dyn PlatformFiles, path: &Path) -> Result<GameConfig, String> {
    let file = files.read_entire_file(path);
    if file.is_empty() {
        log::warn!(
            "Config file {} not found or empty, using defaults",
            path.display()
        );
        return Ok(GameConfig::default());
    }
    let config: GameConfig = serde_json::from_slice(&file.contents)
        .map_err(|e| format!("Failed to parse config JSON {}: {e}", path.display()))?;
    validate_config(&config)?;
    Ok(config)
}

pub fn load_config_from_path(path: &Path) -> Result<GameConfig, String> {
    load_config(&tw_core::StdFiles, path)
}

fn validate_config(config: &GameConfig) -> Result<(), String> {
    if !(config.tile_side_in_meters > 0.0) || !(config.tile_side_in_pixels > 0.0) {
        return Err("Config validation failed: tile sizes must be > 0".to_string());
    }
    if !(1..=ChunkLayout::MAX_SHIFT).contains(&config.chunk_shift) {
        return Err(format!(
            "Config validation failed: chunk_shift {} must be in 1..={}",
            config.chunk_shift,
            ChunkLayout::MAX_SHIFT
        ));
    }
    if config.screen_tiles_x <= 0 || config.screen_tiles_y <= 0 || config.active_screens <= 0 {
        return Err("Config validation failed: screen spans must be > 0".to_string());
    }
    if config.low_entity_capacity == 0 || config.high_entity_capacity == 0 {
        return Err("Config validation failed: entity capacities must be > 0".to_string());
    }
    if config.high_entity_capacity > config.low_entity_capacity {
        return Err(format!(
            "Config validation failed: high_entity_capacity {} exceeds low_entity_capacity {}",
            config.high_entity_capacity, config.low_entity_capacity
        ));
    }
    if config.movement.collision_iterations == 0 {
        return Err("Config validation failed: collision_iterations must be >= 1".to_string());
    }
    if config.permanent_storage_mb == 0 {
        return Err("Config validation failed: permanent_storage_mb must be > 0".to_string());
    }
    Ok(())
}
