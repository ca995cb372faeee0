//! The simulation aggregate: world, entity tables and camera state.
//!
//! All world-facing mutation goes through here so the two halves of an
//! entity (its low record in a chunk list, its high record near the camera)
//! never drift apart.

use glam::Vec2;
use tw_core::MemoryArena;

use crate::camera::CameraConfig;
use crate::chunk::ChunkLayout;
use crate::entity::{EntityStore, EntityType, HighIndex, LowEntity, LowIndex};
use crate::error::WorldError;
use crate::movement::MoveSpec;
use crate::position::WorldPosition;
use crate::world::World;

pub const HERO_WIDTH: f32 = 1.0;
pub const HERO_HEIGHT: f32 = 0.5;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SimulationConfig {
    pub tile_side_in_meters: f32,
    pub chunk_shift: u32,
    pub low_entity_capacity: usize,
    pub high_entity_capacity: usize,
    pub camera: CameraConfig,
    pub movement: MoveSpec,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            tile_side_in_meters: 1.4,
            chunk_shift: 4,
            low_entity_capacity: 100_000,
            high_entity_capacity: 256,
            camera: CameraConfig::default(),
            movement: MoveSpec::default(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Simulation {
    pub(crate) world: World,
    pub(crate) entities: EntityStore,
    pub(crate) camera: WorldPosition,
    pub(crate) camera_follow: Option<LowIndex>,
    pub(crate) camera_config: CameraConfig,
    pub(crate) movement: MoveSpec,
}

impl Simulation {
    pub fn new(config: SimulationConfig, arena: MemoryArena) -> Self {
        let world = World::new(
            config.tile_side_in_meters,
            ChunkLayout::new(config.chunk_shift),
            arena,
        );
        // Slot 0 is the null entity, so one extra low slot.
        let entities = EntityStore::new(
            config.low_entity_capacity.saturating_add(1),
            config.high_entity_capacity,
        );
        Self {
            world,
            entities,
            camera: WorldPosition::default(),
            camera_follow: None,
            camera_config: config.camera,
            movement: config.movement,
        }
    }

    pub fn world(&self) -> &World {
        &self.world
    }

    pub fn world_mut(&mut self) -> &mut World {
        &mut self.world
    }

    pub fn entities(&self) -> &EntityStore {
        &self.entities
    }

    pub fn camera(&self) -> WorldPosition {
        self.camera
    }

    pub fn camera_config(&self) -> CameraConfig {
        self.camera_config
    }

    pub fn move_spec(&self) -> MoveSpec {
        self.movement
    }

    pub fn is_high(&self, index: LowIndex) -> bool {
        self.entities
            .low(index)
            .is_some_and(|low| low.high_index.is_some())
    }

    /// Whether `position` belongs in the simulated set for the current camera.
    pub fn is_in_active_region(&self, position: &WorldPosition) -> bool {
        if position.tile_z != self.camera.tile_z {
            return false;
        }
        let half = self
            .camera_config
            .active_half_extent(self.world.tile_side_in_meters());
        let delta = self.world.subtract(position, &self.camera).delta_xy;
        delta.x.abs() <= half.x && delta.y.abs() <= half.y
    }

    /// Adds a dormant entity and lists it in its chunk. It is promoted right
    /// away if it lands inside the active region.
    pub fn add_low_entity(&mut self, entity: LowEntity) -> Result<LowIndex, WorldError> {
        let mut entity = entity;
        entity.position = self.world.canonicalize(entity.position);

        let index = self.entities.next_low_index()?;
        self.world
            .change_entity_location(index, None, &entity.position)?;
        let index = self.entities.add_low(entity)?;

        if self.is_in_active_region(&entity.position) {
            self.promote(index)?;
        }
        Ok(index)
    }

    pub fn add_wall(
        &mut self,
        tile_x: i32,
        tile_y: i32,
        tile_z: i32,
    ) -> Result<LowIndex, WorldError> {
        let side = self.world.tile_side_in_meters();
        let mut wall = LowEntity::new(
            EntityType::Wall,
            WorldPosition::centered_tile_point(tile_x, tile_y, tile_z),
        );
        wall.width = side;
        wall.height = side;
        wall.collides = true;
        self.add_low_entity(wall)
    }

    /// Stairs are walkable. Entering their footprint moves the mover by
    /// `d_tile_z` layers.
    pub fn add_stairs(
        &mut self,
        tile_x: i32,
        tile_y: i32,
        tile_z: i32,
        d_tile_z: i32,
    ) -> Result<LowIndex, WorldError> {
        let side = self.world.tile_side_in_meters();
        let mut stairs = LowEntity::new(
            EntityType::Stairs,
            WorldPosition::centered_tile_point(tile_x, tile_y, tile_z),
        );
        stairs.width = side;
        stairs.height = side;
        stairs.d_tile_z = d_tile_z;
        self.add_low_entity(stairs)
    }

    pub fn add_hero(&mut self, position: WorldPosition) -> Result<LowIndex, WorldError> {
        let mut hero = LowEntity::new(EntityType::Hero, position);
        hero.width = HERO_WIDTH;
        hero.height = HERO_HEIGHT;
        hero.collides = true;
        self.add_low_entity(hero)
    }

    pub fn promote(&mut self, index: LowIndex) -> Result<HighIndex, WorldError> {
        let low = self
            .entities
            .low(index)
            .ok_or(WorldError::UnknownEntity(index))?;
        let relative = self.world.subtract(&low.position, &self.camera).delta_xy;
        self.entities.make_high(index, relative)
    }

    pub fn demote(&mut self, index: LowIndex) {
        self.entities.make_low(index);
    }

    /// Starts a jump if the entity is simulated and standing on the ground.
    pub fn jump(&mut self, index: LowIndex) -> bool {
        let Some(high_index) = self.entities.low(index).and_then(|low| low.high_index) else {
            return false;
        };
        let speed = self.movement.jump_speed;
        match self.entities.high_mut(high_index) {
            Some(high) if high.z == 0.0 && high.dz == 0.0 => {
                high.dz = speed;
                true
            }
            _ => false,
        }
    }

    /// Camera-relative position of a simulated entity.
    pub fn high_position(&self, index: LowIndex) -> Option<Vec2> {
        self.entities.high_of(index).map(|high| high.position)
    }
}
