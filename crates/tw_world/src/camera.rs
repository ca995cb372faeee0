//! Camera framing and the active region that drives the frequency split.
//!
//! The active region is a rectangle centred on the camera, `active_screens`
//! screens wide in each direction's tile span, on the camera's layer only.
//! Membership is always decided from the low record's world position, so
//! promotion and demotion agree exactly no matter how far the camera-relative
//! copies have been rebased.

use glam::Vec2;

use crate::entity::LowIndex;
use crate::error::WorldError;
use crate::position::WorldPosition;
use crate::sim::Simulation;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CameraConfig {
    /// Tiles visible across one screen.
    pub screen_tiles_x: i32,
    pub screen_tiles_y: i32,
    /// Screens spanned by the active region along each axis.
    pub active_screens: i32,
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            screen_tiles_x: 17,
            screen_tiles_y: 9,
            active_screens: 3,
        }
    }
}

impl CameraConfig {
    pub fn active_half_extent(&self, tile_side_in_meters: f32) -> Vec2 {
        let span_x = (self.screen_tiles_x * self.active_screens) as f32;
        let span_y = (self.screen_tiles_y * self.active_screens) as f32;
        0.5 * tile_side_in_meters * Vec2::new(span_x, span_y)
    }

    /// Tile distance from the camera tile that covers every position inside
    /// the active region, offsets included.
    fn active_tile_radius(&self) -> (i32, i32) {
        (
            self.screen_tiles_x * self.active_screens / 2 + 1,
            self.screen_tiles_y * self.active_screens / 2 + 1,
        )
    }

    /// How far the followed entity may stray before the camera re-centres.
    pub fn follow_threshold(&self, tile_side_in_meters: f32) -> Vec2 {
        tile_side_in_meters
            * Vec2::new(
                ((self.screen_tiles_x + 1) / 2) as f32,
                ((self.screen_tiles_y + 1) / 2) as f32,
            )
    }
}

impl Simulation {
    /// Moves the camera and restores the frequency split for the new framing.
    pub fn set_camera(&mut self, new_camera: WorldPosition) -> Result<(), WorldError> {
        let new_camera = self.world.canonicalize(new_camera);
        let delta = self.world.subtract(&new_camera, &self.camera).delta_xy;
        self.camera = new_camera;

        let mut i = 0;
        while i < self.entities.high_count() {
            let high = &mut self.entities.high_entities_mut()[i];
            high.position -= delta;
            let low_index = high.low_index;

            let inside = self
                .entities
                .low(low_index)
                .is_some_and(|low| self.is_in_active_region(&low.position));
            if inside {
                i += 1;
            } else {
                // The last high record now sits at `i` and still needs rebasing.
                self.demote(low_index);
            }
        }

        let (radius_x, radius_y) = self.camera_config.active_tile_radius();
        let layout = self.world.layout();
        let min_chunk_x = layout.chunk_coord(self.camera.tile_x.saturating_sub(radius_x));
        let max_chunk_x = layout.chunk_coord(self.camera.tile_x.saturating_add(radius_x));
        let min_chunk_y = layout.chunk_coord(self.camera.tile_y.saturating_sub(radius_y));
        let max_chunk_y = layout.chunk_coord(self.camera.tile_y.saturating_add(radius_y));
        let chunk_z = self.camera.tile_z;

        let mut candidates: Vec<LowIndex> = Vec::new();
        for chunk_y in min_chunk_y..=max_chunk_y {
            for chunk_x in min_chunk_x..=max_chunk_x {
                candidates.extend(self.world.entities_in_chunk(chunk_x, chunk_y, chunk_z));
            }
        }

        let mut promoted = 0usize;
        for index in candidates {
            let Some(low) = self.entities.low(index) else {
                continue;
            };
            if low.high_index.is_none() && self.is_in_active_region(&low.position) {
                self.promote(index)?;
                promoted += 1;
            }
        }

        log::debug!(
            "Camera at tile ({}, {}, {}): {} high entities, {promoted} promoted",
            self.camera.tile_x,
            self.camera.tile_y,
            self.camera.tile_z,
            self.entities.high_count()
        );
        Ok(())
    }

    pub fn camera_follow(&self) -> Option<LowIndex> {
        self.camera_follow
    }

    pub fn follow(&mut self, index: Option<LowIndex>) {
        self.camera_follow = index;
    }

    /// Re-centres the camera by whole screens when the followed entity leaves
    /// the centre screen, and keeps the camera on the entity's layer. Returns
    /// whether the camera moved.
    pub fn update_camera_follow(&mut self) -> Result<bool, WorldError> {
        let Some(index) = self.camera_follow else {
            return Ok(false);
        };
        let Some(low) = self.entities.low(index).filter(|_| !index.is_null()) else {
            return Err(WorldError::UnknownEntity(index));
        };

        let side = self.world.tile_side_in_meters();
        let threshold = self.camera_config.follow_threshold(side);
        let offset = self.world.subtract(&low.position, &self.camera).delta_xy;

        let mut new_camera = self.camera;
        new_camera.tile_z = low.position.tile_z;
        let (screen_x, screen_y) = (
            self.camera_config.screen_tiles_x,
            self.camera_config.screen_tiles_y,
        );
        if offset.x > threshold.x {
            new_camera.tile_x = new_camera.tile_x.saturating_add(screen_x);
        } else if offset.x < -threshold.x {
            new_camera.tile_x = new_camera.tile_x.saturating_sub(screen_x);
        }
        if offset.y > threshold.y {
            new_camera.tile_y = new_camera.tile_y.saturating_add(screen_y);
        } else if offset.y < -threshold.y {
            new_camera.tile_y = new_camera.tile_y.saturating_sub(screen_y);
        }

        if new_camera == self.camera {
            return Ok(false);
        }
        self.set_camera(new_camera)?;
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::SimulationConfig;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};
    use tw_core::{megabytes, MemoryArena};

    fn simulation() -> Simulation {
        Simulation::new(SimulationConfig::default(), MemoryArena::new(megabytes(8)))
    }

    fn assert_split_matches_region(sim: &Simulation) {
        for index in sim.entities().low_indices() {
            let low = sim.entities().low(index).expect("live index");
            assert_eq!(
                low.high_index.is_some(),
                sim.is_in_active_region(&low.position),
                "entity {index} at {:?} with camera {:?}",
                low.position,
                sim.camera()
            );
        }
        for (slot, high) in sim.entities().high_entities().iter().enumerate() {
            let low = sim.entities().low(high.low_index).expect("back-link");
            assert_eq!(low.high_index.map(|h| h.get()), Some(slot));
        }
    }

    #[test]
    fn default_region_spans_three_screens() {
        let half = CameraConfig::default().active_half_extent(1.4);
        assert!((half.x - 25.5 * 1.4).abs() < 1e-4);
        assert!((half.y - 13.5 * 1.4).abs() < 1e-4);
    }

    #[test]
    fn screen_move_demotes_left_edge_and_promotes_right_edge() {
        let mut sim = simulation();
        let left = sim.add_wall(-25, 0, 0).expect("room");
        let right = sim.add_wall(17 + 25, 0, 0).expect("room");
        assert!(sim.is_high(left));
        assert!(!sim.is_high(right));

        let mut camera = sim.camera();
        camera.tile_x += 17;
        sim.set_camera(camera).expect("room");

        assert!(!sim.is_high(left));
        assert!(sim.is_high(right));
        let rel = sim.high_position(right).expect("high");
        assert!((rel.x - 25.0 * 1.4).abs() < 1e-4);
        assert_split_matches_region(&sim);
    }

    #[test]
    fn rebasing_keeps_relative_positions_exact_for_survivors() {
        let mut sim = simulation();
        let wall = sim.add_wall(5, 3, 0).expect("room");
        let mut camera = sim.camera();
        camera.tile_x = 2;
        camera.offset = glam::Vec2::new(0.3, -0.2);
        sim.set_camera(camera).expect("room");

        let rel = sim.high_position(wall).expect("high");
        let expected = Vec2::new(3.0 * 1.4 - 0.3, 3.0 * 1.4 + 0.2);
        assert!((rel - expected).length() < 1e-4);
    }

    #[test]
    fn layer_change_swaps_the_active_set() {
        let mut sim = simulation();
        let ground = sim.add_wall(1, 1, 0).expect("room");
        let upstairs = sim.add_wall(1, 1, 1).expect("room");
        assert!(sim.is_high(ground));

        let mut camera = sim.camera();
        camera.tile_z = 1;
        sim.set_camera(camera).expect("room");
        assert!(!sim.is_high(ground));
        assert!(sim.is_high(upstairs));
    }

    #[test]
    fn split_matches_region_after_random_camera_moves() {
        let mut rng = StdRng::seed_from_u64(0x5EED);
        let mut sim = simulation();
        for _ in 0..600 {
            let tile_x = rng.gen_range(-80..80);
            let tile_y = rng.gen_range(-50..50);
            let tile_z = rng.gen_range(0..2);
            let mut position = WorldPosition::centered_tile_point(tile_x, tile_y, tile_z);
            position.offset = Vec2::new(rng.gen_range(-0.7..0.7), rng.gen_range(-0.7..0.7));
            let mut entity =
                crate::entity::LowEntity::new(crate::entity::EntityType::Wall, position);
            entity.width = 1.4;
            entity.height = 1.4;
            sim.add_low_entity(entity).expect("room");
        }
        assert_split_matches_region(&sim);

        for _ in 0..200 {
            let mut camera = WorldPosition::centered_tile_point(
                rng.gen_range(-60..60),
                rng.gen_range(-40..40),
                rng.gen_range(0..2),
            );
            camera.offset = Vec2::new(rng.gen_range(-0.7..0.7), rng.gen_range(-0.7..0.7));
            sim.set_camera(camera).expect("room");
            assert_split_matches_region(&sim);
        }
    }

    #[test]
    fn high_capacity_exhaustion_is_reported() {
        let config = SimulationConfig {
            high_entity_capacity: 2,
            ..SimulationConfig::default()
        };
        let mut sim = Simulation::new(config, MemoryArena::new(megabytes(1)));
        sim.add_wall(100, 0, 0).expect("room");
        sim.add_wall(101, 0, 0).expect("room");
        sim.add_wall(102, 0, 0).expect("room");

        let camera = WorldPosition::centered_tile_point(100, 0, 0);
        assert!(matches!(
            sim.set_camera(camera),
            Err(WorldError::HighEntityCapacityExceeded { capacity: 2 })
        ));
    }

    #[test]
    fn follow_jumps_by_whole_screens() {
        let mut sim = simulation();
        let hero = sim
            .add_hero(WorldPosition::centered_tile_point(10, 0, 0))
            .expect("room");
        sim.follow(Some(hero));
        assert!(sim.update_camera_follow().expect("room"));
        assert_eq!(sim.camera().tile_x, 17);
        assert_eq!(sim.camera().tile_y, 0);

        // Inside the centre screen now.
        assert!(!sim.update_camera_follow().expect("room"));
    }

    #[test]
    fn follow_tracks_the_entity_layer() {
        let mut sim = simulation();
        let hero = sim
            .add_hero(WorldPosition::centered_tile_point(0, 0, 1))
            .expect("room");
        sim.follow(Some(hero));
        assert!(sim.update_camera_follow().expect("room"));
        assert_eq!(sim.camera().tile_z, 1);
        assert!(sim.is_high(hero));
    }

    #[test]
    fn following_nothing_is_a_no_op() {
        let mut sim = simulation();
        assert!(!sim.update_camera_follow().expect("no follow"));
        sim.follow(Some(LowIndex::new(42)));
        assert_eq!(
            sim.update_camera_follow(),
            Err(WorldError::UnknownEntity(LowIndex::new(42)))
        );
    }
}
