//! Render command generation.
//!
//! The game never touches pixels. It emits a flat list of commands in pixel
//! space (origin top-left, y down) for an external rasterizer. World meters
//! are y-up and centred on the camera, so every point goes through
//! [`ScreenMapping::to_screen`].

use glam::Vec2;

use tw_core::{ArenaError, MemoryArena, PixelSurface};
use tw_world::{
    EntityType, Facing, Simulation, TILE_FLOOR, TILE_STAIRS_DOWN, TILE_STAIRS_UP, TILE_WALL,
};

pub type Color = [f32; 4];

const CLEAR_COLOR: Color = [1.0, 0.0, 1.0, 1.0];
const FLOOR_COLOR: Color = [0.5, 0.5, 0.5, 1.0];
const STAIRS_UP_COLOR: Color = [0.25, 0.25, 0.25, 1.0];
const STAIRS_DOWN_COLOR: Color = [0.75, 0.75, 0.75, 1.0];
const WALL_COLOR: Color = [1.0, 1.0, 1.0, 1.0];
const STAIRS_ENTITY_COLOR: Color = [0.0, 0.0, 0.0, 1.0];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BitmapId {
    Hero(Facing),
    Shadow,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DrawCommand {
    Clear {
        color: Color,
    },
    Rect {
        min: Vec2,
        max: Vec2,
        color: Color,
    },
    /// `position` is where the bitmap's alignment point lands.
    Bitmap {
        bitmap: BitmapId,
        position: Vec2,
        alpha: f32,
    },
}

/// Fixed-capacity command list whose storage is charged to the per-frame
/// transient arena.
#[derive(Debug, Clone)]
pub struct RenderGroup {
    commands: Vec<DrawCommand>,
    max_commands: usize,
    dropped: usize,
}

impl RenderGroup {
    pub fn new(transient: &mut MemoryArena, max_commands: usize) -> Result<Self, ArenaError> {
        transient.push_array::<DrawCommand>(max_commands)?;
        Ok(Self {
            commands: Vec::with_capacity(max_commands),
            max_commands,
            dropped: 0,
        })
    }

    pub fn push(&mut self, command: DrawCommand) {
        if self.commands.len() >= self.max_commands {
            if self.dropped == 0 {
                log::warn!(
                    "Render budget of {} commands exceeded, dropping the rest of this frame",
                    self.max_commands
                );
            }
            self.dropped += 1;
            return;
        }
        self.commands.push(command);
    }

    pub fn commands(&self) -> &[DrawCommand] {
        &self.commands
    }

    pub fn dropped(&self) -> usize {
        self.dropped
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScreenMapping {
    pub center: Vec2,
    pub meters_to_pixels: f32,
}

impl ScreenMapping {
    pub fn new(surface: &PixelSurface, meters_to_pixels: f32) -> Self {
        let (x, y) = surface.center();
        Self {
            center: Vec2::new(x, y),
            meters_to_pixels,
        }
    }

    /// Camera-relative meters to pixels.
    pub fn to_screen(&self, meters: Vec2) -> Vec2 {
        self.center + self.meters_to_pixels * Vec2::new(meters.x, -meters.y)
    }

    fn rect(&self, center_meters: Vec2, size_meters: Vec2, color: Color) -> DrawCommand {
        let center = self.to_screen(center_meters);
        let half = 0.5 * self.meters_to_pixels * size_meters;
        DrawCommand::Rect {
            min: center - half,
            max: center + half,
            color,
        }
    }
}

fn tile_color(value: u32) -> Option<Color> {
    match value {
        TILE_FLOOR => Some(FLOOR_COLOR),
        TILE_WALL => Some(WALL_COLOR),
        TILE_STAIRS_UP => Some(STAIRS_UP_COLOR),
        TILE_STAIRS_DOWN => Some(STAIRS_DOWN_COLOR),
        _ => None,
    }
}

/// Emits the tile backdrop around the camera, then every simulated entity.
pub fn render_simulation(sim: &Simulation, mapping: &ScreenMapping, group: &mut RenderGroup) {
    group.push(DrawCommand::Clear { color: CLEAR_COLOR });

    let world = sim.world();
    let camera = sim.camera();
    let side = world.tile_side_in_meters();
    let camera_config = sim.camera_config();
    let half_x = camera_config.screen_tiles_x / 2 + 1;
    let half_y = camera_config.screen_tiles_y / 2 + 1;

    for rel_y in -half_y..=half_y {
        for rel_x in -half_x..=half_x {
            let tile_x = camera.tile_x.saturating_add(rel_x);
            let tile_y = camera.tile_y.saturating_add(rel_y);
            let Some(color) = tile_color(world.tile_value(tile_x, tile_y, camera.tile_z)) else {
                continue;
            };
            let center = side * Vec2::new(rel_x as f32, rel_y as f32) - camera.offset;
            group.push(mapping.rect(center, Vec2::splat(side), color));
        }
    }

    let entities = sim.entities();
    for high in entities.high_entities() {
        let Some(low) = entities.low(high.low_index) else {
            continue;
        };
        let size = Vec2::new(low.width, low.height);
        match low.entity_type {
            EntityType::Hero => {
                let ground = mapping.to_screen(high.position);
                let shadow_alpha = (1.0 - 0.5 * high.z).max(0.0);
                group.push(DrawCommand::Bitmap {
                    bitmap: BitmapId::Shadow,
                    position: ground,
                    alpha: shadow_alpha,
                });
                let lift = Vec2::new(0.0, -high.z * mapping.meters_to_pixels);
                group.push(DrawCommand::Bitmap {
                    bitmap: BitmapId::Hero(high.facing),
                    position: ground + lift,
                    alpha: 1.0,
                });
            }
            EntityType::Wall => group.push(mapping.rect(high.position, size, WALL_COLOR)),
            EntityType::Stairs => {
                group.push(mapping.rect(high.position, size, STAIRS_ENTITY_COLOR))
            }
            EntityType::Null => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tw_core::{megabytes, MemoryArena};
    use tw_world::{SimulationConfig, WorldPosition};

    fn mapping() -> ScreenMapping {
        ScreenMapping::new(&PixelSurface::new(960, 540, 4), 60.0 / 1.4)
    }

    #[test]
    fn camera_origin_maps_to_surface_center() {
        let m = mapping();
        assert_eq!(m.to_screen(Vec2::ZERO), Vec2::new(480.0, 270.0));
        let up = m.to_screen(Vec2::new(0.0, 1.4));
        assert!((up.y - (270.0 - 60.0)).abs() < 1e-3, "y is flipped");
        let right = m.to_screen(Vec2::new(1.4, 0.0));
        assert!((right.x - 540.0).abs() < 1e-3);
    }

    #[test]
    fn group_budget_is_charged_and_enforced() {
        let mut transient = MemoryArena::new(megabytes(1));
        let mut group = RenderGroup::new(&mut transient, 2).expect("room");
        assert!(transient.used() >= 2 * std::mem::size_of::<DrawCommand>());

        for _ in 0..5 {
            group.push(DrawCommand::Clear { color: CLEAR_COLOR });
        }
        assert_eq!(group.commands().len(), 2);
        assert_eq!(group.dropped(), 3);

        let mut tiny = MemoryArena::new(8);
        assert!(RenderGroup::new(&mut tiny, 100).is_err());
    }

    #[test]
    fn hero_is_lifted_by_jump_height() {
        let mut sim =
            tw_world::Simulation::new(SimulationConfig::default(), MemoryArena::new(megabytes(4)));
        let hero = sim.add_hero(WorldPosition::default()).expect("room");
        sim.jump(hero);
        sim.move_entity(hero, Vec2::ZERO, 0.1).expect("moves");

        let mut transient = MemoryArena::new(megabytes(1));
        let mut group = RenderGroup::new(&mut transient, 1024).expect("room");
        render_simulation(&sim, &mapping(), &mut group);

        assert!(matches!(group.commands()[0], DrawCommand::Clear { .. }));
        let bitmaps: Vec<_> = group
            .commands()
            .iter()
            .filter_map(|c| match c {
                DrawCommand::Bitmap {
                    bitmap, position, ..
                } => Some((*bitmap, *position)),
                _ => None,
            })
            .collect();
        assert_eq!(bitmaps.len(), 2);
        let (shadow, ground) = bitmaps[0];
        let (body, lifted) = bitmaps[1];
        assert_eq!(shadow, BitmapId::Shadow);
        assert!(matches!(body, BitmapId::Hero(_)));
        assert!(lifted.y < ground.y);
    }

    #[test]
    fn walls_become_rects_centered_on_their_tile() {
        let mut sim =
            tw_world::Simulation::new(SimulationConfig::default(), MemoryArena::new(megabytes(4)));
        sim.add_wall(1, 0, 0).expect("room");

        let mut transient = MemoryArena::new(megabytes(1));
        let mut group = RenderGroup::new(&mut transient, 1024).expect("room");
        let m = mapping();
        render_simulation(&sim, &m, &mut group);

        let expected_center = m.to_screen(Vec2::new(1.4, 0.0));
        let found = group.commands().iter().any(|c| match c {
            DrawCommand::Rect { min, max, color } => {
                *color == WALL_COLOR && ((*min + *max) * 0.5 - expected_center).length() < 1e-3
            }
            _ => false,
        });
        assert!(found);
    }
}
