//! Per-frame game layer: controller bindings, simulation step, camera and
//! render commands.

use glam::Vec2;

use tw_core::{
    Button, ControllerInput, GameInput, GameMemory, MemoryArena, PixelSurface, MAX_CONTROLLERS,
};
use tw_world::{LowIndex, Simulation, WorldError, WorldPosition};

use crate::config::GameConfig;
use crate::render::{render_simulation, RenderGroup, ScreenMapping};
use crate::worldgen::{generate_world, WorldGenSummary};

const MAX_RENDER_COMMANDS: usize = 4096;
/// Rings of tiles around the camera searched for a free spawn tile.
const SPAWN_SEARCH_RADIUS: i32 = 3;

#[derive(Debug, Clone)]
pub struct GameState {
    config: GameConfig,
    sim: Simulation,
    controlled: [Option<LowIndex>; MAX_CONTROLLERS],
    world_summary: WorldGenSummary,
}

fn controller_acceleration(controller: &ControllerInput) -> Vec2 {
    if controller.is_analog() {
        return Vec2::new(controller.stick_average_x, controller.stick_average_y);
    }
    let mut ddp = Vec2::ZERO;
    if controller.button(Button::MoveUp).is_held() {
        ddp.y = 1.0;
    }
    if controller.button(Button::MoveDown).is_held() {
        ddp.y = -1.0;
    }
    if controller.button(Button::MoveLeft).is_held() {
        ddp.x = -1.0;
    }
    if controller.button(Button::MoveRight).is_held() {
        ddp.x = 1.0;
    }
    ddp
}

impl GameState {
    /// Builds the world inside the permanent zone of `memory`.
    pub fn new(config: GameConfig, memory: &mut GameMemory) -> Result<Self, WorldError> {
        let world_arena = memory.permanent.split_off(memory.permanent.remaining())?;
        let mut sim = Simulation::new(config.simulation_config(), world_arena);
        let world_summary = generate_world(&mut sim, &config.world_gen)?;

        let start = WorldPosition::centered_tile_point(
            config.screen_tiles_x / 2,
            config.screen_tiles_y / 2,
            0,
        );
        sim.set_camera(start)?;

        let stats = sim.world().stats();
        log::info!(
            "World ready: {} entities, {} chunks, {} of {} arena bytes used",
            sim.entities().low_count() - 1,
            stats.chunks,
            stats.arena_used,
            stats.arena_size
        );

        Ok(Self {
            config,
            sim,
            controlled: [None; MAX_CONTROLLERS],
            world_summary,
        })
    }

    pub fn simulation(&self) -> &Simulation {
        &self.sim
    }

    pub fn world_summary(&self) -> WorldGenSummary {
        self.world_summary
    }

    pub fn controlled_entity(&self, controller: usize) -> Option<LowIndex> {
        self.controlled.get(controller).copied().flatten()
    }

    /// Nearest walkable tile to the camera, searched ring by ring.
    fn spawn_position(&self) -> Option<WorldPosition> {
        let camera = self.sim.camera();
        let world = self.sim.world();
        (0..=SPAWN_SEARCH_RADIUS).find_map(|radius| {
            (-radius..=radius)
                .flat_map(|dy| (-radius..=radius).map(move |dx| (dx, dy)))
                .filter(|&(dx, dy)| dx.abs().max(dy.abs()) == radius)
                .map(|(dx, dy)| {
                    WorldPosition::centered_tile_point(
                        camera.tile_x.saturating_add(dx),
                        camera.tile_y.saturating_add(dy),
                        camera.tile_z,
                    )
                })
                .find(|position| world.is_tile_empty(position))
        })
    }

    fn spawn_player(&mut self, controller: usize) {
        let Some(position) = self.spawn_position() else {
            log::warn!("No free tile near the camera for controller {controller}");
            return;
        };
        match self.sim.add_hero(position) {
            Ok(hero) => {
                self.controlled[controller] = Some(hero);
                if self.sim.camera_follow().is_none() {
                    self.sim.follow(Some(hero));
                }
                log::info!("Controller {controller} joined as hero {hero}");
            }
            Err(err) => log::warn!("Dropped spawn for controller {controller}: {err}"),
        }
    }

    /// Runs one frame and returns the draw list for it. The transient arena
    /// is reset first; nothing in it survives the frame.
    pub fn update_and_render(
        &mut self,
        input: &GameInput,
        transient: &mut MemoryArena,
        surface: &PixelSurface,
    ) -> Result<RenderGroup, WorldError> {
        transient.reset();

        for (index, controller) in input.controllers.iter().enumerate() {
            match self.controlled[index] {
                None => {
                    if controller.button(Button::Start).is_held() {
                        self.spawn_player(index);
                    }
                }
                Some(hero) => {
                    if controller.button(Button::ActionUp).is_held() {
                        self.sim.jump(hero);
                    }
                    let ddp = controller_acceleration(controller);
                    self.sim.move_entity(hero, ddp, input.frame_delta)?;
                }
            }
        }

        if self.sim.update_camera_follow()? {
            let camera = self.sim.camera();
            log::debug!(
                "Camera re-centred on room at tile ({}, {}, {})",
                camera.tile_x,
                camera.tile_y,
                camera.tile_z
            );
        }

        let mut group = RenderGroup::new(transient, MAX_RENDER_COMMANDS)?;
        let mapping = ScreenMapping::new(surface, self.config.meters_to_pixels());
        render_simulation(&self.sim, &mapping, &mut group);
        Ok(group)
    }
}
