//! Procedural world: a seeded random walk of one-screen rooms.
//!
//! Each room is walled on its border. The walk continues right, up, or
//! through stairs to the other layer, and the matching door or stairs is
//! opened in both the room it leaves and the room it enters. Everything is
//! written twice: as tile values and as wall/stairs entities.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use tw_world::{
    Simulation, WorldError, TILE_FLOOR, TILE_STAIRS_DOWN, TILE_STAIRS_UP, TILE_WALL,
};

use crate::config::WorldGenConfig;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WorldGenSummary {
    pub rooms: u32,
    pub walls: u32,
    pub stairs: u32,
    /// Screen coordinates and layer of the last room.
    pub last_room: (i32, i32, i32),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Exit {
    Top,
    Right,
    Stairs,
}

#[derive(Debug, Clone, Copy, Default)]
struct Doors {
    left: bool,
    right: bool,
    bottom: bool,
    top: bool,
    up: bool,
    down: bool,
}

pub fn generate_world(
    sim: &mut Simulation,
    config: &WorldGenConfig,
) -> Result<WorldGenSummary, WorldError> {
    let camera = sim.camera_config();
    let (tiles_x, tiles_y) = (camera.screen_tiles_x, camera.screen_tiles_y);
    let stairs_x = (tiles_x / 2 + 2).min(tiles_x - 2).max(1);
    let stairs_y = (tiles_y / 2 + 2).min(tiles_y - 2).max(1);

    let mut rng = StdRng::seed_from_u64(config.seed);
    let mut summary = WorldGenSummary::default();
    let mut doors = Doors::default();
    let (mut screen_x, mut screen_y, mut tile_z) = (0i32, 0i32, 0i32);

    for _ in 0..config.screens {
        let exit = if doors.up || doors.down {
            // Never take stairs straight back.
            match rng.gen_range(0..2) {
                0 => Exit::Top,
                _ => Exit::Right,
            }
        } else {
            match rng.gen_range(0..3) {
                0 => Exit::Top,
                1 => Exit::Right,
                _ => Exit::Stairs,
            }
        };

        match exit {
            Exit::Top => doors.top = true,
            Exit::Right => doors.right = true,
            Exit::Stairs if tile_z == 0 => doors.up = true,
            Exit::Stairs => doors.down = true,
        }

        for tile_y in 0..tiles_y {
            for tile_x in 0..tiles_x {
                let abs_x = screen_x * tiles_x + tile_x;
                let abs_y = screen_y * tiles_y + tile_y;

                let mut value = TILE_FLOOR;
                if tile_x == 0 && (!doors.left || tile_y != tiles_y / 2) {
                    value = TILE_WALL;
                }
                if tile_x == tiles_x - 1 && (!doors.right || tile_y != tiles_y / 2) {
                    value = TILE_WALL;
                }
                if tile_y == 0 && (!doors.bottom || tile_x != tiles_x / 2) {
                    value = TILE_WALL;
                }
                if tile_y == tiles_y - 1 && (!doors.top || tile_x != tiles_x / 2) {
                    value = TILE_WALL;
                }
                if tile_x == stairs_x && tile_y == stairs_y {
                    if doors.up {
                        value = TILE_STAIRS_UP;
                    } else if doors.down {
                        value = TILE_STAIRS_DOWN;
                    }
                }

                sim.world_mut().set_tile_value(abs_x, abs_y, tile_z, value)?;
                match value {
                    TILE_WALL => {
                        sim.add_wall(abs_x, abs_y, tile_z)?;
                        summary.walls += 1;
                    }
                    TILE_STAIRS_UP => {
                        sim.add_stairs(abs_x, abs_y, tile_z, 1)?;
                        summary.stairs += 1;
                    }
                    TILE_STAIRS_DOWN => {
                        sim.add_stairs(abs_x, abs_y, tile_z, -1)?;
                        summary.stairs += 1;
                    }
                    _ => {}
                }
            }
        }
        summary.rooms += 1;
        summary.last_room = (screen_x, screen_y, tile_z);

        doors.left = doors.right;
        doors.bottom = doors.top;
        if exit == Exit::Stairs {
            doors.up = !doors.up;
            doors.down = !doors.down;
        } else {
            doors.up = false;
            doors.down = false;
        }
        doors.right = false;
        doors.top = false;

        match exit {
            Exit::Top => screen_y += 1,
            Exit::Right => screen_x += 1,
            Exit::Stairs => tile_z = if tile_z == 0 { 1 } else { 0 },
        }
    }

    log::info!(
        "Generated {} rooms: {} walls, {} stairs (seed {})",
        summary.rooms,
        summary.walls,
        summary.stairs,
        config.seed
    );
    Ok(summary)
}
