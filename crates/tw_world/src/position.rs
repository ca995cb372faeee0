//! Hybrid world coordinates: integer tile indices plus a continuous offset
//! from the tile centre.
//!
//! A position is *canonical* when its offset lies within half a tile of the
//! centre on both axes. Canonicalizing carries whole tiles out of the offset
//! into the tile index; tile arithmetic saturates so no input can wrap the
//! coordinate space.

use glam::Vec2;

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct WorldPosition {
    pub tile_x: i32,
    pub tile_y: i32,
    /// Discrete layer (floor) index.
    pub tile_z: i32,
    /// Meters from the tile centre.
    pub offset: Vec2,
}

impl WorldPosition {
    pub fn centered_tile_point(tile_x: i32, tile_y: i32, tile_z: i32) -> Self {
        Self {
            tile_x,
            tile_y,
            tile_z,
            offset: Vec2::ZERO,
        }
    }

    /// Ignores the offset.
    pub fn same_tile(&self, other: &WorldPosition) -> bool {
        self.tile_x == other.tile_x && self.tile_y == other.tile_y && self.tile_z == other.tile_z
    }
}

/// `a - b` in meters. Not a position; only meaningful as a delta.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct WorldDifference {
    pub delta_xy: Vec2,
    pub delta_z: f32,
}

fn recanonicalize_coord(tile_side_in_meters: f32, tile: &mut i32, offset: &mut f32) {
    let half = 0.5 * tile_side_in_meters;
    if offset.abs() <= half {
        return;
    }

    // f32::round is round-half-away-from-zero.
    let carry = (*offset / tile_side_in_meters).round();
    *tile = tile.saturating_add(carry as i32);
    *offset -= carry * tile_side_in_meters;
    // Float error can leave the result an ulp past the boundary, and a value
    // past the boundary would carry again on the next pass.
    *offset = offset.clamp(-half, half);
}

pub fn canonicalize(tile_side_in_meters: f32, position: WorldPosition) -> WorldPosition {
    let mut result = position;
    recanonicalize_coord(tile_side_in_meters, &mut result.tile_x, &mut result.offset.x);
    recanonicalize_coord(tile_side_in_meters, &mut result.tile_y, &mut result.offset.y);
    result
}

pub fn map_into_tile_space(
    tile_side_in_meters: f32,
    base: WorldPosition,
    offset: Vec2,
) -> WorldPosition {
    let mut result = base;
    result.offset += offset;
    canonicalize(tile_side_in_meters, result)
}

pub fn subtract(tile_side_in_meters: f32, a: &WorldPosition, b: &WorldPosition) -> WorldDifference {
    let delta_tile_xy = Vec2::new(
        (i64::from(a.tile_x) - i64::from(b.tile_x)) as f32,
        (i64::from(a.tile_y) - i64::from(b.tile_y)) as f32,
    );
    let delta_tile_z = (i64::from(a.tile_z) - i64::from(b.tile_z)) as f32;

    WorldDifference {
        delta_xy: tile_side_in_meters * delta_tile_xy + (a.offset - b.offset),
        delta_z: tile_side_in_meters * delta_tile_z,
    }
}
