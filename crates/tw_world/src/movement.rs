//! Entity movement: damped semi-implicit integration followed by a swept
//! AABB solve against every other simulated entity.
//!
//! Each obstacle is grown by the mover's footprint (Minkowski sum) so the
//! mover can be treated as a point travelling along its displacement ray.
//! The earliest wall hit wins; the mover stops just short of it, loses the
//! velocity component into the wall and slides along it with whatever
//! displacement is left, up to `collision_iterations` times per move.
//!
//! Equal-time hits against different entities resolve to the lower low
//! index, so results do not depend on the order of the high array.
//!
//! Non-colliding entities with a layer change (stairs) are overlap triggers.
//! They fire once, on the move that takes the mover's footprint into them,
//! so standing on the paired stairs of the destination layer does nothing.

use glam::Vec2;

use crate::entity::{Facing, HighEntity, LowEntity, LowIndex};
use crate::error::WorldError;
use crate::sim::Simulation;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MoveSpec {
    /// m/s² at full input.
    pub acceleration: f32,
    pub drag: f32,
    pub collision_iterations: u32,
    /// Initial upward speed of a jump, m/s.
    pub jump_speed: f32,
    pub gravity: f32,
    /// Fraction of the remaining move kept back from a wall on impact.
    pub time_epsilon: f32,
}

impl Default for MoveSpec {
    fn default() -> Self {
        Self {
            acceleration: 50.0,
            drag: 8.0,
            collision_iterations: 4,
            jump_speed: 3.0,
            gravity: -9.8,
            time_epsilon: 0.001,
        }
    }
}

/// Time of impact of a point moving from `rel` by `delta` with the line
/// `x = wall`, if it crosses within `min_y..=max_y`.
fn test_wall(
    wall: f32,
    rel_x: f32,
    rel_y: f32,
    delta_x: f32,
    delta_y: f32,
    min_y: f32,
    max_y: f32,
) -> Option<f32> {
    if delta_x == 0.0 {
        return None;
    }
    let t = (wall - rel_x) / delta_x;
    if t < 0.0 {
        return None;
    }
    let y = rel_y + t * delta_y;
    (y >= min_y && y <= max_y).then_some(t)
}

#[derive(Debug, Clone, Copy)]
struct Hit {
    t: f32,
    normal: Vec2,
    other: LowIndex,
    d_tile_z: i32,
}

fn facing_from_velocity(velocity: Vec2, current: Facing) -> Facing {
    if velocity.x.abs() > velocity.y.abs() {
        if velocity.x > 0.0 {
            Facing::Right
        } else {
            Facing::Left
        }
    } else if velocity.y.abs() > velocity.x.abs() {
        if velocity.y > 0.0 {
            Facing::Up
        } else {
            Facing::Down
        }
    } else {
        current
    }
}

impl Simulation {
    /// Advances one entity by `dt` seconds under input acceleration `ddp`
    /// (unit-clamped). Returns `Ok(false)` if the entity is not simulated.
    pub fn move_entity(
        &mut self,
        index: LowIndex,
        ddp: Vec2,
        dt: f32,
    ) -> Result<bool, WorldError> {
        let low = *self
            .entities
            .low(index)
            .filter(|_| !index.is_null())
            .ok_or(WorldError::UnknownEntity(index))?;
        let Some(high_index) = low.high_index else {
            return Ok(false);
        };
        let mut high: HighEntity = *self
            .entities
            .high(high_index)
            .ok_or(WorldError::UnknownEntity(index))?;
        let params = self.movement;

        let mut ddp = ddp;
        if ddp.length_squared() > 1.0 {
            ddp = ddp.normalize();
        }
        ddp *= params.acceleration;
        ddp += -params.drag * high.velocity;

        let mut delta = 0.5 * ddp * dt * dt + high.velocity * dt;
        high.velocity += ddp * dt;

        high.z += 0.5 * params.gravity * dt * dt + high.dz * dt;
        high.dz += params.gravity * dt;
        if high.z < 0.0 {
            high.z = 0.0;
            high.dz = 0.0;
        }

        let start = high.position;
        for _ in 0..params.collision_iterations {
            let desired = high.position + delta;
            let hit = self.earliest_hit(index, &low, &high, delta);

            let t_min = match hit {
                Some(hit) => (hit.t - params.time_epsilon).max(0.0),
                None => 1.0,
            };
            high.position += t_min * delta;

            let Some(hit) = hit else {
                break;
            };
            high.velocity -= high.velocity.dot(hit.normal) * hit.normal;
            delta = desired - high.position;
            delta -= delta.dot(hit.normal) * hit.normal;
            high.tile_z = high.tile_z.saturating_add(hit.d_tile_z);
            if hit.d_tile_z != 0 {
                log::debug!("Entity {index} changed layer via {}", hit.other);
            }
        }

        if let Some((stairs, d_tile_z)) =
            self.entered_trigger(index, &low, start, high.position, high.tile_z)
        {
            high.tile_z = high.tile_z.saturating_add(d_tile_z);
            log::debug!("Entity {index} took stairs {stairs} to layer {}", high.tile_z);
        }

        high.facing = facing_from_velocity(high.velocity, high.facing);
        if let Some(slot) = self.entities.high_mut(high_index) {
            *slot = high;
        }

        let mut new_position = self.world.map_into_tile_space(self.camera, high.position);
        new_position.tile_z = high.tile_z;
        self.world
            .change_entity_location(index, Some(&low.position), &new_position)?;
        if let Some(low) = self.entities.low_mut(index) {
            low.position = new_position;
        }
        Ok(true)
    }

    /// Layer trigger on `tile_z` whose footprint the mover overlaps at `end`
    /// but not at `start`. The lowest low index wins if several are entered.
    fn entered_trigger(
        &self,
        index: LowIndex,
        mover: &LowEntity,
        start: Vec2,
        end: Vec2,
        tile_z: i32,
    ) -> Option<(LowIndex, i32)> {
        let mut entered: Option<(LowIndex, i32)> = None;
        for other in self.entities.high_entities() {
            if other.low_index == index || other.tile_z != tile_z {
                continue;
            }
            let Some(other_low) = self.entities.low(other.low_index) else {
                continue;
            };
            if other_low.collides || other_low.d_tile_z == 0 {
                continue;
            }

            let half = 0.5
                * Vec2::new(
                    other_low.width + mover.width,
                    other_low.height + mover.height,
                );
            let overlaps = |p: Vec2| {
                let rel = (p - other.position).abs();
                rel.x < half.x && rel.y < half.y
            };
            let lower = entered.map_or(true, |(best, _)| other.low_index < best);
            if overlaps(end) && !overlaps(start) && lower {
                entered = Some((other.low_index, other_low.d_tile_z));
            }
        }
        entered
    }

    fn earliest_hit(
        &self,
        index: LowIndex,
        mover: &LowEntity,
        high: &HighEntity,
        delta: Vec2,
    ) -> Option<Hit> {
        if !mover.collides {
            return None;
        }

        let mut best: Option<Hit> = None;
        let mut best_t = 1.0f32;
        for other in self.entities.high_entities() {
            if other.low_index == index || other.tile_z != high.tile_z {
                continue;
            }
            let Some(other_low) = self.entities.low(other.low_index) else {
                continue;
            };
            if !other_low.collides {
                continue;
            }

            let diameter = Vec2::new(
                other_low.width + mover.width,
                other_low.height + mover.height,
            );
            let min = -0.5 * diameter;
            let max = 0.5 * diameter;
            let rel = high.position - other.position;

            let edges = [
                (test_wall(min.x, rel.x, rel.y, delta.x, delta.y, min.y, max.y), Vec2::NEG_X),
                (test_wall(max.x, rel.x, rel.y, delta.x, delta.y, min.y, max.y), Vec2::X),
                (test_wall(min.y, rel.y, rel.x, delta.y, delta.x, min.x, max.x), Vec2::NEG_Y),
                (test_wall(max.y, rel.y, rel.x, delta.y, delta.x, min.x, max.x), Vec2::Y),
            ];
            for (t, normal) in edges {
                let Some(t) = t else {
                    continue;
                };
                let earlier = t < best_t;
                let tie_wins = t == best_t && best.is_some_and(|b| other.low_index < b.other);
                if earlier || tie_wins {
                    best_t = t;
                    best = Some(Hit {
                        t,
                        normal,
                        other: other.low_index,
                        d_tile_z: other_low.d_tile_z,
                    });
                }
            }
        }
        best
    }
}
