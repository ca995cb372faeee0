//! Entity storage split by simulation frequency.
//!
//! Every entity has a **low** record: persistent, world-absolute, dormant by
//! default. Entities near the camera additionally get a **high** record:
//! camera-relative, carrying the state only the integrator needs. The two
//! records point at each other through typed indices.
//!
//! The high array is kept dense. Demotion moves the last high record into the
//! freed slot and rewrites that record's low back-link in the same step.

use std::fmt;

use glam::Vec2;

use crate::error::WorldError;
use crate::position::WorldPosition;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct LowIndex(u32);

impl LowIndex {
    /// Slot 0 of the low array is a permanently empty entity.
    pub const NULL: LowIndex = LowIndex(0);

    pub fn new(index: u32) -> Self {
        Self(index)
    }

    pub fn get(self) -> usize {
        self.0 as usize
    }

    pub fn is_null(self) -> bool {
        self.0 == 0
    }
}

impl fmt::Display for LowIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct HighIndex(u32);

impl HighIndex {
    pub fn get(self) -> usize {
        self.0 as usize
    }
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntityType {
    #[default]
    Null,
    Hero,
    Wall,
    Stairs,
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Facing {
    #[default]
    Right,
    Up,
    Left,
    Down,
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct LowEntity {
    pub entity_type: EntityType,
    pub position: WorldPosition,
    /// Footprint in meters.
    pub width: f32,
    pub height: f32,
    pub collides: bool,
    /// Layer change applied to anything that bumps into this entity.
    pub d_tile_z: i32,
    pub high_index: Option<HighIndex>,
}

impl LowEntity {
    pub fn new(entity_type: EntityType, position: WorldPosition) -> Self {
        Self {
            entity_type,
            position,
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct HighEntity {
    /// Relative to the camera position, in meters.
    pub position: Vec2,
    pub velocity: Vec2,
    pub tile_z: i32,
    pub facing: Facing,
    /// Jump height above the ground and its rate of change.
    pub z: f32,
    pub dz: f32,
    pub low_index: LowIndex,
}

#[derive(Debug, Clone)]
pub struct EntityStore {
    low: Vec<LowEntity>,
    high: Vec<HighEntity>,
    low_capacity: usize,
    high_capacity: usize,
}

impl EntityStore {
    /// `low_capacity` counts the reserved null entity.
    pub fn new(low_capacity: usize, high_capacity: usize) -> Self {
        Self {
            low: vec![LowEntity::default()],
            high: Vec::with_capacity(high_capacity),
            low_capacity: low_capacity.max(1),
            high_capacity,
        }
    }

    pub fn low_count(&self) -> usize {
        self.low.len()
    }

    pub fn high_count(&self) -> usize {
        self.high.len()
    }

    pub fn low_capacity(&self) -> usize {
        self.low_capacity
    }

    pub fn high_capacity(&self) -> usize {
        self.high_capacity
    }

    pub fn low(&self, index: LowIndex) -> Option<&LowEntity> {
        self.low.get(index.get())
    }

    pub fn low_mut(&mut self, index: LowIndex) -> Option<&mut LowEntity> {
        self.low.get_mut(index.get())
    }

    pub fn high(&self, index: HighIndex) -> Option<&HighEntity> {
        self.high.get(index.get())
    }

    pub fn high_mut(&mut self, index: HighIndex) -> Option<&mut HighEntity> {
        self.high.get_mut(index.get())
    }

    pub fn high_entities(&self) -> &[HighEntity] {
        &self.high
    }

    pub fn high_entities_mut(&mut self) -> &mut [HighEntity] {
        &mut self.high
    }

    /// High record of a low entity, if it is currently simulated.
    pub fn high_of(&self, index: LowIndex) -> Option<&HighEntity> {
        let high_index = self.low(index)?.high_index?;
        self.high(high_index)
    }

    /// Every real entity, skipping the null slot.
    pub fn low_indices(&self) -> impl Iterator<Item = LowIndex> {
        (1..self.low.len() as u32).map(LowIndex)
    }

    /// Index the next [`add_low`](Self::add_low) will return.
    pub fn next_low_index(&self) -> Result<LowIndex, WorldError> {
        if self.low.len() >= self.low_capacity {
            return Err(WorldError::LowEntityCapacityExceeded {
                capacity: self.low_capacity,
            });
        }
        Ok(LowIndex(self.low.len() as u32))
    }

    pub fn add_low(&mut self, mut entity: LowEntity) -> Result<LowIndex, WorldError> {
        let index = self.next_low_index()?;
        entity.high_index = None;
        self.low.push(entity);
        Ok(index)
    }

    /// Links a high record to `index`, or returns the existing one.
    pub fn make_high(
        &mut self,
        index: LowIndex,
        camera_relative: Vec2,
    ) -> Result<HighIndex, WorldError> {
        if index.is_null() {
            return Err(WorldError::UnknownEntity(index));
        }
        let low = self
            .low
            .get(index.get())
            .ok_or(WorldError::UnknownEntity(index))?;
        if let Some(existing) = low.high_index {
            return Ok(existing);
        }
        if self.high.len() >= self.high_capacity {
            return Err(WorldError::HighEntityCapacityExceeded {
                capacity: self.high_capacity,
            });
        }

        let high_index = HighIndex(self.high.len() as u32);
        self.high.push(HighEntity {
            position: camera_relative,
            tile_z: low.position.tile_z,
            low_index: index,
            ..HighEntity::default()
        });
        self.low[index.get()].high_index = Some(high_index);
        log::trace!("Entity {index} promoted to high slot {}", high_index.get());
        Ok(high_index)
    }

    /// Releases the high record of `index`, if it has one.
    pub fn make_low(&mut self, index: LowIndex) {
        let Some(high_index) = self
            .low
            .get_mut(index.get())
            .and_then(|low| low.high_index.take())
        else {
            return;
        };

        let removed = high_index.get();
        let last = self.high.len() - 1;
        self.high.swap_remove(removed);
        if removed != last {
            let moved_low = self.high[removed].low_index;
            self.low[moved_low.get()].high_index = Some(high_index);
        }
        log::trace!("Entity {index} demoted from high slot {removed}");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store_with(count: usize) -> (EntityStore, Vec<LowIndex>) {
        let mut store = EntityStore::new(64, 8);
        let indices = (0..count)
            .map(|i| {
                let position = WorldPosition::centered_tile_point(i as i32, 0, 0);
                store
                    .add_low(LowEntity::new(EntityType::Wall, position))
                    .expect("under capacity")
            })
            .collect();
        (store, indices)
    }

    fn assert_links_consistent(store: &EntityStore) {
        for (slot, high) in store.high_entities().iter().enumerate() {
            let low = store.low(high.low_index).expect("back-link valid");
            assert_eq!(low.high_index.map(HighIndex::get), Some(slot));
        }
        let linked = store
            .low_indices()
            .filter(|&i| store.low(i).and_then(|l| l.high_index).is_some())
            .count();
        assert_eq!(linked, store.high_count());
    }

    #[test]
    fn null_entity_is_reserved() {
        let (mut store, indices) = store_with(1);
        assert_eq!(indices[0], LowIndex::new(1));
        assert_eq!(store.low_count(), 2);
        assert!(store.make_high(LowIndex::NULL, Vec2::ZERO).is_err());
    }

    #[test]
    fn make_high_is_idempotent() {
        let (mut store, indices) = store_with(2);
        let first = store.make_high(indices[1], Vec2::new(1.0, 2.0)).expect("room");
        let again = store.make_high(indices[1], Vec2::ZERO).expect("room");
        assert_eq!(first, again);
        assert_eq!(store.high_count(), 1);
        let high = store.high_of(indices[1]).expect("is high");
        assert_eq!(high.position, Vec2::new(1.0, 2.0));
        assert_eq!(high.velocity, Vec2::ZERO);
    }

    #[test]
    fn demotion_keeps_high_array_dense_and_links_fixed() {
        let (mut store, indices) = store_with(5);
        for &index in &indices {
            store.make_high(index, Vec2::ZERO).expect("room");
        }
        store.make_low(indices[1]);
        assert_eq!(store.high_count(), 4);
        assert!(store.high_of(indices[1]).is_none());
        assert_links_consistent(&store);

        store.make_low(indices[4]);
        store.make_low(indices[0]);
        assert_eq!(store.high_count(), 2);
        assert_links_consistent(&store);
    }

    #[test]
    fn demoting_a_low_entity_is_a_no_op() {
        let (mut store, indices) = store_with(2);
        store.make_high(indices[0], Vec2::ZERO).expect("room");
        store.make_low(indices[1]);
        assert_eq!(store.high_count(), 1);
        assert_links_consistent(&store);
    }

    #[test]
    fn capacity_exhaustion_is_reported() {
        let mut store = EntityStore::new(3, 1);
        let a = store
            .add_low(LowEntity::new(EntityType::Wall, WorldPosition::default()))
            .expect("room");
        let b = store
            .add_low(LowEntity::new(EntityType::Wall, WorldPosition::default()))
            .expect("room");
        assert_eq!(
            store.add_low(LowEntity::default()),
            Err(WorldError::LowEntityCapacityExceeded { capacity: 3 })
        );

        store.make_high(a, Vec2::ZERO).expect("room");
        assert_eq!(
            store.make_high(b, Vec2::ZERO),
            Err(WorldError::HighEntityCapacityExceeded { capacity: 1 })
        );
    }
}
