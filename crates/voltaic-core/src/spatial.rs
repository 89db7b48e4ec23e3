//! Spatial index owning every block instance.
//!
//! Maintains a bidirectional mapping:
//! - `positions`: coordinate -> block (which block occupies each coordinate)
//! - `blocks`: block -> instance (the instance itself, carrying its position)
//!
//! Iteration follows insertion order. Removing a block does not reorder the
//! blocks that remain, so tie-breaking in later phases is reproducible.

use crate::block::BlockInstance;
use crate::coord::{Coord, Facing};
use crate::id::BlockId;
use slotmap::SlotMap;
use std::collections::BTreeMap;

/// Errors from spatial operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SpatialError {
    #[error("position {position} is already occupied")]
    Conflict { position: Coord },
}

#[derive(Debug, Default)]
pub struct SpatialIndex {
    blocks: SlotMap<BlockId, BlockInstance>,
    positions: BTreeMap<Coord, BlockId>,
    order: Vec<BlockId>,
}

impl SpatialIndex {
    pub fn new() -> Self {
        Self::default()
    }

    // -- Placement --

    /// Insert a block at its own position. Fails if the position is taken;
    /// the existing occupant is kept.
    pub fn insert(&mut self, block: BlockInstance) -> Result<BlockId, SpatialError> {
        let position = block.position();
        if self.positions.contains_key(&position) {
            return Err(SpatialError::Conflict { position });
        }
        let id = self.blocks.insert(block);
        self.positions.insert(position, id);
        self.order.push(id);
        Ok(id)
    }

    /// Remove the block at `position`, returning it.
    pub fn remove(&mut self, position: Coord) -> Option<BlockInstance> {
        let id = self.positions.remove(&position)?;
        self.order.retain(|&other| other != id);
        self.blocks.remove(id)
    }

    // -- Point queries --

    pub fn get(&self, position: Coord) -> Option<&BlockInstance> {
        self.positions
            .get(&position)
            .and_then(|&id| self.blocks.get(id))
    }

    pub fn id_at(&self, position: Coord) -> Option<BlockId> {
        self.positions.get(&position).copied()
    }

    pub fn by_id(&self, id: BlockId) -> Option<&BlockInstance> {
        self.blocks.get(id)
    }

    pub(crate) fn by_id_mut(&mut self, id: BlockId) -> Option<&mut BlockInstance> {
        self.blocks.get_mut(id)
    }

    pub fn contains(&self, position: Coord) -> bool {
        self.positions.contains_key(&position)
    }

    // -- Adjacency --

    /// Occupant of the coordinate adjacent to `position` in `facing`.
    /// Always `None` for omni; use [`neighbors`](Self::neighbors) instead.
    pub fn neighbor(&self, position: Coord, facing: Facing) -> Option<&BlockInstance> {
        position.offset(facing).and_then(|c| self.get(c))
    }

    /// Occupants of every coordinate `facing` covers (six for omni).
    pub fn neighbors(
        &self,
        position: Coord,
        facing: Facing,
    ) -> impl Iterator<Item = &BlockInstance> {
        position.adjacent(facing).filter_map(|c| self.get(c))
    }

    // -- Iteration --

    /// All blocks in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (BlockId, &BlockInstance)> {
        self.order.iter().map(|&id| (id, &self.blocks[id]))
    }

    pub fn ids(&self) -> &[BlockId] {
        &self.order
    }

    // -- Stats --

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::*;

    #[test]
    fn insert_and_get() {
        let mut index = SpatialIndex::new();
        let id = index.insert(sink_at(Coord::new(1, 2, 3))).unwrap();
        let block = index.get(Coord::new(1, 2, 3)).unwrap();
        assert_eq!(block.position(), Coord::new(1, 2, 3));
        assert_eq!(index.id_at(Coord::new(1, 2, 3)), Some(id));
        assert!(index.get(Coord::new(0, 0, 0)).is_none());
    }

    #[test]
    fn conflict_keeps_first_occupant() {
        let mut index = SpatialIndex::new();
        let pos = Coord::new(0, 0, 0);
        index.insert(sink_at(pos)).unwrap();
        let err = index.insert(counter_at(pos)).unwrap_err();
        assert_eq!(err, SpatialError::Conflict { position: pos });
        assert_eq!(index.len(), 1);
        assert_eq!(index.get(pos).unwrap().block_type(), &sink_type());
    }

    #[test]
    fn remove_frees_position() {
        let mut index = SpatialIndex::new();
        let pos = Coord::new(4, 0, 0);
        index.insert(sink_at(pos)).unwrap();
        let removed = index.remove(pos).unwrap();
        assert_eq!(removed.position(), pos);
        assert!(index.is_empty());
        assert!(index.remove(pos).is_none());
        index.insert(counter_at(pos)).unwrap();
        assert!(index.contains(pos));
    }

    #[test]
    fn iteration_follows_insertion_order() {
        let mut index = SpatialIndex::new();
        let positions = [
            Coord::new(5, 0, 0),
            Coord::new(-3, 0, 0),
            Coord::new(0, 7, 0),
            Coord::new(0, 0, 1),
        ];
        for p in positions {
            index.insert(sink_at(p)).unwrap();
        }
        let seen: Vec<Coord> = index.iter().map(|(_, b)| b.position()).collect();
        assert_eq!(seen, positions);
    }

    #[test]
    fn removal_does_not_reorder_survivors() {
        let mut index = SpatialIndex::new();
        for x in 0..5 {
            index.insert(sink_at(Coord::new(x, 0, 0))).unwrap();
        }
        index.remove(Coord::new(2, 0, 0));
        let seen: Vec<i32> = index.iter().map(|(_, b)| b.position().x).collect();
        assert_eq!(seen, vec![0, 1, 3, 4]);
    }

    #[test]
    fn neighbor_lookup() {
        let mut index = SpatialIndex::new();
        let center = Coord::new(0, 0, 0);
        index.insert(sink_at(center)).unwrap();
        index.insert(counter_at(Coord::new(1, 0, 0))).unwrap();
        index.insert(counter_at(Coord::new(0, -1, 0))).unwrap();

        let north = index.neighbor(center, Facing::North).unwrap();
        assert_eq!(north.position(), Coord::new(1, 0, 0));
        assert!(index.neighbor(center, Facing::South).is_none());
        assert!(index.neighbor(center, Facing::Omni).is_none());
        assert_eq!(index.neighbors(center, Facing::Omni).count(), 2);
        assert_eq!(index.neighbors(center, Facing::Down).count(), 1);
    }
}
