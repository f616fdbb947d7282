//! Bounded snapshot history with rewind.

use crate::ring::CircularBuffer;
use crate::world::World;
use crate::{CycleInput, FIXED_DT, HISTORY_FRAMES, PlayerId};

/// A fixed ring of `HISTORY_FRAMES` World snapshots.
///
/// The tail is the current world. Past snapshots are never mutated: each
/// `advance` copies the tail into a fresh slot before stepping it. The ring
/// starts pre-filled with copies of the initial world, so it is never empty.
#[derive(Debug, Clone)]
pub struct RollbackWorld {
    buf: CircularBuffer<World, HISTORY_FRAMES>,
}

impl RollbackWorld {
    pub fn new(initial: &World) -> Self {
        let mut buf: CircularBuffer<World, HISTORY_FRAMES> = CircularBuffer::new();
        for _ in 0..HISTORY_FRAMES {
            buf.add().clone_from(initial);
        }
        Self { buf }
    }

    /// The authoritative current world.
    pub fn latest(&self) -> &World {
        self.buf
            .tail()
            .unwrap_or_else(|| unreachable!("history is never empty"))
    }

    /// Number of retained snapshots, including the pre-filled copies.
    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    /// Retained snapshots, oldest first.
    pub fn history(&self) -> impl Iterator<Item = &World> {
        self.buf.iter()
    }

    /// Discard the `frames` most recent snapshots.
    ///
    /// Succeeds only when more than `frames` snapshots are retained, so at
    /// least one always survives. On failure nothing changes. The pre-filled
    /// copies count toward the retained total.
    pub fn rollback(&mut self, frames: usize) -> bool {
        if self.buf.len() <= frames {
            return false;
        }
        for _ in 0..frames {
            self.buf.remove();
        }
        true
    }

    /// Append one snapshot: the current world stepped by `FIXED_DT`.
    ///
    /// Evicts the oldest snapshot when the ring is full.
    pub fn advance(&mut self, inputs: &[(PlayerId, CycleInput)]) {
        if let Some(next) = self.buf.add_from_tail() {
            next.run_for(FIXED_DT, inputs);
        }
    }
}

impl Default for RollbackWorld {
    fn default() -> Self {
        Self::new(&World::default())
    }
}
