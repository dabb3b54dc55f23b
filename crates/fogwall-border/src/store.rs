use fogwall_geom::{BlockPos, ChunkCoord};
use hashbrown::{HashMap, HashSet};

use crate::world::BlockSnapshot;

/// Every block currently faked for one player, with the real data needed
/// to undo it, plus a per-chunk reverse index.
///
/// The index and the override map only change together, so every indexed
/// position is overridden, lies in its chunk, and every override is
/// indexed. A chunk may be indexed with no positions; that marks it as
/// processed.
///
/// Blocks whose send failed are kept in `unsent` with the value the client
/// should end up seeing, until a later send delivers them.
#[derive(Debug, Default)]
pub struct PlayerBorderState {
    overridden: HashMap<BlockPos, BlockSnapshot>,
    chunk_index: HashMap<ChunkCoord, HashSet<BlockPos>>,
    unsent: HashMap<BlockPos, BlockSnapshot>,
}

impl PlayerBorderState {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.overridden.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.overridden.is_empty()
    }

    #[inline]
    pub fn contains(&self, pos: BlockPos) -> bool {
        self.overridden.contains_key(&pos)
    }

    /// Real block data captured for an overridden position.
    #[inline]
    pub fn original(&self, pos: BlockPos) -> Option<BlockSnapshot> {
        self.overridden.get(&pos).copied()
    }

    pub fn overridden(&self) -> &HashMap<BlockPos, BlockSnapshot> {
        &self.overridden
    }

    #[inline]
    pub fn is_chunk_indexed(&self, chunk: ChunkCoord) -> bool {
        self.chunk_index.contains_key(&chunk)
    }

    pub fn chunks(&self) -> impl Iterator<Item = ChunkCoord> + '_ {
        self.chunk_index.keys().copied()
    }

    pub fn chunk_count(&self) -> usize {
        self.chunk_index.len()
    }

    pub fn chunk_positions(&self, chunk: ChunkCoord) -> Option<&HashSet<BlockPos>> {
        self.chunk_index.get(&chunk)
    }

    /// Marks `chunk` as processed without adding any positions.
    pub fn mark_chunk(&mut self, chunk: ChunkCoord) {
        self.chunk_index.entry(chunk).or_default();
    }

    /// Records an override. Returns false, keeping the first snapshot, if
    /// the position was already overridden.
    pub fn insert(&mut self, pos: BlockPos, original: BlockSnapshot) -> bool {
        if self.overridden.contains_key(&pos) {
            return false;
        }
        self.overridden.insert(pos, original);
        self.chunk_index.entry(pos.chunk()).or_default().insert(pos);
        true
    }

    /// Forgets one override. The chunk stays indexed.
    pub fn remove(&mut self, pos: BlockPos) -> Option<BlockSnapshot> {
        let original = self.overridden.remove(&pos)?;
        if let Some(set) = self.chunk_index.get_mut(&pos.chunk()) {
            set.remove(&pos);
        }
        Some(original)
    }

    /// Blocks still owed to the client after a failed send.
    pub fn unsent(&self) -> &HashMap<BlockPos, BlockSnapshot> {
        &self.unsent
    }

    /// Remembers `blocks` for a later resend, replacing older entries.
    pub fn defer(&mut self, blocks: impl IntoIterator<Item = (BlockPos, BlockSnapshot)>) {
        self.unsent.extend(blocks);
    }

    /// Forgets unsent entries for positions that have just been delivered.
    pub fn settle(&mut self, delivered: impl IntoIterator<Item = BlockPos>) {
        if self.unsent.is_empty() {
            return;
        }
        for pos in delivered {
            self.unsent.remove(&pos);
        }
    }

    pub fn take_unsent(&mut self) -> Vec<(BlockPos, BlockSnapshot)> {
        self.unsent.drain().collect()
    }

    /// Unindexes `chunk` and hands back every override it held. Unsent
    /// entries in the chunk are dropped with it.
    pub fn take_chunk(&mut self, chunk: ChunkCoord) -> Vec<(BlockPos, BlockSnapshot)> {
        if !self.unsent.is_empty() {
            self.unsent.retain(|pos, _| pos.chunk() != chunk);
        }
        let Some(positions) = self.chunk_index.remove(&chunk) else {
            return Vec::new();
        };
        let mut out = Vec::with_capacity(positions.len());
        for pos in positions {
            match self.overridden.remove(&pos) {
                Some(original) => out.push((pos, original)),
                None => debug_assert!(false, "indexed position {pos:?} has no override"),
            }
        }
        out
    }

    /// Empties the state, returning every override. Unsent entries are
    /// discarded.
    pub fn drain(&mut self) -> Vec<(BlockPos, BlockSnapshot)> {
        self.chunk_index.clear();
        self.unsent.clear();
        self.overridden.drain().collect()
    }

    /// Verifies the index/override invariants; used by tests.
    pub fn check_invariants(&self) -> Result<(), String> {
        let mut indexed = 0usize;
        for (chunk, positions) in &self.chunk_index {
            for pos in positions {
                if pos.chunk() != *chunk {
                    return Err(format!("{pos:?} indexed under {chunk:?}"));
                }
                if !self.overridden.contains_key(pos) {
                    return Err(format!("{pos:?} indexed but not overridden"));
                }
            }
            indexed += positions.len();
        }
        if indexed != self.overridden.len() {
            return Err(format!(
                "{} overrides but {} indexed positions",
                self.overridden.len(),
                indexed
            ));
        }
        Ok(())
    }
}
