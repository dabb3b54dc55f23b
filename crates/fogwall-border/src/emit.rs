use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use fogwall_geom::{BlockPos, ChunkCoord, SectionPos};
use fogwall_lighting::SectionMap;
use hashbrown::HashMap;

use crate::world::{BlockSnapshot, PlayerId};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SendError {
    Disconnected,
    Transport { reason: String },
}

impl fmt::Display for SendError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SendError::Disconnected => write!(f, "player is not connected"),
            SendError::Transport { reason } => write!(f, "packet send failed: {}", reason),
        }
    }
}

impl std::error::Error for SendError {}

/// Block overrides keyed by section, ready to become one
/// multi-block-change packet per entry.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct BlockBatch {
    sections: BTreeMap<SectionPos, HashMap<BlockPos, BlockSnapshot>>,
    len: usize,
}

impl BlockBatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, pos: BlockPos, block: BlockSnapshot) {
        let section = self.sections.entry(pos.section()).or_default();
        if section.insert(pos, block).is_none() {
            self.len += 1;
        }
    }

    pub fn get(&self, pos: BlockPos) -> Option<BlockSnapshot> {
        self.sections
            .get(&pos.section())
            .and_then(|s| s.get(&pos).copied())
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn sections(&self) -> impl Iterator<Item = (&SectionPos, &HashMap<BlockPos, BlockSnapshot>)> {
        self.sections.iter()
    }

    pub fn chunks(&self) -> BTreeSet<ChunkCoord> {
        self.sections.keys().map(|s| s.chunk()).collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = (BlockPos, BlockSnapshot)> + '_ {
        self.sections
            .values()
            .flat_map(|s| s.iter().map(|(p, b)| (*p, *b)))
    }
}

impl FromIterator<(BlockPos, BlockSnapshot)> for BlockBatch {
    fn from_iter<T: IntoIterator<Item = (BlockPos, BlockSnapshot)>>(iter: T) -> Self {
        let mut batch = BlockBatch::new();
        for (pos, block) in iter {
            batch.insert(pos, block);
        }
        batch
    }
}

/// Outbound packet transport. Sends are fire-and-forget: `Ok` means the
/// packets were handed to the connection, not that the client saw them.
pub trait PacketEmitter: Send + Sync {
    fn send_fake_blocks(&self, player: PlayerId, blocks: &BlockBatch) -> Result<(), SendError>;

    fn send_dark_light(
        &self,
        player: PlayerId,
        sections: &SectionMap,
        include_sky: bool,
        include_block: bool,
    ) -> Result<(), SendError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn batch_groups_by_section() {
        let mut b = BlockBatch::new();
        b.insert(BlockPos::new(0, 0, 0), BlockSnapshot::new(1));
        b.insert(BlockPos::new(1, 15, 1), BlockSnapshot::new(1));
        b.insert(BlockPos::new(1, 16, 1), BlockSnapshot::new(2));
        b.insert(BlockPos::new(-1, 0, 0), BlockSnapshot::new(3));
        b.insert(BlockPos::new(0, 0, 0), BlockSnapshot::new(4));
        assert_eq!(b.len(), 4);
        assert_eq!(b.sections().count(), 3);
        assert_eq!(b.get(BlockPos::new(0, 0, 0)), Some(BlockSnapshot::new(4)));
        assert_eq!(
            b.chunks(),
            BTreeSet::from([ChunkCoord::new(-1, 0), ChunkCoord::new(0, 0)])
        );
        assert_eq!(b.iter().count(), 4);
    }
}
