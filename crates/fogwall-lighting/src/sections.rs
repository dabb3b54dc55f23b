use std::collections::{BTreeMap, BTreeSet};

use fogwall_geom::{BlockPos, ChunkCoord, SectionIndex, WorldHeight};

/// Chunk column to the set of its sections touched by an update.
pub type SectionMap = BTreeMap<ChunkCoord, BTreeSet<SectionIndex>>;

/// Groups block positions by chunk and section; positions outside the
/// world are dropped.
pub fn chunk_sections<I>(positions: I, height: WorldHeight) -> SectionMap
where
    I: IntoIterator<Item = BlockPos>,
{
    let mut out = SectionMap::new();
    for pos in positions {
        if let Some(section) = height.section_index(pos.y) {
            out.entry(pos.chunk()).or_default().insert(section);
        }
    }
    out
}

/// Every section of every given chunk.
pub fn full_height_sections<I>(chunks: I, height: WorldHeight) -> SectionMap
where
    I: IntoIterator<Item = ChunkCoord>,
{
    let all: BTreeSet<SectionIndex> = (0..height.section_count()).collect();
    chunks.into_iter().map(|c| (c, all.clone())).collect()
}
