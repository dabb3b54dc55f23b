//! Block and chunk coordinates plus border geometry (no world access).
#![forbid(unsafe_code)]

pub mod shapes;
mod shell;

pub use shell::{ColumnRect, enclosure, enclosure_in_chunk, ring, ring_in_chunk};

/// Horizontal size of a chunk and vertical size of a section, in blocks.
pub const CHUNK_WIDTH: i32 = 16;
pub const SECTION_HEIGHT: i32 = 16;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(test, derive(proptest_derive::Arbitrary))]
pub struct BlockPos {
    pub x: i32,
    pub y: i32,
    pub z: i32,
}

impl BlockPos {
    #[inline]
    pub const fn new(x: i32, y: i32, z: i32) -> Self {
        Self { x, y, z }
    }

    #[inline]
    pub fn offset(self, dx: i32, dy: i32, dz: i32) -> Self {
        Self {
            x: self.x + dx,
            y: self.y + dy,
            z: self.z + dz,
        }
    }

    #[inline]
    pub fn chunk(self) -> ChunkCoord {
        ChunkCoord::of(self)
    }

    #[inline]
    pub fn section(self) -> SectionPos {
        SectionPos::of(self)
    }
}

impl From<(i32, i32, i32)> for BlockPos {
    fn from(value: (i32, i32, i32)) -> Self {
        Self::new(value.0, value.1, value.2)
    }
}

/// A 16x16 column of the world, `x >> 4` / `z >> 4`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(test, derive(proptest_derive::Arbitrary))]
pub struct ChunkCoord {
    pub cx: i32,
    pub cz: i32,
}

impl ChunkCoord {
    #[inline]
    pub const fn new(cx: i32, cz: i32) -> Self {
        Self { cx, cz }
    }

    #[inline]
    pub const fn of(pos: BlockPos) -> Self {
        Self {
            cx: pos.x >> 4,
            cz: pos.z >> 4,
        }
    }

    #[inline]
    pub const fn base_x(self) -> i32 {
        self.cx * CHUNK_WIDTH
    }

    #[inline]
    pub const fn base_z(self) -> i32 {
        self.cz * CHUNK_WIDTH
    }

    #[inline]
    pub fn contains(self, pos: BlockPos) -> bool {
        Self::of(pos) == self
    }

    #[inline]
    pub fn offset(self, dx: i32, dz: i32) -> Self {
        Self {
            cx: self.cx + dx,
            cz: self.cz + dz,
        }
    }

    /// Inclusive block-column bounds of this chunk.
    #[inline]
    pub fn columns(self) -> ColumnRect {
        ColumnRect::new(
            self.base_x(),
            self.base_z(),
            self.base_x() + CHUNK_WIDTH - 1,
            self.base_z() + CHUNK_WIDTH - 1,
        )
    }
}

impl From<(i32, i32)> for ChunkCoord {
    fn from(value: (i32, i32)) -> Self {
        Self::new(value.0, value.1)
    }
}

/// Absolute section position: chunk column plus `y >> 4`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SectionPos {
    pub cx: i32,
    pub sy: i32,
    pub cz: i32,
}

impl SectionPos {
    #[inline]
    pub const fn new(cx: i32, sy: i32, cz: i32) -> Self {
        Self { cx, sy, cz }
    }

    #[inline]
    pub const fn of(pos: BlockPos) -> Self {
        Self {
            cx: pos.x >> 4,
            sy: pos.y >> 4,
            cz: pos.z >> 4,
        }
    }

    #[inline]
    pub fn chunk(self) -> ChunkCoord {
        ChunkCoord::new(self.cx, self.cz)
    }
}

/// Vertical section index relative to the bottom of the world; always >= 0
/// for positions inside the world.
pub type SectionIndex = u32;

/// Vertical extent of a world: `min_y` inclusive, `max_y` exclusive.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct WorldHeight {
    pub min_y: i32,
    pub max_y: i32,
}

impl WorldHeight {
    #[inline]
    pub const fn new(min_y: i32, max_y: i32) -> Self {
        Self { min_y, max_y }
    }

    #[inline]
    pub fn contains_y(self, y: i32) -> bool {
        y >= self.min_y && y < self.max_y
    }

    #[inline]
    pub fn clamp_y(self, y: i32) -> i32 {
        y.clamp(self.min_y, self.max_y - 1)
    }

    #[inline]
    pub fn min_section_y(self) -> i32 {
        self.min_y >> 4
    }

    /// Number of 16-block sections between `min_y` and `max_y`.
    #[inline]
    pub fn section_count(self) -> u32 {
        let top = (self.max_y - 1) >> 4;
        (top - self.min_section_y() + 1).max(0) as u32
    }

    /// Section index of block `y`, or `None` outside the world.
    #[inline]
    pub fn section_index(self, y: i32) -> Option<SectionIndex> {
        if !self.contains_y(y) {
            return None;
        }
        Some(((y >> 4) - self.min_section_y()) as SectionIndex)
    }

    #[inline]
    pub fn section_y(self, index: SectionIndex) -> i32 {
        self.min_section_y() + index as i32
    }
}

impl Default for WorldHeight {
    fn default() -> Self {
        Self::new(-64, 320)
    }
}
