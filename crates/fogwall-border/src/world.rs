use std::fmt;

use fogwall_geom::{BlockPos, WorldHeight};

/// Opaque block state as the client knows it (a global state id). Only
/// ever stored and sent back, never interpreted.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct BlockSnapshot {
    pub state_id: u32,
}

impl BlockSnapshot {
    pub const AIR: BlockSnapshot = BlockSnapshot { state_id: 0 };

    #[inline]
    pub const fn new(state_id: u32) -> Self {
        Self { state_id }
    }
}

/// Stable per-session player identity.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PlayerId(pub u128);

impl fmt::Display for PlayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:032x}", self.0)
    }
}

/// Read-only view of the real world. Implementations that must run on the
/// host's main thread are responsible for getting there; the core calls
/// from its tick threads.
pub trait WorldAccess: Send + Sync {
    fn height(&self) -> WorldHeight;

    /// Real block data at `pos`, captured before it is faked.
    fn block_snapshot(&self, pos: BlockPos) -> BlockSnapshot;

    /// Whether the real block at `pos` is already opaque.
    fn is_occluding(&self, pos: BlockPos) -> bool;
}
