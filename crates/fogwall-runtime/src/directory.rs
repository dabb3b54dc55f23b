use std::sync::RwLock;

use fogwall_border::PlayerId;
use fogwall_geom::BlockPos;
use hashbrown::HashMap;

/// Who is online and where they stand.
pub trait PlayerDirectory: Send + Sync {
    /// `None` once the player has disconnected.
    fn position(&self, player: PlayerId) -> Option<BlockPos>;

    fn online_players(&self) -> Vec<PlayerId>;
}

/// Directory backed by a map the host (or a test) writes positions into.
#[derive(Debug, Default)]
pub struct SharedDirectory {
    positions: RwLock<HashMap<PlayerId, BlockPos>>,
}

impl SharedDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_position(&self, player: PlayerId, pos: BlockPos) {
        self.positions
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .insert(player, pos);
    }

    pub fn remove(&self, player: PlayerId) {
        self.positions
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .remove(&player);
    }
}

impl PlayerDirectory for SharedDirectory {
    fn position(&self, player: PlayerId) -> Option<BlockPos> {
        self.positions
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .get(&player)
            .copied()
    }

    fn online_players(&self) -> Vec<PlayerId> {
        let mut out: Vec<PlayerId> = self
            .positions
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .keys()
            .copied()
            .collect();
        out.sort_unstable();
        out
    }
}
