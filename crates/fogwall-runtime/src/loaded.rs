use std::sync::RwLock;

use fogwall_border::PlayerId;
use fogwall_geom::ChunkCoord;
use hashbrown::{HashMap, HashSet};

/// Chunks each player's client currently has loaded.
#[derive(Debug, Default)]
pub struct LoadedChunks {
    players: RwLock<HashMap<PlayerId, HashSet<ChunkCoord>>>,
}

impl LoadedChunks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns true if `chunk` was not already loaded for `player`.
    pub fn load(&self, player: PlayerId, chunk: ChunkCoord) -> bool {
        self.players
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .entry(player)
            .or_default()
            .insert(chunk)
    }

    /// Returns true if `chunk` was loaded for `player`. A player whose set
    /// empties is forgotten.
    pub fn unload(&self, player: PlayerId, chunk: ChunkCoord) -> bool {
        let mut players = self.players.write().unwrap_or_else(|e| e.into_inner());
        let Some(set) = players.get_mut(&player) else {
            return false;
        };
        let removed = set.remove(&chunk);
        if set.is_empty() {
            players.remove(&player);
        }
        removed
    }

    pub fn chunks(&self, player: PlayerId) -> HashSet<ChunkCoord> {
        self.players
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .get(&player)
            .cloned()
            .unwrap_or_default()
    }

    pub fn is_loaded(&self, player: PlayerId, chunk: ChunkCoord) -> bool {
        self.players
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .get(&player)
            .is_some_and(|s| s.contains(&chunk))
    }

    pub fn forget(&self, player: PlayerId) {
        self.players
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .remove(&player);
    }

    pub fn clear(&self) {
        self.players.write().unwrap_or_else(|e| e.into_inner()).clear();
    }
}
