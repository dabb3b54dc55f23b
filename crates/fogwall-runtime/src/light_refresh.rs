use std::hash::{DefaultHasher, Hash, Hasher};
use std::sync::Mutex;

use fogwall_border::{PacketEmitter, PlayerId};
use fogwall_geom::{ChunkCoord, WorldHeight};
use fogwall_lighting::full_height_sections;
use hashbrown::{HashMap, HashSet};
use log::Level;

use crate::directory::PlayerDirectory;
use crate::loaded::LoadedChunks;

/// What a player's light was last refreshed for: where they stood and
/// which chunks they had.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Fingerprint {
    chunk: ChunkCoord,
    loaded: usize,
    hash: u64,
}

impl Fingerprint {
    /// Independent of the iteration order of `loaded`.
    pub fn new(chunk: ChunkCoord, loaded: &HashSet<ChunkCoord>) -> Self {
        let hash = loaded.iter().fold(0u64, |acc, c| {
            let mut h = DefaultHasher::new();
            c.hash(&mut h);
            acc.wrapping_add(h.finish())
        });
        Self {
            chunk,
            loaded: loaded.len(),
            hash,
        }
    }
}

/// Periodically re-sends all-dark light for every loaded chunk of players
/// whose position or loaded set moved.
#[derive(Debug, Default)]
pub struct LightRefresher {
    last: Mutex<HashMap<PlayerId, Fingerprint>>,
    verbose: bool,
}

impl LightRefresher {
    pub fn new(verbose: bool) -> Self {
        Self {
            last: Mutex::new(HashMap::new()),
            verbose,
        }
    }

    /// Returns how many players were sent light.
    pub fn refresh(
        &self,
        directory: &dyn PlayerDirectory,
        loaded: &LoadedChunks,
        emitter: &dyn PacketEmitter,
        height: WorldHeight,
    ) -> usize {
        let mut sent = 0;
        for player in directory.online_players() {
            let Some(pos) = directory.position(player) else {
                continue;
            };
            let chunks = loaded.chunks(player);
            if chunks.is_empty() {
                continue;
            }
            let fp = Fingerprint::new(pos.chunk(), &chunks);
            if self.fingerprint(player) == Some(fp) {
                continue;
            }
            let map = full_height_sections(chunks.iter().copied(), height);
            match emitter.send_dark_light(player, &map, true, true) {
                Ok(()) => {
                    self.last
                        .lock()
                        .unwrap_or_else(|e| e.into_inner())
                        .insert(player, fp);
                    let level = if self.verbose {
                        Level::Info
                    } else {
                        Level::Debug
                    };
                    log::log!(
                        target: "fogwall::light",
                        level,
                        "darkened {} chunks x {} sections for {}",
                        map.len(),
                        height.section_count(),
                        player
                    );
                    sent += 1;
                }
                Err(e) => log::warn!(
                    target: "fogwall::light",
                    "light refresh for {} failed: {}",
                    player,
                    e
                ),
            }
        }
        sent
    }

    pub fn fingerprint(&self, player: PlayerId) -> Option<Fingerprint> {
        self.last
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .get(&player)
            .copied()
    }

    pub fn forget(&self, player: PlayerId) {
        self.last
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .remove(&player);
    }

    pub fn clear(&self) {
        self.last.lock().unwrap_or_else(|e| e.into_inner()).clear();
    }
}
