//! In-memory collaborators: a flat world and an emitter that records what
//! it was asked to send. Used by tests and the headless simulator.

use std::sync::{Mutex, RwLock};

use fogwall_geom::{BlockPos, WorldHeight};
use fogwall_lighting::SectionMap;
use hashbrown::{HashMap, HashSet};

use crate::emit::{BlockBatch, PacketEmitter, SendError};
use crate::world::{BlockSnapshot, PlayerId, WorldAccess};

/// Stone below `ground_y`, grass at it, air above, plus point edits.
#[derive(Debug)]
pub struct FlatWorld {
    height: WorldHeight,
    ground_y: i32,
    edits: RwLock<HashMap<BlockPos, BlockSnapshot>>,
}

impl FlatWorld {
    pub const STONE: BlockSnapshot = BlockSnapshot::new(1);
    pub const GRASS: BlockSnapshot = BlockSnapshot::new(9);

    pub fn new(height: WorldHeight, ground_y: i32) -> Self {
        Self {
            height,
            ground_y,
            edits: RwLock::new(HashMap::new()),
        }
    }

    pub fn set_block(&self, pos: BlockPos, block: BlockSnapshot) {
        self.edits
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .insert(pos, block);
    }
}

impl WorldAccess for FlatWorld {
    fn height(&self) -> WorldHeight {
        self.height
    }

    fn block_snapshot(&self, pos: BlockPos) -> BlockSnapshot {
        if let Some(b) = self
            .edits
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .get(&pos)
        {
            return *b;
        }
        if !self.height.contains_y(pos.y) || pos.y > self.ground_y {
            BlockSnapshot::AIR
        } else if pos.y == self.ground_y {
            Self::GRASS
        } else {
            Self::STONE
        }
    }

    fn is_occluding(&self, pos: BlockPos) -> bool {
        self.block_snapshot(pos) != BlockSnapshot::AIR
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Sent {
    Blocks {
        player: PlayerId,
        batch: BlockBatch,
    },
    Light {
        player: PlayerId,
        sections: SectionMap,
        sky: bool,
        block: bool,
    },
}

/// Records every successful send. Players marked failing get a transport
/// error and nothing is recorded.
#[derive(Debug, Default)]
pub struct RecordingEmitter {
    log: Mutex<Vec<Sent>>,
    failing: Mutex<HashSet<PlayerId>>,
}

impl RecordingEmitter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_failing(&self, player: PlayerId, failing: bool) {
        let mut set = self.failing.lock().unwrap_or_else(|e| e.into_inner());
        if failing {
            set.insert(player);
        } else {
            set.remove(&player);
        }
    }

    pub fn sent(&self) -> Vec<Sent> {
        self.log.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    pub fn clear(&self) {
        self.log.lock().unwrap_or_else(|e| e.into_inner()).clear();
    }

    pub fn block_batches(&self, player: PlayerId) -> Vec<BlockBatch> {
        self.sent()
            .into_iter()
            .filter_map(|s| match s {
                Sent::Blocks { player: p, batch } if p == player => Some(batch),
                _ => None,
            })
            .collect()
    }

    pub fn light_sends(&self, player: PlayerId) -> Vec<SectionMap> {
        self.sent()
            .into_iter()
            .filter_map(|s| match s {
                Sent::Light {
                    player: p,
                    sections,
                    ..
                } if p == player => Some(sections),
                _ => None,
            })
            .collect()
    }

    /// Last block the client was told about at each position.
    pub fn client_view(&self, player: PlayerId) -> HashMap<BlockPos, BlockSnapshot> {
        let mut view = HashMap::new();
        for batch in self.block_batches(player) {
            view.extend(batch.iter());
        }
        view
    }

    fn check(&self, player: PlayerId) -> Result<(), SendError> {
        if self
            .failing
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .contains(&player)
        {
            return Err(SendError::Transport {
                reason: "connection reset".to_string(),
            });
        }
        Ok(())
    }

    fn record(&self, sent: Sent) {
        self.log.lock().unwrap_or_else(|e| e.into_inner()).push(sent);
    }
}

impl PacketEmitter for RecordingEmitter {
    fn send_fake_blocks(&self, player: PlayerId, blocks: &BlockBatch) -> Result<(), SendError> {
        self.check(player)?;
        self.record(Sent::Blocks {
            player,
            batch: blocks.clone(),
        });
        Ok(())
    }

    fn send_dark_light(
        &self,
        player: PlayerId,
        sections: &SectionMap,
        include_sky: bool,
        include_block: bool,
    ) -> Result<(), SendError> {
        self.check(player)?;
        self.record(Sent::Light {
            player,
            sections: sections.clone(),
            sky: include_sky,
            block: include_block,
        });
        Ok(())
    }
}
