use std::collections::BTreeSet;
use std::sync::{Arc, Mutex, RwLock};

use fogwall_border::PlayerId;
use fogwall_geom::ChunkCoord;
use hashbrown::{HashMap, HashSet};

use crate::clock::Tick;
use crate::debounce::DebounceRecord;

/// Chunk churn accumulated for one player since the last drain.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PendingDelta {
    added: HashSet<ChunkCoord>,
    removed: HashSet<ChunkCoord>,
}

impl PendingDelta {
    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.removed.is_empty()
    }

    pub fn added(&self) -> &HashSet<ChunkCoord> {
        &self.added
    }

    pub fn removed(&self) -> &HashSet<ChunkCoord> {
        &self.removed
    }

    fn union(&mut self, added: &[ChunkCoord], removed: &[ChunkCoord]) {
        self.added.extend(added.iter().copied());
        self.removed.extend(removed.iter().copied());
    }

    /// Empties the sets and returns them with every chunk present in both
    /// cancelled out.
    fn take(&mut self) -> ChunkDelta {
        let added = std::mem::take(&mut self.added);
        let removed = std::mem::take(&mut self.removed);
        ChunkDelta {
            added: added.difference(&removed).copied().collect(),
            removed: removed.difference(&added).copied().collect(),
        }
    }
}

/// Net chunk changes handed to the diff engine.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ChunkDelta {
    pub added: BTreeSet<ChunkCoord>,
    pub removed: BTreeSet<ChunkCoord>,
}

impl ChunkDelta {
    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.removed.is_empty()
    }
}

#[derive(Debug)]
struct Slot {
    pending: PendingDelta,
    record: DebounceRecord,
}

type SlotRef = Arc<Mutex<Slot>>;

/// Per-player pending chunk deltas. Each player has their own lock; the
/// outer map lock is only held long enough to find or create a slot.
#[derive(Debug, Default)]
pub struct ChunkDeltaQueue {
    slots: RwLock<HashMap<PlayerId, SlotRef>>,
}

impl ChunkDeltaQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Unions chunk changes into `player`'s pending sets. The player's
    /// debounce record is created on the first call and stamped `now`.
    /// Returns false for an empty call, which changes nothing.
    pub fn enqueue<A, R>(&self, player: PlayerId, added: A, removed: R, now: Tick) -> bool
    where
        A: IntoIterator<Item = ChunkCoord>,
        R: IntoIterator<Item = ChunkCoord>,
    {
        let added: Vec<ChunkCoord> = added.into_iter().collect();
        let removed: Vec<ChunkCoord> = removed.into_iter().collect();
        if added.is_empty() && removed.is_empty() {
            return false;
        }
        let slot = self.slot_or_insert(player, now);
        let mut slot = slot.lock().unwrap_or_else(|e| e.into_inner());
        slot.pending.union(&added, &removed);
        true
    }

    /// Takes `player`'s pending sets regardless of debounce.
    pub fn take(&self, player: PlayerId) -> Option<ChunkDelta> {
        let slot = self.slot(player)?;
        let mut slot = slot.lock().unwrap_or_else(|e| e.into_inner());
        if slot.pending.is_empty() {
            return None;
        }
        Some(slot.pending.take())
    }

    /// Takes `player`'s pending sets if `debounce` ticks have passed since
    /// they were last processed, stamping the record with `now`. The
    /// returned delta may be net-empty.
    pub fn take_ready(&self, player: PlayerId, now: Tick, debounce: u64) -> Option<ChunkDelta> {
        let slot = self.slot(player)?;
        let mut slot = slot.lock().unwrap_or_else(|e| e.into_inner());
        if slot.pending.is_empty() || !slot.record.is_ready(now, debounce) {
            return None;
        }
        slot.record.last_processed_at = now;
        Some(slot.pending.take())
    }

    /// Players with pending chunk changes.
    pub fn pending_players(&self) -> Vec<PlayerId> {
        let slots = self.slots.read().unwrap_or_else(|e| e.into_inner());
        let mut out: Vec<PlayerId> = slots
            .iter()
            .filter(|(_, s)| !s.lock().unwrap_or_else(|e| e.into_inner()).pending.is_empty())
            .map(|(p, _)| *p)
            .collect();
        out.sort_unstable();
        out
    }

    pub fn pending(&self, player: PlayerId) -> Option<PendingDelta> {
        let slot = self.slot(player)?;
        let slot = slot.lock().unwrap_or_else(|e| e.into_inner());
        Some(slot.pending.clone())
    }

    pub fn record(&self, player: PlayerId) -> Option<DebounceRecord> {
        let slot = self.slot(player)?;
        let record = slot.lock().unwrap_or_else(|e| e.into_inner()).record;
        Some(record)
    }

    /// Drops the player's pending sets and debounce record.
    pub fn forget(&self, player: PlayerId) {
        self.slots
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .remove(&player);
    }

    pub fn clear(&self) {
        self.slots.write().unwrap_or_else(|e| e.into_inner()).clear();
    }

    fn slot(&self, player: PlayerId) -> Option<SlotRef> {
        self.slots
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .get(&player)
            .cloned()
    }

    fn slot_or_insert(&self, player: PlayerId, now: Tick) -> SlotRef {
        if let Some(slot) = self.slot(player) {
            return slot;
        }
        let mut slots = self.slots.write().unwrap_or_else(|e| e.into_inner());
        slots
            .entry(player)
            .or_insert_with(|| {
                Arc::new(Mutex::new(Slot {
                    pending: PendingDelta::default(),
                    record: DebounceRecord::new(now),
                }))
            })
            .clone()
    }
}
