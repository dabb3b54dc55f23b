use fogwall_border::PlayerId;

use crate::clock::Tick;
use crate::queue::{ChunkDelta, ChunkDeltaQueue};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DebounceRecord {
    pub last_processed_at: Tick,
}

impl DebounceRecord {
    pub fn new(now: Tick) -> Self {
        Self {
            last_processed_at: now,
        }
    }

    #[inline]
    pub fn is_ready(&self, now: Tick, debounce: u64) -> bool {
        now.saturating_sub(self.last_processed_at) >= debounce
    }
}

/// Hands out at most one delta per player per debounce window.
#[derive(Clone, Copy, Debug)]
pub struct DebounceScheduler {
    debounce: u64,
}

impl DebounceScheduler {
    pub fn new(debounce: u64) -> Self {
        Self { debounce }
    }

    pub fn debounce(&self) -> u64 {
        self.debounce
    }

    /// Net deltas for every player whose window has elapsed. Players still
    /// inside their window keep their pending sets.
    pub fn drain_ready(&self, queue: &ChunkDeltaQueue, now: Tick) -> Vec<(PlayerId, ChunkDelta)> {
        let mut out = Vec::new();
        for player in queue.pending_players() {
            let Some(delta) = queue.take_ready(player, now, self.debounce) else {
                continue;
            };
            if delta.is_empty() {
                log::debug!(target: "fogwall::bounds", "delta for {} cancelled out", player);
                continue;
            }
            out.push((player, delta));
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fogwall_geom::ChunkCoord;

    const P: PlayerId = PlayerId(3);
    const NONE: [ChunkCoord; 0] = [];

    #[test]
    fn withholds_until_window_elapses() {
        let q = ChunkDeltaQueue::new();
        let s = DebounceScheduler::new(20);
        q.enqueue(P, [ChunkCoord::new(1, 1)], NONE, 0);

        assert!(s.drain_ready(&q, 5).is_empty());
        assert!(!q.pending(P).unwrap().is_empty());

        let ready = s.drain_ready(&q, 21);
        assert_eq!(ready.len(), 1);
        assert_eq!(ready[0].0, P);
        assert_eq!(q.record(P).unwrap().last_processed_at, 21);
        assert!(q.pending(P).unwrap().is_empty());
    }

    #[test]
    fn next_window_counts_from_last_processing() {
        let q = ChunkDeltaQueue::new();
        let s = DebounceScheduler::new(20);
        q.enqueue(P, [ChunkCoord::new(1, 1)], NONE, 0);
        assert_eq!(s.drain_ready(&q, 20).len(), 1);
        q.enqueue(P, [ChunkCoord::new(2, 1)], NONE, 25);
        assert!(s.drain_ready(&q, 39).is_empty());
        assert_eq!(s.drain_ready(&q, 40).len(), 1);
    }

    #[test]
    fn cancelled_delta_is_stamped_and_dropped() {
        let q = ChunkDeltaQueue::new();
        let s = DebounceScheduler::new(0);
        let c = ChunkCoord::new(4, 4);
        q.enqueue(P, [c], NONE, 0);
        q.enqueue(P, NONE, [c], 0);
        assert!(s.drain_ready(&q, 7).is_empty());
        assert_eq!(q.record(P).unwrap().last_processed_at, 7);
        assert!(q.pending_players().is_empty());
    }
}
