use std::sync::atomic::{AtomicU64, Ordering};

pub type Tick = u64;

/// Shared game-tick counter.
#[derive(Debug, Default)]
pub struct TickClock {
    now: AtomicU64,
}

impl TickClock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn starting_at(tick: Tick) -> Self {
        Self {
            now: AtomicU64::new(tick),
        }
    }

    #[inline]
    pub fn now(&self) -> Tick {
        self.now.load(Ordering::Acquire)
    }

    /// Moves the clock one tick forward and returns the new tick.
    #[inline]
    pub fn advance(&self) -> Tick {
        self.now.fetch_add(1, Ordering::AcqRel) + 1
    }

    pub fn set(&self, tick: Tick) {
        self.now.store(tick, Ordering::Release);
    }
}

/// True on ticks that are a multiple of `interval`.
#[inline]
pub fn is_due(tick: Tick, interval: u64) -> bool {
    interval != 0 && tick % interval == 0
}
