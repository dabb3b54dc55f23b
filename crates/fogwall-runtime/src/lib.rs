//! Debounced chunk-delta processing, light refresh and the tick drivers
//! behind the per-player fake border.
#![forbid(unsafe_code)]

mod clock;
mod config;
mod debounce;
mod directory;
mod engine;
mod intercept;
mod light_refresh;
mod loaded;
mod queue;
mod ticker;

pub use clock::{Tick, TickClock, is_due};
pub use config::{ConfigError, EngineConfig, PolicyName};
pub use debounce::{DebounceRecord, DebounceScheduler};
pub use directory::{PlayerDirectory, SharedDirectory};
pub use engine::BorderEngine;
pub use intercept::{Interception, OutboundPacket};
pub use light_refresh::{Fingerprint, LightRefresher};
pub use loaded::LoadedChunks;
pub use queue::{ChunkDelta, ChunkDeltaQueue, PendingDelta};
pub use ticker::TickDriver;

pub use fogwall_geom::shapes::Shape;

pub use fogwall_border::{
    BlockBatch, BlockSnapshot, BorderPolicy, PacketEmitter, PlayerId, SendError, WorldAccess,
};
