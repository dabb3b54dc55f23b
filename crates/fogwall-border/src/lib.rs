//! Per-player fake border blocks: what is faked, what it replaced, and the
//! diff that keeps the client's view in step with loaded chunks.
#![forbid(unsafe_code)]

mod diff;
mod emit;
pub mod memory;
mod store;
mod world;

pub use diff::{BorderDiffEngine, BorderPolicy, BorderSettings, DiffStats, PlayerView};
pub use emit::{BlockBatch, PacketEmitter, SendError};
pub use store::PlayerBorderState;
pub use world::{BlockSnapshot, PlayerId, WorldAccess};
