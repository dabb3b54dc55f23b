use fogwall_geom::{BlockPos, ChunkCoord};
use fogwall_lighting::{LightData, LightUpdate};

/// The outgoing packets the engine cares about, as the host decoded them.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum OutboundPacket {
    LightUpdate(LightUpdate),
    ChunkData { chunk: ChunkCoord, light: LightData },
    BlockChange { pos: BlockPos },
    MultiBlockChange { positions: Vec<BlockPos> },
    Other,
}

impl OutboundPacket {
    /// Light payload the packet carries, if any.
    pub fn light_mut(&mut self) -> Option<&mut LightData> {
        match self {
            OutboundPacket::LightUpdate(update) => Some(&mut update.data),
            OutboundPacket::ChunkData { light, .. } => Some(light),
            _ => None,
        }
    }

    /// Block positions the packet changes on the client.
    pub fn changed_positions(&self) -> &[BlockPos] {
        match self {
            OutboundPacket::BlockChange { pos } => std::slice::from_ref(pos),
            OutboundPacket::MultiBlockChange { positions } => positions,
            _ => &[],
        }
    }
}

/// What the host must do with an intercepted packet.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Interception {
    /// The packet was modified in place and must be encoded again.
    pub reencode: bool,
}
