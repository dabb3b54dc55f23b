//! Scripted players walking over a flat world, with an emitter that encodes
//! and logs what a real connection would be sent.

use std::error::Error;
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::thread;

use fogwall_border::memory::FlatWorld;
use fogwall_geom::{BlockPos, ChunkCoord, WorldHeight};
use fogwall_lighting::{LightUpdate, SectionMap};
use fogwall_runtime::{
    BlockBatch, BorderEngine, EngineConfig, PacketEmitter, PlayerId, SendError, Shape,
    SharedDirectory, TickDriver,
};
use hashbrown::HashSet;

const GROUND_Y: i32 = 64;

pub struct SimParams {
    pub ticks: u64,
    pub players: u32,
    pub speed: f64,
    pub realtime: bool,
}

#[derive(Debug, Default)]
pub struct Summary {
    pub ticks: u64,
    pub block_packets: u64,
    pub blocks: u64,
    pub light_packets: u64,
    pub light_bytes: u64,
}

impl fmt::Display for Summary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} ticks: {} multi-block packets ({} blocks), {} light packets ({} bytes)",
            self.ticks, self.block_packets, self.blocks, self.light_packets, self.light_bytes
        )
    }
}

/// Encodes every light update and counts what would go on the wire.
#[derive(Debug, Default)]
struct LoggingEmitter {
    block_packets: AtomicU64,
    blocks: AtomicU64,
    light_packets: AtomicU64,
    light_bytes: AtomicU64,
}

impl PacketEmitter for LoggingEmitter {
    fn send_fake_blocks(&self, player: PlayerId, blocks: &BlockBatch) -> Result<(), SendError> {
        let sections = blocks.sections().count() as u64;
        self.block_packets.fetch_add(sections, Ordering::Relaxed);
        self.blocks.fetch_add(blocks.len() as u64, Ordering::Relaxed);
        log::trace!(
            target: "fogwall::wire",
            "{}: {} blocks in {} section packets",
            player,
            blocks.len(),
            sections
        );
        Ok(())
    }

    fn send_dark_light(
        &self,
        player: PlayerId,
        sections: &SectionMap,
        include_sky: bool,
        include_block: bool,
    ) -> Result<(), SendError> {
        let mut bytes = 0usize;
        for (chunk, secs) in sections {
            let update = LightUpdate::dark(*chunk, secs, include_sky, include_block);
            let mut buf = Vec::with_capacity(update.encoded_len());
            update
                .write_to(&mut buf)
                .map_err(|e| SendError::Transport {
                    reason: e.to_string(),
                })?;
            bytes += buf.len();
        }
        self.light_packets
            .fetch_add(sections.len() as u64, Ordering::Relaxed);
        self.light_bytes.fetch_add(bytes as u64, Ordering::Relaxed);
        log::trace!(
            target: "fogwall::wire",
            "{}: {} light updates, {} bytes",
            player,
            sections.len(),
            bytes
        );
        Ok(())
    }
}

struct Walker {
    id: PlayerId,
    x: f64,
    z: f64,
    dx: f64,
    dz: f64,
    loaded: HashSet<ChunkCoord>,
}

impl Walker {
    fn new(index: u32, speed: f64) -> Self {
        let angle = f64::from(index) * std::f64::consts::FRAC_PI_3;
        Self {
            id: PlayerId(0x1000 + u128::from(index)),
            x: f64::from(index) * 512.0,
            z: 0.0,
            dx: angle.cos() * speed,
            dz: angle.sin() * speed,
            loaded: HashSet::new(),
        }
    }

    fn pos(&self) -> BlockPos {
        BlockPos::new(self.x.floor() as i32, GROUND_Y + 1, self.z.floor() as i32)
    }

    fn step(&mut self) {
        self.x += self.dx;
        self.z += self.dz;
    }

    /// Loads and unloads chunks to match the square view around the walker.
    fn sync_chunks(&mut self, engine: &BorderEngine, view_distance: u32) {
        let center = self.pos().chunk();
        let r = view_distance as i32;
        let want: HashSet<ChunkCoord> = (-r..=r)
            .flat_map(|dx| (-r..=r).map(move |dz| center.offset(dx, dz)))
            .collect();
        for c in self.loaded.difference(&want) {
            engine.on_chunk_unloaded(self.id, *c);
        }
        for c in want.difference(&self.loaded) {
            engine.on_chunk_loaded(self.id, *c);
        }
        self.loaded = want;
    }
}

pub fn run(config: EngineConfig, params: &SimParams) -> Result<Summary, Box<dyn Error>> {
    let world = Arc::new(FlatWorld::new(WorldHeight::default(), GROUND_Y));
    let emitter = Arc::new(LoggingEmitter::default());
    let directory = Arc::new(SharedDirectory::new());
    let tick = config.tick_duration();
    let engine = Arc::new(BorderEngine::new(
        config,
        world,
        emitter.clone(),
        directory.clone(),
    )?);

    let mut walkers: Vec<Walker> = (0..params.players)
        .map(|i| Walker::new(i, params.speed))
        .collect();
    for w in &mut walkers {
        directory.set_position(w.id, w.pos());
        engine.on_player_join(w.id);
        engine.on_view_distance(w.id, engine.config().server_view_distance);
        w.sync_chunks(&engine, engine.view_distance(w.id));
        engine.enable(w.id);
        engine.spawn_shape(w.id, Shape::Platform { size: 2 }, w.pos(), FlatWorld::STONE)?;
    }

    let driver = if params.realtime {
        Some(TickDriver::start(engine.clone())?)
    } else {
        None
    };

    for t in 0..params.ticks {
        // halfway through, the first player turns their view distance down
        if t == params.ticks / 2 {
            if let Some(w) = walkers.first_mut() {
                let vd = engine.view_distance(w.id).saturating_sub(2).max(2);
                engine.on_view_distance(w.id, vd);
            }
        }
        for w in &mut walkers {
            w.step();
            directory.set_position(w.id, w.pos());
            w.sync_chunks(&engine, engine.view_distance(w.id));
        }
        match driver {
            Some(_) => thread::sleep(tick),
            None => {
                engine.advance_tick();
            }
        }
    }

    for w in &walkers {
        log::info!(
            "{} ended at {:?} with {} faked blocks",
            w.id,
            w.pos(),
            engine.inspect(w.id, |s| s.len()).unwrap_or(0)
        );
        engine.on_player_quit(w.id);
        directory.remove(w.id);
    }
    match driver {
        Some(d) => d.shutdown(),
        None => engine.shutdown(),
    }

    Ok(Summary {
        ticks: engine.clock().now(),
        block_packets: emitter.block_packets.load(Ordering::Relaxed),
        blocks: emitter.blocks.load(Ordering::Relaxed),
        light_packets: emitter.light_packets.load(Ordering::Relaxed),
        light_bytes: emitter.light_bytes.load(Ordering::Relaxed),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_run_sends_border_and_light() {
        let config = EngineConfig {
            border_radius: 48,
            bounds_debounce: 5,
            server_view_distance: 4,
            ..EngineConfig::default()
        };
        let params = SimParams {
            ticks: 60,
            players: 2,
            speed: 1.0,
            realtime: false,
        };
        let summary = run(config, &params).unwrap();
        assert_eq!(summary.ticks, 60);
        assert!(summary.blocks > 0);
        assert!(summary.light_packets > 0);
        assert!(summary.light_bytes > summary.light_packets * 2048);
    }
}
