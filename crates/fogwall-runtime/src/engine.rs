use std::sync::{Arc, Mutex, RwLock};

use fogwall_border::{
    BlockBatch, BlockSnapshot, BorderDiffEngine, DiffStats, PacketEmitter, PlayerBorderState,
    PlayerId, PlayerView, SendError, WorldAccess,
};
use fogwall_geom::shapes::Shape;
use fogwall_geom::{BlockPos, ChunkCoord};
use fogwall_lighting::{LightData, chunk_sections};
use hashbrown::HashMap;

use crate::clock::{Tick, TickClock, is_due};
use crate::config::{ConfigError, EngineConfig};
use crate::debounce::DebounceScheduler;
use crate::directory::PlayerDirectory;
use crate::intercept::{Interception, OutboundPacket};
use crate::light_refresh::LightRefresher;
use crate::loaded::LoadedChunks;
use crate::queue::ChunkDeltaQueue;

#[derive(Debug)]
struct PlayerSession {
    state: PlayerBorderState,
    /// Cleared under the session lock before the entry leaves the map, so
    /// a drain holding a stale handle does nothing.
    active: bool,
}

type SessionRef = Arc<Mutex<PlayerSession>>;

/// Entry point for host events, debug commands and the tick drivers.
pub struct BorderEngine {
    config: EngineConfig,
    diff: BorderDiffEngine,
    directory: Arc<dyn PlayerDirectory>,
    clock: Arc<TickClock>,
    queue: ChunkDeltaQueue,
    scheduler: DebounceScheduler,
    loaded: LoadedChunks,
    light: LightRefresher,
    sessions: RwLock<HashMap<PlayerId, SessionRef>>,
    view_distances: RwLock<HashMap<PlayerId, u32>>,
}

impl BorderEngine {
    pub fn new(
        config: EngineConfig,
        world: Arc<dyn WorldAccess>,
        emitter: Arc<dyn PacketEmitter>,
        directory: Arc<dyn PlayerDirectory>,
    ) -> Result<Self, ConfigError> {
        config.validate()?;
        let diff = BorderDiffEngine::new(world, emitter, config.border_settings());
        Ok(Self {
            scheduler: DebounceScheduler::new(config.bounds_debounce),
            light: LightRefresher::new(config.verbose_logging),
            config,
            diff,
            directory,
            clock: Arc::new(TickClock::new()),
            queue: ChunkDeltaQueue::new(),
            loaded: LoadedChunks::new(),
            sessions: RwLock::new(HashMap::new()),
            view_distances: RwLock::new(HashMap::new()),
        })
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn clock(&self) -> &Arc<TickClock> {
        &self.clock
    }

    pub fn queue(&self) -> &ChunkDeltaQueue {
        &self.queue
    }

    pub fn loaded(&self) -> &LoadedChunks {
        &self.loaded
    }

    // --- debug commands ---

    /// Starts faking the border for `player` and queues every chunk they
    /// already have loaded. Returns false if already enabled. A session
    /// that is being torn down is waited out, not counted as enabled.
    pub fn enable(&self, player: PlayerId) -> bool {
        loop {
            let existing = {
                let mut sessions = self.sessions.write().unwrap_or_else(|e| e.into_inner());
                match sessions.get(&player) {
                    Some(existing) => existing.clone(),
                    None => {
                        sessions.insert(
                            player,
                            Arc::new(Mutex::new(PlayerSession {
                                state: PlayerBorderState::new(),
                                active: true,
                            })),
                        );
                        break;
                    }
                }
            };
            // teardown clears `active` and leaves the map before unlocking
            if existing.lock().unwrap_or_else(|e| e.into_inner()).active {
                return false;
            }
        }
        let loaded = self.loaded.chunks(player);
        let count = loaded.len();
        self.queue
            .enqueue(player, loaded, std::iter::empty(), self.clock.now());
        log::info!(
            target: "fogwall::engine",
            "border enabled for {} ({} loaded chunks queued)",
            player,
            count
        );
        true
    }

    /// Restores every faked block for `player` and drops their state.
    /// Returns false if the border was not enabled.
    pub fn disable(&self, player: PlayerId) -> bool {
        let enabled = self.end_session(player);
        self.queue.forget(player);
        if enabled {
            log::info!(target: "fogwall::engine", "border disabled for {}", player);
        }
        enabled
    }

    pub fn is_enabled(&self, player: PlayerId) -> bool {
        self.session(player).is_some()
    }

    pub fn enabled_players(&self) -> Vec<PlayerId> {
        let mut out: Vec<PlayerId> = self
            .sessions
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .keys()
            .copied()
            .collect();
        out.sort_unstable();
        out
    }

    /// Runs `f` against `player`'s border state, if enabled.
    pub fn inspect<R>(&self, player: PlayerId, f: impl FnOnce(&PlayerBorderState) -> R) -> Option<R> {
        let session = self.session(player)?;
        let session = session.lock().unwrap_or_else(|e| e.into_inner());
        Some(f(&session.state))
    }

    // --- host events ---

    pub fn on_chunk_loaded(&self, player: PlayerId, chunk: ChunkCoord) {
        if self.loaded.load(player, chunk) && self.is_enabled(player) {
            self.queue
                .enqueue(player, [chunk], std::iter::empty(), self.clock.now());
        }
    }

    pub fn on_chunk_unloaded(&self, player: PlayerId, chunk: ChunkCoord) {
        if self.loaded.unload(player, chunk) && self.is_enabled(player) {
            self.queue
                .enqueue(player, std::iter::empty(), [chunk], self.clock.now());
        }
    }

    pub fn on_player_join(&self, player: PlayerId) {
        log::debug!(target: "fogwall::engine", "{} joined", player);
        if self.config.enable_on_join {
            self.enable(player);
        }
    }

    pub fn on_player_quit(&self, player: PlayerId) {
        self.end_session(player);
        self.queue.forget(player);
        self.loaded.forget(player);
        self.light.forget(player);
        self.view_distances
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .remove(&player);
        log::debug!(target: "fogwall::engine", "{} quit", player);
    }

    /// Records the client's view distance, clamped to the server's. A real
    /// change recomputes an enabled player's border. Returns whether the
    /// stored value changed.
    pub fn on_view_distance(&self, player: PlayerId, view_distance: u32) -> bool {
        let clamped = view_distance.min(self.config.server_view_distance);
        {
            let mut vds = self.view_distances.write().unwrap_or_else(|e| e.into_inner());
            let current = vds
                .get(&player)
                .copied()
                .unwrap_or(self.config.server_view_distance);
            vds.insert(player, clamped);
            if current == clamped {
                return false;
            }
        }
        let (Some(session), Some(center)) = (self.session(player), self.directory.position(player))
        else {
            return true;
        };
        let mut session = session.lock().unwrap_or_else(|e| e.into_inner());
        if session.active {
            let view = self.view(center, clamped);
            let stats = self.diff.recompute(player, &mut session.state, &view);
            log::debug!(
                target: "fogwall::engine",
                "view distance {} for {}: restored {}, faked {}",
                clamped,
                player,
                stats.restored,
                stats.faked
            );
        }
        true
    }

    pub fn view_distance(&self, player: PlayerId) -> u32 {
        self.view_distances
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .get(&player)
            .copied()
            .unwrap_or(self.config.server_view_distance)
    }

    /// A block change is going out to `player`: answer it with dark light
    /// over the touched sections.
    pub fn on_block_changed(&self, player: PlayerId, positions: &[BlockPos]) {
        let map = chunk_sections(positions.iter().copied(), self.diff.world().height());
        if map.is_empty() {
            return;
        }
        if let Err(e) = self.diff.emitter().send_dark_light(player, &map, true, true) {
            log::warn!(
                target: "fogwall::light",
                "dark light after block change for {} failed: {}",
                player,
                e
            );
        }
    }

    /// Sends a debug shape built from `material` to `player`. The blocks are
    /// not tracked as border overrides and are never restored.
    pub fn spawn_shape(
        &self,
        player: PlayerId,
        shape: Shape,
        center: BlockPos,
        material: BlockSnapshot,
    ) -> Result<usize, SendError> {
        let batch: BlockBatch = shape
            .blueprint(center)
            .into_iter()
            .map(|pos| (pos, material))
            .collect();
        self.diff.emitter().send_fake_blocks(player, &batch)?;
        log::info!(
            target: "fogwall::engine",
            "sent {:?} of {} blocks at {:?} to {}",
            shape,
            batch.len(),
            center,
            player
        );
        Ok(batch.len())
    }

    /// Zeroes sky light in a server light payload. Returns whether it must
    /// be re-encoded.
    pub fn on_light_packet_outgoing(&self, data: &mut LightData) -> bool {
        fogwall_lighting::on_light_packet_outgoing(data)
    }

    pub fn on_outgoing(&self, player: PlayerId, packet: &mut OutboundPacket) -> Interception {
        if let Some(light) = packet.light_mut() {
            return Interception {
                reencode: self.on_light_packet_outgoing(light),
            };
        }
        let positions = packet.changed_positions();
        if !positions.is_empty() {
            self.on_block_changed(player, positions);
        }
        Interception::default()
    }

    // --- ticks ---

    /// Resends blocks owed from failed sends, then applies every delta
    /// whose debounce window has elapsed. Returns the number of players
    /// whose delta was applied.
    pub fn process_bounds_tick(&self, now: Tick) -> usize {
        self.resend_unsent(now);
        let mut processed = 0;
        for (player, delta) in self.scheduler.drain_ready(&self.queue, now) {
            let Some(session) = self.session(player) else {
                log::debug!(target: "fogwall::bounds", "dropping delta for {}: not enabled", player);
                continue;
            };
            let Some(center) = self.directory.position(player) else {
                log::debug!(target: "fogwall::bounds", "dropping delta for {}: offline", player);
                continue;
            };
            let mut session = session.lock().unwrap_or_else(|e| e.into_inner());
            if !session.active {
                continue;
            }
            let view = self.view(center, self.view_distance(player));
            let stats: DiffStats = self.diff.apply_chunk_delta(
                player,
                &mut session.state,
                &view,
                &delta.added,
                &delta.removed,
            );
            log::debug!(
                target: "fogwall::bounds",
                "[tick {}] {} +{} -{} chunks: restored {}, faked {}",
                now,
                player,
                delta.added.len(),
                delta.removed.len(),
                stats.restored,
                stats.faked
            );
            processed += 1;
        }
        processed
    }

    /// Re-sends dark light to players whose view moved. Returns the number
    /// of players sent to.
    pub fn process_light_tick(&self, now: Tick) -> usize {
        let sent = self.light.refresh(
            self.directory.as_ref(),
            &self.loaded,
            self.diff.emitter().as_ref(),
            self.diff.world().height(),
        );
        if sent > 0 {
            log::debug!(target: "fogwall::light", "[tick {}] refreshed light for {} players", now, sent);
        }
        sent
    }

    /// Advances the clock one tick and runs whichever subsystems are due.
    pub fn advance_tick(&self) -> Tick {
        let now = self.clock.advance();
        if is_due(now, self.config.bounds_update_interval) {
            self.process_bounds_tick(now);
        }
        if is_due(now, self.config.light_update_interval) {
            self.process_light_tick(now);
        }
        now
    }

    /// Restores every enabled player and clears all state.
    pub fn shutdown(&self) {
        let players = self.enabled_players();
        for player in &players {
            self.end_session(*player);
        }
        self.queue.clear();
        self.loaded.clear();
        self.light.clear();
        self.view_distances
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .clear();
        log::info!(
            target: "fogwall::engine",
            "shut down, restored {} players",
            players.len()
        );
    }

    fn resend_unsent(&self, now: Tick) {
        let sessions: Vec<(PlayerId, SessionRef)> = self
            .sessions
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .iter()
            .map(|(p, s)| (*p, s.clone()))
            .collect();
        for (player, session) in sessions {
            let mut session = session.lock().unwrap_or_else(|e| e.into_inner());
            if !session.active || session.state.unsent().is_empty() {
                continue;
            }
            match self.diff.resend_unsent(player, &mut session.state) {
                Ok(n) => log::debug!(target: "fogwall::bounds", "[tick {}] resent {} blocks to {}", now, n, player),
                Err(e) => log::debug!(target: "fogwall::bounds", "[tick {}] resend to {} failed: {}", now, player, e),
            }
        }
    }

    fn session(&self, player: PlayerId) -> Option<SessionRef> {
        self.sessions
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .get(&player)
            .cloned()
    }

    fn view(&self, center: BlockPos, view_distance: u32) -> PlayerView {
        PlayerView {
            center,
            view_distance,
            height_half: self.config.height_half,
        }
    }

    fn end_session(&self, player: PlayerId) -> bool {
        match self.session(player) {
            Some(session) => self.end_handle(player, &session),
            None => false,
        }
    }

    /// Restores and removes the session behind `session`. The restore is
    /// sent while the session lock is held and before the entry is removed.
    /// A handle some other teardown already ended is left alone, as is any
    /// newer session that replaced it in the map.
    fn end_handle(&self, player: PlayerId, session: &SessionRef) -> bool {
        let mut guard = session.lock().unwrap_or_else(|e| e.into_inner());
        if !guard.active {
            return false;
        }
        guard.active = false;
        match self.diff.restore_all(player, &mut guard.state) {
            Ok(n) => log::debug!(target: "fogwall::engine", "restored {} blocks for {}", n, player),
            Err(e) => log::warn!(
                target: "fogwall::engine",
                "restore for {} failed, dropping state: {}",
                player,
                e
            ),
        }
        let mut sessions = self.sessions.write().unwrap_or_else(|e| e.into_inner());
        if sessions.get(&player).is_some_and(|s| Arc::ptr_eq(s, session)) {
            sessions.remove(&player);
        }
        drop(sessions);
        drop(guard);
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::directory::SharedDirectory;
    use fogwall_border::BlockSnapshot;
    use fogwall_border::memory::{FlatWorld, RecordingEmitter};
    use fogwall_geom::WorldHeight;
    use std::collections::BTreeSet;

    const P: PlayerId = PlayerId(0xabc);

    struct Harness {
        engine: BorderEngine,
        world: Arc<FlatWorld>,
        emitter: Arc<RecordingEmitter>,
        dir: Arc<SharedDirectory>,
    }

    fn harness(config: EngineConfig) -> Harness {
        let world = Arc::new(FlatWorld::new(WorldHeight::new(-64, 320), 64));
        let emitter = Arc::new(RecordingEmitter::new());
        let dir = Arc::new(SharedDirectory::new());
        dir.set_position(P, BlockPos::new(0, 64, 0));
        let engine =
            BorderEngine::new(config, world.clone(), emitter.clone(), dir.clone()).unwrap();
        Harness {
            engine,
            world,
            emitter,
            dir,
        }
    }

    fn small() -> EngineConfig {
        EngineConfig {
            border_radius: 20,
            bounds_debounce: 0,
            ..EngineConfig::default()
        }
    }

    fn load_square(engine: &BorderEngine, r: i32) {
        for cx in -r..=r {
            for cz in -r..=r {
                engine.on_chunk_loaded(P, ChunkCoord::new(cx, cz));
            }
        }
    }

    #[test]
    fn chunk_events_only_queue_for_enabled_players() {
        let h = harness(small());
        load_square(&h.engine, 2);
        assert!(h.engine.queue().pending(P).is_none());
        assert!(h.engine.enable(P));
        assert!(!h.engine.enable(P));
        let pending = h.engine.queue().pending(P).unwrap();
        assert_eq!(pending.added().len(), 25);
    }

    #[test]
    fn enable_then_tick_fakes_border_and_disable_restores() {
        let h = harness(small());
        load_square(&h.engine, 2);
        h.engine.enable(P);
        assert_eq!(h.engine.process_bounds_tick(1), 1);
        let faked = h.engine.inspect(P, |s| s.len()).unwrap();
        assert!(faked > 0);
        assert!(h.engine.inspect(P, |s| s.contains(BlockPos::new(20, 64, 0))).unwrap());

        assert!(h.engine.disable(P));
        assert!(!h.engine.is_enabled(P));
        assert!(h.engine.queue().record(P).is_none());
        for (pos, block) in h.emitter.client_view(P) {
            assert_eq!(block, h.world.block_snapshot(pos));
        }
        assert!(!h.engine.disable(P));
    }

    #[test]
    fn unload_is_debounced_then_restored() {
        let h = harness(EngineConfig {
            bounds_debounce: 20,
            ..small()
        });
        load_square(&h.engine, 2);
        h.engine.enable(P);
        assert_eq!(h.engine.process_bounds_tick(0), 0);
        assert_eq!(h.engine.process_bounds_tick(20), 1);

        let chunk = ChunkCoord::new(1, 0);
        h.engine.on_chunk_unloaded(P, chunk);
        assert_eq!(h.engine.process_bounds_tick(25), 0);
        assert!(h.engine.inspect(P, |s| s.is_chunk_indexed(chunk)).unwrap());
        assert_eq!(h.engine.process_bounds_tick(40), 1);
        assert!(!h.engine.inspect(P, |s| s.is_chunk_indexed(chunk)).unwrap());
        assert!(!h.engine.inspect(P, |s| s.contains(BlockPos::new(20, 64, 0))).unwrap());
    }

    #[test]
    fn reload_within_window_cancels_out() {
        let h = harness(small());
        load_square(&h.engine, 2);
        h.engine.enable(P);
        h.engine.process_bounds_tick(1);
        h.emitter.clear();
        let chunk = ChunkCoord::new(1, 0);
        h.engine.on_chunk_unloaded(P, chunk);
        h.engine.on_chunk_loaded(P, chunk);
        assert_eq!(h.engine.process_bounds_tick(2), 0);
        assert!(h.emitter.sent().is_empty());
    }

    #[test]
    fn offline_player_delta_is_dropped() {
        let h = harness(small());
        load_square(&h.engine, 1);
        h.engine.enable(P);
        h.dir.remove(P);
        assert_eq!(h.engine.process_bounds_tick(1), 0);
        assert!(h.engine.queue().pending(P).unwrap().is_empty());
        assert_eq!(h.engine.inspect(P, |s| s.len()), Some(0));
    }

    #[test]
    fn view_distance_is_clamped_and_recomputes_on_change() {
        let h = harness(EngineConfig {
            border_policy: crate::config::PolicyName::Enclosure,
            server_view_distance: 2,
            ..small()
        });
        load_square(&h.engine, 2);
        h.engine.enable(P);
        h.engine.process_bounds_tick(1);
        assert!(h.engine.inspect(P, |s| s.contains(BlockPos::new(31, 319, 5))).unwrap());

        assert!(!h.engine.on_view_distance(P, 12));
        assert_eq!(h.engine.view_distance(P), 2);
        assert!(h.engine.on_view_distance(P, 1));
        assert!(!h.engine.inspect(P, |s| s.contains(BlockPos::new(31, 319, 5))).unwrap());
        assert!(h.engine.inspect(P, |s| s.contains(BlockPos::new(16, 100, 0))).unwrap());
        assert!(!h.engine.on_view_distance(P, 1));
    }

    #[test]
    fn light_tick_sends_full_height_dark_light() {
        let h = harness(small());
        load_square(&h.engine, 1);
        assert_eq!(h.engine.process_light_tick(20), 1);
        let sends = h.emitter.light_sends(P);
        assert_eq!(sends[0].len(), 9);
        assert!(sends[0].values().all(|s| s.len() == 24));
        assert_eq!(h.engine.process_light_tick(40), 0);
    }

    #[test]
    fn outgoing_packets_are_darkened() {
        let h = harness(small());
        let mut packet = OutboundPacket::LightUpdate(fogwall_lighting::LightUpdate::dark(
            ChunkCoord::new(0, 0),
            &BTreeSet::from([3]),
            true,
            true,
        ));
        if let OutboundPacket::LightUpdate(u) = &mut packet {
            u.data.sky_arrays[0].to_mut().fill(0xff);
        }
        assert!(h.engine.on_outgoing(P, &mut packet).reencode);
        if let OutboundPacket::LightUpdate(u) = &packet {
            assert_eq!(u.data.sky_level(0, 3, 3, 3), Some(0));
        }

        let mut block = OutboundPacket::BlockChange {
            pos: BlockPos::new(17, 70, 2),
        };
        assert!(!h.engine.on_outgoing(P, &mut block).reencode);
        let sends = h.emitter.light_sends(P);
        assert_eq!(sends.len(), 1);
        assert_eq!(sends[0][&ChunkCoord::new(1, 0)], BTreeSet::from([8]));
        assert_eq!(
            h.engine.on_outgoing(P, &mut OutboundPacket::Other),
            Interception::default()
        );
    }

    #[test]
    fn chunk_data_light_is_darkened_without_extra_sends() {
        let h = harness(small());
        let mut update = fogwall_lighting::LightUpdate::dark(
            ChunkCoord::new(2, -1),
            &BTreeSet::from([4, 5]),
            true,
            true,
        );
        update.data.sky_arrays[1].to_mut().fill(0x77);
        let mut packet = OutboundPacket::ChunkData {
            chunk: update.chunk,
            light: update.data,
        };
        assert!(h.engine.on_outgoing(P, &mut packet).reencode);
        let OutboundPacket::ChunkData { light, .. } = &packet else {
            unreachable!();
        };
        assert_eq!(light.sky_level(1, 0, 0, 0), Some(0));
        assert!(h.emitter.light_sends(P).is_empty());

        let mut multi = OutboundPacket::MultiBlockChange {
            positions: vec![BlockPos::new(0, 64, 0), BlockPos::new(1, 80, 1)],
        };
        assert!(!h.engine.on_outgoing(P, &mut multi).reencode);
        let sends = h.emitter.light_sends(P);
        assert_eq!(sends[0][&ChunkCoord::new(0, 0)], BTreeSet::from([8, 9]));
    }

    #[test]
    fn border_reaches_client_after_failed_send() {
        let h = harness(small());
        h.engine.on_chunk_loaded(P, ChunkCoord::new(1, 0));
        h.engine.enable(P);
        h.emitter.set_failing(P, true);
        assert_eq!(h.engine.process_bounds_tick(1), 1);
        let tracked = h.engine.inspect(P, |s| s.len()).unwrap();
        assert!(tracked > 0);
        assert!(h.emitter.client_view(P).is_empty());
        h.engine.process_bounds_tick(2);
        assert_eq!(h.engine.inspect(P, |s| s.unsent().len()), Some(tracked));

        h.emitter.set_failing(P, false);
        h.engine.process_bounds_tick(3);
        let client = h.emitter.client_view(P);
        let faked = client
            .values()
            .filter(|b| **b == BlockSnapshot::new(85))
            .count();
        assert_eq!(faked, tracked);
        assert_eq!(h.engine.inspect(P, |s| s.unsent().len()), Some(0));
    }

    #[test]
    fn stale_teardown_leaves_newer_session_alone() {
        let h = harness(small());
        load_square(&h.engine, 2);
        h.engine.enable(P);
        h.engine.process_bounds_tick(1);
        let stale = h.engine.session(P).unwrap();

        assert!(h.engine.disable(P));
        assert!(h.engine.enable(P));
        h.engine.process_bounds_tick(2);
        let faked = h.engine.inspect(P, |s| s.len()).unwrap();
        assert!(faked > 0);

        assert!(!h.engine.end_handle(P, &stale));
        assert!(h.engine.is_enabled(P));
        assert_eq!(h.engine.inspect(P, |s| s.len()), Some(faked));
    }

    #[test]
    fn enable_waits_for_teardown_in_progress() {
        let h = harness(small());
        h.engine.enable(P);
        let old = h.engine.session(P).unwrap();
        let engine = &h.engine;
        std::thread::scope(|scope| {
            let mut guard = old.lock().unwrap();
            let enabling = scope.spawn(|| engine.enable(P));
            guard.active = false;
            engine.sessions.write().unwrap().remove(&P);
            drop(guard);
            assert!(enabling.join().unwrap());
        });
        let current = h.engine.session(P).unwrap();
        assert!(!Arc::ptr_eq(&current, &old));
        assert!(current.lock().unwrap().active);
    }

    #[test]
    fn spawned_shape_is_sent_but_not_tracked() {
        let h = harness(small());
        h.engine.enable(P);
        let center = BlockPos::new(4, 80, 4);
        let sent = h
            .engine
            .spawn_shape(P, Shape::Platform { size: 2 }, center, BlockSnapshot::new(1))
            .unwrap();
        assert_eq!(sent, 25);
        let client = h.emitter.client_view(P);
        assert_eq!(client.len(), 25);
        assert_eq!(client.get(&center), Some(&BlockSnapshot::new(1)));
        assert_eq!(h.engine.inspect(P, |s| s.len()), Some(0));

        h.emitter.set_failing(P, true);
        assert!(h
            .engine
            .spawn_shape(P, Shape::Dome { radius: 3 }, center, BlockSnapshot::new(1))
            .is_err());
    }

    #[test]
    fn join_auto_enables_and_quit_restores() {
        let h = harness(EngineConfig {
            enable_on_join: true,
            ..small()
        });
        h.engine.on_player_join(P);
        assert!(h.engine.is_enabled(P));
        load_square(&h.engine, 2);
        h.engine.process_bounds_tick(1);
        h.engine.on_player_quit(P);
        assert!(!h.engine.is_enabled(P));
        assert!(h.engine.loaded().chunks(P).is_empty());
        for (pos, block) in h.emitter.client_view(P) {
            assert_ne!(block, BlockSnapshot::new(85), "{pos:?}");
        }
    }

    #[test]
    fn failed_restore_still_drops_state() {
        let h = harness(small());
        load_square(&h.engine, 2);
        h.engine.enable(P);
        h.engine.process_bounds_tick(1);
        h.emitter.set_failing(P, true);
        assert!(h.engine.disable(P));
        assert!(!h.engine.is_enabled(P));
    }

    #[test]
    fn shutdown_restores_everyone() {
        let h = harness(small());
        let q = PlayerId(2);
        h.dir.set_position(q, BlockPos::new(100, 64, 100));
        load_square(&h.engine, 2);
        h.engine.on_chunk_loaded(q, ChunkCoord::new(7, 6));
        h.engine.enable(P);
        h.engine.enable(q);
        h.engine.process_bounds_tick(1);
        h.engine.shutdown();
        assert!(h.engine.enabled_players().is_empty());
        assert!(h.engine.loaded().chunks(P).is_empty());
        for player in [P, q] {
            for (pos, block) in h.emitter.client_view(player) {
                assert_eq!(block, h.world.block_snapshot(pos));
            }
        }
    }
}
