use std::sync::Arc;

use fogwall_geom::{BlockPos, ChunkCoord, enclosure_in_chunk, ring_in_chunk};
use hashbrown::HashSet;
use log::Level;
use rayon::prelude::*;

use crate::emit::{BlockBatch, PacketEmitter, SendError};
use crate::store::PlayerBorderState;
use crate::world::{BlockSnapshot, PlayerId, WorldAccess};

/// Which border geometry an engine draws. Exactly one is active.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum BorderPolicy {
    /// Thin ring at a fixed radius, `height_half` blocks above and below
    /// the player.
    #[default]
    Ring,
    /// Full-height wall with a cap, at the edge of the view distance.
    Enclosure,
}

#[derive(Clone, Copy, Debug)]
pub struct BorderSettings {
    pub policy: BorderPolicy,
    pub radius: i32,
    pub material: BlockSnapshot,
    /// Log every batch at info instead of debug.
    pub verbose: bool,
}

impl Default for BorderSettings {
    fn default() -> Self {
        Self {
            policy: BorderPolicy::Ring,
            radius: 128,
            material: BlockSnapshot::new(85),
            verbose: false,
        }
    }
}

/// Where a player is and how far they see, sampled when a diff runs.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PlayerView {
    pub center: BlockPos,
    pub view_distance: u32,
    pub height_half: i32,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct DiffStats {
    pub restored: usize,
    pub faked: usize,
}

impl DiffStats {
    pub fn is_empty(&self) -> bool {
        self.restored == 0 && self.faked == 0
    }
}

/// Reconciles a player's faked blocks with the border they should see and
/// sends the difference.
pub struct BorderDiffEngine {
    world: Arc<dyn WorldAccess>,
    emitter: Arc<dyn PacketEmitter>,
    settings: BorderSettings,
}

impl BorderDiffEngine {
    pub fn new(
        world: Arc<dyn WorldAccess>,
        emitter: Arc<dyn PacketEmitter>,
        settings: BorderSettings,
    ) -> Self {
        Self {
            world,
            emitter,
            settings,
        }
    }

    pub fn settings(&self) -> &BorderSettings {
        &self.settings
    }

    pub fn world(&self) -> &Arc<dyn WorldAccess> {
        &self.world
    }

    pub fn emitter(&self) -> &Arc<dyn PacketEmitter> {
        &self.emitter
    }

    /// Border positions for `view` that fall inside `chunk`.
    pub fn shell_for_chunk(&self, view: &PlayerView, chunk: ChunkCoord) -> HashSet<BlockPos> {
        let height = self.world.height();
        match self.settings.policy {
            BorderPolicy::Ring => ring_in_chunk(
                view.center,
                self.settings.radius,
                view.height_half,
                height,
                chunk,
            ),
            BorderPolicy::Enclosure => {
                let radius = i32::try_from(view.view_distance)
                    .unwrap_or(i32::MAX / 16)
                    .saturating_mul(16);
                enclosure_in_chunk(view.center, radius, height, chunk, |p| {
                    self.world.is_occluding(p)
                })
            }
        }
    }

    /// Restores every override in `removed`, then fakes the border in each
    /// newly `added` chunk that is not indexed yet.
    pub fn apply_chunk_delta<'a, A, R>(
        &self,
        player: PlayerId,
        state: &mut PlayerBorderState,
        view: &PlayerView,
        added: A,
        removed: R,
    ) -> DiffStats
    where
        A: IntoIterator<Item = &'a ChunkCoord>,
        R: IntoIterator<Item = &'a ChunkCoord>,
    {
        let mut restore = BlockBatch::new();
        for chunk in removed {
            for (pos, original) in state.take_chunk(*chunk) {
                restore.insert(pos, original);
            }
        }
        // the client has dropped these chunks, so a failed restore is moot
        self.send(player, state, &restore, "restore", false);

        let mut fake = BlockBatch::new();
        for chunk in added {
            if state.is_chunk_indexed(*chunk) {
                continue;
            }
            let shell = self.shell_for_chunk(view, *chunk);
            if shell.is_empty() {
                state.mark_chunk(*chunk);
                continue;
            }
            for pos in shell {
                if state.contains(pos) {
                    continue;
                }
                let original = self.world.block_snapshot(pos);
                if state.insert(pos, original) {
                    fake.insert(pos, self.settings.material);
                }
            }
        }
        self.send(player, state, &fake, "border", true);

        DiffStats {
            restored: restore.len(),
            faked: fake.len(),
        }
    }

    /// Recomputes the border over every indexed chunk for a changed view,
    /// restoring positions that left the border and faking new ones.
    pub fn recompute(
        &self,
        player: PlayerId,
        state: &mut PlayerBorderState,
        view: &PlayerView,
    ) -> DiffStats {
        let chunks: Vec<ChunkCoord> = state.chunks().collect();
        let target: HashSet<BlockPos> = chunks
            .par_iter()
            .map(|c| self.shell_for_chunk(view, *c))
            .reduce(HashSet::new, |mut a, b| {
                a.extend(b);
                a
            });

        let additions: Vec<(BlockPos, BlockSnapshot)> = target
            .iter()
            .filter(|p| !state.contains(**p))
            .map(|p| (*p, self.world.block_snapshot(*p)))
            .collect();
        let removals: Vec<BlockPos> = state
            .overridden()
            .keys()
            .filter(|p| !target.contains(*p))
            .copied()
            .collect();

        let mut restore = BlockBatch::new();
        for pos in removals {
            if let Some(original) = state.remove(pos) {
                restore.insert(pos, original);
            }
        }
        let mut fake = BlockBatch::new();
        for (pos, original) in additions {
            if state.insert(pos, original) {
                fake.insert(pos, self.settings.material);
            }
        }
        debug_assert!(state.check_invariants().is_ok());

        self.send(player, state, &restore, "restore", true);
        self.send(player, state, &fake, "border", true);
        DiffStats {
            restored: restore.len(),
            faked: fake.len(),
        }
    }

    /// Sends whatever an earlier failed send left owed to the client. On
    /// failure the blocks stay owed.
    pub fn resend_unsent(
        &self,
        player: PlayerId,
        state: &mut PlayerBorderState,
    ) -> Result<usize, SendError> {
        let batch: BlockBatch = state.take_unsent().into_iter().collect();
        if batch.is_empty() {
            return Ok(0);
        }
        if let Err(e) = self.emitter.send_fake_blocks(player, &batch) {
            state.defer(batch.iter());
            return Err(e);
        }
        log::log!(
            target: "fogwall::border",
            self.batch_level(),
            "resent {} blocks to {}",
            batch.len(),
            player
        );
        Ok(batch.len())
    }

    /// Drops every override and sends the captured originals back as one
    /// batch, along with any restores still owed. The state is empty
    /// afterwards even if the send fails.
    pub fn restore_all(
        &self,
        player: PlayerId,
        state: &mut PlayerBorderState,
    ) -> Result<usize, SendError> {
        let mut batch: BlockBatch = state.take_unsent().into_iter().collect();
        for (pos, original) in state.drain() {
            batch.insert(pos, original);
        }
        if batch.is_empty() {
            return Ok(0);
        }
        self.emitter.send_fake_blocks(player, &batch)?;
        log::log!(
            target: "fogwall::border",
            self.batch_level(),
            "restored {} blocks for {}",
            batch.len(),
            player
        );
        Ok(batch.len())
    }

    fn batch_level(&self) -> Level {
        if self.settings.verbose {
            Level::Info
        } else {
            Level::Debug
        }
    }

    /// Sends `batch`, settling any unsent entries it delivers. With `retry`
    /// a failed batch is deferred to [`Self::resend_unsent`].
    fn send(
        &self,
        player: PlayerId,
        state: &mut PlayerBorderState,
        batch: &BlockBatch,
        kind: &str,
        retry: bool,
    ) {
        if batch.is_empty() {
            return;
        }
        match self.emitter.send_fake_blocks(player, batch) {
            Ok(()) => {
                state.settle(batch.iter().map(|(pos, _)| pos));
                log::log!(
                    target: "fogwall::border",
                    self.batch_level(),
                    "sent {} {} blocks to {} in {} chunks",
                    batch.len(),
                    kind,
                    player,
                    batch.chunks().len()
                );
            }
            Err(e) => {
                log::warn!(
                    target: "fogwall::border",
                    "{} batch of {} blocks for {} failed{}: {}",
                    kind,
                    batch.len(),
                    player,
                    if retry { ", will resend" } else { "" },
                    e
                );
                if retry {
                    state.defer(batch.iter());
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::{FlatWorld, RecordingEmitter};
    use fogwall_geom::WorldHeight;

    const P: PlayerId = PlayerId(7);
    const NONE: [ChunkCoord; 0] = [];

    fn engine(policy: BorderPolicy, radius: i32) -> (BorderDiffEngine, Arc<RecordingEmitter>) {
        let world = Arc::new(FlatWorld::new(WorldHeight::new(0, 32), 8));
        let emitter = Arc::new(RecordingEmitter::new());
        let settings = BorderSettings {
            policy,
            radius,
            material: BlockSnapshot::new(85),
            verbose: false,
        };
        (BorderDiffEngine::new(world, emitter.clone(), settings), emitter)
    }

    fn view(x: i32, z: i32, vd: u32) -> PlayerView {
        PlayerView {
            center: BlockPos::new(x, 8, z),
            view_distance: vd,
            height_half: 2,
        }
    }

    #[test]
    fn add_fakes_ring_in_chunk_and_captures_originals() {
        let (eng, emitter) = engine(BorderPolicy::Ring, 20);
        let mut state = PlayerBorderState::new();
        let chunk = ChunkCoord::new(1, 0);
        let stats = eng.apply_chunk_delta(P, &mut state, &view(0, 0, 4), &[chunk], &NONE);
        assert!(stats.faked > 0);
        assert_eq!(stats.restored, 0);
        assert_eq!(state.len(), stats.faked);
        assert!(state.contains(BlockPos::new(20, 8, 0)));
        assert_eq!(
            state.original(BlockPos::new(20, 8, 0)),
            Some(FlatWorld::GRASS)
        );
        assert_eq!(state.original(BlockPos::new(20, 10, 0)), Some(BlockSnapshot::AIR));
        assert_eq!(emitter.block_batches(P).len(), 1);
        state.check_invariants().unwrap();
    }

    #[test]
    fn readding_an_indexed_chunk_is_a_no_op() {
        let (eng, emitter) = engine(BorderPolicy::Ring, 20);
        let mut state = PlayerBorderState::new();
        let chunk = ChunkCoord::new(1, 0);
        eng.apply_chunk_delta(P, &mut state, &view(0, 0, 4), &[chunk], &NONE);
        let before = state.len();
        let stats = eng.apply_chunk_delta(P, &mut state, &view(0, 0, 4), &[chunk], &NONE);
        assert!(stats.is_empty());
        assert_eq!(state.len(), before);
        assert_eq!(emitter.block_batches(P).len(), 1);
    }

    #[test]
    fn chunk_outside_ring_is_marked_empty() {
        let (eng, emitter) = engine(BorderPolicy::Ring, 20);
        let mut state = PlayerBorderState::new();
        let chunk = ChunkCoord::new(5, 5);
        let stats = eng.apply_chunk_delta(P, &mut state, &view(0, 0, 4), &[chunk], &NONE);
        assert!(stats.is_empty());
        assert!(state.is_chunk_indexed(chunk));
        assert!(emitter.sent().is_empty());
    }

    #[test]
    fn remove_restores_before_adding() {
        let (eng, emitter) = engine(BorderPolicy::Ring, 20);
        let mut state = PlayerBorderState::new();
        let a = ChunkCoord::new(1, 0);
        let b = ChunkCoord::new(-2, 0);
        eng.apply_chunk_delta(P, &mut state, &view(0, 0, 4), &[a], &NONE);
        let faked_a = state.len();
        let stats = eng.apply_chunk_delta(P, &mut state, &view(0, 0, 4), &[b], &[a]);
        assert_eq!(stats.restored, faked_a);
        assert!(!state.is_chunk_indexed(a));
        assert!(state.is_chunk_indexed(b));

        let batches = emitter.block_batches(P);
        assert_eq!(batches.len(), 3);
        assert!(batches[1].chunks().contains(&a));
        assert!(batches[2].chunks().contains(&b));
        // the client sees real blocks again in chunk a
        let view = emitter.client_view(P);
        assert_eq!(view.get(&BlockPos::new(20, 8, 0)), Some(&FlatWorld::GRASS));
        state.check_invariants().unwrap();
    }

    #[test]
    fn recompute_recenters_ring() {
        let (eng, emitter) = engine(BorderPolicy::Ring, 20);
        let mut state = PlayerBorderState::new();
        let chunks = [ChunkCoord::new(1, 0), ChunkCoord::new(2, 0)];
        eng.apply_chunk_delta(P, &mut state, &view(0, 0, 4), &chunks, &NONE);
        assert!(state.contains(BlockPos::new(20, 8, 0)));

        let stats = eng.recompute(P, &mut state, &view(8, 0, 4));
        assert!(stats.restored > 0 && stats.faked > 0);
        assert!(!state.contains(BlockPos::new(20, 8, 0)));
        assert!(state.contains(BlockPos::new(28, 8, 0)));
        state.check_invariants().unwrap();

        let batches = emitter.block_batches(P);
        let restore = &batches[1];
        assert_eq!(restore.get(BlockPos::new(20, 8, 0)), Some(FlatWorld::GRASS));
        let fake = &batches[2];
        assert_eq!(fake.get(BlockPos::new(28, 8, 0)), Some(BlockSnapshot::new(85)));
    }

    #[test]
    fn recompute_keeps_unchanged_positions() {
        let (eng, emitter) = engine(BorderPolicy::Ring, 20);
        let mut state = PlayerBorderState::new();
        eng.apply_chunk_delta(P, &mut state, &view(0, 0, 4), &[ChunkCoord::new(1, 0)], &NONE);
        let stats = eng.recompute(P, &mut state, &view(0, 0, 4));
        assert!(stats.is_empty());
        assert_eq!(emitter.block_batches(P).len(), 1);
    }

    #[test]
    fn enclosure_follows_view_distance_and_skips_solid_wall() {
        let (eng, _) = engine(BorderPolicy::Enclosure, 0);
        let mut state = PlayerBorderState::new();
        let chunk = ChunkCoord::new(1, 0);
        eng.apply_chunk_delta(P, &mut state, &view(0, 0, 2), &[chunk], &NONE);
        // cap over the whole disk, wall only where the world is air
        assert!(state.contains(BlockPos::new(16, 31, 0)));
        assert!(state.contains(BlockPos::new(31, 31, 5)));
        assert!(state.contains(BlockPos::new(31, 20, 5)));
        assert!(!state.contains(BlockPos::new(31, 5, 5)));
        assert!(!state.contains(BlockPos::new(16, 20, 0)));

        eng.recompute(P, &mut state, &view(0, 0, 1));
        assert!(!state.contains(BlockPos::new(31, 31, 5)));
        assert!(state.contains(BlockPos::new(16, 20, 0)));
        state.check_invariants().unwrap();
    }

    #[test]
    fn restore_all_empties_state_and_sends_originals() {
        let (eng, emitter) = engine(BorderPolicy::Ring, 20);
        let mut state = PlayerBorderState::new();
        eng.apply_chunk_delta(
            P,
            &mut state,
            &view(0, 0, 4),
            &[ChunkCoord::new(1, 0), ChunkCoord::new(-2, -1)],
            &NONE,
        );
        let faked = state.len();
        assert_eq!(eng.restore_all(P, &mut state), Ok(faked));
        assert!(state.is_empty());
        assert_eq!(state.chunk_count(), 0);
        for (pos, block) in emitter.client_view(P) {
            assert_ne!(block, BlockSnapshot::new(85), "{pos:?} still faked");
        }
        assert_eq!(eng.restore_all(P, &mut state), Ok(0));
    }

    #[test]
    fn failed_sends_do_not_corrupt_state() {
        let (eng, emitter) = engine(BorderPolicy::Ring, 20);
        emitter.set_failing(P, true);
        let mut state = PlayerBorderState::new();
        let stats = eng.apply_chunk_delta(P, &mut state, &view(0, 0, 4), &[ChunkCoord::new(1, 0)], &NONE);
        assert!(stats.faked > 0);
        assert_eq!(state.unsent().len(), stats.faked);
        state.check_invariants().unwrap();
        assert!(eng.restore_all(P, &mut state).is_err());
        assert!(state.is_empty());
        assert!(state.unsent().is_empty());
    }

    #[test]
    fn failed_border_is_resent_once_the_connection_recovers() {
        let (eng, emitter) = engine(BorderPolicy::Ring, 20);
        let mut state = PlayerBorderState::new();
        let chunk = ChunkCoord::new(1, 0);
        emitter.set_failing(P, true);
        let stats = eng.apply_chunk_delta(P, &mut state, &view(0, 0, 4), &[chunk], &NONE);
        assert!(eng.resend_unsent(P, &mut state).is_err());
        assert_eq!(state.unsent().len(), stats.faked);
        assert!(emitter.client_view(P).is_empty());

        emitter.set_failing(P, false);
        assert_eq!(eng.resend_unsent(P, &mut state), Ok(stats.faked));
        assert!(state.unsent().is_empty());
        let client = emitter.client_view(P);
        assert_eq!(client.len(), state.len());
        assert_eq!(client.get(&BlockPos::new(20, 8, 0)), Some(&BlockSnapshot::new(85)));
        assert_eq!(eng.resend_unsent(P, &mut state), Ok(0));
    }

    #[test]
    fn failed_recompute_restore_is_owed_until_delivered() {
        let (eng, emitter) = engine(BorderPolicy::Ring, 20);
        let mut state = PlayerBorderState::new();
        let chunks = [ChunkCoord::new(1, 0), ChunkCoord::new(2, 0)];
        eng.apply_chunk_delta(P, &mut state, &view(0, 0, 4), &chunks, &NONE);
        emitter.set_failing(P, true);
        eng.recompute(P, &mut state, &view(8, 0, 4));
        let old = BlockPos::new(20, 8, 0);
        assert!(!state.contains(old));
        assert_eq!(state.unsent().get(&old), Some(&FlatWorld::GRASS));

        emitter.set_failing(P, false);
        assert_eq!(eng.restore_all(P, &mut state).map(|n| n > 0), Ok(true));
        for (pos, block) in emitter.client_view(P) {
            assert_ne!(block, BlockSnapshot::new(85), "{pos:?} still faked");
        }
    }

    #[test]
    fn unloading_a_chunk_drops_its_unsent_blocks() {
        let (eng, emitter) = engine(BorderPolicy::Ring, 20);
        let mut state = PlayerBorderState::new();
        let chunk = ChunkCoord::new(1, 0);
        emitter.set_failing(P, true);
        eng.apply_chunk_delta(P, &mut state, &view(0, 0, 4), &[chunk], &NONE);
        eng.apply_chunk_delta(P, &mut state, &view(0, 0, 4), &NONE, &[chunk]);
        assert!(state.unsent().is_empty());
        assert!(state.is_empty());
    }
}
