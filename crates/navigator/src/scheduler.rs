//! Background tile builds.
//!
//! A fixed pool of worker threads takes pending jobs closest to the player
//! first, with at most `max_in_flight` tiles building at once. There is at
//! most one pending and one building job per tile key: a new job for a
//! pending key replaces its input, a job for a building key waits until the
//! running build has published.

use crate::cache::{SharedNavMesh, TileUpdate};
use crate::listener::Listener;
use crate::stats::SchedulerStats;
use log::{debug, error, info, warn};
use navigator_builder::{TileBuilder, TileInput, TilePayload};
use navigator_common::{tile_distance_squared, AgentBounds, Result, TilePosition};
use navigator_tilecache::TileCacheDb;
use parking_lot::{Condvar, Mutex, MutexGuard};
use std::collections::{BTreeMap, BTreeSet};
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

/// The unit of build granularity
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TileKey {
    pub agent: AgentBounds,
    pub position: TilePosition,
}

/// When `wait` may return
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WaitCondition {
    /// Every job of the last update is done
    AllJobsDone,
    /// Jobs for tiles near the player are done
    RequiredTilesPresent,
    /// Jobs of these agent classes are done
    Agents(BTreeSet<AgentBounds>),
}

/// Build or removal of one tile
#[derive(Debug, Clone)]
pub struct TileJob {
    pub key: TileKey,
    pub mesh: SharedNavMesh,
    /// Mesh epoch the input was captured for
    pub epoch: u64,
    /// `None` removes the tile
    pub input: Option<Arc<TileInput>>,
    /// Update pass that last scheduled this job
    pub pass: u64,
}

#[derive(Debug, Default)]
struct Counters {
    tiles_built: u64,
    tiles_removed: u64,
    tiles_failed: u64,
    jobs_cancelled: u64,
    cache_hits: u64,
    cache_misses: u64,
    builds: u64,
    build_time: Duration,
}

#[derive(Debug, Default)]
struct State {
    pending: BTreeMap<TileKey, TileJob>,
    /// Keys being built with the pass of their job
    building: BTreeMap<TileKey, u64>,
    player_tile: TilePosition,
    shutdown: bool,
    counters: Counters,
}

impl State {
    /// Closest pending job whose key is not being built
    fn take_next(&mut self, max_in_flight: usize) -> Option<TileJob> {
        if self.building.len() >= max_in_flight {
            return None;
        }
        let player_tile = self.player_tile;
        let key = self
            .pending
            .keys()
            .filter(|key| !self.building.contains_key(*key))
            .min_by_key(|key| (tile_distance_squared(key.position, player_tile), key.agent, key.position))
            .copied()?;
        let job = self.pending.remove(&key)?;
        self.building.insert(key, job.pass);
        Some(job)
    }

    fn remaining(&self, pass: u64, matches: &dyn Fn(&TileKey) -> bool) -> usize {
        let pending = self
            .pending
            .values()
            .filter(|job| job.pass <= pass && matches(&job.key))
            .count();
        let building = self
            .building
            .iter()
            .filter(|(key, job_pass)| **job_pass <= pass && matches(*key))
            .count();
        pending + building
    }
}

struct Shared {
    state: Mutex<State>,
    has_work: Condvar,
    job_done: Condvar,
    max_in_flight: usize,
    builder: Arc<dyn TileBuilder>,
    tile_cache: Option<TileCacheDb>,
    write_to_tile_cache: bool,
}

#[derive(Debug, Default)]
struct JobMetrics {
    cache_hit: Option<bool>,
    build_time: Option<Duration>,
}

impl Shared {
    fn worker_loop(&self) {
        loop {
            let job = {
                let mut state = self.state.lock();
                loop {
                    if state.shutdown {
                        return;
                    }
                    if let Some(job) = state.take_next(self.max_in_flight) {
                        break job;
                    }
                    self.has_work.wait(&mut state);
                }
            };

            let mut metrics = JobMetrics::default();
            let result = panic::catch_unwind(AssertUnwindSafe(|| self.process(&job, &mut metrics)));
            let update = match result {
                Ok(Ok(payload)) => Some(job.mesh.publish(job.epoch, job.key.position, payload.map(Arc::new))),
                Ok(Err(e)) => {
                    warn!(
                        "Failed to build tile {} for agent {:?}: {}",
                        job.key.position, job.key.agent, e
                    );
                    None
                }
                Err(panic) => {
                    let message = panic
                        .downcast_ref::<&str>()
                        .map(|s| s.to_string())
                        .or_else(|| panic.downcast_ref::<String>().cloned())
                        .unwrap_or_else(|| "unknown panic".to_string());
                    warn!(
                        "Tile builder panicked on tile {} for agent {:?}: {}",
                        job.key.position, job.key.agent, message
                    );
                    None
                }
            };

            let mut state = self.state.lock();
            state.building.remove(&job.key);
            let counters = &mut state.counters;
            match update {
                Some(TileUpdate::Added(revision)) | Some(TileUpdate::Replaced(revision)) => {
                    debug!("Published tile {} revision {}", job.key.position, revision);
                    counters.tiles_built += 1;
                }
                Some(TileUpdate::Removed) => counters.tiles_removed += 1,
                Some(TileUpdate::Unchanged) | Some(TileUpdate::Stale) => {}
                None => counters.tiles_failed += 1,
            }
            match metrics.cache_hit {
                Some(true) => counters.cache_hits += 1,
                Some(false) => counters.cache_misses += 1,
                None => {}
            }
            if let Some(build_time) = metrics.build_time {
                counters.builds += 1;
                counters.build_time += build_time;
            }
            drop(state);

            self.job_done.notify_all();
            // a follow-up job for the same key may be runnable now
            self.has_work.notify_one();
        }
    }

    fn process(&self, job: &TileJob, metrics: &mut JobMetrics) -> Result<Option<TilePayload>> {
        let Some(input) = &job.input else {
            return Ok(None);
        };
        let agent = &job.key.agent;
        let region = self.builder.region(agent, &input.bounds);
        let geometry = input.collect(&region);
        if geometry.is_empty() {
            return Ok(None);
        }

        let cache_input = self.tile_cache.as_ref().map(|cache| (cache, geometry.to_bytes()));
        if let Some((cache, bytes)) = &cache_input {
            match cache.get(agent, bytes) {
                Ok(Some(payload)) => {
                    metrics.cache_hit = Some(true);
                    return Ok(Some(payload));
                }
                Ok(None) => metrics.cache_hit = Some(false),
                Err(e) => {
                    error!("Failed to read tile {} from cache: {}", job.key.position, e);
                    metrics.cache_hit = Some(false);
                }
            }
        }

        let start = Instant::now();
        let payload = self.builder.build(agent, &geometry)?;
        metrics.build_time = Some(start.elapsed());

        if let (Some((cache, bytes)), Some(payload), true) =
            (&cache_input, &payload, self.write_to_tile_cache)
        {
            if let Err(e) = cache.put(agent, bytes, payload) {
                error!("Failed to write tile {} to cache: {}", job.key.position, e);
            }
        }
        Ok(payload)
    }
}

/// Worker pool building tile jobs in the background
pub struct AsyncJobScheduler {
    shared: Arc<Shared>,
    workers: Vec<JoinHandle<()>>,
    last_pass: u64,
}

impl AsyncJobScheduler {
    pub fn new(
        threads: usize,
        max_in_flight: usize,
        builder: Arc<dyn TileBuilder>,
        tile_cache: Option<TileCacheDb>,
        write_to_tile_cache: bool,
    ) -> Result<Self> {
        let shared = Arc::new(Shared {
            state: Mutex::new(State::default()),
            has_work: Condvar::new(),
            job_done: Condvar::new(),
            max_in_flight: max_in_flight.max(1),
            builder,
            tile_cache,
            write_to_tile_cache,
        });

        let mut scheduler = Self {
            shared,
            workers: Vec::with_capacity(threads),
            last_pass: 0,
        };
        for index in 0..threads {
            let shared = Arc::clone(&scheduler.shared);
            let handle = std::thread::Builder::new()
                .name(format!("navmesh-worker-{}", index))
                .spawn(move || shared.worker_loop())?;
            scheduler.workers.push(handle);
        }
        info!("Started {} navmesh worker threads", threads);
        Ok(scheduler)
    }

    /// Start a new update pass
    pub fn next_pass(&mut self) -> u64 {
        self.last_pass += 1;
        self.last_pass
    }

    pub fn last_pass(&self) -> u64 {
        self.last_pass
    }

    pub fn set_player_tile(&self, player_tile: TilePosition) {
        self.shared.state.lock().player_tile = player_tile;
    }

    /// Queue a job, coalescing it with a pending job of the same key
    pub fn enqueue(&self, job: TileJob) {
        let mut state = self.shared.state.lock();
        match state.pending.get_mut(&job.key) {
            Some(pending) => {
                debug!("Replacing pending job for tile {}", job.key.position);
                *pending = job;
            }
            None => {
                state.pending.insert(job.key, job);
            }
        }
        drop(state);
        self.shared.has_work.notify_one();
    }

    /// Drop pending jobs of an agent class, in-flight builds still finish
    pub fn cancel_agent(&self, agent: &AgentBounds) -> usize {
        self.cancel_where(|key| key.agent == *agent)
    }

    pub fn cancel_all(&self) -> usize {
        self.cancel_where(|_| true)
    }

    fn cancel_where(&self, predicate: impl Fn(&TileKey) -> bool) -> usize {
        let mut state = self.shared.state.lock();
        let before = state.pending.len();
        state.pending.retain(|key, _| !predicate(key));
        let cancelled = before - state.pending.len();
        state.counters.jobs_cancelled += cancelled as u64;
        drop(state);
        if cancelled > 0 {
            debug!("Cancelled {} pending navmesh jobs", cancelled);
            self.shared.job_done.notify_all();
        }
        cancelled
    }

    pub fn is_pending(&self, key: &TileKey) -> bool {
        self.shared.state.lock().pending.contains_key(key)
    }

    /// Block until no job of the last pass matching `condition` is left
    pub fn wait(&self, listener: &mut dyn Listener, condition: &WaitCondition, min_distance_to_player: i32) {
        let pass = self.last_pass;
        let max_distance = i64::from(min_distance_to_player).pow(2);

        let mut state = self.shared.state.lock();
        let player_tile = state.player_tile;
        let matches = |key: &TileKey| match condition {
            WaitCondition::AllJobsDone => true,
            WaitCondition::RequiredTilesPresent => {
                tile_distance_squared(key.position, player_tile) <= max_distance
            }
            WaitCondition::Agents(agents) => agents.contains(&key.agent),
        };

        // listener calls happen with the state unlocked
        let total = state.remaining(pass, &matches);
        MutexGuard::unlocked(&mut state, || listener.set_progress_range(total));
        let mut reported = 0;
        loop {
            let remaining = state.remaining(pass, &matches);
            let done = total.saturating_sub(remaining);
            if done > reported {
                let increment = done - reported;
                reported = done;
                MutexGuard::unlocked(&mut state, || listener.increase_progress(increment));
                continue;
            }
            if remaining == 0 {
                break;
            }
            self.shared.job_done.wait(&mut state);
        }
    }

    pub fn stats(&self) -> SchedulerStats {
        let state = self.shared.state.lock();
        let counters = &state.counters;
        let mean_build_ms = if counters.builds == 0 {
            0.0
        } else {
            counters.build_time.as_secs_f64() * 1000.0 / counters.builds as f64
        };
        SchedulerStats {
            jobs_pending: state.pending.len(),
            jobs_building: state.building.len(),
            tiles_built: counters.tiles_built,
            tiles_removed: counters.tiles_removed,
            tiles_failed: counters.tiles_failed,
            jobs_cancelled: counters.jobs_cancelled,
            cache_hits: counters.cache_hits,
            cache_misses: counters.cache_misses,
            mean_build_ms,
        }
    }
}

impl Drop for AsyncJobScheduler {
    fn drop(&mut self) {
        self.shared.state.lock().shutdown = true;
        self.shared.has_work.notify_all();
        for worker in self.workers.drain(..) {
            if worker.join().is_err() {
                error!("Navmesh worker thread panicked");
            }
        }
        debug!("Stopped navmesh worker threads");
    }
}
