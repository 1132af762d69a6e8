//! Instrumentation counters.

use serde::Serialize;
use std::collections::BTreeMap;

/// Receiver of named counters keyed by frame number
pub trait StatsSink {
    fn set_attribute(&mut self, frame: u64, name: &str, value: f64);
}

/// In-memory sink keeping every reported frame
#[derive(Debug, Clone, Default)]
pub struct StatsMap {
    frames: BTreeMap<u64, BTreeMap<String, f64>>,
}

impl StatsMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, frame: u64, name: &str) -> Option<f64> {
        self.frames.get(&frame)?.get(name).copied()
    }

    pub fn frame(&self, frame: u64) -> Option<&BTreeMap<String, f64>> {
        self.frames.get(&frame)
    }

    pub fn frames(&self) -> impl Iterator<Item = u64> + '_ {
        self.frames.keys().copied()
    }
}

impl StatsSink for StatsMap {
    fn set_attribute(&mut self, frame: u64, name: &str, value: f64) {
        self.frames
            .entry(frame)
            .or_default()
            .insert(name.to_string(), value);
    }
}

/// Counters of the build scheduler
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct SchedulerStats {
    pub jobs_pending: usize,
    pub jobs_building: usize,
    pub tiles_built: u64,
    pub tiles_removed: u64,
    pub tiles_failed: u64,
    pub jobs_cancelled: u64,
    pub cache_hits: u64,
    pub cache_misses: u64,
    /// Mean time spent in the builder, in milliseconds
    pub mean_build_ms: f64,
}

/// Everything reported by `Navigator::report_stats`
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct NavigatorStats {
    pub scheduler: SchedulerStats,
    pub agents: usize,
    pub objects: usize,
    pub water: usize,
    pub heightfields: usize,
    pub pathgrids: usize,
    pub dirty_tiles: usize,
    pub navmesh_tiles: usize,
}

impl NavigatorStats {
    pub fn report(&self, frame: u64, sink: &mut dyn StatsSink) {
        let scheduler = &self.scheduler;
        let counters = [
            ("NavMesh Jobs Pending", scheduler.jobs_pending as f64),
            ("NavMesh Jobs Building", scheduler.jobs_building as f64),
            ("NavMesh Tiles Built", scheduler.tiles_built as f64),
            ("NavMesh Tiles Removed", scheduler.tiles_removed as f64),
            ("NavMesh Tiles Failed", scheduler.tiles_failed as f64),
            ("NavMesh Jobs Cancelled", scheduler.jobs_cancelled as f64),
            ("NavMesh Cache Hits", scheduler.cache_hits as f64),
            ("NavMesh Cache Misses", scheduler.cache_misses as f64),
            ("NavMesh Build Time", scheduler.mean_build_ms),
            ("NavMesh Agents", self.agents as f64),
            ("NavMesh Objects", self.objects as f64),
            ("NavMesh Water", self.water as f64),
            ("NavMesh Heightfields", self.heightfields as f64),
            ("NavMesh Pathgrids", self.pathgrids as f64),
            ("NavMesh Dirty Tiles", self.dirty_tiles as f64),
            ("NavMesh Tiles", self.navmesh_tiles as f64),
        ];
        for (name, value) in counters {
            sink.set_attribute(frame, name, value);
        }
    }
}
