//! Dirty tile tracking.
//!
//! Maps changed scene areas to the tiles they affect for every agent class.
//! The same changes always produce the same dirty set, whatever the order.

use navigator_common::{
    tile_distance_squared, AgentBounds, Aabb, TileGrid, TilePosition, TilesRange,
};
use std::collections::{BTreeMap, BTreeSet};

#[derive(Debug, Clone)]
pub struct TileTracker {
    grid: TileGrid,
    /// Tiles around the player kept in meshes, `None` means unlimited
    active: Option<TilesRange>,
    dirty: BTreeMap<AgentBounds, BTreeSet<TilePosition>>,
}

impl TileTracker {
    pub fn new(grid: TileGrid) -> Self {
        Self {
            grid,
            active: None,
            dirty: BTreeMap::new(),
        }
    }

    pub fn grid(&self) -> &TileGrid {
        &self.grid
    }

    pub fn active_range(&self) -> Option<TilesRange> {
        self.active
    }

    /// Replace the active range, returns the previous one
    pub fn set_active_range(&mut self, range: TilesRange) -> Option<TilesRange> {
        self.active.replace(range)
    }

    pub fn is_active(&self, position: TilePosition) -> bool {
        self.active.map_or(true, |range| range.contains(position))
    }

    /// Tiles affected by `bounds` for an agent whose geometry margin is `margin`
    pub fn covering_tiles(&self, bounds: &Aabb, margin: f32) -> TilesRange {
        self.grid.tiles_covering(&bounds.inflate_xz(margin))
    }

    /// Mark every active tile affected by `bounds`
    pub fn mark_bounds(&mut self, agent: &AgentBounds, bounds: &Aabb, margin: f32) {
        let range = self.covering_tiles(bounds, margin);
        self.mark_range(agent, range, None);
    }

    /// Mark the tile containing a point, used for off-mesh connection starts
    pub fn mark_point(&mut self, agent: &AgentBounds, point: glam::Vec3) {
        let position = self.grid.tile_position(point);
        if self.is_active(position) {
            self.mark(agent, position);
        }
    }

    /// Mark the active tiles of `range`, skipping those inside `skip`
    pub fn mark_range(&mut self, agent: &AgentBounds, range: TilesRange, skip: Option<TilesRange>) {
        let range = match self.active {
            Some(active) => range.intersection(&active),
            None => range,
        };
        if range.is_empty() {
            return;
        }
        let tiles = self.dirty.entry(*agent).or_default();
        tiles.extend(range.iter().filter(|p| skip.map_or(true, |s| !s.contains(*p))));
    }

    /// Mark a tile regardless of the active range
    pub fn mark(&mut self, agent: &AgentBounds, position: TilePosition) {
        self.dirty.entry(*agent).or_default().insert(position);
    }

    pub fn is_dirty(&self, agent: &AgentBounds, position: TilePosition) -> bool {
        self.dirty.get(agent).is_some_and(|tiles| tiles.contains(&position))
    }

    pub fn dirty_tiles(&self, agent: &AgentBounds) -> Option<&BTreeSet<TilePosition>> {
        self.dirty.get(agent)
    }

    pub fn len(&self) -> usize {
        self.dirty.values().map(BTreeSet::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.dirty.values().all(BTreeSet::is_empty)
    }

    pub fn forget_agent(&mut self, agent: &AgentBounds) {
        self.dirty.remove(agent);
    }

    pub fn clear(&mut self) {
        self.dirty.clear();
    }

    /// Remove every dirty tile, closest to `player_tile` first.
    ///
    /// Equidistant tiles are ordered by agent, then by tile x, then tile y.
    pub fn take_closest(&mut self, player_tile: TilePosition) -> Vec<(AgentBounds, TilePosition)> {
        let mut candidates: Vec<(i64, AgentBounds, TilePosition)> = std::mem::take(&mut self.dirty)
            .into_iter()
            .flat_map(|(agent, tiles)| {
                tiles
                    .into_iter()
                    .map(move |p| (tile_distance_squared(p, player_tile), agent, p))
            })
            .collect();
        candidates.sort_unstable();
        candidates
            .into_iter()
            .map(|(_, agent, position)| (agent, position))
            .collect()
    }
}
