//! Published navmeshes.
//!
//! A navmesh is an immutable [`NavMeshSnapshot`] behind an `ArcSwap`. Workers
//! publish a tile by swapping in a new snapshot, readers load the current one
//! without taking any lock and keep it as long as they like.

use arc_swap::ArcSwap;
use navigator_builder::TilePayload;
use navigator_common::{AgentBounds, TilePosition};
use std::collections::BTreeMap;
use std::sync::Arc;

/// A built tile and the mesh generation that published it
#[derive(Debug, Clone)]
pub struct PublishedTile {
    pub revision: u64,
    pub payload: Arc<TilePayload>,
}

#[derive(Debug, Clone, Default)]
pub struct NavMeshSnapshot {
    /// Incremented by every reset, publications of an older epoch are dropped
    pub epoch: u64,
    /// Incremented whenever any tile changes
    pub generation: u64,
    pub tiles: BTreeMap<TilePosition, PublishedTile>,
}

impl NavMeshSnapshot {
    pub fn tile(&self, position: TilePosition) -> Option<&PublishedTile> {
        self.tiles.get(&position)
    }

    pub fn tile_positions(&self) -> impl Iterator<Item = TilePosition> + '_ {
        self.tiles.keys().copied()
    }

    pub fn len(&self) -> usize {
        self.tiles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tiles.is_empty()
    }

    pub fn polygon_count(&self) -> usize {
        self.tiles.values().map(|tile| tile.payload.polygon_count()).sum()
    }
}

/// Outcome of a tile publication
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TileUpdate {
    Added(u64),
    Replaced(u64),
    Removed,
    /// Nothing to remove
    Unchanged,
    /// The mesh was reset after the job was scheduled
    Stale,
}

/// Navmesh of one agent class
#[derive(Debug)]
pub struct NavMeshCacheItem {
    agent: AgentBounds,
    snapshot: ArcSwap<NavMeshSnapshot>,
}

/// Handle shared between the navigator, its workers and readers
pub type SharedNavMesh = Arc<NavMeshCacheItem>;

impl NavMeshCacheItem {
    pub fn new(agent: AgentBounds) -> Self {
        Self {
            agent,
            snapshot: ArcSwap::from_pointee(NavMeshSnapshot::default()),
        }
    }

    pub fn agent(&self) -> &AgentBounds {
        &self.agent
    }

    /// Current snapshot
    pub fn load(&self) -> Arc<NavMeshSnapshot> {
        self.snapshot.load_full()
    }

    pub fn generation(&self) -> u64 {
        self.snapshot.load().generation
    }

    pub fn epoch(&self) -> u64 {
        self.snapshot.load().epoch
    }

    pub fn tile_revision(&self, position: TilePosition) -> Option<u64> {
        self.snapshot.load().tile(position).map(|tile| tile.revision)
    }

    /// Publish or remove the tile at `position` if the mesh is still at `epoch`
    pub fn publish(
        &self,
        epoch: u64,
        position: TilePosition,
        payload: Option<Arc<TilePayload>>,
    ) -> TileUpdate {
        let mut update = TileUpdate::Unchanged;
        self.snapshot.rcu(|current| {
            if current.epoch != epoch {
                update = TileUpdate::Stale;
                return Arc::clone(current);
            }
            if payload.is_none() && !current.tiles.contains_key(&position) {
                update = TileUpdate::Unchanged;
                return Arc::clone(current);
            }

            let mut next = NavMeshSnapshot::clone(current);
            next.generation += 1;
            update = match &payload {
                Some(payload) => {
                    let tile = PublishedTile {
                        revision: next.generation,
                        payload: Arc::clone(payload),
                    };
                    match next.tiles.insert(position, tile) {
                        Some(_) => TileUpdate::Replaced(next.generation),
                        None => TileUpdate::Added(next.generation),
                    }
                }
                None => {
                    next.tiles.remove(&position);
                    TileUpdate::Removed
                }
            };
            Arc::new(next)
        });
        update
    }

    /// Drop every tile and start a new epoch, returns the new epoch
    pub fn reset(&self) -> u64 {
        let previous = self.snapshot.rcu(|current| NavMeshSnapshot {
            epoch: current.epoch + 1,
            generation: current.generation + 1,
            tiles: BTreeMap::new(),
        });
        previous.epoch + 1
    }
}
