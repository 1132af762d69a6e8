//! The navigator facade.
//!
//! [`NavigatorImpl`] ties the registry, tracker, scheduler and published
//! meshes together; [`NavigatorStub`] accepts every call and keeps nothing.
//! Callers only see `Box<dyn Navigator>` from [`make_navigator`] or
//! [`make_navigator_stub`].

use crate::cache::SharedNavMesh;
use crate::listener::Listener;
use crate::objects::{CellPosition, DoorShapes, ObjectId, ObjectKind, ObjectShapes, Pathgrid};
use crate::registry::{SceneChange, SceneRegistry};
use crate::scheduler::{AsyncJobScheduler, TileJob, TileKey, WaitCondition};
use crate::settings::Settings;
use crate::stats::{NavigatorStats, StatsSink};
use crate::tracker::TileTracker;
use glam::{Affine3A, Vec3};
use log::{debug, error, info, warn};
use navigator_builder::{HeightfieldShape, HeightfieldTileBuilder, TileBuilder, TileGeometry, TileInput};
use navigator_common::{AgentBounds, Result, TilePosition, TilesRange};
use navigator_tilecache::TileCacheDb;
use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;
use std::sync::Arc;

/// Navmesh management API shared by the functional and the disabled navigator
pub trait Navigator: Send {
    /// Register a reference to an agent class. Returns false for invalid bounds.
    fn add_agent(&mut self, agent: AgentBounds) -> bool;

    /// Drop a reference to an agent class, its navmesh goes with the last one
    fn remove_agent(&mut self, agent: &AgentBounds);

    fn set_worldspace(&mut self, worldspace: &str);

    /// Recentre the area kept in navmeshes around the player
    fn update_bounds(&mut self, player_position: Vec3);

    fn add_object(&mut self, id: ObjectId, shapes: &ObjectShapes, transform: &Affine3A) -> bool;

    fn add_door(&mut self, id: ObjectId, shapes: &DoorShapes, transform: &Affine3A) -> bool;

    fn update_object(&mut self, id: ObjectId, shapes: &ObjectShapes, transform: &Affine3A) -> bool;

    fn update_door(&mut self, id: ObjectId, shapes: &DoorShapes, transform: &Affine3A) -> bool;

    fn remove_object(&mut self, id: ObjectId) -> bool;

    fn has_object(&self, id: ObjectId) -> bool;

    /// `cell_size` of [`GLOBAL_CELL_SIZE`](crate::GLOBAL_CELL_SIZE) adds water
    /// covering the whole worldspace
    fn add_water(&mut self, cell: CellPosition, cell_size: i32, level: f32) -> bool;

    fn remove_water(&mut self, cell: CellPosition) -> bool;

    fn add_heightfield(&mut self, cell: CellPosition, cell_size: i32, shape: Arc<HeightfieldShape>) -> bool;

    fn remove_heightfield(&mut self, cell: CellPosition) -> bool;

    fn add_pathgrid(&mut self, cell: CellPosition, pathgrid: &Pathgrid) -> bool;

    fn remove_pathgrid(&mut self, cell: CellPosition) -> bool;

    /// Schedule builds for dirty tiles, closest to the player first
    fn update(&mut self, player_position: Vec3);

    /// Like [`update`](Navigator::update), unless the player barely moved
    fn update_player_position(&mut self, player_position: Vec3);

    fn set_updates_enabled(&mut self, enabled: bool);

    /// Block until jobs of the last update matching `condition` are done
    fn wait(&self, listener: &mut dyn Listener, condition: WaitCondition);

    fn get_nav_mesh(&self, agent: &AgentBounds) -> Option<SharedNavMesh>;

    fn get_nav_meshes(&self) -> BTreeMap<AgentBounds, SharedNavMesh>;

    fn settings(&self) -> &Settings;

    fn stats(&self) -> NavigatorStats;

    fn report_stats(&self, frame: u64, sink: &mut dyn StatsSink) {
        self.stats().report(frame, sink);
    }

    /// Geometry of every tile with registered content, for debug overlays
    fn recast_mesh_tiles(&self) -> BTreeMap<TilePosition, TileGeometry>;

    fn max_navmesh_area_real_radius(&self) -> f32;
}

/// Create a functional navigator.
///
/// With a `user_data_path` built tiles are looked up in, and optionally
/// written to, a tile cache below it. A cache that fails to open is logged
/// and skipped.
pub fn make_navigator(settings: Settings, user_data_path: Option<&Path>) -> Result<Box<dyn Navigator>> {
    settings.validate()?;
    let builder = HeightfieldTileBuilder::new(settings.build_config())?;

    let tile_cache = user_data_path.and_then(|path| {
        let dir = path.join(&settings.tile_cache_dir_name);
        match TileCacheDb::open(&dir) {
            Ok(db) => Some(db),
            Err(e) => {
                error!("Failed to open tile cache at {}: {}", dir.display(), e);
                None
            }
        }
    });

    let navigator = NavigatorImpl::new(settings, Arc::new(builder), tile_cache)?;
    Ok(Box::new(navigator))
}

/// Create a navigator that ignores every call
pub fn make_navigator_stub() -> Box<dyn Navigator> {
    Box::new(NavigatorStub::default())
}

pub struct NavigatorImpl {
    settings: Settings,
    registry: SceneRegistry,
    tracker: TileTracker,
    scheduler: AsyncJobScheduler,
    builder: Arc<dyn TileBuilder>,
    updates_enabled: bool,
    last_player_position: Option<Vec3>,
}

impl NavigatorImpl {
    pub fn new(settings: Settings, builder: Arc<dyn TileBuilder>, tile_cache: Option<TileCacheDb>) -> Result<Self> {
        settings.validate()?;
        if let Some(db) = &tile_cache {
            info!("Using tile cache at {}", db.dir().display());
        }
        let scheduler = AsyncJobScheduler::new(
            settings.async_threads,
            settings.max_tiles_per_update,
            Arc::clone(&builder),
            tile_cache,
            settings.enable_write_to_tile_cache,
        )?;
        Ok(Self {
            tracker: TileTracker::new(settings.tile_grid()),
            registry: SceneRegistry::new(),
            scheduler,
            builder,
            settings,
            updates_enabled: true,
            last_player_position: None,
        })
    }

    pub fn registry(&self) -> &SceneRegistry {
        &self.registry
    }

    pub fn tracker(&self) -> &TileTracker {
        &self.tracker
    }

    fn mark_changes(&mut self, changes: &[SceneChange]) {
        for agent in self.registry.agent_bounds() {
            self.mark_agent_changes(&agent, changes);
        }
    }

    fn mark_agent_changes(&mut self, agent: &AgentBounds, changes: &[SceneChange]) {
        let margin = self.settings.agent_margin(agent);
        for change in changes {
            match change {
                SceneChange::Bounds(bounds) => self.tracker.mark_bounds(agent, bounds, margin),
                SceneChange::Point(point) => self.tracker.mark_point(agent, *point),
                SceneChange::Everything => {
                    let geometry = self.registry.geometry_changes();
                    self.mark_agent_changes(agent, &geometry);
                }
            }
        }
    }

    /// Input of a tile as the builder will see it, `None` removes the tile
    fn tile_input(&self, agent: &AgentBounds, position: TilePosition) -> Option<Arc<TileInput>> {
        if !self.tracker.is_active(position) {
            return None;
        }
        let bounds = self.tracker.grid().tile_bounds(position);
        let region = self.builder.region(agent, &bounds);
        let input = self.registry.tile_input(position, bounds, &region);
        (!input.is_empty()).then(|| Arc::new(input))
    }

    fn add_scene_object(&mut self, id: ObjectId, shapes: &ObjectShapes, kind: ObjectKind, transform: &Affine3A) -> bool {
        match self.registry.add_object(id, shapes, kind, transform) {
            Some(changes) => {
                self.mark_changes(&changes);
                true
            }
            None => {
                debug!("Object {} is already registered", id);
                false
            }
        }
    }

    fn update_scene_object(&mut self, id: ObjectId, shapes: &ObjectShapes, kind: ObjectKind, transform: &Affine3A) -> bool {
        match self.registry.update_object(id, shapes, kind, transform) {
            Some(changes) => {
                self.mark_changes(&changes);
                true
            }
            None => false,
        }
    }
}

impl Navigator for NavigatorImpl {
    fn add_agent(&mut self, agent: AgentBounds) -> bool {
        if !agent.is_valid() {
            warn!("Ignoring invalid agent bounds {:?}", agent);
            return false;
        }
        if self.registry.add_agent(agent).is_some() {
            info!("Added navmesh for agent {:?}", agent);
            let geometry = self.registry.geometry_changes();
            self.mark_agent_changes(&agent, &geometry);
        }
        true
    }

    fn remove_agent(&mut self, agent: &AgentBounds) {
        if self.registry.remove_agent(agent).is_some() {
            self.tracker.forget_agent(agent);
            let cancelled = self.scheduler.cancel_agent(agent);
            info!("Removed navmesh for agent {:?}, cancelled {} jobs", agent, cancelled);
        }
    }

    fn set_worldspace(&mut self, worldspace: &str) {
        if !self.registry.set_worldspace(worldspace) {
            return;
        }
        for (_, entry) in self.registry.agents() {
            entry.mesh.reset();
        }
        self.scheduler.cancel_all();
        self.tracker.clear();
        let geometry = self.registry.geometry_changes();
        self.mark_changes(&geometry);
    }

    fn update_bounds(&mut self, player_position: Vec3) {
        let player_tile = self.tracker.grid().tile_position(player_position);
        let range = TilesRange::around(player_tile, self.settings.max_navmesh_area_radius());
        let previous = self.tracker.set_active_range(range);
        if previous == Some(range) {
            return;
        }
        debug!("Navmesh area moved to {:?}", range);

        let geometry = self.registry.geometry_changes();
        for agent in self.registry.agent_bounds() {
            // without a previous range everything was already marked
            if let Some(previous) = previous {
                let margin = self.settings.agent_margin(&agent);
                for change in &geometry {
                    match change {
                        SceneChange::Bounds(bounds) => {
                            let covering = self.tracker.covering_tiles(bounds, margin);
                            self.tracker.mark_range(&agent, covering, Some(previous));
                        }
                        SceneChange::Point(point) => {
                            if !previous.contains(self.tracker.grid().tile_position(*point)) {
                                self.tracker.mark_point(&agent, *point);
                            }
                        }
                        SceneChange::Everything => {}
                    }
                }
            }

            if let Some(mesh) = self.registry.nav_mesh(&agent) {
                let outside: Vec<TilePosition> = mesh
                    .load()
                    .tile_positions()
                    .filter(|position| !range.contains(*position))
                    .collect();
                for position in outside {
                    self.tracker.mark(&agent, position);
                }
            }
        }
    }

    fn add_object(&mut self, id: ObjectId, shapes: &ObjectShapes, transform: &Affine3A) -> bool {
        self.add_scene_object(id, shapes, ObjectKind::Plain, transform)
    }

    fn add_door(&mut self, id: ObjectId, shapes: &DoorShapes, transform: &Affine3A) -> bool {
        self.add_scene_object(id, &shapes.shapes, ObjectKind::Door(shapes.connection()), transform)
    }

    fn update_object(&mut self, id: ObjectId, shapes: &ObjectShapes, transform: &Affine3A) -> bool {
        self.update_scene_object(id, shapes, ObjectKind::Plain, transform)
    }

    fn update_door(&mut self, id: ObjectId, shapes: &DoorShapes, transform: &Affine3A) -> bool {
        self.update_scene_object(id, &shapes.shapes, ObjectKind::Door(shapes.connection()), transform)
    }

    fn remove_object(&mut self, id: ObjectId) -> bool {
        match self.registry.remove_object(id) {
            Some(changes) => {
                self.mark_changes(&changes);
                true
            }
            None => false,
        }
    }

    fn has_object(&self, id: ObjectId) -> bool {
        self.registry.contains_object(id)
    }

    fn add_water(&mut self, cell: CellPosition, cell_size: i32, level: f32) -> bool {
        let Some(change) = self.registry.add_water(cell, cell_size, level) else {
            return false;
        };
        if change == SceneChange::Everything && !self.registry.has_geometry() {
            return false;
        }
        self.mark_changes(&[change]);
        true
    }

    fn remove_water(&mut self, cell: CellPosition) -> bool {
        match self.registry.remove_water(cell) {
            Some(change) => {
                self.mark_changes(&[change]);
                true
            }
            None => false,
        }
    }

    fn add_heightfield(&mut self, cell: CellPosition, cell_size: i32, shape: Arc<HeightfieldShape>) -> bool {
        match self.registry.add_heightfield(cell, cell_size, shape) {
            Some(change) => {
                self.mark_changes(&[change]);
                true
            }
            None => false,
        }
    }

    fn remove_heightfield(&mut self, cell: CellPosition) -> bool {
        match self.registry.remove_heightfield(cell) {
            Some(change) => {
                self.mark_changes(&[change]);
                true
            }
            None => false,
        }
    }

    fn add_pathgrid(&mut self, cell: CellPosition, pathgrid: &Pathgrid) -> bool {
        match self.registry.add_pathgrid(cell, pathgrid) {
            Some(changes) => {
                self.mark_changes(&changes);
                true
            }
            None => false,
        }
    }

    fn remove_pathgrid(&mut self, cell: CellPosition) -> bool {
        match self.registry.remove_pathgrid(cell) {
            Some(changes) => {
                self.mark_changes(&changes);
                true
            }
            None => false,
        }
    }

    fn update(&mut self, player_position: Vec3) {
        let player_tile = self.tracker.grid().tile_position(player_position);
        self.scheduler.set_player_tile(player_tile);
        self.last_player_position = Some(player_position);
        if !self.updates_enabled {
            return;
        }

        let tiles = self.tracker.take_closest(player_tile);
        if tiles.is_empty() {
            return;
        }

        let pass = self.scheduler.next_pass();
        let mut scheduled = 0;
        for (agent, position) in tiles {
            let Some(mesh) = self.registry.nav_mesh(&agent).cloned() else {
                continue;
            };
            let input = self.tile_input(&agent, position);
            self.scheduler.enqueue(TileJob {
                key: TileKey { agent, position },
                epoch: mesh.epoch(),
                mesh,
                input,
                pass,
            });
            scheduled += 1;
        }
        debug!("Update pass {} scheduled {} tiles around {}", pass, scheduled, player_tile);
    }

    fn update_player_position(&mut self, player_position: Vec3) {
        let moved = match self.last_player_position {
            None => true,
            Some(last) => {
                let grid = self.tracker.grid();
                last.distance(player_position) >= self.settings.player_move_threshold
                    || grid.tile_position(last) != grid.tile_position(player_position)
            }
        };
        if moved {
            self.update(player_position);
        }
    }

    fn set_updates_enabled(&mut self, enabled: bool) {
        self.updates_enabled = enabled;
    }

    fn wait(&self, listener: &mut dyn Listener, condition: WaitCondition) {
        self.scheduler
            .wait(listener, &condition, self.settings.wait_until_min_distance_to_player);
    }

    fn get_nav_mesh(&self, agent: &AgentBounds) -> Option<SharedNavMesh> {
        self.registry.nav_mesh(agent).cloned()
    }

    fn get_nav_meshes(&self) -> BTreeMap<AgentBounds, SharedNavMesh> {
        self.registry
            .agents()
            .map(|(agent, entry)| (*agent, Arc::clone(&entry.mesh)))
            .collect()
    }

    fn settings(&self) -> &Settings {
        &self.settings
    }

    fn stats(&self) -> NavigatorStats {
        NavigatorStats {
            scheduler: self.scheduler.stats(),
            agents: self.registry.agent_count(),
            objects: self.registry.object_count(),
            water: self.registry.water_count(),
            heightfields: self.registry.heightfield_count(),
            pathgrids: self.registry.pathgrid_count(),
            dirty_tiles: self.tracker.len(),
            navmesh_tiles: self
                .registry
                .agents()
                .map(|(_, entry)| entry.mesh.load().len())
                .sum(),
        }
    }

    fn recast_mesh_tiles(&self) -> BTreeMap<TilePosition, TileGeometry> {
        let grid = self.tracker.grid();
        let mut positions = BTreeSet::new();
        for change in self.registry.geometry_changes() {
            match change {
                SceneChange::Bounds(bounds) => {
                    positions.extend(self.tracker.covering_tiles(&bounds, 0.0).iter());
                }
                SceneChange::Point(point) => {
                    positions.insert(grid.tile_position(point));
                }
                SceneChange::Everything => {}
            }
        }

        positions
            .into_iter()
            .filter(|position| self.tracker.is_active(*position))
            .filter_map(|position| {
                let bounds = grid.tile_bounds(position);
                let geometry = self.registry.tile_input(position, bounds, &bounds).collect(&bounds);
                (!geometry.is_empty()).then_some((position, geometry))
            })
            .collect()
    }

    fn max_navmesh_area_real_radius(&self) -> f32 {
        self.settings.max_navmesh_area_real_radius()
    }
}

/// Navigator used when navigation is disabled
#[derive(Debug, Default)]
pub struct NavigatorStub {
    settings: Settings,
}

impl Navigator for NavigatorStub {
    fn add_agent(&mut self, _agent: AgentBounds) -> bool {
        false
    }

    fn remove_agent(&mut self, _agent: &AgentBounds) {}

    fn set_worldspace(&mut self, _worldspace: &str) {}

    fn update_bounds(&mut self, _player_position: Vec3) {}

    fn add_object(&mut self, _id: ObjectId, _shapes: &ObjectShapes, _transform: &Affine3A) -> bool {
        false
    }

    fn add_door(&mut self, _id: ObjectId, _shapes: &DoorShapes, _transform: &Affine3A) -> bool {
        false
    }

    fn update_object(&mut self, _id: ObjectId, _shapes: &ObjectShapes, _transform: &Affine3A) -> bool {
        false
    }

    fn update_door(&mut self, _id: ObjectId, _shapes: &DoorShapes, _transform: &Affine3A) -> bool {
        false
    }

    fn remove_object(&mut self, _id: ObjectId) -> bool {
        false
    }

    fn has_object(&self, _id: ObjectId) -> bool {
        false
    }

    fn add_water(&mut self, _cell: CellPosition, _cell_size: i32, _level: f32) -> bool {
        false
    }

    fn remove_water(&mut self, _cell: CellPosition) -> bool {
        false
    }

    fn add_heightfield(&mut self, _cell: CellPosition, _cell_size: i32, _shape: Arc<HeightfieldShape>) -> bool {
        false
    }

    fn remove_heightfield(&mut self, _cell: CellPosition) -> bool {
        false
    }

    fn add_pathgrid(&mut self, _cell: CellPosition, _pathgrid: &Pathgrid) -> bool {
        false
    }

    fn remove_pathgrid(&mut self, _cell: CellPosition) -> bool {
        false
    }

    fn update(&mut self, _player_position: Vec3) {}

    fn update_player_position(&mut self, _player_position: Vec3) {}

    fn set_updates_enabled(&mut self, _enabled: bool) {}

    fn wait(&self, _listener: &mut dyn Listener, _condition: WaitCondition) {}

    fn get_nav_mesh(&self, _agent: &AgentBounds) -> Option<SharedNavMesh> {
        None
    }

    fn get_nav_meshes(&self) -> BTreeMap<AgentBounds, SharedNavMesh> {
        BTreeMap::new()
    }

    fn settings(&self) -> &Settings {
        &self.settings
    }

    fn stats(&self) -> NavigatorStats {
        NavigatorStats::default()
    }

    fn recast_mesh_tiles(&self) -> BTreeMap<TilePosition, TileGeometry> {
        BTreeMap::new()
    }

    fn max_navmesh_area_real_radius(&self) -> f32 {
        0.0
    }
}
