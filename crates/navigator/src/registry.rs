//! Scene registry.
//!
//! In-memory bookkeeping of everything that shapes the navmeshes: agents,
//! objects, doors, water, terrain and pathgrids. Mutations report the scene
//! areas they touched as [`SceneChange`]s; turning those into dirty tiles is
//! left to the tracker.

use crate::cache::{NavMeshCacheItem, SharedNavMesh};
use crate::objects::{
    CellPosition, ObjectId, ObjectKind, ObjectShapes, Pathgrid, SceneObject, GLOBAL_CELL_SIZE,
};
use glam::{Affine3A, Vec3};
use log::{debug, warn};
use navigator_builder::{HeightfieldGeometry, HeightfieldShape, ObjectGeometry, TileInput, Water};
use navigator_common::{AgentBounds, Aabb, TilePosition};
use std::collections::BTreeMap;
use std::sync::Arc;

/// Area of the scene affected by a mutation
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SceneChange {
    /// Geometry within these bounds, affects tiles within the agent margin
    Bounds(Aabb),
    /// Start of an off-mesh connection, affects the tile containing it
    Point(Vec3),
    /// Unbounded water
    Everything,
}

/// Reference counted agent class and its navmesh
#[derive(Debug)]
pub struct AgentEntry {
    pub count: usize,
    pub mesh: SharedNavMesh,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WaterEntry {
    pub cell_size: i32,
    pub level: f32,
}

impl WaterEntry {
    pub fn is_global(&self) -> bool {
        self.cell_size == GLOBAL_CELL_SIZE
    }
}

#[derive(Debug, Clone)]
pub struct HeightfieldEntry {
    pub cell_size: i32,
    pub shape: Arc<HeightfieldShape>,
}

fn cell_key(cell: CellPosition) -> (i32, i32) {
    (cell.x, cell.y)
}

/// XZ square of a cell, unbounded in height
fn cell_footprint(cell: (i32, i32), cell_size: i32) -> Aabb {
    let size = cell_size as f32;
    Aabb::new(
        Vec3::new(cell.0 as f32 * size, f32::MIN, cell.1 as f32 * size),
        Vec3::new((cell.0 + 1) as f32 * size, f32::MAX, (cell.1 + 1) as f32 * size),
    )
}

#[derive(Debug, Default)]
pub struct SceneRegistry {
    worldspace: String,
    agents: BTreeMap<AgentBounds, AgentEntry>,
    objects: BTreeMap<ObjectId, SceneObject>,
    water: BTreeMap<(i32, i32), WaterEntry>,
    heightfields: BTreeMap<(i32, i32), HeightfieldEntry>,
    pathgrids: BTreeMap<(i32, i32), Pathgrid>,
}

impl SceneRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn worldspace(&self) -> &str {
        &self.worldspace
    }

    /// Returns whether the worldspace changed
    pub fn set_worldspace(&mut self, worldspace: &str) -> bool {
        if self.worldspace == worldspace {
            return false;
        }
        debug!("Worldspace changed from '{}' to '{}'", self.worldspace, worldspace);
        self.worldspace = worldspace.to_string();
        true
    }

    /// Returns the new navmesh when this is the first reference to `agent`
    pub fn add_agent(&mut self, agent: AgentBounds) -> Option<SharedNavMesh> {
        if let Some(entry) = self.agents.get_mut(&agent) {
            entry.count += 1;
            return None;
        }
        let mesh = Arc::new(NavMeshCacheItem::new(agent));
        self.agents.insert(
            agent,
            AgentEntry {
                count: 1,
                mesh: Arc::clone(&mesh),
            },
        );
        Some(mesh)
    }

    /// Returns the dropped navmesh when the last reference to `agent` is removed
    pub fn remove_agent(&mut self, agent: &AgentBounds) -> Option<SharedNavMesh> {
        let entry = self.agents.get_mut(agent)?;
        entry.count -= 1;
        if entry.count > 0 {
            return None;
        }
        self.agents.remove(agent).map(|entry| entry.mesh)
    }

    pub fn agents(&self) -> impl Iterator<Item = (&AgentBounds, &AgentEntry)> {
        self.agents.iter()
    }

    pub fn agent_bounds(&self) -> Vec<AgentBounds> {
        self.agents.keys().copied().collect()
    }

    pub fn nav_mesh(&self, agent: &AgentBounds) -> Option<&SharedNavMesh> {
        self.agents.get(agent).map(|entry| &entry.mesh)
    }

    pub fn agent_count(&self) -> usize {
        self.agents.len()
    }

    pub fn contains_object(&self, id: ObjectId) -> bool {
        self.objects.contains_key(&id)
    }

    pub fn object(&self, id: ObjectId) -> Option<&SceneObject> {
        self.objects.get(&id)
    }

    pub fn object_count(&self) -> usize {
        self.objects.len()
    }

    pub fn water_count(&self) -> usize {
        self.water.len()
    }

    pub fn heightfield_count(&self) -> usize {
        self.heightfields.len()
    }

    pub fn pathgrid_count(&self) -> usize {
        self.pathgrids.len()
    }

    fn object_changes(object: &SceneObject) -> Vec<SceneChange> {
        let mut changes = vec![SceneChange::Bounds(object.bounds)];
        if let Some(connection) = object.connection() {
            changes.push(SceneChange::Point(connection.start));
        }
        changes
    }

    /// `None` when the id is already registered
    pub fn add_object(
        &mut self,
        id: ObjectId,
        shapes: &ObjectShapes,
        kind: ObjectKind,
        transform: &Affine3A,
    ) -> Option<Vec<SceneChange>> {
        if self.objects.contains_key(&id) {
            return None;
        }
        let object = SceneObject::new(shapes.clone(), kind, *transform);
        let changes = Self::object_changes(&object);
        self.objects.insert(id, object);
        Some(changes)
    }

    /// `None` when the id is unknown or nothing changed
    pub fn update_object(
        &mut self,
        id: ObjectId,
        shapes: &ObjectShapes,
        kind: ObjectKind,
        transform: &Affine3A,
    ) -> Option<Vec<SceneChange>> {
        let current = self.objects.get_mut(&id)?;
        if current.shapes.same_as(shapes) && current.transform == *transform && current.kind == kind {
            return None;
        }
        let object = SceneObject::new(shapes.clone(), kind, *transform);
        let mut changes = Self::object_changes(current);
        changes.extend(Self::object_changes(&object));
        *current = object;
        Some(changes)
    }

    pub fn remove_object(&mut self, id: ObjectId) -> Option<Vec<SceneChange>> {
        self.objects.remove(&id).map(|object| Self::object_changes(&object))
    }

    fn water_change(cell: (i32, i32), entry: &WaterEntry) -> SceneChange {
        if entry.is_global() {
            SceneChange::Everything
        } else {
            SceneChange::Bounds(cell_footprint(cell, entry.cell_size))
        }
    }

    /// `None` when the cell already has water or the cell size is invalid
    pub fn add_water(&mut self, cell: CellPosition, cell_size: i32, level: f32) -> Option<SceneChange> {
        let key = cell_key(cell);
        if cell_size <= 0 || !level.is_finite() || self.water.contains_key(&key) {
            return None;
        }
        let entry = WaterEntry { cell_size, level };
        self.water.insert(key, entry);
        Some(Self::water_change(key, &entry))
    }

    pub fn remove_water(&mut self, cell: CellPosition) -> Option<SceneChange> {
        let key = cell_key(cell);
        self.water
            .remove(&key)
            .map(|entry| Self::water_change(key, &entry))
    }

    pub fn add_heightfield(
        &mut self,
        cell: CellPosition,
        cell_size: i32,
        shape: Arc<HeightfieldShape>,
    ) -> Option<SceneChange> {
        let key = cell_key(cell);
        if cell_size <= 0 || cell_size == GLOBAL_CELL_SIZE || self.heightfields.contains_key(&key) {
            return None;
        }
        if !shape.is_valid() {
            warn!("Ignoring malformed heightfield at {}", cell);
            return None;
        }
        self.heightfields.insert(key, HeightfieldEntry { cell_size, shape });
        Some(SceneChange::Bounds(cell_footprint(key, cell_size)))
    }

    pub fn remove_heightfield(&mut self, cell: CellPosition) -> Option<SceneChange> {
        let key = cell_key(cell);
        self.heightfields
            .remove(&key)
            .map(|entry| SceneChange::Bounds(cell_footprint(key, entry.cell_size)))
    }

    fn pathgrid_changes(pathgrid: &Pathgrid) -> Vec<SceneChange> {
        pathgrid
            .connections()
            .map(|connection| SceneChange::Point(connection.start))
            .collect()
    }

    pub fn add_pathgrid(&mut self, cell: CellPosition, pathgrid: &Pathgrid) -> Option<Vec<SceneChange>> {
        let key = cell_key(cell);
        if self.pathgrids.contains_key(&key) {
            return None;
        }
        let changes = Self::pathgrid_changes(pathgrid);
        self.pathgrids.insert(key, pathgrid.clone());
        Some(changes)
    }

    pub fn remove_pathgrid(&mut self, cell: CellPosition) -> Option<Vec<SceneChange>> {
        self.pathgrids
            .remove(&cell_key(cell))
            .map(|pathgrid| Self::pathgrid_changes(&pathgrid))
    }

    /// Whether anything besides unbounded water is registered
    pub fn has_geometry(&self) -> bool {
        !self.objects.is_empty()
            || !self.heightfields.is_empty()
            || !self.pathgrids.is_empty()
            || self.water.values().any(|entry| !entry.is_global())
    }

    pub fn has_global_water(&self) -> bool {
        self.water.values().any(WaterEntry::is_global)
    }

    /// Every bounded area and connection start of the scene
    pub fn geometry_changes(&self) -> Vec<SceneChange> {
        let mut changes: Vec<SceneChange> = self
            .objects
            .values()
            .flat_map(Self::object_changes)
            .collect();
        changes.extend(
            self.water
                .iter()
                .filter(|(_, entry)| !entry.is_global())
                .map(|(cell, entry)| Self::water_change(*cell, entry)),
        );
        changes.extend(
            self.heightfields
                .iter()
                .map(|(cell, entry)| SceneChange::Bounds(cell_footprint(*cell, entry.cell_size))),
        );
        changes.extend(self.pathgrids.values().flat_map(Self::pathgrid_changes));
        changes
    }

    /// Capture everything that may affect the tile at `position`.
    ///
    /// `region` is the area the builder gathers geometry from.
    pub fn tile_input(&self, position: TilePosition, tile_bounds: Aabb, region: &Aabb) -> TileInput {
        let mut input = TileInput::new(position, tile_bounds);

        for object in self.objects.values() {
            if object.bounds.overlaps_xz(region) {
                input.objects.push(ObjectGeometry {
                    shape: Arc::clone(&object.shapes.shape),
                    transform: object.shape_transform(),
                    area: object.area(),
                });
            }
            if let Some(connection) = object.connection() {
                if tile_bounds.contains_point_xz(connection.start) {
                    input.connections.push(connection);
                }
            }
        }

        let mut global_water = Vec::new();
        for (cell, entry) in &self.water {
            if entry.is_global() {
                global_water.push(Water {
                    footprint: None,
                    level: entry.level,
                });
                continue;
            }
            let footprint = cell_footprint(*cell, entry.cell_size);
            if footprint.overlaps_xz(region) {
                input.water.push(Water {
                    footprint: Some(footprint),
                    level: entry.level,
                });
            }
        }

        for (cell, entry) in &self.heightfields {
            let footprint = cell_footprint(*cell, entry.cell_size);
            if footprint.overlaps_xz(region) {
                input.heightfields.push(HeightfieldGeometry {
                    origin: Vec3::new(footprint.min.x, 0.0, footprint.min.z),
                    cell_size: entry.cell_size as f32,
                    shape: Arc::clone(&entry.shape),
                });
            }
        }

        for pathgrid in self.pathgrids.values() {
            input.connections.extend(
                pathgrid
                    .connections()
                    .filter(|connection| tile_bounds.contains_point_xz(connection.start)),
            );
        }

        // unbounded water only floods tiles that have something else
        if !input.is_empty() {
            input.water.extend(global_water);
        }
        input
    }
}
