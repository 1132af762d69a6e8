//! JSON scene description loaded by the CLI

use anyhow::{Context, Result};
use glam::{Affine3A, IVec2, Quat, Vec3};
use log::warn;
use navigator::{DoorShapes, Navigator, ObjectId, ObjectShapes, Pathgrid, Settings, GLOBAL_CELL_SIZE};
use navigator_builder::{BoxShape, HeightfieldShape, TriangleMeshShape};
use navigator_common::AgentBounds;
use serde::Deserialize;
use std::fs;
use std::path::Path;
use std::sync::Arc;

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Scene {
    pub worldspace: String,
    pub settings: Settings,
    pub agents: Vec<AgentBounds>,
    pub player: Vec3,
    pub objects: Vec<SceneObjectDesc>,
    pub doors: Vec<SceneDoorDesc>,
    pub water: Vec<SceneWaterDesc>,
    pub heightfields: Vec<SceneHeightfieldDesc>,
    pub pathgrids: Vec<ScenePathgridDesc>,
}

/// Collision shape of an object
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ShapeDesc {
    Box { half_extents: Vec3 },
    Mesh { vertices: Vec<Vec3>, indices: Vec<[u32; 3]> },
}

#[derive(Debug, Clone, Deserialize)]
pub struct SceneObjectDesc {
    pub id: u64,
    pub shape: ShapeDesc,
    pub position: Vec3,
    /// Rotation around the up axis in degrees
    #[serde(default)]
    pub yaw: f32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SceneDoorDesc {
    #[serde(flatten)]
    pub object: SceneObjectDesc,
    pub connection_start: Vec3,
    pub connection_end: Vec3,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SceneWaterDesc {
    pub cell: IVec2,
    /// Omitted for water covering the whole worldspace
    pub cell_size: Option<i32>,
    pub level: f32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SceneHeightfieldDesc {
    pub cell: IVec2,
    pub cell_size: i32,
    pub shape: HeightfieldShape,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ScenePathgridDesc {
    pub cell: IVec2,
    #[serde(flatten)]
    pub pathgrid: Pathgrid,
}

impl SceneObjectDesc {
    fn shapes(&self) -> Result<ObjectShapes> {
        let shape: Arc<dyn navigator_builder::CollisionShape> = match &self.shape {
            ShapeDesc::Box { half_extents } => Arc::new(BoxShape::new(*half_extents)),
            ShapeDesc::Mesh { vertices, indices } => Arc::new(
                TriangleMeshShape::new(vertices.clone(), indices.clone())
                    .with_context(|| format!("object {} has an invalid triangle mesh", self.id))?,
            ),
        };
        Ok(ObjectShapes::new(shape))
    }

    fn transform(&self) -> Affine3A {
        Affine3A::from_rotation_translation(Quat::from_rotation_y(self.yaw.to_radians()), self.position)
    }
}

impl Scene {
    pub fn load(path: &Path) -> Result<Self> {
        let data = fs::read_to_string(path).with_context(|| format!("Failed to read scene {}", path.display()))?;
        serde_json::from_str(&data).with_context(|| format!("Failed to parse scene {}", path.display()))
    }

    /// Register everything in the scene, returns the number of rejected entries
    pub fn apply(&self, navigator: &mut dyn Navigator) -> Result<usize> {
        let mut rejected = 0;
        let mut check = |accepted: bool, what: String| {
            if !accepted {
                warn!("Rejected {}", what);
                rejected += 1;
            }
        };

        navigator.set_worldspace(&self.worldspace);
        for agent in &self.agents {
            check(navigator.add_agent(*agent), format!("agent {:?}", agent));
        }
        for object in &self.objects {
            let accepted = navigator.add_object(ObjectId(object.id), &object.shapes()?, &object.transform());
            check(accepted, format!("object {}", object.id));
        }
        for door in &self.doors {
            let shapes = DoorShapes::new(door.object.shapes()?, door.connection_start, door.connection_end);
            let accepted = navigator.add_door(ObjectId(door.object.id), &shapes, &door.object.transform());
            check(accepted, format!("door {}", door.object.id));
        }
        for heightfield in &self.heightfields {
            let accepted = navigator.add_heightfield(
                heightfield.cell,
                heightfield.cell_size,
                Arc::new(heightfield.shape.clone()),
            );
            check(accepted, format!("heightfield at {}", heightfield.cell));
        }
        for pathgrid in &self.pathgrids {
            let accepted = navigator.add_pathgrid(pathgrid.cell, &pathgrid.pathgrid);
            check(accepted, format!("pathgrid at {}", pathgrid.cell));
        }
        // global water needs the rest of the scene in place
        for water in &self.water {
            let cell_size = water.cell_size.unwrap_or(GLOBAL_CELL_SIZE);
            let accepted = navigator.add_water(water.cell, cell_size, water.level);
            check(accepted, format!("water at {}", water.cell));
        }
        Ok(rejected)
    }
}
