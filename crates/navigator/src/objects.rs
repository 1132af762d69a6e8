//! Scene entities registered by the caller.

use glam::{Affine3A, IVec2, Quat, Vec3};
use navigator_builder::{AreaType, CollisionShape, OffMeshConnection};
use navigator_common::Aabb;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// Identifier of a registered object, unique while the object is live
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ObjectId(pub u64);

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Position of a world cell, the unit water, terrain and pathgrids are keyed by
pub type CellPosition = IVec2;

/// Cell size of water covering the whole worldspace
pub const GLOBAL_CELL_SIZE: i32 = i32::MAX;

/// Local scale and rotation of a shape, applied before the world transform
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ObjectTransform {
    pub scale: f32,
    pub rotation: Quat,
}

impl Default for ObjectTransform {
    fn default() -> Self {
        Self {
            scale: 1.0,
            rotation: Quat::IDENTITY,
        }
    }
}

impl ObjectTransform {
    pub fn to_affine(&self) -> Affine3A {
        Affine3A::from_scale_rotation_translation(Vec3::splat(self.scale), self.rotation, Vec3::ZERO)
    }
}

/// Shared handle to an externally owned collision shape.
///
/// The shape must not be mutated while the object is registered.
#[derive(Debug, Clone)]
pub struct ObjectShapes {
    pub shape: Arc<dyn CollisionShape>,
    pub transform: ObjectTransform,
}

impl ObjectShapes {
    pub fn new(shape: Arc<dyn CollisionShape>) -> Self {
        Self {
            shape,
            transform: ObjectTransform::default(),
        }
    }

    pub fn with_transform(mut self, transform: ObjectTransform) -> Self {
        self.transform = transform;
        self
    }

    /// Same shape handle and same local transform
    pub fn same_as(&self, other: &ObjectShapes) -> bool {
        Arc::ptr_eq(&self.shape, &other.shape) && self.transform == other.transform
    }
}

/// Door shape plus the world space ends of the passage through it
#[derive(Debug, Clone)]
pub struct DoorShapes {
    pub shapes: ObjectShapes,
    pub connection_start: Vec3,
    pub connection_end: Vec3,
}

impl DoorShapes {
    pub fn new(shapes: ObjectShapes, connection_start: Vec3, connection_end: Vec3) -> Self {
        Self {
            shapes,
            connection_start,
            connection_end,
        }
    }

    pub fn connection(&self) -> OffMeshConnection {
        OffMeshConnection {
            start: self.connection_start,
            end: self.connection_end,
            area: AreaType::Door,
        }
    }
}

/// Legacy navigation graph of a cell, points in world space
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Pathgrid {
    pub points: Vec<Vec3>,
    pub edges: Vec<[u32; 2]>,
}

impl Pathgrid {
    /// One connection per edge, edges with unknown points are skipped
    pub fn connections(&self) -> impl Iterator<Item = OffMeshConnection> + '_ {
        self.edges.iter().filter_map(|[from, to]| {
            let start = *self.points.get(*from as usize)?;
            let end = *self.points.get(*to as usize)?;
            Some(OffMeshConnection {
                start,
                end,
                area: AreaType::Pathgrid,
            })
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ObjectKind {
    Plain,
    Door(OffMeshConnection),
}

/// A registered object with its world transform and cached world bounds
#[derive(Debug, Clone)]
pub struct SceneObject {
    pub shapes: ObjectShapes,
    pub kind: ObjectKind,
    pub transform: Affine3A,
    pub bounds: Aabb,
}

impl SceneObject {
    pub fn new(shapes: ObjectShapes, kind: ObjectKind, transform: Affine3A) -> Self {
        let shape_transform = transform * shapes.transform.to_affine();
        let bounds = shapes.shape.local_bounds().transformed(&shape_transform);
        Self {
            shapes,
            kind,
            transform,
            bounds,
        }
    }

    /// Transform from shape space to world space
    pub fn shape_transform(&self) -> Affine3A {
        self.transform * self.shapes.transform.to_affine()
    }

    pub fn connection(&self) -> Option<OffMeshConnection> {
        match self.kind {
            ObjectKind::Plain => None,
            ObjectKind::Door(connection) => Some(connection),
        }
    }

    pub fn area(&self) -> AreaType {
        match self.kind {
            ObjectKind::Plain => AreaType::Ground,
            ObjectKind::Door(_) => AreaType::Door,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use navigator_builder::BoxShape;

    #[test]
    fn test_scene_object_bounds_use_local_scale() {
        let shapes = ObjectShapes::new(Arc::new(BoxShape::new(Vec3::ONE))).with_transform(ObjectTransform {
            scale: 2.0,
            rotation: Quat::IDENTITY,
        });
        let object = SceneObject::new(
            shapes,
            ObjectKind::Plain,
            Affine3A::from_translation(Vec3::new(10.0, 0.0, 0.0)),
        );
        assert_eq!(object.bounds.min, Vec3::new(8.0, -2.0, -2.0));
        assert_eq!(object.bounds.max, Vec3::new(12.0, 2.0, 2.0));
    }

    #[test]
    fn test_same_shapes() {
        let shape: Arc<dyn CollisionShape> = Arc::new(BoxShape::new(Vec3::ONE));
        let a = ObjectShapes::new(shape.clone());
        let b = ObjectShapes::new(shape);
        let c = ObjectShapes::new(Arc::new(BoxShape::new(Vec3::ONE)));
        assert!(a.same_as(&b));
        assert!(!a.same_as(&c));
    }

    #[test]
    fn test_pathgrid_connections_skip_bad_edges() {
        let pathgrid = Pathgrid {
            points: vec![Vec3::ZERO, Vec3::new(4.0, 0.0, 0.0)],
            edges: vec![[0, 1], [1, 0], [1, 7]],
        };
        let connections: Vec<_> = pathgrid.connections().collect();
        assert_eq!(connections.len(), 2);
        assert_eq!(connections[1].start, Vec3::new(4.0, 0.0, 0.0));
        assert!(connections.iter().all(|c| c.area == AreaType::Pathgrid));
    }
}
