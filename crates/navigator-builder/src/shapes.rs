//! Collision shapes consumed by the navmesh builder.
//!
//! Shapes are owned by the caller and shared through `Arc<dyn CollisionShape>`;
//! the builder only ever reads them.

use glam::{Affine3A, Vec3};
use navigator_common::Aabb;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Geometry that can be turned into triangles for rasterization
pub trait CollisionShape: Send + Sync + std::fmt::Debug {
    /// Bounds in the shape's local space
    fn local_bounds(&self) -> Aabb;

    /// Append world space triangles of this shape placed with `transform`
    fn append_triangles(&self, transform: &Affine3A, out: &mut Vec<[Vec3; 3]>);

    fn shape_type(&self) -> ShapeType;
}

/// Types of shapes supported
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ShapeType {
    Box,
    TriangleMesh,
    Compound,
}

/// Axis aligned box in local space
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BoxShape {
    pub half_extents: Vec3,
}

impl BoxShape {
    pub fn new(half_extents: Vec3) -> Self {
        Self { half_extents }
    }

    /// The 8 corners of this box in local space
    pub fn vertices(&self) -> [Vec3; 8] {
        let Vec3 { x: hx, y: hy, z: hz } = self.half_extents;
        [
            Vec3::new(-hx, -hy, -hz),
            Vec3::new(hx, -hy, -hz),
            Vec3::new(hx, hy, -hz),
            Vec3::new(-hx, hy, -hz),
            Vec3::new(-hx, -hy, hz),
            Vec3::new(hx, -hy, hz),
            Vec3::new(hx, hy, hz),
            Vec3::new(-hx, hy, hz),
        ]
    }
}

/// Counter-clockwise (seen from outside) faces of [`BoxShape::vertices`]
const BOX_TRIANGLES: [[usize; 3]; 12] = [
    // bottom
    [0, 1, 5],
    [0, 5, 4],
    // top
    [3, 7, 6],
    [3, 6, 2],
    // front (-z)
    [0, 3, 2],
    [0, 2, 1],
    // back (+z)
    [4, 5, 6],
    [4, 6, 7],
    // left (-x)
    [0, 4, 7],
    [0, 7, 3],
    // right (+x)
    [1, 2, 6],
    [1, 6, 5],
];

impl CollisionShape for BoxShape {
    fn local_bounds(&self) -> Aabb {
        Aabb::from_center_half_extents(Vec3::ZERO, self.half_extents)
    }

    fn append_triangles(&self, transform: &Affine3A, out: &mut Vec<[Vec3; 3]>) {
        let vertices = self.vertices().map(|v| transform.transform_point3(v));
        out.extend(
            BOX_TRIANGLES
                .iter()
                .map(|[a, b, c]| [vertices[*a], vertices[*b], vertices[*c]]),
        );
    }

    fn shape_type(&self) -> ShapeType {
        ShapeType::Box
    }
}

/// Indexed triangle soup
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TriangleMeshShape {
    pub vertices: Vec<Vec3>,
    pub indices: Vec<[u32; 3]>,
    bounds: Aabb,
}

impl TriangleMeshShape {
    /// Returns `None` when an index is out of range or there are no vertices
    pub fn new(vertices: Vec<Vec3>, indices: Vec<[u32; 3]>) -> Option<Self> {
        let bounds = Aabb::from_points(vertices.iter())?;
        let count = vertices.len() as u32;
        if indices.iter().flatten().any(|&i| i >= count) {
            return None;
        }
        Some(Self {
            vertices,
            indices,
            bounds,
        })
    }
}

impl CollisionShape for TriangleMeshShape {
    fn local_bounds(&self) -> Aabb {
        self.bounds
    }

    fn append_triangles(&self, transform: &Affine3A, out: &mut Vec<[Vec3; 3]>) {
        out.extend(self.indices.iter().map(|tri| {
            tri.map(|i| transform.transform_point3(self.vertices[i as usize]))
        }));
    }

    fn shape_type(&self) -> ShapeType {
        ShapeType::TriangleMesh
    }
}

/// Several child shapes with local transforms
#[derive(Debug, Clone)]
pub struct CompoundShape {
    children: Vec<(Affine3A, Arc<dyn CollisionShape>)>,
}

impl CompoundShape {
    pub fn new() -> Self {
        Self {
            children: Vec::new(),
        }
    }

    pub fn with_child(mut self, transform: Affine3A, shape: Arc<dyn CollisionShape>) -> Self {
        self.children.push((transform, shape));
        self
    }

    pub fn children(&self) -> &[(Affine3A, Arc<dyn CollisionShape>)] {
        &self.children
    }
}

impl Default for CompoundShape {
    fn default() -> Self {
        Self::new()
    }
}

impl CollisionShape for CompoundShape {
    fn local_bounds(&self) -> Aabb {
        self.children
            .iter()
            .map(|(transform, shape)| shape.local_bounds().transformed(transform))
            .reduce(|a, b| a.union(&b))
            .unwrap_or_else(|| Aabb::new(Vec3::ZERO, Vec3::ZERO))
    }

    fn append_triangles(&self, transform: &Affine3A, out: &mut Vec<[Vec3; 3]>) {
        for (child_transform, shape) in &self.children {
            shape.append_triangles(&(*transform * *child_transform), out);
        }
    }

    fn shape_type(&self) -> ShapeType {
        ShapeType::Compound
    }
}

/// Terrain of one cell
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum HeightfieldShape {
    /// Flat terrain at a fixed height
    Plane { height: f32 },
    /// `size * size` height samples evenly spread over the cell, row major along z
    Samples {
        heights: Vec<f32>,
        size: usize,
        min_height: f32,
        max_height: f32,
    },
}

impl HeightfieldShape {
    pub fn samples(heights: Vec<f32>, size: usize) -> Option<Self> {
        if size < 2 || heights.len() != size * size {
            return None;
        }
        let min_height = heights.iter().copied().fold(f32::INFINITY, f32::min);
        let max_height = heights.iter().copied().fold(f32::NEG_INFINITY, f32::max);
        Some(HeightfieldShape::Samples {
            heights,
            size,
            min_height,
            max_height,
        })
    }

    /// Heights are finite, match `size` and lie within the stored range
    pub fn is_valid(&self) -> bool {
        match self {
            HeightfieldShape::Plane { height } => height.is_finite(),
            HeightfieldShape::Samples {
                heights,
                size,
                min_height,
                max_height,
            } => {
                *size >= 2
                    && heights.len() == size * size
                    && heights
                        .iter()
                        .all(|h| h.is_finite() && *h >= *min_height && *h <= *max_height)
            }
        }
    }

    pub fn height_range(&self) -> (f32, f32) {
        match self {
            HeightfieldShape::Plane { height } => (*height, *height),
            HeightfieldShape::Samples {
                min_height,
                max_height,
                ..
            } => (*min_height, *max_height),
        }
    }

    /// Triangulate the shape over the XZ square `origin .. origin + cell_size`.
    /// Malformed shapes produce no triangles.
    pub fn append_triangles(&self, origin: Vec3, cell_size: f32, out: &mut Vec<[Vec3; 3]>) {
        if !self.is_valid() {
            return;
        }
        match self {
            HeightfieldShape::Plane { height } => {
                let corner = |x: f32, z: f32| Vec3::new(origin.x + x, *height, origin.z + z);
                let (a, b) = (corner(0.0, 0.0), corner(cell_size, 0.0));
                let (c, d) = (corner(cell_size, cell_size), corner(0.0, cell_size));
                out.push([a, d, c]);
                out.push([a, c, b]);
            }
            HeightfieldShape::Samples { heights, size, .. } => {
                let step = cell_size / (*size - 1) as f32;
                let vertex = |x: usize, z: usize| {
                    Vec3::new(
                        origin.x + x as f32 * step,
                        heights[z * size + x],
                        origin.z + z as f32 * step,
                    )
                };
                for z in 0..size - 1 {
                    for x in 0..size - 1 {
                        let (a, b) = (vertex(x, z), vertex(x + 1, z));
                        let (c, d) = (vertex(x + 1, z + 1), vertex(x, z + 1));
                        out.push([a, d, c]);
                        out.push([a, c, b]);
                    }
                }
            }
        }
    }
}
