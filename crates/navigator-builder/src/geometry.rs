//! Tile inputs.
//!
//! A [`TileInput`] is what the scheduler captures for one tile: shared shape
//! handles and transforms, water, terrain and off-mesh links. The worker turns
//! it into a [`TileGeometry`] (plain triangles clipped to the build region)
//! before voxelizing it.

use crate::shapes::{CollisionShape, HeightfieldShape};
use glam::{Affine3A, Vec3};
use navigator_common::{Aabb, TilePosition};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Area type of rasterized geometry
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum AreaType {
    Null = 0,
    Ground = 1,
    Water = 2,
    Door = 3,
    Pathgrid = 4,
}

/// A registered object placed in the world
#[derive(Debug, Clone)]
pub struct ObjectGeometry {
    pub shape: Arc<dyn CollisionShape>,
    pub transform: Affine3A,
    pub area: AreaType,
}

/// Water surface; `footprint` is `None` for water covering the whole world
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Water {
    pub footprint: Option<Aabb>,
    pub level: f32,
}

/// Terrain of one cell
#[derive(Debug, Clone)]
pub struct HeightfieldGeometry {
    pub origin: Vec3,
    pub cell_size: f32,
    pub shape: Arc<HeightfieldShape>,
}

/// Link between two points not connected by walkable surface
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct OffMeshConnection {
    pub start: Vec3,
    pub end: Vec3,
    pub area: AreaType,
}

/// Everything that may affect a single tile, captured at scheduling time
#[derive(Debug, Clone)]
pub struct TileInput {
    pub position: TilePosition,
    pub bounds: Aabb,
    pub objects: Vec<ObjectGeometry>,
    pub water: Vec<Water>,
    pub heightfields: Vec<HeightfieldGeometry>,
    pub connections: Vec<OffMeshConnection>,
}

impl TileInput {
    pub fn new(position: TilePosition, bounds: Aabb) -> Self {
        Self {
            position,
            bounds,
            objects: Vec::new(),
            water: Vec::new(),
            heightfields: Vec::new(),
            connections: Vec::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
            && self.water.is_empty()
            && self.heightfields.is_empty()
            && self.connections.is_empty()
    }

    /// Generate triangles for everything overlapping `region` on the XZ plane
    pub fn collect(&self, region: &Aabb) -> TileGeometry {
        let mut scratch = Vec::new();
        let mut triangles = Vec::new();

        let mut keep = |scratch: &mut Vec<[Vec3; 3]>, area: AreaType| {
            triangles.extend(scratch.drain(..).filter_map(|vertices| {
                let bounds = Aabb::from_points(vertices.iter())?;
                region.overlaps_xz(&bounds).then_some(Triangle { vertices, area })
            }));
        };

        for object in &self.objects {
            object.shape.append_triangles(&object.transform, &mut scratch);
            keep(&mut scratch, object.area);
        }

        for heightfield in &self.heightfields {
            heightfield
                .shape
                .append_triangles(heightfield.origin, heightfield.cell_size, &mut scratch);
            keep(&mut scratch, AreaType::Ground);
        }

        let water = self
            .water
            .iter()
            .filter(|water| water.footprint.map_or(true, |f| f.overlaps_xz(region)))
            .copied()
            .collect();

        let connections = self
            .connections
            .iter()
            .filter(|c| self.bounds.contains_point_xz(c.start))
            .copied()
            .collect();

        TileGeometry {
            position: self.position,
            bounds: self.bounds,
            triangles,
            water,
            connections,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Triangle {
    pub vertices: [Vec3; 3],
    pub area: AreaType,
}

impl Triangle {
    /// Cosine of the angle between the face normal and the up axis
    pub fn up_cosine(&self) -> f32 {
        let [a, b, c] = self.vertices;
        let normal = (b - a).cross(c - a);
        let length = normal.length();
        if length <= f32::EPSILON {
            return -1.0;
        }
        normal.y / length
    }
}

/// Plain geometry of one tile, ready for voxelization
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TileGeometry {
    pub position: TilePosition,
    pub bounds: Aabb,
    pub triangles: Vec<Triangle>,
    pub water: Vec<Water>,
    pub connections: Vec<OffMeshConnection>,
}

impl TileGeometry {
    pub fn is_empty(&self) -> bool {
        self.triangles.is_empty() && self.water.is_empty() && self.connections.is_empty()
    }

    /// Stable little endian encoding, used as the content key of cached tiles
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(16 + self.triangles.len() * 37);
        let put = |out: &mut Vec<u8>, v: Vec3| {
            out.extend_from_slice(&v.x.to_le_bytes());
            out.extend_from_slice(&v.y.to_le_bytes());
            out.extend_from_slice(&v.z.to_le_bytes());
        };

        out.extend_from_slice(&self.position.x.to_le_bytes());
        out.extend_from_slice(&self.position.y.to_le_bytes());

        out.extend_from_slice(&(self.triangles.len() as u32).to_le_bytes());
        for triangle in &self.triangles {
            for vertex in triangle.vertices {
                put(&mut out, vertex);
            }
            out.push(triangle.area as u8);
        }

        out.extend_from_slice(&(self.water.len() as u32).to_le_bytes());
        for water in &self.water {
            out.extend_from_slice(&water.level.to_le_bytes());
            match water.footprint {
                Some(footprint) => {
                    out.push(1);
                    put(&mut out, footprint.min);
                    put(&mut out, footprint.max);
                }
                None => out.push(0),
            }
        }

        out.extend_from_slice(&(self.connections.len() as u32).to_le_bytes());
        for connection in &self.connections {
            put(&mut out, connection.start);
            put(&mut out, connection.end);
            out.push(connection.area as u8);
        }

        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shapes::BoxShape;
    use navigator_common::TilePosition;

    fn tile_bounds() -> Aabb {
        Aabb::new(Vec3::new(0.0, f32::MIN, 0.0), Vec3::new(16.0, f32::MAX, 16.0))
    }

    #[test]
    fn test_collect_filters_by_region() {
        let mut input = TileInput::new(TilePosition::ZERO, tile_bounds());
        input.objects.push(ObjectGeometry {
            shape: Arc::new(BoxShape::new(Vec3::ONE)),
            transform: Affine3A::from_translation(Vec3::new(4.0, 0.0, 4.0)),
            area: AreaType::Ground,
        });
        input.objects.push(ObjectGeometry {
            shape: Arc::new(BoxShape::new(Vec3::ONE)),
            transform: Affine3A::from_translation(Vec3::new(100.0, 0.0, 4.0)),
            area: AreaType::Ground,
        });

        let geometry = input.collect(&tile_bounds());
        assert_eq!(geometry.triangles.len(), 12);
        assert!(!geometry.is_empty());
    }

    #[test]
    fn test_connections_kept_by_start_point() {
        let mut input = TileInput::new(TilePosition::ZERO, tile_bounds());
        input.connections.push(OffMeshConnection {
            start: Vec3::new(1.0, 0.0, 1.0),
            end: Vec3::new(40.0, 0.0, 1.0),
            area: AreaType::Door,
        });
        input.connections.push(OffMeshConnection {
            start: Vec3::new(40.0, 0.0, 1.0),
            end: Vec3::new(1.0, 0.0, 1.0),
            area: AreaType::Door,
        });

        let geometry = input.collect(&tile_bounds());
        assert_eq!(geometry.connections.len(), 1);
        assert_eq!(geometry.connections[0].start, Vec3::new(1.0, 0.0, 1.0));
    }

    #[test]
    fn test_bytes_change_with_geometry() {
        let mut input = TileInput::new(TilePosition::ZERO, tile_bounds());
        input.water.push(Water {
            footprint: None,
            level: 0.0,
        });
        let a = input.collect(&tile_bounds()).to_bytes();
        assert_eq!(a, input.collect(&tile_bounds()).to_bytes());

        input.water[0].level = 1.0;
        let b = input.collect(&tile_bounds()).to_bytes();
        assert_ne!(a, b);
    }

    #[test]
    fn test_up_cosine() {
        let floor = Triangle {
            vertices: [Vec3::ZERO, Vec3::Z, Vec3::X],
            area: AreaType::Ground,
        };
        let wall = Triangle {
            vertices: [Vec3::ZERO, Vec3::Y, Vec3::X],
            area: AreaType::Ground,
        };
        assert!((floor.up_cosine() - 1.0).abs() < 1e-6);
        assert!(wall.up_cosine().abs() < 1e-6);
    }
}
