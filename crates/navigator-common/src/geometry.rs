//! Axis-aligned bounds used by the scene registry and the tile tracker.
//!
//! The navigator uses a Y-up coordinate system: tiles are laid out on the XZ
//! plane and the Y axis is height.

use glam::{Affine3A, Vec3};
use serde::{Deserialize, Serialize};

/// Axis-aligned bounding box
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Aabb {
    pub min: Vec3,
    pub max: Vec3,
}

impl Aabb {
    pub fn new(min: Vec3, max: Vec3) -> Self {
        Self { min, max }
    }

    pub fn from_center_half_extents(center: Vec3, half_extents: Vec3) -> Self {
        Self {
            min: center - half_extents,
            max: center + half_extents,
        }
    }

    /// Bounds of a set of points, `None` when the set is empty
    pub fn from_points<'a>(points: impl IntoIterator<Item = &'a Vec3>) -> Option<Self> {
        let mut iter = points.into_iter();
        let first = *iter.next()?;
        Some(iter.fold(Self::new(first, first), |acc, p| Self {
            min: acc.min.min(*p),
            max: acc.max.max(*p),
        }))
    }

    pub fn union(&self, other: &Aabb) -> Aabb {
        Aabb {
            min: self.min.min(other.min),
            max: self.max.max(other.max),
        }
    }

    pub fn center(&self) -> Vec3 {
        (self.min + self.max) * 0.5
    }

    pub fn half_extents(&self) -> Vec3 {
        (self.max - self.min) * 0.5
    }

    /// Expand the bounds on the XZ plane only
    pub fn inflate_xz(&self, margin: f32) -> Aabb {
        let margin = Vec3::new(margin, 0.0, margin);
        Aabb {
            min: self.min - margin,
            max: self.max + margin,
        }
    }

    /// Check overlap of the XZ projections, touching edges count as overlap
    pub fn overlaps_xz(&self, other: &Aabb) -> bool {
        self.min.x <= other.max.x
            && self.max.x >= other.min.x
            && self.min.z <= other.max.z
            && self.max.z >= other.min.z
    }

    pub fn contains_point_xz(&self, point: Vec3) -> bool {
        point.x >= self.min.x && point.x <= self.max.x && point.z >= self.min.z && point.z <= self.max.z
    }

    /// Bounds of these bounds after applying `transform`
    pub fn transformed(&self, transform: &Affine3A) -> Aabb {
        let corners = [
            Vec3::new(self.min.x, self.min.y, self.min.z),
            Vec3::new(self.max.x, self.min.y, self.min.z),
            Vec3::new(self.min.x, self.max.y, self.min.z),
            Vec3::new(self.max.x, self.max.y, self.min.z),
            Vec3::new(self.min.x, self.min.y, self.max.z),
            Vec3::new(self.max.x, self.min.y, self.max.z),
            Vec3::new(self.min.x, self.max.y, self.max.z),
            Vec3::new(self.max.x, self.max.y, self.max.z),
        ]
        .map(|corner| transform.transform_point3(corner));

        // eight corners, never empty
        Aabb::from_points(corners.iter()).unwrap_or(*self)
    }

    pub fn is_finite(&self) -> bool {
        self.min.is_finite() && self.max.is_finite()
    }
}
