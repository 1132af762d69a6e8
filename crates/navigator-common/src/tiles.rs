//! Mapping between world space and the navmesh tile grid.

use crate::Aabb;
use glam::{IVec2, Vec3};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{Add, Sub};

/// Integer tile coordinate on the XZ plane (`x` is world x, `y` is world z).
///
/// Ordered by `x`, then `y`.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct TilePosition {
    pub x: i32,
    pub y: i32,
}

impl TilePosition {
    pub const ZERO: Self = Self::new(0, 0);

    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    pub fn as_ivec2(&self) -> IVec2 {
        IVec2::new(self.x, self.y)
    }
}

impl From<IVec2> for TilePosition {
    fn from(v: IVec2) -> Self {
        Self::new(v.x, v.y)
    }
}

impl From<TilePosition> for IVec2 {
    fn from(p: TilePosition) -> Self {
        p.as_ivec2()
    }
}

impl Add for TilePosition {
    type Output = TilePosition;

    fn add(self, rhs: Self) -> Self {
        Self::new(self.x + rhs.x, self.y + rhs.y)
    }
}

impl Sub for TilePosition {
    type Output = TilePosition;

    fn sub(self, rhs: Self) -> Self {
        Self::new(self.x - rhs.x, self.y - rhs.y)
    }
}

impl fmt::Display for TilePosition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

/// Inclusive rectangle of tile positions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TilesRange {
    pub min: TilePosition,
    pub max: TilePosition,
}

impl TilesRange {
    pub fn new(min: TilePosition, max: TilePosition) -> Self {
        Self { min, max }
    }

    /// Square range of `radius` tiles around `center`
    pub fn around(center: TilePosition, radius: i32) -> Self {
        let offset = TilePosition::new(radius, radius);
        Self {
            min: center - offset,
            max: center + offset,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.min.x > self.max.x || self.min.y > self.max.y
    }

    pub fn contains(&self, position: TilePosition) -> bool {
        position.x >= self.min.x
            && position.x <= self.max.x
            && position.y >= self.min.y
            && position.y <= self.max.y
    }

    pub fn intersection(&self, other: &TilesRange) -> TilesRange {
        TilesRange {
            min: TilePosition::new(self.min.x.max(other.min.x), self.min.y.max(other.min.y)),
            max: TilePosition::new(self.max.x.min(other.max.x), self.max.y.min(other.max.y)),
        }
    }

    pub fn len(&self) -> usize {
        if self.is_empty() {
            return 0;
        }
        let size = self.max - self.min + TilePosition::new(1, 1);
        size.x as usize * size.y as usize
    }

    /// Iterate positions row by row (z major, x minor)
    pub fn iter(&self) -> impl Iterator<Item = TilePosition> {
        let TilesRange { min, max } = *self;
        (min.y..=max.y).flat_map(move |y| (min.x..=max.x).map(move |x| TilePosition::new(x, y)))
    }
}

/// World to tile coordinate mapping
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TileGrid {
    /// Tile edge length in world units
    pub tile_world_size: f32,
}

impl TileGrid {
    pub fn new(tile_world_size: f32) -> Self {
        Self { tile_world_size }
    }

    pub fn tile_position(&self, position: Vec3) -> TilePosition {
        TilePosition::new(
            (position.x / self.tile_world_size).floor() as i32,
            (position.z / self.tile_world_size).floor() as i32,
        )
    }

    /// Minimal range of tiles whose area intersects the XZ projection of `bounds`.
    ///
    /// A bound that only touches the far edge of a tile does not cover it.
    pub fn tiles_covering(&self, bounds: &Aabb) -> TilesRange {
        let axis = |min: f32, max: f32| {
            let first = (min / self.tile_world_size).floor() as i32;
            let last = ((max / self.tile_world_size).ceil() as i32 - 1).max(first);
            (first, last)
        };
        let (min_x, max_x) = axis(bounds.min.x, bounds.max.x);
        let (min_z, max_z) = axis(bounds.min.z, bounds.max.z);
        TilesRange::new(TilePosition::new(min_x, min_z), TilePosition::new(max_x, max_z))
    }

    /// World bounds of a tile, unbounded in height
    pub fn tile_bounds(&self, position: TilePosition) -> Aabb {
        let size = self.tile_world_size;
        Aabb::new(
            Vec3::new(position.x as f32 * size, f32::MIN, position.y as f32 * size),
            Vec3::new((position.x + 1) as f32 * size, f32::MAX, (position.y + 1) as f32 * size),
        )
    }
}

/// Squared distance between two tile positions, used for build ordering
pub fn tile_distance_squared(a: TilePosition, b: TilePosition) -> i64 {
    let dx = (a.x - b.x) as i64;
    let dy = (a.y - b.y) as i64;
    dx * dx + dy * dy
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tiles_covering_straddles_origin() {
        let grid = TileGrid::new(16.0);
        let bounds = Aabb::from_center_half_extents(Vec3::ZERO, Vec3::splat(2.0));
        let range = grid.tiles_covering(&bounds);
        assert_eq!(range.min, TilePosition::new(-1, -1));
        assert_eq!(range.max, TilePosition::new(0, 0));
        assert_eq!(range.len(), 4);
    }

    #[test]
    fn test_touching_edge_does_not_cover() {
        let grid = TileGrid::new(16.0);
        let bounds = Aabb::new(Vec3::new(1.0, 0.0, 1.0), Vec3::new(16.0, 1.0, 2.0));
        let range = grid.tiles_covering(&bounds);
        assert_eq!(range.min, TilePosition::new(0, 0));
        assert_eq!(range.max, TilePosition::new(0, 0));
    }

    #[test]
    fn test_degenerate_bounds_cover_one_tile() {
        let grid = TileGrid::new(16.0);
        let point = Vec3::new(32.0, 0.0, -0.5);
        let range = grid.tiles_covering(&Aabb::new(point, point));
        assert_eq!(range.min, TilePosition::new(2, -1));
        assert_eq!(range.max, TilePosition::new(2, -1));
    }

    #[test]
    fn test_range_iteration_order() {
        let range = TilesRange::new(TilePosition::new(0, 0), TilePosition::new(1, 1));
        let positions: Vec<_> = range.iter().collect();
        assert_eq!(
            positions,
            vec![TilePosition::new(0, 0), TilePosition::new(1, 0), TilePosition::new(0, 1), TilePosition::new(1, 1)]
        );
    }

    #[test]
    fn test_range_intersection() {
        let a = TilesRange::around(TilePosition::ZERO, 2);
        let b = TilesRange::new(TilePosition::new(1, 1), TilePosition::new(5, 5));
        let c = a.intersection(&b);
        assert_eq!(c, TilesRange::new(TilePosition::new(1, 1), TilePosition::new(2, 2)));

        let far = TilesRange::new(TilePosition::new(10, 10), TilePosition::new(11, 11));
        assert!(a.intersection(&far).is_empty());
        assert_eq!(a.intersection(&far).len(), 0);
    }

    #[test]
    fn test_positions_order_by_x_then_y() {
        let mut positions = vec![
            TilePosition::new(1, -5),
            TilePosition::new(0, 3),
            TilePosition::new(0, -1),
        ];
        positions.sort();
        assert_eq!(
            positions,
            vec![TilePosition::new(0, -1), TilePosition::new(0, 3), TilePosition::new(1, -5)]
        );
        assert_eq!(TilePosition::from(IVec2::new(2, 3)).to_string(), "(2, 3)");
    }

    #[test]
    fn test_tile_position_negative() {
        let grid = TileGrid::new(8.0);
        assert_eq!(grid.tile_position(Vec3::new(-0.1, 5.0, 8.0)), TilePosition::new(-1, 1));
        assert_eq!(tile_distance_squared(TilePosition::new(-1, 1), TilePosition::new(2, -3)), 25);
    }
}
