//! Voxel heightfield of a single tile.
//!
//! Each column of the field keeps a height ordered list of solid spans.
//! Heights are stored in cell-height units measured from world y = 0, so
//! spans from different sources can be merged without a vertical origin.

use crate::geometry::{AreaType, Triangle};
use glam::Vec3;

/// A solid vertical segment of a column
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Span {
    pub min: i32,
    pub max: i32,
    pub area: AreaType,
}

#[derive(Debug, Clone)]
pub struct Heightfield {
    /// Width of the field along the x-axis
    pub width: i32,
    /// Depth of the field along the z-axis
    pub depth: i32,
    /// World position of the (0, 0) cell corner, y is ignored
    pub origin: Vec3,
    pub cs: f32,
    pub ch: f32,
    columns: Vec<Vec<Span>>,
}

impl Heightfield {
    pub fn new(width: i32, depth: i32, origin: Vec3, cs: f32, ch: f32) -> Self {
        Self {
            width,
            depth,
            origin,
            cs,
            ch,
            columns: vec![Vec::new(); (width.max(0) * depth.max(0)) as usize],
        }
    }

    pub fn column(&self, x: i32, z: i32) -> &[Span] {
        if x < 0 || z < 0 || x >= self.width || z >= self.depth {
            return &[];
        }
        &self.columns[(z * self.width + x) as usize]
    }

    pub fn span_count(&self) -> usize {
        self.columns.iter().map(Vec::len).sum()
    }

    /// Add a span, merging it with every span it overlaps.
    ///
    /// When the merged top is within `merge_threshold` of an existing top the
    /// higher area id wins, otherwise the area of the upper surface is kept.
    pub fn add_span(&mut self, x: i32, z: i32, span: Span, merge_threshold: i32) {
        if x < 0 || z < 0 || x >= self.width || z >= self.depth || span.min > span.max {
            return;
        }
        let column = &mut self.columns[(z * self.width + x) as usize];

        let mut merged = span;
        let mut index = 0;
        while index < column.len() {
            let current = column[index];
            if current.max < merged.min {
                index += 1;
                continue;
            }
            if current.min > merged.max {
                break;
            }

            let top = merged.max.max(current.max);
            merged.area = if (merged.max - current.max).abs() <= merge_threshold {
                merged.area.max(current.area)
            } else if current.max > merged.max {
                current.area
            } else {
                merged.area
            };
            merged.min = merged.min.min(current.min);
            merged.max = top;
            column.remove(index);
        }
        column.insert(index, merged);
    }

    /// Rasterize a triangle into every column it covers
    pub fn rasterize_triangle(&mut self, triangle: &Triangle, area: AreaType, merge_threshold: i32) {
        let [a, b, c] = triangle.vertices;
        let tri_min = a.min(b).min(c);
        let tri_max = a.max(b).max(c);

        // cells merely touched by the triangle's bounds are skipped
        let (x0, x1) = self.cell_range(tri_min.x - self.origin.x, tri_max.x - self.origin.x);
        let (z0, z1) = self.cell_range(tri_min.z - self.origin.z, tri_max.z - self.origin.z);
        let (x0, x1) = (x0.max(0), x1.min(self.width - 1));
        let (z0, z1) = (z0.max(0), z1.min(self.depth - 1));
        if x0 > x1 || z0 > z1 {
            return;
        }

        let polygon = vec![a, b, c];
        for z in z0..=z1 {
            let cell_min_z = self.origin.z + z as f32 * self.cs;
            let row = clip(&polygon, Axis::Z, cell_min_z, false);
            let row = clip(&row, Axis::Z, cell_min_z + self.cs, true);
            if row.len() < 3 {
                continue;
            }
            for x in x0..=x1 {
                let cell_min_x = self.origin.x + x as f32 * self.cs;
                let cell = clip(&row, Axis::X, cell_min_x, false);
                let cell = clip(&cell, Axis::X, cell_min_x + self.cs, true);
                if cell.len() < 3 {
                    continue;
                }

                let (min_y, max_y) = cell
                    .iter()
                    .fold((f32::INFINITY, f32::NEG_INFINITY), |(lo, hi), v| {
                        (lo.min(v.y), hi.max(v.y))
                    });
                let span = Span {
                    min: (min_y / self.ch).floor() as i32,
                    max: (max_y / self.ch).ceil() as i32,
                    area,
                };
                self.add_span(x, z, span, merge_threshold);
            }
        }
    }

    fn cell_range(&self, min: f32, max: f32) -> (i32, i32) {
        let first = (min / self.cs).floor() as i32;
        let last = ((max / self.cs).ceil() as i32 - 1).max(first);
        (first, last)
    }

    /// World position of the center of a cell top at height `y` (in cells)
    pub fn cell_center(&self, x: i32, z: i32, y: i32) -> Vec3 {
        Vec3::new(
            self.origin.x + (x as f32 + 0.5) * self.cs,
            y as f32 * self.ch,
            self.origin.z + (z as f32 + 0.5) * self.cs,
        )
    }
}

#[derive(Debug, Clone, Copy)]
enum Axis {
    X,
    Z,
}

/// Clip a convex polygon against an axis aligned plane, keeping the part
/// below `offset` when `keep_below` is set and the part above otherwise
fn clip(polygon: &[Vec3], axis: Axis, offset: f32, keep_below: bool) -> Vec<Vec3> {
    let side = |v: &Vec3| {
        let d = match axis {
            Axis::X => v.x - offset,
            Axis::Z => v.z - offset,
        };
        if keep_below {
            -d
        } else {
            d
        }
    };

    let mut out = Vec::with_capacity(polygon.len() + 2);
    for (i, current) in polygon.iter().enumerate() {
        let next = &polygon[(i + 1) % polygon.len()];
        let (dc, dn) = (side(current), side(next));
        if dc >= 0.0 {
            out.push(*current);
        }
        if (dc >= 0.0) != (dn >= 0.0) {
            let t = dc / (dc - dn);
            out.push(*current + (*next - *current) * t);
        }
    }
    out
}
