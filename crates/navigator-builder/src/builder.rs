//! Tile building.
//!
//! [`HeightfieldTileBuilder`] voxelizes the geometry gathered around a tile,
//! marks the spans an agent can stand on, erodes them by the agent radius and
//! merges what is left into row quads.

use crate::config::TileBuildConfig;
use crate::geometry::{AreaType, OffMeshConnection, TileGeometry};
use crate::heightfield::{Heightfield, Span};
use glam::Vec3;
use log::debug;
use navigator_common::{AgentBounds, Aabb, Error, Result, TilePosition};
use serde::{Deserialize, Serialize};

/// Builds the navmesh payload of one tile for one agent class
pub trait TileBuilder: Send + Sync {
    /// Region around `tile_bounds` whose geometry affects the tile
    fn region(&self, agent: &AgentBounds, tile_bounds: &Aabb) -> Aabb;

    /// Build a tile. `Ok(None)` means the tile has nothing to walk on and
    /// should be absent from the mesh.
    fn build(&self, agent: &AgentBounds, geometry: &TileGeometry) -> Result<Option<TilePayload>>;
}

/// Convex walkable polygon, vertices counter-clockwise seen from above
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TilePolygon {
    pub vertices: Vec<Vec3>,
    pub area: AreaType,
}

/// Built navmesh data of one tile
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TilePayload {
    pub position: TilePosition,
    pub polygons: Vec<TilePolygon>,
    pub connections: Vec<OffMeshConnection>,
    /// Solid spans in the voxelized region, border included
    pub span_count: usize,
    /// Walkable cells left inside the tile after erosion
    pub walkable_cells: usize,
}

impl TilePayload {
    pub fn polygon_count(&self) -> usize {
        self.polygons.len()
    }
}

#[derive(Debug, Clone)]
pub struct HeightfieldTileBuilder {
    config: TileBuildConfig,
}

impl HeightfieldTileBuilder {
    pub fn new(config: TileBuildConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &TileBuildConfig {
        &self.config
    }

    pub fn config_for(&self, agent: &AgentBounds) -> TileBuildConfig {
        self.config.clone().with_agent(agent)
    }

    fn rasterize(&self, config: &TileBuildConfig, geometry: &TileGeometry, region: &Aabb) -> Heightfield {
        let size = config.field_size();
        let mut field = Heightfield::new(size, size, region.min, config.cs, config.ch);
        let walkable_cos = config.walkable_slope_angle.to_radians().cos();

        for triangle in &geometry.triangles {
            let area = if triangle.up_cosine() >= walkable_cos {
                triangle.area
            } else {
                AreaType::Null
            };
            field.rasterize_triangle(triangle, area, config.walkable_climb);
        }

        for water in &geometry.water {
            let surface = (water.level / config.ch).round() as i32;
            for z in 0..size {
                for x in 0..size {
                    let center = field.cell_center(x, z, surface);
                    if water.footprint.map_or(true, |f| f.contains_point_xz(center)) {
                        let span = Span {
                            min: surface - 1,
                            max: surface,
                            area: AreaType::Water,
                        };
                        field.add_span(x, z, span, config.walkable_climb);
                    }
                }
            }
        }

        field
    }
}

/// Top surface of the highest walkable span of a column
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Surface {
    top: i32,
    area: AreaType,
}

fn walkable_surface(column: &[Span], walkable_height: i32) -> Option<Surface> {
    column.iter().enumerate().rev().find_map(|(i, span)| {
        if span.area == AreaType::Null {
            return None;
        }
        let headroom = column.get(i + 1).map_or(i32::MAX, |above| above.min - span.max);
        (headroom >= walkable_height).then_some(Surface {
            top: span.max,
            area: span.area,
        })
    })
}

/// Drop every surface that has an obstacle, a gap or a step higher than
/// `climb` within `radius` cells
fn erode(surfaces: &[Option<Surface>], size: i32, radius: i32, climb: i32) -> Vec<Option<Surface>> {
    let at = |x: i32, z: i32| -> Option<Surface> {
        if x < 0 || z < 0 || x >= size || z >= size {
            return None;
        }
        surfaces[(z * size + x) as usize]
    };

    let mut eroded = surfaces.to_vec();
    for z in 0..size {
        for x in 0..size {
            let Some(surface) = at(x, z) else {
                continue;
            };
            let blocked = (-radius..=radius).any(|dz| {
                (-radius..=radius).any(|dx| match at(x + dx, z + dz) {
                    Some(other) => (other.top - surface.top).abs() > climb,
                    None => true,
                })
            });
            if blocked {
                eroded[(z * size + x) as usize] = None;
            }
        }
    }
    eroded
}

impl TileBuilder for HeightfieldTileBuilder {
    fn region(&self, agent: &AgentBounds, tile_bounds: &Aabb) -> Aabb {
        self.config_for(agent).region(tile_bounds)
    }

    fn build(&self, agent: &AgentBounds, geometry: &TileGeometry) -> Result<Option<TilePayload>> {
        let finite = geometry
            .triangles
            .iter()
            .all(|t| t.vertices.iter().all(|v| v.is_finite()))
            && geometry.water.iter().all(|w| w.level.is_finite())
            && geometry
                .connections
                .iter()
                .all(|c| c.start.is_finite() && c.end.is_finite());
        if !finite {
            return Err(Error::InvalidGeometry(format!(
                "tile {} has non-finite vertices",
                geometry.position
            )));
        }

        let config = self.config_for(agent);
        let region = config.region(&geometry.bounds);
        let field = self.rasterize(&config, geometry, &region);
        let span_count = field.span_count();

        if span_count == 0 && geometry.connections.is_empty() {
            debug!("Tile {} has no geometry", geometry.position);
            return Ok(None);
        }

        let size = config.field_size();
        let surfaces: Vec<Option<Surface>> = (0..size)
            .flat_map(|z| (0..size).map(move |x| (x, z)))
            .map(|(x, z)| walkable_surface(field.column(x, z), config.walkable_height))
            .collect();
        let surfaces = erode(&surfaces, size, config.walkable_radius, config.walkable_climb);

        let core = config.border_size..config.border_size + config.tile_size;
        let mut polygons = Vec::new();
        let mut walkable_cells = 0;
        for z in core.clone() {
            let mut x = core.start;
            while x < core.end {
                let Some(surface) = surfaces[(z * size + x) as usize] else {
                    x += 1;
                    continue;
                };
                let start = x;
                while x < core.end && surfaces[(z * size + x) as usize] == Some(surface) {
                    x += 1;
                }
                walkable_cells += (x - start) as usize;

                let y = surface.top as f32 * config.ch;
                let x0 = region.min.x + start as f32 * config.cs;
                let x1 = region.min.x + x as f32 * config.cs;
                let z0 = region.min.z + z as f32 * config.cs;
                let z1 = z0 + config.cs;
                polygons.push(TilePolygon {
                    vertices: vec![
                        Vec3::new(x0, y, z0),
                        Vec3::new(x0, y, z1),
                        Vec3::new(x1, y, z1),
                        Vec3::new(x1, y, z0),
                    ],
                    area: surface.area,
                });
            }
        }

        debug!(
            "Built tile {} with {} spans, {} polygons and {} connections",
            geometry.position,
            span_count,
            polygons.len(),
            geometry.connections.len()
        );

        Ok(Some(TilePayload {
            position: geometry.position,
            polygons,
            connections: geometry.connections.clone(),
            span_count,
            walkable_cells,
        }))
    }
}
