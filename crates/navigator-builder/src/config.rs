//! Configuration for building a single tile

use navigator_common::{AgentBounds, Aabb, Error, Result};
use serde::{Deserialize, Serialize};

/// Voxelization parameters of one tile for one agent class.
///
/// Agent dimensions are quantized to whole cells.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TileBuildConfig {
    /// The width/depth resolution of the field (cell size)
    pub cs: f32,
    /// The height resolution of the field (cell height)
    pub ch: f32,
    /// Tile edge length in cells
    pub tile_size: i32,
    /// The maximum slope in degrees that is considered walkable
    pub walkable_slope_angle: f32,
    /// Minimum floor to ceiling height in cells
    pub walkable_height: i32,
    /// The maximum height between walkable layers in cells
    pub walkable_climb: i32,
    /// The distance to erode the walkable area from obstacles, in cells
    pub walkable_radius: i32,
    /// Cells gathered around the tile, at least `walkable_radius`
    pub border_size: i32,
}

impl TileBuildConfig {
    pub fn new(cs: f32, ch: f32, tile_size: i32) -> Self {
        Self {
            cs,
            ch,
            tile_size,
            walkable_slope_angle: 45.0,
            walkable_height: 1,
            walkable_climb: 0,
            walkable_radius: 0,
            border_size: 0,
        }
    }

    pub fn with_walkable_slope_angle(mut self, walkable_slope_angle: f32) -> Self {
        self.walkable_slope_angle = walkable_slope_angle;
        self
    }

    /// Maximum climb in world units
    pub fn with_walkable_climb(mut self, climb: f32) -> Self {
        self.walkable_climb = (climb / self.ch).floor() as i32;
        self
    }

    /// Derive walkable height, radius and border from an agent
    pub fn with_agent(mut self, agent: &AgentBounds) -> Self {
        self.walkable_height = ((agent.height() / self.ch).ceil() as i32).max(1);
        self.walkable_radius = (agent.effective_radius() / self.cs).ceil() as i32;
        self.border_size = self.border_size.max(self.walkable_radius);
        self
    }

    pub fn tile_world_size(&self) -> f32 {
        self.cs * self.tile_size as f32
    }

    /// Cells along one edge of the voxel field, border included
    pub fn field_size(&self) -> i32 {
        self.tile_size + self.border_size * 2
    }

    /// Region gathered for a tile with the given bounds
    pub fn region(&self, tile_bounds: &Aabb) -> Aabb {
        tile_bounds.inflate_xz(self.border_size as f32 * self.cs)
    }

    pub fn validate(&self) -> Result<()> {
        if !(self.cs > 0.0) {
            return Err(Error::InvalidSettings("cell size must be positive".to_string()));
        }
        if !(self.ch > 0.0) {
            return Err(Error::InvalidSettings("cell height must be positive".to_string()));
        }
        if self.tile_size <= 0 {
            return Err(Error::InvalidSettings("tile size must be positive".to_string()));
        }
        if self.walkable_radius < 0 || self.border_size < 0 {
            return Err(Error::InvalidSettings("walkable radius cannot be negative".to_string()));
        }
        if !(0.0..90.0).contains(&self.walkable_slope_angle) {
            return Err(Error::InvalidSettings(
                "walkable slope angle must be within [0, 90)".to_string(),
            ));
        }
        Ok(())
    }
}
