use navigator_builder::TileBuildConfig;
use navigator_common::{AgentBounds, Error, Result, TileGrid};
use serde::{Deserialize, Serialize};

/// Navigator configuration, validated once at construction
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Width and depth of a voxel cell in world units
    pub cell_size: f32,
    /// Height of a voxel cell in world units
    pub cell_height: f32,
    /// Tile edge length in cells
    pub tile_size: i32,
    /// Extra cells gathered around each tile, the agent radius is always included
    pub border_size: i32,
    /// Maximum number of tiles of a navmesh around the player
    pub max_tiles_number: i32,
    /// Maximum number of tiles being built at the same time
    pub max_tiles_per_update: usize,
    /// Number of worker threads building tiles
    pub async_threads: usize,
    /// Steepest walkable slope in degrees
    pub walkable_slope_angle: f32,
    /// Maximum step height in world units
    pub walkable_climb: f32,
    /// Minimum player movement that triggers an update
    pub player_move_threshold: f32,
    /// Tile radius around the player that `RequiredTilesPresent` waits for
    pub wait_until_min_distance_to_player: i32,
    pub enable_write_to_tile_cache: bool,
    /// Directory of the tile cache inside the user data path
    pub tile_cache_dir_name: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            cell_size: 0.25,
            cell_height: 0.25,
            tile_size: 64,
            border_size: 0,
            max_tiles_number: 512,
            max_tiles_per_update: 256,
            async_threads: 1,
            walkable_slope_angle: 45.0,
            walkable_climb: 0.5,
            player_move_threshold: 2.0,
            wait_until_min_distance_to_player: 5,
            enable_write_to_tile_cache: false,
            tile_cache_dir_name: "navmeshdb".to_string(),
        }
    }
}

impl Settings {
    pub fn with_cell_size(mut self, cell_size: f32) -> Self {
        self.cell_size = cell_size;
        self
    }

    pub fn with_cell_height(mut self, cell_height: f32) -> Self {
        self.cell_height = cell_height;
        self
    }

    pub fn with_tile_size(mut self, tile_size: i32) -> Self {
        self.tile_size = tile_size;
        self
    }

    pub fn with_border_size(mut self, border_size: i32) -> Self {
        self.border_size = border_size;
        self
    }

    pub fn with_max_tiles_number(mut self, max_tiles_number: i32) -> Self {
        self.max_tiles_number = max_tiles_number;
        self
    }

    pub fn with_max_tiles_per_update(mut self, max_tiles_per_update: usize) -> Self {
        self.max_tiles_per_update = max_tiles_per_update;
        self
    }

    pub fn with_async_threads(mut self, async_threads: usize) -> Self {
        self.async_threads = async_threads;
        self
    }

    pub fn with_walkable_slope_angle(mut self, walkable_slope_angle: f32) -> Self {
        self.walkable_slope_angle = walkable_slope_angle;
        self
    }

    pub fn with_walkable_climb(mut self, walkable_climb: f32) -> Self {
        self.walkable_climb = walkable_climb;
        self
    }

    pub fn with_player_move_threshold(mut self, player_move_threshold: f32) -> Self {
        self.player_move_threshold = player_move_threshold;
        self
    }

    pub fn with_wait_until_min_distance_to_player(mut self, distance: i32) -> Self {
        self.wait_until_min_distance_to_player = distance;
        self
    }

    pub fn with_tile_cache(mut self, dir_name: impl Into<String>, enable_write: bool) -> Self {
        self.tile_cache_dir_name = dir_name.into();
        self.enable_write_to_tile_cache = enable_write;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.tile_size <= 0 {
            return Err(Error::InvalidSettings("tile size must be positive".to_string()));
        }
        if self.border_size < 0 {
            return Err(Error::InvalidSettings("border size cannot be negative".to_string()));
        }
        if self.max_tiles_number <= 0 {
            return Err(Error::InvalidSettings(
                "max tiles number must be positive".to_string(),
            ));
        }
        if self.max_tiles_per_update == 0 {
            return Err(Error::InvalidSettings(
                "max tiles per update must be positive".to_string(),
            ));
        }
        if self.async_threads == 0 {
            return Err(Error::InvalidSettings(
                "at least one worker thread is required".to_string(),
            ));
        }
        if !(self.walkable_climb >= 0.0) {
            return Err(Error::InvalidSettings("walkable climb cannot be negative".to_string()));
        }
        if !(self.player_move_threshold >= 0.0) {
            return Err(Error::InvalidSettings(
                "player move threshold cannot be negative".to_string(),
            ));
        }
        if self.wait_until_min_distance_to_player < 0 {
            return Err(Error::InvalidSettings(
                "wait distance cannot be negative".to_string(),
            ));
        }
        if self.tile_cache_dir_name.is_empty() {
            return Err(Error::InvalidSettings(
                "tile cache directory name is empty".to_string(),
            ));
        }
        self.build_config().validate()
    }

    /// Builder configuration shared by all agents
    pub fn build_config(&self) -> TileBuildConfig {
        let mut config = TileBuildConfig::new(self.cell_size, self.cell_height, self.tile_size)
            .with_walkable_slope_angle(self.walkable_slope_angle)
            .with_walkable_climb(self.walkable_climb);
        config.border_size = self.border_size;
        config
    }

    pub fn tile_world_size(&self) -> f32 {
        self.cell_size * self.tile_size as f32
    }

    pub fn tile_grid(&self) -> TileGrid {
        TileGrid::new(self.tile_world_size())
    }

    /// Distance geometry affects tiles around it for `agent`; matches the
    /// region the builder gathers for a tile
    pub fn agent_margin(&self, agent: &AgentBounds) -> f32 {
        let config = self.build_config().with_agent(agent);
        config.border_size as f32 * config.cs
    }

    /// Radius in tiles of the square area kept around the player
    pub fn max_navmesh_area_radius(&self) -> i32 {
        let radius = (self.max_tiles_number as f64 / std::f64::consts::PI).sqrt().floor() as i32;
        (radius - 1).max(0)
    }

    pub fn max_navmesh_area_real_radius(&self) -> f32 {
        self.tile_world_size() * self.max_navmesh_area_radius() as f32
    }
}
