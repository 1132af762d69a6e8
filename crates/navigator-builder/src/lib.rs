//! Per tile navmesh building
//!
//! This crate turns the scene data captured for one tile into the payload that
//! gets published into a navmesh.
//!
//! # Features
//!
//! - **Collision shapes**: boxes, triangle meshes, compounds and terrain heightfields
//! - **Tile inputs**: shared shape handles captured at scheduling time
//! - **Heightfield builder**: voxelization, walkability, erosion by agent radius
//! - **Off-mesh connections**: door and pathgrid links carried into the payload
//!
//! # Example
//!
//! ```rust,no_run
//! use navigator_builder::{HeightfieldTileBuilder, TileBuildConfig, TileBuilder, TileInput};
//! use navigator_common::{AgentBounds, TileGrid, TilePosition};
//!
//! # fn example() -> navigator_common::Result<()> {
//! let builder = HeightfieldTileBuilder::new(TileBuildConfig::new(0.25, 0.25, 64))?;
//! let agent = AgentBounds::cylinder(0.9, 0.3);
//! let grid = TileGrid::new(builder.config().tile_world_size());
//!
//! let input = TileInput::new(TilePosition::ZERO, grid.tile_bounds(TilePosition::ZERO));
//! let geometry = input.collect(&builder.region(&agent, &input.bounds));
//! let payload = builder.build(&agent, &geometry)?;
//! assert!(payload.is_none());
//! # Ok(())
//! # }
//! ```

#![cfg_attr(test, allow(unused))]

mod builder;
mod config;
mod geometry;
mod heightfield;
mod shapes;

pub use builder::{HeightfieldTileBuilder, TileBuilder, TilePayload, TilePolygon};
pub use config::TileBuildConfig;
pub use geometry::{
    AreaType, HeightfieldGeometry, ObjectGeometry, OffMeshConnection, TileGeometry, TileInput,
    Triangle, Water,
};
pub use heightfield::{Heightfield, Span};
pub use shapes::{
    BoxShape, CollisionShape, CompoundShape, HeightfieldShape, ShapeType, TriangleMeshShape,
};
