//! Incremental navmesh management
//!
//! Keeps one navmesh per agent class up to date with a changing scene. Scene
//! mutations mark tiles dirty, [`Navigator::update`] hands the dirty tiles
//! closest to the player to a pool of worker threads, and finished tiles are
//! published into lock-free snapshots that readers can hold on to while new
//! tiles are being built.
//!
//! # Features
//!
//! - **Scene registry**: objects, doors, water, terrain and pathgrids
//! - **Dirty tile tracking**: per agent class, inflated by the agent radius
//! - **Background builds**: coalesced jobs, closest to the player first
//! - **Published snapshots**: per tile revisions that never go backwards
//! - **Tile cache**: optional on-disk cache of built tiles
//!
//! # Example
//!
//! ```rust,no_run
//! use glam::{Affine3A, Vec3};
//! use navigator::{make_navigator, NoopListener, ObjectId, ObjectShapes, Settings, WaitCondition};
//! use navigator_builder::BoxShape;
//! use navigator_common::AgentBounds;
//! use std::sync::Arc;
//!
//! # fn example() -> navigator_common::Result<()> {
//! let mut navigator = make_navigator(Settings::default(), None)?;
//! let agent = AgentBounds::cylinder(0.9, 0.3);
//! navigator.add_agent(agent);
//!
//! let floor = ObjectShapes::new(Arc::new(BoxShape::new(Vec3::new(8.0, 0.5, 8.0))));
//! navigator.add_object(ObjectId(1), &floor, &Affine3A::IDENTITY);
//!
//! navigator.update(Vec3::ZERO);
//! navigator.wait(&mut NoopListener, WaitCondition::AllJobsDone);
//!
//! let mesh = navigator.get_nav_mesh(&agent).expect("agent was added");
//! println!("{} tiles", mesh.load().len());
//! # Ok(())
//! # }
//! ```

#![cfg_attr(test, allow(unused))]

mod cache;
mod listener;
mod navigator;
mod objects;
mod registry;
mod scheduler;
mod settings;
mod stats;
mod tracker;

pub use cache::{NavMeshCacheItem, NavMeshSnapshot, PublishedTile, SharedNavMesh, TileUpdate};
pub use listener::{Listener, NoopListener};
pub use navigator::{make_navigator, make_navigator_stub, Navigator, NavigatorImpl, NavigatorStub};
pub use objects::{
    CellPosition, DoorShapes, ObjectId, ObjectKind, ObjectShapes, ObjectTransform, Pathgrid,
    SceneObject, GLOBAL_CELL_SIZE,
};
pub use registry::{AgentEntry, HeightfieldEntry, SceneChange, SceneRegistry, WaterEntry};
pub use scheduler::{AsyncJobScheduler, TileJob, TileKey, WaitCondition};
pub use settings::Settings;
pub use stats::{NavigatorStats, SchedulerStats, StatsMap, StatsSink};
pub use tracker::TileTracker;
