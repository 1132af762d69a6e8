//! On-disk cache of built navmesh tiles
//!
//! Building a tile is by far the most expensive step of a navmesh update.
//! [`TileCacheDb`] keeps already built payloads keyed by the content of the
//! tile input and the agent bounds, so unchanged tiles of a previously visited
//! area are loaded instead of rebuilt.

mod compressor;
mod db;

pub use compressor::{Lz4Compressor, NoCompression, TileCompressor, MAX_RECORD_BODY_SIZE};
pub use db::{TileCacheDb, TileCacheKey, TILE_CACHE_MAGIC, TILE_CACHE_VERSION};
