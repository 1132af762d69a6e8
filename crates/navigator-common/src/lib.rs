//! Common utilities and data structures shared by the navigator crates

mod agent;
mod geometry;
mod tiles;

pub use agent::*;
pub use geometry::*;
pub use tiles::*;

/// Error types for the navigator crates
#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("invalid settings: {0}")]
    InvalidSettings(String),

    #[error("invalid geometry: {0}")]
    InvalidGeometry(String),

    #[error("tile build failed: {0}")]
    TileBuild(String),

    #[error("tile cache error: {0}")]
    TileCache(String),

    #[error("serialization error: {0}")]
    Serialization(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for navigator operations
pub type Result<T> = std::result::Result<T, Error>;
