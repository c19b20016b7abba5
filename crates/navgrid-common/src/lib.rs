//! Common utilities and data structures shared by the navgrid bake and query crates

mod aabb;
mod geometry;

pub use aabb::Aabb2;
pub use geometry::*;

/// Represents a 2D position on the navigation plane
pub type Vec2 = glam::Vec2;

/// Error types for the library
#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("rasterization failed: {0}")]
    Rasterization(String),

    #[error("contour tracing failed: {0}")]
    Contour(String),

    #[error("triangulation failed: {0}")]
    Triangulation(String),

    #[error("serialization failed: {0}")]
    Serialization(String),

    #[cfg(feature = "std")]
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for navgrid operations
pub type Result<T> = std::result::Result<T, Error>;
