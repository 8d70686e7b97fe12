//! Error types for mesh operations.

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur during mesh operations and file I/O.
#[derive(Error, Debug)]
pub enum MeshError {
    /// Mesh has no triangles.
    #[error("mesh is empty")]
    EmptyMesh,

    /// Mesh is not a closed manifold solid.
    #[error("mesh is not a closed manifold: {0}")]
    NonManifold(String),

    /// Decimation ratio outside (0, 1].
    #[error("decimate ratio {0} is outside (0, 1]")]
    InvalidRatio(f64),

    /// Failed to read a mesh file.
    #[error("failed to read {path}: {source}")]
    IoRead {
        /// File that failed to read.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// Failed to write a mesh file.
    #[error("failed to write {path}: {source}")]
    IoWrite {
        /// File that failed to write.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },
}

/// Result type for mesh operations.
pub type MeshResult<T> = std::result::Result<T, MeshError>;
