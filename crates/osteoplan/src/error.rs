//! Session-level error taxonomy.
//!
//! Every failure is fatal to the current command but never to the
//! session: whatever mutations already committed stay in the scene (no
//! rollback), and the matching clear command resets the stage before a
//! retry.

use osteoplan_guides::GuideError;
use osteoplan_mesh::MeshError;
use osteoplan_rig::RigError;
use osteoplan_scene::SceneError;
use std::path::PathBuf;
use thiserror::Error;

/// Errors surfaced by planner commands.
#[derive(Error, Debug)]
pub enum PlannerError {
    /// A required object or prior stage output does not exist yet.
    #[error("precondition not met: {0}")]
    Precondition(String),

    /// An input mesh is empty or not a closed manifold.
    #[error("invalid geometry: {0}")]
    InvalidGeometry(String),

    /// A build stage was requested twice without teardown.
    #[error("{0} is already initialized; clear it first")]
    AlreadyInitialized(&'static str),

    /// The boolean solver failed on degenerate operands.
    #[error("boolean solver failure: {0}")]
    ExternalToolFailure(String),

    /// A configuration value is out of range or unparsable.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// Export target files already exist and overwrite was not
    /// confirmed. Reported before anything is written.
    #[error("export would overwrite {} existing file(s)", .0.len())]
    ExportConflict(Vec<PathBuf>),

    /// File I/O failed.
    #[error("io error on {path}: {source}")]
    Io {
        /// The file involved.
        path: PathBuf,
        /// Underlying error.
        source: std::io::Error,
    },
}

/// Result type for planner commands.
pub type PlannerResult<T> = std::result::Result<T, PlannerError>;

impl From<SceneError> for PlannerError {
    fn from(e: SceneError) -> Self {
        match e {
            SceneError::Boolean(inner) => PlannerError::ExternalToolFailure(inner.to_string()),
            SceneError::Mesh(inner) => PlannerError::InvalidGeometry(inner.to_string()),
            other => PlannerError::Precondition(other.to_string()),
        }
    }
}

impl From<GuideError> for PlannerError {
    fn from(e: GuideError) -> Self {
        match e {
            GuideError::Precondition(msg) => PlannerError::Precondition(msg),
            GuideError::Scene(inner) => inner.into(),
        }
    }
}

impl From<RigError> for PlannerError {
    fn from(e: RigError) -> Self {
        match e {
            RigError::AlreadyBuilt => PlannerError::AlreadyInitialized("rig"),
            RigError::InvalidSegmentCount(n) => {
                PlannerError::InvalidConfig(format!("segment count {n} must be >= 1"))
            }
            RigError::Scene(inner) => inner.into(),
        }
    }
}

impl From<MeshError> for PlannerError {
    fn from(e: MeshError) -> Self {
        match e {
            MeshError::IoRead { path, source } | MeshError::IoWrite { path, source } => {
                PlannerError::Io { path, source }
            }
            other => PlannerError::InvalidGeometry(other.to_string()),
        }
    }
}
