//! Error types for scene-graph operations.

use thiserror::Error;

/// Errors that can occur while manipulating or evaluating the scene.
#[derive(Error, Debug)]
pub enum SceneError {
    /// A referenced object id is no longer in the arena.
    #[error("object not found in scene: {0}")]
    MissingObject(String),

    /// A referenced joint index is out of range.
    #[error("joint index {0} out of range")]
    MissingJoint(usize),

    /// The scene has no armature yet.
    #[error("scene has no armature")]
    MissingArmature,

    /// Modifier or constraint targets form a cycle.
    #[error("dependency cycle through object '{0}'")]
    DependencyCycle(String),

    /// A transform required for re-parenting is singular.
    #[error("transform of '{0}' is not invertible")]
    NotInvertible(String),

    /// A mesh-level operation failed.
    #[error(transparent)]
    Mesh(#[from] osteoplan_mesh::MeshError),

    /// The boolean solver rejected or failed on an operand.
    #[error(transparent)]
    Boolean(#[from] osteoplan_booleans::BooleanError),
}

/// Result type for scene operations.
pub type SceneResult<T> = std::result::Result<T, SceneError>;
