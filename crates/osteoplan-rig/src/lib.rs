#![warn(missing_docs)]

//! Rig construction and posing for the osteoplan pipeline.
//!
//! Building the rig turns the two patient meshes into the full working
//! setup: the joint chain, partition cells carving the fibula into
//! segments, carve cells subtracting segment spans from the mandible
//! preview, vector empties the segments hang off, and the segments
//! themselves. Joint count is fixed once built; changing the segment
//! count means clearing everything and rebuilding.

mod builder;
pub mod palette;

pub use builder::{build, RigOptions, RigSet, JOINT_PITCH};

use osteoplan_scene::SceneError;
use thiserror::Error;

/// Errors from rig construction and posing.
#[derive(Error, Debug)]
pub enum RigError {
    /// The rig was already built and not torn down.
    #[error("rig is already built; clear it before rebuilding")]
    AlreadyBuilt,

    /// Segment count must be at least one.
    #[error("segment count must be >= 1, got {0}")]
    InvalidSegmentCount(usize),

    /// An underlying scene operation failed.
    #[error(transparent)]
    Scene(#[from] SceneError),
}

/// Result type for rig operations.
pub type RigResult<T> = std::result::Result<T, RigError>;
