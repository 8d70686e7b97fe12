#![warn(missing_docs)]

//! Cutting-plane generation and guide construction.
//!
//! This is the geometric heart of the pipeline: oriented cutting planes
//! are derived from the rig and frozen, then composed with the anatomy
//! meshes through ordered boolean chains into the printable fibula and
//! mandible guide shells, screw holes and the positioning aid.

pub mod composer;
pub mod cutting_planes;
pub mod fibula;
pub mod mandible;
pub mod positioning_aid;

pub use composer::{chain, BooleanStep, Perturbation};
pub use cutting_planes::{generate_cutting_planes, CuttingPlaneOptions, PlaneSet};
pub use fibula::{FibulaGuideOptions, FibulaGuideSet};
pub use mandible::{MandibleGuideOptions, MandibleGuideSet, Side, SideGuide};
pub use positioning_aid::{aid_matrix, PositioningAidOptions, PositioningAidSet};

use osteoplan_scene::SceneError;
use thiserror::Error;

/// Errors from guide construction.
#[derive(Error, Debug)]
pub enum GuideError {
    /// A required object or stage output does not exist yet.
    #[error("precondition not met: {0}")]
    Precondition(String),

    /// An underlying scene operation failed.
    #[error(transparent)]
    Scene(#[from] SceneError),
}

/// Result type for guide construction.
pub type GuideResult<T> = std::result::Result<T, GuideError>;
