#![warn(missing_docs)]

//! osteoplan: procedural cutting/drilling guide generation for fibula
//! free flap mandible reconstruction.
//!
//! A planning session takes two patient meshes (mandible and fibula),
//! builds a posable rig that partitions the fibula into graft segments,
//! derives frozen cutting planes from the rig, and composes printable
//! guide shells, screw holes and a positioning aid through ordered
//! boolean chains. Everything is exported as STL.
//!
//! # Example
//!
//! ```rust,no_run
//! use osteoplan::{ExportFlags, Planner, PlannerConfig};
//! use osteoplan_mesh::stl::read_stl;
//! use std::path::Path;
//!
//! let mut planner = Planner::new(PlannerConfig::default()).unwrap();
//! let fibula = read_stl(Path::new("fibula.stl")).unwrap();
//! let mandible = read_stl(Path::new("mandible.stl")).unwrap();
//! planner.load_inputs(fibula, mandible).unwrap();
//!
//! planner.initialize_rig().unwrap();
//! planner.generate_cutting_planes().unwrap();
//! planner.create_fibula_guide().unwrap();
//! planner
//!     .export(Path::new("out"), &ExportFlags::default(), false)
//!     .unwrap();
//! ```

mod commands;
mod config;
mod error;
mod export;
mod planner;

pub use commands::Command;
pub use config::PlannerConfig;
pub use error::{PlannerError, PlannerResult};
pub use export::{
    ExportFlags, ExportReport, FIBULA_GUIDE_FILE, MANDIBLE_GUIDE_FILE, POSITIONING_AID_FILE,
    RECONSTRUCTED_MANDIBLE_FILE,
};
pub use planner::Planner;

pub use osteoplan_guides::Side;
pub use osteoplan_update::RefreshOutcome;
