//! STL export with overwrite detection.

use crate::{PlannerError, PlannerResult};
use osteoplan_booleans::BooleanSolver;
use osteoplan_math::{Trs, Vec3};
use osteoplan_mesh::stl::write_stl;
use osteoplan_scene::{ObjectId, Scene};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Deterministic export file names.
pub const FIBULA_GUIDE_FILE: &str = "fibula_guide.stl";
/// Joined mandible guide file name.
pub const MANDIBLE_GUIDE_FILE: &str = "mandible_guide.stl";
/// Positioning aid file name.
pub const POSITIONING_AID_FILE: &str = "mandible_positioning_aid.stl";
/// Carved mandible preview file name.
pub const RECONSTRUCTED_MANDIBLE_FILE: &str = "reconstructed_mandible.stl";

/// Which artifacts to export.
#[derive(Debug, Clone, Copy)]
pub struct ExportFlags {
    /// Export the fibula guide shell.
    pub fibula_guide: bool,
    /// Export the joined mandible guide.
    pub mandible_guide: bool,
    /// Export the positioning aid.
    pub positioning_aid: bool,
    /// Export the carved mandible preview.
    pub reconstructed_mandible: bool,
}

impl Default for ExportFlags {
    fn default() -> Self {
        Self {
            fibula_guide: true,
            mandible_guide: true,
            positioning_aid: true,
            reconstructed_mandible: true,
        }
    }
}

/// Files written by a successful export.
#[derive(Debug, Clone, Default)]
pub struct ExportReport {
    /// Paths written, in export order.
    pub written: Vec<PathBuf>,
}

/// Evaluate and write the given objects.
///
/// Every target path is checked for existence before anything is
/// written; with `overwrite` unconfirmed, conflicts abort the whole
/// export so the caller can warn the user first.
pub fn export_objects(
    scene: &Scene,
    solver: &dyn BooleanSolver,
    targets: &[(ObjectId, PathBuf)],
    scale_factor: f64,
    overwrite: bool,
) -> PlannerResult<ExportReport> {
    if targets.is_empty() {
        warn!("nothing to export; no guide objects exist yet");
        return Ok(ExportReport::default());
    }

    // Existence check strictly precedes any write.
    let conflicts: Vec<PathBuf> = targets
        .iter()
        .map(|(_, path)| path.clone())
        .filter(|path| path.exists())
        .collect();
    if !overwrite && !conflicts.is_empty() {
        return Err(PlannerError::ExportConflict(conflicts));
    }

    let scale = Trs::from_scale(Vec3::new(scale_factor, scale_factor, scale_factor)).to_matrix();

    let mut report = ExportReport::default();
    for (id, path) in targets {
        let mut mesh = scene.evaluated_world_mesh(*id, solver)?;
        mesh.transform(&scale);
        write_stl(&mesh, path)?;
        info!(path = %path.display(), "exported guide");
        report.written.push(path.clone());
    }
    Ok(report)
}

/// Join a file name onto the target directory.
pub fn target_path(dir: &Path, file: &str) -> PathBuf {
    dir.join(file)
}
