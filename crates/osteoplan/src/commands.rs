//! The abstract command surface.
//!
//! Hosts map their operator/button layer onto these commands.
//! Destructive commands report a confirmation-required flag instead of
//! blocking on a dialog; the core never prompts.

use crate::export::ExportFlags;
use crate::{Planner, PlannerResult};
use osteoplan_guides::Side;
use std::path::PathBuf;
use std::time::Instant;

/// Every operation the planner exposes.
#[derive(Debug, Clone)]
pub enum Command {
    /// Build the rig from the loaded inputs.
    InitializeRig,
    /// Generate cutting planes from the rig.
    GenerateCuttingPlanes,
    /// Build the fibula guide shell.
    CreateFibulaGuide,
    /// Add a screw hole to the fibula guide.
    CreateFibulaScrew,
    /// Build both mandible side guides.
    CreateMandibleGuides,
    /// Add a screw hole to the start-side mandible guide.
    CreateMandibleStartScrew,
    /// Add a screw hole to the end-side mandible guide.
    CreateMandibleEndScrew,
    /// Join the side guides into one exportable solid.
    JoinMandibleGuides,
    /// Build the positioning aid.
    CreatePositioningAid,
    /// Manually refresh the fibula previews.
    UpdateNow,
    /// Enable or disable the auto-update schedule.
    ToggleAutoUpdate {
        /// Desired schedule state.
        enabled: bool,
    },
    /// Remove all fibula guide objects.
    ClearFibulaGuides,
    /// Remove all mandible guide and positioning-aid objects.
    ClearMandibleGuides,
    /// Remove the positioning aid only.
    ClearPositioningAid,
    /// Remove cutting planes and everything depending on them.
    ClearCuttingPlanes,
    /// Full teardown back to the loaded inputs.
    ClearAll,
    /// Export the enabled artifacts.
    Export {
        /// Target directory.
        dir: PathBuf,
        /// Which artifacts to write.
        flags: ExportFlags,
        /// Overwrite confirmed by the user.
        overwrite: bool,
    },
}

impl Command {
    /// Whether a host should ask the user before applying this command.
    /// Covers the destructive clears and the (file-overwriting) export.
    pub fn requires_confirmation(&self) -> bool {
        matches!(
            self,
            Command::ClearFibulaGuides
                | Command::ClearMandibleGuides
                | Command::ClearPositioningAid
                | Command::ClearCuttingPlanes
                | Command::ClearAll
                | Command::Export { .. }
        )
    }

    /// Apply the command to a planning session.
    pub fn apply(&self, planner: &mut Planner) -> PlannerResult<()> {
        match self {
            Command::InitializeRig => planner.initialize_rig(),
            Command::GenerateCuttingPlanes => planner.generate_cutting_planes(),
            Command::CreateFibulaGuide => planner.create_fibula_guide(),
            Command::CreateFibulaScrew => planner.create_fibula_screw().map(|_| ()),
            Command::CreateMandibleGuides => planner.create_mandible_guides(),
            Command::CreateMandibleStartScrew => {
                planner.create_mandible_screw(Side::Start).map(|_| ())
            }
            Command::CreateMandibleEndScrew => {
                planner.create_mandible_screw(Side::End).map(|_| ())
            }
            Command::JoinMandibleGuides => planner.join_mandible_guides().map(|_| ()),
            Command::CreatePositioningAid => planner.create_positioning_aid(),
            Command::UpdateNow => planner.update_now().map(|_| ()),
            Command::ToggleAutoUpdate { enabled } => {
                planner.toggle_auto_update(*enabled, Instant::now());
                Ok(())
            }
            Command::ClearFibulaGuides => planner.clear_fibula_guides(),
            Command::ClearMandibleGuides => planner.clear_mandible_guides(),
            Command::ClearPositioningAid => planner.clear_positioning_aid(),
            Command::ClearCuttingPlanes => planner.clear_cutting_planes(),
            Command::ClearAll => planner.clear_all(),
            Command::Export {
                dir,
                flags,
                overwrite,
            } => planner.export(dir, flags, *overwrite).map(|_| ()),
        }
    }
}
