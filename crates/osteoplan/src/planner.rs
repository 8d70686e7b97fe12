//! The planning session: explicit state plus the command surface.

use crate::export::{
    export_objects, target_path, ExportFlags, ExportReport, FIBULA_GUIDE_FILE,
    MANDIBLE_GUIDE_FILE, POSITIONING_AID_FILE, RECONSTRUCTED_MANDIBLE_FILE,
};
use crate::{PlannerConfig, PlannerError, PlannerResult};
use osteoplan_booleans::BspSolver;
use osteoplan_guides::{
    cutting_planes, fibula, mandible, positioning_aid, CuttingPlaneOptions, FibulaGuideOptions,
    FibulaGuideSet, MandibleGuideSet, PlaneSet, PositioningAidOptions, PositioningAidSet, Side,
};
use osteoplan_mesh::TriMesh;
use osteoplan_rig::{self as rig, RigOptions, RigSet, JOINT_PITCH};
use osteoplan_scene::{Group, ObjectId, Scene, SceneObject};
use osteoplan_update::{LiveUpdate, RefreshOutcome, Ticker};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use tracing::{info, warn};

/// Options the mandible builder derives from the session config.
fn mandible_options(config: &PlannerConfig) -> mandible::MandibleGuideOptions {
    mandible::MandibleGuideOptions {
        bevel_segments: config.bevel_segments,
        bevel_width: config.bevel_width,
    }
}

/// A planning session over one scene.
///
/// All state is explicit: the selected inputs, the typed registries each
/// stage produced, and the live-update engine. No operation relies on an
/// ambient active object or selection.
pub struct Planner {
    /// The scene arena.
    pub scene: Scene,
    solver: BspSolver,
    /// Session configuration.
    pub config: PlannerConfig,
    inputs: Option<(ObjectId, ObjectId)>,
    rig: Option<RigSet>,
    planes: Option<PlaneSet>,
    fibula_guide: Option<FibulaGuideSet>,
    mandible: Option<MandibleGuideSet>,
    positioning_aid: Option<PositioningAidSet>,
    live: LiveUpdate,
    ticker: Option<Ticker>,
}

impl Planner {
    /// Create a session with the given configuration.
    pub fn new(config: PlannerConfig) -> PlannerResult<Self> {
        config.validate()?;
        Ok(Self {
            scene: Scene::new(),
            solver: BspSolver,
            config,
            inputs: None,
            rig: None,
            planes: None,
            fibula_guide: None,
            mandible: None,
            positioning_aid: None,
            live: LiveUpdate::new(),
            ticker: None,
        })
    }

    // =========================================================================
    // Inputs
    // =========================================================================

    /// Load the two patient meshes, returning non-fatal sanity warnings
    /// (orientation and plausible-size checks).
    pub fn load_inputs(
        &mut self,
        fibula: TriMesh,
        mandible: TriMesh,
    ) -> PlannerResult<Vec<String>> {
        for (mesh, label) in [(&fibula, "fibula"), (&mandible, "mandible")] {
            mesh.validate_solid()
                .map_err(|e| PlannerError::InvalidGeometry(format!("{label}: {e}")))?;
        }
        let warnings = input_warnings(&fibula, &mandible);
        for w in &warnings {
            warn!("{w}");
        }
        let fibula = self.scene.add(SceneObject::new("fibula", fibula));
        let mandible = self.scene.add(SceneObject::new("mandible", mandible));
        self.inputs = Some((fibula, mandible));
        Ok(warnings)
    }

    // =========================================================================
    // Build commands
    // =========================================================================

    /// Build the rig from the loaded inputs.
    pub fn initialize_rig(&mut self) -> PlannerResult<()> {
        let (fibula, mandible) = self
            .inputs
            .ok_or_else(|| PlannerError::Precondition("no input meshes loaded".into()))?;
        if self.rig.is_some() {
            return Err(PlannerError::AlreadyInitialized("rig"));
        }
        let options = RigOptions {
            segment_count: self.config.segment_count,
            pitch: JOINT_PITCH,
            auto_decimate: self.config.auto_decimate,
        };
        self.rig = Some(rig::build(
            &mut self.scene,
            &self.solver,
            fibula,
            mandible,
            &options,
        )?);
        Ok(())
    }

    /// Generate the cutting planes from the built rig.
    pub fn generate_cutting_planes(&mut self) -> PlannerResult<()> {
        let rig = self
            .rig
            .as_ref()
            .ok_or_else(|| PlannerError::Precondition("missing rig".into()))?;
        if self.planes.is_some() {
            return Err(PlannerError::AlreadyInitialized("cutting planes"));
        }
        let options = CuttingPlaneOptions {
            thickness: self.config.cutting_plane_thickness,
        };
        self.planes = Some(cutting_planes::generate_cutting_planes(
            &mut self.scene,
            rig,
            &options,
        )?);
        Ok(())
    }

    /// Build the fibula guide shell.
    pub fn create_fibula_guide(&mut self) -> PlannerResult<()> {
        let rig = self
            .rig
            .as_ref()
            .ok_or_else(|| PlannerError::Precondition("missing rig".into()))?;
        let planes = self
            .planes
            .as_ref()
            .ok_or_else(|| PlannerError::Precondition("missing cutting planes".into()))?;
        if self.fibula_guide.is_some() {
            return Err(PlannerError::AlreadyInitialized("fibula guide"));
        }
        let options = FibulaGuideOptions {
            guide_width: self.config.guide_around_width,
            plane_thickness: self.config.cutting_plane_thickness,
            bevel_segments: self.config.bevel_segments,
            bevel_width: self.config.bevel_width,
            perturbation: self.config.perturbation(),
        };
        self.fibula_guide = Some(fibula::build_guide(
            &mut self.scene,
            &self.solver,
            planes,
            rig,
            &options,
        )?);
        Ok(())
    }

    /// Add a screw hole to the fibula guide.
    pub fn create_fibula_screw(&mut self) -> PlannerResult<ObjectId> {
        let set = self
            .fibula_guide
            .as_mut()
            .ok_or_else(|| PlannerError::Precondition("missing fibula guide".into()))?;
        Ok(fibula::add_screw(
            &mut self.scene,
            set,
            self.config.screw_hole_diameter,
        )?)
    }

    /// Build both mandible side guides.
    pub fn create_mandible_guides(&mut self) -> PlannerResult<()> {
        let rig = self
            .rig
            .as_ref()
            .ok_or_else(|| PlannerError::Precondition("missing rig".into()))?;
        let planes = self
            .planes
            .as_ref()
            .ok_or_else(|| PlannerError::Precondition("missing cutting planes".into()))?;
        if self.mandible.is_some() {
            return Err(PlannerError::AlreadyInitialized("mandible guides"));
        }
        self.mandible = Some(mandible::build_guides(
            &mut self.scene,
            planes,
            rig,
            &mandible_options(&self.config),
        )?);
        Ok(())
    }

    /// Add a screw hole to one mandible side guide (and drill it through
    /// the positioning aid if one exists).
    pub fn create_mandible_screw(&mut self, side: Side) -> PlannerResult<ObjectId> {
        let aid = self.positioning_aid.as_ref().map(|a| a.mesh);
        let set = self
            .mandible
            .as_mut()
            .ok_or_else(|| PlannerError::Precondition("missing mandible guides".into()))?;
        Ok(mandible::add_screw(
            &mut self.scene,
            set,
            side,
            self.config.screw_hole_diameter,
            aid,
        )?)
    }

    /// Join the two mandible side guides into one exportable solid.
    pub fn join_mandible_guides(&mut self) -> PlannerResult<ObjectId> {
        let rig = self
            .rig
            .as_ref()
            .ok_or_else(|| PlannerError::Precondition("missing rig".into()))?;
        let set = self
            .mandible
            .as_mut()
            .ok_or_else(|| PlannerError::Precondition("missing mandible guides".into()))?;
        if set.joined.is_some() {
            return Err(PlannerError::AlreadyInitialized("joined mandible guide"));
        }
        let joined = mandible::join(&mut self.scene, set, rig, &mandible_options(&self.config))?;
        set.joined = Some(joined);
        Ok(joined)
    }

    /// Build the positioning aid.
    pub fn create_positioning_aid(&mut self) -> PlannerResult<()> {
        let rig = self
            .rig
            .as_ref()
            .ok_or_else(|| PlannerError::Precondition("missing rig".into()))?;
        let planes = self
            .planes
            .as_ref()
            .ok_or_else(|| PlannerError::Precondition("missing cutting planes".into()))?;
        let guides = self
            .mandible
            .as_ref()
            .ok_or_else(|| PlannerError::Precondition("missing mandible guides".into()))?;
        if self.positioning_aid.is_some() {
            return Err(PlannerError::AlreadyInitialized("positioning aid"));
        }
        let options = PositioningAidOptions {
            size_x: self.config.positioning_aid_size_x,
            size_z: self.config.positioning_aid_size_z,
        };
        self.positioning_aid = Some(positioning_aid::create(
            &mut self.scene,
            planes,
            guides,
            rig,
            &options,
        )?);
        Ok(())
    }

    // =========================================================================
    // Live update
    // =========================================================================

    /// Manually refresh the fibula previews.
    pub fn update_now(&mut self) -> PlannerResult<RefreshOutcome> {
        let rig = self
            .rig
            .as_ref()
            .ok_or_else(|| PlannerError::Precondition("missing rig".into()))?;
        Ok(self.live.refresh(&mut self.scene, &self.solver, rig)?)
    }

    /// Enable or disable the auto-update schedule. Disabling cancels the
    /// ticker, deregistering its wakeup.
    pub fn toggle_auto_update(&mut self, enabled: bool, now: Instant) {
        if enabled {
            self.ticker = Some(Ticker::new(
                Duration::from_secs_f64(self.config.update_rate),
                now,
            ));
            info!(rate = self.config.update_rate, "auto update enabled");
        } else {
            if let Some(ticker) = &mut self.ticker {
                ticker.cancel();
            }
            self.ticker = None;
            info!("auto update disabled");
        }
    }

    /// Whether the auto-update schedule is active.
    pub fn auto_update_enabled(&self) -> bool {
        self.ticker.is_some()
    }

    /// Drive the schedule: refresh when the ticker is due.
    pub fn pump(&mut self, now: Instant) -> PlannerResult<Option<RefreshOutcome>> {
        let due = match &mut self.ticker {
            Some(ticker) => ticker.poll(now),
            None => false,
        };
        if due {
            Ok(Some(self.update_now()?))
        } else {
            Ok(None)
        }
    }

    // =========================================================================
    // Clearing (teardown in reverse construction order)
    // =========================================================================

    /// Remove all fibula guide objects and unhide the fibula planes.
    pub fn clear_fibula_guides(&mut self) -> PlannerResult<()> {
        self.scene.delete_group(Group::FibulaGuides);
        for id in self.scene.ids_in_group(Group::FibulaCuttingPlanes) {
            self.scene.object_mut(id)?.hidden = false;
        }
        self.fibula_guide = None;
        Ok(())
    }

    /// Remove all mandible guide and positioning-aid objects and unhide
    /// the mandible planes.
    pub fn clear_mandible_guides(&mut self) -> PlannerResult<()> {
        self.scene.delete_group(Group::MandibleGuides);
        for id in self.scene.ids_in_group(Group::MandibleCuttingPlanes) {
            self.scene.object_mut(id)?.hidden = false;
        }
        self.mandible = None;
        self.positioning_aid = None;
        Ok(())
    }

    /// Remove the positioning aid objects only.
    pub fn clear_positioning_aid(&mut self) -> PlannerResult<()> {
        if let Some(aid) = self.positioning_aid.take() {
            for id in [aid.start, aid.end, aid.mesh] {
                if self.scene.contains(id) {
                    let _ = self.scene.remove(id);
                }
            }
        }
        Ok(())
    }

    /// Remove the cutting planes and everything depending on them (both
    /// guide sets first, the reverse of construction order).
    pub fn clear_cutting_planes(&mut self) -> PlannerResult<()> {
        self.clear_fibula_guides()?;
        self.clear_mandible_guides()?;
        self.scene.delete_group(Group::FibulaCuttingPlanes);
        self.scene.delete_group(Group::MandibleCuttingPlanes);
        self.planes = None;
        Ok(())
    }

    /// Full teardown back to the loaded inputs.
    pub fn clear_all(&mut self) -> PlannerResult<()> {
        self.clear_cutting_planes()?;
        self.live.reset(&mut self.scene);
        self.toggle_auto_update(false, Instant::now());
        self.scene.delete_group(Group::FibulaWorking);
        self.scene.delete_group(Group::MandibleWorking);
        self.scene.armature = None;
        self.rig = None;
        // The untouched inputs come back out of the original group.
        for id in self.scene.ids_in_group(Group::Original) {
            let obj = self.scene.object_mut(id)?;
            obj.group = Group::Unfiled;
            obj.hidden = false;
        }
        info!("cleared all generated objects");
        Ok(())
    }

    // =========================================================================
    // Export
    // =========================================================================

    /// Export the enabled artifacts into `dir`.
    pub fn export(
        &self,
        dir: &Path,
        flags: &ExportFlags,
        overwrite: bool,
    ) -> PlannerResult<ExportReport> {
        let mut targets: Vec<(ObjectId, PathBuf)> = Vec::new();
        if flags.fibula_guide {
            if let Some(set) = &self.fibula_guide {
                targets.push((set.guide, target_path(dir, FIBULA_GUIDE_FILE)));
            }
        }
        if flags.mandible_guide {
            if let Some(joined) = self.mandible.as_ref().and_then(|m| m.joined) {
                targets.push((joined, target_path(dir, MANDIBLE_GUIDE_FILE)));
            }
        }
        if flags.positioning_aid {
            if let Some(aid) = &self.positioning_aid {
                targets.push((aid.mesh, target_path(dir, POSITIONING_AID_FILE)));
            }
        }
        if flags.reconstructed_mandible {
            if let Some(rig) = &self.rig {
                targets.push((
                    rig.mandible_preview,
                    target_path(dir, RECONSTRUCTED_MANDIBLE_FILE),
                ));
            }
        }
        export_objects(
            &self.scene,
            &self.solver,
            &targets,
            self.config.export_scale_factor,
            overwrite,
        )
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    /// The rig registry, if built.
    pub fn rig(&self) -> Option<&RigSet> {
        self.rig.as_ref()
    }

    /// The cutting-plane registry, if generated.
    pub fn planes(&self) -> Option<&PlaneSet> {
        self.planes.as_ref()
    }

    /// The fibula guide registry, if built.
    pub fn fibula_guide(&self) -> Option<&FibulaGuideSet> {
        self.fibula_guide.as_ref()
    }

    /// The mandible guide registry, if built.
    pub fn mandible_guides(&self) -> Option<&MandibleGuideSet> {
        self.mandible.as_ref()
    }

    /// The positioning aid registry, if built.
    pub fn positioning_aid(&self) -> Option<&PositioningAidSet> {
        self.positioning_aid.as_ref()
    }
}

/// Non-fatal sanity warnings on the input meshes: a fibula oriented off
/// its long axis or dimensions far outside plausible anatomy usually
/// mean a unit-conversion mistake. Warnings only; never errors.
fn input_warnings(fibula: &TriMesh, mandible: &TriMesh) -> Vec<String> {
    let mut warnings = Vec::new();
    if let Some(aabb) = fibula.aabb() {
        let dims = aabb.dimensions();
        if dims.y < dims.x || dims.y < dims.z {
            warnings.push(
                "fibula: longest axis is not Y; the mesh may be oriented incorrectly".into(),
            );
        }
        let longest = dims.x.max(dims.y).max(dims.z);
        if !(25.0..=70.0).contains(&longest) {
            warnings.push(format!(
                "fibula: longest dimension {longest:.1} cm is outside the plausible 25-70 cm range; check the import scale"
            ));
        }
    }
    if let Some(aabb) = mandible.aabb() {
        let dims = aabb.dimensions();
        let sum = dims.x + dims.y + dims.z;
        if !(19.0..=35.0).contains(&sum) {
            warnings.push(format!(
                "mandible: summed dimensions {sum:.1} cm are outside the plausible 19-35 cm range; check the import scale"
            ));
        }
    }
    warnings
}
