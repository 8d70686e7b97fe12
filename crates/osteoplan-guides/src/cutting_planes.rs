//! Cutting-plane generation.
//!
//! For every rig joint a start/end plane pair is duplicated from the
//! templates, thickness-scaled, bound to the joint, then immediately
//! frozen: the visual (posed) transform is baked and the binding
//! cleared. The fibula-side planes are afterwards transported into the
//! neutral fibula frame through each segment's keep-transform dance, and
//! two planes are promoted to the mandible pair.

use crate::{GuideError, GuideResult};
use osteoplan_math::{Quat, Vec3};
use osteoplan_mesh::primitives;
use osteoplan_rig::RigSet;
use osteoplan_scene::{
    BakeChannels, Constraint, ConstraintTarget, Group, ObjectId, Scene, SceneObject,
};
use tracing::info;

/// Options for cutting-plane generation.
#[derive(Debug, Clone, Copy)]
pub struct CuttingPlaneOptions {
    /// Blade thickness in millimeters; scales the 1 mm-thick template.
    pub thickness: f64,
}

/// Typed registry of generated cutting planes.
///
/// `fibula_start[i]` / `fibula_end[i]` bound segment `i` (joints `i` and
/// `i+1`); the promoted pair bounds the resected span on the mandible.
#[derive(Debug, Clone)]
pub struct PlaneSet {
    /// Start plane per fibula segment.
    pub fibula_start: Vec<ObjectId>,
    /// End plane per fibula segment.
    pub fibula_end: Vec<ObjectId>,
    /// Promoted start plane (from the last joint).
    pub mandible_start: ObjectId,
    /// Promoted end plane (from joint 0).
    pub mandible_end: ObjectId,
}

impl PlaneSet {
    /// All fibula-side planes in deterministic order: segment by
    /// segment, start before end. Boolean operand perturbation indices
    /// follow this order.
    pub fn fibula_planes(&self) -> Vec<ObjectId> {
        self.fibula_start
            .iter()
            .zip(&self.fibula_end)
            .flat_map(|(&s, &e)| [s, e])
            .collect()
    }

    /// Total number of planes including the mandible pair.
    pub fn len(&self) -> usize {
        self.fibula_start.len() + self.fibula_end.len() + 2
    }

    /// Whether the set holds no fibula planes.
    pub fn is_empty(&self) -> bool {
        self.fibula_start.is_empty()
    }
}

/// Generate one start/end plane pair per joint and file them.
///
/// Requires a built rig; fails with a precondition error otherwise.
pub fn generate_cutting_planes(
    scene: &mut Scene,
    rig: &RigSet,
    options: &CuttingPlaneOptions,
) -> GuideResult<PlaneSet> {
    let joint_count = match &scene.armature {
        Some(armature) => armature.joint_count(),
        None => return Err(GuideError::Precondition("missing rig".into())),
    };
    let segment_count = joint_count - 1;

    // Per joint: duplicate templates, scale to blade thickness, bind to
    // the joint, then freeze the posed transform.
    let mut starts = Vec::with_capacity(joint_count);
    let mut ends = Vec::with_capacity(joint_count);
    for joint in 0..joint_count {
        starts.push(spawn_plane(
            scene,
            primitives::cutting_plane_start(),
            joint,
            options.thickness,
        )?);
        ends.push(spawn_plane(
            scene,
            primitives::cutting_plane_end(),
            joint,
            options.thickness,
        )?);
    }
    for &plane in starts.iter().chain(ends.iter()) {
        scene.bake_visual_transform(plane)?;
        scene.clear_constraints(plane)?;
    }

    // Partition by role. The end plane of joint 0 and the start plane
    // of the last joint are promoted to the mandible side.
    let mandible_end = ends[0];
    let mandible_start = starts[joint_count - 1];
    let fibula_start: Vec<ObjectId> = starts[..segment_count].to_vec();
    let fibula_end: Vec<ObjectId> = ends[1..].to_vec();

    let set = PlaneSet {
        fibula_start,
        fibula_end,
        mandible_start,
        mandible_end,
    };

    transport_to_neutral_frame(scene, rig, &set)?;
    file_and_name(scene, &set)?;

    info!(
        planes = set.len(),
        segments = segment_count,
        "cutting planes generated"
    );
    Ok(set)
}

fn spawn_plane(
    scene: &mut Scene,
    template: osteoplan_mesh::TriMesh,
    joint: usize,
    thickness: f64,
) -> GuideResult<ObjectId> {
    let id = scene.add(SceneObject::new("cutting_plane", template));
    {
        let obj = scene.object_mut(id)?;
        obj.transform.scale = Vec3::new(1.0, thickness, 1.0);
    }
    scene.bake_transform(id, BakeChannels::SCALE)?;
    scene.object_mut(id)?.constraints.push(Constraint::ChildOf {
        target: ConstraintTarget::Joint(joint),
    });
    Ok(id)
}

/// The keep-transform dance that expresses each segment's cutting
/// planes in the neutral fibula frame: duplicate the segment, parent its
/// two planes into the duplicate, reset the duplicate's cleared pose to
/// the origin (carrying the planes with it), then unparent keep-
/// transform and delete the duplicate. At rest pose this is a no-op; for
/// a posed rig it pulls the planes back onto the unposed fibula.
fn transport_to_neutral_frame(
    scene: &mut Scene,
    rig: &RigSet,
    set: &PlaneSet,
) -> GuideResult<()> {
    for (i, (&start, &end)) in set.fibula_start.iter().zip(&set.fibula_end).enumerate() {
        let segment = *rig
            .segments
            .get(i)
            .ok_or_else(|| GuideError::Precondition(format!("missing fibula segment {i}")))?;
        let carrier = scene.duplicate(segment)?;

        scene.parent_keep_world(start, carrier)?;
        scene.parent_keep_world(end, carrier)?;

        scene.clear_constraints(carrier)?;
        {
            let obj = scene.object_mut(carrier)?;
            obj.transform.translation = Vec3::zeros();
            obj.transform.rotation = Quat::identity();
        }

        scene.clear_parent_keep_world(start)?;
        scene.clear_parent_keep_world(end)?;
        scene.remove(carrier)?;
    }
    Ok(())
}

fn file_and_name(scene: &mut Scene, set: &PlaneSet) -> GuideResult<()> {
    for (i, &id) in set.fibula_start.iter().enumerate() {
        let obj = scene.object_mut(id)?;
        obj.name = format!("cutting_plane_fibula_start.{i}");
        obj.group = Group::FibulaCuttingPlanes;
    }
    for (i, &id) in set.fibula_end.iter().enumerate() {
        let obj = scene.object_mut(id)?;
        obj.name = format!("cutting_plane_fibula_end.{i}");
        obj.group = Group::FibulaCuttingPlanes;
    }
    let obj = scene.object_mut(set.mandible_start)?;
    obj.name = "cutting_plane_mandible_start".into();
    obj.group = Group::MandibleCuttingPlanes;
    let obj = scene.object_mut(set.mandible_end)?;
    obj.name = "cutting_plane_mandible_end".into();
    obj.group = Group::MandibleCuttingPlanes;
    Ok(())
}
