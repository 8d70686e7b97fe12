//! Fibula guide construction.
//!
//! The guide shell is carved from a stretched template: a "union" solid
//! (widened plane duplicates) grows the body around every blade path, a
//! "difference" solid (raw-thickness duplicates) carves the actual
//! slots, limit volumes clip both to the guide footprint, and finally
//! the fibula itself is subtracted so the shell seats on the bone.

use crate::composer::{chain, BooleanStep, Perturbation};
use crate::{GuideError, GuideResult, PlaneSet};
use osteoplan_booleans::{BooleanOp, BooleanSolver};
use osteoplan_math::{Quat, Vec3};
use osteoplan_mesh::primitives;
use osteoplan_rig::{palette, RigSet};
use osteoplan_scene::{
    BakeChannels, Constraint, Group, Modifier, ObjectId, Scene, SceneObject,
};
use tracing::info;

/// Options for fibula guide construction.
#[derive(Debug, Clone, Copy)]
pub struct FibulaGuideOptions {
    /// Width of guide material around the blade path (mm).
    pub guide_width: f64,
    /// Blade thickness (mm); together with `guide_width` this sets the
    /// widening ratio of the union solid.
    pub plane_thickness: f64,
    /// Bevel smoothing passes.
    pub bevel_segments: u32,
    /// Bevel round-over distance.
    pub bevel_width: f64,
    /// Anti-coplanar operand perturbation.
    pub perturbation: Perturbation,
}

/// Typed registry of the fibula guide build.
#[derive(Debug, Clone)]
pub struct FibulaGuideSet {
    /// The printable guide shell.
    pub guide: ObjectId,
    /// Widened union solid (hidden scaffold).
    pub union_solid: ObjectId,
    /// Slot-carving difference solid (hidden scaffold).
    pub difference_solid: ObjectId,
    /// Clip volume for the union solid.
    pub union_limit: ObjectId,
    /// Clip volume for the difference solid.
    pub difference_limit: ObjectId,
    /// Screw-hole cylinders added so far.
    pub screws: Vec<ObjectId>,
}

/// Build the fibula guide from the generated cutting planes.
///
/// Steps run in a fixed order; on failure, whatever earlier steps
/// committed stays in the scene (no rollback) and the matching clear
/// command resets it.
pub fn build_guide(
    scene: &mut Scene,
    solver: &dyn BooleanSolver,
    planes: &PlaneSet,
    rig: &RigSet,
    options: &FibulaGuideOptions,
) -> GuideResult<FibulaGuideSet> {
    if planes.is_empty() {
        return Err(GuideError::Precondition(
            "no fibula cutting planes generated".into(),
        ));
    }

    let mut guide = SceneObject::new("fibula_guide", primitives::guide_template());
    guide.group = Group::FibulaGuides;
    guide.color = Some(palette::GUIDE);
    let guide = scene.add(guide);

    let union_solid = build_union_solid(scene, solver, planes, options)?;
    let difference_solid = build_difference_solid(scene, solver, planes, options)?;
    let union_limit = build_limit(
        scene,
        guide,
        "fibula_guide_union_limit",
        Vec3::new(1.0, 1.0, 3.0),
        Vec3::new(0.9, 0.0, 0.0),
    )?;
    let difference_limit = build_limit(
        scene,
        guide,
        "fibula_guide_difference_limit",
        Vec3::new(3.0, 1.0, 2.0),
        Vec3::new(-0.1, 0.0, 0.0),
    )?;

    setup_guide_modifiers(
        scene,
        guide,
        union_solid,
        difference_solid,
        union_limit,
        difference_limit,
        rig.fibula_source,
        options,
    )?;

    scene.object_mut(union_solid)?.hidden = true;
    scene.object_mut(difference_solid)?.hidden = true;
    for id in scene.ids_in_group(Group::FibulaCuttingPlanes) {
        scene.object_mut(id)?.hidden = true;
    }

    info!("fibula guide built");
    Ok(FibulaGuideSet {
        guide,
        union_solid,
        difference_solid,
        union_limit,
        difference_limit,
        screws: Vec::new(),
    })
}

/// Fold widened duplicates of every fibula plane into one solid. The
/// duplicates are re-origined to their geometry first so the widening
/// scales about the blade path, and each carries its index's
/// perturbation factor on the in-plane axes.
fn build_union_solid(
    scene: &mut Scene,
    solver: &dyn BooleanSolver,
    planes: &PlaneSet,
    options: &FibulaGuideOptions,
) -> GuideResult<ObjectId> {
    let widen = options.guide_width / options.plane_thickness;
    let duplicates = duplicate_planes(scene, planes, options.perturbation, widen, true)?;
    fold_duplicates(scene, solver, duplicates, "fibula_guide_union")
}

/// Same fold at raw blade thickness: this solid carves the slots.
fn build_difference_solid(
    scene: &mut Scene,
    solver: &dyn BooleanSolver,
    planes: &PlaneSet,
    options: &FibulaGuideOptions,
) -> GuideResult<ObjectId> {
    let duplicates = duplicate_planes(scene, planes, options.perturbation, 1.0, false)?;
    fold_duplicates(scene, solver, duplicates, "fibula_guide_difference")
}

fn duplicate_planes(
    scene: &mut Scene,
    planes: &PlaneSet,
    perturbation: Perturbation,
    width_scale: f64,
    recenter_origin: bool,
) -> GuideResult<Vec<ObjectId>> {
    let mut duplicates = Vec::new();
    for (index, plane) in planes.fibula_planes().into_iter().enumerate() {
        let dup = scene.duplicate(plane)?;
        if recenter_origin {
            scene.set_origin_to_geometry_median(dup)?;
        }
        let f = perturbation.factor(index);
        let obj = scene.object_mut(dup)?;
        obj.transform.scale = Vec3::new(f, width_scale, f);
        obj.hidden = false;
        duplicates.push(dup);
    }
    Ok(duplicates)
}

/// Union all duplicates into the first one (baking each step, since
/// every following step consumes the result), then delete the spent
/// operands.
fn fold_duplicates(
    scene: &mut Scene,
    solver: &dyn BooleanSolver,
    duplicates: Vec<ObjectId>,
    name: &str,
) -> GuideResult<ObjectId> {
    let base = duplicates[0];
    let steps: Vec<BooleanStep> = duplicates[1..]
        .iter()
        .map(|&operand| BooleanStep {
            op: BooleanOp::Union,
            operand,
        })
        .collect();
    chain(scene, solver, base, &steps, true)?;
    for &spent in &duplicates[1..] {
        scene.remove(spent)?;
    }
    let obj = scene.object_mut(base)?;
    obj.name = name.into();
    obj.group = Group::FibulaGuides;
    Ok(base)
}

/// Duplicate the guide template into a wireframe clip volume parented
/// (keep transform) to the guide.
fn build_limit(
    scene: &mut Scene,
    guide: ObjectId,
    name: &str,
    scale: Vec3,
    location: Vec3,
) -> GuideResult<ObjectId> {
    let limit = scene.duplicate(guide)?;
    {
        let obj = scene.object_mut(limit)?;
        obj.transform.scale = scale;
        obj.transform.translation = location;
        obj.name = name.into();
        obj.wire = true;
    }
    scene.parent_keep_world(limit, guide)?;
    Ok(limit)
}

#[allow(clippy::too_many_arguments)]
fn setup_guide_modifiers(
    scene: &mut Scene,
    guide: ObjectId,
    union_solid: ObjectId,
    difference_solid: ObjectId,
    union_limit: ObjectId,
    difference_limit: ObjectId,
    fibula: ObjectId,
    options: &FibulaGuideOptions,
) -> GuideResult<()> {
    scene
        .object_mut(union_solid)?
        .modifiers
        .push(Modifier::Boolean {
            op: BooleanOp::Intersect,
            operand: union_limit,
        });
    scene.object_mut(union_solid)?.modifiers.push(Modifier::Bevel {
        segments: options.bevel_segments,
        width: options.bevel_width,
    });

    scene
        .object_mut(difference_solid)?
        .modifiers
        .push(Modifier::Boolean {
            op: BooleanOp::Intersect,
            operand: difference_limit,
        });

    // Stretch the template along the rig axis so it covers the whole
    // blade path before the limits trim it back.
    let obj = scene.object_mut(guide)?;
    obj.transform.scale = Vec3::new(1.0, 8.0, 1.0);
    obj.modifiers.push(Modifier::Bevel {
        segments: options.bevel_segments,
        width: options.bevel_width,
    });
    obj.modifiers.push(Modifier::Boolean {
        op: BooleanOp::Union,
        operand: union_solid,
    });
    obj.modifiers.push(Modifier::Boolean {
        op: BooleanOp::Difference,
        operand: difference_solid,
    });
    obj.modifiers.push(Modifier::Boolean {
        op: BooleanOp::Difference,
        operand: fibula,
    });
    Ok(())
}

/// Add a screw-hole cylinder to the guide: its rotation is bound to the
/// guide (not parented) so the hole stays perpendicular to the guide
/// surface even if the guide is edited later, and the hole is drilled by
/// a difference modifier on the guide.
pub fn add_screw(
    scene: &mut Scene,
    guide_set: &mut FibulaGuideSet,
    diameter_mm: f64,
) -> GuideResult<ObjectId> {
    let screw = spawn_screw(scene, guide_set.guide, "fibula_guide_screw_hole", diameter_mm)?;
    scene.object_mut(screw)?.group = Group::FibulaGuides;
    guide_set.screws.push(screw);
    Ok(screw)
}

/// Shared screw-cylinder setup: radius from the configured diameter
/// (millimeters to scene centimeters), initial +90° Y rotation baked so
/// the hole runs along X, rotation copied from the guide, difference
/// modifier appended to the guide.
pub(crate) fn spawn_screw(
    scene: &mut Scene,
    guide: ObjectId,
    name: &str,
    diameter_mm: f64,
) -> GuideResult<ObjectId> {
    if !scene.contains(guide) {
        return Err(GuideError::Precondition("missing guide for screw".into()));
    }
    let radius = diameter_mm * 0.1 * 0.5;
    let screw = scene.add(SceneObject::new(
        name,
        primitives::cylinder(radius, 4.0, 32),
    ));
    {
        let obj = scene.object_mut(screw)?;
        obj.transform.rotation =
            Quat::from_euler_angles(0.0, std::f64::consts::FRAC_PI_2, 0.0);
        obj.wire = true;
    }
    scene.bake_transform(screw, BakeChannels::ROTATION)?;
    scene
        .object_mut(screw)?
        .constraints
        .push(Constraint::CopyRotation { target: guide });
    scene.object_mut(guide)?.modifiers.push(Modifier::Boolean {
        op: BooleanOp::Difference,
        operand: screw,
    });
    Ok(screw)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cutting_planes::{generate_cutting_planes, CuttingPlaneOptions};
    use osteoplan_booleans::BspSolver;
    use osteoplan_math::Point3;
    use osteoplan_mesh::primitives::box_from_corners;
    use osteoplan_rig::{build, RigOptions};

    fn options() -> FibulaGuideOptions {
        FibulaGuideOptions {
            guide_width: 10.0,
            plane_thickness: 0.9,
            bevel_segments: 2,
            bevel_width: 0.05,
            perturbation: Perturbation::default(),
        }
    }

    fn planned_scene(segment_count: usize) -> (Scene, RigSet, PlaneSet) {
        let mut scene = Scene::new();
        let solver = BspSolver;
        let fibula = scene.add(SceneObject::new(
            "fibula_scan",
            box_from_corners(Point3::new(-1.0, 0.0, -1.0), Point3::new(1.0, 9.0, 1.0)),
        ));
        let mandible = scene.add(SceneObject::new(
            "mandible_scan",
            box_from_corners(Point3::new(-4.0, -2.0, -1.0), Point3::new(4.0, 2.0, 1.0)),
        ));
        let rig = build(
            &mut scene,
            &solver,
            fibula,
            mandible,
            &RigOptions {
                segment_count,
                ..Default::default()
            },
        )
        .unwrap();
        let planes = generate_cutting_planes(
            &mut scene,
            &rig,
            &CuttingPlaneOptions { thickness: 0.9 },
        )
        .unwrap();
        (scene, rig, planes)
    }

    #[test]
    fn guide_has_three_booleans_and_one_bevel() {
        let (mut scene, rig, planes) = planned_scene(3);
        let solver = BspSolver;
        let set = build_guide(&mut scene, &solver, &planes, &rig, &options()).unwrap();

        let guide = scene.object(set.guide).unwrap();
        let booleans = guide.modifiers.iter().filter(|m| m.is_boolean()).count();
        let bevels = guide
            .modifiers
            .iter()
            .filter(|m| matches!(m, Modifier::Bevel { .. }))
            .count();
        assert_eq!(booleans, 3);
        assert_eq!(bevels, 1);
    }

    #[test]
    fn scaffold_solids_are_hidden_and_clipped() {
        let (mut scene, rig, planes) = planned_scene(2);
        let solver = BspSolver;
        let set = build_guide(&mut scene, &solver, &planes, &rig, &options()).unwrap();

        let union_solid = scene.object(set.union_solid).unwrap();
        assert!(union_solid.hidden);
        assert!(matches!(
            union_solid.modifiers[0],
            Modifier::Boolean {
                op: BooleanOp::Intersect,
                ..
            }
        ));
        assert!(matches!(union_solid.modifiers[1], Modifier::Bevel { .. }));

        let difference_solid = scene.object(set.difference_solid).unwrap();
        assert!(difference_solid.hidden);
        assert_eq!(difference_solid.modifiers.len(), 1);
    }

    #[test]
    fn union_solid_folds_all_planes() {
        let (mut scene, rig, planes) = planned_scene(3);
        let solver = BspSolver;
        let before = scene.len();
        let set = build_guide(&mut scene, &solver, &planes, &rig, &options()).unwrap();

        // All spent operand duplicates were deleted again: only the
        // guide, two solids and two limits were added on top.
        assert_eq!(scene.len(), before + 5);
        // The folded union spans every cut along the rig axis.
        let world = scene.world_matrix(set.union_solid).unwrap();
        let mesh = scene
            .object(set.union_solid)
            .unwrap()
            .mesh
            .transformed(&world);
        assert!(mesh.aabb().unwrap().dimensions().y > osteoplan_rig::JOINT_PITCH * 3.0 - 1.0);
    }

    #[test]
    fn guide_template_is_stretched_on_the_rig_axis() {
        let (mut scene, rig, planes) = planned_scene(1);
        let solver = BspSolver;
        let set = build_guide(&mut scene, &solver, &planes, &rig, &options()).unwrap();
        let guide = scene.object(set.guide).unwrap();
        assert_eq!(guide.transform.scale.y, 8.0);
    }

    #[test]
    fn screw_copies_guide_rotation_and_drills_it() {
        let (mut scene, rig, planes) = planned_scene(2);
        let solver = BspSolver;
        let mut set = build_guide(&mut scene, &solver, &planes, &rig, &options()).unwrap();
        let booleans_before = scene
            .object(set.guide)
            .unwrap()
            .modifiers
            .iter()
            .filter(|m| m.is_boolean())
            .count();

        let screw = add_screw(&mut scene, &mut set, 3.0).unwrap();
        let screw_obj = scene.object(screw).unwrap();
        assert!(matches!(
            screw_obj.constraints[0],
            Constraint::CopyRotation { .. }
        ));
        // The initial Y rotation is baked, not authored.
        assert!(screw_obj
            .transform
            .rotation
            .angle_to(&Quat::identity())
            .abs()
            < 1e-12);

        let booleans_after = scene
            .object(set.guide)
            .unwrap()
            .modifiers
            .iter()
            .filter(|m| m.is_boolean())
            .count();
        assert_eq!(booleans_after, booleans_before + 1);
        assert_eq!(set.screws, vec![screw]);
    }

    #[test]
    fn empty_plane_set_is_a_precondition_error() {
        let (mut scene, rig, _) = planned_scene(1);
        let solver = BspSolver;
        let empty = PlaneSet {
            fibula_start: vec![],
            fibula_end: vec![],
            mandible_start: rig.fibula_source,
            mandible_end: rig.fibula_source,
        };
        assert!(matches!(
            build_guide(&mut scene, &solver, &empty, &rig, &options()),
            Err(GuideError::Precondition(_))
        ));
    }

    #[test]
    fn failure_after_partial_build_leaves_committed_state() {
        let (mut scene, rig, planes) = planned_scene(1);
        let solver = BspSolver;
        // Sabotage one referenced plane so the union fold fails midway.
        scene.remove(planes.fibula_end[0]).unwrap();
        let before = scene.len();
        let err = build_guide(&mut scene, &solver, &planes, &rig, &options());
        assert!(err.is_err());
        // The guide template committed before the failure is still there.
        assert!(scene.len() > before);
        assert!(scene.find_by_name("fibula_guide").is_some());
    }
}
