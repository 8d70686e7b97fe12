//! Mandible guide construction.
//!
//! Each promoted cutting plane gets its own side guide: a rotated,
//! deepened template carrying a blend "union" companion and carving
//! volumes for the slot and the mandible surface. The two side guides
//! can later be joined by a connector solid into one exportable piece.

use crate::fibula::spawn_screw;
use crate::{GuideError, GuideResult, PlaneSet};
use osteoplan_booleans::BooleanOp;
use osteoplan_math::{track_rotation_x, Tolerance, Vec3};
use osteoplan_mesh::primitives;
use osteoplan_rig::{palette, RigSet};
use osteoplan_scene::{BakeChannels, Group, Modifier, ObjectId, Scene, SceneObject};
use std::f64::consts::PI;
use tracing::info;

/// Which end of the resected span a guide belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    /// The `cutting_plane_mandible_start` side.
    Start,
    /// The `cutting_plane_mandible_end` side.
    End,
}

impl Side {
    /// Name fragment used for objects on this side.
    pub fn label(&self) -> &'static str {
        match self {
            Side::Start => "start",
            Side::End => "end",
        }
    }
}

/// Options for mandible guide construction.
#[derive(Debug, Clone, Copy)]
pub struct MandibleGuideOptions {
    /// Bevel smoothing passes.
    pub bevel_segments: u32,
    /// Bevel round-over distance.
    pub bevel_width: f64,
}

/// One side guide and its satellites.
#[derive(Debug, Clone)]
pub struct SideGuide {
    /// The guide shell.
    pub guide: ObjectId,
    /// Blend companion parented (keep transform) to the guide.
    pub union_piece: ObjectId,
    /// Slot-carving volume derived from the cutting plane.
    pub difference_volume: ObjectId,
    /// Screw-hole cylinders added so far.
    pub screws: Vec<ObjectId>,
}

/// Typed registry of the mandible guide build.
#[derive(Debug, Clone)]
pub struct MandibleGuideSet {
    /// Start-side guide.
    pub start: SideGuide,
    /// End-side guide.
    pub end: SideGuide,
    /// Extra mandible copy for visual reference while editing guides.
    pub visualization: ObjectId,
    /// The joined exportable guide, once created.
    pub joined: Option<ObjectId>,
}

/// Build both side guides from the promoted mandible planes.
pub fn build_guides(
    scene: &mut Scene,
    planes: &PlaneSet,
    rig: &RigSet,
    options: &MandibleGuideOptions,
) -> GuideResult<MandibleGuideSet> {
    if !scene.contains(planes.mandible_start) || !scene.contains(planes.mandible_end) {
        return Err(GuideError::Precondition(
            "mandible cutting planes not generated".into(),
        ));
    }

    let visualization = scene.duplicate(rig.mandible_copy)?;
    {
        let obj = scene.object_mut(visualization)?;
        obj.name = "mandible_guide_visualization".into();
        obj.group = Group::MandibleGuides;
    }

    let start = build_side(scene, planes.mandible_start, rig, Side::Start, options)?;
    let end = build_side(scene, planes.mandible_end, rig, Side::End, options)?;

    for id in scene.ids_in_group(Group::MandibleCuttingPlanes) {
        scene.object_mut(id)?.hidden = true;
    }

    info!("mandible guides built");
    Ok(MandibleGuideSet {
        start,
        end,
        visualization,
        joined: None,
    })
}

fn build_side(
    scene: &mut Scene,
    plane: ObjectId,
    rig: &RigSet,
    side: Side,
    options: &MandibleGuideOptions,
) -> GuideResult<SideGuide> {
    let label = side.label();

    // Slot-carving volume: a widened duplicate of the promoted plane.
    let difference_volume = scene.duplicate(plane)?;
    {
        let obj = scene.object_mut(difference_volume)?;
        obj.name = format!("mandible_guide_{label}_difference");
        obj.transform.scale = Vec3::new(1.5, 1.0, 1.2);
        obj.wire = true;
        obj.group = Group::MandibleGuides;
        obj.hidden = false;
    }

    // Guide body: rotated half a turn and deepened, both baked.
    let mut guide_obj = SceneObject::new(
        format!("mandible_guide_{label}"),
        primitives::guide_template(),
    );
    guide_obj.group = Group::MandibleGuides;
    guide_obj.color = Some(palette::GUIDE);
    let guide = scene.add(guide_obj);
    {
        let obj = scene.object_mut(guide)?;
        obj.transform.rotation = osteoplan_math::Quat::from_euler_angles(0.0, 0.0, PI);
        obj.transform.scale = Vec3::new(1.0, 1.0, 2.0);
    }
    scene.bake_transform(guide, BakeChannels::ROTATION_SCALE)?;

    // Blend companion, parented keep-transform so it rides along when
    // the surgeon repositions the guide.
    let union_piece = scene.duplicate(guide)?;
    {
        let obj = scene.object_mut(union_piece)?;
        obj.name = format!("mandible_guide_{label}_union");
        obj.transform.translation = Vec3::new(-0.8, 0.0, 0.0);
        obj.transform.scale = Vec3::new(1.0, 0.5, 1.1);
        obj.wire = true;
    }
    scene.parent_keep_world(union_piece, guide)?;

    {
        let obj = scene.object_mut(guide)?;
        obj.modifiers.push(Modifier::Boolean {
            op: BooleanOp::Union,
            operand: union_piece,
        });
        obj.modifiers.push(Modifier::Boolean {
            op: BooleanOp::Difference,
            operand: difference_volume,
        });
        obj.modifiers.push(Modifier::Boolean {
            op: BooleanOp::Difference,
            operand: rig.mandible_source,
        });
        obj.modifiers.push(Modifier::Bevel {
            segments: options.bevel_segments,
            width: options.bevel_width,
        });
    }
    scene.object_mut(union_piece)?.modifiers.push(Modifier::Bevel {
        segments: options.bevel_segments,
        width: options.bevel_width,
    });

    // Place the guide on its cutting plane (location and rotation only;
    // the plane's frozen transform is authored, so no constraint is
    // needed).
    let plane_trs = scene.object(plane)?.transform;
    {
        let obj = scene.object_mut(guide)?;
        obj.transform.translation = plane_trs.translation;
        obj.transform.rotation = plane_trs.rotation;
    }

    Ok(SideGuide {
        guide,
        union_piece,
        difference_volume,
        screws: Vec::new(),
    })
}

/// Add a screw hole to one side guide, mirroring the fibula screw, and
/// additionally drill it through the positioning aid when one exists.
pub fn add_screw(
    scene: &mut Scene,
    set: &mut MandibleGuideSet,
    side: Side,
    diameter_mm: f64,
    positioning_aid: Option<ObjectId>,
) -> GuideResult<ObjectId> {
    let side_guide = match side {
        Side::Start => &mut set.start,
        Side::End => &mut set.end,
    };
    let guide = side_guide.guide;
    let name = format!("mandible_guide_{}_screw_hole", side.label());
    let screw = spawn_screw(scene, guide, &name, diameter_mm)?;
    {
        let guide_translation = scene.object(guide)?.transform.translation;
        let obj = scene.object_mut(screw)?;
        obj.transform.translation = guide_translation;
        obj.group = Group::MandibleGuides;
    }
    if let Some(aid) = positioning_aid {
        scene.object_mut(aid)?.modifiers.push(Modifier::Boolean {
            op: BooleanOp::Difference,
            operand: screw,
        });
    }
    side_guide.screws.push(screw);
    Ok(screw)
}

/// Join the two side guides with a connector solid spanning their
/// origins, producing the single exportable mandible guide.
///
/// The connector sits at the midpoint, dropped by a quarter of the
/// summed guide heights, sized from the distance between the guides,
/// and its X axis tracks the start-to-end direction with Z up.
pub fn join(
    scene: &mut Scene,
    set: &MandibleGuideSet,
    rig: &RigSet,
    options: &MandibleGuideOptions,
) -> GuideResult<ObjectId> {
    let start = scene.object(set.start.guide)?;
    let end = scene.object(set.end.guide)?;

    let start_pos = start.transform.translation;
    let end_pos = end.transform.translation;
    let mut center = (start_pos + end_pos) / 2.0;

    let height = |obj: &SceneObject| -> f64 {
        obj.mesh
            .aabb()
            .map(|a| a.dimensions().z * obj.transform.scale.z)
            .unwrap_or(0.0)
    };
    center.z -= (height(start) + height(end)) / 4.0;

    let span = start_pos - end_pos;
    let distance = span.norm();
    if Tolerance::DEFAULT.is_zero(distance) {
        return Err(GuideError::Precondition(
            "mandible guides are coincident".into(),
        ));
    }

    let mut connector = SceneObject::new(
        "joined_mandible_guide",
        primitives::guide_template(),
    );
    connector.transform.translation = center;
    connector.transform.rotation = track_rotation_x(&span);
    connector.transform.scale = Vec3::new(1.1 * distance, 0.2 * distance, 0.1 * distance);
    connector.group = Group::MandibleGuides;
    connector.color = Some(palette::GUIDE);
    connector.modifiers = vec![
        Modifier::Boolean {
            op: BooleanOp::Difference,
            operand: rig.mandible_source,
        },
        Modifier::Boolean {
            op: BooleanOp::Union,
            operand: set.start.guide,
        },
        Modifier::Boolean {
            op: BooleanOp::Union,
            operand: set.end.guide,
        },
        Modifier::Bevel {
            segments: options.bevel_segments,
            width: options.bevel_width,
        },
    ];
    let joined = scene.add(connector);
    info!("mandible guides joined");
    Ok(joined)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cutting_planes::{generate_cutting_planes, CuttingPlaneOptions};
    use approx::assert_relative_eq;
    use osteoplan_booleans::BspSolver;
    use osteoplan_math::Point3;
    use osteoplan_mesh::primitives::box_from_corners;
    use osteoplan_rig::{build, RigOptions};

    fn options() -> MandibleGuideOptions {
        MandibleGuideOptions {
            bevel_segments: 2,
            bevel_width: 0.05,
        }
    }

    fn planned_scene() -> (Scene, RigSet, PlaneSet) {
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
            &RigOptions::default(),
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
    fn each_side_gets_guide_union_and_difference() {
        let (mut scene, rig, planes) = planned_scene();
        let set = build_guides(&mut scene, &planes, &rig, &options()).unwrap();

        for side in [&set.start, &set.end] {
            let guide = scene.object(side.guide).unwrap();
            let booleans = guide.modifiers.iter().filter(|m| m.is_boolean()).count();
            assert_eq!(booleans, 3);
            assert!(guide
                .modifiers
                .iter()
                .any(|m| matches!(m, Modifier::Bevel { .. })));

            let union_piece = scene.object(side.union_piece).unwrap();
            assert!(union_piece.wire);
            assert!(union_piece
                .modifiers
                .iter()
                .any(|m| matches!(m, Modifier::Bevel { .. })));

            let diff = scene.object(side.difference_volume).unwrap();
            assert!(diff.wire);
            assert_relative_eq!(diff.transform.scale.x, 1.5);
        }
    }

    #[test]
    fn guides_sit_on_their_planes() {
        let (mut scene, rig, planes) = planned_scene();
        let set = build_guides(&mut scene, &planes, &rig, &options()).unwrap();

        let plane = scene.object(planes.mandible_start).unwrap().transform;
        let guide = scene.object(set.start.guide).unwrap().transform;
        assert_relative_eq!(guide.translation, plane.translation, epsilon = 1e-9);
        assert!(guide.rotation.angle_to(&plane.rotation) < 1e-9);
    }

    #[test]
    fn union_piece_follows_its_guide() {
        let (mut scene, rig, planes) = planned_scene();
        let set = build_guides(&mut scene, &planes, &rig, &options()).unwrap();

        let before = scene.world_matrix(set.start.union_piece).unwrap();
        scene.object_mut(set.start.guide).unwrap().transform.translation +=
            Vec3::new(2.0, 0.0, 0.0);
        let after = scene.world_matrix(set.start.union_piece).unwrap();
        assert_relative_eq!(after[(0, 3)] - before[(0, 3)], 2.0, epsilon = 1e-9);
    }

    #[test]
    fn join_spans_the_two_guides() {
        let (mut scene, rig, planes) = planned_scene();
        let set = build_guides(&mut scene, &planes, &rig, &options()).unwrap();
        let joined = join(&mut scene, &set, &rig, &options()).unwrap();

        let start_pos = scene.object(set.start.guide).unwrap().transform.translation;
        let end_pos = scene.object(set.end.guide).unwrap().transform.translation;
        let distance = (start_pos - end_pos).norm();

        let connector = scene.object(joined).unwrap();
        assert_eq!(connector.name, "joined_mandible_guide");
        assert_relative_eq!(
            connector.transform.translation.y,
            (start_pos.y + end_pos.y) / 2.0,
            epsilon = 1e-9
        );
        assert_relative_eq!(connector.transform.scale.x, 1.1 * distance, epsilon = 1e-9);

        // Difference first, then the two unions, then the bevel.
        assert!(matches!(
            connector.modifiers[0],
            Modifier::Boolean {
                op: BooleanOp::Difference,
                ..
            }
        ));
        assert!(matches!(
            connector.modifiers[1],
            Modifier::Boolean {
                op: BooleanOp::Union,
                ..
            }
        ));
        assert!(matches!(
            connector.modifiers[2],
            Modifier::Boolean {
                op: BooleanOp::Union,
                ..
            }
        ));
        assert!(matches!(connector.modifiers[3], Modifier::Bevel { .. }));

        // The connector's X axis tracks the start-end direction.
        let x = connector.transform.rotation.transform_vector(&Vec3::x());
        assert_relative_eq!(x, (start_pos - end_pos).normalize(), epsilon = 1e-9);
    }

    #[test]
    fn screw_drills_guide_and_optional_aid() {
        let (mut scene, rig, planes) = planned_scene();
        let mut set = build_guides(&mut scene, &planes, &rig, &options()).unwrap();

        let aid = scene.add(SceneObject::new(
            "positioning_aid_mesh",
            primitives::guide_template(),
        ));
        let screw = add_screw(&mut scene, &mut set, Side::Start, 3.0, Some(aid)).unwrap();

        let guide = scene.object(set.start.guide).unwrap();
        assert!(guide.modifiers.iter().any(|m| matches!(
            m,
            Modifier::Boolean {
                op: BooleanOp::Difference,
                operand
            } if *operand == screw
        )));
        let aid_obj = scene.object(aid).unwrap();
        assert!(aid_obj.modifiers.iter().any(|m| matches!(
            m,
            Modifier::Boolean {
                op: BooleanOp::Difference,
                operand
            } if *operand == screw
        )));
        // Screw starts on the guide.
        let guide_pos = scene.object(set.start.guide).unwrap().transform.translation;
        assert_relative_eq!(
            scene.object(screw).unwrap().transform.translation,
            guide_pos,
            epsilon = 1e-12
        );
        assert_eq!(set.start.screws, vec![screw]);
    }

    #[test]
    fn missing_planes_is_a_precondition_error() {
        let (mut scene, rig, planes) = planned_scene();
        scene.remove(planes.mandible_start).unwrap();
        assert!(matches!(
            build_guides(&mut scene, &planes, &rig, &options()),
            Err(GuideError::Precondition(_))
        ));
    }
}
