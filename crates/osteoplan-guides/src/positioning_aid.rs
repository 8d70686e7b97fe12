//! Positioning aid construction.
//!
//! The aid is an auxiliary printable piece that helps align the
//! reconstructed segments during surgery. Its placement is computed, not
//! authored: a closed-form frame derived from a cutting plane's
//! normalized world matrix and a guide shell's bounding geometry. The
//! pieces are placed by matching transform only; no live constraint
//! binds them to the guides.

use crate::mandible::MandibleGuideSet;
use crate::{GuideError, GuideResult, PlaneSet};
use osteoplan_booleans::BooleanOp;
use osteoplan_math::{track_rotation_x, Mat4, Tolerance, Trs, Vec3};
use osteoplan_mesh::primitives;
use osteoplan_rig::{palette, RigSet};
use osteoplan_scene::{Group, Modifier, ObjectId, Scene, SceneObject};
use tracing::info;

/// Options for positioning-aid construction.
#[derive(Debug, Clone, Copy)]
pub struct PositioningAidOptions {
    /// Extra scale on the aid pieces' X axis.
    pub size_x: f64,
    /// Extra scale on the aid pieces' Z axis.
    pub size_z: f64,
}

impl Default for PositioningAidOptions {
    fn default() -> Self {
        Self {
            size_x: 1.0,
            size_z: 1.0,
        }
    }
}

/// Typed registry of the positioning aid build.
#[derive(Debug, Clone)]
pub struct PositioningAidSet {
    /// Start-side aid piece.
    pub start: ObjectId,
    /// End-side aid piece.
    pub end: ObjectId,
    /// The composed, exportable aid mesh.
    pub mesh: ObjectId,
}

/// Closed-form placement frame for one aid piece.
///
/// Axis conventions: the plane's local X and Z are its in-plane axes and
/// local Y is its thickness (cut-normal) axis. The guide origin is
/// projected onto the plane along the thickness axis, then offset by
/// half the guide width along X and a quarter of the guide depth along
/// Z. The resulting matrix carries the plane's rotation and a scale of
/// (guide width, half guide depth + projection distance, half guide
/// height).
///
/// The plane matrix must be orthonormalizable (no skew); non-uniform
/// scaling applied to the plane beforehand would corrupt the frame.
/// This is an assumption of the computation, not a validated input.
pub fn aid_matrix(plane_world: &Mat4, guide_dims: &Vec3, guide_pos: &Vec3) -> Mat4 {
    let plane = Trs::from_matrix(plane_world);
    let x_axis = plane.rotation.transform_vector(&Vec3::x());
    let y_axis = plane.rotation.transform_vector(&Vec3::y());
    let z_axis = plane.rotation.transform_vector(&Vec3::z());

    let (width, height, depth) = (guide_dims.x, guide_dims.y, guide_dims.z);

    // Project the guide origin onto the plane along the thickness axis.
    let projection = (guide_pos - plane.translation).dot(&y_axis);
    let foot = guide_pos - y_axis * projection;

    let translation = foot + x_axis * (width * 0.5) + z_axis * (depth * 0.25);
    Trs {
        translation,
        rotation: plane.rotation,
        scale: Vec3::new(width, depth * 0.5 + projection.abs(), height * 0.5),
    }
    .to_matrix()
}

/// Build the positioning aid: one piece per side placed by
/// [`aid_matrix`], connected by a bar and composed into a single
/// exportable mesh.
pub fn create(
    scene: &mut Scene,
    planes: &PlaneSet,
    guides: &MandibleGuideSet,
    rig: &RigSet,
    options: &PositioningAidOptions,
) -> GuideResult<PositioningAidSet> {
    let start = aid_piece(
        scene,
        planes.mandible_start,
        guides.start.guide,
        "positioning_aid_start",
        options,
    )?;
    let end = aid_piece(
        scene,
        planes.mandible_end,
        guides.end.guide,
        "positioning_aid_end",
        options,
    )?;

    let start_pos = scene.object(start)?.transform.translation;
    let end_pos = scene.object(end)?.transform.translation;
    let span = start_pos - end_pos;
    let distance = span.norm();
    if Tolerance::DEFAULT.is_zero(distance) {
        return Err(GuideError::Precondition(
            "positioning aid pieces are coincident".into(),
        ));
    }

    let mut bar = SceneObject::new("positioning_aid_mesh", primitives::guide_template());
    bar.transform.translation = (start_pos + end_pos) / 2.0;
    bar.transform.rotation = track_rotation_x(&span);
    bar.transform.scale = Vec3::new(distance, 0.15 * distance, 0.1 * distance);
    bar.group = Group::MandibleGuides;
    bar.color = Some(palette::GUIDE);
    bar.modifiers = vec![
        Modifier::Boolean {
            op: BooleanOp::Union,
            operand: start,
        },
        Modifier::Boolean {
            op: BooleanOp::Union,
            operand: end,
        },
        Modifier::Boolean {
            op: BooleanOp::Difference,
            operand: rig.mandible_source,
        },
    ];
    let mesh = scene.add(bar);

    info!("positioning aid created");
    Ok(PositioningAidSet { start, end, mesh })
}

fn aid_piece(
    scene: &mut Scene,
    plane: ObjectId,
    guide: ObjectId,
    name: &str,
    options: &PositioningAidOptions,
) -> GuideResult<ObjectId> {
    if !scene.contains(plane) || !scene.contains(guide) {
        return Err(GuideError::Precondition(format!(
            "missing plane or guide for {name}"
        )));
    }
    let plane_world = scene.world_matrix(plane)?;
    let guide_obj = scene.object(guide)?;
    let dims = guide_obj
        .mesh
        .aabb()
        .map(|a| {
            a.dimensions()
                .component_mul(&guide_obj.transform.scale)
        })
        .unwrap_or_else(Vec3::zeros);
    let guide_pos = guide_obj.transform.translation;

    let mut trs = Trs::from_matrix(&aid_matrix(&plane_world, &dims, &guide_pos));
    trs.scale.x *= options.size_x;
    trs.scale.z *= options.size_z;

    let mut piece = SceneObject::new(name, primitives::guide_template());
    piece.transform = trs;
    piece.group = Group::MandibleGuides;
    piece.color = Some(palette::GUIDE);
    Ok(scene.add(piece))
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use osteoplan_math::Quat;

    #[test]
    fn aid_matrix_is_deterministic() {
        let plane = Trs {
            translation: Vec3::new(1.0, 2.0, 3.0),
            rotation: Quat::from_euler_angles(0.3, -0.4, 0.9),
            scale: Vec3::new(1.0, 1.0, 1.0),
        }
        .to_matrix();
        let dims = Vec3::new(1.0, 2.0, 2.0);
        let pos = Vec3::new(0.5, 4.0, 2.5);

        let a = aid_matrix(&plane, &dims, &pos);
        let b = aid_matrix(&plane, &dims, &pos);
        assert_eq!(a, b);
    }

    #[test]
    fn aid_matrix_identity_plane_closed_form() {
        let plane = Mat4::identity();
        let dims = Vec3::new(1.0, 1.0, 2.0);
        let pos = Vec3::new(0.0, 2.0, 0.0);

        let m = aid_matrix(&plane, &dims, &pos);
        let trs = Trs::from_matrix(&m);

        // Projection distance 2 along Y; foot at the origin; offsets
        // width/2 on X and depth/4 on Z.
        assert_relative_eq!(trs.translation, Vec3::new(0.5, 0.0, 0.5), epsilon = 1e-9);
        assert_relative_eq!(
            trs.scale,
            Vec3::new(1.0, 2.0 * 0.5 + 2.0, 1.0 * 0.5),
            epsilon = 1e-9
        );
        assert!(trs.rotation.angle_to(&Quat::identity()) < 1e-9);
    }

    #[test]
    fn aid_matrix_follows_plane_rotation() {
        let rotation = Quat::from_euler_angles(0.0, 0.0, 1.1);
        let plane = Trs::from_rotation(rotation).to_matrix();
        let m = aid_matrix(&plane, &Vec3::new(1.0, 1.0, 1.0), &Vec3::new(0.0, 1.0, 0.0));
        let trs = Trs::from_matrix(&m);
        assert!(trs.rotation.angle_to(&rotation) < 1e-9);
    }
}
