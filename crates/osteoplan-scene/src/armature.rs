//! Armature (rig) storage: an ordered chain of posable joints.
//!
//! The armature is scene-level state rather than a mesh object; cells and
//! empties bind to joints through vertex groups and constraints.

use crate::{ObjectId, SceneError, SceneResult};
use osteoplan_math::{Mat4, Trs, Vec3};

/// A posable joint in the armature chain.
#[derive(Debug, Clone)]
pub struct Joint {
    /// Joint name, `bone.{i}`.
    pub name: String,
    /// Rest-position head along the construction axis.
    pub rest: Vec3,
    /// Interactive pose, relative to the rest position.
    pub pose: Trs,
    /// Optional display-proxy object drawn at the joint.
    pub visual_proxy: Option<ObjectId>,
}

/// An ordered chain of joints spaced along +Y by a fixed pitch.
///
/// Joint count is fixed at construction; changing the segment count
/// means tearing the rig down and rebuilding it.
#[derive(Debug, Clone)]
pub struct Armature {
    /// Distance between adjacent joints.
    pub pitch: f64,
    joints: Vec<Joint>,
}

impl Armature {
    /// Create `joint_count` joints at rest positions `(0, i·pitch, 0)`.
    pub fn new(joint_count: usize, pitch: f64) -> Self {
        let joints = (0..joint_count)
            .map(|i| Joint {
                name: format!("bone.{i}"),
                rest: Vec3::new(0.0, i as f64 * pitch, 0.0),
                pose: Trs::identity(),
                visual_proxy: None,
            })
            .collect();
        Self { pitch, joints }
    }

    /// Number of joints.
    pub fn joint_count(&self) -> usize {
        self.joints.len()
    }

    /// Number of segments (adjacent joint pairs).
    pub fn segment_count(&self) -> usize {
        self.joints.len().saturating_sub(1)
    }

    /// All joints, in chain order.
    pub fn joints(&self) -> &[Joint] {
        &self.joints
    }

    /// Joint by index.
    pub fn joint(&self, index: usize) -> SceneResult<&Joint> {
        self.joints.get(index).ok_or(SceneError::MissingJoint(index))
    }

    /// Mutable joint by index.
    pub fn joint_mut(&mut self, index: usize) -> SceneResult<&mut Joint> {
        self.joints
            .get_mut(index)
            .ok_or(SceneError::MissingJoint(index))
    }

    /// Set a joint's interactive pose. No recomputation is triggered;
    /// dependents pick the change up on their next evaluation.
    pub fn pose(&mut self, index: usize, pose: Trs) -> SceneResult<()> {
        self.joint_mut(index)?.pose = pose;
        Ok(())
    }

    /// World matrix of a joint: rest translation composed with the pose.
    pub fn joint_world(&self, index: usize) -> SceneResult<Mat4> {
        let joint = self.joint(index)?;
        let rest = Trs::from_translation(joint.rest).to_matrix();
        Ok(rest * joint.pose.to_matrix())
    }

    /// Deform matrix of a joint relative to its bind (rest) state, for
    /// vertices weighted to it: identity while the joint is unposed.
    pub fn joint_delta(&self, index: usize) -> SceneResult<Mat4> {
        let joint = self.joint(index)?;
        let rest = Trs::from_translation(joint.rest).to_matrix();
        let rest_inv = Trs::from_translation(-joint.rest).to_matrix();
        Ok(rest * joint.pose.to_matrix() * rest_inv)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use osteoplan_math::Point3;

    #[test]
    fn joints_rest_along_pitch() {
        let arm = Armature::new(4, 3.0);
        assert_eq!(arm.joint_count(), 4);
        assert_eq!(arm.segment_count(), 3);
        for (i, joint) in arm.joints().iter().enumerate() {
            assert_eq!(joint.name, format!("bone.{i}"));
            assert_relative_eq!(joint.rest.y, i as f64 * 3.0);
        }
    }

    #[test]
    fn unposed_joint_delta_is_identity() {
        let arm = Armature::new(3, 3.0);
        let delta = arm.joint_delta(1).unwrap();
        assert_relative_eq!(delta, Mat4::identity(), epsilon = 1e-12);
    }

    #[test]
    fn posed_joint_moves_its_world() {
        let mut arm = Armature::new(3, 3.0);
        arm.pose(2, Trs::from_translation(Vec3::new(0.5, 0.0, 0.0)))
            .unwrap();
        let w = arm.joint_world(2).unwrap();
        let p = w.transform_point(&Point3::origin());
        assert_relative_eq!(p.x, 0.5, epsilon = 1e-12);
        assert_relative_eq!(p.y, 6.0, epsilon = 1e-12);
    }

    #[test]
    fn missing_joint_is_an_error() {
        let mut arm = Armature::new(2, 3.0);
        assert!(matches!(
            arm.pose(5, Trs::identity()),
            Err(SceneError::MissingJoint(5))
        ));
    }
}
