//! Foundational object operations: duplication, transform baking,
//! origin placement and keep-transform (re)parenting.
//!
//! Every higher pipeline stage composes these.

use crate::{ObjectId, ParentLink, Scene, SceneError, SceneResult};
use osteoplan_math::{Mat4, Trs, Vec3};
use tracing::debug;

/// Which transform channels a bake folds into the mesh.
///
/// Channels are folded in T·R·S order; the world transform is preserved
/// whenever the selected channels are the innermost contiguous ones
/// (scale; rotation+scale; all three), which is how every pipeline stage
/// uses it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BakeChannels {
    /// Fold the translation.
    pub location: bool,
    /// Fold the rotation.
    pub rotation: bool,
    /// Fold the scale.
    pub scale: bool,
}

impl BakeChannels {
    /// Scale only.
    pub const SCALE: Self = Self {
        location: false,
        rotation: false,
        scale: true,
    };
    /// Rotation only.
    pub const ROTATION: Self = Self {
        location: false,
        rotation: true,
        scale: false,
    };
    /// Rotation and scale.
    pub const ROTATION_SCALE: Self = Self {
        location: false,
        rotation: true,
        scale: true,
    };
    /// All three channels.
    pub const ALL: Self = Self {
        location: true,
        rotation: true,
        scale: true,
    };
}

impl Scene {
    /// Deep-copy an object (mesh data is not shared) and return the new
    /// id. Duplicating an object with an empty mesh yields an empty
    /// duplicate, not an error.
    pub fn duplicate(&mut self, id: ObjectId) -> SceneResult<ObjectId> {
        let copy = self.object(id)?.clone();
        Ok(self.add(copy))
    }

    /// Recenter the local origin on the vertex median without moving the
    /// object in world space.
    pub fn set_origin_to_geometry_median(&mut self, id: ObjectId) -> SceneResult<()> {
        let obj = self.object_mut(id)?;
        let median = obj.mesh.median();
        obj.mesh.translate(&-median);
        let scaled = median.component_mul(&obj.transform.scale);
        obj.transform.translation += obj.transform.rotation.transform_vector(&scaled);
        Ok(())
    }

    /// Fold the selected local-transform channels into the mesh data,
    /// resetting them to identity. Baking with nothing selected, or
    /// baking twice, is idempotent.
    pub fn bake_transform(&mut self, id: ObjectId, channels: BakeChannels) -> SceneResult<()> {
        let obj = self.object_mut(id)?;
        let t = obj.transform;
        let mut fold = Mat4::identity();
        if channels.location {
            fold *= Trs::from_translation(t.translation).to_matrix();
        }
        if channels.rotation {
            fold *= t.rotation.to_homogeneous();
        }
        if channels.scale {
            fold *= Trs::from_scale(t.scale).to_matrix();
        }
        obj.mesh.transform(&fold);
        if channels.location {
            obj.transform.translation = Vec3::zeros();
        }
        if channels.rotation {
            obj.transform.rotation = osteoplan_math::Quat::identity();
        }
        if channels.scale {
            obj.transform.scale = Vec3::new(1.0, 1.0, 1.0);
        }
        Ok(())
    }

    /// Freeze the constraint-evaluated world pose into the authored
    /// local transform. Constraints stay attached (clear them to stop
    /// them re-applying); any parent link is dropped as part of the
    /// freeze.
    pub fn bake_visual_transform(&mut self, id: ObjectId) -> SceneResult<()> {
        let world = self.world_matrix(id)?;
        let obj = self.object_mut(id)?;
        obj.transform = Trs::from_matrix(&world);
        obj.parent = None;
        Ok(())
    }

    /// Remove all constraints from an object.
    pub fn clear_constraints(&mut self, id: ObjectId) -> SceneResult<()> {
        self.object_mut(id)?.constraints.clear();
        Ok(())
    }

    /// Parent `child` to `parent`, recording the parent-inverse matrix
    /// so the child's world transform is unchanged.
    pub fn parent_keep_world(&mut self, child: ObjectId, parent: ObjectId) -> SceneResult<()> {
        let parent_world = self.world_matrix(parent)?;
        let parent_inverse = parent_world
            .try_inverse()
            .ok_or_else(|| SceneError::NotInvertible(self.object(parent).map(|o| o.name.clone()).unwrap_or_default()))?;
        self.object_mut(child)?.parent = Some(ParentLink::Object {
            target: parent,
            parent_inverse,
        });
        Ok(())
    }

    /// Unparent `child`, folding the inherited transform into its local
    /// transform so its world transform is unchanged.
    pub fn clear_parent_keep_world(&mut self, child: ObjectId) -> SceneResult<()> {
        let world = self.world_matrix(child)?;
        let obj = self.object_mut(child)?;
        obj.transform = Trs::from_matrix(&world);
        obj.parent = None;
        Ok(())
    }

    /// Delete every object filed into `group`, returning the removed
    /// ids so registries can drop their handles.
    pub fn delete_group(&mut self, group: crate::Group) -> Vec<ObjectId> {
        let ids = self.ids_in_group(group);
        for &id in &ids {
            let _ = self.remove(id);
        }
        debug!(group = group.label(), removed = ids.len(), "deleted group");
        ids
    }
}
