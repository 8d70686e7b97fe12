//! The regeneration engine.

use crate::PoseSnapshot;
use osteoplan_booleans::BooleanSolver;
use osteoplan_rig::RigSet;
use osteoplan_scene::{Group, ObjectId, Scene, SceneResult};
use tracing::debug;

/// What a refresh did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshOutcome {
    /// Pose unchanged since the last refresh; nothing touched.
    Unchanged,
    /// Previews were regenerated.
    Regenerated {
        /// Previews created (one per fibula segment).
        created: usize,
        /// Stale previews deleted.
        deleted: usize,
    },
}

/// Re-derives the position-frozen preview duplicates of the fibula
/// segments whenever the rig pose changes.
#[derive(Debug, Default)]
pub struct LiveUpdate {
    last: Option<PoseSnapshot>,
    previews: Vec<ObjectId>,
}

impl LiveUpdate {
    /// New engine with no snapshot history.
    pub fn new() -> Self {
        Self::default()
    }

    /// Currently live preview objects.
    pub fn previews(&self) -> &[ObjectId] {
        &self.previews
    }

    /// Snapshot the pose and regenerate previews if it changed.
    ///
    /// Regeneration deletes the previous generation wholesale, then per
    /// segment: duplicate, bake the first modifier (the partition-cell
    /// intersection) into static geometry, clear constraints, and
    /// reposition to the neutral reference frame (the fibula working
    /// copy's pose, the origin if it is gone).
    pub fn refresh(
        &mut self,
        scene: &mut Scene,
        solver: &dyn BooleanSolver,
        rig: &RigSet,
    ) -> SceneResult<RefreshOutcome> {
        let snapshot = PoseSnapshot::capture(scene, rig)?;
        if self.last.as_ref() == Some(&snapshot) {
            debug!("pose unchanged, skipping preview regeneration");
            return Ok(RefreshOutcome::Unchanged);
        }

        let deleted = self.discard_previews(scene);

        let neutral = scene
            .object(rig.fibula_copy)
            .map(|o| (o.transform.translation, o.transform.rotation))
            .unwrap_or_else(|_| {
                (
                    osteoplan_math::Vec3::zeros(),
                    osteoplan_math::Quat::identity(),
                )
            });

        let mut created = 0;
        for (i, &segment) in rig.segments.iter().enumerate() {
            let preview = scene.duplicate(segment)?;
            scene.apply_modifiers(preview, 1, solver)?;
            scene.clear_constraints(preview)?;
            let obj = scene.object_mut(preview)?;
            obj.transform.translation = neutral.0;
            obj.transform.rotation = neutral.1;
            obj.name = format!("fibula_preview.{i}");
            obj.group = Group::FibulaWorking;
            obj.hidden = false;
            self.previews.push(preview);
            created += 1;
        }

        self.last = Some(snapshot);
        debug!(created, deleted, "previews regenerated");
        Ok(RefreshOutcome::Regenerated { created, deleted })
    }

    /// Delete all previews and forget the snapshot history (used by the
    /// clear commands).
    pub fn reset(&mut self, scene: &mut Scene) {
        self.discard_previews(scene);
        self.last = None;
    }

    fn discard_previews(&mut self, scene: &mut Scene) -> usize {
        let mut deleted = 0;
        for id in self.previews.drain(..) {
            if scene.contains(id) {
                let _ = scene.remove(id);
                deleted += 1;
            }
        }
        deleted
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use osteoplan_booleans::BspSolver;
    use osteoplan_math::{Point3, Trs, Vec3};
    use osteoplan_mesh::primitives::box_from_corners;
    use osteoplan_rig::{build, RigOptions};
    use osteoplan_scene::SceneObject;

    fn rig_scene() -> (Scene, RigSet) {
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
        (scene, rig)
    }

    #[test]
    fn first_refresh_creates_one_preview_per_segment() {
        let (mut scene, rig) = rig_scene();
        let solver = BspSolver;
        let mut live = LiveUpdate::new();

        let outcome = live.refresh(&mut scene, &solver, &rig).unwrap();
        assert_eq!(
            outcome,
            RefreshOutcome::Regenerated {
                created: 3,
                deleted: 0
            }
        );
        assert_eq!(live.previews().len(), 3);
    }

    #[test]
    fn unchanged_pose_is_an_idempotent_noop() {
        let (mut scene, rig) = rig_scene();
        let solver = BspSolver;
        let mut live = LiveUpdate::new();
        live.refresh(&mut scene, &solver, &rig).unwrap();

        let objects_before = scene.len();
        let outcome = live.refresh(&mut scene, &solver, &rig).unwrap();
        assert_eq!(outcome, RefreshOutcome::Unchanged);
        assert_eq!(scene.len(), objects_before);

        let outcome = live.refresh(&mut scene, &solver, &rig).unwrap();
        assert_eq!(outcome, RefreshOutcome::Unchanged);
        assert_eq!(scene.len(), objects_before);
    }

    #[test]
    fn pose_change_deletes_old_generation_and_recreates() {
        let (mut scene, rig) = rig_scene();
        let solver = BspSolver;
        let mut live = LiveUpdate::new();
        live.refresh(&mut scene, &solver, &rig).unwrap();
        let first_generation: Vec<_> = live.previews().to_vec();

        scene
            .armature_mut()
            .unwrap()
            .pose(1, Trs::from_translation(Vec3::new(1.0, 0.0, 0.0)))
            .unwrap();
        let outcome = live.refresh(&mut scene, &solver, &rig).unwrap();
        assert_eq!(
            outcome,
            RefreshOutcome::Regenerated {
                created: 3,
                deleted: 3
            }
        );
        for id in first_generation {
            assert!(!scene.contains(id));
        }
        assert_eq!(live.previews().len(), 3);
    }

    #[test]
    fn previews_are_frozen_static_geometry() {
        let (mut scene, rig) = rig_scene();
        let solver = BspSolver;
        let mut live = LiveUpdate::new();
        live.refresh(&mut scene, &solver, &rig).unwrap();

        for &preview in live.previews() {
            let obj = scene.object(preview).unwrap();
            assert!(obj.constraints.is_empty());
            // The partition-cell intersection was baked away; the
            // fibula source had no other modifiers.
            assert!(obj.modifiers.is_empty());
            assert!(!obj.mesh.is_empty());
        }
    }

    #[test]
    fn reset_discards_previews_and_history() {
        let (mut scene, rig) = rig_scene();
        let solver = BspSolver;
        let mut live = LiveUpdate::new();
        live.refresh(&mut scene, &solver, &rig).unwrap();
        let count = scene.len();

        live.reset(&mut scene);
        assert_eq!(scene.len(), count - 3);
        assert!(live.previews().is_empty());

        // After a reset the next refresh regenerates even though the
        // pose never moved.
        let outcome = live.refresh(&mut scene, &solver, &rig).unwrap();
        assert!(matches!(outcome, RefreshOutcome::Regenerated { .. }));
    }
}
