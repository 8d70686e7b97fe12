//! Ordered boolean chains over scene objects.
//!
//! The composer never reorders operands: union and difference do not
//! commute with each other, so the declared order is the contract.

use crate::GuideResult;
use osteoplan_booleans::{BooleanOp, BooleanSolver};
use osteoplan_scene::{Modifier, ObjectId, Scene};

/// One step of a boolean chain.
#[derive(Debug, Clone, Copy)]
pub struct BooleanStep {
    /// Operation applied at this step.
    pub op: BooleanOp,
    /// Operand object.
    pub operand: ObjectId,
}

/// Apply `steps` to `base` strictly in the order given.
///
/// Each step attaches a non-destructive boolean modifier. With
/// `bake_each_step` the modifier is immediately baked into the mesh,
/// which is required whenever a later step (or the caller) consumes the
/// *result* as an input mesh; chained unbaked booleans do not commute
/// the same way.
pub fn chain(
    scene: &mut Scene,
    solver: &dyn BooleanSolver,
    base: ObjectId,
    steps: &[BooleanStep],
    bake_each_step: bool,
) -> GuideResult<()> {
    for step in steps {
        scene.object_mut(base)?.modifiers.push(Modifier::Boolean {
            op: step.op,
            operand: step.operand,
        });
        if bake_each_step {
            scene.apply_all_modifiers(base, solver)?;
        }
    }
    Ok(())
}

/// Anti-coplanar micro-scale perturbation.
///
/// Duplicated cutting planes differ only by a rotation about the rig
/// axis, which leaves boolean operands with exactly coplanar faces. A
/// strictly increasing per-operand scale keeps every pair of faces
/// separated. The constants are empirically tuned and geometry
/// dependent, so they stay configurable rather than hard-coded.
#[derive(Debug, Clone, Copy)]
pub struct Perturbation {
    /// In-plane base scale applied to every operand.
    pub base: f64,
    /// Additional scale per operand index.
    pub step: f64,
}

impl Perturbation {
    /// Scale factor for operand `index`.
    pub fn factor(&self, index: usize) -> f64 {
        self.base + self.step * index as f64
    }
}

impl Default for Perturbation {
    fn default() -> Self {
        Self {
            base: 4.0,
            step: 0.01,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use osteoplan_booleans::BspSolver;
    use osteoplan_math::{Trs, Vec3};
    use osteoplan_mesh::primitives::boxed;
    use osteoplan_scene::SceneObject;

    fn box_at(scene: &mut Scene, name: &str, x: f64) -> ObjectId {
        let mut obj = SceneObject::new(name, boxed(&Vec3::new(2.0, 2.0, 2.0)));
        obj.transform = Trs::from_translation(Vec3::new(x, 0.0, 0.0));
        scene.add(obj)
    }

    #[test]
    fn chain_preserves_declared_order() {
        let mut scene = Scene::new();
        let solver = BspSolver;
        let base = box_at(&mut scene, "base", 0.0);
        let a = box_at(&mut scene, "a", 1.0);
        let b = box_at(&mut scene, "b", -1.0);
        let steps = [
            BooleanStep {
                op: BooleanOp::Union,
                operand: a,
            },
            BooleanStep {
                op: BooleanOp::Difference,
                operand: b,
            },
        ];
        chain(&mut scene, &solver, base, &steps, false).unwrap();

        let modifiers = &scene.object(base).unwrap().modifiers;
        assert_eq!(modifiers.len(), 2);
        assert!(matches!(
            modifiers[0],
            Modifier::Boolean {
                op: BooleanOp::Union,
                ..
            }
        ));
        assert!(matches!(
            modifiers[1],
            Modifier::Boolean {
                op: BooleanOp::Difference,
                ..
            }
        ));
    }

    #[test]
    fn baked_chain_leaves_no_modifiers() {
        let mut scene = Scene::new();
        let solver = BspSolver;
        let base = box_at(&mut scene, "base", 0.0);
        let a = box_at(&mut scene, "a", 1.5);
        let steps = [BooleanStep {
            op: BooleanOp::Union,
            operand: a,
        }];
        chain(&mut scene, &solver, base, &steps, true).unwrap();

        let obj = scene.object(base).unwrap();
        assert!(obj.modifiers.is_empty());
        // Union grew the authored mesh past the original box.
        assert!(obj.mesh.aabb().unwrap().dimensions().x > 2.0 + 1e-6);
    }

    #[test]
    fn perturbation_is_strictly_increasing_and_bounded() {
        let p = Perturbation::default();
        for i in 1..50 {
            assert!(p.factor(i) > p.factor(i - 1));
        }
        // Cumulative offset for 50 operands stays well under 1.0.
        assert!(p.factor(49) - p.base < 1.0);
    }
}
