//! World-transform and mesh evaluation.
//!
//! Everything here is pull-based: world matrices re-evaluate the
//! constraint stack on every call, and effective geometry is produced
//! only by an explicit evaluate or bake. Boolean and bevel modifiers are
//! evaluated in world space, then results are brought back to the
//! owner's local frame.

use crate::{
    Constraint, ConstraintTarget, Modifier, ObjectId, ParentLink, Scene, SceneError, SceneResult,
};
use osteoplan_booleans::BooleanSolver;
use osteoplan_math::{track_rotation_y, Mat4, Trs, Vec3};
use osteoplan_mesh::{bevel, decimate, TriMesh};

impl Scene {
    /// Effective world matrix of an object: parent chain, then
    /// constraints in attachment order.
    pub fn world_matrix(&self, id: ObjectId) -> SceneResult<Mat4> {
        let mut stack = Vec::new();
        self.world_matrix_inner(id, &mut stack)
    }

    fn world_matrix_inner(&self, id: ObjectId, stack: &mut Vec<ObjectId>) -> SceneResult<Mat4> {
        if stack.contains(&id) {
            let name = self.object(id)?.name.clone();
            return Err(SceneError::DependencyCycle(name));
        }
        stack.push(id);

        let obj = self.object(id)?;
        let local = obj.transform.to_matrix();
        let mut world = match &obj.parent {
            Some(ParentLink::Object {
                target,
                parent_inverse,
            }) => self.world_matrix_inner(*target, stack)? * parent_inverse * local,
            // Deform parenting moves vertices, not the object transform.
            Some(ParentLink::ArmatureDeform) | None => local,
        };

        for constraint in &obj.constraints {
            world = match constraint {
                Constraint::ChildOf { target } => self.target_world(target, stack)? * local,
                Constraint::CopyRotation { target } => {
                    let target_world = self.world_matrix_inner(*target, stack)?;
                    let mut own = Trs::from_matrix(&world);
                    own.rotation = Trs::from_matrix(&target_world).rotation;
                    own.to_matrix()
                }
                Constraint::TrackTo { target } => {
                    let target_world = self.target_world(target, stack)?;
                    let target_pos = Vec3::new(
                        target_world[(0, 3)],
                        target_world[(1, 3)],
                        target_world[(2, 3)],
                    );
                    let mut own = Trs::from_matrix(&world);
                    own.rotation = track_rotation_y(&(target_pos - own.translation));
                    own.to_matrix()
                }
            };
        }

        stack.pop();
        Ok(world)
    }

    fn target_world(
        &self,
        target: &ConstraintTarget,
        stack: &mut Vec<ObjectId>,
    ) -> SceneResult<Mat4> {
        match target {
            ConstraintTarget::Object(id) => self.world_matrix_inner(*id, stack),
            ConstraintTarget::Joint(index) => self.armature()?.joint_world(*index),
        }
    }

    /// The object's mesh after armature deform, still in local space and
    /// before any modifiers.
    ///
    /// Joint deltas act in armature space, so grouped vertices are taken
    /// through the object's local transform, deformed, and brought back.
    pub fn deformed_mesh(&self, id: ObjectId) -> SceneResult<TriMesh> {
        let obj = self.object(id)?;
        let mut mesh = obj.mesh.clone();
        if matches!(obj.parent, Some(ParentLink::ArmatureDeform)) {
            let armature = self.armature()?;
            let local = obj.transform.to_matrix();
            let local_inv = local
                .try_inverse()
                .ok_or_else(|| SceneError::NotInvertible(obj.name.clone()))?;
            for group in &obj.vertex_groups {
                let delta = local_inv * armature.joint_delta(group.joint)? * local;
                for &vi in &group.vertices {
                    if let Some(p) = mesh.positions.get_mut(vi as usize) {
                        *p = delta.transform_point(p);
                    }
                }
            }
        }
        Ok(mesh)
    }

    /// Fully evaluated geometry in world space: deform, world transform,
    /// then the modifier stack in attachment order.
    pub fn evaluated_world_mesh(
        &self,
        id: ObjectId,
        solver: &dyn BooleanSolver,
    ) -> SceneResult<TriMesh> {
        let mut stack = Vec::new();
        self.eval_world(id, solver, &mut stack)
    }

    fn eval_world(
        &self,
        id: ObjectId,
        solver: &dyn BooleanSolver,
        stack: &mut Vec<ObjectId>,
    ) -> SceneResult<TriMesh> {
        if stack.contains(&id) {
            let name = self.object(id)?.name.clone();
            return Err(SceneError::DependencyCycle(name));
        }
        stack.push(id);

        let world = self.world_matrix(id)?;
        let mut mesh = self.deformed_mesh(id)?;
        mesh.transform(&world);

        let modifiers = self.object(id)?.modifiers.clone();
        for modifier in &modifiers {
            mesh = self.apply_one(mesh, modifier, solver, stack)?;
        }

        stack.pop();
        Ok(mesh)
    }

    fn apply_one(
        &self,
        mesh: TriMesh,
        modifier: &Modifier,
        solver: &dyn BooleanSolver,
        stack: &mut Vec<ObjectId>,
    ) -> SceneResult<TriMesh> {
        Ok(match modifier {
            Modifier::Boolean { op, operand } => {
                let operand_mesh = self.eval_world(*operand, solver, stack)?;
                solver.evaluate(&mesh, &operand_mesh, *op)?
            }
            Modifier::Bevel { segments, width } => bevel(&mesh, *segments, *width),
            Modifier::Decimate { ratio } => decimate(&mesh, *ratio)?,
        })
    }

    /// Fully evaluated geometry brought back into the object's local
    /// frame.
    pub fn evaluated_local_mesh(
        &self,
        id: ObjectId,
        solver: &dyn BooleanSolver,
    ) -> SceneResult<TriMesh> {
        let world = self.world_matrix(id)?;
        let inv = world
            .try_inverse()
            .ok_or_else(|| SceneError::NotInvertible(self.object(id).map(|o| o.name.clone()).unwrap_or_default()))?;
        let mut mesh = self.evaluated_world_mesh(id, solver)?;
        mesh.transform(&inv);
        Ok(mesh)
    }

    /// Bake the first `count` modifiers into the authored mesh,
    /// removing them from the stack. Baking zero modifiers is a no-op.
    pub fn apply_modifiers(
        &mut self,
        id: ObjectId,
        count: usize,
        solver: &dyn BooleanSolver,
    ) -> SceneResult<()> {
        let obj = self.object(id)?;
        let count = count.min(obj.modifiers.len());
        if count == 0 {
            return Ok(());
        }
        let to_apply: Vec<Modifier> = obj.modifiers[..count].to_vec();

        let world = self.world_matrix(id)?;
        let inv = world
            .try_inverse()
            .ok_or_else(|| SceneError::NotInvertible(obj.name.clone()))?;

        let mut mesh = self.deformed_mesh(id)?;
        mesh.transform(&world);
        let mut stack = vec![id];
        for modifier in &to_apply {
            mesh = self.apply_one(mesh, modifier, solver, &mut stack)?;
        }
        mesh.transform(&inv);

        let obj = self.object_mut(id)?;
        obj.mesh = mesh;
        obj.modifiers.drain(..count);
        Ok(())
    }

    /// Bake the whole modifier stack.
    pub fn apply_all_modifiers(
        &mut self,
        id: ObjectId,
        solver: &dyn BooleanSolver,
    ) -> SceneResult<()> {
        let count = self.object(id)?.modifiers.len();
        self.apply_modifiers(id, count, solver)
    }
}
