//! BSP-backed implementation of the [`BooleanSolver`] seam.

use crate::bsp::{Node, Polygon};
use crate::{BooleanOp, BooleanResult, BooleanSolver};
use osteoplan_mesh::TriMesh;

/// Boolean solver based on mutual BSP-tree clipping.
#[derive(Debug, Default, Clone, Copy)]
pub struct BspSolver;

impl BooleanSolver for BspSolver {
    // Operands are assumed to be manifold solids (validated where user
    // meshes enter the pipeline); BSP clipping output may contain
    // T-vertices, which downstream chaining tolerates.
    fn evaluate(
        &self,
        base: &TriMesh,
        operand: &TriMesh,
        op: BooleanOp,
    ) -> BooleanResult<TriMesh> {
        // Empty-operand shortcuts mirror the identities of the ops.
        if base.is_empty() {
            return Ok(match op {
                BooleanOp::Union => operand.clone(),
                BooleanOp::Difference | BooleanOp::Intersect => TriMesh::new(),
            });
        }
        if operand.is_empty() {
            return Ok(match op {
                BooleanOp::Union | BooleanOp::Difference => base.clone(),
                BooleanOp::Intersect => TriMesh::new(),
            });
        }

        let mut a = Node::new(&to_polygons(base));
        let mut b = Node::new(&to_polygons(operand));

        match op {
            BooleanOp::Union => {
                a.clip_to(&b);
                b.clip_to(&a);
                b.invert();
                b.clip_to(&a);
                b.invert();
                a.build(&b.all_polygons());
            }
            BooleanOp::Difference => {
                a.invert();
                a.clip_to(&b);
                b.clip_to(&a);
                b.invert();
                b.clip_to(&a);
                b.invert();
                a.build(&b.all_polygons());
                a.invert();
            }
            BooleanOp::Intersect => {
                a.invert();
                b.clip_to(&a);
                b.invert();
                a.clip_to(&b);
                b.clip_to(&a);
                a.build(&b.all_polygons());
                a.invert();
            }
        }

        Ok(from_polygons(&a.all_polygons()))
    }
}

fn to_polygons(mesh: &TriMesh) -> Vec<Polygon> {
    mesh.triangles
        .iter()
        .filter_map(|tri| {
            Polygon::new(vec![
                mesh.positions[tri[0] as usize],
                mesh.positions[tri[1] as usize],
                mesh.positions[tri[2] as usize],
            ])
        })
        .collect()
}

/// Fan-triangulate clipped polygons back into an indexed mesh.
fn from_polygons(polygons: &[Polygon]) -> TriMesh {
    let mut mesh = TriMesh::new();
    for polygon in polygons {
        let base = mesh.positions.len() as u32;
        mesh.positions.extend_from_slice(&polygon.vertices);
        for i in 1..polygon.vertices.len() as u32 - 1 {
            mesh.triangles.push([base, base + i, base + i + 1]);
        }
    }
    mesh
}

#[cfg(test)]
mod tests {
    use super::*;
    use osteoplan_math::Vec3;
    use osteoplan_mesh::primitives::boxed;

    fn shifted(mesh: &TriMesh, offset: Vec3) -> TriMesh {
        let mut out = mesh.clone();
        out.translate(&offset);
        out
    }

    #[test]
    fn union_of_disjoint_boxes_keeps_both() {
        let solver = BspSolver;
        let a = boxed(&Vec3::new(1.0, 1.0, 1.0));
        let b = shifted(&a, Vec3::new(5.0, 0.0, 0.0));
        let out = solver.evaluate(&a, &b, BooleanOp::Union).unwrap();
        let aabb = out.aabb().unwrap();
        assert!(aabb.dimensions().x > 5.0);
    }

    #[test]
    fn intersection_of_disjoint_boxes_is_empty() {
        let solver = BspSolver;
        let a = boxed(&Vec3::new(1.0, 1.0, 1.0));
        let b = shifted(&a, Vec3::new(5.0, 0.0, 0.0));
        let out = solver.evaluate(&a, &b, BooleanOp::Intersect).unwrap();
        assert!(out.is_empty());
    }

    #[test]
    fn intersection_of_overlapping_boxes_bounds() {
        let solver = BspSolver;
        let a = boxed(&Vec3::new(2.0, 2.0, 2.0));
        let b = shifted(&a, Vec3::new(1.0, 0.0, 0.0));
        let out = solver.evaluate(&a, &b, BooleanOp::Intersect).unwrap();
        let aabb = out.aabb().unwrap();
        assert!((aabb.dimensions().x - 1.0).abs() < 1e-6);
        assert!((aabb.dimensions().y - 2.0).abs() < 1e-6);
    }

    #[test]
    fn difference_carves_the_operand_away() {
        let solver = BspSolver;
        let a = boxed(&Vec3::new(2.0, 2.0, 2.0));
        let b = shifted(&boxed(&Vec3::new(2.0, 2.0, 2.0)), Vec3::new(1.5, 0.0, 0.0));
        let out = solver.evaluate(&a, &b, BooleanOp::Difference).unwrap();
        let aabb = out.aabb().unwrap();
        assert!(aabb.max.x <= 0.5 + 1e-6);
    }

    #[test]
    fn difference_is_not_commutative() {
        let solver = BspSolver;
        let a = boxed(&Vec3::new(2.0, 2.0, 2.0));
        let b = shifted(&boxed(&Vec3::new(2.0, 2.0, 2.0)), Vec3::new(1.5, 0.0, 0.0));
        let ab = solver.evaluate(&a, &b, BooleanOp::Difference).unwrap();
        let ba = solver.evaluate(&b, &a, BooleanOp::Difference).unwrap();
        let (ab_box, ba_box) = (ab.aabb().unwrap(), ba.aabb().unwrap());
        assert!(ab_box.center().x < ba_box.center().x);
    }

    #[test]
    fn empty_operand_shortcuts() {
        let solver = BspSolver;
        let a = boxed(&Vec3::new(1.0, 1.0, 1.0));
        let empty = TriMesh::new();
        assert_eq!(
            solver
                .evaluate(&a, &empty, BooleanOp::Union)
                .unwrap()
                .triangle_count(),
            a.triangle_count()
        );
        assert!(solver
            .evaluate(&a, &empty, BooleanOp::Intersect)
            .unwrap()
            .is_empty());
        assert!(solver
            .evaluate(&empty, &a, BooleanOp::Difference)
            .unwrap()
            .is_empty());
    }
}
