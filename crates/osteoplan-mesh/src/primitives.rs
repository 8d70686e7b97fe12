//! Canonical solid templates the pipeline duplicates from.
//!
//! The guide templates are deliberately simple closed solids; all
//! surgical specificity comes from the boolean chains applied to them,
//! not from the templates themselves.

use crate::TriMesh;
use osteoplan_math::{Point3, Vec3};

/// Full extent of the cutting-plane template along its thickness axis
/// (0.1 cm = 1 mm, so a thickness scale factor equals the blade
/// thickness in millimeters).
pub const CUTTING_PLANE_THICKNESS: f64 = 0.1;

/// In-plane extent of the cutting-plane template (cm).
pub const CUTTING_PLANE_EXTENT: f64 = 3.0;

/// Axis-aligned box centered at the origin with the given full extents.
pub fn boxed(size: &Vec3) -> TriMesh {
    let (hx, hy, hz) = (size.x / 2.0, size.y / 2.0, size.z / 2.0);
    box_from_corners(
        Point3::new(-hx, -hy, -hz),
        Point3::new(hx, hy, hz),
    )
}

/// Axis-aligned box spanning `min`..`max`.
pub fn box_from_corners(min: Point3, max: Point3) -> TriMesh {
    let positions = vec![
        Point3::new(min.x, min.y, min.z),
        Point3::new(max.x, min.y, min.z),
        Point3::new(max.x, max.y, min.z),
        Point3::new(min.x, max.y, min.z),
        Point3::new(min.x, min.y, max.z),
        Point3::new(max.x, min.y, max.z),
        Point3::new(max.x, max.y, max.z),
        Point3::new(min.x, max.y, max.z),
    ];
    let triangles = vec![
        // -Z
        [0, 3, 2],
        [0, 2, 1],
        // +Z
        [4, 5, 6],
        [4, 6, 7],
        // -Y
        [0, 1, 5],
        [0, 5, 4],
        // +Y
        [2, 3, 7],
        [2, 7, 6],
        // -X
        [0, 4, 7],
        [0, 7, 3],
        // +X
        [1, 2, 6],
        [1, 6, 5],
    ];
    TriMesh {
        positions,
        triangles,
    }
}

/// Cylinder along the Z axis, centered at the origin.
pub fn cylinder(radius: f64, depth: f64, segments: u32) -> TriMesh {
    let n = segments.max(3) as usize;
    let hz = depth / 2.0;
    let mut positions = Vec::with_capacity(2 * n + 2);
    for ring_z in [-hz, hz] {
        for i in 0..n {
            let theta = std::f64::consts::TAU * i as f64 / n as f64;
            positions.push(Point3::new(radius * theta.cos(), radius * theta.sin(), ring_z));
        }
    }
    let bottom_center = positions.len() as u32;
    positions.push(Point3::new(0.0, 0.0, -hz));
    let top_center = positions.len() as u32;
    positions.push(Point3::new(0.0, 0.0, hz));

    let mut triangles = Vec::with_capacity(4 * n);
    for i in 0..n as u32 {
        let j = (i + 1) % n as u32;
        let (bi, bj) = (i, j);
        let (ti, tj) = (i + n as u32, j + n as u32);
        triangles.push([bi, bj, tj]);
        triangles.push([bi, tj, ti]);
        triangles.push([bottom_center, bj, bi]);
        triangles.push([top_center, ti, tj]);
    }
    TriMesh {
        positions,
        triangles,
    }
}

/// Cutting-plane template covering the near side of a cut.
///
/// A thin box whose thickness runs along local Y, shifted half a
/// thickness toward +Y so the start/end pair together straddle the cut.
pub fn cutting_plane_start() -> TriMesh {
    let mut mesh = boxed(&Vec3::new(
        CUTTING_PLANE_EXTENT,
        CUTTING_PLANE_THICKNESS,
        CUTTING_PLANE_EXTENT,
    ));
    mesh.translate(&Vec3::new(0.0, CUTTING_PLANE_THICKNESS / 2.0, 0.0));
    mesh
}

/// Cutting-plane template covering the far side of a cut (mirror of
/// [`cutting_plane_start`] along Y).
pub fn cutting_plane_end() -> TriMesh {
    let mut mesh = boxed(&Vec3::new(
        CUTTING_PLANE_EXTENT,
        CUTTING_PLANE_THICKNESS,
        CUTTING_PLANE_EXTENT,
    ));
    mesh.translate(&Vec3::new(0.0, -CUTTING_PLANE_THICKNESS / 2.0, 0.0));
    mesh
}

/// Guide-shell template: a unit cube the guide builders scale and carve.
pub fn guide_template() -> TriMesh {
    boxed(&Vec3::new(1.0, 1.0, 1.0))
}

/// Partition-cell template spanning one joint pitch along +Y, together
/// with the vertex groups binding each end to its joint: `[lower,
/// upper]` index lists for the y=0 and y=pitch faces.
pub fn partition_cell(pitch: f64, half_extent: f64) -> (TriMesh, [Vec<u32>; 2]) {
    let mesh = box_from_corners(
        Point3::new(-half_extent, 0.0, -half_extent),
        Point3::new(half_extent, pitch, half_extent),
    );
    let mut lower = Vec::new();
    let mut upper = Vec::new();
    for (i, p) in mesh.positions.iter().enumerate() {
        if p.y < pitch / 2.0 {
            lower.push(i as u32);
        } else {
            upper.push(i as u32);
        }
    }
    (mesh, [lower, upper])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn boxed_is_closed() {
        boxed(&Vec3::new(1.0, 2.0, 3.0))
            .validate_solid()
            .expect("box is manifold");
    }

    #[test]
    fn cylinder_is_closed() {
        let cyl = cylinder(0.15, 4.0, 32);
        cyl.validate_solid().expect("cylinder is manifold");
        assert_eq!(cyl.triangle_count(), 4 * 32);
    }

    #[test]
    fn cutting_plane_pair_straddles_origin() {
        let start = cutting_plane_start().aabb().unwrap();
        let end = cutting_plane_end().aabb().unwrap();
        assert!(start.min.y.abs() < 1e-12);
        assert!(end.max.y.abs() < 1e-12);
    }

    #[test]
    fn partition_cell_groups_split_the_faces() {
        let (cell, [lower, upper]) = partition_cell(3.0, 2.0);
        assert_eq!(lower.len(), 4);
        assert_eq!(upper.len(), 4);
        assert!(lower.iter().all(|&i| cell.positions[i as usize].y == 0.0));
        assert!(upper.iter().all(|&i| cell.positions[i as usize].y == 3.0));
    }

    #[test]
    fn partition_cells_tile_the_axis() {
        // Adjacent cells share exactly their boundary plane.
        let (a, _) = partition_cell(3.0, 2.0);
        let mut b = a.clone();
        b.translate(&Vec3::new(0.0, 3.0, 0.0));
        let (aabb_a, aabb_b) = (a.aabb().unwrap(), b.aabb().unwrap());
        assert_eq!(aabb_a.max.y, aabb_b.min.y);
    }
}
