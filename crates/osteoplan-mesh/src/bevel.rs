//! Edge rounding for printable guide shells.
//!
//! Approximates a round-over by clamped rounding of vertices that sit on
//! sharp edges: each pass pulls sharp-edge vertices toward the centroid
//! of their one-ring, moving at most `width / segments` per pass.
//! Connectivity is untouched, so a manifold input stays manifold.

use crate::TriMesh;
use osteoplan_math::Vec3;
use std::collections::{HashMap, HashSet};

/// Dihedral angle (radians) above which an edge counts as sharp.
const SHARP_ANGLE: f64 = 0.52; // ~30 degrees

/// Round the sharp edges of `mesh`.
///
/// `segments` controls how many smoothing passes run; `width` bounds the
/// total distance any vertex moves. With zero segments or a non-positive
/// width the mesh is returned unchanged.
pub fn bevel(mesh: &TriMesh, segments: u32, width: f64) -> TriMesh {
    if segments == 0 || width <= 0.0 || mesh.is_empty() {
        return mesh.clone();
    }

    let sharp_verts = sharp_edge_vertices(mesh);
    if sharp_verts.is_empty() {
        return mesh.clone();
    }
    let neighbors = vertex_neighbors(mesh);

    let mut out = mesh.clone();
    let step = width / segments as f64;
    for _ in 0..segments {
        let snapshot = out.positions.clone();
        for &v in &sharp_verts {
            let ring = &neighbors[v as usize];
            if ring.is_empty() {
                continue;
            }
            let centroid = ring
                .iter()
                .fold(Vec3::zeros(), |acc, &n| acc + snapshot[n as usize].coords)
                / ring.len() as f64;
            let delta = centroid - snapshot[v as usize].coords;
            let dist = delta.norm();
            if dist < 1e-12 {
                continue;
            }
            let move_by = dist.min(step);
            out.positions[v as usize] += delta / dist * move_by;
        }
    }
    out
}

/// Vertices incident to at least one sharp edge.
fn sharp_edge_vertices(mesh: &TriMesh) -> Vec<u32> {
    // Map each undirected edge to its incident triangle normals.
    let mut edge_faces: HashMap<(u32, u32), Vec<Vec3>> = HashMap::new();
    for (ti, tri) in mesh.triangles.iter().enumerate() {
        let n = mesh.triangle_normal(ti);
        if n.norm() < 1e-15 {
            continue;
        }
        let n = n.normalize();
        for k in 0..3 {
            let a = tri[k];
            let b = tri[(k + 1) % 3];
            let key = if a < b { (a, b) } else { (b, a) };
            edge_faces.entry(key).or_default().push(n);
        }
    }

    let mut sharp: HashSet<u32> = HashSet::new();
    for ((a, b), normals) in &edge_faces {
        if normals.len() != 2 {
            continue;
        }
        let cos = normals[0].dot(&normals[1]).clamp(-1.0, 1.0);
        if cos.acos() > SHARP_ANGLE {
            sharp.insert(*a);
            sharp.insert(*b);
        }
    }
    let mut sharp: Vec<u32> = sharp.into_iter().collect();
    sharp.sort_unstable();
    sharp
}

/// One-ring neighbor lists per vertex.
fn vertex_neighbors(mesh: &TriMesh) -> Vec<Vec<u32>> {
    let mut neighbors: Vec<HashSet<u32>> = vec![HashSet::new(); mesh.vertex_count()];
    for tri in &mesh.triangles {
        for k in 0..3 {
            let a = tri[k] as usize;
            let b = tri[(k + 1) % 3];
            neighbors[a].insert(b);
            neighbors[b as usize].insert(tri[k]);
        }
    }
    neighbors
        .into_iter()
        .map(|set| {
            let mut v: Vec<u32> = set.into_iter().collect();
            v.sort_unstable();
            v
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::primitives::boxed;

    #[test]
    fn zero_segments_is_noop() {
        let cube = boxed(&Vec3::new(1.0, 1.0, 1.0));
        assert_eq!(bevel(&cube, 0, 0.1), cube);
        assert_eq!(bevel(&cube, 2, 0.0), cube);
    }

    #[test]
    fn bevel_shrinks_cube_corners() {
        let cube = boxed(&Vec3::new(2.0, 2.0, 2.0));
        let rounded = bevel(&cube, 2, 0.2);
        let before = cube.aabb().unwrap().dimensions();
        let after = rounded.aabb().unwrap().dimensions();
        assert!(after.x < before.x);
        assert!(after.y < before.y);
        assert!(after.z < before.z);
    }

    #[test]
    fn bevel_preserves_manifoldness() {
        let cube = boxed(&Vec3::new(2.0, 1.0, 3.0));
        bevel(&cube, 3, 0.3).validate_solid().expect("still closed");
    }

    #[test]
    fn bevel_movement_bounded_by_width() {
        let cube = boxed(&Vec3::new(2.0, 2.0, 2.0));
        let rounded = bevel(&cube, 4, 0.1);
        for (a, b) in cube.positions.iter().zip(&rounded.positions) {
            assert!((a - b).norm() <= 0.1 + 1e-9);
        }
    }
}
