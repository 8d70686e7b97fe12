//! Polygon-count reduction by greedy shortest-edge collapse.
//!
//! Used when oversized scan meshes are taken in at rig initialization:
//! collapsing the shortest edges first removes scanner noise while
//! keeping the bone silhouette.

use crate::{MeshError, MeshResult, TriMesh};
use std::collections::HashSet;
use tracing::debug;

/// Reduce `mesh` to roughly `ratio` of its triangle count.
///
/// `ratio` must lie in (0, 1]; a ratio of 1 returns the mesh unchanged.
pub fn decimate(mesh: &TriMesh, ratio: f64) -> MeshResult<TriMesh> {
    if !(ratio > 0.0 && ratio <= 1.0) {
        return Err(MeshError::InvalidRatio(ratio));
    }
    if ratio >= 1.0 || mesh.is_empty() {
        return Ok(mesh.clone());
    }

    let target = ((mesh.triangle_count() as f64 * ratio).ceil() as usize).max(4);
    let mut current = mesh.clone();

    while current.triangle_count() > target {
        let collapsed = collapse_pass(&current, current.triangle_count() - target);
        if collapsed.triangle_count() == current.triangle_count() {
            // No further progress possible without degenerating.
            break;
        }
        current = collapsed;
    }

    debug!(
        before = mesh.triangle_count(),
        after = current.triangle_count(),
        ratio,
        "decimated mesh"
    );
    Ok(current)
}

/// Run one greedy pass collapsing up to `budget` short edges whose
/// endpoints have not been touched yet this pass.
fn collapse_pass(mesh: &TriMesh, budget: usize) -> TriMesh {
    let mut edges: Vec<(f64, u32, u32)> = Vec::new();
    let mut seen: HashSet<(u32, u32)> = HashSet::new();
    for tri in &mesh.triangles {
        for k in 0..3 {
            let a = tri[k];
            let b = tri[(k + 1) % 3];
            let key = if a < b { (a, b) } else { (b, a) };
            if seen.insert(key) {
                let len =
                    (mesh.positions[key.0 as usize] - mesh.positions[key.1 as usize]).norm();
                edges.push((len, key.0, key.1));
            }
        }
    }
    edges.sort_by(|x, y| x.0.total_cmp(&y.0));

    // Remap each collapsed vertex onto its partner, midpointing the
    // survivor. Touched vertices are frozen for the rest of the pass so
    // collapses stay independent.
    let mut remap: Vec<u32> = (0..mesh.vertex_count() as u32).collect();
    let mut positions = mesh.positions.clone();
    let mut touched: HashSet<u32> = HashSet::new();
    let mut collapsed = 0usize;
    for (_, a, b) in edges {
        if collapsed >= budget {
            break;
        }
        if touched.contains(&a) || touched.contains(&b) {
            continue;
        }
        positions[a as usize] = nalgebra::center(&positions[a as usize], &positions[b as usize]);
        remap[b as usize] = a;
        touched.insert(a);
        touched.insert(b);
        // Each interior edge collapse removes two triangles.
        collapsed += 2;
    }

    // Rebuild triangles, dropping the ones that became degenerate.
    let mut triangles = Vec::with_capacity(mesh.triangle_count());
    for tri in &mesh.triangles {
        let t = tri.map(|i| remap[i as usize]);
        if t[0] != t[1] && t[1] != t[2] && t[0] != t[2] {
            triangles.push(t);
        }
    }

    compact(TriMesh {
        positions,
        triangles,
    })
}

/// Drop unreferenced vertices and reindex.
fn compact(mesh: TriMesh) -> TriMesh {
    let mut used: Vec<bool> = vec![false; mesh.vertex_count()];
    for tri in &mesh.triangles {
        for &i in tri {
            used[i as usize] = true;
        }
    }
    let mut new_index: Vec<u32> = vec![0; mesh.vertex_count()];
    let mut positions = Vec::new();
    for (i, keep) in used.iter().enumerate() {
        if *keep {
            new_index[i] = positions.len() as u32;
            positions.push(mesh.positions[i]);
        }
    }
    let triangles = mesh
        .triangles
        .iter()
        .map(|tri| tri.map(|i| new_index[i as usize]))
        .collect();
    TriMesh {
        positions,
        triangles,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::primitives::cylinder;

    #[test]
    fn ratio_one_is_identity() {
        let cyl = cylinder(1.0, 4.0, 24);
        let out = decimate(&cyl, 1.0).unwrap();
        assert_eq!(out.triangle_count(), cyl.triangle_count());
    }

    #[test]
    fn invalid_ratio_rejected() {
        let cyl = cylinder(1.0, 4.0, 8);
        assert!(matches!(
            decimate(&cyl, 0.0),
            Err(MeshError::InvalidRatio(_))
        ));
        assert!(matches!(
            decimate(&cyl, 1.5),
            Err(MeshError::InvalidRatio(_))
        ));
    }

    #[test]
    fn decimate_reduces_triangle_count() {
        let cyl = cylinder(1.0, 4.0, 64);
        let before = cyl.triangle_count();
        let out = decimate(&cyl, 0.5).unwrap();
        assert!(out.triangle_count() < before);
        assert!(!out.is_empty());
    }

    #[test]
    fn decimate_compacts_vertices() {
        let cyl = cylinder(1.0, 4.0, 48);
        let out = decimate(&cyl, 0.4).unwrap();
        let max_index = out.triangles.iter().flatten().copied().max().unwrap();
        assert!((max_index as usize) < out.vertex_count());
    }
}
