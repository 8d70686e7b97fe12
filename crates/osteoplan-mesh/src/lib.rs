#![warn(missing_docs)]

//! Triangle mesh container and mesh-level operations for osteoplan.
//!
//! Provides the [`TriMesh`] type used throughout the pipeline, the
//! canonical solid templates the guide builders duplicate from, bevel and
//! decimation operations, and STL file I/O.

pub mod bevel;
pub mod decimate;
pub mod error;
pub mod primitives;
pub mod stl;

pub use bevel::bevel;
pub use decimate::decimate;
pub use error::{MeshError, MeshResult};

use osteoplan_math::{Mat4, Point3, Vec3};
use std::collections::HashMap;

/// An indexed triangle mesh in local (object) space.
///
/// Positions are f64 scene units (centimeters); triangles index into the
/// position array with counter-clockwise outward winding.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TriMesh {
    /// Vertex positions.
    pub positions: Vec<Point3>,
    /// Triangle vertex indices.
    pub triangles: Vec<[u32; 3]>,
}

impl TriMesh {
    /// Create an empty mesh.
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether the mesh has no triangles.
    pub fn is_empty(&self) -> bool {
        self.triangles.is_empty()
    }

    /// Number of triangles.
    pub fn triangle_count(&self) -> usize {
        self.triangles.len()
    }

    /// Number of vertices.
    pub fn vertex_count(&self) -> usize {
        self.positions.len()
    }

    /// Transform every vertex in place.
    pub fn transform(&mut self, m: &Mat4) {
        for p in &mut self.positions {
            *p = m.transform_point(p);
        }
    }

    /// Return a transformed copy.
    pub fn transformed(&self, m: &Mat4) -> Self {
        let mut out = self.clone();
        out.transform(m);
        out
    }

    /// Translate every vertex in place.
    pub fn translate(&mut self, offset: &Vec3) {
        for p in &mut self.positions {
            *p += offset;
        }
    }

    /// Median (arithmetic mean) of the vertex positions, or the origin
    /// for an empty mesh.
    pub fn median(&self) -> Vec3 {
        if self.positions.is_empty() {
            return Vec3::zeros();
        }
        let sum = self
            .positions
            .iter()
            .fold(Vec3::zeros(), |acc, p| acc + p.coords);
        sum / self.positions.len() as f64
    }

    /// Axis-aligned bounding box, or `None` for an empty mesh.
    pub fn aabb(&self) -> Option<Aabb> {
        Aabb::from_points(&self.positions)
    }

    /// Append another mesh's geometry to this one.
    pub fn merge(&mut self, other: &TriMesh) {
        let offset = self.positions.len() as u32;
        self.positions.extend_from_slice(&other.positions);
        self.triangles
            .extend(other.triangles.iter().map(|t| t.map(|i| i + offset)));
    }

    /// Outward normal of triangle `i` (not normalized).
    pub fn triangle_normal(&self, i: usize) -> Vec3 {
        let [a, b, c] = self.triangles[i];
        let pa = self.positions[a as usize];
        let pb = self.positions[b as usize];
        let pc = self.positions[c as usize];
        (pb - pa).cross(&(pc - pa))
    }

    /// Validate that the mesh is a closed manifold solid suitable for a
    /// boolean operand: non-empty, and every undirected edge shared by
    /// exactly two triangles with opposite orientation.
    pub fn validate_solid(&self) -> MeshResult<()> {
        if self.is_empty() {
            return Err(MeshError::EmptyMesh);
        }
        let mut edges: HashMap<(u32, u32), i32> = HashMap::new();
        for tri in &self.triangles {
            for k in 0..3 {
                let a = tri[k];
                let b = tri[(k + 1) % 3];
                // Count directed edges; a closed orientable surface nets
                // out to zero on every undirected edge.
                let (key, delta) = if a < b { ((a, b), 1) } else { ((b, a), -1) };
                *edges.entry(key).or_insert(0) += delta;
            }
        }
        for (edge, count) in &edges {
            if *count != 0 {
                return Err(MeshError::NonManifold(format!(
                    "edge ({}, {}) is not shared by matching opposite triangles",
                    edge.0, edge.1
                )));
            }
        }
        Ok(())
    }
}

/// Axis-aligned bounding box.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Aabb {
    /// Minimum corner.
    pub min: Point3,
    /// Maximum corner.
    pub max: Point3,
}

impl Aabb {
    /// Bounding box of a point set, or `None` when empty.
    pub fn from_points(points: &[Point3]) -> Option<Self> {
        let first = *points.first()?;
        let mut min = first;
        let mut max = first;
        for p in &points[1..] {
            for i in 0..3 {
                min[i] = min[i].min(p[i]);
                max[i] = max[i].max(p[i]);
            }
        }
        Some(Self { min, max })
    }

    /// Center point.
    pub fn center(&self) -> Point3 {
        nalgebra::center(&self.min, &self.max)
    }

    /// Extent along each axis.
    pub fn dimensions(&self) -> Vec3 {
        self.max - self.min
    }

    /// Whether this box overlaps another (shared boundary counts).
    pub fn overlaps(&self, other: &Aabb) -> bool {
        (0..3).all(|i| self.min[i] <= other.max[i] && other.min[i] <= self.max[i])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use osteoplan_math::Trs;

    #[test]
    fn empty_mesh_median_is_origin() {
        let mesh = TriMesh::new();
        assert!(mesh.is_empty());
        assert_eq!(mesh.median(), Vec3::zeros());
        assert!(mesh.aabb().is_none());
    }

    #[test]
    fn cube_is_closed_solid() {
        let cube = primitives::boxed(&Vec3::new(2.0, 2.0, 2.0));
        assert_eq!(cube.triangle_count(), 12);
        cube.validate_solid().expect("cube should be manifold");
    }

    #[test]
    fn open_surface_fails_validation() {
        let mut tri = TriMesh::new();
        tri.positions = vec![
            Point3::origin(),
            Point3::new(1.0, 0.0, 0.0),
            Point3::new(0.0, 1.0, 0.0),
        ];
        tri.triangles = vec![[0, 1, 2]];
        assert!(matches!(
            tri.validate_solid(),
            Err(MeshError::NonManifold(_))
        ));
    }

    #[test]
    fn transform_moves_aabb() {
        let mut cube = primitives::boxed(&Vec3::new(1.0, 1.0, 1.0));
        let m = Trs::from_translation(Vec3::new(5.0, 0.0, 0.0)).to_matrix();
        cube.transform(&m);
        let aabb = cube.aabb().unwrap();
        assert_relative_eq!(aabb.center().x, 5.0, epsilon = 1e-12);
    }

    #[test]
    fn merge_offsets_indices() {
        let mut a = primitives::boxed(&Vec3::new(1.0, 1.0, 1.0));
        let b = primitives::boxed(&Vec3::new(1.0, 1.0, 1.0));
        let verts = a.vertex_count() as u32;
        a.merge(&b);
        assert_eq!(a.triangle_count(), 24);
        assert!(a.triangles[12..].iter().flatten().all(|&i| i >= verts));
    }
}
