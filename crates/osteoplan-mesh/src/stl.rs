//! STL file I/O.
//!
//! Binary STL read/write via the `stl_io` crate. Reading reuses the
//! indexed form `stl_io` produces; writing emits one triangle record per
//! face with a freshly computed normal.

use crate::{MeshError, MeshResult, TriMesh};
use osteoplan_math::Point3;
use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::Path;
use tracing::info;

/// Load a triangle mesh from an STL file (binary or ASCII).
pub fn read_stl(path: &Path) -> MeshResult<TriMesh> {
    let mut file = File::open(path).map_err(|e| MeshError::IoRead {
        path: path.to_path_buf(),
        source: e,
    })?;
    let stl = stl_io::read_stl(&mut file).map_err(|e| MeshError::IoRead {
        path: path.to_path_buf(),
        source: e,
    })?;

    let positions = stl
        .vertices
        .iter()
        .map(|v| Point3::new(v[0] as f64, v[1] as f64, v[2] as f64))
        .collect();
    let triangles = stl
        .faces
        .iter()
        .map(|f| {
            [
                f.vertices[0] as u32,
                f.vertices[1] as u32,
                f.vertices[2] as u32,
            ]
        })
        .collect();

    let mesh = TriMesh {
        positions,
        triangles,
    };
    info!(
        path = %path.display(),
        vertices = mesh.vertex_count(),
        triangles = mesh.triangle_count(),
        "loaded STL"
    );
    Ok(mesh)
}

/// Write a triangle mesh to a binary STL file, replacing any existing
/// file at `path`.
pub fn write_stl(mesh: &TriMesh, path: &Path) -> MeshResult<()> {
    let file = OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .open(path)
        .map_err(|e| MeshError::IoWrite {
            path: path.to_path_buf(),
            source: e,
        })?;
    let mut writer = BufWriter::new(file);

    let triangles: Vec<stl_io::Triangle> = mesh
        .triangles
        .iter()
        .enumerate()
        .map(|(i, tri)| {
            let n = mesh.triangle_normal(i);
            let n = if n.norm() > 1e-15 {
                n.normalize()
            } else {
                n
            };
            let vertex = |idx: u32| {
                let p = mesh.positions[idx as usize];
                stl_io::Vertex::new([p.x as f32, p.y as f32, p.z as f32])
            };
            stl_io::Triangle {
                normal: stl_io::Normal::new([n.x as f32, n.y as f32, n.z as f32]),
                vertices: [vertex(tri[0]), vertex(tri[1]), vertex(tri[2])],
            }
        })
        .collect();

    stl_io::write_stl(&mut writer, triangles.iter()).map_err(|e| MeshError::IoWrite {
        path: path.to_path_buf(),
        source: e,
    })?;
    writer.flush().map_err(|e| MeshError::IoWrite {
        path: path.to_path_buf(),
        source: e,
    })?;

    info!(
        path = %path.display(),
        triangles = mesh.triangle_count(),
        "wrote STL"
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::primitives::boxed;
    use osteoplan_math::Vec3;

    fn temp_path(name: &str) -> std::path::PathBuf {
        let mut dir = std::env::temp_dir();
        dir.push(format!("osteoplan-stl-{}-{}", std::process::id(), name));
        dir
    }

    #[test]
    fn stl_roundtrip_preserves_triangles() {
        let cube = boxed(&Vec3::new(2.0, 3.0, 4.0));
        let path = temp_path("roundtrip.stl");
        write_stl(&cube, &path).unwrap();
        let back = read_stl(&path).unwrap();
        std::fs::remove_file(&path).ok();

        assert_eq!(back.triangle_count(), cube.triangle_count());
        let (a, b) = (cube.aabb().unwrap(), back.aabb().unwrap());
        assert!((a.dimensions() - b.dimensions()).norm() < 1e-4);
    }

    #[test]
    fn read_missing_file_is_io_error() {
        let err = read_stl(Path::new("/nonexistent/osteoplan.stl")).unwrap_err();
        assert!(matches!(err, MeshError::IoRead { .. }));
    }
}
