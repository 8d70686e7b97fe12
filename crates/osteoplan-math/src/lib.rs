#![warn(missing_docs)]

//! Math types for the osteoplan guide-generation kernel.
//!
//! Thin wrappers around nalgebra providing the domain-specific types the
//! planning pipeline works in: points, vectors, decomposed TRS transforms,
//! tracking rotations and tolerance constants.

use nalgebra::{Matrix3, Matrix4, Rotation3, Unit, UnitQuaternion, Vector3};

/// A point in 3D space (scene units are centimeters).
pub type Point3 = nalgebra::Point3<f64>;

/// A vector in 3D space.
pub type Vec3 = Vector3<f64>;

/// A unit (normalized) direction vector.
pub type Dir3 = Unit<Vector3<f64>>;

/// A 4x4 affine transformation matrix.
pub type Mat4 = Matrix4<f64>;

/// A rotation as a unit quaternion.
pub type Quat = UnitQuaternion<f64>;

/// A decomposed translation/rotation/scale transform.
///
/// Composition order is T·R·S: scale is applied first, then rotation,
/// then translation. This is the authored transform carried by every
/// scene object; world matrices are built by composing these down the
/// parent/constraint chain.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Trs {
    /// Translation component.
    pub translation: Vec3,
    /// Rotation component.
    pub rotation: Quat,
    /// Per-axis scale component.
    pub scale: Vec3,
}

impl Trs {
    /// Identity transform.
    pub fn identity() -> Self {
        Self {
            translation: Vec3::zeros(),
            rotation: Quat::identity(),
            scale: Vec3::new(1.0, 1.0, 1.0),
        }
    }

    /// Pure translation.
    pub fn from_translation(t: Vec3) -> Self {
        Self {
            translation: t,
            ..Self::identity()
        }
    }

    /// Pure rotation.
    pub fn from_rotation(r: Quat) -> Self {
        Self {
            rotation: r,
            ..Self::identity()
        }
    }

    /// Pure non-uniform scale.
    pub fn from_scale(s: Vec3) -> Self {
        Self {
            scale: s,
            ..Self::identity()
        }
    }

    /// Build the 4x4 matrix T·R·S.
    pub fn to_matrix(&self) -> Mat4 {
        let mut m = self.rotation.to_homogeneous();
        // Fold the scale into the rotation columns, then set translation.
        for col in 0..3 {
            let s = self.scale[col];
            for row in 0..3 {
                m[(row, col)] *= s;
            }
        }
        m[(0, 3)] = self.translation.x;
        m[(1, 3)] = self.translation.y;
        m[(2, 3)] = self.translation.z;
        m
    }

    /// Decompose an affine matrix back into T·R·S.
    ///
    /// Assumes the matrix carries no shear (products of TRS transforms
    /// along a parent chain stay decomposable as long as non-uniform
    /// scales are not mixed with intermediate rotations). A negative
    /// determinant is absorbed into the X scale.
    pub fn from_matrix(m: &Mat4) -> Self {
        let translation = Vec3::new(m[(0, 3)], m[(1, 3)], m[(2, 3)]);
        let a: Matrix3<f64> = m.fixed_view::<3, 3>(0, 0).into_owned();

        let mut scale = Vec3::new(
            a.column(0).norm(),
            a.column(1).norm(),
            a.column(2).norm(),
        );
        if a.determinant() < 0.0 {
            scale.x = -scale.x;
        }

        let mut rot = a;
        for col in 0..3 {
            let s = scale[col];
            if s.abs() > f64::EPSILON {
                for row in 0..3 {
                    rot[(row, col)] /= s;
                }
            }
        }
        let rotation = Quat::from_rotation_matrix(&Rotation3::from_matrix_unchecked(rot));

        Self {
            translation,
            rotation,
            scale,
        }
    }

    /// Transform a point by this TRS.
    pub fn transform_point(&self, p: &Point3) -> Point3 {
        let scaled = Point3::new(p.x * self.scale.x, p.y * self.scale.y, p.z * self.scale.z);
        self.rotation.transform_point(&scaled) + self.translation
    }
}

impl Default for Trs {
    fn default() -> Self {
        Self::identity()
    }
}

/// Rotation whose local +Y axis points along `dir`, keeping local Z as
/// close to world Z as the direction allows.
///
/// This is the orientation convention of the rig's vector empties: with
/// the joints at rest along +Y the tracking rotation is the identity.
pub fn track_rotation_y(dir: &Vec3) -> Quat {
    frame_rotation(dir, Axis::Y)
}

/// Rotation whose local +X axis points along `dir`, keeping local Z as
/// close to world Z as the direction allows.
///
/// Used for connector pieces spanning two guide origins.
pub fn track_rotation_x(dir: &Vec3) -> Quat {
    frame_rotation(dir, Axis::X)
}

enum Axis {
    X,
    Y,
}

fn frame_rotation(dir: &Vec3, track: Axis) -> Quat {
    let d = match Dir3::try_new(*dir, 1e-12) {
        Some(u) => u.into_inner(),
        None => return Quat::identity(),
    };

    // Up reference: world Z, falling back to world Y when the tracked
    // direction is (anti)parallel to Z.
    let up = if d.z.abs() > 1.0 - 1e-9 {
        Vec3::y()
    } else {
        Vec3::z()
    };
    let z = (up - d * up.dot(&d)).normalize();

    let m = match track {
        Axis::Y => {
            let x = d.cross(&z);
            Matrix3::from_columns(&[x, d, z])
        }
        Axis::X => {
            let y = z.cross(&d);
            Matrix3::from_columns(&[d, y, z])
        }
    };
    Quat::from_rotation_matrix(&Rotation3::from_matrix_unchecked(m))
}

/// Tolerance constants for geometric comparisons.
#[derive(Debug, Clone, Copy)]
pub struct Tolerance {
    /// Linear distance tolerance in scene units.
    pub linear: f64,
    /// Angular tolerance in radians.
    pub angular: f64,
}

impl Tolerance {
    /// Default tolerances (1e-6 linear, 1e-9 rad angular).
    pub const DEFAULT: Self = Self {
        linear: 1e-6,
        angular: 1e-9,
    };

    /// Check if two points are coincident within tolerance.
    pub fn points_equal(&self, a: &Point3, b: &Point3) -> bool {
        (a - b).norm() < self.linear
    }

    /// Check if a scalar distance is effectively zero.
    pub fn is_zero(&self, d: f64) -> bool {
        d.abs() < self.linear
    }
}

impl Default for Tolerance {
    fn default() -> Self {
        Self::DEFAULT
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use std::f64::consts::PI;

    #[test]
    fn trs_matrix_roundtrip() {
        let t = Trs {
            translation: Vec3::new(1.0, -2.0, 3.5),
            rotation: Quat::from_euler_angles(0.3, -0.1, 1.2),
            scale: Vec3::new(2.0, 0.5, 1.5),
        };
        let back = Trs::from_matrix(&t.to_matrix());
        assert_relative_eq!(back.translation, t.translation, epsilon = 1e-9);
        assert_relative_eq!(back.scale, t.scale, epsilon = 1e-9);
        let p = Point3::new(0.7, 1.3, -0.2);
        assert_relative_eq!(back.transform_point(&p), t.transform_point(&p), epsilon = 1e-9);
    }

    #[test]
    fn trs_transform_point_matches_matrix() {
        let t = Trs {
            translation: Vec3::new(4.0, 0.0, -1.0),
            rotation: Quat::from_euler_angles(0.0, PI / 2.0, 0.0),
            scale: Vec3::new(1.0, 3.0, 1.0),
        };
        let p = Point3::new(1.0, 1.0, 0.0);
        let via_matrix = t.to_matrix().transform_point(&p);
        assert_relative_eq!(t.transform_point(&p), via_matrix, epsilon = 1e-12);
    }

    #[test]
    fn track_y_at_rest_is_identity() {
        let q = track_rotation_y(&Vec3::y());
        assert!(q.angle_to(&Quat::identity()) < 1e-9);
    }

    #[test]
    fn track_y_points_y_axis_along_dir() {
        let dir = Vec3::new(1.0, 2.0, -0.5);
        let q = track_rotation_y(&dir);
        let y = q.transform_vector(&Vec3::y());
        assert_relative_eq!(y, dir.normalize(), epsilon = 1e-9);
    }

    #[test]
    fn track_x_points_x_axis_along_dir() {
        let dir = Vec3::new(-2.0, 1.0, 0.3);
        let q = track_rotation_x(&dir);
        let x = q.transform_vector(&Vec3::x());
        assert_relative_eq!(x, dir.normalize(), epsilon = 1e-9);
        // Z stays as upright as the direction allows.
        let z = q.transform_vector(&Vec3::z());
        assert!(z.z > 0.9);
    }

    #[test]
    fn track_degenerate_direction_is_identity() {
        let q = track_rotation_y(&Vec3::zeros());
        assert_eq!(q, Quat::identity());
    }

    #[test]
    fn negative_determinant_absorbed_into_x() {
        let t = Trs::from_scale(Vec3::new(-2.0, 1.0, 1.0));
        let back = Trs::from_matrix(&t.to_matrix());
        assert_relative_eq!(back.scale.x, -2.0, epsilon = 1e-9);
    }
}
