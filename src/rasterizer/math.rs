//! Vector and matrix math for 3D rendering
//!
//! Matrices are 3×3, row-major, and applied to column vectors (`M · v`).
//! Translation is never folded into a matrix: rotate first, then add.

use serde::{Deserialize, Serialize};
use std::ops::{Add, AddAssign, Mul, Neg, Sub};

use super::fixed::{cosine, sine};

/// 3D Vector
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Vec3 {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl Vec3 {
    pub const ZERO: Vec3 = Vec3 { x: 0.0, y: 0.0, z: 0.0 };
    pub const UP: Vec3 = Vec3 { x: 0.0, y: 1.0, z: 0.0 };

    pub const fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }

    pub fn dot(self, other: Vec3) -> f32 {
        self.x * other.x + self.y * other.y + self.z * other.z
    }

    pub fn cross(self, other: Vec3) -> Vec3 {
        Vec3 {
            x: self.y * other.z - self.z * other.y,
            y: self.z * other.x - self.x * other.z,
            z: self.x * other.y - self.y * other.x,
        }
    }

    pub fn len(self) -> f32 {
        self.dot(self).sqrt()
    }

    /// Unit vector in the same direction. A zero-length vector is returned unchanged.
    pub fn normalize(self) -> Vec3 {
        let l = self.len();
        if l == 0.0 {
            return self;
        }
        Vec3 {
            x: self.x / l,
            y: self.y / l,
            z: self.z / l,
        }
    }

    pub fn scale(self, s: f32) -> Vec3 {
        Vec3 {
            x: self.x * s,
            y: self.y * s,
            z: self.z * s,
        }
    }

    /// Linear interpolation toward `other`
    pub fn lerp(self, other: Vec3, t: f32) -> Vec3 {
        self + (other - self) * t
    }

    /// Bit-exact equality (distinguishes 0.0 from -0.0, never equal for NaN payload mismatch)
    pub fn bits_eq(self, other: Vec3) -> bool {
        self.x.to_bits() == other.x.to_bits()
            && self.y.to_bits() == other.y.to_bits()
            && self.z.to_bits() == other.z.to_bits()
    }
}

impl Add for Vec3 {
    type Output = Vec3;
    fn add(self, other: Vec3) -> Vec3 {
        Vec3 {
            x: self.x + other.x,
            y: self.y + other.y,
            z: self.z + other.z,
        }
    }
}

impl AddAssign for Vec3 {
    fn add_assign(&mut self, other: Vec3) {
        *self = *self + other;
    }
}

impl Sub for Vec3 {
    type Output = Vec3;
    fn sub(self, other: Vec3) -> Vec3 {
        Vec3 {
            x: self.x - other.x,
            y: self.y - other.y,
            z: self.z - other.z,
        }
    }
}

impl Mul<f32> for Vec3 {
    type Output = Vec3;
    fn mul(self, s: f32) -> Vec3 {
        self.scale(s)
    }
}

impl Neg for Vec3 {
    type Output = Vec3;
    fn neg(self) -> Vec3 {
        self.scale(-1.0)
    }
}

/// 2D Vector (for texture coordinates)
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Vec2 {
    pub x: f32,
    pub y: f32,
}

impl Vec2 {
    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    pub fn lerp(self, other: Vec2, t: f32) -> Vec2 {
        Vec2::new(self.x + (other.x - self.x) * t, self.y + (other.y - self.y) * t)
    }
}

// =============================================================================
// 3x3 Matrix operations
// =============================================================================

/// 3×3 row-major rotation matrix
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Mat3(pub [[f32; 3]; 3]);

impl Default for Mat3 {
    fn default() -> Self {
        Mat3::IDENTITY
    }
}

impl Mat3 {
    pub const IDENTITY: Mat3 = Mat3([
        [1.0, 0.0, 0.0],
        [0.0, 1.0, 0.0],
        [0.0, 0.0, 1.0],
    ]);

    /// Rotation about X by `angle` units
    pub fn rotation_x(angle: i32) -> Mat3 {
        let (s, c) = (sine(angle), cosine(angle));
        Mat3([
            [1.0, 0.0, 0.0],
            [0.0, c, -s],
            [0.0, s, c],
        ])
    }

    /// Rotation about Y by `angle` units
    pub fn rotation_y(angle: i32) -> Mat3 {
        let (s, c) = (sine(angle), cosine(angle));
        Mat3([
            [c, 0.0, s],
            [0.0, 1.0, 0.0],
            [-s, 0.0, c],
        ])
    }

    /// Rotation about Z by `angle` units
    pub fn rotation_z(angle: i32) -> Mat3 {
        let (s, c) = (sine(angle), cosine(angle));
        Mat3([
            [c, -s, 0.0],
            [s, c, 0.0],
            [0.0, 0.0, 1.0],
        ])
    }

    /// Row-major product `self · other`
    pub fn mul(&self, other: &Mat3) -> Mat3 {
        let a = &self.0;
        let b = &other.0;
        let mut r = [[0.0f32; 3]; 3];
        for (i, row) in r.iter_mut().enumerate() {
            for (j, cell) in row.iter_mut().enumerate() {
                *cell = a[i][0] * b[0][j] + a[i][1] * b[1][j] + a[i][2] * b[2][j];
            }
        }
        Mat3(r)
    }

    pub fn transform(&self, v: Vec3) -> Vec3 {
        let m = &self.0;
        Vec3::new(
            m[0][0] * v.x + m[0][1] * v.y + m[0][2] * v.z,
            m[1][0] * v.x + m[1][1] * v.y + m[1][2] * v.z,
            m[2][0] * v.x + m[2][1] * v.y + m[2][2] * v.z,
        )
    }
}

/// Object rotation: `Rx · Ry · Rz`. The order is fixed; reordering changes
/// the visual orientation of every existing mesh.
pub fn object_matrix(angle: [i32; 3]) -> Mat3 {
    Mat3::rotation_x(angle[0])
        .mul(&Mat3::rotation_y(angle[1]))
        .mul(&Mat3::rotation_z(angle[2]))
}

/// View rotation for a camera with the given angles: `Rz(-z) · Ry(-y) · Rx(-x)`.
///
/// Every sine term is negated and the order reversed relative to
/// [`object_matrix`], so turning the camera by +θ looks the same as turning
/// the world by -θ.
pub fn view_matrix(angle: [i32; 3]) -> Mat3 {
    Mat3::rotation_z(-angle[2])
        .mul(&Mat3::rotation_y(-angle[1]))
        .mul(&Mat3::rotation_x(-angle[0]))
}

/// Unit normal of the triangle (a, b, c): `normalize((b - a) × (c - a))`
pub fn face_normal(a: Vec3, b: Vec3, c: Vec3) -> Vec3 {
    (b - a).cross(c - a).normalize()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx(a: Vec3, b: Vec3) -> bool {
        (a.x - b.x).abs() < 1e-4 && (a.y - b.y).abs() < 1e-4 && (a.z - b.z).abs() < 1e-4
    }

    #[test]
    fn test_vec3_dot() {
        let a = Vec3::new(1.0, 2.0, 3.0);
        let b = Vec3::new(4.0, 5.0, 6.0);
        assert!((a.dot(b) - 32.0).abs() < 0.001);
    }

    #[test]
    fn test_vec3_cross() {
        let a = Vec3::new(1.0, 0.0, 0.0);
        let b = Vec3::new(0.0, 1.0, 0.0);
        let c = a.cross(b);
        assert!((c.z - 1.0).abs() < 0.001);
    }

    #[test]
    fn test_normalize_zero_is_noop() {
        assert_eq!(Vec3::ZERO.normalize(), Vec3::ZERO);
        let n = Vec3::new(3.0, 0.0, 4.0).normalize();
        assert!((n.len() - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_identity_mul() {
        let m = object_matrix([123, 456, 789]);
        assert_eq!(Mat3::IDENTITY.mul(&m), m);
        assert_eq!(m.mul(&Mat3::IDENTITY), m);
    }

    #[test]
    fn test_object_matrix_known_outputs() {
        // 90° about Y carries +X to -Z
        let m = object_matrix([0, 900, 0]);
        assert!(approx(m.transform(Vec3::new(1.0, 0.0, 0.0)), Vec3::new(0.0, 0.0, -1.0)));
        // 90° about X carries +Y to +Z
        let m = object_matrix([900, 0, 0]);
        assert!(approx(m.transform(Vec3::new(0.0, 1.0, 0.0)), Vec3::new(0.0, 0.0, 1.0)));
        // 90° about Z carries +X to +Y
        let m = object_matrix([0, 0, 900]);
        assert!(approx(m.transform(Vec3::new(1.0, 0.0, 0.0)), Vec3::new(0.0, 1.0, 0.0)));
        // Rx · Ry · Rz: Z applied first, then Y, then X
        let m = object_matrix([900, 900, 900]);
        assert!(approx(m.transform(Vec3::new(1.0, 0.0, 0.0)), Vec3::new(0.0, 0.0, 1.0)));
    }

    #[test]
    fn test_view_matrix_known_outputs() {
        // Camera yawed +90° sees world +X straight ahead
        let v = view_matrix([0, 900, 0]);
        assert!(approx(v.transform(Vec3::new(1.0, 0.0, 0.0)), Vec3::new(0.0, 0.0, 1.0)));
        // Camera pitched +90° sees world +Z as camera +Y
        let v = view_matrix([900, 0, 0]);
        assert!(approx(v.transform(Vec3::new(0.0, 0.0, 1.0)), Vec3::new(0.0, 1.0, 0.0)));
    }

    #[test]
    fn test_camera_rotation_inverts_object_rotation() {
        for angles in [[0, 450, 0], [300, 1200, 75], [3599, 1, 1800]] {
            let product = view_matrix(angles).mul(&object_matrix(angles));
            for (i, row) in product.0.iter().enumerate() {
                for (j, cell) in row.iter().enumerate() {
                    let expected = if i == j { 1.0 } else { 0.0 };
                    assert!((cell - expected).abs() < 1e-5);
                }
            }
        }
    }

    #[test]
    fn test_camera_turn_matches_negative_world_turn() {
        let p = Vec3::new(3.0, -2.0, 7.0);
        for axis in 0..3 {
            let mut a = [0, 0, 0];
            a[axis] = 370;
            let mut neg = [0, 0, 0];
            neg[axis] = -370;
            assert!(approx(view_matrix(a).transform(p), object_matrix(neg).transform(p)));
        }
    }

    #[test]
    fn test_face_normal() {
        let n = face_normal(
            Vec3::new(0.0, 0.0, 0.0),
            Vec3::new(1.0, 0.0, 0.0),
            Vec3::new(0.0, 1.0, 0.0),
        );
        assert!(approx(n, Vec3::new(0.0, 0.0, 1.0)));
    }
}
