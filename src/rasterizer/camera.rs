//! Camera for 3D rendering
//!
//! Orientation is an angle triple in engine units (see [`super::fixed`]),
//! projection is a plain pinhole: `sx = cx + x * d / z`, `sy = cy - y * d / z`.

use serde::{Deserialize, Serialize};

use super::fixed::normalize_angle;
use super::math::{view_matrix, Mat3, Vec3};

/// Camera state for 3D rendering
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Camera {
    pub position: Vec3,
    /// Pitch, yaw, roll in angle units, each in `[0, FULL_TURN)`
    pub angle: [i32; 3],
    pub near: f32,
    pub far: f32,
    /// Projection center in pixels
    pub center: (f32, f32),
    /// Projection distance in pixels
    pub distance: f32,
}

impl Camera {
    /// Camera at the origin looking down +Z, centered on a `width`×`height`
    /// screen with a 90° horizontal field of view
    pub fn new(width: usize, height: usize) -> Self {
        Self {
            position: Vec3::ZERO,
            angle: [0, 0, 0],
            near: 1.0,
            far: 4096.0,
            center: (width as f32 / 2.0, height as f32 / 2.0),
            distance: width as f32 / 2.0,
        }
    }

    pub fn set_angle(&mut self, angle: [i32; 3]) {
        self.angle = angle.map(normalize_angle);
    }

    /// Rotate by a delta per axis, wrapping
    pub fn rotate(&mut self, delta: [i32; 3]) {
        for (a, d) in self.angle.iter_mut().zip(delta) {
            *a = normalize_angle(a.wrapping_add(d));
        }
    }

    pub fn view_matrix(&self) -> Mat3 {
        view_matrix(self.angle)
    }
}

impl Default for Camera {
    fn default() -> Self {
        Self::new(super::constants::WIDTH, super::constants::HEIGHT)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let cam = Camera::new(320, 240);
        assert_eq!(cam.center, (160.0, 120.0));
        assert_eq!(cam.distance, 160.0);
        assert_eq!(cam.view_matrix(), Mat3::IDENTITY);
    }

    #[test]
    fn test_rotate_wraps() {
        let mut cam = Camera::default();
        cam.rotate([-10, 3600 + 5, 0]);
        assert_eq!(cam.angle, [3590, 5, 0]);
        cam.set_angle([7200, -1, 3599]);
        assert_eq!(cam.angle, [0, 3599, 3599]);
    }
}
