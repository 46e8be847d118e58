//! Local → world → camera → screen transforms
//!
//! Camera position is subtracted before the view rotation is applied; no
//! matrix carries a translation.

use crate::rasterizer::constants::DEGENERATE_SCREEN;
use crate::rasterizer::{Camera, Mat3, Vec3};

/// Per-frame view parameters, shared by the pipeline and the backends
#[derive(Debug, Clone, PartialEq)]
pub struct ViewState {
    /// World → camera rotation
    pub rotation: Mat3,
    /// Camera position in world space
    pub position: Vec3,
    pub near: f32,
    pub far: f32,
    pub center: (f32, f32),
    pub distance: f32,
    /// Viewport in pixels
    pub width: usize,
    pub height: usize,
}

impl ViewState {
    pub fn new(camera: &Camera, width: usize, height: usize) -> Self {
        Self {
            rotation: camera.view_matrix(),
            position: camera.position,
            near: camera.near,
            far: camera.far,
            center: camera.center,
            distance: camera.distance,
            width,
            height,
        }
    }

    /// World point to camera space
    #[inline]
    pub fn to_camera(&self, world: Vec3) -> Vec3 {
        self.rotation.transform(world - self.position)
    }

    /// Perspective divide. Points at or behind the eye plane go to
    /// [`DEGENERATE_SCREEN`].
    #[inline]
    pub fn project(&self, c: Vec3) -> (f32, f32) {
        if c.z <= 0.0 {
            return DEGENERATE_SCREEN;
        }
        let k = self.distance / c.z;
        (self.center.0 + c.x * k, self.center.1 - c.y * k)
    }

    /// Whether a world-space bounding sphere touches the view frustum
    pub fn sphere_visible(&self, center: Vec3, radius: f32) -> bool {
        let c = self.to_camera(center);
        if c.z + radius < self.near || c.z - radius > self.far {
            return false;
        }
        let d = self.distance;
        let (cx, cy) = self.center;
        let (rx, by) = (self.width as f32 - cx, self.height as f32 - cy);
        // Signed distances to the four side planes, positive inside
        let planes = [
            (c.x * d + cx * c.z) / (d * d + cx * cx).sqrt(),
            (-c.x * d + rx * c.z) / (d * d + rx * rx).sqrt(),
            (-c.y * d + cy * c.z) / (d * d + cy * cy).sqrt(),
            (c.y * d + by * c.z) / (d * d + by * by).sqrt(),
        ];
        planes.iter().all(|&dist| dist >= -radius)
    }
}

/// Rotate then translate every local vertex into `out`
pub fn transform_to_world(local: &[Vec3], rotation: &Mat3, position: Vec3, out: &mut Vec<Vec3>) {
    out.clear();
    out.extend(local.iter().map(|v| rotation.transform(*v) + position));
}

/// Rotate face normals into world space
pub fn rotate_normals(normals: &[Vec3], rotation: &Mat3, out: &mut Vec<Vec3>) {
    out.clear();
    out.extend(normals.iter().map(|n| rotation.transform(*n)));
}

/// A face is culled when its normal points away from the camera:
/// `normal · (point - camera) >= 0`
#[inline]
pub fn is_back_face(normal: Vec3, point: Vec3, camera: Vec3) -> bool {
    normal.dot(point - camera) >= 0.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rasterizer::object_matrix;

    fn view() -> ViewState {
        ViewState::new(&Camera::new(320, 240), 320, 240)
    }

    #[test]
    fn test_project_known_points() {
        let v = view();
        assert_eq!(v.project(Vec3::new(0.0, 0.0, 10.0)), (160.0, 120.0));
        assert_eq!(v.project(Vec3::new(10.0, 10.0, 160.0)), (170.0, 110.0));
        assert_eq!(v.project(Vec3::new(1.0, 1.0, 0.0)), DEGENERATE_SCREEN);
        assert_eq!(v.project(Vec3::new(1.0, 1.0, -5.0)), DEGENERATE_SCREEN);
    }

    #[test]
    fn test_camera_translation_and_rotation() {
        let mut cam = Camera::new(320, 240);
        cam.position = Vec3::new(0.0, 0.0, -10.0);
        cam.set_angle([0, 900, 0]);
        let v = ViewState::new(&cam, 320, 240);
        // Yawed +90°, the camera looks down world +X
        let c = v.to_camera(Vec3::new(5.0, 0.0, -10.0));
        assert!((c.z - 5.0).abs() < 1e-4 && c.x.abs() < 1e-4);
    }

    #[test]
    fn test_world_transform() {
        let mut out = Vec::new();
        transform_to_world(&[Vec3::new(1.0, 0.0, 0.0)], &object_matrix([0, 0, 900]), Vec3::new(0.0, 0.0, 50.0), &mut out);
        assert!((out[0] - Vec3::new(0.0, 1.0, 50.0)).len() < 1e-5);
    }

    #[test]
    fn test_back_face() {
        let cam = Vec3::ZERO;
        let p = Vec3::new(0.0, 0.0, 10.0);
        assert!(!is_back_face(Vec3::new(0.0, 0.0, -1.0), p, cam));
        assert!(is_back_face(Vec3::new(0.0, 0.0, 1.0), p, cam));
        // Edge-on counts as culled
        assert!(is_back_face(Vec3::new(1.0, 0.0, 0.0), p, cam));
    }

    #[test]
    fn test_sphere_visibility() {
        let v = view();
        assert!(v.sphere_visible(Vec3::new(0.0, 0.0, 50.0), 1.0));
        assert!(!v.sphere_visible(Vec3::new(0.0, 0.0, -50.0), 1.0));
        assert!(!v.sphere_visible(Vec3::new(0.0, 0.0, 5000.0), 10.0));
        // 90° horizontal FOV: x = -60 at z = 50 is outside unless the radius reaches in
        assert!(!v.sphere_visible(Vec3::new(-60.0, 0.0, 50.0), 5.0));
        assert!(v.sphere_visible(Vec3::new(-60.0, 0.0, 50.0), 10.0));
        // Straddling the near plane still counts
        assert!(v.sphere_visible(Vec3::new(0.0, 0.0, 0.5), 1.0));
    }
}
