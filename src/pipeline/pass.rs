//! Face pass: cull, clip and project the faces of one mesh
//!
//! Vertices are taken to camera space lazily, the first time a surviving
//! face references them, so vertices only used by culled faces are never
//! transformed.

use crate::backend::TriangleMaterial;
use crate::rasterizer::queue::average_depth;
use crate::rasterizer::{ScreenVertex, Vec3};
use crate::world::{Counter, Face};

use super::clip::{clip_near, outcode, ClipVertex, CLIP_FAR, CLIP_NEAR};
use super::transform::{is_back_face, ViewState};

/// A projected triangle ready for a backend
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DrawTriangle {
    pub vertices: [ScreenVertex; 3],
    pub material: TriangleMaterial,
}

impl DrawTriangle {
    /// Sort key for painter's ordering
    pub fn depth(&self) -> f32 {
        average_depth(self.vertices.map(|v| v.z))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PassOptions {
    pub backface_cull: bool,
    /// Reject faces beyond the far plane. Off for the skybox.
    pub far_clip: bool,
}

impl Default for PassOptions {
    fn default() -> Self {
        Self {
            backface_cull: true,
            far_clip: true,
        }
    }
}

const UNSEEN: u8 = 0;
const CALCULATED: u8 = 1;
const RENDERED: u8 = 2;

/// Per-vertex camera-space scratch, reused across meshes and frames
#[derive(Debug, Default)]
pub struct VertexCache {
    camera: Vec<Vec3>,
    screen: Vec<(f32, f32)>,
    codes: Vec<u8>,
    state: Vec<u8>,
}

impl VertexCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Forget every vertex and size for a mesh of `count` vertices
    pub fn reset(&mut self, count: usize) {
        self.camera.clear();
        self.camera.resize(count, Vec3::ZERO);
        self.screen.clear();
        self.screen.resize(count, (0.0, 0.0));
        self.codes.clear();
        self.codes.resize(count, 0);
        self.state.clear();
        self.state.resize(count, UNSEEN);
    }

    /// Vertices taken to camera space since the last reset
    pub fn calculated(&self) -> u32 {
        self.state.iter().filter(|&&s| s != UNSEEN).count() as u32
    }

    /// Vertices referenced by at least one drawn face since the last reset
    pub fn rendered(&self) -> u32 {
        self.state.iter().filter(|&&s| s == RENDERED).count() as u32
    }

    fn code(&mut self, i: usize, vertices: &[Vec3], view: &ViewState, mask: u8) -> u8 {
        if self.state[i] == UNSEEN {
            let c = view.to_camera(vertices[i]);
            let s = view.project(c);
            self.camera[i] = c;
            self.screen[i] = s;
            self.codes[i] = outcode(c, s, view);
            self.state[i] = CALCULATED;
        }
        self.codes[i] & mask
    }

    fn screen_vertex(&self, i: usize, uv: crate::rasterizer::Vec2) -> ScreenVertex {
        let (x, y) = self.screen[i];
        ScreenVertex::new(x, y, self.camera[i].z, uv.x, uv.y)
    }
}

/// Cull, clip and project `faces`, appending the surviving triangles to
/// `out`. `vertices` and `normals` are in world space; the cache must have
/// been reset for `vertices`. Sets `culled` and `clipped` on every face.
pub fn process_faces(
    vertices: &[Vec3],
    faces: &mut [Face],
    normals: &[Vec3],
    view: &ViewState,
    options: PassOptions,
    cache: &mut VertexCache,
    out: &mut Vec<DrawTriangle>,
) -> Counter {
    let mask = if options.far_clip { !0 } else { !CLIP_FAR };
    let mut counter = Counter::default();

    for (face, normal) in faces.iter_mut().zip(normals) {
        face.clipped = 0;
        face.culled = options.backface_cull
            && is_back_face(*normal, vertices[face.indices[0] as usize], view.position);
        if face.culled {
            counter.add(false);
            continue;
        }

        let mut union = 0;
        let mut common = !0;
        for &i in face.corners() {
            let code = cache.code(i as usize, vertices, view, mask);
            union |= code;
            common &= code;
        }
        face.clipped = union;
        if common != 0 {
            counter.add(false);
            continue;
        }

        let material = TriangleMaterial {
            texture: face.texture,
            color: face.color,
        };
        let before = out.len();
        for tri in face.triangles() {
            let idx = tri.map(|k| face.indices[k] as usize);
            let codes = idx.map(|i| cache.codes[i] & mask);
            if codes[0] & codes[1] & codes[2] != 0 {
                continue;
            }
            if (codes[0] | codes[1] | codes[2]) & CLIP_NEAR != 0 {
                let clip_tri = [0, 1, 2].map(|k| ClipVertex::new(cache.camera[idx[k]], face.uv[tri[k]]));
                for t in clip_near(clip_tri, view.near).triangles() {
                    let vertices = t.map(|v| {
                        let (x, y) = view.project(v.pos);
                        ScreenVertex::new(x, y, v.pos.z, v.uv.x, v.uv.y)
                    });
                    out.push(DrawTriangle { vertices, material });
                }
            } else {
                let vertices = [0, 1, 2].map(|k| cache.screen_vertex(idx[k], face.uv[tri[k]]));
                out.push(DrawTriangle { vertices, material });
            }
        }

        let drawn = out.len() > before;
        if drawn {
            for &i in face.corners() {
                cache.state[i as usize] = RENDERED;
            }
        }
        counter.add(drawn);
    }
    counter
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::transform::{rotate_normals, transform_to_world};
    use crate::rasterizer::{object_matrix, Camera, Color};
    use crate::world::cube;

    fn view() -> ViewState {
        ViewState::new(&Camera::new(320, 240), 320, 240)
    }

    fn run(position: Vec3, angle: [i32; 3], options: PassOptions) -> (Vec<Face>, Counter, Vec<DrawTriangle>, VertexCache) {
        let mut c = cube(5.0);
        let rot = object_matrix(angle);
        let (mut world, mut normals) = (Vec::new(), Vec::new());
        transform_to_world(&c.vertices, &rot, position, &mut world);
        rotate_normals(&c.normals, &rot, &mut normals);
        let mut cache = VertexCache::new();
        cache.reset(world.len());
        let mut out = Vec::new();
        let counter = process_faces(&world, &mut c.faces, &normals, &view(), options, &mut cache, &mut out);
        (c.faces, counter, out, cache)
    }

    fn cross_z(a: (f32, f32), b: (f32, f32), c: (f32, f32)) -> f32 {
        (b.0 - a.0) * (c.1 - b.1) - (b.1 - a.1) * (c.0 - b.0)
    }

    #[test]
    fn test_cube_front_face_projects_to_convex_quad() {
        let (faces, counter, out, _) = run(Vec3::new(0.0, 0.0, 50.0), [0, 0, 0], PassOptions::default());
        // Only the -Z face looks at a camera on the axis
        assert_eq!(counter, Counter { rendered: 1, total: 6 });
        assert!(!faces[0].culled);
        assert!(faces[1..].iter().all(|f| f.culled));
        assert_eq!(out.len(), 2);
        assert!(out.iter().all(|t| t.material.color == Color::RED));

        let v = view();
        let mut c = cube(5.0);
        for p in c.vertices.iter_mut() {
            *p = *p + Vec3::new(0.0, 0.0, 50.0);
        }
        let quad: Vec<(f32, f32)> = c.faces[0]
            .corners()
            .iter()
            .map(|&i| v.project(v.to_camera(c.vertices[i as usize])))
            .collect();
        for &(x, y) in &quad {
            assert!((0.0..320.0).contains(&x) && (0.0..240.0).contains(&y));
        }
        // Known-good corners: half edge 5 at depth 45, distance 160
        let e = 5.0 * 160.0 / 45.0;
        assert!((quad[0].0 - (160.0 - e)).abs() < 1e-3 && (quad[0].1 - (120.0 + e)).abs() < 1e-3);
        // Consistent turn direction at every corner means convex
        let turns: Vec<f32> = (0..4).map(|i| cross_z(quad[i], quad[(i + 1) % 4], quad[(i + 2) % 4])).collect();
        assert!(turns.iter().all(|&t| t > 0.0) || turns.iter().all(|&t| t < 0.0));
    }

    #[test]
    fn test_no_cull_draws_every_face_in_front() {
        let options = PassOptions {
            backface_cull: false,
            ..PassOptions::default()
        };
        let (_, counter, out, cache) = run(Vec3::new(0.0, 0.0, 50.0), [0, 0, 0], options);
        assert_eq!(counter.rendered, 6);
        assert_eq!(out.len(), 12);
        assert_eq!(cache.calculated(), 8);
        assert_eq!(cache.rendered(), 8);
    }

    #[test]
    fn test_culled_faces_skip_vertex_work() {
        let (_, _, _, cache) = run(Vec3::new(0.0, 0.0, 50.0), [0, 0, 0], PassOptions::default());
        assert_eq!(cache.calculated(), 4);
        assert_eq!(cache.rendered(), 4);
    }

    #[test]
    fn test_behind_camera_is_rejected() {
        let options = PassOptions {
            backface_cull: false,
            ..PassOptions::default()
        };
        let (faces, counter, out, _) = run(Vec3::new(0.0, 0.0, -50.0), [0, 0, 0], options);
        assert_eq!(counter.rendered, 0);
        assert!(out.is_empty());
        assert!(faces.iter().all(|f| f.clipped & CLIP_NEAR != 0));
    }

    #[test]
    fn test_near_plane_crossing_is_clipped() {
        let options = PassOptions {
            backface_cull: false,
            ..PassOptions::default()
        };
        // Cube straddles z = near around the camera
        let (faces, counter, out, _) = run(Vec3::new(0.0, 0.0, 3.0), [0, 0, 0], options);
        assert!(counter.rendered > 0);
        assert!(faces.iter().any(|f| f.clipped & CLIP_NEAR != 0));
        for t in &out {
            assert!(t.vertices.iter().all(|v| v.z >= 1.0 - 1e-4));
        }
    }

    #[test]
    fn test_far_clip_toggle() {
        let far = Vec3::new(0.0, 0.0, 6000.0);
        let (_, counter, _, _) = run(far, [0, 0, 0], PassOptions::default());
        assert_eq!(counter.rendered, 0);
        let options = PassOptions {
            far_clip: false,
            ..PassOptions::default()
        };
        let (_, counter, _, _) = run(far, [0, 0, 0], options);
        assert_eq!(counter.rendered, 1);
    }
}
