//! Frustum outcodes and near-plane clipping

use crate::rasterizer::{Vec2, Vec3};

use super::transform::ViewState;

pub const CLIP_NEAR: u8 = 0x01;
pub const CLIP_FAR: u8 = 0x02;
pub const CLIP_LEFT: u8 = 0x04;
pub const CLIP_RIGHT: u8 = 0x08;
pub const CLIP_TOP: u8 = 0x10;
pub const CLIP_BOTTOM: u8 = 0x20;

/// Outcode of one vertex given its camera-space and projected position.
/// Behind the near plane only [`CLIP_NEAR`] is set; the projection is
/// meaningless there.
pub fn outcode(camera: Vec3, screen: (f32, f32), view: &ViewState) -> u8 {
    if camera.z < view.near {
        return CLIP_NEAR;
    }
    let mut code = 0;
    if camera.z > view.far {
        code |= CLIP_FAR;
    }
    if screen.0 < 0.0 {
        code |= CLIP_LEFT;
    } else if screen.0 >= view.width as f32 {
        code |= CLIP_RIGHT;
    }
    if screen.1 < 0.0 {
        code |= CLIP_TOP;
    } else if screen.1 >= view.height as f32 {
        code |= CLIP_BOTTOM;
    }
    code
}

/// Camera-space vertex carried through clipping
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClipVertex {
    pub pos: Vec3,
    pub uv: Vec2,
}

impl ClipVertex {
    pub fn new(pos: Vec3, uv: Vec2) -> Self {
        Self { pos, uv }
    }

    fn lerp(self, other: ClipVertex, t: f32) -> ClipVertex {
        ClipVertex {
            pos: self.pos.lerp(other.pos, t),
            uv: self.uv.lerp(other.uv, t),
        }
    }
}

/// Up to four vertices left after cutting a triangle with one plane
#[derive(Debug, Clone, Copy)]
pub struct ClipPolygon {
    verts: [ClipVertex; 4],
    len: usize,
}

impl ClipPolygon {
    pub fn vertices(&self) -> &[ClipVertex] {
        &self.verts[..self.len]
    }

    pub fn is_empty(&self) -> bool {
        self.len < 3
    }

    /// Fan triangulation: 0, 1 or 2 triangles
    pub fn triangles(&self) -> impl Iterator<Item = [ClipVertex; 3]> + '_ {
        let v = self.vertices();
        (1..v.len().saturating_sub(1)).map(move |i| [v[0], v[i], v[i + 1]])
    }
}

/// Cut a camera-space triangle against `z = near`, keeping the `z >= near`
/// side. Winding is preserved.
pub fn clip_near(tri: [ClipVertex; 3], near: f32) -> ClipPolygon {
    let mut out = ClipPolygon {
        verts: [tri[0]; 4],
        len: 0,
    };
    for i in 0..3 {
        let a = tri[i];
        let b = tri[(i + 1) % 3];
        let a_in = a.pos.z >= near;
        let b_in = b.pos.z >= near;
        if a_in {
            out.verts[out.len] = a;
            out.len += 1;
        }
        if a_in != b_in {
            let t = (near - a.pos.z) / (b.pos.z - a.pos.z);
            let mut p = a.lerp(b, t);
            p.pos.z = near;
            out.verts[out.len] = p;
            out.len += 1;
        }
    }
    if out.len < 3 {
        out.len = 0;
    }
    out
}
