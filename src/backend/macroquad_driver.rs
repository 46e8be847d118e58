//! Hardware slot A: macroquad's GL renderer
//!
//! Triangles are drawn as 2D meshes into an offscreen render target sized to
//! the framebuffer, then read back so the framebuffer holds the frame as it
//! does with the software backend. macroquad gives no depth test in this
//! mode, so the backend sorts triangles for us.

use std::collections::HashMap;

use macroquad::models::{draw_mesh, Mesh, Vertex};
use macroquad::prelude as mq;

use crate::error::{EngineError, Result};
use crate::rasterizer::{Color, Framebuffer};
use crate::texture::Texture;

use super::accelerated::{AccelDriver, DriverTriangle, TextureHandle};

/// Triangles per mesh, keeping indices within u16
const MESH_TRIANGLES: usize = 8_000;

fn to_mq(c: Color) -> mq::Color {
    mq::Color::from_rgba(c.r, c.g, c.b, c.a)
}

pub struct MacroquadDriver {
    target: Option<mq::RenderTarget>,
    size: (usize, usize),
    textures: HashMap<u32, mq::Texture2D>,
    next_handle: u32,
}

impl MacroquadDriver {
    pub fn new() -> Self {
        Self {
            target: None,
            size: (0, 0),
            textures: HashMap::new(),
            next_handle: 1,
        }
    }
}

impl Default for MacroquadDriver {
    fn default() -> Self {
        Self::new()
    }
}

impl AccelDriver for MacroquadDriver {
    fn name(&self) -> &str {
        "macroquad"
    }

    fn begin_frame(&mut self, width: usize, height: usize, clear: Color) -> Result<()> {
        if width == 0 || height == 0 || width > u16::MAX as usize || height > u16::MAX as usize {
            return Err(EngineError::unsupported(format!("render target {}x{}", width, height)));
        }
        if self.target.is_none() || self.size != (width, height) {
            let target = mq::render_target(width as u32, height as u32);
            target.texture.set_filter(mq::FilterMode::Nearest);
            self.target = Some(target);
            self.size = (width, height);
        }
        let (w, h) = (width as f32, height as f32);
        mq::set_camera(&mq::Camera2D {
            zoom: mq::vec2(2.0 / w, 2.0 / h),
            target: mq::vec2(w / 2.0, h / 2.0),
            render_target: self.target.clone(),
            ..Default::default()
        });
        mq::clear_background(to_mq(clear));
        Ok(())
    }

    fn create_texture(&mut self, texture: &Texture) -> Result<TextureHandle> {
        let tex = mq::Texture2D::from_rgba8(texture.width as u16, texture.height as u16, &texture.to_rgba_bytes());
        tex.set_filter(mq::FilterMode::Nearest);
        let handle = self.next_handle;
        self.next_handle += 1;
        self.textures.insert(handle, tex);
        Ok(TextureHandle(handle))
    }

    fn destroy_texture(&mut self, handle: TextureHandle) {
        self.textures.remove(&handle.0);
    }

    fn draw_triangles(
        &mut self,
        texture: Option<TextureHandle>,
        triangles: &[DriverTriangle],
        _depth_test: bool,
    ) -> Result<()> {
        let texture = texture.and_then(|h| self.textures.get(&h.0).cloned());
        for chunk in triangles.chunks(MESH_TRIANGLES) {
            let mut vertices = Vec::with_capacity(chunk.len() * 3);
            for t in chunk {
                let color = to_mq(t.color);
                for v in &t.vertices {
                    vertices.push(Vertex::new(v.x, v.y, 0.0, v.u, v.v, color));
                }
            }
            let indices = (0..vertices.len() as u16).collect();
            draw_mesh(&Mesh {
                vertices,
                indices,
                texture: texture.clone(),
            });
        }
        Ok(())
    }

    fn end_frame(&mut self, fb: &mut Framebuffer) -> Result<()> {
        mq::set_default_camera();
        let target = self
            .target
            .as_ref()
            .ok_or_else(|| EngineError::missing("macroquad render target (end_frame before begin_frame)"))?;
        unsafe {
            mq::get_internal_gl().flush();
        }
        let image = target.texture.get_texture_data();
        let (w, h) = (image.width as usize, image.height as usize);
        if (w, h) != (fb.width, fb.height) {
            return Err(EngineError::unsupported(format!(
                "readback {}x{} into {}x{} framebuffer",
                w, h, fb.width, fb.height
            )));
        }
        // Render-target rows come back with screen row 0 first
        for (i, px) in image.bytes.chunks_exact(4).enumerate() {
            fb.set_pixel(i % w, i / w, Color::with_alpha(px[0], px[1], px[2], 255));
        }
        Ok(())
    }
}
