//! Software backend: the scanline rasterizer
//!
//! Works on every surface format. Direct-color surfaces sample textures as
//! they are; 8-bit surfaces need palette indices, so textures are converted
//! against the surface palette on first use and cached until the texture is
//! re-uploaded or the palette changes.

use std::collections::HashMap;

use crate::error::Result;
use crate::pipeline::ViewState;
use crate::rasterizer::{
    rasterize_triangle, BlendMode, Color, DirectWriter, Framebuffer, IndexedSource, IndexedWriter,
    Palette, PixelFormat, PixelPacker, Rgb565, Rgb888, Rgba8888, ScreenVertex, SpanSource,
};
use crate::texture::{Texture, TextureLibrary};

use super::{BackendCaps, BackendKind, DrawStats, RenderBackend, TriangleBatch};

#[derive(Debug, Default)]
pub struct SoftwareBackend {
    /// Slot → texture converted to the cached palette
    indexed: HashMap<usize, Texture>,
    palette: Option<Palette>,
}

impl SoftwareBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of textures currently converted for 8-bit output
    pub fn cached_textures(&self) -> usize {
        self.indexed.len()
    }
}

fn draw_direct<P: PixelPacker>(
    fb: &mut Framebuffer,
    tri: [ScreenVertex; 3],
    texture: Option<&Texture>,
    color: Color,
    depth_test: bool,
) -> u32 {
    let (source, keyed) = match texture {
        Some(t) => (SpanSource::Textured(t), t.blend == BlendMode::ColorKey),
        None => (SpanSource::Flat(color), false),
    };
    rasterize_triangle(fb, tri, &DirectWriter::<P>::new(source, keyed), depth_test)
}

impl RenderBackend for SoftwareBackend {
    fn kind(&self) -> BackendKind {
        BackendKind::Software
    }

    fn caps(&self) -> BackendCaps {
        BackendCaps {
            depth_buffer: true,
            indexed_targets: true,
            pixel_counts: true,
        }
    }

    fn begin_frame(&mut self, fb: &mut Framebuffer, clear: Color) -> Result<()> {
        if fb.format == PixelFormat::Indexed8 && self.palette.as_ref() != Some(&fb.palette) {
            if !self.indexed.is_empty() {
                log::debug!("surface palette changed, dropping {} converted textures", self.indexed.len());
            }
            self.indexed.clear();
            self.palette = Some(fb.palette.clone());
        }
        fb.clear(clear);
        Ok(())
    }

    fn upload_texture(&mut self, slot: usize, _texture: &Texture) -> Result<()> {
        // Direct surfaces read the library as-is; only stale conversions go
        self.indexed.remove(&slot);
        Ok(())
    }

    fn release_textures(&mut self) {
        self.indexed.clear();
    }

    fn set_matrices(&mut self, _view: &ViewState) {
        // Vertices arrive projected
    }

    fn draw_indexed_triangles(
        &mut self,
        batch: &TriangleBatch,
        textures: &TextureLibrary,
        fb: &mut Framebuffer,
    ) -> Result<DrawStats> {
        let mut stats = DrawStats::default();
        for (i, material) in batch.materials.iter().enumerate() {
            let Some(tri) = batch.triangle(i) else {
                continue;
            };
            let texture = material.texture.and_then(|slot| textures.get(slot).map(|t| (slot, t)));
            let pixels = match fb.format {
                PixelFormat::Indexed8 => {
                    let writer = match texture {
                        Some((slot, t)) => {
                            let palette = &fb.palette;
                            let converted = self.indexed.entry(slot).or_insert_with(|| t.to_indexed(palette));
                            IndexedSource::from_texture(converted)
                                .map(|source| IndexedWriter::new(source, converted.blend == BlendMode::ColorKey))
                        }
                        None => None,
                    };
                    let writer = writer
                        .unwrap_or_else(|| IndexedWriter::new(IndexedSource::Flat(fb.palette.nearest(material.color)), false));
                    rasterize_triangle(fb, tri, &writer, batch.depth_test)
                }
                PixelFormat::Rgb565 => {
                    draw_direct::<Rgb565>(fb, tri, texture.map(|(_, t)| t), material.color, batch.depth_test)
                }
                PixelFormat::Rgb888 => {
                    draw_direct::<Rgb888>(fb, tri, texture.map(|(_, t)| t), material.color, batch.depth_test)
                }
                PixelFormat::Rgba8888 => {
                    draw_direct::<Rgba8888>(fb, tri, texture.map(|(_, t)| t), material.color, batch.depth_test)
                }
            };
            stats.triangles += 1;
            stats.pixels += pixels as u64;
        }
        Ok(stats)
    }

    fn end_frame(&mut self, _fb: &mut Framebuffer) -> Result<()> {
        Ok(())
    }

    fn present(&mut self, _fb: &Framebuffer) {
        // The framebuffer is the presented surface
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::TriangleMaterial;
    use crate::pipeline::DrawTriangle;

    fn square(z: f32, material: TriangleMaterial) -> Vec<DrawTriangle> {
        let v = |x: f32, y: f32, u: f32, w: f32| ScreenVertex::new(x, y, z, u, w);
        vec![
            DrawTriangle {
                vertices: [v(0.0, 0.0, 0.0, 0.0), v(8.0, 0.0, 1.0, 0.0), v(8.0, 8.0, 1.0, 1.0)],
                material,
            },
            DrawTriangle {
                vertices: [v(0.0, 0.0, 0.0, 0.0), v(8.0, 8.0, 1.0, 1.0), v(0.0, 8.0, 0.0, 1.0)],
                material,
            },
        ]
    }

    fn batch(tris: &[DrawTriangle]) -> TriangleBatch {
        let mut b = TriangleBatch::new(true);
        for t in tris {
            b.push(t);
        }
        b
    }

    #[test]
    fn test_flat_fill_every_direct_format() {
        let flat = TriangleMaterial {
            texture: None,
            color: Color::RED,
        };
        for format in [PixelFormat::Rgb565, PixelFormat::Rgb888, PixelFormat::Rgba8888] {
            let mut fb = Framebuffer::new(16, 16, format);
            let mut backend = SoftwareBackend::new();
            backend.begin_frame(&mut fb, Color::BLACK).unwrap();
            let stats = backend
                .draw_indexed_triangles(&batch(&square(5.0, flat)), &TextureLibrary::new(), &mut fb)
                .unwrap();
            assert_eq!(stats, DrawStats { triangles: 2, pixels: 64 });
            assert_eq!(fb.get_pixel(3, 3).map(|c| c.same_rgb(Color::RED)), Some(true));
            assert_eq!(fb.get_pixel(12, 12).map(|c| c.same_rgb(Color::BLACK)), Some(true));
        }
    }

    #[test]
    fn test_missing_texture_falls_back_to_color() {
        let mut fb = Framebuffer::new(16, 16, PixelFormat::Rgba8888);
        let mut backend = SoftwareBackend::new();
        backend.begin_frame(&mut fb, Color::BLACK).unwrap();
        let material = TriangleMaterial {
            texture: Some(7),
            color: Color::GREEN,
        };
        backend
            .draw_indexed_triangles(&batch(&square(5.0, material)), &TextureLibrary::new(), &mut fb)
            .unwrap();
        assert_eq!(fb.get_pixel(4, 4).map(|c| c.same_rgb(Color::GREEN)), Some(true));
    }

    #[test]
    fn test_indexed_target_converts_and_caches() {
        let mut lib = TextureLibrary::new();
        let tex = Texture::new_rgb("white", 8, 8, vec![Color::WHITE; 64]).unwrap();
        lib.set(3, tex.clone()).unwrap();

        let mut fb = Framebuffer::new(16, 16, PixelFormat::Indexed8);
        fb.palette = Palette::grayscale();
        let mut backend = SoftwareBackend::new();
        backend.begin_frame(&mut fb, Color::BLACK).unwrap();
        let material = TriangleMaterial {
            texture: Some(3),
            color: Color::RED,
        };
        let stats = backend.draw_indexed_triangles(&batch(&square(5.0, material)), &lib, &mut fb).unwrap();
        assert_eq!(stats.pixels, 64);
        assert_eq!(backend.cached_textures(), 1);
        assert_eq!(fb.pixels[2 * 16 + 2], 255);
        assert_eq!(fb.pixels[12 * 16 + 12], 0);

        // Re-upload drops the conversion
        backend.upload_texture(3, &tex).unwrap();
        assert_eq!(backend.cached_textures(), 0);

        // Palette change drops everything
        backend.draw_indexed_triangles(&batch(&square(5.0, material)), &lib, &mut fb).unwrap();
        fb.palette = Palette::rgb332();
        backend.begin_frame(&mut fb, Color::BLACK).unwrap();
        assert_eq!(backend.cached_textures(), 0);
    }

    #[test]
    fn test_depth_test_keeps_nearer() {
        let mut fb = Framebuffer::new(16, 16, PixelFormat::Rgba8888);
        let mut backend = SoftwareBackend::new();
        backend.begin_frame(&mut fb, Color::BLACK).unwrap();
        let near = square(2.0, TriangleMaterial { texture: None, color: Color::BLUE });
        let far = square(9.0, TriangleMaterial { texture: None, color: Color::RED });
        let lib = TextureLibrary::new();
        backend.draw_indexed_triangles(&batch(&near), &lib, &mut fb).unwrap();
        let stats = backend.draw_indexed_triangles(&batch(&far), &lib, &mut fb).unwrap();
        assert_eq!(stats.pixels, 0);
        assert_eq!(fb.get_pixel(4, 4).map(|c| c.same_rgb(Color::BLUE)), Some(true));
    }
}
