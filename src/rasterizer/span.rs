//! Pixel-span writers
//!
//! A span is one horizontal run of pixels `[x0, x1)` on a single row. The
//! triangle rasterizer computes where spans start and how Z/U/V change per
//! pixel; a [`SpanWriter`] turns that into pixels. Writers are parameterized
//! by target depth ([`PixelPacker`] for direct color, [`IndexedWriter`] for
//! 8-bit) and by blend mode (opaque or color-keyed).

use std::marker::PhantomData;

use super::fixed::Fixed;
use super::framebuffer::Framebuffer;
use super::types::Color;
use crate::texture::{TexelData, Texture, TRANSPARENT_INDEX};

/// Per-pixel deltas of the interpolated attributes
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Gradients {
    pub dz: Fixed,
    pub du: Fixed,
    pub dv: Fixed,
}

/// Attribute values at the first pixel of a span
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct SpanStart {
    pub z: Fixed,
    pub u: Fixed,
    pub v: Fixed,
}

pub trait SpanWriter {
    /// Multipliers taking normalized UVs to texel units
    fn texel_scale(&self) -> (f32, f32) {
        (1.0, 1.0)
    }

    /// Write pixels `x0..x1` of row `y`. Returns the number of pixels written.
    fn write_span(
        &self,
        fb: &mut Framebuffer,
        y: usize,
        x0: usize,
        x1: usize,
        start: SpanStart,
        grad: &Gradients,
        depth_test: bool,
    ) -> u32;
}

// =============================================================================
// Direct-color targets
// =============================================================================

/// Packs a color into one pixel of a direct-color surface
pub trait PixelPacker {
    const BYTES: usize;
    fn pack(c: Color, out: &mut [u8]);
}

/// 16-bit 5-6-5, little endian
pub struct Rgb565;
/// 24-bit, R G B byte order
pub struct Rgb888;
/// 32-bit, R G B A byte order
pub struct Rgba8888;

impl PixelPacker for Rgb565 {
    const BYTES: usize = 2;
    #[inline]
    fn pack(c: Color, out: &mut [u8]) {
        out[..2].copy_from_slice(&c.to_rgb565().to_le_bytes());
    }
}

impl PixelPacker for Rgb888 {
    const BYTES: usize = 3;
    #[inline]
    fn pack(c: Color, out: &mut [u8]) {
        out[0] = c.r;
        out[1] = c.g;
        out[2] = c.b;
    }
}

impl PixelPacker for Rgba8888 {
    const BYTES: usize = 4;
    #[inline]
    fn pack(c: Color, out: &mut [u8]) {
        out[0] = c.r;
        out[1] = c.g;
        out[2] = c.b;
        out[3] = 255;
    }
}

/// What a span is filled with
#[derive(Debug, Clone, Copy)]
pub enum SpanSource<'a> {
    Flat(Color),
    Textured(&'a Texture),
}

/// Span writer for 16/24/32-bit surfaces
pub struct DirectWriter<'a, P> {
    source: SpanSource<'a>,
    keyed: bool,
    _packer: PhantomData<P>,
}

impl<'a, P: PixelPacker> DirectWriter<'a, P> {
    pub fn new(source: SpanSource<'a>, keyed: bool) -> Self {
        Self {
            source,
            keyed,
            _packer: PhantomData,
        }
    }
}

impl<P: PixelPacker> SpanWriter for DirectWriter<'_, P> {
    fn texel_scale(&self) -> (f32, f32) {
        match self.source {
            SpanSource::Flat(_) => (1.0, 1.0),
            SpanSource::Textured(t) => (t.width as f32, t.height as f32),
        }
    }

    fn write_span(
        &self,
        fb: &mut Framebuffer,
        y: usize,
        x0: usize,
        x1: usize,
        start: SpanStart,
        grad: &Gradients,
        depth_test: bool,
    ) -> u32 {
        let zrow = y * fb.width;
        let prow = y * fb.pitch;
        let SpanStart { mut z, mut u, mut v } = start;
        let mut written = 0;

        for x in x0..x1 {
            if !depth_test || z.0 < fb.zbuffer[zrow + x] {
                let color = match self.source {
                    SpanSource::Flat(c) => Some(c),
                    SpanSource::Textured(tex) => {
                        let (tx, ty) = (u.floor() as usize, v.floor() as usize);
                        if self.keyed && tex.is_key_at(tx, ty) {
                            None
                        } else {
                            Some(tex.color_at(tx, ty))
                        }
                    }
                };
                if let Some(c) = color {
                    let off = prow + x * P::BYTES;
                    P::pack(c, &mut fb.pixels[off..off + P::BYTES]);
                    if depth_test {
                        fb.zbuffer[zrow + x] = z.0;
                    }
                    written += 1;
                }
            }
            z += grad.dz;
            u += grad.du;
            v += grad.dv;
        }
        written
    }
}

// =============================================================================
// 8-bit palette targets
// =============================================================================

/// What an 8-bit span is filled with. Texels are palette indices already
/// matched to the surface palette.
#[derive(Debug, Clone, Copy)]
pub enum IndexedSource<'a> {
    Flat(u8),
    Textured {
        indices: &'a [u8],
        width: usize,
        height: usize,
    },
}

impl<'a> IndexedSource<'a> {
    /// Borrow the indices of an indexed texture; `None` for RGB textures
    pub fn from_texture(tex: &'a Texture) -> Option<Self> {
        match &tex.data {
            TexelData::Indexed { indices, .. } => Some(IndexedSource::Textured {
                indices,
                width: tex.width,
                height: tex.height,
            }),
            TexelData::Rgb(_) => None,
        }
    }
}

/// Span writer for 8-bit surfaces
pub struct IndexedWriter<'a> {
    source: IndexedSource<'a>,
    keyed: bool,
}

impl<'a> IndexedWriter<'a> {
    pub fn new(source: IndexedSource<'a>, keyed: bool) -> Self {
        Self { source, keyed }
    }
}

impl SpanWriter for IndexedWriter<'_> {
    fn texel_scale(&self) -> (f32, f32) {
        match self.source {
            IndexedSource::Flat(_) => (1.0, 1.0),
            IndexedSource::Textured { width, height, .. } => (width as f32, height as f32),
        }
    }

    fn write_span(
        &self,
        fb: &mut Framebuffer,
        y: usize,
        x0: usize,
        x1: usize,
        start: SpanStart,
        grad: &Gradients,
        depth_test: bool,
    ) -> u32 {
        let zrow = y * fb.width;
        let prow = y * fb.pitch;
        let SpanStart { mut z, mut u, mut v } = start;
        let mut written = 0;

        for x in x0..x1 {
            if !depth_test || z.0 < fb.zbuffer[zrow + x] {
                let index = match self.source {
                    IndexedSource::Flat(i) => i,
                    IndexedSource::Textured { indices, width, height } => {
                        let tx = u.floor() as usize & (width - 1);
                        let ty = v.floor() as usize & (height - 1);
                        indices[ty * width + tx]
                    }
                };
                let skip = self.keyed
                    && index == TRANSPARENT_INDEX
                    && matches!(self.source, IndexedSource::Textured { .. });
                if !skip {
                    fb.pixels[prow + x] = index;
                    if depth_test {
                        fb.zbuffer[zrow + x] = z.0;
                    }
                    written += 1;
                }
            }
            z += grad.dz;
            u += grad.du;
            v += grad.dv;
        }
        written
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rasterizer::{BlendMode, Palette, PixelFormat};

    fn start(z: i32) -> SpanStart {
        SpanStart { z: Fixed::from_int(z), u: Fixed::ZERO, v: Fixed::ZERO }
    }

    #[test]
    fn test_direct_span_depth_test() {
        let mut fb = Framebuffer::new(8, 1, PixelFormat::Rgba8888);
        let near = DirectWriter::<Rgba8888>::new(SpanSource::Flat(Color::RED), false);
        let far = DirectWriter::<Rgba8888>::new(SpanSource::Flat(Color::BLUE), false);
        let g = Gradients::default();

        assert_eq!(near.write_span(&mut fb, 0, 0, 4, start(10), &g, true), 4);
        // Farther span is hidden where the near one was drawn
        assert_eq!(far.write_span(&mut fb, 0, 0, 8, start(20), &g, true), 4);
        assert_eq!(fb.get_pixel(0, 0), Some(Color::RED));
        assert_eq!(fb.get_pixel(7, 0), Some(Color::BLUE));
        // Without depth test everything is overwritten and depth left alone
        assert_eq!(far.write_span(&mut fb, 0, 0, 8, start(30), &g, false), 8);
        assert_eq!(fb.depth_at(0, 0), Some(Fixed::from_int(10)));
    }

    #[test]
    fn test_keyed_texels_are_skipped() {
        let mut pixels = vec![Color::GREEN; 64];
        pixels[1] = Color::MAGIC_PINK;
        let tex = Texture::new_rgb("k", 8, 8, pixels).unwrap();
        let mut fb = Framebuffer::new(4, 1, PixelFormat::Rgb565);
        fb.clear(Color::BLACK);
        let grad = Gradients { dz: Fixed::ZERO, du: Fixed::ONE, dv: Fixed::ZERO };

        let keyed = DirectWriter::<Rgb565>::new(SpanSource::Textured(&tex), true);
        assert_eq!(keyed.write_span(&mut fb, 0, 0, 4, start(1), &grad, true), 3);
        assert_eq!(fb.get_pixel(1, 0), Some(Color::BLACK));
        assert_eq!(fb.get_pixel(2, 0), Some(Color::GREEN));

        let opaque = DirectWriter::<Rgb565>::new(SpanSource::Textured(&tex), false);
        assert_eq!(opaque.write_span(&mut fb, 0, 0, 4, start(0), &grad, true), 4);
    }

    #[test]
    fn test_indexed_span() {
        let pal = Palette::grayscale();
        let mut pixels = vec![Color::new(200, 200, 200); 64];
        pixels[0] = Color::MAGIC_PINK;
        let tex = Texture::new_rgb("k", 8, 8, pixels)
            .unwrap()
            .with_blend(BlendMode::ColorKey)
            .to_indexed(&pal);
        let mut fb = Framebuffer::new(4, 1, PixelFormat::Indexed8);
        fb.palette = pal;
        let grad = Gradients { dz: Fixed::ZERO, du: Fixed::ONE, dv: Fixed::ZERO };

        let src = IndexedSource::from_texture(&tex).unwrap();
        let w = IndexedWriter::new(src, true);
        assert_eq!(w.write_span(&mut fb, 0, 0, 4, start(1), &grad, true), 3);
        assert_eq!(fb.pixels[0], 0);
        assert_eq!(fb.pixels[1], 200);

        let rgb = Texture::checkerboard(8, 8, Color::WHITE, Color::BLACK).unwrap();
        assert!(IndexedSource::from_texture(&rgb).is_none());
    }
}
