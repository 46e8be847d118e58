//! Target surface for software rendering

use super::fixed::Fixed;
use super::span::{PixelPacker, Rgb565, Rgb888, Rgba8888};
use super::types::{Color, Palette, PixelFormat};

/// Framebuffer for software rendering
///
/// Pixels are packed in `format`, `pitch` bytes per row. The Z-buffer holds
/// one 16.16 camera-space depth per pixel, row-major, and is reset to
/// [`Fixed::MAX`] (infinitely far) on clear.
#[derive(Debug, Clone)]
pub struct Framebuffer {
    pub pixels: Vec<u8>,
    pub zbuffer: Vec<i32>,
    pub width: usize,
    pub height: usize,
    pub pitch: usize,
    pub format: PixelFormat,
    /// Color table for `Indexed8` surfaces
    pub palette: Palette,
}

impl Framebuffer {
    pub fn new(width: usize, height: usize, format: PixelFormat) -> Self {
        let pitch = width * format.bytes_per_pixel();
        Self {
            pixels: vec![0; pitch * height],
            zbuffer: vec![Fixed::MAX.0; width * height],
            width,
            height,
            pitch,
            format,
            palette: Palette::default(),
        }
    }

    pub fn resize(&mut self, width: usize, height: usize) {
        if self.width != width || self.height != height {
            self.width = width;
            self.height = height;
            self.pitch = width * self.format.bytes_per_pixel();
            self.pixels = vec![0; self.pitch * height];
            self.zbuffer = vec![Fixed::MAX.0; width * height];
        }
    }

    /// Encode a color in this surface's pixel format
    pub fn encode(&self, color: Color) -> [u8; 4] {
        let mut out = [0u8; 4];
        match self.format {
            PixelFormat::Indexed8 => out[0] = self.palette.nearest(color),
            PixelFormat::Rgb565 => Rgb565::pack(color, &mut out),
            PixelFormat::Rgb888 => Rgb888::pack(color, &mut out),
            PixelFormat::Rgba8888 => Rgba8888::pack(color, &mut out),
        }
        out
    }

    /// Fill every pixel with `color` and reset the Z-buffer
    pub fn clear(&mut self, color: Color) {
        let bpp = self.format.bytes_per_pixel();
        let packed = self.encode(color);
        for px in self.pixels.chunks_exact_mut(bpp) {
            px.copy_from_slice(&packed[..bpp]);
        }
        self.clear_depth();
    }

    pub fn clear_depth(&mut self) {
        self.zbuffer.fill(Fixed::MAX.0);
    }

    pub fn set_pixel(&mut self, x: usize, y: usize, color: Color) {
        if x < self.width && y < self.height {
            let bpp = self.format.bytes_per_pixel();
            let packed = self.encode(color);
            let off = y * self.pitch + x * bpp;
            self.pixels[off..off + bpp].copy_from_slice(&packed[..bpp]);
        }
    }

    /// Decode the pixel at (x, y)
    pub fn get_pixel(&self, x: usize, y: usize) -> Option<Color> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let off = y * self.pitch + x * self.format.bytes_per_pixel();
        let p = &self.pixels[off..];
        Some(match self.format {
            PixelFormat::Indexed8 => self.palette.lookup(p[0]),
            PixelFormat::Rgb565 => Color::from_rgb565(u16::from_le_bytes([p[0], p[1]])),
            PixelFormat::Rgb888 => Color::new(p[0], p[1], p[2]),
            PixelFormat::Rgba8888 => Color::with_alpha(p[0], p[1], p[2], p[3]),
        })
    }

    /// Depth stored at (x, y)
    pub fn depth_at(&self, x: usize, y: usize) -> Option<Fixed> {
        if x >= self.width || y >= self.height {
            return None;
        }
        Some(Fixed(self.zbuffer[y * self.width + x]))
    }

    /// Whole surface as RGBA8 (for presentation and PNG export)
    pub fn to_rgba(&self) -> Vec<u8> {
        if self.format == PixelFormat::Rgba8888 {
            return self.pixels.clone();
        }
        let mut out = Vec::with_capacity(self.width * self.height * 4);
        for y in 0..self.height {
            for x in 0..self.width {
                let c = self.get_pixel(x, y).unwrap_or(Color::BLACK);
                out.extend_from_slice(&c.to_bytes());
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_layout_per_format() {
        for (format, bpp) in [
            (PixelFormat::Indexed8, 1),
            (PixelFormat::Rgb565, 2),
            (PixelFormat::Rgb888, 3),
            (PixelFormat::Rgba8888, 4),
        ] {
            let fb = Framebuffer::new(16, 8, format);
            assert_eq!(fb.pitch, 16 * bpp);
            assert_eq!(fb.pixels.len(), 16 * 8 * bpp);
            assert_eq!(fb.zbuffer.len(), 16 * 8);
        }
    }

    #[test]
    fn test_clear_and_read_back() {
        for format in [PixelFormat::Rgb565, PixelFormat::Rgb888, PixelFormat::Rgba8888] {
            let mut fb = Framebuffer::new(4, 4, format);
            fb.zbuffer[3] = 7;
            fb.clear(Color::RED);
            assert_eq!(fb.get_pixel(3, 3), Some(Color::RED));
            assert_eq!(fb.depth_at(3, 0), Some(Fixed::MAX));
        }
        let mut fb = Framebuffer::new(4, 4, PixelFormat::Indexed8);
        fb.clear(Color::WHITE);
        assert_eq!(fb.get_pixel(0, 0), Some(Color::WHITE));
        assert_eq!(fb.get_pixel(4, 0), None);
    }

    #[test]
    fn test_to_rgba() {
        let mut fb = Framebuffer::new(2, 1, PixelFormat::Rgb888);
        fb.set_pixel(1, 0, Color::BLUE);
        assert_eq!(fb.to_rgba(), vec![0, 0, 0, 255, 0, 0, 255, 255]);
    }
}
