//! Core types for the rasterizer

use serde::{Deserialize, Serialize};

/// RGBA color (0-255 per channel)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Color {
    pub const BLACK: Color = Color { r: 0, g: 0, b: 0, a: 255 };
    pub const WHITE: Color = Color { r: 255, g: 255, b: 255, a: 255 };
    pub const RED: Color = Color { r: 255, g: 0, b: 0, a: 255 };
    pub const GREEN: Color = Color { r: 0, g: 255, b: 0, a: 255 };
    pub const BLUE: Color = Color { r: 0, g: 0, b: 255, a: 255 };
    pub const GRAY: Color = Color { r: 128, g: 128, b: 128, a: 255 };

    /// Color key for punch-through texels in direct-color textures
    pub const MAGIC_PINK: Color = Color { r: 255, g: 0, b: 255, a: 255 };

    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b, a: 255 }
    }

    pub const fn with_alpha(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    /// Build from 0.0-1.0 float channels (MTL `Kd` style)
    pub fn from_unit(r: f32, g: f32, b: f32) -> Self {
        let c = |v: f32| (v.clamp(0.0, 1.0) * 255.0).round() as u8;
        Self::new(c(r), c(g), c(b))
    }

    /// Same RGB, ignoring alpha
    #[inline]
    pub fn same_rgb(self, other: Color) -> bool {
        self.r == other.r && self.g == other.g && self.b == other.b
    }

    /// Pack to RGB565
    #[inline]
    pub fn to_rgb565(self) -> u16 {
        ((self.r as u16 >> 3) << 11) | ((self.g as u16 >> 2) << 5) | (self.b as u16 >> 3)
    }

    /// Unpack from RGB565, replicating high bits into the low ones
    #[inline]
    pub fn from_rgb565(v: u16) -> Self {
        let r5 = ((v >> 11) & 0x1F) as u8;
        let g6 = ((v >> 5) & 0x3F) as u8;
        let b5 = (v & 0x1F) as u8;
        Self::new((r5 << 3) | (r5 >> 2), (g6 << 2) | (g6 >> 4), (b5 << 3) | (b5 >> 2))
    }

    /// Convert to [u8; 4] for an RGBA framebuffer
    pub fn to_bytes(self) -> [u8; 4] {
        [self.r, self.g, self.b, self.a]
    }

    fn distance_sq(self, other: Color) -> u32 {
        let dr = self.r as i32 - other.r as i32;
        let dg = self.g as i32 - other.g as i32;
        let db = self.b as i32 - other.b as i32;
        (dr * dr + dg * dg + db * db) as u32
    }
}

impl Default for Color {
    fn default() -> Self {
        Color::WHITE
    }
}

/// 256-entry color table for 8-bit surfaces and indexed textures
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Palette {
    pub colors: Vec<Color>,
}

impl Palette {
    pub const SIZE: usize = 256;

    /// Grayscale ramp, index 0 black
    pub fn grayscale() -> Self {
        Self {
            colors: (0..Self::SIZE).map(|i| Color::new(i as u8, i as u8, i as u8)).collect(),
        }
    }

    /// 3-3-2 RGB cube, the usual default for 8-bit direct rendering
    pub fn rgb332() -> Self {
        let colors = (0..Self::SIZE)
            .map(|i| {
                let r = ((i >> 5) & 7) as u32;
                let g = ((i >> 2) & 7) as u32;
                let b = (i & 3) as u32;
                Color::new((r * 255 / 7) as u8, (g * 255 / 7) as u8, (b * 255 / 3) as u8)
            })
            .collect();
        Self { colors }
    }

    /// Build from up to 256 colors; missing entries are black
    pub fn from_colors(colors: &[Color]) -> Self {
        let mut table = vec![Color::BLACK; Self::SIZE];
        for (dst, src) in table.iter_mut().zip(colors) {
            *dst = *src;
        }
        Self { colors: table }
    }

    #[inline]
    pub fn lookup(&self, index: u8) -> Color {
        self.colors.get(index as usize).copied().unwrap_or(Color::BLACK)
    }

    /// Index of the nearest color by squared RGB distance (first match wins)
    pub fn nearest(&self, color: Color) -> u8 {
        self.nearest_from(color, 0)
    }

    /// Like [`Palette::nearest`] but only considers indices >= `first`
    pub fn nearest_from(&self, color: Color, first: usize) -> u8 {
        let mut best = first.min(Self::SIZE - 1);
        let mut best_dist = u32::MAX;
        for (i, c) in self.colors.iter().enumerate().skip(first) {
            let d = c.distance_sq(color);
            if d < best_dist {
                best = i;
                best_dist = d;
                if d == 0 {
                    break;
                }
            }
        }
        best as u8
    }
}

impl Default for Palette {
    fn default() -> Self {
        Palette::rgb332()
    }
}

/// Pixel layout of a target surface
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum PixelFormat {
    /// 8-bit palette indices
    Indexed8,
    /// 16-bit direct color
    Rgb565,
    /// 24-bit direct color
    Rgb888,
    /// 32-bit direct color
    #[default]
    Rgba8888,
}

impl PixelFormat {
    #[inline]
    pub fn bytes_per_pixel(self) -> usize {
        match self {
            PixelFormat::Indexed8 => 1,
            PixelFormat::Rgb565 => 2,
            PixelFormat::Rgb888 => 3,
            PixelFormat::Rgba8888 => 4,
        }
    }

    #[inline]
    pub fn bits_per_pixel(self) -> usize {
        self.bytes_per_pixel() * 8
    }

    /// Whether pixels hold colors directly (16/24/32-bit)
    #[inline]
    pub fn is_direct(self) -> bool {
        self != PixelFormat::Indexed8
    }
}

/// How texels are written to the surface
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum BlendMode {
    /// Overwrite the pixel
    #[default]
    Opaque,
    /// Skip texels equal to the transparent index (8-bit) or color key (direct)
    ColorKey,
}
