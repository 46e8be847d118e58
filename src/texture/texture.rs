//! CPU-side texture objects
//!
//! A texture is either palette-indexed (8-bit indices plus a 256-entry
//! [`Palette`]) or direct RGB. Dimensions are powers of two between 8 and
//! 256 so the rasterizer can wrap texel coordinates with a mask.

use std::path::Path;

use crate::error::{EngineError, Result};
use crate::rasterizer::{BlendMode, Color, Palette};

/// Smallest supported texture edge
pub const MIN_TEXTURE_SIZE: usize = 8;

/// Largest supported texture edge
pub const MAX_TEXTURE_SIZE: usize = 256;

/// Palette index treated as transparent by color-keyed indexed textures
pub const TRANSPARENT_INDEX: u8 = 0;

/// Texel storage
#[derive(Debug, Clone, PartialEq)]
pub enum TexelData {
    Indexed { indices: Vec<u8>, palette: Palette },
    Rgb(Vec<Color>),
}

/// Format tag of a texture
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextureFormat {
    Indexed,
    Rgb,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Texture {
    pub name: String,
    pub width: usize,
    pub height: usize,
    pub data: TexelData,
    /// Opaque, or color-keyed for punch-through texels
    pub blend: BlendMode,
}

/// Validate one texture edge
fn check_edge(what: &str, n: usize) -> Result<()> {
    if !(MIN_TEXTURE_SIZE..=MAX_TEXTURE_SIZE).contains(&n) || !n.is_power_of_two() {
        return Err(EngineError::unsupported(format!(
            "texture {} {} (must be a power of two in {}..={})",
            what, n, MIN_TEXTURE_SIZE, MAX_TEXTURE_SIZE
        )));
    }
    Ok(())
}

impl Texture {
    /// Create a direct-color texture
    pub fn new_rgb(name: impl Into<String>, width: usize, height: usize, pixels: Vec<Color>) -> Result<Self> {
        check_edge("width", width)?;
        check_edge("height", height)?;
        if pixels.len() != width * height {
            return Err(EngineError::format(format!(
                "texture pixel count {} does not match {}x{}",
                pixels.len(),
                width,
                height
            )));
        }
        Ok(Self {
            name: name.into(),
            width,
            height,
            data: TexelData::Rgb(pixels),
            blend: BlendMode::Opaque,
        })
    }

    /// Create a palette-indexed texture
    pub fn new_indexed(
        name: impl Into<String>,
        width: usize,
        height: usize,
        indices: Vec<u8>,
        palette: Palette,
    ) -> Result<Self> {
        check_edge("width", width)?;
        check_edge("height", height)?;
        if indices.len() != width * height {
            return Err(EngineError::format(format!(
                "texture index count {} does not match {}x{}",
                indices.len(),
                width,
                height
            )));
        }
        Ok(Self {
            name: name.into(),
            width,
            height,
            data: TexelData::Indexed { indices, palette },
            blend: BlendMode::Opaque,
        })
    }

    /// Create a checkerboard test texture
    pub fn checkerboard(width: usize, height: usize, color1: Color, color2: Color) -> Result<Self> {
        let mut pixels = Vec::with_capacity(width * height);
        for y in 0..height {
            for x in 0..width {
                let checker = ((x / 4) + (y / 4)) % 2 == 0;
                pixels.push(if checker { color1 } else { color2 });
            }
        }
        Self::new_rgb("checkerboard", width, height, pixels)
    }

    /// Build from a decoded RGBA image
    pub fn from_rgba_image(name: impl Into<String>, img: &image::RgbaImage) -> Result<Self> {
        let pixels = img
            .pixels()
            .map(|p| Color::with_alpha(p[0], p[1], p[2], p[3]))
            .collect();
        Self::new_rgb(name, img.width() as usize, img.height() as usize, pixels)
    }

    /// Load texture from an image file (PNG/JPEG/BMP)
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let img = image::open(path).map_err(|e| EngineError::read(path, e))?;
        let name = path
            .file_stem()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_default();
        Self::from_rgba_image(name, &img.to_rgba8())
    }

    pub fn with_blend(mut self, blend: BlendMode) -> Self {
        self.blend = blend;
        self
    }

    pub fn format(&self) -> TextureFormat {
        match self.data {
            TexelData::Indexed { .. } => TextureFormat::Indexed,
            TexelData::Rgb(_) => TextureFormat::Rgb,
        }
    }

    /// Color of the texel at (x, y); coordinates wrap
    #[inline]
    pub fn color_at(&self, x: usize, y: usize) -> Color {
        let idx = (y & (self.height - 1)) * self.width + (x & (self.width - 1));
        match &self.data {
            TexelData::Rgb(pixels) => pixels[idx],
            TexelData::Indexed { indices, palette } => palette.lookup(indices[idx]),
        }
    }

    /// Whether the texel at (x, y) is the transparent key
    #[inline]
    pub fn is_key_at(&self, x: usize, y: usize) -> bool {
        let idx = (y & (self.height - 1)) * self.width + (x & (self.width - 1));
        match &self.data {
            TexelData::Rgb(pixels) => is_key_color(pixels[idx]),
            TexelData::Indexed { indices, .. } => indices[idx] == TRANSPARENT_INDEX,
        }
    }

    /// Convert to an indexed texture against `palette` (nearest color per texel).
    /// Color-key texels map to [`TRANSPARENT_INDEX`].
    pub fn to_indexed(&self, palette: &Palette) -> Texture {
        let keyed = self.blend == BlendMode::ColorKey;
        // Keyed textures must not land on the transparent index by accident
        let first = if keyed { TRANSPARENT_INDEX as usize + 1 } else { 0 };
        let indices = match &self.data {
            TexelData::Indexed { indices, palette: own } => indices
                .iter()
                .map(|&i| {
                    if keyed && i == TRANSPARENT_INDEX {
                        TRANSPARENT_INDEX
                    } else {
                        palette.nearest_from(own.lookup(i), first)
                    }
                })
                .collect(),
            TexelData::Rgb(pixels) => pixels
                .iter()
                .map(|&c| {
                    if keyed && is_key_color(c) {
                        TRANSPARENT_INDEX
                    } else {
                        palette.nearest_from(c, first)
                    }
                })
                .collect(),
        };
        Texture {
            name: self.name.clone(),
            width: self.width,
            height: self.height,
            data: TexelData::Indexed {
                indices,
                palette: palette.clone(),
            },
            blend: self.blend,
        }
    }

    /// RGBA bytes, row-major (for GPU upload)
    pub fn to_rgba_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.width * self.height * 4);
        for y in 0..self.height {
            for x in 0..self.width {
                let mut c = self.color_at(x, y);
                if self.blend == BlendMode::ColorKey && self.is_key_at(x, y) {
                    c.a = 0;
                }
                out.extend_from_slice(&c.to_bytes());
            }
        }
        out
    }
}

/// Direct-color key: magic pink, or a fully transparent source pixel
#[inline]
pub fn is_key_color(c: Color) -> bool {
    c.a == 0 || c.same_rgb(Color::MAGIC_PINK)
}
