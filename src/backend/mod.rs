//! Render backends
//!
//! Every draw goes through a [`RenderBackend`]. The software backend is
//! always present; the two hardware slots are filled at runtime from a
//! [`DriverRegistry`] and may be unavailable. Shared code never branches on
//! which backend is active.
//!
//! - `software` - Scanline rasterizer into the framebuffer
//! - `accelerated` - Hardware slot A/B over an [`AccelDriver`]
//! - `registry` - Runtime driver probing
//! - `macroquad_driver` - The shipped driver for slot A

mod accelerated;
mod macroquad_driver;
#[cfg(test)]
pub(crate) mod mock;
mod registry;
mod software;

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::pipeline::{DrawTriangle, ViewState};
use crate::rasterizer::{Color, Framebuffer, ScreenVertex};
use crate::texture::{Texture, TextureLibrary};

pub use accelerated::{AccelDriver, AcceleratedBackend, DriverTriangle, TextureHandle};
pub use macroquad_driver::MacroquadDriver;
pub use registry::{DriverFactory, DriverRegistry};
pub use software::SoftwareBackend;

/// Backend selector
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum BackendKind {
    #[default]
    Software,
    HardwareA,
    HardwareB,
}

impl BackendKind {
    pub const ALL: [BackendKind; 3] = [BackendKind::Software, BackendKind::HardwareA, BackendKind::HardwareB];

    pub fn name(self) -> &'static str {
        match self {
            BackendKind::Software => "software",
            BackendKind::HardwareA => "hardware-a",
            BackendKind::HardwareB => "hardware-b",
        }
    }

    /// Integer selector: 0 software, 1 hardware A, 2 hardware B
    pub fn from_index(index: usize) -> Option<Self> {
        Self::ALL.get(index).copied()
    }

    pub fn index(self) -> usize {
        self as usize
    }

    pub fn is_hardware(self) -> bool {
        self != BackendKind::Software
    }
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// What a backend can do
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BackendCaps {
    /// Per-pixel depth test available
    pub depth_buffer: bool,
    /// Can target 8-bit palette surfaces
    pub indexed_targets: bool,
    /// Reports pixels written
    pub pixel_counts: bool,
}

/// Result of one draw call
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DrawStats {
    pub triangles: u32,
    pub pixels: u64,
}

impl DrawStats {
    pub fn merge(&mut self, other: DrawStats) {
        self.triangles += other.triangles;
        self.pixels += other.pixels;
    }
}

/// Fill of one triangle: a texture slot, or flat color when `None` or when
/// the slot is empty
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TriangleMaterial {
    pub texture: Option<usize>,
    pub color: Color,
}

/// Indexed triangle list, three indices and one material per triangle
#[derive(Debug, Clone, Default)]
pub struct TriangleBatch {
    pub vertices: Vec<ScreenVertex>,
    pub indices: Vec<u32>,
    pub materials: Vec<TriangleMaterial>,
    pub depth_test: bool,
}

impl TriangleBatch {
    pub fn new(depth_test: bool) -> Self {
        Self {
            depth_test,
            ..Self::default()
        }
    }

    pub fn clear(&mut self) {
        self.vertices.clear();
        self.indices.clear();
        self.materials.clear();
    }

    pub fn push(&mut self, tri: &DrawTriangle) {
        let base = self.vertices.len() as u32;
        self.vertices.extend_from_slice(&tri.vertices);
        self.indices.extend_from_slice(&[base, base + 1, base + 2]);
        self.materials.push(tri.material);
    }

    /// Number of triangles
    pub fn len(&self) -> usize {
        self.materials.len()
    }

    pub fn is_empty(&self) -> bool {
        self.materials.is_empty()
    }

    /// Vertices of triangle `i`. Out-of-range indices yield `None`.
    pub fn triangle(&self, i: usize) -> Option<[ScreenVertex; 3]> {
        let idx = self.indices.get(i * 3..i * 3 + 3)?;
        let mut out = [ScreenVertex::default(); 3];
        for (o, &k) in out.iter_mut().zip(idx) {
            *o = *self.vertices.get(k as usize)?;
        }
        Some(out)
    }
}

/// Uniform draw interface over software and hardware renderers
pub trait RenderBackend {
    fn kind(&self) -> BackendKind;

    fn caps(&self) -> BackendCaps;

    /// Clear color and depth, ready for draws
    fn begin_frame(&mut self, fb: &mut Framebuffer, clear: Color) -> Result<()>;

    /// Create or refresh the backend copy of texture `slot`
    fn upload_texture(&mut self, slot: usize, texture: &Texture) -> Result<()>;

    /// Drop every backend texture; CPU textures are untouched
    fn release_textures(&mut self);

    fn set_matrices(&mut self, view: &ViewState);

    fn draw_indexed_triangles(
        &mut self,
        batch: &TriangleBatch,
        textures: &TextureLibrary,
        fb: &mut Framebuffer,
    ) -> Result<DrawStats>;

    /// Finish drawing; the framebuffer holds the frame afterwards
    fn end_frame(&mut self, fb: &mut Framebuffer) -> Result<()>;

    fn present(&mut self, fb: &Framebuffer);
}

/// Construct the backend for `kind`, probing `registry` for hardware slots
pub fn create_backend(kind: BackendKind, registry: &DriverRegistry) -> Result<Box<dyn RenderBackend>> {
    match kind {
        BackendKind::Software => Ok(Box::new(SoftwareBackend::new())),
        hw => {
            let driver = registry.probe(hw)?;
            Ok(Box::new(AcceleratedBackend::new(hw, driver)))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    #[test]
    fn test_kind_selector() {
        assert_eq!(BackendKind::from_index(0), Some(BackendKind::Software));
        assert_eq!(BackendKind::from_index(2), Some(BackendKind::HardwareB));
        assert_eq!(BackendKind::from_index(3), None);
        for k in BackendKind::ALL {
            assert_eq!(BackendKind::from_index(k.index()), Some(k));
        }
        assert_eq!(BackendKind::HardwareA.to_string(), "hardware-a");
    }

    #[test]
    fn test_batch_push_and_fetch() {
        let mut batch = TriangleBatch::new(true);
        let v = |x: f32| ScreenVertex::new(x, 0.0, 1.0, 0.0, 0.0);
        let material = TriangleMaterial {
            texture: None,
            color: Color::RED,
        };
        batch.push(&DrawTriangle {
            vertices: [v(0.0), v(1.0), v(2.0)],
            material,
        });
        batch.push(&DrawTriangle {
            vertices: [v(3.0), v(4.0), v(5.0)],
            material,
        });
        assert_eq!(batch.len(), 2);
        assert_eq!(batch.indices, vec![0, 1, 2, 3, 4, 5]);
        assert_eq!(batch.triangle(1).map(|t| t[2].x), Some(5.0));
        assert!(batch.triangle(2).is_none());
    }

    #[test]
    fn test_create_software_always_works() {
        let backend = create_backend(BackendKind::Software, &DriverRegistry::new()).unwrap();
        assert_eq!(backend.kind(), BackendKind::Software);
        assert!(backend.caps().indexed_targets);
    }

    #[test]
    fn test_create_unregistered_hardware_fails() {
        let err = create_backend(BackendKind::HardwareB, &DriverRegistry::new()).err().unwrap();
        assert_eq!(err.kind(), ErrorKind::BackendUnavailable);
    }
}
