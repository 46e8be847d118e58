//! Retro software rasterizer
//!
//! Features:
//! - Affine texture mapping with 16.16 fixed-point edge walking
//! - Flat-top / flat-bottom / generic triangle classification
//! - Z-buffer or painter's algorithm (sorted element queue)
//! - 8, 16, 24 and 32-bit targets, opaque or color-keyed
//!
//! # Module Organization
//!
//! - `types` - Color, Palette, PixelFormat, BlendMode
//! - `math` - Vec3, Vec2, Mat3, object/view rotation matrices
//! - `fixed` - Fixed-point type and trig tables
//! - `camera` - Camera struct for 3D rendering
//! - `framebuffer` - Target surface with Z-buffer
//! - `span` - Pixel-span writers per depth and blend mode
//! - `raster` - Triangle classification and scanline fill
//! - `queue` - Depth-sorted element queue
//! - `constants` - Screen resolution and capacity constants

pub mod camera;
pub mod constants;
pub mod fixed;
pub mod framebuffer;
pub mod math;
pub mod queue;
pub mod raster;
pub mod span;
pub mod types;

// =============================================================================
// Convenience re-exports for commonly used items
// =============================================================================

pub use types::{BlendMode, Color, Palette, PixelFormat};

pub use math::{face_normal, object_matrix, view_matrix, Mat3, Vec2, Vec3};

pub use fixed::{cosine, degrees_to_angle, normalize_angle, sine, tangent, Fixed};

pub use camera::Camera;

pub use framebuffer::Framebuffer;

pub use raster::{classify, rasterize_triangle, ScreenVertex, TriangleClass};

pub use span::{
    DirectWriter, Gradients, IndexedSource, IndexedWriter, PixelPacker, Rgb565, Rgb888, Rgba8888,
    SpanSource, SpanStart, SpanWriter,
};

pub use queue::ElementQueue;

pub use constants::{HEIGHT, WIDTH};
