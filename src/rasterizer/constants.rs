//! Rasterizer constants
//!
//! Screen resolution defaults and the fixed capacities of the pipeline.

/// Default screen width
pub const WIDTH: usize = 320;

/// Default screen height
pub const HEIGHT: usize = 240;

/// Angle units per degree (0.1° resolution)
pub const ANGLE_PRECISION: i32 = 10;

/// One full turn in angle units
pub const FULL_TURN: i32 = 360 * ANGLE_PRECISION;

/// Fractional bits of the scanline fixed-point format
pub const FIXED_SHIFT: u32 = 16;

/// Largest vertex count a single entity may declare
pub const MAX_VERTICES: usize = 65_000;

/// Largest face count a single entity may declare
pub const MAX_FACES: usize = 65_000;

/// Capacity of the sorted element queue
pub const QUEUE_CAPACITY: usize = 8_192;

/// Slot counts of the world tables
pub const MAX_CAMERAS: usize = 8;
pub const MAX_ENTITIES: usize = 256;
pub const MAX_MATERIALS: usize = 256;
pub const MAX_TEXTURES: usize = 256;

/// Screen position given to vertices at or behind the projection plane
pub const DEGENERATE_SCREEN: (f32, f32) = (-32_768.0, -32_768.0);
