//! BONNIE-3D: a retro software 3D renderer
//!
//! Entities, heightmap terrain and a skybox go through a fixed-point
//! transform / clip / scanline pipeline into a framebuffer. The same draw
//! calls can be routed to one of two optional hardware backends instead,
//! switchable at runtime without touching the scene.
//!
//! - `rasterizer` - Math, fixed point, framebuffer, scanline fill
//! - `texture` - Texture table and material declarations
//! - `mesh` - OBJ/MTL and 3DS loading, 3DS writing
//! - `world` - Entities, terrain, skybox and the [`World`] render context
//! - `pipeline` - Transform, cull, clip and project
//! - `backend` - Software and accelerated renderers
//! - `config` - RON engine configuration

/// Version from Cargo.toml
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub mod backend;
pub mod config;
pub mod error;
pub mod mesh;
pub mod pipeline;
pub mod rasterizer;
pub mod texture;
pub mod world;

pub use backend::{BackendKind, DriverRegistry};
pub use config::EngineConfig;
pub use error::{EngineError, ErrorKind, LastError, Result};
pub use rasterizer::{Camera, Color, Framebuffer, PixelFormat, Vec3};
pub use world::{Entity, FrameMetrics, World};
