//! Engine configuration (RON)
//!
//! Every field has a default, so a config file only lists what it changes:
//!
//! ```ron
//! (
//!     screen: (width: 320, height: 240, format: Rgb565),
//!     zbuffer: false,
//!     backend: HardwareA,
//! )
//! ```

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::backend::BackendKind;
use crate::error::{EngineError, Result};
use crate::rasterizer::{Camera, Color, Framebuffer, PixelFormat, HEIGHT, WIDTH};
use crate::world::TerrainSettings;

/// Limits on configured screen size
const MAX_SCREEN: usize = 4096;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScreenConfig {
    pub width: usize,
    pub height: usize,
    pub format: PixelFormat,
}

impl Default for ScreenConfig {
    fn default() -> Self {
        Self {
            width: WIDTH,
            height: HEIGHT,
            format: PixelFormat::Rgba8888,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CameraConfig {
    pub near: f32,
    pub far: f32,
    /// Projection distance in pixels; half the screen width when unset
    pub distance: Option<f32>,
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            near: 1.0,
            far: 4096.0,
            distance: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TerrainConfig {
    pub cell_size: f32,
    pub height_zoom: f32,
    pub lod_distances: [f32; 2],
}

impl Default for TerrainConfig {
    fn default() -> Self {
        let s = TerrainSettings::default();
        Self {
            cell_size: s.cell_size,
            height_zoom: s.height_zoom,
            lod_distances: s.lod_distances,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub screen: ScreenConfig,
    pub zbuffer: bool,
    pub backend: BackendKind,
    pub camera: CameraConfig,
    pub terrain: TerrainConfig,
    pub backface_cull: bool,
    pub clear_color: Color,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            screen: ScreenConfig::default(),
            zbuffer: true,
            backend: BackendKind::Software,
            camera: CameraConfig::default(),
            terrain: TerrainConfig::default(),
            backface_cull: true,
            clear_color: Color::new(20, 22, 28),
        }
    }
}

impl EngineConfig {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path).map_err(|e| EngineError::read(path, e))?;
        let config = Self::from_ron_str(&contents)?;
        log::info!("loaded config from {}", path.display());
        Ok(config)
    }

    pub fn from_ron_str(s: &str) -> Result<Self> {
        let config: EngineConfig = ron::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_ron_string(&self) -> Result<String> {
        let pretty = ron::ser::PrettyConfig::new().depth_limit(3).indentor("  ".to_string());
        Ok(ron::ser::to_string_pretty(self, pretty)?)
    }

    fn validate(&self) -> Result<()> {
        let ScreenConfig { width, height, .. } = self.screen;
        if width == 0 || height == 0 || width > MAX_SCREEN || height > MAX_SCREEN {
            return Err(EngineError::unsupported(format!("screen {}x{}", width, height)));
        }
        let c = &self.camera;
        if !(c.near > 0.0 && c.far > c.near) {
            return Err(EngineError::format(format!("camera planes near {} far {}", c.near, c.far)));
        }
        Ok(())
    }

    pub fn framebuffer(&self) -> Framebuffer {
        Framebuffer::new(self.screen.width, self.screen.height, self.screen.format)
    }

    pub fn camera(&self) -> Camera {
        let mut cam = Camera::new(self.screen.width, self.screen.height);
        cam.near = self.camera.near;
        cam.far = self.camera.far;
        if let Some(d) = self.camera.distance {
            cam.distance = d;
        }
        cam
    }

    pub fn terrain_settings(&self) -> TerrainSettings {
        TerrainSettings {
            cell_size: self.terrain.cell_size,
            height_zoom: self.terrain.height_zoom,
            lod_distances: self.terrain.lod_distances,
            ..TerrainSettings::default()
        }
    }
}
