//! Hardware backend slots
//!
//! Both hardware slots share this backend; what differs is the
//! [`AccelDriver`] behind it. Drivers receive already projected triangles
//! grouped into runs that share a texture. Drivers without a depth buffer get
//! their triangles sorted back to front first.

use std::collections::HashMap;

use crate::error::{EngineError, Result};
use crate::pipeline::ViewState;
use crate::rasterizer::queue::average_depth;
use crate::rasterizer::{Color, Framebuffer, ScreenVertex};
use crate::texture::{Texture, TextureLibrary};

use super::{BackendCaps, BackendKind, DrawStats, RenderBackend, TriangleBatch};

/// Driver-side texture id
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TextureHandle(pub u32);

/// One triangle as a driver sees it. `color` modulates the texture, white
/// for textured triangles.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DriverTriangle {
    pub vertices: [ScreenVertex; 3],
    pub color: Color,
}

/// A device that can fill triangles and read the result back
pub trait AccelDriver {
    fn name(&self) -> &str;

    fn has_depth_buffer(&self) -> bool {
        false
    }

    fn begin_frame(&mut self, width: usize, height: usize, clear: Color) -> Result<()>;

    fn set_view(&mut self, _view: &ViewState) {}

    fn create_texture(&mut self, texture: &Texture) -> Result<TextureHandle>;

    fn destroy_texture(&mut self, handle: TextureHandle);

    fn draw_triangles(
        &mut self,
        texture: Option<TextureHandle>,
        triangles: &[DriverTriangle],
        depth_test: bool,
    ) -> Result<()>;

    /// Finish the frame and copy it into `fb`
    fn end_frame(&mut self, fb: &mut Framebuffer) -> Result<()>;
}

pub struct AcceleratedBackend {
    kind: BackendKind,
    driver: Box<dyn AccelDriver>,
    handles: HashMap<usize, TextureHandle>,
    order: Vec<usize>,
    run: Vec<DriverTriangle>,
}

impl AcceleratedBackend {
    pub fn new(kind: BackendKind, driver: Box<dyn AccelDriver>) -> Self {
        log::info!("{} backend on driver '{}'", kind, driver.name());
        Self {
            kind,
            driver,
            handles: HashMap::new(),
            order: Vec::new(),
            run: Vec::new(),
        }
    }

    /// Textures currently held by the driver
    pub fn texture_count(&self) -> usize {
        self.handles.len()
    }

    fn flush_run(&mut self, texture: Option<TextureHandle>, depth_test: bool) -> Result<()> {
        if self.run.is_empty() {
            return Ok(());
        }
        let result = self.driver.draw_triangles(texture, &self.run, depth_test);
        self.run.clear();
        result
    }
}

impl Drop for AcceleratedBackend {
    fn drop(&mut self) {
        self.release_textures();
    }
}

impl RenderBackend for AcceleratedBackend {
    fn kind(&self) -> BackendKind {
        self.kind
    }

    fn caps(&self) -> BackendCaps {
        BackendCaps {
            depth_buffer: self.driver.has_depth_buffer(),
            indexed_targets: false,
            pixel_counts: false,
        }
    }

    fn begin_frame(&mut self, fb: &mut Framebuffer, clear: Color) -> Result<()> {
        if !fb.format.is_direct() {
            return Err(EngineError::BackendUnavailable(format!(
                "{} needs a direct-color surface, got {:?}",
                self.kind, fb.format
            )));
        }
        self.driver.begin_frame(fb.width, fb.height, clear)
    }

    fn upload_texture(&mut self, slot: usize, texture: &Texture) -> Result<()> {
        if let Some(old) = self.handles.remove(&slot) {
            self.driver.destroy_texture(old);
        }
        let handle = self.driver.create_texture(texture)?;
        self.handles.insert(slot, handle);
        Ok(())
    }

    fn release_textures(&mut self) {
        for (_, handle) in self.handles.drain() {
            self.driver.destroy_texture(handle);
        }
    }

    fn set_matrices(&mut self, view: &ViewState) {
        self.driver.set_view(view);
    }

    fn draw_indexed_triangles(
        &mut self,
        batch: &TriangleBatch,
        textures: &TextureLibrary,
        _fb: &mut Framebuffer,
    ) -> Result<DrawStats> {
        let depth_test = batch.depth_test && self.driver.has_depth_buffer();

        let mut order = std::mem::take(&mut self.order);
        order.clear();
        order.extend(0..batch.len());
        if batch.depth_test && !depth_test {
            let depth = |i: usize| batch.triangle(i).map_or(0.0, |t| average_depth(t.map(|v| v.z)));
            order.sort_by(|&a, &b| depth(b).total_cmp(&depth(a)));
        }

        let mut stats = DrawStats::default();
        let mut current: Option<Option<TextureHandle>> = None;
        let mut result = Ok(());
        for &i in &order {
            let Some(vertices) = batch.triangle(i) else {
                continue;
            };
            let material = batch.materials[i];
            let handle = material
                .texture
                .filter(|&slot| textures.get(slot).is_some())
                .and_then(|slot| self.handles.get(&slot).copied());
            if current != Some(handle) {
                if let Some(prev) = current {
                    result = self.flush_run(prev, depth_test);
                    if result.is_err() {
                        break;
                    }
                }
                current = Some(handle);
            }
            let color = if handle.is_some() { Color::WHITE } else { material.color };
            self.run.push(DriverTriangle { vertices, color });
            stats.triangles += 1;
        }
        if result.is_ok() {
            if let Some(prev) = current {
                result = self.flush_run(prev, depth_test);
            }
        }
        self.run.clear();
        self.order = order;
        result.map(|_| stats)
    }

    fn end_frame(&mut self, fb: &mut Framebuffer) -> Result<()> {
        self.driver.end_frame(fb)
    }

    fn present(&mut self, _fb: &Framebuffer) {
        // end_frame already copied the device image into the framebuffer
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::mock::RecordingDriver;
    use crate::backend::TriangleMaterial;
    use crate::error::ErrorKind;
    use crate::pipeline::DrawTriangle;
    use crate::rasterizer::PixelFormat;

    fn tri(z: f32, material: TriangleMaterial) -> DrawTriangle {
        let v = |x: f32, y: f32| ScreenVertex::new(x, y, z, 0.0, 0.0);
        DrawTriangle {
            vertices: [v(0.0, 0.0), v(4.0, 0.0), v(0.0, 4.0)],
            material,
        }
    }

    fn flat(color: Color) -> TriangleMaterial {
        TriangleMaterial { texture: None, color }
    }

    #[test]
    fn test_rejects_indexed_surface() {
        let (driver, _) = RecordingDriver::new(false);
        let mut backend = AcceleratedBackend::new(BackendKind::HardwareA, Box::new(driver));
        let mut fb = Framebuffer::new(8, 8, PixelFormat::Indexed8);
        let err = backend.begin_frame(&mut fb, Color::BLACK).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::BackendUnavailable);
    }

    #[test]
    fn test_sorts_back_to_front_without_depth_buffer() {
        let (driver, log) = RecordingDriver::new(false);
        let mut backend = AcceleratedBackend::new(BackendKind::HardwareA, Box::new(driver));
        let mut batch = TriangleBatch::new(true);
        batch.push(&tri(5.0, flat(Color::RED)));
        batch.push(&tri(50.0, flat(Color::RED)));
        batch.push(&tri(20.0, flat(Color::RED)));
        let mut fb = Framebuffer::new(8, 8, PixelFormat::Rgba8888);
        let stats = backend.draw_indexed_triangles(&batch, &TextureLibrary::new(), &mut fb).unwrap();
        assert_eq!(stats.triangles, 3);
        assert_eq!(log.borrow().depths, vec![50.0, 20.0, 5.0]);
    }

    #[test]
    fn test_keeps_order_with_depth_buffer() {
        let (driver, log) = RecordingDriver::new(true);
        let mut backend = AcceleratedBackend::new(BackendKind::HardwareB, Box::new(driver));
        assert!(backend.caps().depth_buffer);
        let mut batch = TriangleBatch::new(true);
        batch.push(&tri(5.0, flat(Color::RED)));
        batch.push(&tri(50.0, flat(Color::RED)));
        let mut fb = Framebuffer::new(8, 8, PixelFormat::Rgba8888);
        backend.draw_indexed_triangles(&batch, &TextureLibrary::new(), &mut fb).unwrap();
        assert_eq!(log.borrow().depths, vec![5.0, 50.0]);
    }

    #[test]
    fn test_groups_runs_by_texture() {
        let (driver, log) = RecordingDriver::new(true);
        let mut backend = AcceleratedBackend::new(BackendKind::HardwareA, Box::new(driver));
        let mut lib = TextureLibrary::new();
        let tex = Texture::checkerboard(8, 8, Color::WHITE, Color::BLACK).unwrap();
        lib.set(1, tex.clone()).unwrap();
        backend.upload_texture(1, &tex).unwrap();

        let textured = TriangleMaterial {
            texture: Some(1),
            color: Color::RED,
        };
        let mut batch = TriangleBatch::new(true);
        batch.push(&tri(1.0, textured));
        batch.push(&tri(2.0, textured));
        batch.push(&tri(3.0, flat(Color::GREEN)));
        batch.push(&tri(4.0, textured));
        let mut fb = Framebuffer::new(8, 8, PixelFormat::Rgba8888);
        backend.draw_indexed_triangles(&batch, &lib, &mut fb).unwrap();

        let log = log.borrow();
        let runs: Vec<(bool, usize)> = log.draws.iter().map(|(h, n)| (h.is_some(), *n)).collect();
        assert_eq!(runs, vec![(true, 2), (false, 1), (true, 1)]);
        assert_eq!(log.colors[2], Color::GREEN);
        assert_eq!(log.colors[0], Color::WHITE);
    }

    #[test]
    fn test_reupload_and_release_free_handles() {
        let (driver, log) = RecordingDriver::new(false);
        let mut backend = AcceleratedBackend::new(BackendKind::HardwareA, Box::new(driver));
        let tex = Texture::checkerboard(8, 8, Color::WHITE, Color::BLACK).unwrap();
        backend.upload_texture(0, &tex).unwrap();
        backend.upload_texture(0, &tex).unwrap();
        backend.upload_texture(4, &tex).unwrap();
        assert_eq!(backend.texture_count(), 2);
        assert_eq!(log.borrow().live(), 2);
        backend.release_textures();
        assert_eq!(backend.texture_count(), 0);
        assert_eq!(log.borrow().live(), 0);
    }

    #[test]
    fn test_drop_releases_textures() {
        let (driver, log) = RecordingDriver::new(false);
        {
            let mut backend = AcceleratedBackend::new(BackendKind::HardwareA, Box::new(driver));
            let tex = Texture::checkerboard(8, 8, Color::WHITE, Color::BLACK).unwrap();
            backend.upload_texture(2, &tex).unwrap();
        }
        assert_eq!(log.borrow().live(), 0);
    }
}
