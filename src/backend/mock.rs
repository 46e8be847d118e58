//! Recording driver for backend tests

use std::cell::RefCell;
use std::rc::Rc;

use crate::error::Result;
use crate::rasterizer::{Color, Framebuffer};
use crate::texture::Texture;

use super::accelerated::{AccelDriver, DriverTriangle, TextureHandle};

#[derive(Debug, Default)]
pub struct DriverLog {
    pub frames: u32,
    pub created: u32,
    pub destroyed: u32,
    /// Texture and triangle count of every draw call
    pub draws: Vec<(Option<TextureHandle>, usize)>,
    /// First-vertex depth of every triangle, in submission order
    pub depths: Vec<f32>,
    pub colors: Vec<Color>,
    pub clear: Option<Color>,
}

impl DriverLog {
    pub fn live(&self) -> u32 {
        self.created - self.destroyed
    }

    pub fn triangles(&self) -> usize {
        self.draws.iter().map(|(_, n)| n).sum()
    }
}

pub struct RecordingDriver {
    depth: bool,
    next: u32,
    log: Rc<RefCell<DriverLog>>,
}

impl RecordingDriver {
    pub fn new(depth: bool) -> (Self, Rc<RefCell<DriverLog>>) {
        let log = Rc::new(RefCell::new(DriverLog::default()));
        (
            Self {
                depth,
                next: 0,
                log: Rc::clone(&log),
            },
            log,
        )
    }

    /// Driver recording into an existing log, for factories that open it
    /// more than once
    pub fn sharing(depth: bool, log: &Rc<RefCell<DriverLog>>) -> Self {
        Self {
            depth,
            next: log.borrow().created,
            log: Rc::clone(log),
        }
    }
}

impl AccelDriver for RecordingDriver {
    fn name(&self) -> &str {
        "recording"
    }

    fn has_depth_buffer(&self) -> bool {
        self.depth
    }

    fn begin_frame(&mut self, _width: usize, _height: usize, clear: Color) -> Result<()> {
        self.log.borrow_mut().clear = Some(clear);
        Ok(())
    }

    fn create_texture(&mut self, _texture: &Texture) -> Result<TextureHandle> {
        self.next += 1;
        self.log.borrow_mut().created += 1;
        Ok(TextureHandle(self.next))
    }

    fn destroy_texture(&mut self, _handle: TextureHandle) {
        self.log.borrow_mut().destroyed += 1;
    }

    fn draw_triangles(
        &mut self,
        texture: Option<TextureHandle>,
        triangles: &[DriverTriangle],
        _depth_test: bool,
    ) -> Result<()> {
        let mut log = self.log.borrow_mut();
        log.draws.push((texture, triangles.len()));
        for t in triangles {
            log.depths.push(t.vertices[0].z);
            log.colors.push(t.color);
        }
        Ok(())
    }

    fn end_frame(&mut self, fb: &mut Framebuffer) -> Result<()> {
        let mut log = self.log.borrow_mut();
        log.frames += 1;
        if let Some(c) = log.clear {
            fb.clear(c);
        }
        Ok(())
    }
}
