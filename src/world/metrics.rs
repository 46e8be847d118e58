//! Per-frame render counters

use std::fmt;

use crate::backend::BackendKind;

/// Rendered out of total
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Counter {
    pub rendered: u32,
    pub total: u32,
}

impl Counter {
    pub fn add(&mut self, rendered: bool) {
        self.total += 1;
        if rendered {
            self.rendered += 1;
        }
    }

    pub fn merge(&mut self, other: Counter) {
        self.rendered += other.rendered;
        self.total += other.total;
    }
}

impl fmt::Display for Counter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.rendered, self.total)
    }
}

/// Vertices referenced by drawn faces / transformed / declared
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct VertexCounter {
    pub rendered: u32,
    pub calculated: u32,
    pub total: u32,
}

/// Snapshot of one frame, read-only for callers
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FrameMetrics {
    pub backend: BackendKind,
    pub skybox_planes: Counter,
    pub zones: Counter,
    pub entities: Counter,
    pub vertices: VertexCounter,
    pub faces: Counter,
    /// Triangles handed to the backend
    pub elements: u32,
    /// Pixels written by the software rasterizer (0 on hardware backends)
    pub pixels: u64,
}

impl FrameMetrics {
    /// Overlay lines for on-screen diagnostics
    pub fn lines(&self) -> Vec<String> {
        vec![
            format!("backend  {}", self.backend.name()),
            format!("sky      {}", self.skybox_planes),
            format!("zones    {}", self.zones),
            format!("entities {}", self.entities),
            format!(
                "vertices {}/{}/{}",
                self.vertices.rendered, self.vertices.calculated, self.vertices.total
            ),
            format!("faces    {}", self.faces),
            format!("elements {}", self.elements),
        ]
    }
}
