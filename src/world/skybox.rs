//! Skybox: six inward-facing planes around the camera
//!
//! The box moves with the camera and is painted first with depth testing
//! off, so everything else draws over it.

use crate::rasterizer::{Color, Vec3};

use super::entity::{compute_normals, Face};

/// Plane order of [`Skybox::planes`]
pub const SKY_PLANES: [&str; 6] = ["front", "back", "left", "right", "top", "bottom"];

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SkyPlane {
    pub color: Color,
    pub texture: Option<usize>,
}

impl Default for SkyPlane {
    fn default() -> Self {
        Self {
            color: Color::new(90, 120, 200),
            texture: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Skybox {
    /// Half edge of the box
    pub size: f32,
    pub planes: [SkyPlane; 6],
}

impl Skybox {
    pub fn new(size: f32) -> Self {
        Self {
            size,
            planes: [SkyPlane::default(); 6],
        }
    }

    /// Same texture slot on every plane, first slot for front and so on
    pub fn with_textures(mut self, first_slot: usize) -> Self {
        for (i, p) in self.planes.iter_mut().enumerate() {
            p.texture = Some(first_slot + i);
        }
        self
    }

    /// Box corners relative to `center`
    pub fn vertices(&self, center: Vec3) -> Vec<Vec3> {
        let s = self.size;
        [
            (-s, -s, -s),
            (s, -s, -s),
            (s, s, -s),
            (-s, s, -s),
            (-s, -s, s),
            (s, -s, s),
            (s, s, s),
            (-s, s, s),
        ]
        .iter()
        .map(|&(x, y, z)| center + Vec3::new(x, y, z))
        .collect()
    }

    /// The six planes as quads whose normals point into the box
    pub fn faces(&self) -> Vec<Face> {
        // Corner order: top-left, top-right, bottom-right, bottom-left as seen from inside
        let quads: [[u32; 4]; 6] = [
            [7, 6, 5, 4], // front (+Z)
            [2, 3, 0, 1], // back (-Z)
            [3, 7, 4, 0], // left (-X)
            [6, 2, 1, 5], // right (+X)
            [3, 2, 6, 7], // top (+Y)
            [4, 5, 1, 0], // bottom (-Y)
        ];
        quads
            .iter()
            .zip(self.planes.iter())
            .map(|(q, p)| Face::quad(q[0], q[1], q[2], q[3]).with_color(p.color).with_texture(p.texture))
            .collect()
    }

    pub fn normals(&self, faces: &[Face]) -> Vec<Vec3> {
        compute_normals(&self.vertices(Vec3::ZERO), faces)
    }
}
