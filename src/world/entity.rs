//! Entities: positioned, rotatable indexed meshes
//!
//! An entity owns its vertex, face and normal arrays. Faces reference
//! vertices by index; every index is checked against the vertex array when
//! the entity is built, never per frame.

use crate::error::{EngineError, Result};
use crate::rasterizer::constants::{MAX_FACES, MAX_VERTICES};
use crate::rasterizer::math::face_normal;
use crate::rasterizer::{normalize_angle, Color, Vec2, Vec3};

/// A triangle or quad referencing vertices of its parent mesh
#[derive(Clone, Debug, PartialEq)]
pub struct Face {
    /// Vertex indices; only the first `count` are meaningful
    pub indices: [u32; 4],
    /// 3 for a triangle, 4 for a quad
    pub count: u8,
    pub color: Color,
    /// Texture slot, `None` for flat color
    pub texture: Option<usize>,
    pub uv: [Vec2; 4],
    /// Facing away from the camera this frame
    pub culled: bool,
    /// Union of the clip outcodes of the face's corners this frame
    pub clipped: u8,
}

impl Face {
    pub fn tri(a: u32, b: u32, c: u32) -> Self {
        Self {
            indices: [a, b, c, c],
            count: 3,
            color: Color::WHITE,
            texture: None,
            uv: [
                Vec2::new(0.0, 0.0),
                Vec2::new(1.0, 0.0),
                Vec2::new(0.0, 1.0),
                Vec2::new(0.0, 1.0),
            ],
            culled: false,
            clipped: 0,
        }
    }

    pub fn quad(a: u32, b: u32, c: u32, d: u32) -> Self {
        Self {
            indices: [a, b, c, d],
            count: 4,
            color: Color::WHITE,
            texture: None,
            uv: [
                Vec2::new(0.0, 0.0),
                Vec2::new(1.0, 0.0),
                Vec2::new(1.0, 1.0),
                Vec2::new(0.0, 1.0),
            ],
            culled: false,
            clipped: 0,
        }
    }

    pub fn with_color(mut self, color: Color) -> Self {
        self.color = color;
        self
    }

    pub fn with_texture(mut self, slot: Option<usize>) -> Self {
        self.texture = slot;
        self
    }

    pub fn with_uv(mut self, uv: [Vec2; 4]) -> Self {
        self.uv = uv;
        self
    }

    pub fn is_quad(&self) -> bool {
        self.count == 4
    }

    /// Used vertex indices
    pub fn corners(&self) -> &[u32] {
        &self.indices[..self.count as usize]
    }

    /// Corner positions (into `indices` / `uv`) of the triangles this face
    /// is drawn as: one for a triangle, two fused for a quad
    pub fn triangles(&self) -> &'static [[usize; 3]] {
        if self.is_quad() {
            &[[0, 1, 2], [0, 2, 3]]
        } else {
            &[[0, 1, 2]]
        }
    }
}

impl Default for Face {
    fn default() -> Self {
        Face::tri(0, 0, 0)
    }
}

/// A 3D mesh instance
#[derive(Clone, Debug, PartialEq)]
pub struct Entity {
    pub name: String,
    pub vertices: Vec<Vec3>,
    pub faces: Vec<Face>,
    /// One unit normal per face, derived from the first three corners
    pub normals: Vec<Vec3>,
    /// Rotation in angle units, each in `[0, FULL_TURN)`
    pub angle: [i32; 3],
    pub position: Vec3,
    /// Largest vertex distance from the local origin
    pub radius: f32,
    pub enabled: bool,
}

fn check_counts(vertex_count: usize, face_count: usize) -> Result<()> {
    if vertex_count > MAX_VERTICES {
        return Err(EngineError::SizeExceeded {
            what: "vertices",
            requested: vertex_count,
            max: MAX_VERTICES,
        });
    }
    if face_count > MAX_FACES {
        return Err(EngineError::SizeExceeded {
            what: "faces",
            requested: face_count,
            max: MAX_FACES,
        });
    }
    Ok(())
}

impl Entity {
    /// Allocate an entity with zeroed vertices and placeholder faces
    pub fn new(vertex_count: usize, face_count: usize) -> Result<Self> {
        check_counts(vertex_count, face_count)?;
        if vertex_count == 0 && face_count > 0 {
            return Err(EngineError::format(format!("{} faces need at least one vertex", face_count)));
        }
        Ok(Self {
            name: String::new(),
            vertices: vec![Vec3::ZERO; vertex_count],
            faces: vec![Face::default(); face_count],
            normals: vec![Vec3::ZERO; face_count],
            angle: [0, 0, 0],
            position: Vec3::ZERO,
            radius: 0.0,
            enabled: true,
        })
    }

    /// Build from loaded geometry. Indices are validated and radius/normals
    /// computed; nothing is returned on failure.
    pub fn from_parts(name: impl Into<String>, vertices: Vec<Vec3>, faces: Vec<Face>) -> Result<Self> {
        let name = name.into();
        check_counts(vertices.len(), faces.len())?;
        validate_faces(&name, &faces, vertices.len())?;
        let mut entity = Self {
            name,
            normals: vec![Vec3::ZERO; faces.len()],
            vertices,
            faces,
            angle: [0, 0, 0],
            position: Vec3::ZERO,
            radius: 0.0,
            enabled: true,
        };
        entity.init();
        Ok(entity)
    }

    /// Recompute bounding radius and face normals. Call after any vertex edit.
    pub fn init(&mut self) {
        self.radius = bounding_radius(&self.vertices, Vec3::ZERO);
        self.normals = compute_normals(&self.vertices, &self.faces);
    }

    pub fn vertex_count(&self) -> usize {
        self.vertices.len()
    }

    pub fn face_count(&self) -> usize {
        self.faces.len()
    }

    pub fn set_angle(&mut self, angle: [i32; 3]) {
        self.angle = angle.map(normalize_angle);
    }

    pub fn rotate(&mut self, delta: [i32; 3]) {
        for (a, d) in self.angle.iter_mut().zip(delta) {
            *a = normalize_angle(a.wrapping_add(d));
        }
    }

    pub fn set_position(&mut self, position: Vec3) {
        self.position = position;
    }

    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }

    /// Merge bit-identical vertices and remap every face.
    ///
    /// Each vertex is compared against all previously kept ones, so this is
    /// quadratic in the vertex count. Winding and UVs are untouched. Returns
    /// the number of vertices removed.
    pub fn optimize(&mut self) -> usize {
        let before = self.vertices.len();
        let mut kept: Vec<Vec3> = Vec::with_capacity(before);
        let mut remap: Vec<u32> = Vec::with_capacity(before);

        for v in &self.vertices {
            match kept.iter().position(|k| k.bits_eq(*v)) {
                Some(i) => remap.push(i as u32),
                None => {
                    remap.push(kept.len() as u32);
                    kept.push(*v);
                }
            }
        }

        // Out-of-range indices are left as they are
        for face in &mut self.faces {
            for idx in face.indices.iter_mut() {
                if let Some(&to) = remap.get(*idx as usize) {
                    *idx = to;
                }
            }
        }
        self.vertices = kept;
        self.init();

        let merged = before - self.vertices.len();
        log::debug!("optimize '{}': {} -> {} vertices", self.name, before, self.vertices.len());
        merged
    }
}

/// Reject faces with a bad corner count or an index past `vertex_count`
pub fn validate_faces(name: &str, faces: &[Face], vertex_count: usize) -> Result<()> {
    for (i, face) in faces.iter().enumerate() {
        if face.count != 3 && face.count != 4 {
            return Err(EngineError::format(format!(
                "'{}' face {}: {} corners (expected 3 or 4)",
                name, i, face.count
            )));
        }
        if let Some(&bad) = face.indices.iter().find(|&&idx| idx as usize >= vertex_count) {
            return Err(EngineError::format(format!(
                "'{}' face {}: vertex index {} out of range ({} vertices)",
                name, i, bad, vertex_count
            )));
        }
    }
    Ok(())
}

/// Largest distance from `center` to any vertex
pub fn bounding_radius(vertices: &[Vec3], center: Vec3) -> f32 {
    vertices.iter().map(|v| (*v - center).len()).fold(0.0, f32::max)
}

/// One unit normal per face from its first three corners. A face with a
/// corner past the vertex list gets a zero normal.
pub fn compute_normals(vertices: &[Vec3], faces: &[Face]) -> Vec<Vec3> {
    faces
        .iter()
        .map(|f| {
            let corner = |k: usize| vertices.get(f.indices[k] as usize).copied();
            match (corner(0), corner(1), corner(2)) {
                (Some(a), Some(b), Some(c)) => face_normal(a, b, c),
                _ => Vec3::ZERO,
            }
        })
        .collect()
}

/// Unit cube of half-size `half` centered on the origin, six outward quads
pub fn cube(half: f32) -> Entity {
    let h = half;
    let vertices = vec![
        Vec3::new(-h, -h, -h),
        Vec3::new(h, -h, -h),
        Vec3::new(h, h, -h),
        Vec3::new(-h, h, -h),
        Vec3::new(-h, -h, h),
        Vec3::new(h, -h, h),
        Vec3::new(h, h, h),
        Vec3::new(-h, h, h),
    ];
    // Corner order makes (b - a) x (c - a) point out of the cube
    let faces = vec![
        Face::quad(0, 3, 2, 1).with_color(Color::RED),   // -Z
        Face::quad(4, 5, 6, 7).with_color(Color::GREEN), // +Z
        Face::quad(0, 4, 7, 3).with_color(Color::BLUE),  // -X
        Face::quad(1, 2, 6, 5).with_color(Color::WHITE), // +X
        Face::quad(3, 7, 6, 2).with_color(Color::GRAY),  // +Y
        Face::quad(0, 1, 5, 4).with_color(Color::BLACK), // -Y
    ];
    let mut entity = Entity {
        name: "cube".to_string(),
        normals: Vec::new(),
        vertices,
        faces,
        angle: [0, 0, 0],
        position: Vec3::ZERO,
        radius: 0.0,
        enabled: true,
    };
    entity.init();
    entity
}
