//! Mesh file loading
//!
//! Two formats: 3D Studio binary (`.3ds`, recognized by its main chunk tag
//! at offset 0) and Wavefront text (`.obj` with `.mtl` libraries). The
//! format is sniffed from the file contents, never from the extension.

mod max3ds;
mod mtl;
mod obj;

use std::path::{Path, PathBuf};

use crate::error::{EngineError, Result};
use crate::rasterizer::{BlendMode, Color};
use crate::texture::{Texture, TextureLibrary};
use crate::world::Entity;

pub use max3ds::{is_3ds, read_3ds, write_3ds};
pub use mtl::{MtlMaterial, MtlParser, KEY_THRESHOLD};
pub use obj::ObjImporter;

/// Material as declared by a mesh file
#[derive(Debug, Clone, PartialEq)]
pub struct MeshMaterial {
    pub name: String,
    pub color: Color,
    pub texture: Option<PathBuf>,
    /// Texture punches through on its color key
    pub keyed: bool,
}

impl MeshMaterial {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            color: Color::WHITE,
            texture: None,
            keyed: false,
        }
    }
}

impl From<MtlMaterial> for MeshMaterial {
    fn from(m: MtlMaterial) -> Self {
        Self {
            keyed: m.is_keyed(),
            name: m.name,
            color: m.diffuse,
            texture: m.texture,
        }
    }
}

/// A decoded mesh file: the entity plus its material table
#[derive(Debug, Clone)]
pub struct MeshFile {
    pub entity: Entity,
    pub materials: Vec<MeshMaterial>,
    /// Material of each face, parallel to `entity.faces`
    pub face_materials: Vec<Option<usize>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MeshFormat {
    Max3ds,
    Obj,
}

/// Pick a decoder from the first bytes of a file
pub fn detect_format(bytes: &[u8]) -> MeshFormat {
    if is_3ds(bytes) {
        MeshFormat::Max3ds
    } else {
        MeshFormat::Obj
    }
}

/// Load a mesh file of either format. On failure nothing is returned.
pub fn load<P: AsRef<Path>>(path: P) -> Result<MeshFile> {
    let path = path.as_ref();
    let bytes = std::fs::read(path).map_err(|e| EngineError::read(path, e))?;
    let name = path.file_stem().and_then(|s| s.to_str()).unwrap_or("mesh");
    let mut mesh = match detect_format(&bytes) {
        MeshFormat::Max3ds => read_3ds(&bytes, name)?,
        MeshFormat::Obj => {
            let text = String::from_utf8(bytes)
                .map_err(|e| EngineError::format(format!("{}: not a 3DS file and not UTF-8 text: {}", path.display(), e)))?;
            ObjImporter::parse(&text, name, path.parent())?
        }
    };
    // 3DS stores bare file names; resolve them next to the mesh
    if let Some(dir) = path.parent() {
        for m in &mut mesh.materials {
            if let Some(tex) = m.texture.as_mut().filter(|t| t.is_relative()) {
                *tex = dir.join(&*tex);
            }
        }
    }
    log::info!(
        "loaded mesh '{}' ({} vertices, {} faces)",
        mesh.entity.name,
        mesh.entity.vertex_count(),
        mesh.entity.face_count()
    );
    Ok(mesh)
}

/// Write `mesh` as a .3ds file
pub fn save_3ds<P: AsRef<Path>>(mesh: &MeshFile, path: P) -> Result<()> {
    let path = path.as_ref();
    let bytes = write_3ds(mesh)?;
    std::fs::write(path, bytes).map_err(|e| EngineError::read(path, e))
}

impl MeshFile {
    /// Load material textures into free library slots and apply colors and
    /// slots to the faces. A texture that fails to load is logged and its
    /// faces stay flat-colored. Returns the number of textures added.
    pub fn bind_materials(&mut self, textures: &mut TextureLibrary) -> Result<usize> {
        let mut loaded: Vec<Option<Texture>> = Vec::with_capacity(self.materials.len());
        for m in &self.materials {
            let tex = match &m.texture {
                Some(path) => match Texture::from_file(path) {
                    Ok(t) => Some(t.with_blend(if m.keyed { BlendMode::ColorKey } else { BlendMode::Opaque })),
                    Err(e) => {
                        log::warn!("material '{}': {}", m.name, e);
                        None
                    }
                },
                None => None,
            };
            loaded.push(tex);
        }

        let needed = loaded.iter().flatten().count();
        let free = textures.capacity() - textures.len();
        if needed > free {
            return Err(EngineError::SizeExceeded {
                what: "texture slots",
                requested: textures.len() + needed,
                max: textures.capacity(),
            });
        }

        let mut added = 0;
        let mut slots: Vec<Option<usize>> = Vec::with_capacity(loaded.len());
        for tex in loaded {
            let slot = match tex {
                // Same image already bound by an earlier mesh
                Some(t) if textures.find(&t.name).is_some_and(|s| textures.get(s) == Some(&t)) => {
                    textures.find(&t.name)
                }
                Some(t) => {
                    let slot = textures
                        .first_free()
                        .ok_or_else(|| EngineError::missing("free texture slot"))?;
                    textures.set(slot, t)?;
                    added += 1;
                    Some(slot)
                }
                None => None,
            };
            slots.push(slot);
        }

        for (face, mat) in self.entity.faces.iter_mut().zip(&self.face_materials) {
            if let Some(m) = *mat {
                face.color = self.materials[m].color;
                face.texture = slots[m];
            }
        }
        Ok(added)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::world::cube;

    fn write_png(path: &Path, color: [u8; 4]) {
        image::RgbaImage::from_pixel(16, 16, image::Rgba(color)).save(path).unwrap();
    }

    #[test]
    fn test_load_sniffs_content_not_extension() {
        let dir = tempfile::tempdir().unwrap();
        let entity = cube(1.0);
        let faces = entity.face_count();
        let mesh = MeshFile {
            entity,
            materials: Vec::new(),
            face_materials: vec![None; faces],
        };
        // Binary saved under a text extension and the other way round
        let bin = dir.path().join("cube.obj");
        save_3ds(&mesh, &bin).unwrap();
        let text = dir.path().join("tri.3ds");
        std::fs::write(&text, "v 0 0 0\nv 1 0 0\nv 0 1 0\nf 1 2 3\n").unwrap();

        assert_eq!(load(&bin).unwrap().entity.face_count(), 12);
        assert_eq!(load(&text).unwrap().entity.face_count(), 1);
        assert_eq!(detect_format(&std::fs::read(&bin).unwrap()), MeshFormat::Max3ds);
    }

    #[test]
    fn test_load_failures() {
        let dir = tempfile::tempdir().unwrap();
        assert_eq!(load(dir.path().join("none.obj")).unwrap_err().kind(), ErrorKind::Io);
        let garbage = dir.path().join("garbage.obj");
        std::fs::write(&garbage, [0xFFu8, 0xFE, 0x00, 0x12]).unwrap();
        assert_eq!(load(&garbage).unwrap_err().kind(), ErrorKind::FormatInvalid);
        let truncated = dir.path().join("t.obj");
        std::fs::write(&truncated, "v 0 0 0\nv 1 0 0\nf 1 2 3\n").unwrap();
        assert_eq!(load(&truncated).unwrap_err().kind(), ErrorKind::FormatInvalid);
    }

    #[test]
    fn test_bind_materials() {
        let dir = tempfile::tempdir().unwrap();
        write_png(&dir.path().join("wood.png"), [200, 100, 50, 255]);
        std::fs::write(
            dir.path().join("m.mtl"),
            "newmtl wood\nKd 1 1 1\nmap_Kd wood.png\nnewmtl paint\nKd 0 0 1\nnewmtl lost\nmap_Kd missing.png\n",
        )
        .unwrap();
        let obj = "mtllib m.mtl\nv 0 0 0\nv 1 0 0\nv 0 1 0\nusemtl wood\nf 1 2 3\nusemtl paint\nf 1 3 2\nusemtl lost\nf 2 1 3\n";
        let path = dir.path().join("thing.obj");
        std::fs::write(&path, obj).unwrap();

        let mut mesh = load(&path).unwrap();
        let mut lib = TextureLibrary::new();
        lib.set(0, Texture::checkerboard(8, 8, Color::WHITE, Color::BLACK).unwrap()).unwrap();
        assert_eq!(mesh.bind_materials(&mut lib).unwrap(), 1);

        let faces = &mesh.entity.faces;
        assert_eq!(faces[0].texture, Some(1));
        assert_eq!(lib.get(1).map(|t| t.color_at(3, 3)), Some(Color::new(200, 100, 50)));
        assert_eq!(faces[1].texture, None);
        assert_eq!(faces[1].color, Color::BLUE);
        // Missing image: flat color, no slot
        assert_eq!(faces[2].texture, None);
        assert_eq!(lib.len(), 2);

        // A second copy reuses the slot
        let mut again = load(&path).unwrap();
        assert_eq!(again.bind_materials(&mut lib).unwrap(), 0);
        assert_eq!(again.entity.faces[0].texture, Some(1));
        assert_eq!(lib.len(), 2);
    }
}
