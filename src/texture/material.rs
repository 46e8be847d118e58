//! Material declarations
//!
//! A [`Material`] binds a region of a source image to a texture slot. The
//! realized pixels live in the [`TextureLibrary`]; a material is only the
//! recipe. Material lists are stored as RON:
//!
//! ```text
//! [
//!     (name: "wall", source: "atlas.png", rect: Some((left: 128, top: 0, width: 128, height: 128)), slot: 1),
//!     (name: "sky",  source: "sky.png", slot: 2, blend: ColorKey),
//! ]
//! ```

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{EngineError, Result};
use crate::rasterizer::BlendMode;

use super::texture::Texture;
use super::texture_library::TextureLibrary;

/// Pixel rectangle inside a source image
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubRect {
    pub left: u32,
    pub top: u32,
    pub width: u32,
    pub height: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Material {
    pub name: String,
    /// Source image file
    pub source: PathBuf,
    /// Region to extract; the whole image when absent
    #[serde(default)]
    pub rect: Option<SubRect>,
    /// Target texture slot
    pub slot: usize,
    #[serde(default)]
    pub blend: BlendMode,
}

impl Material {
    pub fn new(name: impl Into<String>, source: impl Into<PathBuf>, slot: usize) -> Self {
        Self {
            name: name.into(),
            source: source.into(),
            rect: None,
            slot,
            blend: BlendMode::Opaque,
        }
    }

    pub fn with_rect(mut self, left: u32, top: u32, width: u32, height: u32) -> Self {
        self.rect = Some(SubRect { left, top, width, height });
        self
    }
}

/// Cut a material's region out of an already-decoded source image
fn realize(material: &Material, image: &image::RgbaImage) -> Result<Texture> {
    let (iw, ih) = image.dimensions();
    let texture = match material.rect {
        Some(r) => {
            let fits = r.left.checked_add(r.width).map_or(false, |x| x <= iw)
                && r.top.checked_add(r.height).map_or(false, |y| y <= ih);
            if !fits {
                return Err(EngineError::format(format!(
                    "material '{}': rect {}x{}+{}+{} outside {}x{} image {}",
                    material.name,
                    r.width,
                    r.height,
                    r.left,
                    r.top,
                    iw,
                    ih,
                    material.source.display()
                )));
            }
            let region = image::imageops::crop_imm(image, r.left, r.top, r.width, r.height).to_image();
            Texture::from_rgba_image(material.name.clone(), &region)?
        }
        None => Texture::from_rgba_image(material.name.clone(), image)?,
    };
    Ok(texture.with_blend(material.blend))
}

/// Decode every material's source (each file once) and store the resulting
/// textures in their slots.
///
/// All textures are built before any slot is written, so a failure leaves the
/// library untouched. Returns the number of slots written.
pub fn load_materials(materials: &[Material], library: &mut TextureLibrary) -> Result<usize> {
    let mut images: HashMap<&Path, image::RgbaImage> = HashMap::new();
    let mut realized = Vec::with_capacity(materials.len());

    for material in materials {
        if material.slot >= library.capacity() {
            return Err(EngineError::SizeExceeded {
                what: "texture slot",
                requested: material.slot,
                max: library.capacity() - 1,
            });
        }
        let path = material.source.as_path();
        if !images.contains_key(path) {
            let img = image::open(path).map_err(|e| EngineError::read(path, e))?;
            images.insert(path, img.to_rgba8());
        }
        let Some(img) = images.get(path) else {
            continue;
        };
        realized.push((material.slot, realize(material, img)?));
    }

    let count = realized.len();
    for (slot, texture) in realized {
        library.set(slot, texture)?;
    }
    log::info!("loaded {} materials from {} images", count, images.len());
    Ok(count)
}

/// Read a RON list of materials. Relative `source` paths are resolved
/// against the list file's directory.
pub fn load_material_list<P: AsRef<Path>>(path: P) -> Result<Vec<Material>> {
    let path = path.as_ref();
    let contents = fs::read_to_string(path).map_err(|e| EngineError::read(path, e))?;
    let mut materials: Vec<Material> = ron::from_str(&contents)?;

    if let Some(dir) = path.parent() {
        for m in &mut materials {
            if m.source.is_relative() {
                m.source = dir.join(&m.source);
            }
        }
    }
    log::debug!("{}: {} material declarations", path.display(), materials.len());
    Ok(materials)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::rasterizer::Color;

    fn write_atlas(dir: &Path) -> (PathBuf, image::RgbaImage) {
        let img = image::RgbaImage::from_fn(512, 128, |x, y| {
            image::Rgba([(x % 251) as u8, (y * 2) as u8, ((x ^ y) & 0xFF) as u8, 255])
        });
        let path = dir.join("atlas.png");
        img.save(&path).unwrap();
        (path, img)
    }

    #[test]
    fn test_sub_rect_is_bit_identical() {
        let dir = tempfile::tempdir().unwrap();
        let (path, img) = write_atlas(dir.path());

        let mut lib = TextureLibrary::new();
        let mats = vec![Material::new("wall", &path, 5).with_rect(128, 0, 128, 128)];
        assert_eq!(load_materials(&mats, &mut lib).unwrap(), 1);

        let tex = lib.get(5).unwrap();
        assert_eq!((tex.width, tex.height), (128, 128));
        for y in 0..128u32 {
            for x in 0..128u32 {
                let p = img.get_pixel(128 + x, y);
                let expected = Color::with_alpha(p[0], p[1], p[2], p[3]);
                assert_eq!(tex.color_at(x as usize, y as usize), expected);
            }
        }
    }

    #[test]
    fn test_rect_outside_image_leaves_library_untouched() {
        let dir = tempfile::tempdir().unwrap();
        let (path, _) = write_atlas(dir.path());

        let mut lib = TextureLibrary::new();
        let mats = vec![
            Material::new("ok", &path, 1).with_rect(0, 0, 64, 64),
            Material::new("bad", &path, 2).with_rect(480, 0, 64, 64),
        ];
        let err = load_materials(&mats, &mut lib).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::FormatInvalid);
        assert!(lib.is_empty());
    }

    #[test]
    fn test_missing_image_is_read_error() {
        let dir = tempfile::tempdir().unwrap();
        let mut lib = TextureLibrary::new();
        let mats = vec![Material::new("ghost", dir.path().join("nope.png"), 0)];
        let err = load_materials(&mats, &mut lib).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Io);
    }

    #[test]
    fn test_material_list_resolves_relative_sources() {
        let dir = tempfile::tempdir().unwrap();
        write_atlas(dir.path());
        let list = dir.path().join("materials.ron");
        fs::write(
            &list,
            r#"[
                (name: "wall", source: "atlas.png", rect: Some((left: 128, top: 0, width: 128, height: 128)), slot: 1),
                (name: "glass", source: "atlas.png", rect: Some((left: 0, top: 0, width: 64, height: 64)), slot: 2, blend: ColorKey),
            ]"#,
        )
        .unwrap();

        let mats = load_material_list(&list).unwrap();
        assert_eq!(mats.len(), 2);
        assert_eq!(mats[0].source, dir.path().join("atlas.png"));
        assert_eq!(mats[1].blend, BlendMode::ColorKey);

        let mut lib = TextureLibrary::new();
        assert_eq!(load_materials(&mats, &mut lib).unwrap(), 2);
        assert_eq!(lib.get(2).unwrap().blend, BlendMode::ColorKey);
    }

    #[test]
    fn test_material_list_syntax_error() {
        let dir = tempfile::tempdir().unwrap();
        let list = dir.path().join("broken.ron");
        fs::write(&list, "[ (name: ").unwrap();
        let err = load_material_list(&list).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::FormatInvalid);
    }
}
