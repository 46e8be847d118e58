//! MTL material libraries: `newmtl`, `Kd`, `Tr` / `d`, `map_Kd`

use std::path::{Path, PathBuf};

use crate::error::{EngineError, Result};
use crate::rasterizer::Color;

/// Transparency above which a material's texture is treated as color-keyed
pub const KEY_THRESHOLD: f32 = 0.5;

#[derive(Debug, Clone, PartialEq)]
pub struct MtlMaterial {
    pub name: String,
    pub diffuse: Color,
    /// 0.0 opaque, 1.0 fully transparent
    pub transparency: f32,
    /// Resolved against the library's directory
    pub texture: Option<PathBuf>,
}

impl MtlMaterial {
    fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            diffuse: Color::WHITE,
            transparency: 0.0,
            texture: None,
        }
    }

    pub fn is_keyed(&self) -> bool {
        self.transparency > KEY_THRESHOLD
    }
}

pub struct MtlParser;

impl MtlParser {
    pub fn load_from_file(path: &Path) -> Result<Vec<MtlMaterial>> {
        let contents = std::fs::read_to_string(path).map_err(|e| EngineError::read(path, e))?;
        let materials = Self::parse(&contents, path.parent())?;
        log::debug!("{}: {} materials", path.display(), materials.len());
        Ok(materials)
    }

    /// Parse MTL text; texture paths are joined onto `base` when relative
    pub fn parse(contents: &str, base: Option<&Path>) -> Result<Vec<MtlMaterial>> {
        let mut materials: Vec<MtlMaterial> = Vec::new();

        for (line_num, line) in contents.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let parts: Vec<&str> = line.split_whitespace().collect();

            match parts[0] {
                "newmtl" => {
                    let name = parts.get(1).ok_or_else(|| {
                        EngineError::format(format!("Line {}: newmtl without a name", line_num + 1))
                    })?;
                    materials.push(MtlMaterial::new(name));
                }
                "Kd" | "Tr" | "d" | "map_Kd" => {
                    let current = materials.last_mut().ok_or_else(|| {
                        EngineError::format(format!("Line {}: '{}' before any newmtl", line_num + 1, parts[0]))
                    })?;
                    match parts[0] {
                        "Kd" => {
                            if parts.len() < 4 {
                                return Err(EngineError::format(format!(
                                    "Line {}: Kd needs 3 values",
                                    line_num + 1
                                )));
                            }
                            let r = parse_float(parts[1], line_num)?;
                            let g = parse_float(parts[2], line_num)?;
                            let b = parse_float(parts[3], line_num)?;
                            current.diffuse = Color::from_unit(r, g, b);
                        }
                        "Tr" | "d" => {
                            let value = parts.get(1).ok_or_else(|| {
                                EngineError::format(format!("Line {}: {} needs a value", line_num + 1, parts[0]))
                            })?;
                            let value = parse_float(value, line_num)?;
                            // `d` is opacity, `Tr` its complement
                            current.transparency = if parts[0] == "d" { 1.0 - value } else { value };
                        }
                        _ => {
                            // Options may precede the file name; the name is last
                            let file = parts.last().filter(|_| parts.len() > 1).ok_or_else(|| {
                                EngineError::format(format!("Line {}: map_Kd without a file", line_num + 1))
                            })?;
                            let file = Path::new(file);
                            current.texture = Some(match base {
                                Some(dir) if file.is_relative() => dir.join(file),
                                _ => file.to_path_buf(),
                            });
                        }
                    }
                }
                _ => {
                    // Ka, Ks, Ns, illum and friends don't affect flat/textured fill
                }
            }
        }
        Ok(materials)
    }
}

fn parse_float(s: &str, line_num: usize) -> Result<f32> {
    s.parse()
        .map_err(|_| EngineError::format(format!("Line {}: Invalid float value '{}'", line_num + 1, s)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    const LIB: &str = "\
# exported
newmtl crate
Ka 0.1 0.1 0.1
Kd 1.0 0.5 0.0
map_Kd textures/crate.png

newmtl fence
Kd 1 1 1
Tr 0.8
map_Kd -s 1 1 1 /abs/fence.png
newmtl glass
d 0.9
";

    #[test]
    fn test_parse_library() {
        let mats = MtlParser::parse(LIB, Some(Path::new("/models"))).unwrap();
        assert_eq!(mats.len(), 3);
        assert_eq!(mats[0].name, "crate");
        assert_eq!(mats[0].diffuse, Color::new(255, 128, 0));
        assert_eq!(mats[0].texture.as_deref(), Some(Path::new("/models/textures/crate.png")));
        assert!(!mats[0].is_keyed());
        assert!(mats[1].is_keyed());
        assert_eq!(mats[1].texture.as_deref(), Some(Path::new("/abs/fence.png")));
        assert!(!mats[2].is_keyed());
        assert!((mats[2].transparency - 0.1).abs() < 1e-6);
    }

    #[test]
    fn test_errors_name_the_line() {
        let err = MtlParser::parse("newmtl a\nKd 1 x 1\n", None).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::FormatInvalid);
        assert!(err.to_string().contains("Line 2"));
        let err = MtlParser::parse("Kd 1 1 1\n", None).unwrap_err();
        assert!(err.to_string().contains("before any newmtl"));
    }

    #[test]
    fn test_missing_file_is_read_error() {
        let err = MtlParser::load_from_file(Path::new("/nonexistent/lib.mtl")).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Io);
    }
}
