//! Wavefront OBJ import
//!
//! Supports `v`, `vt`, `vn`, `f` (3 or 4 corners, `v`, `v/vt`, `v//vn` or
//! `v/vt/vn`, negative indices relative to the end), `usemtl` and `mtllib`.
//! Normals in the file are checked but not used; face normals are always
//! derived from the geometry.

use std::collections::HashMap;
use std::path::Path;

use crate::error::{EngineError, Result};
use crate::rasterizer::{Vec2, Vec3};
use crate::world::{Entity, Face};

use super::mtl::MtlParser;
use super::{MeshFile, MeshMaterial};

/// OBJ file importer
pub struct ObjImporter;

impl ObjImporter {
    /// Load an OBJ file and the material libraries it names
    pub fn load_from_file(path: &Path) -> Result<MeshFile> {
        let contents = std::fs::read_to_string(path).map_err(|e| EngineError::read(path, e))?;
        let name = path.file_stem().and_then(|s| s.to_str()).unwrap_or("mesh");
        Self::parse(&contents, name, path.parent())
    }

    /// Parse OBJ text. `mtllib` paths are resolved against `base`.
    pub fn parse(contents: &str, name: &str, base: Option<&Path>) -> Result<MeshFile> {
        let mut positions: Vec<Vec3> = Vec::new();
        let mut tex_coords: Vec<Vec2> = Vec::new();
        let mut normal_count = 0usize;
        let mut faces: Vec<Face> = Vec::new();
        let mut face_materials: Vec<Option<usize>> = Vec::new();

        let mut materials: Vec<MeshMaterial> = Vec::new();
        let mut by_name: HashMap<String, usize> = HashMap::new();
        let mut current: Option<usize> = None;

        for (line_num, line) in contents.lines().enumerate() {
            let line = line.trim();

            // Skip empty lines and comments
            if line.is_empty() || line.starts_with('#') {
                continue;
            }

            let parts: Vec<&str> = line.split_whitespace().collect();

            match parts[0] {
                "v" => {
                    if parts.len() < 4 {
                        return Err(EngineError::format(format!(
                            "Line {}: Invalid vertex position (expected 3 values)",
                            line_num + 1
                        )));
                    }
                    let x = parse_float(parts[1], line_num)?;
                    let y = parse_float(parts[2], line_num)?;
                    let z = parse_float(parts[3], line_num)?;
                    positions.push(Vec3::new(x, y, z));
                }

                "vt" => {
                    if parts.len() < 3 {
                        return Err(EngineError::format(format!(
                            "Line {}: Invalid texture coordinate (expected 2 values)",
                            line_num + 1
                        )));
                    }
                    let u = parse_float(parts[1], line_num)?;
                    let v = parse_float(parts[2], line_num)?;
                    // OBJ puts v = 0 at the bottom of the image
                    tex_coords.push(Vec2::new(u, 1.0 - v));
                }

                "vn" => {
                    if parts.len() < 4 {
                        return Err(EngineError::format(format!(
                            "Line {}: Invalid normal (expected 3 values)",
                            line_num + 1
                        )));
                    }
                    for p in &parts[1..4] {
                        parse_float(p, line_num)?;
                    }
                    normal_count += 1;
                }

                "f" => {
                    let corners = parts.len() - 1;
                    if !(3..=4).contains(&corners) {
                        return Err(EngineError::format(format!(
                            "Line {}: Face has {} corners (3 or 4 supported)",
                            line_num + 1,
                            corners
                        )));
                    }
                    let mut indices = [0u32; 4];
                    let mut uv: [Option<Vec2>; 4] = [None; 4];
                    for (k, token) in parts[1..].iter().enumerate() {
                        let (p, t) = parse_corner(token, line_num, &positions, &tex_coords, normal_count)?;
                        indices[k] = p as u32;
                        uv[k] = t.map(|i| tex_coords[i]);
                    }
                    let mut face = if corners == 4 {
                        Face::quad(indices[0], indices[1], indices[2], indices[3])
                    } else {
                        Face::tri(indices[0], indices[1], indices[2])
                    };
                    if uv[..corners].iter().all(Option::is_some) {
                        let mut face_uv = face.uv;
                        for (dst, src) in face_uv.iter_mut().zip(uv.iter().flatten()) {
                            *dst = *src;
                        }
                        if corners == 3 {
                            face_uv[3] = face_uv[2];
                        }
                        face = face.with_uv(face_uv);
                    }
                    faces.push(face);
                    face_materials.push(current);
                }

                "usemtl" => {
                    let mat = parts.get(1).ok_or_else(|| {
                        EngineError::format(format!("Line {}: usemtl without a name", line_num + 1))
                    })?;
                    current = by_name.get(*mat).copied();
                    if current.is_none() {
                        log::warn!("{}: line {}: unknown material '{}'", name, line_num + 1, mat);
                    }
                }

                "mtllib" => {
                    for lib in &parts[1..] {
                        let path = match base {
                            Some(dir) => dir.join(lib),
                            None => Path::new(lib).to_path_buf(),
                        };
                        match MtlParser::load_from_file(&path) {
                            Ok(found) => {
                                for m in found {
                                    by_name.insert(m.name.clone(), materials.len());
                                    materials.push(MeshMaterial::from(m));
                                }
                            }
                            // A missing library leaves faces flat-colored
                            Err(e @ EngineError::Read { .. }) => log::warn!("{}: {}", name, e),
                            Err(e) => return Err(e),
                        }
                    }
                }

                _ => {
                    // Ignore other OBJ commands (o, g, s, etc.)
                }
            }
        }

        if positions.is_empty() {
            return Err(EngineError::format("No vertices found in OBJ file"));
        }
        if faces.is_empty() {
            return Err(EngineError::format("No faces found in OBJ file"));
        }

        log::debug!(
            "{}: {} vertices, {} faces, {} materials",
            name,
            positions.len(),
            faces.len(),
            materials.len()
        );
        let entity = Entity::from_parts(name, positions, faces)?;
        Ok(MeshFile {
            entity,
            materials,
            face_materials,
        })
    }
}

/// Parse a face corner like "1", "1/2", "1//3" or "1/2/3" into position and
/// texture-coordinate indices
fn parse_corner(
    token: &str,
    line_num: usize,
    positions: &[Vec3],
    tex_coords: &[Vec2],
    normal_count: usize,
) -> Result<(usize, Option<usize>)> {
    let parts: Vec<&str> = token.split('/').collect();
    if parts.len() > 3 || parts[0].is_empty() {
        return Err(EngineError::format(format!(
            "Line {}: Invalid face corner '{}'",
            line_num + 1,
            token
        )));
    }
    let pos = parse_index(parts[0], positions.len(), line_num)?;
    let tc = match parts.get(1) {
        Some(s) if !s.is_empty() => Some(parse_index(s, tex_coords.len(), line_num)?),
        _ => None,
    };
    if let Some(s) = parts.get(2).filter(|s| !s.is_empty()) {
        parse_index(s, normal_count, line_num)?;
    }
    Ok((pos, tc))
}

fn parse_float(s: &str, line_num: usize) -> Result<f32> {
    s.parse()
        .map_err(|_| EngineError::format(format!("Line {}: Invalid float value '{}'", line_num + 1, s)))
}

/// Parse a 1-based index; negative indices count back from the end
fn parse_index(s: &str, count: usize, line_num: usize) -> Result<usize> {
    let idx: i64 = s
        .parse()
        .map_err(|_| EngineError::format(format!("Line {}: Invalid index '{}'", line_num + 1, s)))?;

    let result = if idx > 0 {
        idx - 1
    } else if idx < 0 {
        count as i64 + idx
    } else {
        return Err(EngineError::format(format!("Line {}: Index cannot be 0", line_num + 1)));
    };

    if result < 0 || result as usize >= count {
        return Err(EngineError::format(format!(
            "Line {}: Index {} out of range (have {} elements)",
            line_num + 1,
            idx,
            count
        )));
    }
    Ok(result as usize)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::rasterizer::Color;

    const QUAD: &str = "\
# a textured quad and a triangle
v 0 0 0
v 1 0 0
v 1 1 0
v 0 1 0
vt 0 0
vt 1 0
vt 1 1
vt 0 1
vn 0 0 1

f 1/1/1 2/2/1 3/3/1 4/4/1
f -4//1 -3//1 -2//1
";

    #[test]
    fn test_parse_quad_and_triangle() {
        let mesh = ObjImporter::parse(QUAD, "quad", None).unwrap();
        let e = &mesh.entity;
        assert_eq!(e.vertex_count(), 4);
        assert_eq!(e.face_count(), 2);
        assert!(e.faces[0].is_quad());
        assert_eq!(e.faces[0].indices, [0, 1, 2, 3]);
        // v flipped to image space
        assert_eq!(e.faces[0].uv[0], Vec2::new(0.0, 1.0));
        assert_eq!(e.faces[0].uv[2], Vec2::new(1.0, 0.0));
        assert_eq!(e.faces[1].corners(), &[0, 1, 2]);
        assert_eq!(mesh.face_materials, vec![None, None]);
        assert!((e.radius - 2f32.sqrt()).abs() < 1e-6);
    }

    #[test]
    fn test_format_errors_carry_line_numbers() {
        let cases = [
            ("v 0 0\n", "Line 1"),
            ("v 0 0 0\nv 1 0 0\nv 0 1 0\nf 1 2 9\n", "Line 4"),
            ("v 0 0 0\nv 1 0 0\nv 0 1 0\nf 1 2 0\n", "cannot be 0"),
            ("v 0 0 0\nv 1 0 0\nv 0 1 0\nv 1 1 0\nv 2 2 0\nf 1 2 3 4 5\n", "5 corners"),
            ("v 0 0 0\nv 1 0 0\nv 0 1 0\nf 1/7 2 3\n", "out of range"),
            ("v a 0 0\n", "Invalid float"),
        ];
        for (src, expect) in cases {
            let err = ObjImporter::parse(src, "bad", None).unwrap_err();
            assert_eq!(err.kind(), ErrorKind::FormatInvalid, "{}", src);
            assert!(err.to_string().contains(expect), "{} -> {}", src, err);
        }
        assert!(ObjImporter::parse("# nothing\n", "empty", None).is_err());
        assert!(ObjImporter::parse("v 0 0 0\n", "nofaces", None).is_err());
    }

    #[test]
    fn test_materials_from_library() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("m.mtl"), "newmtl red\nKd 1 0 0\nnewmtl keyed\nTr 0.9\nmap_Kd k.png\n").unwrap();
        let obj = "mtllib m.mtl\nv 0 0 0\nv 1 0 0\nv 0 1 0\nusemtl red\nf 1 2 3\nusemtl keyed\nf 3 2 1\nusemtl nope\nf 1 3 2\n";
        let path = dir.path().join("tri.obj");
        std::fs::write(&path, obj).unwrap();

        let mesh = ObjImporter::load_from_file(&path).unwrap();
        assert_eq!(mesh.entity.name, "tri");
        assert_eq!(mesh.materials.len(), 2);
        assert_eq!(mesh.materials[0].color, Color::RED);
        assert!(mesh.materials[1].keyed);
        assert_eq!(mesh.materials[1].texture.as_deref(), Some(dir.path().join("k.png").as_path()));
        assert_eq!(mesh.face_materials, vec![Some(0), Some(1), None]);
    }

    #[test]
    fn test_missing_library_is_tolerated() {
        let obj = "mtllib gone.mtl\nv 0 0 0\nv 1 0 0\nv 0 1 0\nf 1 2 3\n";
        let mesh = ObjImporter::parse(obj, "t", Some(Path::new("/nonexistent"))).unwrap();
        assert!(mesh.materials.is_empty());
    }

    #[test]
    fn test_missing_file_is_read_error() {
        let err = ObjImporter::load_from_file(Path::new("/nonexistent/x.obj")).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Io);
    }
}
