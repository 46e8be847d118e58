//! 3D Studio (.3ds) chunk format, read and write
//!
//! A file is a tree of chunks, each a little-endian `u16` id and a `u32`
//! length that includes the 6-byte header. Only the chunks below are
//! understood; everything else is skipped by length.
//!
//! ```text
//! 4D4D main
//! └─ 3D3D editor
//!    ├─ AFFF material
//!    │  ├─ A000 name
//!    │  ├─ A020 diffuse ─ 0011 rgb24 | 0010 rgb float
//!    │  ├─ A050 transparency ─ 0030 percent
//!    │  └─ A200 texture map ─ A300 file name
//!    └─ 4000 object (name)
//!       └─ 4100 triangle mesh
//!          ├─ 4110 vertices
//!          ├─ 4140 texture coordinates
//!          └─ 4120 faces ─ 4130 face material
//! ```

use std::collections::HashMap;
use std::path::PathBuf;

use crate::error::{EngineError, Result};
use crate::rasterizer::{Color, Vec2, Vec3};
use crate::world::{Entity, Face};

use super::{MeshFile, MeshMaterial};

pub const MAIN: u16 = 0x4D4D;
const EDITOR: u16 = 0x3D3D;
const OBJECT: u16 = 0x4000;
const TRIMESH: u16 = 0x4100;
const VERTICES: u16 = 0x4110;
const FACES: u16 = 0x4120;
const FACE_MATERIAL: u16 = 0x4130;
const MAPPING: u16 = 0x4140;
const MATERIAL: u16 = 0xAFFF;
const MAT_NAME: u16 = 0xA000;
const MAT_DIFFUSE: u16 = 0xA020;
const MAT_TRANSPARENCY: u16 = 0xA050;
const MAT_TEXMAP: u16 = 0xA200;
const MAT_MAPNAME: u16 = 0xA300;
const COLOR_F32: u16 = 0x0010;
const COLOR_24: u16 = 0x0011;
const PERCENT_U16: u16 = 0x0030;

const HEADER: usize = 6;

/// Whether `bytes` start with the main chunk tag
pub fn is_3ds(bytes: &[u8]) -> bool {
    bytes.len() >= HEADER && u16::from_le_bytes([bytes[0], bytes[1]]) == MAIN
}

// =============================================================================
// Reading
// =============================================================================

struct Cursor<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> Cursor<'a> {
    fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    fn remaining(&self) -> usize {
        self.data.len() - self.pos
    }

    fn take(&mut self, n: usize) -> Result<&'a [u8]> {
        if n > self.remaining() {
            return Err(EngineError::format(format!(
                "3DS: truncated data at offset {} (need {} bytes, have {})",
                self.pos,
                n,
                self.remaining()
            )));
        }
        let data = self.data;
        let out = &data[self.pos..self.pos + n];
        self.pos += n;
        Ok(out)
    }

    fn u8(&mut self) -> Result<u8> {
        Ok(self.take(1)?[0])
    }

    fn u16(&mut self) -> Result<u16> {
        let b = self.take(2)?;
        Ok(u16::from_le_bytes([b[0], b[1]]))
    }

    fn u32(&mut self) -> Result<u32> {
        let b = self.take(4)?;
        Ok(u32::from_le_bytes([b[0], b[1], b[2], b[3]]))
    }

    fn f32(&mut self) -> Result<f32> {
        Ok(f32::from_bits(self.u32()?))
    }

    /// Zero-terminated string
    fn cstr(&mut self) -> Result<String> {
        let data = self.data;
        let rest = &data[self.pos..];
        let len = rest
            .iter()
            .position(|&b| b == 0)
            .ok_or_else(|| EngineError::format(format!("3DS: unterminated string at offset {}", self.pos)))?;
        let s = String::from_utf8_lossy(&rest[..len]).into_owned();
        self.pos += len + 1;
        Ok(s)
    }

    /// Next chunk: id and a cursor over its body
    fn chunk(&mut self) -> Result<(u16, Cursor<'a>)> {
        let start = self.pos;
        let id = self.u16()?;
        let len = self.u32()? as usize;
        if len < HEADER || len - HEADER > self.remaining() {
            return Err(EngineError::format(format!(
                "3DS: chunk 0x{:04X} at offset {} has bad length {}",
                id, start, len
            )));
        }
        let body = self.take(len - HEADER)?;
        Ok((id, Cursor::new(body)))
    }
}

#[derive(Default)]
struct Object {
    vertices: Vec<Vec3>,
    uvs: Vec<Vec2>,
    faces: Vec<[u16; 3]>,
    /// Material name → faces using it
    assignments: Vec<(String, Vec<u16>)>,
}

fn read_color(mut c: Cursor<'_>) -> Result<Option<Color>> {
    let mut color = None;
    while c.remaining() > 0 {
        let (id, mut sub) = c.chunk()?;
        match id {
            COLOR_24 => color = Some(Color::new(sub.u8()?, sub.u8()?, sub.u8()?)),
            COLOR_F32 if color.is_none() => color = Some(Color::from_unit(sub.f32()?, sub.f32()?, sub.f32()?)),
            _ => {}
        }
    }
    Ok(color)
}

fn read_material(mut c: Cursor<'_>) -> Result<MeshMaterial> {
    let mut mat = MeshMaterial::new("");
    while c.remaining() > 0 {
        let (id, mut sub) = c.chunk()?;
        match id {
            MAT_NAME => mat.name = sub.cstr()?,
            MAT_DIFFUSE => {
                if let Some(color) = read_color(sub)? {
                    mat.color = color;
                }
            }
            MAT_TRANSPARENCY => {
                while sub.remaining() > 0 {
                    let (pid, mut p) = sub.chunk()?;
                    if pid == PERCENT_U16 {
                        mat.keyed = f32::from(p.u16()?) / 100.0 > super::mtl::KEY_THRESHOLD;
                    }
                }
            }
            MAT_TEXMAP => {
                while sub.remaining() > 0 {
                    let (mid, mut m) = sub.chunk()?;
                    if mid == MAT_MAPNAME {
                        mat.texture = Some(PathBuf::from(m.cstr()?));
                    }
                }
            }
            _ => {}
        }
    }
    Ok(mat)
}

fn read_trimesh(mut c: Cursor<'_>, obj: &mut Object) -> Result<()> {
    while c.remaining() > 0 {
        let (id, mut sub) = c.chunk()?;
        match id {
            VERTICES => {
                let n = sub.u16()? as usize;
                obj.vertices.reserve(n);
                for _ in 0..n {
                    obj.vertices.push(Vec3::new(sub.f32()?, sub.f32()?, sub.f32()?));
                }
            }
            MAPPING => {
                let n = sub.u16()? as usize;
                for _ in 0..n {
                    let (u, v) = (sub.f32()?, sub.f32()?);
                    obj.uvs.push(Vec2::new(u, 1.0 - v));
                }
            }
            FACES => {
                let n = sub.u16()? as usize;
                for _ in 0..n {
                    let face = [sub.u16()?, sub.u16()?, sub.u16()?];
                    let _flags = sub.u16()?;
                    obj.faces.push(face);
                }
                while sub.remaining() > 0 {
                    let (fid, mut f) = sub.chunk()?;
                    if fid == FACE_MATERIAL {
                        let name = f.cstr()?;
                        let count = f.u16()? as usize;
                        let list = (0..count).map(|_| f.u16()).collect::<Result<Vec<_>>>()?;
                        obj.assignments.push((name, list));
                    }
                }
            }
            _ => {}
        }
    }
    Ok(())
}

fn read_object(mut c: Cursor<'_>) -> Result<(String, Object)> {
    let name = c.cstr()?;
    let mut obj = Object::default();
    while c.remaining() > 0 {
        let (id, sub) = c.chunk()?;
        if id == TRIMESH {
            read_trimesh(sub, &mut obj)?;
        }
    }
    Ok((name, obj))
}

/// Decode a .3ds file. Every object is merged into one entity.
pub fn read_3ds(bytes: &[u8], name: &str) -> Result<MeshFile> {
    if !is_3ds(bytes) {
        return Err(EngineError::format("3DS: missing main chunk"));
    }
    let (_, mut main) = Cursor::new(bytes).chunk()?;

    let mut materials: Vec<MeshMaterial> = Vec::new();
    let mut objects: Vec<(String, Object)> = Vec::new();
    while main.remaining() > 0 {
        let (id, mut editor) = main.chunk()?;
        if id != EDITOR {
            continue;
        }
        while editor.remaining() > 0 {
            let (eid, sub) = editor.chunk()?;
            match eid {
                MATERIAL => materials.push(read_material(sub)?),
                OBJECT => objects.push(read_object(sub)?),
                _ => {}
            }
        }
    }

    let by_name: HashMap<&str, usize> = materials.iter().enumerate().map(|(i, m)| (m.name.as_str(), i)).collect();
    let mut vertices = Vec::new();
    let mut faces = Vec::new();
    let mut face_materials = Vec::new();
    for (obj_name, obj) in &objects {
        let base = vertices.len() as u32;
        let first_face = faces.len();
        for f in &obj.faces {
            let mut face = Face::tri(base + f[0] as u32, base + f[1] as u32, base + f[2] as u32);
            if let (Some(a), Some(b), Some(c)) = (
                obj.uvs.get(f[0] as usize),
                obj.uvs.get(f[1] as usize),
                obj.uvs.get(f[2] as usize),
            ) {
                face = face.with_uv([*a, *b, *c, *c]);
            }
            faces.push(face);
            face_materials.push(None);
        }
        for (mat_name, list) in &obj.assignments {
            let Some(&m) = by_name.get(mat_name.as_str()) else {
                log::warn!("{}: object '{}' uses unknown material '{}'", name, obj_name, mat_name);
                continue;
            };
            for &fi in list {
                let slot = face_materials.get_mut(first_face + fi as usize).filter(|_| (fi as usize) < obj.faces.len());
                match slot {
                    Some(s) => *s = Some(m),
                    None => {
                        return Err(EngineError::format(format!(
                            "3DS: object '{}' assigns material to face {} of {}",
                            obj_name,
                            fi,
                            obj.faces.len()
                        )))
                    }
                }
            }
        }
        vertices.extend_from_slice(&obj.vertices);
    }

    if vertices.is_empty() || faces.is_empty() {
        return Err(EngineError::format("3DS: no triangle mesh found"));
    }
    log::debug!(
        "{}: {} objects, {} vertices, {} faces, {} materials",
        name,
        objects.len(),
        vertices.len(),
        faces.len(),
        materials.len()
    );
    let entity = Entity::from_parts(name, vertices, faces)?;
    Ok(MeshFile {
        entity,
        materials,
        face_materials,
    })
}

// =============================================================================
// Writing
// =============================================================================

#[derive(Default)]
struct ChunkWriter {
    buf: Vec<u8>,
    open: Vec<usize>,
}

impl ChunkWriter {
    fn begin(&mut self, id: u16) {
        self.open.push(self.buf.len());
        self.u16(id);
        self.u32(0);
    }

    fn end(&mut self) {
        if let Some(start) = self.open.pop() {
            let len = (self.buf.len() - start) as u32;
            self.buf[start + 2..start + 6].copy_from_slice(&len.to_le_bytes());
        }
    }

    fn u16(&mut self, v: u16) {
        self.buf.extend_from_slice(&v.to_le_bytes());
    }

    fn u32(&mut self, v: u32) {
        self.buf.extend_from_slice(&v.to_le_bytes());
    }

    fn f32(&mut self, v: f32) {
        self.buf.extend_from_slice(&v.to_le_bytes());
    }

    fn cstr(&mut self, s: &str) {
        self.buf.extend(s.bytes().filter(|&b| b != 0));
        self.buf.push(0);
    }
}

fn too_many(what: &'static str, requested: usize) -> EngineError {
    EngineError::SizeExceeded {
        what,
        requested,
        max: u16::MAX as usize,
    }
}

/// Encode `mesh` as .3ds. Quads are split into two triangles and vertices
/// are duplicated where faces disagree on their texture coordinates.
pub fn write_3ds(mesh: &MeshFile) -> Result<Vec<u8>> {
    let entity = &mesh.entity;

    // One output vertex per distinct (vertex, uv) pair
    let mut key_to_out: HashMap<(u32, u32, u32), u16> = HashMap::new();
    let mut out_vertices: Vec<(Vec3, Vec2)> = Vec::new();
    let mut out_faces: Vec<([u16; 3], Option<usize>)> = Vec::new();
    for (fi, face) in entity.faces.iter().enumerate() {
        let material = mesh.face_materials.get(fi).copied().flatten();
        for tri in face.triangles() {
            let mut idx = [0u16; 3];
            for (o, &k) in idx.iter_mut().zip(tri) {
                let vi = face.indices[k];
                let uv = face.uv[k];
                let key = (vi, uv.x.to_bits(), uv.y.to_bits());
                *o = match key_to_out.get(&key) {
                    Some(&i) => i,
                    None => {
                        let i = out_vertices.len();
                        if i >= u16::MAX as usize {
                            return Err(too_many("3DS vertices", i + 1));
                        }
                        out_vertices.push((entity.vertices[vi as usize], uv));
                        key_to_out.insert(key, i as u16);
                        i as u16
                    }
                };
            }
            out_faces.push((idx, material));
        }
    }
    if out_faces.len() > u16::MAX as usize {
        return Err(too_many("3DS faces", out_faces.len()));
    }

    let mut w = ChunkWriter::default();
    w.begin(MAIN);
    w.begin(EDITOR);

    for m in &mesh.materials {
        w.begin(MATERIAL);
        w.begin(MAT_NAME);
        w.cstr(&m.name);
        w.end();
        w.begin(MAT_DIFFUSE);
        w.begin(COLOR_24);
        w.buf.extend_from_slice(&[m.color.r, m.color.g, m.color.b]);
        w.end();
        w.end();
        if m.keyed {
            w.begin(MAT_TRANSPARENCY);
            w.begin(PERCENT_U16);
            w.u16(100);
            w.end();
            w.end();
        }
        if let Some(tex) = &m.texture {
            w.begin(MAT_TEXMAP);
            w.begin(MAT_MAPNAME);
            w.cstr(&tex.to_string_lossy());
            w.end();
            w.end();
        }
        w.end();
    }

    w.begin(OBJECT);
    w.cstr(&entity.name);
    w.begin(TRIMESH);

    w.begin(VERTICES);
    w.u16(out_vertices.len() as u16);
    for (p, _) in &out_vertices {
        w.f32(p.x);
        w.f32(p.y);
        w.f32(p.z);
    }
    w.end();

    w.begin(MAPPING);
    w.u16(out_vertices.len() as u16);
    for (_, uv) in &out_vertices {
        w.f32(uv.x);
        w.f32(1.0 - uv.y);
    }
    w.end();

    w.begin(FACES);
    w.u16(out_faces.len() as u16);
    for (f, _) in &out_faces {
        w.u16(f[0]);
        w.u16(f[1]);
        w.u16(f[2]);
        w.u16(0);
    }
    for (mi, m) in mesh.materials.iter().enumerate() {
        let list: Vec<u16> = out_faces
            .iter()
            .enumerate()
            .filter(|(_, (_, mat))| *mat == Some(mi))
            .map(|(i, _)| i as u16)
            .collect();
        if list.is_empty() {
            continue;
        }
        w.begin(FACE_MATERIAL);
        w.cstr(&m.name);
        w.u16(list.len() as u16);
        for i in list {
            w.u16(i);
        }
        w.end();
    }
    w.end(); // faces

    w.end(); // trimesh
    w.end(); // object
    w.end(); // editor
    w.end(); // main
    Ok(w.buf)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::world::cube;

    fn cube_file() -> MeshFile {
        let entity = cube(1.0);
        let face_materials = (0..entity.face_count()).map(|i| Some(i % 2)).collect();
        let mut keyed = MeshMaterial::new("fence");
        keyed.keyed = true;
        keyed.texture = Some(PathBuf::from("fence.png"));
        keyed.color = Color::new(10, 20, 30);
        MeshFile {
            entity,
            materials: vec![MeshMaterial::new("plain"), keyed],
            face_materials,
        }
    }

    #[test]
    fn test_written_file_reads_back() {
        let src = cube_file();
        let bytes = write_3ds(&src).unwrap();
        assert!(is_3ds(&bytes));
        assert_eq!(u32::from_le_bytes([bytes[2], bytes[3], bytes[4], bytes[5]]) as usize, bytes.len());

        let back = read_3ds(&bytes, "cube").unwrap();
        // 6 quads become 12 triangles
        assert_eq!(back.entity.face_count(), 12);
        assert_eq!(back.materials, src.materials);
        // Face i of the source became triangles 2i and 2i+1
        for (i, m) in src.face_materials.iter().enumerate() {
            assert_eq!(back.face_materials[2 * i], *m);
            assert_eq!(back.face_materials[2 * i + 1], *m);
        }
        // Same corner positions and uvs
        let f = &src.entity.faces[1];
        let t = &back.entity.faces[2];
        for k in 0..3 {
            assert_eq!(back.entity.vertices[t.indices[k] as usize], src.entity.vertices[f.indices[k] as usize]);
            assert_eq!(t.uv[k], f.uv[k]);
        }
        assert_eq!(back.entity.normals[2], src.entity.normals[1]);
    }

    #[test]
    fn test_unknown_chunks_are_skipped() {
        let mut bytes = write_3ds(&cube_file()).unwrap();
        // Append an unknown chunk inside main and fix main's length
        bytes.extend_from_slice(&0xB000u16.to_le_bytes());
        bytes.extend_from_slice(&10u32.to_le_bytes());
        bytes.extend_from_slice(&[1, 2, 3, 4]);
        let len = bytes.len() as u32;
        bytes[2..6].copy_from_slice(&len.to_le_bytes());
        assert_eq!(read_3ds(&bytes, "cube").unwrap().entity.face_count(), 12);
    }

    #[test]
    fn test_corrupt_files_are_rejected() {
        let bytes = write_3ds(&cube_file()).unwrap();
        for cut in [3, 20, bytes.len() - 5] {
            let mut broken = bytes[..cut].to_vec();
            if broken.len() >= 6 {
                // Keep main's length claiming the full file
                broken[2..6].copy_from_slice(&(bytes.len() as u32).to_le_bytes());
            }
            let err = read_3ds(&broken, "broken").unwrap_err();
            assert_eq!(err.kind(), ErrorKind::FormatInvalid, "cut at {}", cut);
        }
        assert!(read_3ds(b"OBJ\n", "text").is_err());
    }

    #[test]
    fn test_bad_vertex_index_is_rejected() {
        let mut src = cube_file();
        src.materials.clear();
        src.face_materials = vec![None; 6];
        let mut bytes = write_3ds(&src).unwrap();
        // The first face record follows the 0x4120 header and its u16 count
        let pos = bytes.windows(2).position(|w| w == FACES.to_le_bytes()).unwrap() + HEADER + 2;
        bytes[pos..pos + 2].copy_from_slice(&999u16.to_le_bytes());
        assert_eq!(read_3ds(&bytes, "bad").unwrap_err().kind(), ErrorKind::FormatInvalid);
    }
}
