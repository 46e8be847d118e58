//! Heightmap terrain split into zones
//!
//! A square N×N heightmap (N a multiple of 8 in 64..=128) becomes an
//! (N+1)×(N+1) vertex grid. The grid is tiled into 8×8-cell zones; each zone
//! is an independent culling and level-of-detail unit that indexes into the
//! terrain's shared vertex array.

use std::path::Path;

use crate::error::{EngineError, Result};
use crate::rasterizer::{Color, Palette, Vec2, Vec3};

use super::entity::{bounding_radius, compute_normals, Face};

/// Cells per zone edge
pub const ZONE_CELLS: usize = 8;

/// Triangles in a full-detail zone
pub const ZONE_TRIANGLES: usize = ZONE_CELLS * ZONE_CELLS * 2;

pub const MIN_HEIGHTMAP_SIZE: usize = 64;
pub const MAX_HEIGHTMAP_SIZE: usize = 128;

/// Texture-map value meaning "no texture, use the cell color"
pub const UNTEXTURED: u8 = 0xFF;

/// Cell step per level of detail: 8×8 cells, 4×4 cells, one cell
pub const LOD_STEPS: [usize; 3] = [1, 2, ZONE_CELLS];

/// Single-channel map image (heights, palette indices or texture slots)
#[derive(Debug, Clone, PartialEq)]
pub struct MapImage {
    pub width: usize,
    pub height: usize,
    pub data: Vec<u8>,
}

impl MapImage {
    pub fn new(width: usize, height: usize, data: Vec<u8>) -> Result<Self> {
        if data.len() != width * height {
            return Err(EngineError::format(format!(
                "map image has {} bytes, expected {}x{}",
                data.len(),
                width,
                height
            )));
        }
        Ok(Self { width, height, data })
    }

    pub fn from_gray(img: &image::GrayImage) -> Self {
        Self {
            width: img.width() as usize,
            height: img.height() as usize,
            data: img.as_raw().clone(),
        }
    }

    /// Load any supported image as 8-bit luminance
    pub fn load_gray<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let img = image::open(path).map_err(|e| EngineError::read(path, e))?;
        Ok(Self::from_gray(&img.to_luma8()))
    }

    #[inline]
    pub fn at(&self, x: usize, y: usize) -> u8 {
        self.data[y * self.width + x]
    }
}

/// Palette-index image plus its 256-entry color table
#[derive(Debug, Clone, PartialEq)]
pub struct ColorMap {
    pub image: MapImage,
    pub palette: Palette,
}

impl ColorMap {
    /// Match each pixel of an RGBA image to its nearest palette entry
    pub fn from_rgba(img: &image::RgbaImage, palette: Palette) -> Self {
        let data = img
            .pixels()
            .map(|p| palette.nearest(Color::new(p[0], p[1], p[2])))
            .collect();
        Self {
            image: MapImage {
                width: img.width() as usize,
                height: img.height() as usize,
                data,
            },
            palette,
        }
    }
}

/// Validated heightmap, extended by one duplicated row and column
#[derive(Debug, Clone, PartialEq)]
pub struct Heightmap {
    /// Cells per edge (N)
    pub size: usize,
    /// (N+1)² heights
    pub heights: Vec<u8>,
    /// (N+1)² palette indices
    pub colors: Option<Vec<u8>>,
    /// (N+1)² texture slots, [`UNTEXTURED`] for none
    pub textures: Option<Vec<u8>>,
    pub palette: Palette,
}

impl Heightmap {
    /// Grid edge length in vertices (N+1)
    pub fn grid(&self) -> usize {
        self.size + 1
    }

    #[inline]
    pub fn height_at(&self, row: usize, col: usize) -> u8 {
        self.heights[row * self.grid() + col]
    }
}

fn check_map(what: &str, img: &MapImage, size: Option<usize>) -> Result<()> {
    let n = img.width;
    let valid = img.width == img.height
        && n % 8 == 0
        && (MIN_HEIGHTMAP_SIZE..=MAX_HEIGHTMAP_SIZE).contains(&n)
        && size.map_or(true, |s| s == n);
    if !valid {
        return Err(EngineError::unsupported(format!(
            "{} map {}x{} (must be square, a multiple of 8 in {}..={}{})",
            what,
            img.width,
            img.height,
            MIN_HEIGHTMAP_SIZE,
            MAX_HEIGHTMAP_SIZE,
            size.map(|s| format!(", matching {}", s)).unwrap_or_default()
        )));
    }
    Ok(())
}

/// Copy an N×N map into (N+1)² with the last row and column duplicated
fn extend(img: &MapImage) -> Vec<u8> {
    let n = img.width;
    let mut out = Vec::with_capacity((n + 1) * (n + 1));
    for row in 0..=n {
        let src = row.min(n - 1);
        out.extend_from_slice(&img.data[src * n..src * n + n]);
        out.push(img.data[src * n + n - 1]);
    }
    out
}

/// Validate the height map and optional color/texture maps and copy them
/// into an extended buffer. Every map must be square, equal-sized, a
/// multiple of 8 and within 64..=128.
pub fn prepare_heightmap(
    height: &MapImage,
    color: Option<&ColorMap>,
    texture: Option<&MapImage>,
) -> Result<Heightmap> {
    check_map("height", height, None)?;
    if let Some(c) = color {
        check_map("color", &c.image, Some(height.width))?;
    }
    if let Some(t) = texture {
        check_map("texture", t, Some(height.width))?;
    }

    Ok(Heightmap {
        size: height.width,
        heights: extend(height),
        colors: color.map(|c| extend(&c.image)),
        textures: texture.map(extend),
        palette: color.map(|c| c.palette.clone()).unwrap_or_default(),
    })
}

/// Scale and default look of a terrain
#[derive(Debug, Clone, PartialEq)]
pub struct TerrainSettings {
    pub cell_size: f32,
    pub height_zoom: f32,
    /// Color of cells without a color map
    pub default_color: Color,
    /// Texture of cells without a texture map
    pub default_texture: Option<usize>,
    /// Distances beyond which LOD 1 and LOD 2 are used
    pub lod_distances: [f32; 2],
}

impl Default for TerrainSettings {
    fn default() -> Self {
        Self {
            cell_size: 64.0,
            height_zoom: 2.0,
            default_color: Color::GRAY,
            default_texture: None,
            lod_distances: [2048.0, 4096.0],
        }
    }
}

/// Faces of one zone at one level of detail
#[derive(Debug, Clone, PartialEq)]
pub struct ZoneLod {
    pub faces: Vec<Face>,
    pub normals: Vec<Vec3>,
}

/// A tile of 8×8 cells
#[derive(Debug, Clone, PartialEq)]
pub struct Zone {
    /// Centroid of the zone's vertices
    pub position: Vec3,
    pub radius: f32,
    /// Full detail first
    pub lods: [ZoneLod; 3],
}

impl Zone {
    pub fn faces(&self) -> &[Face] {
        &self.lods[0].faces
    }
}

#[derive(Debug, Clone)]
pub struct Terrain {
    // Declared first so zones drop before the vertex array they index
    pub zones: Vec<Zone>,
    pub vertices: Vec<Vec3>,
    pub heightmap: Heightmap,
    pub settings: TerrainSettings,
}

/// World-space vertex grid: `x = col*cell`, `y = h*zoom`,
/// `z = -(row*cell - N*cell)` so row 0 lies farthest along +Z
pub fn build_vertices(map: &Heightmap, settings: &TerrainSettings) -> Vec<Vec3> {
    let grid = map.grid();
    let n = map.size as f32;
    let cell = settings.cell_size;
    let mut out = Vec::with_capacity(grid * grid);
    for row in 0..grid {
        for col in 0..grid {
            out.push(Vec3::new(
                col as f32 * cell,
                map.height_at(row, col) as f32 * settings.height_zoom,
                -(row as f32 * cell - n * cell),
            ));
        }
    }
    out
}

fn cell_look(map: &Heightmap, settings: &TerrainSettings, row: usize, col: usize) -> (Color, Option<usize>) {
    let i = row * map.grid() + col;
    let color = map
        .colors
        .as_ref()
        .map(|c| map.palette.lookup(c[i]))
        .unwrap_or(settings.default_color);
    let texture = match &map.textures {
        Some(t) if t[i] == UNTEXTURED => None,
        Some(t) => Some(t[i] as usize),
        None => settings.default_texture,
    };
    (color, texture)
}

/// Faces of the zone at (zone_row, zone_col) with `step` grid cells per face cell
fn zone_faces(map: &Heightmap, settings: &TerrainSettings, zone_row: usize, zone_col: usize, step: usize) -> Vec<Face> {
    let grid = map.grid() as u32;
    let per_edge = ZONE_CELLS / step;
    let mut faces = Vec::with_capacity(per_edge * per_edge * 2);
    let uv_tl = Vec2::new(0.0, 0.0);
    let uv_tr = Vec2::new(1.0, 0.0);
    let uv_bl = Vec2::new(0.0, 1.0);
    let uv_br = Vec2::new(1.0, 1.0);

    for cr in 0..per_edge {
        for cc in 0..per_edge {
            let row = zone_row * ZONE_CELLS + cr * step;
            let col = zone_col * ZONE_CELLS + cc * step;
            let (color, texture) = cell_look(map, settings, row, col);
            let idx = |r: usize, c: usize| r as u32 * grid + c as u32;
            let tl = idx(row, col);
            let tr = idx(row, col + step);
            let bl = idx(row + step, col);
            let br = idx(row + step, col + step);

            // Upper-left and lower-right halves, both facing +Y
            faces.push(
                Face::tri(tl, tr, bl)
                    .with_color(color)
                    .with_texture(texture)
                    .with_uv([uv_tl, uv_tr, uv_bl, uv_bl]),
            );
            faces.push(
                Face::tri(tr, br, bl)
                    .with_color(color)
                    .with_texture(texture)
                    .with_uv([uv_tr, uv_br, uv_bl, uv_bl]),
            );
        }
    }
    faces
}

/// Centroid and bounding radius of the zone's vertices
pub fn compute_zone_radius(vertices: &[Vec3], grid: usize, zone_row: usize, zone_col: usize) -> (Vec3, f32) {
    let mut zone_verts = Vec::with_capacity((ZONE_CELLS + 1) * (ZONE_CELLS + 1));
    for r in 0..=ZONE_CELLS {
        for c in 0..=ZONE_CELLS {
            zone_verts.push(vertices[(zone_row * ZONE_CELLS + r) * grid + zone_col * ZONE_CELLS + c]);
        }
    }
    let sum = zone_verts.iter().fold(Vec3::ZERO, |acc, v| acc + *v);
    let center = sum.scale(1.0 / zone_verts.len() as f32);
    (center, bounding_radius(&zone_verts, center))
}

/// Face normals of a zone, computed against the terrain's shared vertices
pub fn compute_zone_normals(vertices: &[Vec3], faces: &[Face]) -> Vec<Vec3> {
    compute_normals(vertices, faces)
}

/// Tile the grid into zones, each with all levels of detail
pub fn build_zones(map: &Heightmap, vertices: &[Vec3], settings: &TerrainSettings) -> Vec<Zone> {
    let zones_per_edge = map.size / ZONE_CELLS;
    let mut zones = Vec::with_capacity(zones_per_edge * zones_per_edge);
    for zr in 0..zones_per_edge {
        for zc in 0..zones_per_edge {
            let lods = LOD_STEPS.map(|step| {
                let faces = zone_faces(map, settings, zr, zc, step);
                let normals = compute_zone_normals(vertices, &faces);
                ZoneLod { faces, normals }
            });
            let (position, radius) = compute_zone_radius(vertices, map.grid(), zr, zc);
            zones.push(Zone { position, radius, lods });
        }
    }
    zones
}

impl Terrain {
    pub fn build(heightmap: Heightmap, settings: TerrainSettings) -> Self {
        let vertices = build_vertices(&heightmap, &settings);
        let zones = build_zones(&heightmap, &vertices, &settings);
        log::info!(
            "terrain built: {}x{} cells, {} zones, {} vertices",
            heightmap.size,
            heightmap.size,
            zones.len(),
            vertices.len()
        );
        Self {
            zones,
            vertices,
            heightmap,
            settings,
        }
    }

    /// Convenience: validate maps and build in one step
    pub fn from_maps(
        height: &MapImage,
        color: Option<&ColorMap>,
        texture: Option<&MapImage>,
        settings: TerrainSettings,
    ) -> Result<Self> {
        Ok(Self::build(prepare_heightmap(height, color, texture)?, settings))
    }

    pub fn zone_count(&self) -> usize {
        self.zones.len()
    }

    /// Level of detail for a zone at `distance` from the camera
    pub fn lod_for_distance(&self, distance: f32) -> usize {
        let [d1, d2] = self.settings.lod_distances;
        if distance > d2 {
            2
        } else if distance > d1 {
            1
        } else {
            0
        }
    }
}
