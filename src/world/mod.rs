//! Scene model and render context
//!
//! - `entity` - Meshes, faces, optimizer
//! - `terrain` - Heightmap zones with LOD tiers
//! - `skybox` - Six background planes
//! - `metrics` - Per-frame counters
//! - `world` - The render context owning all of the above

mod entity;
mod metrics;
mod skybox;
mod terrain;
mod world;

pub use entity::{bounding_radius, compute_normals, cube, validate_faces, Entity, Face};
pub use metrics::{Counter, FrameMetrics, VertexCounter};
pub use skybox::{SkyPlane, Skybox, SKY_PLANES};
pub use terrain::{
    prepare_heightmap, ColorMap, Heightmap, MapImage, Terrain, TerrainSettings, Zone, ZoneLod,
    LOD_STEPS, MAX_HEIGHTMAP_SIZE, MIN_HEIGHTMAP_SIZE, UNTEXTURED, ZONE_CELLS, ZONE_TRIANGLES,
};
pub use world::World;
