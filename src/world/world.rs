//! Render context
//!
//! [`World`] owns everything a frame needs: camera, entity and material slot
//! tables, the texture library, the optional terrain and skybox, and the
//! active backend. Create one per render session; [`World::flush`] releases
//! every slot.
//!
//! Each frame runs skybox → terrain zones → entities through the face pass,
//! then hands the surviving triangles to the backend in one batch. Without a
//! Z-buffer the batch goes through the element queue first and is painted
//! back to front.

use std::path::Path;

use crate::backend::{create_backend, BackendKind, DriverRegistry, RenderBackend, SoftwareBackend, TriangleBatch};
use crate::config::EngineConfig;
use crate::error::{EngineError, LastError, Result};
use crate::mesh;
use crate::pipeline::{
    process_faces, rotate_normals, transform_to_world, DrawTriangle, PassOptions, VertexCache, ViewState,
};
use crate::rasterizer::constants::{MAX_CAMERAS, MAX_ENTITIES, MAX_MATERIALS};
use crate::rasterizer::{object_matrix, Camera, ElementQueue, Framebuffer, Palette, Vec3};
use crate::texture::{self, Material, TextureLibrary};

use super::entity::{validate_faces, Entity};
use super::metrics::{FrameMetrics, VertexCounter};
use super::skybox::Skybox;
use super::terrain::{ColorMap, MapImage, Terrain, TerrainSettings};

fn check_slot(what: &'static str, slot: usize, capacity: usize) -> Result<()> {
    if slot >= capacity {
        return Err(EngineError::SizeExceeded {
            what,
            requested: slot,
            max: capacity - 1,
        });
    }
    Ok(())
}

/// Buffers reused from frame to frame
#[derive(Debug, Default)]
struct Scratch {
    world: Vec<Vec3>,
    normals: Vec<Vec3>,
    cache: VertexCache,
    triangles: Vec<DrawTriangle>,
    batch: TriangleBatch,
}

fn tally(counter: &mut VertexCounter, cache: &VertexCache, total: usize) {
    counter.rendered += cache.rendered();
    counter.calculated += cache.calculated();
    counter.total += total as u32;
}

fn read_terrain(
    height: &Path,
    color: Option<&Path>,
    texture: Option<&Path>,
    settings: TerrainSettings,
) -> Result<Terrain> {
    let height = MapImage::load_gray(height)?;
    let color = match color {
        Some(path) => {
            let img = image::open(path).map_err(|e| EngineError::read(path, e))?;
            Some(ColorMap::from_rgba(&img.to_rgba8(), Palette::default()))
        }
        None => None,
    };
    let texture = texture.map(MapImage::load_gray).transpose()?;
    Terrain::from_maps(&height, color.as_ref(), texture.as_ref(), settings)
}

pub struct World {
    config: EngineConfig,
    cameras: Vec<Option<Camera>>,
    active_camera: Option<usize>,
    entities: Vec<Option<Entity>>,
    materials: Vec<Option<Material>>,
    textures: TextureLibrary,
    terrain: Option<Terrain>,
    skybox: Option<Skybox>,
    backend: Box<dyn RenderBackend>,
    drivers: DriverRegistry,
    /// Library generation last handed to the backend, per texture slot
    uploaded: Vec<u32>,
    scratch: Scratch,
    queue: ElementQueue<DrawTriangle>,
    queue_overflowed: bool,
    metrics: FrameMetrics,
    last_error: Option<LastError>,
}

impl World {
    /// Software rendering only
    pub fn new(config: EngineConfig) -> Self {
        Self::with_drivers(config, DriverRegistry::new())
    }

    /// Context whose hardware slots are opened from `drivers`. The configured
    /// backend is tried once; if it can't be opened the context stays on the
    /// software backend. Camera slot 0 holds the configured camera and is
    /// active.
    pub fn with_drivers(config: EngineConfig, drivers: DriverRegistry) -> Self {
        let textures = TextureLibrary::new();
        let mut cameras = vec![None; MAX_CAMERAS];
        cameras[0] = Some(config.camera());
        let mut world = Self {
            cameras,
            active_camera: Some(0),
            entities: vec![None; MAX_ENTITIES],
            materials: vec![None; MAX_MATERIALS],
            uploaded: vec![0; textures.capacity()],
            textures,
            terrain: None,
            skybox: None,
            backend: Box::new(SoftwareBackend::new()),
            drivers,
            scratch: Scratch::default(),
            queue: ElementQueue::new(),
            queue_overflowed: false,
            metrics: FrameMetrics::default(),
            last_error: None,
            config,
        };
        let wanted = world.config.backend;
        if wanted != BackendKind::Software {
            if let Err(e) = world.select_backend(wanted) {
                log::warn!("{}; staying on software", e);
            }
        }
        world
    }

    /// Keep `result`'s error as the last error
    fn record<T>(&mut self, result: Result<T>) -> Result<T> {
        if let Err(e) = &result {
            self.last_error = Some(LastError::from(e));
        }
        result
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn set_zbuffer(&mut self, enabled: bool) {
        self.config.zbuffer = enabled;
    }

    pub fn set_backface_cull(&mut self, enabled: bool) {
        self.config.backface_cull = enabled;
    }

    // =========================================================================
    // Cameras
    // =========================================================================

    pub fn set_camera(&mut self, slot: usize, camera: Camera) -> Result<()> {
        let checked = check_slot("camera slot", slot, MAX_CAMERAS);
        self.record(checked)?;
        self.cameras[slot] = Some(camera);
        Ok(())
    }

    pub fn camera(&self, slot: usize) -> Option<&Camera> {
        self.cameras.get(slot).and_then(Option::as_ref)
    }

    pub fn camera_mut(&mut self, slot: usize) -> Option<&mut Camera> {
        self.cameras.get_mut(slot).and_then(Option::as_mut)
    }

    /// Empty a camera slot. Removing the active camera leaves none active.
    pub fn remove_camera(&mut self, slot: usize) -> Option<Camera> {
        let removed = self.cameras.get_mut(slot).and_then(Option::take);
        if removed.is_some() && self.active_camera == Some(slot) {
            self.active_camera = None;
        }
        removed
    }

    pub fn activate_camera(&mut self, slot: usize) -> Result<()> {
        if self.camera(slot).is_none() {
            return self.record(Err(EngineError::missing(format!("camera slot {}", slot))));
        }
        self.active_camera = Some(slot);
        Ok(())
    }

    pub fn active_camera(&self) -> Option<&Camera> {
        self.active_camera.and_then(|slot| self.camera(slot))
    }

    pub fn active_camera_mut(&mut self) -> Option<&mut Camera> {
        let slot = self.active_camera?;
        self.camera_mut(slot)
    }

    // =========================================================================
    // Entities
    // =========================================================================

    /// Register `entity` at `slot`, releasing whatever was there. Faces are
    /// checked against the vertex list here so the frame loop can index
    /// without bounds failures.
    pub fn add_entity(&mut self, slot: usize, entity: Entity) -> Result<()> {
        let checked = check_slot("entity slot", slot, MAX_ENTITIES);
        self.record(checked)?;
        let valid = validate_faces(&entity.name, &entity.faces, entity.vertex_count());
        self.record(valid)?;
        let untextured = entity
            .faces
            .iter()
            .filter(|f| f.texture.is_some_and(|t| self.textures.get(t).is_none()))
            .count();
        if untextured > 0 {
            log::warn!(
                "entity '{}': {} faces use empty texture slots and will be drawn flat",
                entity.name,
                untextured
            );
        }
        if let Some(old) = self.entities[slot].replace(entity) {
            log::debug!("entity slot {}: released '{}'", slot, old.name);
        }
        Ok(())
    }

    /// Unregister the entity at `slot`. An empty slot is a no-op.
    pub fn remove_entity(&mut self, slot: usize) -> Option<Entity> {
        self.entities.get_mut(slot).and_then(Option::take)
    }

    pub fn entity(&self, slot: usize) -> Option<&Entity> {
        self.entities.get(slot).and_then(Option::as_ref)
    }

    pub fn entity_mut(&mut self, slot: usize) -> Option<&mut Entity> {
        self.entities.get_mut(slot).and_then(Option::as_mut)
    }

    pub fn set_entity_enabled(&mut self, slot: usize, enabled: bool) -> Result<()> {
        match self.entity_mut(slot) {
            Some(e) => {
                e.set_enabled(enabled);
                Ok(())
            }
            None => self.record(Err(EngineError::missing(format!("entity slot {}", slot)))),
        }
    }

    /// Registered entities
    pub fn entity_count(&self) -> usize {
        self.entities.iter().flatten().count()
    }

    /// Load a mesh file, bind its materials into free texture slots and
    /// register the result at `slot`
    pub fn load_mesh<P: AsRef<Path>>(&mut self, slot: usize, path: P) -> Result<()> {
        let loaded = check_slot("entity slot", slot, MAX_ENTITIES)
            .and_then(|_| mesh::load(path))
            .and_then(|mut m| {
                m.bind_materials(&mut self.textures)?;
                Ok(m.entity)
            });
        let entity = self.record(loaded)?;
        self.add_entity(slot, entity)
    }

    // =========================================================================
    // Materials and textures
    // =========================================================================

    /// Realize material declarations into their texture slots. Nothing is
    /// written unless every material loads.
    pub fn load_materials(&mut self, materials: &[Material]) -> Result<usize> {
        let loaded = texture::load_materials(materials, &mut self.textures);
        let count = self.record(loaded)?;
        for m in materials {
            if let Some(entry) = self.materials.get_mut(m.slot) {
                *entry = Some(m.clone());
            }
        }
        Ok(count)
    }

    /// [`World::load_materials`] from a RON material list
    pub fn load_material_file<P: AsRef<Path>>(&mut self, path: P) -> Result<usize> {
        let list = texture::load_material_list(path);
        let list = self.record(list)?;
        self.load_materials(&list)
    }

    /// Declaration that produced texture `slot`, if it came from a material
    pub fn material(&self, slot: usize) -> Option<&Material> {
        self.materials.get(slot).and_then(Option::as_ref)
    }

    pub fn textures(&self) -> &TextureLibrary {
        &self.textures
    }

    /// Direct access to the texture table. Changed slots are re-uploaded on
    /// the next frame.
    pub fn textures_mut(&mut self) -> &mut TextureLibrary {
        &mut self.textures
    }

    // =========================================================================
    // Terrain and skybox
    // =========================================================================

    pub fn set_terrain(&mut self, terrain: Terrain) {
        self.terrain = Some(terrain);
    }

    pub fn clear_terrain(&mut self) -> Option<Terrain> {
        self.terrain.take()
    }

    pub fn terrain(&self) -> Option<&Terrain> {
        self.terrain.as_ref()
    }

    /// Build terrain from image files with the configured terrain settings
    pub fn load_terrain(&mut self, height: &Path, color: Option<&Path>, texture: Option<&Path>) -> Result<()> {
        let built = read_terrain(height, color, texture, self.config.terrain_settings());
        let terrain = self.record(built)?;
        self.set_terrain(terrain);
        Ok(())
    }

    pub fn set_skybox(&mut self, skybox: Skybox) {
        self.skybox = Some(skybox);
    }

    pub fn clear_skybox(&mut self) -> Option<Skybox> {
        self.skybox.take()
    }

    pub fn skybox(&self) -> Option<&Skybox> {
        self.skybox.as_ref()
    }

    // =========================================================================
    // Backend
    // =========================================================================

    pub fn backend_kind(&self) -> BackendKind {
        self.backend.kind()
    }

    pub fn drivers_mut(&mut self) -> &mut DriverRegistry {
        &mut self.drivers
    }

    /// Switch renderer. On failure the current backend stays active and the
    /// scene is untouched; on success backend textures are rebuilt from the
    /// texture table on the next frame.
    pub fn select_backend(&mut self, kind: BackendKind) -> Result<()> {
        if kind == self.backend.kind() {
            return Ok(());
        }
        if kind.is_hardware() && !self.config.screen.format.is_direct() {
            let err = EngineError::BackendUnavailable(format!(
                "{} needs a direct-color surface, screen is {:?}",
                kind, self.config.screen.format
            ));
            return self.record(Err(err));
        }
        let created = create_backend(kind, &self.drivers);
        let backend = self.record(created)?;
        let mut old = std::mem::replace(&mut self.backend, backend);
        old.release_textures();
        self.uploaded.fill(0);
        log::info!("render backend {} -> {}", old.kind(), kind);
        Ok(())
    }

    fn upload_textures(&mut self) -> Result<()> {
        for (slot, texture) in self.textures.iter() {
            let generation = self.textures.generation(slot);
            if self.uploaded[slot] != generation {
                self.backend.upload_texture(slot, texture)?;
                self.uploaded[slot] = generation;
            }
        }
        Ok(())
    }

    // =========================================================================
    // Frame
    // =========================================================================

    /// Render one frame into `fb` and return its counters
    pub fn render_frame(&mut self, fb: &mut Framebuffer) -> Result<&FrameMetrics> {
        let rendered = self.render(fb);
        self.record(rendered)?;
        Ok(&self.metrics)
    }

    fn render(&mut self, fb: &mut Framebuffer) -> Result<()> {
        let camera = self
            .active_camera()
            .ok_or_else(|| EngineError::missing("no active camera"))?;
        let view = ViewState::new(camera, fb.width, fb.height);
        let eye = camera.position;

        let depth_test = self.config.zbuffer;
        let options = PassOptions {
            backface_cull: self.config.backface_cull,
            far_clip: true,
        };
        self.metrics = FrameMetrics {
            backend: self.backend.kind(),
            ..FrameMetrics::default()
        };

        self.backend.begin_frame(fb, self.config.clear_color)?;
        self.backend.set_matrices(&view);
        self.upload_textures()?;

        let scratch = &mut self.scratch;
        let mut vertices = VertexCounter::default();

        // Background first, never depth tested
        if let Some(sky) = &self.skybox {
            let corners = sky.vertices(eye);
            let mut faces = sky.faces();
            let normals = sky.normals(&faces);
            scratch.cache.reset(corners.len());
            scratch.triangles.clear();
            self.metrics.skybox_planes = process_faces(
                &corners,
                &mut faces,
                &normals,
                &view,
                PassOptions {
                    far_clip: false,
                    ..options
                },
                &mut scratch.cache,
                &mut scratch.triangles,
            );
            scratch.batch.clear();
            scratch.batch.depth_test = false;
            for t in &scratch.triangles {
                scratch.batch.push(t);
            }
            let stats = self.backend.draw_indexed_triangles(&scratch.batch, &self.textures, fb)?;
            self.metrics.elements += stats.triangles;
            self.metrics.pixels += stats.pixels;
        }

        scratch.triangles.clear();

        if let Some(terrain) = &mut self.terrain {
            // Zones share the terrain's vertices, so one cache spans them all
            scratch.cache.reset(terrain.vertices.len());
            for i in 0..terrain.zones.len() {
                let lod = terrain.lod_for_distance((terrain.zones[i].position - eye).len());
                let zone = &mut terrain.zones[i];
                let visible = view.sphere_visible(zone.position, zone.radius);
                self.metrics.zones.add(visible);
                let level = &mut zone.lods[lod];
                if !visible {
                    self.metrics.faces.total += level.faces.len() as u32;
                    continue;
                }
                let counter = process_faces(
                    &terrain.vertices,
                    &mut level.faces,
                    &level.normals,
                    &view,
                    options,
                    &mut scratch.cache,
                    &mut scratch.triangles,
                );
                self.metrics.faces.merge(counter);
            }
            tally(&mut vertices, &scratch.cache, terrain.vertices.len());
        }

        for entity in self.entities.iter_mut().flatten() {
            let count = entity.vertices.len();
            let visible = entity.enabled && view.sphere_visible(entity.position, entity.radius);
            self.metrics.entities.add(visible);
            if !visible {
                vertices.total += count as u32;
                self.metrics.faces.total += entity.faces.len() as u32;
                continue;
            }
            let rotation = object_matrix(entity.angle);
            transform_to_world(&entity.vertices, &rotation, entity.position, &mut scratch.world);
            rotate_normals(&entity.normals, &rotation, &mut scratch.normals);
            scratch.cache.reset(count);
            let counter = process_faces(
                &scratch.world,
                &mut entity.faces,
                &scratch.normals,
                &view,
                options,
                &mut scratch.cache,
                &mut scratch.triangles,
            );
            self.metrics.faces.merge(counter);
            tally(&mut vertices, &scratch.cache, count);
        }
        self.metrics.vertices = vertices;

        scratch.batch.clear();
        scratch.batch.depth_test = depth_test;
        if depth_test {
            for t in &scratch.triangles {
                scratch.batch.push(t);
            }
        } else {
            self.queue.clear();
            let mut refused = 0usize;
            for t in scratch.triangles.drain(..) {
                if self.queue.push(t.depth(), t).is_err() {
                    refused += 1;
                }
            }
            self.queue.sort_back_to_front();
            for t in self.queue.drain() {
                scratch.batch.push(&t);
            }
            if refused > 0 {
                let err = EngineError::QueueFull {
                    capacity: self.queue.capacity(),
                };
                if !self.queue_overflowed {
                    log::warn!("{}: {} triangles dropped", err, refused);
                    self.queue_overflowed = true;
                } else {
                    log::debug!("{}: {} triangles dropped", err, refused);
                }
                self.last_error = Some(LastError::from(&err));
            }
        }

        let stats = self.backend.draw_indexed_triangles(&scratch.batch, &self.textures, fb)?;
        self.metrics.elements += stats.triangles;
        self.metrics.pixels += stats.pixels;

        self.backend.end_frame(fb)?;
        self.backend.present(fb);
        Ok(())
    }

    /// Counters of the last rendered frame
    pub fn metrics(&self) -> &FrameMetrics {
        &self.metrics
    }

    pub fn last_error(&self) -> Option<&LastError> {
        self.last_error.as_ref()
    }

    pub fn clear_error(&mut self) {
        self.last_error = None;
    }

    /// Release every slot: cameras, entities, materials, textures, terrain
    /// and skybox. The backend stays selected.
    pub fn flush(&mut self) {
        self.cameras.fill(None);
        self.active_camera = None;
        self.entities.fill(None);
        self.materials.fill(None);
        self.backend.release_textures();
        self.textures.clear();
        self.uploaded.fill(0);
        self.terrain = None;
        self.skybox = None;
        self.metrics = FrameMetrics {
            backend: self.backend.kind(),
            ..FrameMetrics::default()
        };
        log::info!("world flushed");
    }
}
