//! BONNIE-3D viewer
//!
//! Usage: `bonnie-3d [mesh.obj|mesh.3ds] [--config engine.ron]`
//!
//! - F1 / F2 / F3: software / hardware A / hardware B
//! - Arrows: rotate the camera
//! - Z: toggle Z-buffer, C: toggle back-face culling

use macroquad::prelude::*;

use bonnie_3d::backend::BackendKind;
use bonnie_3d::rasterizer::{Color as RColor, Vec3 as RVec3};
use bonnie_3d::texture::Texture as RTexture;
use bonnie_3d::world::{cube, Skybox};
use bonnie_3d::{DriverRegistry, EngineConfig, World, VERSION};

/// Camera turn per frame, in angle units (0.1°)
const TURN_STEP: i32 = 15;

/// Entity spin per frame
const SPIN_STEP: i32 = 5;

fn window_conf() -> Conf {
    Conf {
        window_title: format!("BONNIE-3D v{}", VERSION),
        window_width: 960,
        window_height: 720,
        window_resizable: true,
        high_dpi: true,
        ..Default::default()
    }
}

struct Args {
    mesh: Option<String>,
    config: Option<String>,
}

fn parse_args() -> Args {
    let mut args = Args { mesh: None, config: None };
    let mut it = std::env::args().skip(1);
    while let Some(arg) = it.next() {
        match arg.as_str() {
            "--config" => args.config = it.next(),
            _ => args.mesh = Some(arg),
        }
    }
    args
}

/// Mesh from the command line, or a checkered cube
fn build_scene(world: &mut World, mesh: Option<&str>) {
    if let Some(path) = mesh {
        if let Err(e) = world.load_mesh(0, path) {
            log::error!("{}", e);
        }
    }
    if world.entity(0).is_none() {
        let checker = RTexture::checkerboard(64, 64, RColor::WHITE, RColor::new(200, 60, 40));
        if let Ok(tex) = checker {
            if let Err(e) = world.textures_mut().set(0, tex) {
                log::warn!("{}", e);
            }
        }
        let mut entity = cube(20.0);
        for face in &mut entity.faces {
            face.texture = Some(0);
        }
        if let Err(e) = world.add_entity(0, entity) {
            log::error!("{}", e);
        }
    }
    if let Some(entity) = world.entity_mut(0) {
        let distance = entity.radius * 3.0 + 10.0;
        entity.set_position(RVec3::new(0.0, 0.0, distance));
    }
    world.set_skybox(Skybox::new(2000.0));
}

#[macroquad::main(window_conf)]
async fn main() {
    // Initialize crash logging FIRST (before any other code)
    #[cfg(not(target_arch = "wasm32"))]
    crashlog::setup!(crashlog::cargo_metadata!().capitalized(), false);

    #[cfg(not(target_arch = "wasm32"))]
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = parse_args();
    let config = match &args.config {
        Some(path) => EngineConfig::load(path).unwrap_or_else(|e| {
            log::error!("{}; using default config", e);
            EngineConfig::default()
        }),
        None => EngineConfig::default(),
    };
    let mut fb = config.framebuffer();
    let mut world = World::with_drivers(config, DriverRegistry::with_macroquad());
    build_scene(&mut world, args.mesh.as_deref());

    log::info!("=== BONNIE-3D v{} ===", VERSION);

    let mut overlay: Vec<String> = Vec::new();

    loop {
        for (key, index) in [(KeyCode::F1, 0), (KeyCode::F2, 1), (KeyCode::F3, 2)] {
            if is_key_pressed(key) {
                if let Some(kind) = BackendKind::from_index(index) {
                    if let Err(e) = world.select_backend(kind) {
                        log::warn!("{}", e);
                    }
                }
            }
        }
        if is_key_pressed(KeyCode::Z) {
            let enabled = !world.config().zbuffer;
            world.set_zbuffer(enabled);
        }
        if is_key_pressed(KeyCode::C) {
            let enabled = !world.config().backface_cull;
            world.set_backface_cull(enabled);
        }

        let mut turn = [0, 0, 0];
        if is_key_down(KeyCode::Left) {
            turn[1] -= TURN_STEP;
        }
        if is_key_down(KeyCode::Right) {
            turn[1] += TURN_STEP;
        }
        if is_key_down(KeyCode::Up) {
            turn[0] -= TURN_STEP;
        }
        if is_key_down(KeyCode::Down) {
            turn[0] += TURN_STEP;
        }
        if let Some(cam) = world.active_camera_mut() {
            cam.rotate(turn);
        }
        if let Some(entity) = world.entity_mut(0) {
            entity.rotate([SPIN_STEP, SPIN_STEP * 2, 0]);
        }

        match world.render_frame(&mut fb) {
            Ok(metrics) => overlay = metrics.lines(),
            Err(e) => log::warn!("frame: {}", e),
        }

        clear_background(BLACK);

        // Fit the framebuffer into the window, keeping its aspect
        let scale = (screen_width() / fb.width as f32).min(screen_height() / fb.height as f32);
        let (draw_w, draw_h) = (fb.width as f32 * scale, fb.height as f32 * scale);
        let texture = Texture2D::from_rgba8(fb.width as u16, fb.height as u16, &fb.to_rgba());
        texture.set_filter(FilterMode::Nearest);
        draw_texture_ex(
            &texture,
            (screen_width() - draw_w) / 2.0,
            (screen_height() - draw_h) / 2.0,
            WHITE,
            DrawTextureParams {
                dest_size: Some(Vec2::new(draw_w, draw_h)),
                ..Default::default()
            },
        );

        for (i, line) in overlay.iter().enumerate() {
            draw_text(line, 10.0, 20.0 + i as f32 * 18.0, 18.0, YELLOW);
        }
        if let Some(err) = world.last_error() {
            let y = 20.0 + overlay.len() as f32 * 18.0 + 6.0;
            draw_text(&format!("{:?}: {}", err.kind, err.message), 10.0, y, 18.0, RED);
        }

        next_frame().await;
    }
}
