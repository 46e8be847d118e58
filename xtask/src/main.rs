//! Tooling tasks for BONNIE-3D
//!
//! Usage:
//!   cargo xtask convert-mesh <in> <out.3ds>           # OBJ (or 3DS) to 3DS
//!   cargo xtask snapshot --mesh <file> --out <png>    # Headless software render

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};

use bonnie_3d::mesh;
use bonnie_3d::rasterizer::{degrees_to_angle, Vec3};
use bonnie_3d::{EngineConfig, World};

#[derive(Parser)]
#[command(name = "xtask")]
#[command(about = "Mesh tooling for BONNIE-3D")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Convert a mesh file to the binary 3DS format
    ConvertMesh {
        /// Source mesh (.obj or .3ds, detected from content)
        input: PathBuf,
        /// Destination .3ds file
        output: PathBuf,
    },
    /// Render a mesh with the software backend and save a PNG
    Snapshot {
        #[arg(long)]
        mesh: PathBuf,
        #[arg(long)]
        out: PathBuf,
        /// Engine config (RON); defaults when absent
        #[arg(long)]
        config: Option<PathBuf>,
        /// Mesh rotation around the vertical axis, in degrees
        #[arg(long, default_value_t = 30.0)]
        yaw: f32,
    },
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let cli = Cli::parse();

    match cli.command {
        Commands::ConvertMesh { input, output } => convert_mesh(&input, &output),
        Commands::Snapshot {
            mesh,
            out,
            config,
            yaw,
        } => snapshot(&mesh, &out, config.as_deref(), yaw),
    }
}

/// Convert any loadable mesh to 3DS
fn convert_mesh(input: &Path, output: &Path) -> Result<()> {
    let mesh = mesh::load(input).with_context(|| format!("Failed to load {}", input.display()))?;
    mesh::save_3ds(&mesh, output).with_context(|| format!("Failed to write {}", output.display()))?;
    println!(
        "{} -> {} ({} vertices, {} faces, {} materials)",
        input.display(),
        output.display(),
        mesh.entity.vertex_count(),
        mesh.entity.face_count(),
        mesh.materials.len()
    );
    Ok(())
}

/// Render one frame of `mesh_path` in front of the camera
fn snapshot(mesh_path: &Path, out: &Path, config: Option<&Path>, yaw: f32) -> Result<()> {
    let config = match config {
        Some(path) => EngineConfig::load(path)?,
        None => EngineConfig::default(),
    };
    let mut fb = config.framebuffer();
    let mut world = World::new(config);

    world.load_mesh(0, mesh_path)?;
    let entity = world.entity_mut(0).context("Mesh slot is empty after loading")?;
    let distance = entity.radius * 3.0 + 1.0;
    entity.set_position(Vec3::new(0.0, 0.0, distance));
    entity.set_angle([degrees_to_angle(-20.0), degrees_to_angle(yaw), 0]);

    let metrics = *world.render_frame(&mut fb)?;
    for line in metrics.lines() {
        println!("{}", line);
    }

    let img = image::RgbaImage::from_raw(fb.width as u32, fb.height as u32, fb.to_rgba())
        .context("Framebuffer size does not match its pixels")?;
    img.save(out).with_context(|| format!("Failed to save {}", out.display()))?;
    println!("Snapshot saved: {}", out.display());
    Ok(())
}
