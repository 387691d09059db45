use anyhow::{Context, Result};
use cinder_assets::AssetStore;
use cinder_input::{InputState, Key, MouseButton};
use cinder_render::{Graphics, RecordingGraphics, ShapeKind};
use cinder_world::demo::build_demo_scene;
use cinder_world::{EngineConfig, World, WorldInspector};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "cinder-cli", about = "Headless tools for the cinder engine")]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// YAML engine config
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Asset directory, overrides the config
    #[arg(long, global = true)]
    assets: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print engine version and effective configuration
    Info,
    /// Run the demo scene against a recording device and report the last frame
    Simulate {
        /// Number of frames to tick
        #[arg(short, long, default_value = "60")]
        frames: u32,
        /// Seconds per frame
        #[arg(long, default_value = "0.016666668")]
        delta_time: f32,
        /// Hold the left mouse button and W to fly the camera forward
        #[arg(long)]
        fly: bool,
    },
    /// Print the demo scene's attachment tree
    Tree {
        /// Frames to tick before printing
        #[arg(short, long, default_value = "0")]
        frames: u32,
        /// Also print every component's transforms
        #[arg(long)]
        components: bool,
    },
}

fn load_config(cli: &Cli) -> Result<EngineConfig> {
    let mut config = match &cli.config {
        Some(path) => {
            EngineConfig::load(path).with_context(|| format!("loading config {}", path.display()))?
        }
        None => EngineConfig::default(),
    };
    if let Some(assets) = &cli.assets {
        config.asset_dir = assets.clone();
    }
    Ok(config)
}

/// Build the demo scene on a recording device and start the level.
fn demo_world(config: &EngineConfig) -> Result<(World, RecordingGraphics)> {
    let mut world = World::new(AssetStore::new(&config.asset_dir));
    let mut gfx = RecordingGraphics::new();
    build_demo_scene(&mut world, &mut gfx, config).context("building demo scene")?;
    world.level_start(&mut gfx)?;
    Ok((world, gfx))
}

fn run_frames(
    world: &mut World,
    gfx: &mut RecordingGraphics,
    input: &mut InputState,
    frames: u32,
    delta_time: f32,
) -> Result<()> {
    for _ in 0..frames {
        world.tick(delta_time, input, gfx)?;
        gfx.end_frame()?;
        input.end_frame();
    }
    Ok(())
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)))
        .with_writer(std::io::stderr)
        .init();

    let config = load_config(&cli)?;

    match cli.command {
        Commands::Info => {
            println!("cinder-cli v{}", env!("CARGO_PKG_VERSION"));
            println!(
                "window: {} {}x{}",
                config.window.title, config.window.width, config.window.height
            );
            println!(
                "projection: fov={} near={} far={}",
                config.projection.fov_degrees, config.projection.near, config.projection.far
            );
            println!(
                "camera: speed={} boost={} look={}",
                config.camera.move_speed, config.camera.boost, config.camera.look_sensitivity
            );
            println!("assets: {}", config.asset_dir.display());
            let shapes: Vec<_> = [ShapeKind::Box, ShapeKind::Sphere, ShapeKind::Plane]
                .iter()
                .map(|kind| kind.name())
                .collect();
            println!("shapes: {}", shapes.join(", "));
            println!("configured meshes: {}", config.meshes.len());
        }
        Commands::Simulate {
            frames,
            delta_time,
            fly,
        } => {
            let (mut world, mut gfx) = demo_world(&config)?;
            tracing::info!(frames, delta_time, fly, "simulating demo scene");
            let mut input = InputState::new();
            if fly {
                input.button_down(MouseButton::Left);
                input.key_down(Key::W);
            }
            run_frames(&mut world, &mut gfx, &mut input, frames, delta_time)?;
            world.close();

            print!("{}", gfx.report());
            println!("{}", WorldInspector::summary(&world));
            if let Some(camera) = world.active_camera() {
                if let Some(info) = WorldInspector::inspect_component(&world, camera) {
                    println!("{info}");
                }
            }
        }
        Commands::Tree { frames, components } => {
            let (mut world, mut gfx) = demo_world(&config)?;
            let mut input = InputState::new();
            run_frames(&mut world, &mut gfx, &mut input, frames, 1.0 / 60.0)?;

            print!("{}", WorldInspector::tree(&world));
            if components {
                for (_, object) in world.objects() {
                    for &component in object.components() {
                        if let Some(info) = WorldInspector::inspect_component(&world, component) {
                            println!("{info}");
                        }
                    }
                }
            }
        }
    }

    Ok(())
}
