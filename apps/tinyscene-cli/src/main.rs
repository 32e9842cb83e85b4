use clap::{Parser, Subcommand};
use glam::Vec2;
use std::path::PathBuf;
use tinyscene_frame::{FrameContext, SceneConfig, build_tutorial_scene, tick};
use tinyscene_input::Action;
use tinyscene_render::DebugTextRenderer;
use tinyscene_scene::{OrbitCamera, SceneGraph};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "tinyscene-cli", about = "Headless tinyscene tools")]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print version and crate info
    Info,
    /// Run the frame loop without a window and print the last frame
    Run {
        /// Number of ticks to run
        #[arg(short, long, default_value = "60")]
        ticks: u64,
        /// Pointer position in normalized device coordinates, e.g. "0.1,-0.2"
        #[arg(short, long, value_parser = parse_pointer, allow_hyphen_values = true)]
        pointer: Option<Vec2>,
        /// Scene config (YAML)
        #[arg(short, long)]
        config: Option<PathBuf>,
        /// Skip the configured textures, skybox and model
        #[arg(long)]
        no_assets: bool,
    },
    /// Import a .gltf/.glb model and print its contents
    InspectModel {
        path: PathBuf,
    },
    /// Print the default scene config as YAML
    DefaultConfig,
}

fn parse_pointer(s: &str) -> Result<Vec2, String> {
    let (x, y) = s
        .split_once(',')
        .ok_or_else(|| format!("expected X,Y, got {s:?}"))?;
    let parse = |v: &str| {
        v.trim()
            .parse::<f32>()
            .map_err(|e| format!("bad coordinate {v:?}: {e}"))
    };
    Ok(Vec2::new(parse(x)?, parse(y)?))
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(filter))
        .init();

    match cli.command {
        Commands::Info => {
            println!("tinyscene-cli v{}", env!("CARGO_PKG_VERSION"));
            println!("common: {}", tinyscene_common::crate_info());
            println!("assets: {}", tinyscene_assets::crate_info());
            println!("scene: {}", tinyscene_scene::crate_info());
            println!("input: {}", tinyscene_input::crate_info());
            println!("frame: {}", tinyscene_frame::crate_info());
            println!("render: {}", tinyscene_render::crate_info());
            println!("render-wgpu: {}", tinyscene_render_wgpu::crate_info());
        }
        Commands::Run {
            ticks,
            pointer,
            config,
            no_assets,
        } => {
            let config = match config {
                Some(path) => SceneConfig::load(path)?,
                None => SceneConfig::default(),
            };

            let mut scene = SceneGraph::new();
            let tracked = build_tutorial_scene(&mut scene, &config.params)?;
            let mut camera =
                OrbitCamera::from_position(config.camera_position, config.camera_target);
            let mut session = FrameContext::new(tracked, config.params, config.seed);
            session.apply(
                Action::Resize {
                    width: config.window.width,
                    height: config.window.height,
                },
                &mut camera,
            );
            if let Some(ndc) = pointer {
                session.apply(Action::PointerMoved(ndc), &mut camera);
            }
            if !no_assets {
                session.request_assets(&config.assets);
                session.wait_for_loads();
            }

            let mut renderer = DebugTextRenderer::new();
            let mut last = String::new();
            for _ in 0..ticks {
                last = tick(&mut session, &mut scene, &camera, &mut renderer);
            }
            tracing::debug!(frames = renderer.frames(), "headless run finished");

            print!("{last}");
            println!("{}", session.summary());
            for d in session.diagnostics() {
                println!("  {d}");
            }
        }
        Commands::InspectModel { path } => {
            let model = tinyscene_assets::import_model(&path)?;
            println!(
                "Model {:?}: primitives={}, vertices={}, triangles={}",
                model.name,
                model.primitives.len(),
                model.vertex_count(),
                model.triangle_count()
            );
            for (i, p) in model.primitives.iter().enumerate() {
                let (center, radius) = p.mesh.bounding_sphere();
                println!(
                    "  [{i}] {} vertices={} triangles={} color={:?} bounds=({:.2}, {:.2}, {:.2}) r={:.2}",
                    p.mesh.name,
                    p.mesh.vertex_count(),
                    p.mesh.triangle_count(),
                    p.base_color,
                    center.x,
                    center.y,
                    center.z,
                    radius
                );
            }
        }
        Commands::DefaultConfig => {
            print!("{}", SceneConfig::default().to_yaml()?);
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pointer_parses_signed_pairs() {
        assert_eq!(parse_pointer("0.5,-0.25").unwrap(), Vec2::new(0.5, -0.25));
        assert_eq!(parse_pointer(" 1 , 0 ").unwrap(), Vec2::new(1.0, 0.0));
        assert!(parse_pointer("0.5").is_err());
        assert!(parse_pointer("a,b").is_err());
    }
}
