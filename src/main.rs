use std::path::PathBuf;

use clap::Parser;

use soft_rasterizer::{app, profile};
use soft_rasterizer::config::{SceneConfig, ScenePreset};
use soft_rasterizer::shader::{InterpolationMode, ShaderKind};

#[derive(Parser)]
#[command(name = "soft_rasterizer")]
#[command(about = "Renders an OBJ mesh on the CPU to an image file or a window", long_about = None)]
#[command(version)]
struct Cli {
    /// Built-in scene to render
    #[arg(short, long, value_enum, default_value = "head")]
    scene: ScenePreset,

    /// RON scene file, replaces the built-in scene
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Output image path (.tga, .png, ...)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// unlit, lambert, toon, normal-mapped or gouraud
    #[arg(long)]
    shader: Option<ShaderKind>,

    /// Interpolate varyings with perspective correction
    #[arg(long)]
    perspective_correct: bool,

    /// Show the render in a window instead of writing a file
    #[arg(short, long)]
    window: bool,

    /// Outline every drawn face
    #[arg(long)]
    wireframe: bool,

    /// Log frames per second in window mode
    #[arg(long)]
    fps: bool,

    /// Write a Chrome trace of timed scopes to this JSON file
    #[arg(long)]
    trace: Option<PathBuf>,
}

#[show_image::main]
fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => SceneConfig::load(path)?,
        None => cli.scene.config(),
    };
    if let Some(output) = cli.output {
        config.output_path = output;
    }
    if let Some(shader) = cli.shader {
        config.shader = shader;
    }
    if cli.perspective_correct {
        config.interpolation = InterpolationMode::PerspectiveCorrect;
    }

    let context = app::Context {
        config,
        window: cli.window,
        wireframe: cli.wireframe,
        print_fps: cli.fps,
    };

    if let Some(trace) = &cli.trace {
        profile::begin_session("soft_rasterizer", trace);
    }
    let result = app::run(context);
    profile::end_session()?;
    result?;

    return Ok(());
}
