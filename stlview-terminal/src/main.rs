/// stlview terminal viewer
///
/// Shows an STL model as shaded ASCII in the terminal.
/// Controls:
///   - WASD / Arrow Keys: Orbit the camera
///   - +/-: Zoom
///   - [ / ]: Move the light down / up
///   - Space: Pause
///   - Q/ESC: Quit
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use stlview_core::{
    logging::{init_logging, LoggingConfig},
    loader, Mesh, ViewerConfig,
};
use stlview_terminal::TerminalApp;

/// Size of the built-in cube shown when no model is given
const DEMO_CUBE_SIZE: f32 = 200.0;

#[derive(Parser, Debug)]
#[command(name = "stlview-terminal", version, about = "View STL models in the terminal")]
struct Args {
    /// STL file to show (ASCII or binary); a cube is shown when omitted
    model: Option<PathBuf>,

    /// Viewer settings in TOML
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Grayscale image used as the model's matcap
    #[arg(short, long)]
    matcap: Option<PathBuf>,

    /// Spin applied to the model every frame, in radians around x and y
    #[arg(long, num_args = 2, value_names = ["X", "Y"], allow_negative_numbers = true)]
    spin: Option<Vec<f32>>,

    /// Frames per second
    #[arg(long)]
    fps: Option<u32>,
}

fn main() -> Result<()> {
    // Logs share the terminal with the viewer; keep them quiet unless asked
    init_logging(LoggingConfig {
        env_filter: Some(std::env::var("RUST_LOG").unwrap_or_else(|_| "warn".to_string())),
        ..LoggingConfig::default()
    });

    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => ViewerConfig::load(path)
            .with_context(|| format!("failed to load config {}", path.display()))?,
        None => ViewerConfig::default(),
    };
    if let Some(path) = args.model {
        config.model.path = Some(path);
    }
    if let Some(path) = args.matcap {
        config.model.matcap = Some(path);
    }
    if let Some(spin) = args.spin {
        config.model.spin = [spin[0], spin[1]];
    }
    if let Some(fps) = args.fps {
        config.frame.target_fps = fps;
    }
    config.validate().context("invalid settings")?;

    let model = match &config.model.path {
        Some(path) => loader::load_mesh_file(path),
        None => Ok(Mesh::cube(DEMO_CUBE_SIZE)),
    };
    let matcap = config
        .model
        .matcap
        .as_ref()
        .map(loader::load_texture_file)
        .transpose()
        .context("failed to load matcap")?;

    let mut app = TerminalApp::new(config, model, matcap)?;
    app.run()
}
