/// Example: Load an STL file and print what the viewer would show
///
/// Usage: cargo run --example load_stl -- path/to/file.stl
use std::env;
use std::process::ExitCode;

use stlview_core::{loader, logging};

fn main() -> ExitCode {
    logging::init_logging(logging::LoggingConfig::default());

    let Some(path) = env::args().nth(1) else {
        eprintln!("Usage: load_stl <stl-file>");
        return ExitCode::FAILURE;
    };

    let mut mesh = match loader::load_mesh_file(&path) {
        Ok(mesh) => mesh,
        Err(e) => {
            eprintln!("{e}");
            return ExitCode::FAILURE;
        }
    };

    println!("{path}: {} triangles", mesh.triangle_count());
    if let Some(bounds) = mesh.bounding_box() {
        let size = bounds.size();
        println!(
            "  bounds: ({:.2}, {:.2}, {:.2}) .. ({:.2}, {:.2}, {:.2})",
            bounds.min.x, bounds.min.y, bounds.min.z, bounds.max.x, bounds.max.y, bounds.max.z
        );
        println!("  size:   {:.2} x {:.2} x {:.2}", size.x, size.y, size.z);
    }

    mesh.center();
    if let Some(bounds) = mesh.bounding_box() {
        let center = bounds.center();
        println!(
            "  centered at ({:.2}, {:.2}, {:.2})",
            center.x, center.y, center.z
        );
    }

    ExitCode::SUCCESS
}
