//! Basic example: correct the elevations of a GPX track.
//!
//! Run with: cargo run --example basic -- ride.gpx /path/to/dem/tiles

use dem_gpx::{default_output_path, load_tiles, process_gpx, CorrectionConfig, DemError};
use std::env;
use std::path::PathBuf;

fn main() -> Result<(), DemError> {
    let mut args = env::args().skip(1);
    let (gpx_file, dem_dir) = match (args.next(), args.next()) {
        (Some(gpx), Some(dem)) => (PathBuf::from(gpx), PathBuf::from(dem)),
        _ => {
            eprintln!("Usage: cargo run --example basic -- <track.gpx> <dem-dir>");
            std::process::exit(1);
        }
    };

    // DEM_GPX_FALLBACK_EPSG / DEM_GPX_METHOD, or EPSG:25833 + linear
    let config = CorrectionConfig::from_env()?;

    let mut tiles = load_tiles(&dem_dir, config.fallback_epsg, |_, _| {})?;
    println!("Loaded {} tiles from {}", tiles.len(), dem_dir.display());
    for tile in &tiles {
        let b = tile.bounds();
        println!(
            "  {} EPSG:{} [{:.1}, {:.1}] - [{:.1}, {:.1}]",
            tile.path().display(),
            tile.effective_epsg(),
            b.min_x,
            b.min_y,
            b.max_x,
            b.max_y
        );
    }
    if tiles.is_empty() {
        return Ok(());
    }

    let output = default_output_path(&gpx_file);
    let stats = process_gpx(&gpx_file, tiles.as_slice(), &output, config.method, |_, _| {})?;

    println!("\nUpdated {} points ({} unchanged)", stats, stats.unchanged());
    println!("Written to {}", output.display());

    tiles.release_all();
    Ok(())
}
