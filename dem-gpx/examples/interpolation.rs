//! Example comparing interpolation methods on a single tile.
//!
//! Run with: cargo run --example interpolation -- /path/to/tile.tif 52.5096 13.3759

use dem_gpx::{DemError, InterpolationMethod, RasterTile};
use std::env;

fn main() -> Result<(), DemError> {
    let args: Vec<String> = env::args().skip(1).collect();
    if args.len() != 3 {
        eprintln!("Usage: cargo run --example interpolation -- <tile.tif> <lat> <lon>");
        std::process::exit(1);
    }

    let (lat, lon) = match (args[1].parse::<f64>(), args[2].parse::<f64>()) {
        (Ok(lat), Ok(lon)) => (lat, lon),
        _ => {
            eprintln!("Latitude and longitude must be numbers");
            std::process::exit(1);
        }
    };

    let tile = RasterTile::open(&args[0], 25833)?;

    println!("Comparing interpolation methods at ({}, {}):", lat, lon);
    println!("{:-<50}", "");

    if !tile.covers_location(lat, lon) {
        println!("Point is outside {}", tile.path().display());
        return Ok(());
    }

    for method in InterpolationMethod::ALL {
        match tile.get_elevation(lat, lon, method) {
            Some(elevation) => println!("{:>8}: {:.3}m", method, elevation),
            None => println!("{:>8}: no data", method),
        }
    }

    println!("\nNote: linear is usually enough for 1m DGM tiles;");
    println!("cubic and quintic need 4 and 6 cells per axis.");

    Ok(())
}
