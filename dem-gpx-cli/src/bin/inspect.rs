use anyhow::Result;
use clap::Parser;
use dem_gpx::crs::DEFAULT_FALLBACK_EPSG;
use dem_gpx_cli::{commands, logging};
use std::path::PathBuf;

/// Show how a DEM tile answers for one coordinate
#[derive(Parser)]
#[command(name = "dem-gpx-inspect")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to a GeoTIFF tile
    tile: PathBuf,

    /// Latitude in decimal degrees
    #[arg(long, allow_negative_numbers = true)]
    lat: f64,

    /// Longitude in decimal degrees
    #[arg(long, allow_negative_numbers = true)]
    lon: f64,

    /// EPSG code assumed when the tile declares no CRS
    #[arg(long, env = "DEM_GPX_FALLBACK_EPSG", default_value_t = DEFAULT_FALLBACK_EPSG)]
    fallback_epsg: u16,

    /// Output result as JSON
    #[arg(short, long)]
    json: bool,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    logging::init();

    commands::inspect::run(cli.tile, cli.lat, cli.lon, cli.fallback_epsg, cli.json)
}
