use anyhow::{Context, Result};
use dem_gpx::{InterpolationMethod, RasterTile};
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing::warn;

#[derive(Debug, Serialize)]
pub struct TileBounds {
    pub left: f64,
    pub bottom: f64,
    pub right: f64,
    pub top: f64,
}

#[derive(Debug, Serialize)]
pub struct MethodElevation {
    pub method: String,
    pub elevation: Option<f64>,
}

/// What a single tile says about a single WGS84 point.
#[derive(Debug, Serialize)]
pub struct InspectReport {
    pub tile: PathBuf,
    pub width: usize,
    pub height: usize,
    /// EPSG code declared in the file.
    pub declared_epsg: Option<u16>,
    /// EPSG code the point was projected into.
    pub effective_epsg: u16,
    pub lat: f64,
    pub lon: f64,
    /// Projected coordinates, absent if the reprojection failed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub x: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub y: Option<f64>,
    pub bounds: TileBounds,
    pub covers: bool,
    pub elevations: Vec<MethodElevation>,
}

impl InspectReport {
    pub fn fallback_used(&self) -> bool {
        self.declared_epsg.is_none()
    }
}

/// Load `tile` and evaluate every interpolation method at `(lat, lon)`.
pub fn inspect(tile: &Path, lat: f64, lon: f64, fallback_epsg: u16) -> Result<InspectReport> {
    let raster = RasterTile::open(tile, fallback_epsg)
        .with_context(|| format!("Failed to load tile {}", tile.display()))?;

    let projected = raster.project(lat, lon).ok();
    let b = raster.bounds();
    let elevations = InterpolationMethod::ALL
        .iter()
        .map(|&method| MethodElevation {
            method: method.to_string(),
            elevation: raster.get_elevation(lat, lon, method),
        })
        .collect();

    Ok(InspectReport {
        tile: tile.to_path_buf(),
        width: raster.width(),
        height: raster.height(),
        declared_epsg: raster.crs(),
        effective_epsg: raster.effective_epsg(),
        lat,
        lon,
        x: projected.map(|(x, _)| x),
        y: projected.map(|(_, y)| y),
        bounds: TileBounds {
            left: b.min_x,
            bottom: b.min_y,
            right: b.max_x,
            top: b.max_y,
        },
        covers: raster.covers_location(lat, lon),
        elevations,
    })
}

pub fn run(tile: PathBuf, lat: f64, lon: f64, fallback_epsg: u16, json: bool) -> Result<()> {
    let report = inspect(&tile, lat, lon, fallback_epsg)?;

    if report.fallback_used() {
        warn!(
            "{} declares no CRS; assuming EPSG:{}",
            tile.display(),
            report.effective_epsg
        );
    }

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    println!("Tile: {}", report.tile.display());
    println!("Size: {}x{}", report.width, report.height);
    match report.declared_epsg {
        Some(epsg) => println!("Detected CRS: EPSG:{}", epsg),
        None => println!("Detected CRS: none (using EPSG:{})", report.effective_epsg),
    }
    println!();
    println!("Target location: lat {}, lon {}", report.lat, report.lon);
    match (report.x, report.y) {
        (Some(x), Some(y)) => println!("Transformed coords: X={:.2}, Y={:.2}", x, y),
        _ => println!("Transformed coords: reprojection failed"),
    }
    println!(
        "Tile bounds: left={}, right={}, bottom={}, top={}",
        report.bounds.left, report.bounds.right, report.bounds.bottom, report.bounds.top
    );
    println!("Covers location: {}", report.covers);
    println!();
    println!("Elevation:");
    for entry in &report.elevations {
        match entry.elevation {
            Some(elev) => println!("  {:<8} {:.3}m", entry.method, elev),
            None => println!("  {:<8} no data", entry.method),
        }
    }

    Ok(())
}
