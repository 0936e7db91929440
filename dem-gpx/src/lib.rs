//! # dem-gpx - GPX Elevation Correction
//!
//! Replace the elevation of GPS track points with values interpolated from
//! local GeoTIFF digital elevation model (DEM) tiles.
//!
//! ## Features
//!
//! - **GeoTIFF tiles**: Band 1 of each `.tif` is decoded into memory via a
//!   memory-mapped read
//! - **Any common CRS**: Track coordinates are reprojected from WGS84 into
//!   each tile's native system; tiles without a declared CRS use a
//!   configurable fallback
//! - **Interpolation**: Nearest, linear, cubic or quintic
//! - **Non-destructive**: Points outside every tile keep their elevation, and
//!   everything but `<ele>` is written back byte for byte
//!
//! ## Quick Start
//!
//! ```ignore
//! use dem_gpx::{default_output_path, load_tiles, process_gpx, CorrectionConfig};
//! use std::path::Path;
//!
//! let config = CorrectionConfig::from_env()?;
//! let mut tiles = load_tiles("dgm1/", config.fallback_epsg, |_, _| {})?;
//!
//! let input = Path::new("ride.gpx");
//! let stats = process_gpx(
//!     input,
//!     tiles.as_slice(),
//!     &default_output_path(input),
//!     config.method,
//!     |_, _| {},
//! )?;
//! println!("Updated {stats} points");
//! tiles.release_all();
//! ```
//!
//! ## Tile Requirements
//!
//! - One GeoTIFF per file, extension `.tif` or `.tiff`
//! - Georeferenced by `ModelTransformationTag` or tiepoint + pixel scale
//! - CRS from the GeoKey directory, or the fallback (EPSG:25833 by default)
//! - `GDAL_NODATA` cells are treated as missing
//!
//! Berlin's 1 m DGM1 tiles, for example, ship without a CRS and are in
//! ETRS89 / UTM zone 33N.

pub mod config;
pub mod crs;
pub mod error;
pub mod geotiff;
pub mod interpolate;
pub mod loader;
pub mod rewrite;
pub mod tile;
pub mod track;

#[cfg(test)]
mod fixtures;

// Re-export main types at crate root for convenience
pub use config::CorrectionConfig;
pub use error::{DemError, Result};
pub use geotiff::{Bounds, GeoTransform};
pub use interpolate::{GridInterpolator, InterpolationMethod};
pub use loader::{load_tiles, scan_tile_files, TileSet};
pub use rewrite::rewrite_elevations;
pub use tile::{ElevationSource, RasterTile};
pub use track::{
    correct_gpx, default_output_path, find_elevation, process_gpx, read_gpx, write_gpx,
    CorrectionStats,
};
