//! GeoTIFF elevation tiles.
//!
//! This module provides [`RasterTile`], which holds one decoded elevation
//! raster in memory and answers coverage and elevation queries for WGS84
//! coordinates.

use std::fs::File;
use std::io::Cursor;
use std::path::{Path, PathBuf};

use memmap2::Mmap;
use tracing::debug;

use crate::crs::Reprojector;
use crate::error::Result;
use crate::geotiff::{self, Bounds, GeoTransform};
use crate::interpolate::{GridInterpolator, InterpolationMethod};

/// Anything that can answer "do you cover this point" and "how high is it".
///
/// Implemented by [`RasterTile`]; the track corrector is generic over it.
pub trait ElevationSource {
    /// Check if the WGS84 point falls within this source's extent.
    fn covers_location(&self, lat: f64, lon: f64) -> bool;

    /// Elevation at the WGS84 point, or `None` if no value is available.
    fn get_elevation(&self, lat: f64, lon: f64, method: InterpolationMethod) -> Option<f64>;
}

/// An elevation raster loaded fully into memory.
///
/// # Example
///
/// ```ignore
/// use dem_gpx::{InterpolationMethod, RasterTile};
///
/// let tile = RasterTile::open("dgm1/tile_33388_5818.tif", 25833)?;
/// if tile.covers_location(52.5096, 13.3759) {
///     let elevation = tile.get_elevation(52.5096, 13.3759, InterpolationMethod::Linear);
///     println!("Elevation: {:?}", elevation);
/// }
/// ```
#[derive(Debug)]
pub struct RasterTile {
    /// Source file path (tile identity)
    path: PathBuf,
    /// Memory-mapped source file, held until release
    source: Option<Mmap>,
    /// Row-major band-1 samples, `height * width`
    grid: Option<Vec<f32>>,
    width: usize,
    height: usize,
    transform: GeoTransform,
    /// Cell-centre x coordinate per column
    xs: Vec<f64>,
    /// Cell-centre y coordinate per row
    ys: Vec<f64>,
    bounds: Bounds,
    /// EPSG code declared by the file
    crs: Option<u16>,
    /// WGS84 -> native (declared or fallback) CRS
    reprojector: Reprojector,
}

impl RasterTile {
    /// Load a tile from a GeoTIFF file.
    ///
    /// The whole of band 1 is decoded into memory.
    ///
    /// # Arguments
    ///
    /// * `path` - Path to the `.tif` file
    /// * `fallback_epsg` - CRS assumed when the file declares none
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The file cannot be opened or memory-mapped
    /// - The TIFF cannot be decoded or carries no georeference
    /// - The declared (or fallback) CRS has no known projection definition
    pub fn open<P: AsRef<Path>>(path: P, fallback_epsg: u16) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path)?;

        // SAFETY: Memory mapping is safe as long as the file is not modified
        // while mapped. We open the file read-only and don't expose the mapping.
        let mmap = unsafe { Mmap::map(&file)? };

        let raster = geotiff::decode(Cursor::new(&mmap[..]), path)?;
        let crs = raster.metadata.epsg;
        let reprojector = Reprojector::from_wgs84(crs.unwrap_or(fallback_epsg))?;

        let transform = raster.metadata.transform;
        let xs = transform.column_centers(raster.width);
        let ys = transform.row_centers(raster.height);
        let bounds = transform.bounds(raster.width, raster.height);

        debug!(
            "Loaded {} ({}x{}, EPSG:{}{})",
            path.display(),
            raster.width,
            raster.height,
            reprojector.target_epsg(),
            if crs.is_none() { ", fallback" } else { "" }
        );

        Ok(Self {
            path: path.to_path_buf(),
            source: Some(mmap),
            grid: Some(raster.data),
            width: raster.width,
            height: raster.height,
            transform,
            xs,
            ys,
            bounds,
            crs,
            reprojector,
        })
    }

    /// Project a WGS84 point into this tile's native coordinates.
    ///
    /// # Errors
    ///
    /// Returns an error if the reprojection fails.
    pub fn project(&self, lat: f64, lon: f64) -> Result<(f64, f64)> {
        self.reprojector.project(lat, lon)
    }

    /// Check if the WGS84 point falls within the tile bounds.
    ///
    /// Points that cannot be reprojected are not covered.
    pub fn covers_location(&self, lat: f64, lon: f64) -> bool {
        match self.project(lat, lon) {
            Ok((x, y)) => self.bounds.contains(x, y),
            Err(_) => false,
        }
    }

    /// Get the elevation at the WGS84 point.
    ///
    /// # Arguments
    ///
    /// * `lat` - Latitude in decimal degrees
    /// * `lon` - Longitude in decimal degrees
    /// * `method` - Interpolation method
    ///
    /// # Returns
    ///
    /// The interpolated elevation, or `None` if the tile does not cover the
    /// point, the point lies between the raster edge and the outermost cell
    /// centres, the stencil touches nodata, the grid is too small for the
    /// method, or the tile has been released.
    pub fn get_elevation(&self, lat: f64, lon: f64, method: InterpolationMethod) -> Option<f64> {
        let grid = self.grid.as_deref()?;
        let (x, y) = self.project(lat, lon).ok()?;
        if !self.bounds.contains(x, y) {
            return None;
        }

        GridInterpolator::new(&self.ys, &self.xs, grid)
            .and_then(|interp| interp.interpolate(y, x, method))
            .ok()
            .flatten()
    }

    /// Release the source mapping and the in-memory grid.
    ///
    /// Idempotent; subsequent elevation queries return `None`.
    pub fn release(&mut self) {
        if self.source.take().is_some() | self.grid.take().is_some() {
            debug!("Released {}", self.path.display());
        }
    }

    /// Returns `true` once [`Self::release`] has run.
    pub fn is_released(&self) -> bool {
        self.grid.is_none()
    }

    /// Returns the source file path.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Returns the number of columns.
    pub fn width(&self) -> usize {
        self.width
    }

    /// Returns the number of rows.
    pub fn height(&self) -> usize {
        self.height
    }

    /// Returns the pixel → native coordinate transform.
    pub fn transform(&self) -> &GeoTransform {
        &self.transform
    }

    /// Returns the cell-centre x coordinate of each column.
    pub fn xs(&self) -> &[f64] {
        &self.xs
    }

    /// Returns the cell-centre y coordinate of each row.
    pub fn ys(&self) -> &[f64] {
        &self.ys
    }

    /// Returns the tile extent in native coordinates.
    pub fn bounds(&self) -> Bounds {
        self.bounds
    }

    /// Returns the EPSG code declared by the file, if any.
    pub fn crs(&self) -> Option<u16> {
        self.crs
    }

    /// Returns the EPSG code used for queries (declared or fallback).
    pub fn effective_epsg(&self) -> u16 {
        self.reprojector.target_epsg()
    }
}

impl ElevationSource for RasterTile {
    fn covers_location(&self, lat: f64, lon: f64) -> bool {
        RasterTile::covers_location(self, lat, lon)
    }

    fn get_elevation(&self, lat: f64, lon: f64, method: InterpolationMethod) -> Option<f64> {
        RasterTile::get_elevation(self, lat, lon, method)
    }
}

impl Drop for RasterTile {
    fn drop(&mut self) {
        self.release();
    }
}
