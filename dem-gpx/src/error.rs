//! Error types for the dem-gpx library.

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur when loading elevation tiles or correcting tracks.
#[derive(Error, Debug)]
pub enum DemError {
    /// IO error when reading or writing files.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// The raster could not be decoded.
    #[error("TIFF decode error: {0}")]
    Tiff(#[from] tiff::TiffError),

    /// The track file could not be parsed or written.
    #[error("GPX error: {0}")]
    Gpx(#[from] gpx::errors::GpxError),

    /// The track file is not well-formed XML.
    #[error("XML error: {0}")]
    Xml(#[from] quick_xml::Error),

    /// A track point cannot be located or has unusable coordinates.
    #[error("Invalid track point at byte {offset}: {reason}")]
    TrackPoint { offset: usize, reason: &'static str },

    /// The raster carries neither a model transformation nor tiepoint/scale tags.
    #[error("No georeference found in {path}")]
    MissingGeoreference { path: PathBuf },

    /// Decoded sample count does not match the image dimensions.
    #[error("Grid of {len} samples does not match {width}x{height} raster")]
    GridShape {
        width: usize,
        height: usize,
        len: usize,
    },

    /// No projection definition is known for this EPSG code.
    #[error("Unsupported coordinate reference system: EPSG:{epsg}")]
    UnsupportedCrs { epsg: u16 },

    /// Reprojection between two coordinate systems failed.
    #[error("Projection error: {0}")]
    Projection(String),

    /// The grid has fewer points along an axis than the method needs.
    #[error("{method} interpolation needs at least {required} points per axis, grid is {rows}x{cols}")]
    GridTooSmall {
        method: &'static str,
        required: usize,
        rows: usize,
        cols: usize,
    },

    /// An interpolation method name was not recognised.
    #[error("Unknown interpolation method: {0} (expected nearest, linear, cubic or quintic)")]
    UnknownMethod(String),

    /// A configuration value could not be parsed.
    #[error("Invalid value for {key}: {value}")]
    InvalidConfig { key: &'static str, value: String },
}

/// Result type alias using [`DemError`].
pub type Result<T> = std::result::Result<T, DemError>;
