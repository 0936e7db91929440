//! GeoTIFF decoding: band data, affine transform, CRS and nodata.
//!
//! Only the subset of GeoTIFF needed for elevation tiles is read:
//!
//! - `ModelTransformationTag` (34264), or `ModelTiepointTag` (33922) with
//!   `ModelPixelScaleTag` (33550), for the pixel → model transform
//! - `GeoKeyDirectoryTag` (34735) for the EPSG code and raster type
//! - `GDAL_NODATA` (42113) for the nodata sentinel

use std::io::{Read, Seek};
use std::path::Path;

use tiff::decoder::{Decoder, DecodingResult, Limits};
use tiff::tags::Tag;

use crate::error::{DemError, Result};

const MODEL_PIXEL_SCALE: u16 = 33550;
const MODEL_TIEPOINT: u16 = 33922;
const MODEL_TRANSFORMATION: u16 = 34264;
const GEO_KEY_DIRECTORY: u16 = 34735;
const GDAL_NODATA: u16 = 42113;

const GT_RASTER_TYPE_KEY: u16 = 1025;
const GEOGRAPHIC_TYPE_KEY: u16 = 2048;
const PROJECTED_CS_TYPE_KEY: u16 = 3072;

const RASTER_PIXEL_IS_POINT: u16 = 2;
/// GeoKey value meaning "user-defined"; not an EPSG code.
const USER_DEFINED: u16 = 32767;

fn tag(code: u16) -> Tag {
    Tag::from_u16_exhaustive(code)
}

/// Affine transformation between pixel `(col, row)` and model `(x, y)` coordinates.
///
/// ```text
/// x = origin_x + col * pixel_width + row * row_rotation
/// y = origin_y + col * col_rotation + row * pixel_height
/// ```
///
/// For north-up rasters the rotations are 0 and `pixel_height` is negative.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GeoTransform {
    /// X coordinate of the upper-left corner of the upper-left pixel
    pub origin_x: f64,
    /// Y coordinate of the upper-left corner of the upper-left pixel
    pub origin_y: f64,
    /// Pixel width in model units
    pub pixel_width: f64,
    /// Pixel height in model units (typically negative)
    pub pixel_height: f64,
    /// Rotation term (usually 0)
    pub row_rotation: f64,
    /// Rotation term (usually 0)
    pub col_rotation: f64,
}

impl GeoTransform {
    /// Create a transform with no rotation.
    pub fn new(origin_x: f64, origin_y: f64, pixel_width: f64, pixel_height: f64) -> Self {
        Self {
            origin_x,
            origin_y,
            pixel_width,
            pixel_height,
            row_rotation: 0.0,
            col_rotation: 0.0,
        }
    }

    /// Create from a GDAL-style array
    /// `[origin_x, pixel_width, row_rotation, origin_y, col_rotation, pixel_height]`.
    pub fn from_gdal(coeffs: [f64; 6]) -> Self {
        Self {
            origin_x: coeffs[0],
            pixel_width: coeffs[1],
            row_rotation: coeffs[2],
            origin_y: coeffs[3],
            col_rotation: coeffs[4],
            pixel_height: coeffs[5],
        }
    }

    /// Model coordinate of a pixel corner.
    pub fn pixel_to_model(&self, col: f64, row: f64) -> (f64, f64) {
        let x = self.origin_x + col * self.pixel_width + row * self.row_rotation;
        let y = self.origin_y + col * self.col_rotation + row * self.pixel_height;
        (x, y)
    }

    /// X coordinate of each column's cell centre.
    pub fn column_centers(&self, width: usize) -> Vec<f64> {
        (0..width)
            .map(|col| self.origin_x + (col as f64 + 0.5) * self.pixel_width)
            .collect()
    }

    /// Y coordinate of each row's cell centre.
    pub fn row_centers(&self, height: usize) -> Vec<f64> {
        (0..height)
            .map(|row| self.origin_y + (row as f64 + 0.5) * self.pixel_height)
            .collect()
    }

    /// Bounding rectangle of a `width × height` raster, normalised so
    /// `min <= max` on both axes.
    pub fn bounds(&self, width: usize, height: usize) -> Bounds {
        let (w, h) = (width as f64, height as f64);
        let corners = [
            self.pixel_to_model(0.0, 0.0),
            self.pixel_to_model(w, 0.0),
            self.pixel_to_model(0.0, h),
            self.pixel_to_model(w, h),
        ];

        let mut bounds = Bounds {
            min_x: f64::INFINITY,
            min_y: f64::INFINITY,
            max_x: f64::NEG_INFINITY,
            max_y: f64::NEG_INFINITY,
        };
        for (x, y) in corners {
            bounds.min_x = bounds.min_x.min(x);
            bounds.max_x = bounds.max_x.max(x);
            bounds.min_y = bounds.min_y.min(y);
            bounds.max_y = bounds.max_y.max(y);
        }
        bounds
    }
}

/// Rectangular extent in a tile's native coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bounds {
    /// Minimum x (west edge for north-up rasters).
    pub min_x: f64,
    /// Minimum y (south edge for north-up rasters).
    pub min_y: f64,
    /// Maximum x (east edge).
    pub max_x: f64,
    /// Maximum y (north edge).
    pub max_y: f64,
}

impl Bounds {
    /// Check if a coordinate is within the bounds (edges inclusive).
    pub fn contains(&self, x: f64, y: f64) -> bool {
        x >= self.min_x && x <= self.max_x && y >= self.min_y && y <= self.max_y
    }
}

/// Georeferencing read from a GeoTIFF.
#[derive(Debug, Clone, PartialEq)]
pub struct GeoMetadata {
    /// Pixel-corner based transform (PixelIsPoint already compensated).
    pub transform: GeoTransform,
    /// Declared EPSG code, if any.
    pub epsg: Option<u16>,
    /// Nodata sentinel from `GDAL_NODATA`.
    pub nodata: Option<f64>,
}

/// A decoded band-1 raster with its georeferencing.
#[derive(Debug)]
pub(crate) struct DecodedRaster {
    pub width: usize,
    pub height: usize,
    /// Row-major samples; nodata cells are NaN.
    pub data: Vec<f32>,
    pub metadata: GeoMetadata,
}

/// Decode band 1 and the georeferencing of a GeoTIFF.
///
/// # Errors
///
/// Returns an error if the TIFF cannot be decoded, the sample count does not
/// match the dimensions, or no georeferencing tags are present.
pub(crate) fn decode<R: Read + Seek>(reader: R, path: &Path) -> Result<DecodedRaster> {
    let mut decoder = Decoder::new(reader)?;

    // Allow large DEM tiles (e.g. 10000 x 10000 f32 = ~400 MB)
    let mut limits = Limits::default();
    limits.decoding_buffer_size = 1024 * 1024 * 1024;
    limits.intermediate_buffer_size = 1024 * 1024 * 1024;
    limits.ifd_value_size = 1024 * 1024 * 1024;
    decoder = decoder.with_limits(limits);

    let (width, height) = decoder.dimensions()?;
    let (width, height) = (width as usize, height as usize);

    let metadata = read_metadata(&mut decoder).ok_or_else(|| DemError::MissingGeoreference {
        path: path.to_path_buf(),
    })?;

    let planar = decoder.get_tag_u32(Tag::PlanarConfiguration).unwrap_or(1);
    let samples = decode_samples(&mut decoder)?;
    let mut data = first_band(samples, width, height, planar == 2)?;

    if let Some(nodata) = metadata.nodata {
        let nodata = nodata as f32;
        for v in data.iter_mut().filter(|v| **v == nodata) {
            *v = f32::NAN;
        }
    }

    Ok(DecodedRaster {
        width,
        height,
        data,
        metadata,
    })
}

/// Read transform, CRS and nodata tags.
///
/// Returns `None` when the file carries no usable georeference.
fn read_metadata<R: Read + Seek>(decoder: &mut Decoder<R>) -> Option<GeoMetadata> {
    let geo_keys = decoder
        .get_tag_u16_vec(tag(GEO_KEY_DIRECTORY))
        .map(|dir| parse_geo_keys(&dir))
        .unwrap_or_default();

    let mut transform = read_transform(decoder)?;

    if geo_key(&geo_keys, GT_RASTER_TYPE_KEY) == Some(RASTER_PIXEL_IS_POINT) {
        // Tiepoint refers to the centre of the upper-left pixel
        transform.origin_x -= 0.5 * transform.pixel_width + 0.5 * transform.row_rotation;
        transform.origin_y -= 0.5 * transform.col_rotation + 0.5 * transform.pixel_height;
    }

    let nodata = decoder
        .get_tag_ascii_string(tag(GDAL_NODATA))
        .ok()
        .and_then(|s| s.trim_matches(char::from(0)).trim().parse::<f64>().ok());

    Some(GeoMetadata {
        transform,
        epsg: epsg_from_geo_keys(&geo_keys),
        nodata,
    })
}

fn read_transform<R: Read + Seek>(decoder: &mut Decoder<R>) -> Option<GeoTransform> {
    if let Ok(m) = decoder.get_tag_f64_vec(tag(MODEL_TRANSFORMATION)) {
        if m.len() >= 8 {
            // Row-major 4x4 matrix; x = m0*col + m1*row + m3, y = m4*col + m5*row + m7
            return Some(GeoTransform::from_gdal([m[3], m[0], m[1], m[7], m[4], m[5]]));
        }
    }

    let tiepoint = decoder.get_tag_f64_vec(tag(MODEL_TIEPOINT)).ok()?;
    let scale = decoder.get_tag_f64_vec(tag(MODEL_PIXEL_SCALE)).ok()?;
    if tiepoint.len() < 6 || scale.len() < 2 {
        return None;
    }

    // tiepoint: [I, J, K, X, Y, Z], scale: [ScaleX, ScaleY, ScaleZ]
    let origin_x = tiepoint[3] - tiepoint[0] * scale[0];
    let origin_y = tiepoint[4] + tiepoint[1] * scale[1];
    Some(GeoTransform::new(origin_x, origin_y, scale[0], -scale[1]))
}

/// Parse a GeoKey directory into `(key, value)` pairs for inline (SHORT) keys.
fn parse_geo_keys(dir: &[u16]) -> Vec<(u16, u16)> {
    if dir.len() < 4 {
        return Vec::new();
    }
    let count = dir[3] as usize;
    dir[4..]
        .chunks_exact(4)
        .take(count)
        // Location 0 means the value is stored inline
        .filter(|entry| entry[1] == 0)
        .map(|entry| (entry[0], entry[3]))
        .collect()
}

fn geo_key(keys: &[(u16, u16)], key: u16) -> Option<u16> {
    keys.iter().find(|(k, _)| *k == key).map(|(_, v)| *v)
}

fn epsg_from_geo_keys(keys: &[(u16, u16)]) -> Option<u16> {
    let valid = |code: u16| code != 0 && code < USER_DEFINED;
    geo_key(keys, PROJECTED_CS_TYPE_KEY)
        .filter(|c| valid(*c))
        .or_else(|| geo_key(keys, GEOGRAPHIC_TYPE_KEY).filter(|c| valid(*c)))
}

fn decode_samples<R: Read + Seek>(decoder: &mut Decoder<R>) -> Result<Vec<f32>> {
    let result = decoder.read_image()?;

    Ok(match result {
        DecodingResult::F32(data) => data,
        DecodingResult::F64(data) => data.into_iter().map(|v| v as f32).collect(),
        DecodingResult::I16(data) => data.into_iter().map(|v| v as f32).collect(),
        DecodingResult::I32(data) => data.into_iter().map(|v| v as f32).collect(),
        DecodingResult::U16(data) => data.into_iter().map(|v| v as f32).collect(),
        DecodingResult::U32(data) => data.into_iter().map(|v| v as f32).collect(),
        DecodingResult::U8(data) => data.into_iter().map(|v| v as f32).collect(),
        DecodingResult::I8(data) => data.into_iter().map(|v| v as f32).collect(),
        DecodingResult::U64(data) => data.into_iter().map(|v| v as f32).collect(),
        DecodingResult::I64(data) => data.into_iter().map(|v| v as f32).collect(),
    })
}

/// Extract band 1 from interleaved or planar samples.
fn first_band(samples: Vec<f32>, width: usize, height: usize, planar: bool) -> Result<Vec<f32>> {
    let cells = width * height;
    if cells == 0 || samples.len() < cells || samples.len() % cells != 0 {
        return Err(DemError::GridShape {
            width,
            height,
            len: samples.len(),
        });
    }

    let bands = samples.len() / cells;
    if bands == 1 {
        return Ok(samples);
    }
    if planar {
        let mut samples = samples;
        samples.truncate(cells);
        Ok(samples)
    } else {
        Ok(samples.into_iter().step_by(bands).collect())
    }
}
