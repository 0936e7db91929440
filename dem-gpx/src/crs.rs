//! Coordinate reference systems and WGS84 reprojection.
//!
//! Track points arrive as WGS84 latitude/longitude, while elevation tiles are
//! usually stored in a projected system. [`Reprojector`] converts a WGS84
//! point into a tile's native coordinates using `proj4rs`.
//!
//! Projection definitions are looked up from a built-in EPSG table covering
//! the systems DEM tiles are commonly published in: geographic WGS84/ETRS89,
//! Web Mercator, ETRS89-LAEA, ETRS89/UTM, WGS84/UTM and the German
//! Gauss-Krüger zones.

use std::fmt;

use proj4rs::proj::Proj;
use proj4rs::transform::transform;

use crate::error::{DemError, Result};

/// EPSG code of WGS84 geographic coordinates.
pub const EPSG_WGS84: u16 = 4326;

/// Projected system assumed for tiles that declare no CRS (ETRS89 / UTM zone 33N).
pub const DEFAULT_FALLBACK_EPSG: u16 = 25833;

/// Returns the PROJ string for an EPSG code, if the code is known.
///
/// # Examples
///
/// ```
/// use dem_gpx::crs::proj_string;
///
/// assert!(proj_string(25833).unwrap().contains("+zone=33"));
/// assert!(proj_string(32718).unwrap().contains("+south"));
/// assert_eq!(proj_string(1), None);
/// ```
pub fn proj_string(epsg: u16) -> Option<String> {
    let def = match epsg {
        4326 => "+proj=longlat +datum=WGS84 +no_defs".to_string(),
        4258 => "+proj=longlat +ellps=GRS80 +towgs84=0,0,0,0,0,0,0 +no_defs".to_string(),
        3857 => "+proj=merc +a=6378137 +b=6378137 +lat_ts=0 +lon_0=0 +x_0=0 +y_0=0 +k=1 +units=m +no_defs"
            .to_string(),
        3035 => "+proj=laea +lat_0=52 +lon_0=10 +x_0=4321000 +y_0=3210000 +ellps=GRS80 +towgs84=0,0,0,0,0,0,0 +units=m +no_defs"
            .to_string(),
        // DHDN / 3-degree Gauss-Krüger zones 2-5
        31466..=31469 => {
            let zone = epsg - 31464;
            format!(
                "+proj=tmerc +lat_0=0 +lon_0={} +k=1 +x_0={}500000 +y_0=0 +ellps=bessel \
                 +towgs84=598.1,73.7,418.2,0.202,0.045,-2.455,6.7 +units=m +no_defs",
                zone * 3,
                zone
            )
        }
        // ETRS89 / UTM zones 28N-38N
        25828..=25838 => format!(
            "+proj=utm +zone={} +ellps=GRS80 +towgs84=0,0,0,0,0,0,0 +units=m +no_defs",
            epsg - 25800
        ),
        // WGS84 / UTM north
        32601..=32660 => format!("+proj=utm +zone={} +datum=WGS84 +units=m +no_defs", epsg - 32600),
        // WGS84 / UTM south
        32701..=32760 => format!(
            "+proj=utm +zone={} +south +datum=WGS84 +units=m +no_defs",
            epsg - 32700
        ),
        _ => return None,
    };
    Some(def)
}

/// Returns `true` if the EPSG code denotes a geographic (degree-based) system.
pub fn is_geographic(epsg: u16) -> bool {
    matches!(epsg, 4326 | 4258)
}

enum Strategy {
    /// Target is WGS84 itself.
    Identity,
    Proj { source: Box<Proj>, target: Box<Proj> },
}

/// Converts WGS84 latitude/longitude into a target coordinate system.
///
/// # Example
///
/// ```ignore
/// use dem_gpx::crs::Reprojector;
///
/// let to_utm33 = Reprojector::from_wgs84(25833)?;
/// let (x, y) = to_utm33.project(52.5096, 13.3759)?; // Potsdamer Platz
/// ```
pub struct Reprojector {
    strategy: Strategy,
    target_epsg: u16,
}

impl fmt::Debug for Reprojector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Reprojector")
            .field("target_epsg", &self.target_epsg)
            .finish_non_exhaustive()
    }
}

impl Reprojector {
    /// Create a reprojector from WGS84 to the given EPSG code.
    ///
    /// # Errors
    ///
    /// Returns [`DemError::UnsupportedCrs`] if no definition is known for the
    /// code, or [`DemError::Projection`] if `proj4rs` rejects the definition.
    pub fn from_wgs84(target_epsg: u16) -> Result<Self> {
        if target_epsg == EPSG_WGS84 {
            return Ok(Self {
                strategy: Strategy::Identity,
                target_epsg,
            });
        }

        let target_def =
            proj_string(target_epsg).ok_or(DemError::UnsupportedCrs { epsg: target_epsg })?;
        let source_def =
            proj_string(EPSG_WGS84).ok_or(DemError::UnsupportedCrs { epsg: EPSG_WGS84 })?;

        let source = Proj::from_proj_string(&source_def)
            .map_err(|e| DemError::Projection(format!("Invalid WGS84 definition: {e:?}")))?;
        let target = Proj::from_proj_string(&target_def).map_err(|e| {
            DemError::Projection(format!("Invalid definition for EPSG:{target_epsg}: {e:?}"))
        })?;

        Ok(Self {
            strategy: Strategy::Proj {
                source: Box::new(source),
                target: Box::new(target),
            },
            target_epsg,
        })
    }

    /// EPSG code of the target system.
    pub fn target_epsg(&self) -> u16 {
        self.target_epsg
    }

    /// Project a WGS84 point into the target system.
    ///
    /// Returns `(x, y)` in the target's units: metres for projected systems,
    /// degrees (`x` = longitude) for geographic ones.
    ///
    /// # Errors
    ///
    /// Returns [`DemError::Projection`] if the transformation fails or yields
    /// non-finite coordinates.
    pub fn project(&self, lat: f64, lon: f64) -> Result<(f64, f64)> {
        let (source, target) = match &self.strategy {
            Strategy::Identity => return Ok((lon, lat)),
            Strategy::Proj { source, target } => (source, target),
        };

        // proj4rs works in radians for geographic systems
        let mut point = (lon.to_radians(), lat.to_radians(), 0.0);
        transform(source, target, &mut point)
            .map_err(|e| DemError::Projection(format!("Transform failed: {e:?}")))?;

        let (x, y) = if is_geographic(self.target_epsg) {
            (point.0.to_degrees(), point.1.to_degrees())
        } else {
            (point.0, point.1)
        };

        if !x.is_finite() || !y.is_finite() {
            return Err(DemError::Projection(format!(
                "Non-finite result projecting ({lat}, {lon}) to EPSG:{}",
                self.target_epsg
            )));
        }
        Ok((x, y))
    }
}
