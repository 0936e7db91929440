//! Run configuration.

use crate::crs::DEFAULT_FALLBACK_EPSG;
use crate::error::{DemError, Result};
use crate::interpolate::InterpolationMethod;

/// Environment variable overriding the fallback EPSG code.
pub const ENV_FALLBACK_EPSG: &str = "DEM_GPX_FALLBACK_EPSG";

/// Environment variable overriding the interpolation method.
pub const ENV_METHOD: &str = "DEM_GPX_METHOD";

/// Settings shared by tile loading and track correction.
///
/// # Example
///
/// ```
/// use dem_gpx::{CorrectionConfig, InterpolationMethod};
///
/// let config = CorrectionConfig::default()
///     .fallback_epsg(25832)
///     .method(InterpolationMethod::Cubic);
/// assert_eq!(config.fallback_epsg, 25832);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CorrectionConfig {
    /// CRS assumed for tiles that declare none.
    pub fallback_epsg: u16,
    /// Interpolation used for every elevation lookup.
    pub method: InterpolationMethod,
}

impl Default for CorrectionConfig {
    fn default() -> Self {
        Self {
            fallback_epsg: DEFAULT_FALLBACK_EPSG,
            method: InterpolationMethod::default(),
        }
    }
}

impl CorrectionConfig {
    /// Create a configuration from environment variables.
    ///
    /// # Environment Variables
    ///
    /// | Variable | Description | Default |
    /// |----------|-------------|---------|
    /// | `DEM_GPX_FALLBACK_EPSG` | EPSG code for tiles without a CRS | 25833 |
    /// | `DEM_GPX_METHOD` | nearest, linear, cubic or quintic | linear |
    ///
    /// # Errors
    ///
    /// Returns [`DemError::InvalidConfig`] if a variable is set but cannot be parsed.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let mut config = Self::default();

        if let Some(value) = lookup(ENV_FALLBACK_EPSG) {
            config.fallback_epsg = value.trim().parse().map_err(|_| DemError::InvalidConfig {
                key: ENV_FALLBACK_EPSG,
                value: value.clone(),
            })?;
        }

        if let Some(value) = lookup(ENV_METHOD) {
            config.method = value.parse().map_err(|_| DemError::InvalidConfig {
                key: ENV_METHOD,
                value: value.clone(),
            })?;
        }

        Ok(config)
    }

    /// Set the fallback EPSG code.
    pub fn fallback_epsg(mut self, epsg: u16) -> Self {
        self.fallback_epsg = epsg;
        self
    }

    /// Set the interpolation method.
    pub fn method(mut self, method: InterpolationMethod) -> Self {
        self.method = method;
        self
    }
}
