//! Command implementations behind the `dem-gpx` and `dem-gpx-inspect` binaries.

pub mod commands;
pub mod logging;
pub mod progress;
