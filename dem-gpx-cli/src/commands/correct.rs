use anyhow::{Context, Result};
use dem_gpx::{
    default_output_path, load_tiles, process_gpx, CorrectionConfig, CorrectionStats,
    InterpolationMethod, TileSet,
};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing::error;

use crate::progress;

/// How a correction run ended, short of an unexpected error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// Track corrected and written.
    Corrected {
        output: PathBuf,
        stats: CorrectionStats,
    },
    /// The GPX file does not exist.
    MissingGpx,
    /// The DEM folder does not exist.
    MissingDemFolder,
    /// The DEM folder holds no loadable tile.
    NoTiles,
}

impl Outcome {
    pub fn exit_code(&self) -> ExitCode {
        match self {
            Outcome::Corrected { .. } => ExitCode::SUCCESS,
            _ => ExitCode::FAILURE,
        }
    }
}

/// Correct `gpx_file` against the tiles in `dem_folder`.
///
/// The output defaults to `<stem>_corrected<.ext>` next to the input. Tiles
/// are released before returning, whether or not processing succeeded.
pub fn run(
    gpx_file: &Path,
    dem_folder: &Path,
    output: Option<PathBuf>,
    config: &CorrectionConfig,
) -> Result<Outcome> {
    if !gpx_file.exists() {
        error!("GPX file not found: {}", gpx_file.display());
        return Ok(Outcome::MissingGpx);
    }

    if !dem_folder.exists() {
        error!("DEM folder not found: {}", dem_folder.display());
        return Ok(Outcome::MissingDemFolder);
    }

    let output = output.unwrap_or_else(|| default_output_path(gpx_file));

    let pb = progress::bar("tiles")?;
    let mut tiles = load_tiles(dem_folder, config.fallback_epsg, progress::updater(&pb))
        .with_context(|| format!("Failed to read DEM folder {}", dem_folder.display()))?;
    pb.finish_and_clear();

    if tiles.is_empty() {
        error!("No valid tiles loaded. Exiting.");
        return Ok(Outcome::NoTiles);
    }

    let stats = correct_track(gpx_file, &mut tiles, &output, config.method)?;
    Ok(Outcome::Corrected { output, stats })
}

/// Correct one track against loaded tiles and write it to `output`.
///
/// Every tile in `tiles` is released before this returns, on success and on
/// error alike.
pub fn correct_track(
    gpx_file: &Path,
    tiles: &mut TileSet,
    output: &Path,
    method: InterpolationMethod,
) -> Result<CorrectionStats> {
    let pb = progress::bar("points")?;
    let result = process_gpx(gpx_file, tiles.as_slice(), output, method, progress::updater(&pb));
    pb.finish_and_clear();
    tiles.release_all();

    result.with_context(|| format!("Failed to process {}", gpx_file.display()))
}
