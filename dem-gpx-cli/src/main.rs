use anyhow::Result;
use clap::Parser;
use dem_gpx::CorrectionConfig;
use dem_gpx_cli::{commands, logging};
use std::path::PathBuf;
use std::process::ExitCode;

/// Correct GPX elevation using local DEM (.tif) files
#[derive(Parser)]
#[command(name = "dem-gpx")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to the input GPX file
    gpx_file: PathBuf,

    /// Folder containing .tif DEM files
    dem_folder: PathBuf,

    /// Path for the output GPX file [default: <input>_corrected.gpx]
    #[arg(short, long)]
    output: Option<PathBuf>,
}

fn main() -> Result<ExitCode> {
    let cli = Cli::parse();
    logging::init();

    let config = CorrectionConfig::from_env()?;
    let outcome = commands::correct::run(&cli.gpx_file, &cli.dem_folder, cli.output, &config)?;
    Ok(outcome.exit_code())
}
