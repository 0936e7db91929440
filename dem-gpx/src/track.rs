//! GPX track elevation correction.
//!
//! Every track point is looked up against an ordered list of
//! [`ElevationSource`]s; the first source that covers the point and yields a
//! value replaces the point's elevation. Points no source can answer keep
//! whatever elevation they had.
//!
//! [`correct_gpx`] works on a parsed [`Gpx`]; [`process_gpx`] works on files
//! and leaves every byte other than the elevations untouched.
//!
//! # Example
//!
//! ```ignore
//! use dem_gpx::{default_output_path, load_tiles, process_gpx, InterpolationMethod};
//!
//! let tiles = load_tiles("dgm1/", 25833, |_, _| {})?;
//! let input = std::path::Path::new("ride.gpx");
//! let output = default_output_path(input); // ride_corrected.gpx
//! let stats = process_gpx(input, tiles.as_slice(), &output, InterpolationMethod::Linear, |_, _| {})?;
//! println!("Updated {stats} points");
//! ```

use std::fmt;
use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use gpx::Gpx;
use tracing::info;

use crate::error::Result;
use crate::interpolate::InterpolationMethod;
use crate::rewrite::rewrite_elevations;
use crate::tile::ElevationSource;

/// Outcome of correcting one track file.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CorrectionStats {
    /// Points whose elevation was replaced.
    pub updated: usize,
    /// All track points visited.
    pub total: usize,
}

impl CorrectionStats {
    /// Points left as they were.
    pub fn unchanged(&self) -> usize {
        self.total - self.updated
    }
}

impl fmt::Display for CorrectionStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.updated, self.total)
    }
}

/// Elevation from the first source that covers the point and has a value.
///
/// A covering source that yields nothing (edge strip, nodata) does not stop
/// the search.
pub fn find_elevation<S: ElevationSource>(
    sources: &[S],
    lat: f64,
    lon: f64,
    method: InterpolationMethod,
) -> Option<f64> {
    sources
        .iter()
        .filter(|source| source.covers_location(lat, lon))
        .find_map(|source| source.get_elevation(lat, lon, method))
}

/// Number of track points in the document.
pub fn count_track_points(gpx: &Gpx) -> usize {
    gpx.tracks
        .iter()
        .flat_map(|track| &track.segments)
        .map(|segment| segment.points.len())
        .sum()
}

/// Replace track point elevations in place.
///
/// Points are visited track by track, segment by segment, in document order.
/// Waypoints and routes are left alone. `progress` is called with
/// `(processed, total)` after each point.
pub fn correct_gpx<S, F>(
    gpx: &mut Gpx,
    sources: &[S],
    method: InterpolationMethod,
    mut progress: F,
) -> CorrectionStats
where
    S: ElevationSource,
    F: FnMut(usize, usize),
{
    let total = count_track_points(gpx);
    let mut stats = CorrectionStats { updated: 0, total };
    let mut processed = 0;

    for track in &mut gpx.tracks {
        for segment in &mut track.segments {
            for point in &mut segment.points {
                let geo = point.point();
                if let Some(elevation) = find_elevation(sources, geo.y(), geo.x(), method) {
                    point.elevation = Some(elevation);
                    stats.updated += 1;
                }
                processed += 1;
                progress(processed, total);
            }
        }
    }

    stats
}

/// Parse a GPX file into the `gpx` document model.
pub fn read_gpx<P: AsRef<Path>>(path: P) -> Result<Gpx> {
    let file = File::open(path.as_ref())?;
    Ok(gpx::read(BufReader::new(file))?)
}

/// Serialise a GPX document, overwriting `path` if it exists.
///
/// Only what the `gpx` model holds is written; extensions and unknown
/// elements of a parsed file are not. [`process_gpx`] does not go through
/// this function.
pub fn write_gpx<P: AsRef<Path>>(gpx: &Gpx, path: P) -> Result<()> {
    let file = File::create(path.as_ref())?;
    let mut writer = BufWriter::new(file);
    gpx::write(gpx, &mut writer)?;
    writer.flush()?;
    Ok(())
}

/// Read `input`, correct its track points and write the result to `output`.
///
/// The input is validated as GPX, then rewritten with
/// [`rewrite_elevations`]: only `<ele>` values change, everything else is
/// copied byte for byte. `output` is overwritten if it exists.
///
/// # Errors
///
/// Returns an error if the input cannot be read or parsed, or the output
/// cannot be written. Missing elevation data is never an error.
pub fn process_gpx<S, F>(
    input: &Path,
    sources: &[S],
    output: &Path,
    method: InterpolationMethod,
    progress: F,
) -> Result<CorrectionStats>
where
    S: ElevationSource,
    F: FnMut(usize, usize),
{
    let xml = fs::read(input)?;
    let gpx = gpx::read(&xml[..])?;

    let name = input
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| input.display().to_string());
    info!("Processing {} points in {}...", count_track_points(&gpx), name);

    let (corrected, stats) = rewrite_elevations(&xml, sources, method, progress)?;
    fs::write(output, corrected)?;

    info!("Done. Updated {} points.", stats);
    info!("Saved to {}", output.display());
    Ok(stats)
}

/// Default output location: `<stem>_corrected<.ext>` next to the input.
///
/// # Examples
///
/// ```
/// use dem_gpx::default_output_path;
/// use std::path::{Path, PathBuf};
///
/// assert_eq!(
///     default_output_path(Path::new("tracks/ride.gpx")),
///     PathBuf::from("tracks/ride_corrected.gpx")
/// );
/// assert_eq!(default_output_path(Path::new("ride")), PathBuf::from("ride_corrected"));
/// ```
pub fn default_output_path(input: &Path) -> PathBuf {
    let stem = input
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let name = match input.extension() {
        Some(ext) => format!("{}_corrected.{}", stem, ext.to_string_lossy()),
        None => format!("{}_corrected", stem),
    };
    input.with_file_name(name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::DemError;
    use tempfile::TempDir;

    /// Rectangle of constant elevation; `None` models a tile with a nodata hole.
    struct Patch {
        lat: (f64, f64),
        lon: (f64, f64),
        value: Option<f64>,
    }

    impl Patch {
        fn new(lat: (f64, f64), lon: (f64, f64), value: Option<f64>) -> Self {
            Self { lat, lon, value }
        }
    }

    impl ElevationSource for Patch {
        fn covers_location(&self, lat: f64, lon: f64) -> bool {
            (self.lat.0..=self.lat.1).contains(&lat) && (self.lon.0..=self.lon.1).contains(&lon)
        }

        fn get_elevation(&self, lat: f64, lon: f64, _method: InterpolationMethod) -> Option<f64> {
            if self.covers_location(lat, lon) {
                self.value
            } else {
                None
            }
        }
    }

    const TRACK: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<gpx version="1.1" creator="test" xmlns="http://www.topografix.com/GPX/1/1">
  <trk>
    <name>Tiergarten</name>
    <trkseg>
      <trkpt lat="52.5096" lon="13.3759"><ele>10.0</ele></trkpt>
      <trkpt lat="52.5145" lon="13.3501"><ele>11.0</ele></trkpt>
    </trkseg>
    <trkseg>
      <trkpt lat="48.1372" lon="11.5756"><ele>519.0</ele></trkpt>
    </trkseg>
  </trk>
</gpx>"#;

    fn parse(xml: &str) -> Gpx {
        gpx::read(xml.as_bytes()).unwrap()
    }

    fn elevations(gpx: &Gpx) -> Vec<Option<f64>> {
        gpx.tracks
            .iter()
            .flat_map(|t| &t.segments)
            .flat_map(|s| &s.points)
            .map(|p| p.elevation)
            .collect()
    }

    fn berlin(value: f64) -> Patch {
        Patch::new((52.4, 52.6), (13.2, 13.5), Some(value))
    }

    #[test]
    fn test_two_of_three_updated() {
        let mut gpx = parse(TRACK);
        let mut calls = Vec::new();
        let stats = correct_gpx(
            &mut gpx,
            &[berlin(34.0)],
            InterpolationMethod::Linear,
            |done, total| calls.push((done, total)),
        );

        assert_eq!(stats, CorrectionStats { updated: 2, total: 3 });
        assert_eq!(stats.unchanged(), 1);
        assert_eq!(stats.to_string(), "2/3");
        assert_eq!(elevations(&gpx), vec![Some(34.0), Some(34.0), Some(519.0)]);
        assert_eq!(calls, vec![(1, 3), (2, 3), (3, 3)]);
    }

    #[test]
    fn test_first_covering_source_wins() {
        let sources = [berlin(1.0), berlin(2.0)];
        assert_eq!(
            find_elevation(&sources, 52.5, 13.4, InterpolationMethod::Linear),
            Some(1.0)
        );
    }

    #[test]
    fn test_covering_source_without_value_is_skipped() {
        let sources = [
            Patch::new((52.4, 52.6), (13.2, 13.5), None),
            berlin(2.0),
        ];
        assert_eq!(
            find_elevation(&sources, 52.5, 13.4, InterpolationMethod::Linear),
            Some(2.0)
        );
        assert_eq!(
            find_elevation(&sources, 10.0, 10.0, InterpolationMethod::Linear),
            None
        );
    }

    #[test]
    fn test_no_sources_leaves_points_untouched() {
        let mut gpx = parse(TRACK);
        let before = elevations(&gpx);
        let stats = correct_gpx::<Patch, _>(&mut gpx, &[], InterpolationMethod::Linear, |_, _| {});

        assert_eq!(stats.updated, 0);
        assert_eq!(stats.total, 3);
        assert_eq!(elevations(&gpx), before);
    }

    #[test]
    fn test_missing_elevation_is_filled() {
        let xml = TRACK.replace("<ele>10.0</ele>", "");
        let mut gpx = parse(&xml);
        assert_eq!(elevations(&gpx)[0], None);

        correct_gpx(&mut gpx, &[berlin(34.0)], InterpolationMethod::Linear, |_, _| {});
        assert_eq!(elevations(&gpx)[0], Some(34.0));
    }

    #[test]
    fn test_correction_is_idempotent() {
        let sources = [berlin(34.0)];
        let mut gpx = parse(TRACK);
        correct_gpx(&mut gpx, &sources, InterpolationMethod::Cubic, |_, _| {});
        let once = elevations(&gpx);
        correct_gpx(&mut gpx, &sources, InterpolationMethod::Cubic, |_, _| {});
        assert_eq!(elevations(&gpx), once);
    }

    #[test]
    fn test_waypoints_are_not_touched() {
        let xml = TRACK.replace(
            "  <trk>",
            "  <wpt lat=\"52.5\" lon=\"13.4\"><ele>1.0</ele></wpt>\n  <trk>",
        );
        let mut gpx = parse(&xml);
        correct_gpx(&mut gpx, &[berlin(34.0)], InterpolationMethod::Linear, |_, _| {});
        assert_eq!(gpx.waypoints[0].elevation, Some(1.0));
    }

    #[test]
    fn test_process_gpx_writes_output() {
        let dir = TempDir::new().unwrap();
        let input = dir.path().join("ride.gpx");
        std::fs::write(&input, TRACK).unwrap();
        let output = default_output_path(&input);

        let stats = process_gpx(
            &input,
            &[berlin(34.0)],
            &output,
            InterpolationMethod::Linear,
            |_, _| {},
        )
        .unwrap();
        assert_eq!(stats.to_string(), "2/3");

        let written = read_gpx(&output).unwrap();
        assert_eq!(elevations(&written), vec![Some(34.0), Some(34.0), Some(519.0)]);
        assert_eq!(written.tracks[0].name.as_deref(), Some("Tiergarten"));
        assert_eq!(count_track_points(&written), 3);
    }

    #[test]
    fn test_zero_update_round_trip() {
        let dir = TempDir::new().unwrap();
        let input = dir.path().join("ride.gpx");
        std::fs::write(&input, TRACK).unwrap();
        let output = dir.path().join("out.gpx");

        let stats =
            process_gpx::<Patch, _>(&input, &[], &output, InterpolationMethod::Linear, |_, _| {})
                .unwrap();
        assert_eq!(stats.updated, 0);

        assert_eq!(
            std::fs::read(&output).unwrap(),
            std::fs::read(&input).unwrap()
        );
    }

    #[test]
    fn test_process_gpx_keeps_extensions() {
        let dir = TempDir::new().unwrap();
        let input = dir.path().join("garmin.gpx");
        let xml = r#"<?xml version="1.0" encoding="UTF-8"?>
<gpx version="1.1" creator="Edge 530" xmlns="http://www.topografix.com/GPX/1/1" xmlns:gpxtpx="http://www.garmin.com/xmlschemas/TrackPointExtension/v1">
  <trk>
    <trkseg>
      <trkpt lat="52.5096" lon="13.3759"><ele>10.0</ele><time>2024-05-01T10:00:00Z</time><extensions><gpxtpx:TrackPointExtension><gpxtpx:hr>142</gpxtpx:hr></gpxtpx:TrackPointExtension></extensions></trkpt>
      <trkpt lat="48.1372" lon="11.5756"><ele>519.0</ele><time>2024-05-01T10:00:01Z</time></trkpt>
    </trkseg>
  </trk>
</gpx>"#;
        std::fs::write(&input, xml).unwrap();

        let untouched = dir.path().join("untouched.gpx");
        process_gpx::<Patch, _>(&input, &[], &untouched, InterpolationMethod::Linear, |_, _| {})
            .unwrap();
        assert_eq!(std::fs::read_to_string(&untouched).unwrap(), xml);

        let corrected = dir.path().join("corrected.gpx");
        let stats = process_gpx(
            &input,
            &[berlin(34.0)],
            &corrected,
            InterpolationMethod::Linear,
            |_, _| {},
        )
        .unwrap();
        assert_eq!(stats.to_string(), "1/2");
        let written = std::fs::read_to_string(&corrected).unwrap();
        assert_eq!(written, xml.replace("<ele>10.0</ele>", "<ele>34</ele>"));
        assert!(written.contains("<gpxtpx:hr>142</gpxtpx:hr>"));
    }

    #[test]
    fn test_process_gpx_keeps_gpx_10() {
        let dir = TempDir::new().unwrap();
        let input = dir.path().join("old.gpx");
        let xml = TRACK
            .replace(r#"version="1.1""#, r#"version="1.0""#)
            .replace("GPX/1/1", "GPX/1/0");
        std::fs::write(&input, &xml).unwrap();
        let output = dir.path().join("out.gpx");

        process_gpx(&input, &[berlin(34.0)], &output, InterpolationMethod::Linear, |_, _| {})
            .unwrap();
        let written = std::fs::read_to_string(&output).unwrap();
        assert!(written.contains(r#"<gpx version="1.0""#));
        assert_eq!(elevations(&read_gpx(&output).unwrap())[0], Some(34.0));
    }

    #[test]
    fn test_write_gpx_round_trip() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("model.gpx");
        let mut gpx = parse(TRACK);
        correct_gpx(&mut gpx, &[berlin(34.0)], InterpolationMethod::Linear, |_, _| {});

        write_gpx(&gpx, &path).unwrap();
        let written = read_gpx(&path).unwrap();
        assert_eq!(elevations(&written), vec![Some(34.0), Some(34.0), Some(519.0)]);
        assert_eq!(written.tracks[0].name.as_deref(), Some("Tiergarten"));
    }

    #[test]
    fn test_process_gpx_errors() {
        let dir = TempDir::new().unwrap();
        let missing = dir.path().join("missing.gpx");
        let output = dir.path().join("out.gpx");
        let result =
            process_gpx::<Patch, _>(&missing, &[], &output, InterpolationMethod::Linear, |_, _| {});
        assert!(matches!(result, Err(DemError::Io(_))));

        let broken = dir.path().join("broken.gpx");
        std::fs::write(&broken, "<gpx><trk>").unwrap();
        let result =
            process_gpx::<Patch, _>(&broken, &[], &output, InterpolationMethod::Linear, |_, _| {});
        assert!(matches!(result, Err(DemError::Gpx(_))));
        assert!(!output.exists());
    }

    #[test]
    fn test_default_output_path() {
        assert_eq!(
            default_output_path(Path::new("/data/tour.GPX")),
            PathBuf::from("/data/tour_corrected.GPX")
        );
        assert_eq!(
            default_output_path(Path::new("archive.tar.gpx")),
            PathBuf::from("archive.tar_corrected.gpx")
        );
    }
}
