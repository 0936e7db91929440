//! Loading a directory of elevation tiles.

use std::fs;
use std::path::{Path, PathBuf};
use std::slice;

use tracing::{debug, error, info, warn};

use crate::error::Result;
use crate::tile::RasterTile;

/// Returns `true` if the path has a `.tif` or `.tiff` extension (any case).
fn is_tile_file(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.eq_ignore_ascii_case("tif") || ext.eq_ignore_ascii_case("tiff"))
        .unwrap_or(false)
}

/// List candidate tile files in a directory.
///
/// Only files directly inside `dir` are considered, symlinks to files
/// included; the result is sorted by file name.
///
/// # Errors
///
/// Returns an error if the directory cannot be read.
pub fn scan_tile_files<P: AsRef<Path>>(dir: P) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for entry in fs::read_dir(dir.as_ref())? {
        let path = entry?.path();
        // Follows symlinks; dangling links are not files
        if is_tile_file(&path) && path.is_file() {
            files.push(path);
        }
    }
    files.sort_by(|a, b| a.file_name().cmp(&b.file_name()));
    Ok(files)
}

/// Load every readable tile in a directory.
///
/// Tiles that fail to load are logged and skipped. `progress` is called with
/// `(processed, total)` after each candidate file.
///
/// # Errors
///
/// Returns an error only if the directory cannot be read. An empty directory
/// yields an empty [`TileSet`].
pub fn load_tiles<P, F>(dir: P, fallback_epsg: u16, mut progress: F) -> Result<TileSet>
where
    P: AsRef<Path>,
    F: FnMut(usize, usize),
{
    let dir = dir.as_ref();
    let files = scan_tile_files(dir)?;

    if files.is_empty() {
        warn!("No .tif files found in {}", dir.display());
        return Ok(TileSet::default());
    }

    let total = files.len();
    info!("Loading {} DEM tiles from {}...", total, dir.display());

    let mut tiles = Vec::with_capacity(total);
    for (i, path) in files.iter().enumerate() {
        match RasterTile::open(path, fallback_epsg) {
            Ok(tile) => tiles.push(tile),
            Err(e) => error!("Failed to load {}: {}", path.display(), e),
        }
        progress(i + 1, total);
    }

    debug!("Loaded {}/{} tiles", tiles.len(), total);
    Ok(TileSet { tiles })
}

/// An ordered collection of loaded tiles.
///
/// Order is the scan order and decides which tile wins where tiles overlap.
/// Remaining tiles are released when the set is dropped.
#[derive(Debug, Default)]
pub struct TileSet {
    tiles: Vec<RasterTile>,
}

impl TileSet {
    /// Build a set from already opened tiles, keeping their order.
    pub fn new(tiles: Vec<RasterTile>) -> Self {
        Self { tiles }
    }

    /// Number of tiles in the set.
    pub fn len(&self) -> usize {
        self.tiles.len()
    }

    /// Returns `true` if no tile loaded.
    pub fn is_empty(&self) -> bool {
        self.tiles.is_empty()
    }

    /// Iterate the tiles in scan order.
    pub fn iter(&self) -> slice::Iter<'_, RasterTile> {
        self.tiles.iter()
    }

    /// The tiles as a slice, for the track corrector.
    pub fn as_slice(&self) -> &[RasterTile] {
        &self.tiles
    }

    /// Release every tile. Safe to call more than once.
    pub fn release_all(&mut self) {
        for tile in &mut self.tiles {
            tile.release();
        }
    }
}

impl<'a> IntoIterator for &'a TileSet {
    type Item = &'a RasterTile;
    type IntoIter = slice::Iter<'a, RasterTile>;

    fn into_iter(self) -> Self::IntoIter {
        self.tiles.iter()
    }
}

impl Drop for TileSet {
    fn drop(&mut self) {
        self.release_all();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crs::EPSG_WGS84;
    use crate::fixtures::write_tile;
    use tempfile::TempDir;

    fn write_wgs84_tile(dir: &Path, name: &str, lon: f64, lat: f64) {
        write_tile(
            &dir.join(name),
            (lon, lat + 1.0),
            0.1,
            (10, 10),
            Some(EPSG_WGS84),
            |_, _| 10.0,
        );
    }

    #[test]
    fn test_scan_filters_and_sorts() {
        let dir = TempDir::new().unwrap();
        for name in ["b.tif", "a.TIFF", "c.Tif", "notes.txt", "d.tif.bak", "e.png"] {
            fs::write(dir.path().join(name), b"x").unwrap();
        }
        fs::create_dir(dir.path().join("nested.tif")).unwrap();

        let files = scan_tile_files(dir.path()).unwrap();
        let names: Vec<_> = files
            .iter()
            .map(|p| p.file_name().unwrap().to_str().unwrap())
            .collect();
        assert_eq!(names, vec!["a.TIFF", "b.tif", "c.Tif"]);
    }

    #[cfg(unix)]
    #[test]
    fn test_symlinked_tiles_are_loaded() {
        use std::os::unix::fs::symlink;

        let store = TempDir::new().unwrap();
        let dir = TempDir::new().unwrap();
        write_wgs84_tile(store.path(), "real.tif", 13.0, 52.0);
        symlink(store.path().join("real.tif"), dir.path().join("linked.tif")).unwrap();
        symlink(store.path().join("gone.tif"), dir.path().join("dangling.tif")).unwrap();

        let files = scan_tile_files(dir.path()).unwrap();
        assert_eq!(files, vec![dir.path().join("linked.tif")]);

        let tiles = load_tiles(dir.path(), 25833, |_, _| {}).unwrap();
        assert_eq!(tiles.len(), 1);
        assert!(tiles.as_slice()[0].covers_location(52.5, 13.5));
    }

    #[test]
    fn test_scan_missing_dir_fails() {
        assert!(scan_tile_files("/nonexistent/dem").is_err());
        assert!(load_tiles("/nonexistent/dem", 25833, |_, _| {}).is_err());
    }

    #[test]
    fn test_empty_dir_gives_empty_set() {
        let dir = TempDir::new().unwrap();
        let mut calls = 0;
        let tiles = load_tiles(dir.path(), 25833, |_, _| calls += 1).unwrap();
        assert!(tiles.is_empty());
        assert_eq!(tiles.len(), 0);
        assert_eq!(calls, 0);
    }

    #[test]
    fn test_corrupt_tile_is_skipped() {
        let dir = TempDir::new().unwrap();
        write_wgs84_tile(dir.path(), "a.tif", 13.0, 52.0);
        fs::write(dir.path().join("b.tif"), b"not a tiff").unwrap();
        write_wgs84_tile(dir.path(), "c.tif", 14.0, 52.0);

        let mut seen = Vec::new();
        let tiles = load_tiles(dir.path(), 25833, |done, total| seen.push((done, total))).unwrap();

        assert_eq!(tiles.len(), 2);
        assert_eq!(seen, vec![(1, 3), (2, 3), (3, 3)]);
        let names: Vec<_> = tiles
            .iter()
            .map(|t| t.path().file_name().unwrap().to_str().unwrap().to_string())
            .collect();
        assert_eq!(names, vec!["a.tif", "c.tif"]);
    }

    #[test]
    fn test_release_all() {
        let dir = TempDir::new().unwrap();
        write_wgs84_tile(dir.path(), "a.tif", 13.0, 52.0);
        write_wgs84_tile(dir.path(), "b.tif", 14.0, 52.0);

        let mut tiles = load_tiles(dir.path(), 25833, |_, _| {}).unwrap();
        assert!(tiles.iter().all(|t| !t.is_released()));

        tiles.release_all();
        tiles.release_all();
        assert!((&tiles).into_iter().all(RasterTile::is_released));
        assert_eq!(tiles.as_slice().len(), 2);
    }
}
