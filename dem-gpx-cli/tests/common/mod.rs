#![allow(dead_code)]

use std::path::Path;

use tiff::encoder::colortype::Gray32Float;
use tiff::encoder::TiffEncoder;
use tiff::tags::Tag;

pub const TRACK: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<gpx version="1.1" creator="test" xmlns="http://www.topografix.com/GPX/1/1">
  <trk>
    <trkseg>
      <trkpt lat="52.55" lon="13.35"><ele>1.0</ele></trkpt>
      <trkpt lat="52.45" lon="13.45"><ele>2.0</ele></trkpt>
      <trkpt lat="48.1372" lon="11.5756"><ele>519.0</ele></trkpt>
    </trkseg>
  </trk>
</gpx>"#;

/// 10x10 WGS84 tile of 0.1° cells covering lat 52..53, lon 13..14 with
/// `value(row, col)`.
pub fn write_berlin_tile(path: &Path, value: impl Fn(usize, usize) -> f32) {
    let mut data = Vec::with_capacity(100);
    for row in 0..10 {
        for col in 0..10 {
            data.push(value(row, col));
        }
    }

    let file = std::fs::File::create(path).unwrap();
    let mut encoder = TiffEncoder::new(file).unwrap();
    let mut image = encoder.new_image::<Gray32Float>(10, 10).unwrap();
    image
        .encoder()
        .write_tag(Tag::from_u16_exhaustive(33550), &[0.1, 0.1, 0.0][..])
        .unwrap();
    image
        .encoder()
        .write_tag(
            Tag::from_u16_exhaustive(33922),
            &[0.0, 0.0, 0.0, 13.0, 53.0, 0.0][..],
        )
        .unwrap();
    // GeographicTypeGeoKey = 4326
    let keys: [u16; 8] = [1, 1, 0, 1, 2048, 0, 1, 4326];
    image
        .encoder()
        .write_tag(Tag::from_u16_exhaustive(34735), &keys[..])
        .unwrap();
    image.write_data(&data).unwrap();
}

pub fn track_elevations(path: &Path) -> Vec<Option<f64>> {
    dem_gpx::read_gpx(path)
        .unwrap()
        .tracks
        .iter()
        .flat_map(|t| &t.segments)
        .flat_map(|s| &s.points)
        .map(|p| p.elevation)
        .collect()
}
