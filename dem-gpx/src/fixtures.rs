//! GeoTIFF fixtures for unit tests.

use std::path::Path;

use tiff::encoder::colortype::Gray32Float;
use tiff::encoder::TiffEncoder;
use tiff::tags::Tag;

/// Write a north-up Gray32Float GeoTIFF with `f(row, col)` samples.
///
/// `origin` is the upper-left corner and `cell` the square pixel size, both in
/// native units. `epsg` of `None` writes no GeoKey directory.
pub(crate) fn write_tile(
    path: &Path,
    origin: (f64, f64),
    cell: f64,
    (width, height): (u32, u32),
    epsg: Option<u16>,
    f: impl Fn(usize, usize) -> f32,
) {
    let mut data = Vec::with_capacity((width * height) as usize);
    for row in 0..height as usize {
        for col in 0..width as usize {
            data.push(f(row, col));
        }
    }

    let file = std::fs::File::create(path).unwrap();
    let mut encoder = TiffEncoder::new(file).unwrap();
    let mut image = encoder.new_image::<Gray32Float>(width, height).unwrap();
    image
        .encoder()
        .write_tag(Tag::from_u16_exhaustive(33550), &[cell, cell, 0.0][..])
        .unwrap();
    image
        .encoder()
        .write_tag(
            Tag::from_u16_exhaustive(33922),
            &[0.0, 0.0, 0.0, origin.0, origin.1, 0.0][..],
        )
        .unwrap();
    if let Some(code) = epsg {
        // Version 1.1.0, one key: GeographicType or ProjectedCSType
        let key = if crate::crs::is_geographic(code) { 2048 } else { 3072 };
        let keys: [u16; 8] = [1, 1, 0, 1, key, 0, 1, code];
        image
            .encoder()
            .write_tag(Tag::from_u16_exhaustive(34735), &keys[..])
            .unwrap();
    }
    image.write_data(&data).unwrap();
}
