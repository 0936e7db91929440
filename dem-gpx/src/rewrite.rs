//! Lossless elevation rewriting of GPX documents.
//!
//! The document is scanned once with `quick-xml` to find every `<trkpt>`, its
//! coordinates and the byte range holding its elevation. Elevations are then
//! spliced into a copy of the input; every other byte, including extensions,
//! comments, namespaces and the declared GPX version, is passed through as is.

use std::ops::Range;

use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;

use crate::error::{DemError, Result};
use crate::interpolate::InterpolationMethod;
use crate::tile::ElevationSource;
use crate::track::{find_elevation, CorrectionStats};

/// Where a track point's elevation lives in the source bytes.
#[derive(Debug, Clone, PartialEq)]
enum ElevationSlot {
    /// Text between `<ele>` and `</ele>`.
    Text(Range<usize>),
    /// An empty `<ele/>` tag.
    EmptyTag(Range<usize>),
    /// No `<ele>` child; insert right after the point's start tag.
    Missing { at: usize },
    /// A self-closing `<trkpt .../>`.
    SelfClosingPoint(Range<usize>),
}

#[derive(Debug, Clone, PartialEq)]
struct TrackPoint {
    lat: f64,
    lon: f64,
    /// Namespace prefix of the `trkpt` tag, including the colon.
    prefix: String,
    slot: ElevationSlot,
}

impl TrackPoint {
    /// Byte range to replace and the bytes that replace it.
    fn replacement(&self, xml: &[u8], elevation: f64) -> (Range<usize>, Vec<u8>) {
        let ele = format!("<{p}ele>{v}</{p}ele>", p = self.prefix, v = elevation);
        match &self.slot {
            ElevationSlot::Text(range) => (range.clone(), elevation.to_string().into_bytes()),
            ElevationSlot::EmptyTag(range) => (range.clone(), ele.into_bytes()),
            ElevationSlot::Missing { at } => (*at..*at, ele.into_bytes()),
            ElevationSlot::SelfClosingPoint(range) => {
                // Drop the trailing "/>" and close the element explicitly
                let mut bytes = xml[range.start..range.end - 2].to_vec();
                bytes.push(b'>');
                bytes.extend_from_slice(ele.as_bytes());
                bytes.extend_from_slice(format!("</{}trkpt>", self.prefix).as_bytes());
                (range.clone(), bytes)
            }
        }
    }
}

/// A `<trkpt>` whose end tag has not been seen yet.
struct OpenPoint {
    depth: usize,
    lat: f64,
    lon: f64,
    prefix: String,
    content_start: usize,
    ele_content_start: Option<usize>,
    slot: Option<ElevationSlot>,
}

impl OpenPoint {
    fn finish(self) -> TrackPoint {
        TrackPoint {
            lat: self.lat,
            lon: self.lon,
            prefix: self.prefix,
            slot: self.slot.unwrap_or(ElevationSlot::Missing {
                at: self.content_start,
            }),
        }
    }
}

fn prefix_of(e: &BytesStart<'_>) -> String {
    let name = e.name();
    let local = e.local_name();
    let prefix_len = name.as_ref().len() - local.as_ref().len();
    String::from_utf8_lossy(&name.as_ref()[..prefix_len]).into_owned()
}

fn point_coordinates(e: &BytesStart<'_>, offset: usize) -> Result<(f64, f64)> {
    let mut lat = None;
    let mut lon = None;
    for attr in e.attributes() {
        let attr = attr.map_err(quick_xml::Error::from)?;
        let target = match attr.key.as_ref() {
            b"lat" => &mut lat,
            b"lon" => &mut lon,
            _ => continue,
        };
        *target = std::str::from_utf8(&attr.value)
            .ok()
            .and_then(|v| v.trim().parse::<f64>().ok());
    }

    match (lat, lon) {
        (Some(lat), Some(lon)) => Ok((lat, lon)),
        _ => Err(DemError::TrackPoint {
            offset,
            reason: "missing or invalid lat/lon",
        }),
    }
}

/// Locate every track point in document order.
fn scan_track_points(xml: &[u8]) -> Result<Vec<TrackPoint>> {
    let mut reader = Reader::from_reader(xml);
    let mut points = Vec::new();
    let mut open: Option<OpenPoint> = None;
    let mut depth = 0usize;

    loop {
        let start = reader.buffer_position() as usize;
        let event = reader.read_event()?;
        let end = reader.buffer_position() as usize;

        match event {
            Event::Start(e) => {
                if let Some(point) = open.as_mut() {
                    if depth == point.depth + 1
                        && point.slot.is_none()
                        && e.local_name().as_ref() == b"ele"
                    {
                        point.ele_content_start = Some(end);
                    }
                } else if e.local_name().as_ref() == b"trkpt" {
                    let (lat, lon) = point_coordinates(&e, start)?;
                    open = Some(OpenPoint {
                        depth,
                        lat,
                        lon,
                        prefix: prefix_of(&e),
                        content_start: end,
                        ele_content_start: None,
                        slot: None,
                    });
                }
                depth += 1;
            }
            Event::Empty(e) => {
                if let Some(point) = open.as_mut() {
                    if depth == point.depth + 1
                        && point.slot.is_none()
                        && e.local_name().as_ref() == b"ele"
                    {
                        point.slot = Some(ElevationSlot::EmptyTag(start..end));
                    }
                } else if e.local_name().as_ref() == b"trkpt" {
                    let (lat, lon) = point_coordinates(&e, start)?;
                    points.push(TrackPoint {
                        lat,
                        lon,
                        prefix: prefix_of(&e),
                        slot: ElevationSlot::SelfClosingPoint(start..end),
                    });
                }
            }
            Event::End(_) => {
                depth = depth.saturating_sub(1);
                let closes_point = matches!(&open, Some(point) if point.depth == depth);
                if closes_point {
                    if let Some(point) = open.take() {
                        points.push(point.finish());
                    }
                } else if let Some(point) = open.as_mut() {
                    if depth == point.depth + 1 {
                        if let Some(content_start) = point.ele_content_start.take() {
                            point.slot = Some(ElevationSlot::Text(content_start..start));
                        }
                    }
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }

    if open.is_some() {
        return Err(DemError::TrackPoint {
            offset: xml.len(),
            reason: "unclosed track point",
        });
    }
    Ok(points)
}

/// Rewrite the elevation of every track point `sources` can answer.
///
/// Returns the new document and the update counts. Points no source answers,
/// waypoints, route points and all non-elevation content are copied
/// unchanged. A point without an `<ele>` gains one as its first child, which
/// is where the GPX schema puts it. `progress` is called with
/// `(processed, total)` after each track point.
///
/// # Errors
///
/// Returns an error if the document is not well-formed XML or a track point
/// lacks numeric `lat`/`lon` attributes.
pub fn rewrite_elevations<S, F>(
    xml: &[u8],
    sources: &[S],
    method: InterpolationMethod,
    mut progress: F,
) -> Result<(Vec<u8>, CorrectionStats)>
where
    S: ElevationSource,
    F: FnMut(usize, usize),
{
    let points = scan_track_points(xml)?;
    let total = points.len();
    let mut stats = CorrectionStats { updated: 0, total };
    let mut out = Vec::with_capacity(xml.len() + total * 8);
    let mut copied = 0;

    for (i, point) in points.iter().enumerate() {
        if let Some(elevation) = find_elevation(sources, point.lat, point.lon, method) {
            let (range, bytes) = point.replacement(xml, elevation);
            out.extend_from_slice(&xml[copied..range.start]);
            out.extend_from_slice(&bytes);
            copied = range.end;
            stats.updated += 1;
        }
        progress(i + 1, total);
    }
    out.extend_from_slice(&xml[copied..]);

    Ok((out, stats))
}
