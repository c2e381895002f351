//! Bounding box and ordinate string helpers.
//!
//! CMR encodes spatial values as whitespace or comma separated ordinate
//! strings. Boxes come as `south west north east`; STAC wants
//! `[west, south, east, north]`.

use std::num::ParseFloatError;

use serde_json::Value;

/// `[west, south, east, north]`.
pub type BoundingBox = [f64; 4];

pub const WHOLE_WORLD_BBOX: BoundingBox = [-180.0, -90.0, 180.0, 90.0];

/// Split an ordinate string on whitespace and commas into numbers.
pub fn parse_ordinate_string(value: &str) -> Result<Vec<f64>, ParseFloatError> {
    value
        .split(|c: char| c.is_whitespace() || c == ',')
        .filter(|part| !part.is_empty())
        .map(str::parse::<f64>)
        .collect()
}

/// Parse a CMR point string (`lat lon lat lon ...`) into ordinate pairs in
/// source order. A trailing unpaired ordinate is dropped.
pub fn point_string_to_points(value: &str) -> Result<Vec<[f64; 2]>, ParseFloatError> {
    let ordinates = parse_ordinate_string(value)?;
    Ok(ordinates
        .chunks_exact(2)
        .map(|pair| [pair[0], pair[1]])
        .collect())
}

/// Grow `bbox` so it covers every `[lon, lat]` point.
pub fn add_points_to_bbox(bbox: Option<BoundingBox>, points: &[[f64; 2]]) -> Option<BoundingBox> {
    points.iter().fold(bbox, |acc, [lon, lat]| {
        Some(match acc {
            Some([w, s, e, n]) => [w.min(*lon), s.min(*lat), e.max(*lon), n.max(*lat)],
            None => [*lon, *lat, *lon, *lat],
        })
    })
}

/// Smallest box covering both inputs.
pub fn merge_boxes(first: Option<BoundingBox>, second: BoundingBox) -> BoundingBox {
    match first {
        None => second,
        Some(first) => [
            first[0].min(second[0]),
            first[1].min(second[1]),
            first[2].max(second[2]),
            first[3].max(second[3]),
        ],
    }
}

/// Reorder a CMR `[south, west, north, east]` box into STAC order.
pub fn reorder_box([s, w, n, e]: BoundingBox) -> BoundingBox {
    [w, s, e, n]
}

/// Render one ordinate the way CMR expects: integral values carry no
/// fractional part, everything else keeps full precision.
pub fn format_ordinate(value: f64) -> String {
    if value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{}", value as i64)
    } else {
        value.to_string()
    }
}

/// Render a JSON number as an ordinate, preserving integers verbatim.
pub fn format_number(value: &serde_json::Number) -> String {
    match value.as_i64() {
        Some(int) => int.to_string(),
        None => value
            .as_f64()
            .map(format_ordinate)
            .unwrap_or_else(|| value.to_string()),
    }
}

/// Join a JSON array of numbers with commas. Returns `None` when any element
/// is not a number.
pub fn format_ordinates(values: &[Value]) -> Option<String> {
    values
        .iter()
        .map(|value| match value {
            Value::Number(number) => Some(format_number(number)),
            _ => None,
        })
        .collect::<Option<Vec<_>>>()
        .map(|parts| parts.join(","))
}
