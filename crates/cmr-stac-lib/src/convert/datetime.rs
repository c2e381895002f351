//! STAC `datetime` values to CMR `temporal` ranges.

use chrono::{DateTime, Days, NaiveDate, SecondsFormat, Utc};

const OPEN_BOUND: &str = "..";

/// Convert a STAC datetime (single instant, single date, or `/`/`,`
/// separated range) into a CMR temporal range `start,end`.
///
/// A single instant or date covers the following day. Open range ends
/// (`..` or empty) become empty bounds. Values that are not recognisable
/// dates are returned unchanged for CMR to judge.
pub fn to_cmr_temporal(value: &str) -> String {
    let parts: Vec<&str> = value.split(['/', ',']).map(str::trim).collect();

    match parts.as_slice() {
        [single] => match parse_bound(single) {
            Some(start) => match start.checked_add_days(Days::new(1)) {
                Some(end) => format!("{},{}", format_instant(start), format_instant(end)),
                None => format_instant(start),
            },
            None => value.to_string(),
        },
        [start, end] => match (normalize_bound(start), normalize_bound(end)) {
            (Some(start), Some(end)) => format!("{start},{end}"),
            _ => value.to_string(),
        },
        _ => value.to_string(),
    }
}

fn normalize_bound(bound: &str) -> Option<String> {
    if bound.is_empty() || bound == OPEN_BOUND {
        return Some(String::new());
    }
    parse_bound(bound).map(format_instant)
}

fn parse_bound(bound: &str) -> Option<DateTime<Utc>> {
    if let Ok(instant) = DateTime::parse_from_rfc3339(bound) {
        return Some(instant.with_timezone(&Utc));
    }
    NaiveDate::parse_from_str(bound, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

fn format_instant(instant: DateTime<Utc>) -> String {
    instant.to_rfc3339_opts(SecondsFormat::AutoSi, true)
}
