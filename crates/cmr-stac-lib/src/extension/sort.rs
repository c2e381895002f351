//! STAC `sortby` to CMR `sort_key`.

use std::collections::HashMap;

use once_cell::sync::Lazy;
use serde_json::Value;
use tracing::debug;

use crate::convert::Params;
use crate::error::{Error, Result};

pub const SORTBY_PARAM: &str = "sortby";
pub const SORT_KEY_PARAM: &str = "sort_key";

static SORT_FIELDS: Lazy<HashMap<&'static str, &'static str>> = Lazy::new(|| {
    let mut fields = HashMap::from([
        ("properties.eo:cloud_cover", "cloud_cover"),
        ("eo:cloud_cover", "cloud_cover"),
        ("properties.datetime", "start_date"),
        ("properties.start_datetime", "start_date"),
        ("properties.end_datetime", "end_date"),
        ("id", "granule_ur"),
    ]);
    for native in [
        "cloud_cover",
        "start_date",
        "end_date",
        "short_name",
        "granule_ur",
        "entry_title",
        "revision_date",
        "producer_granule_id",
        "platform",
        "instrument",
    ] {
        fields.insert(native, native);
    }
    fields
});

/// CMR sort field for a STAC property.
pub fn to_cmr_field(property: &str) -> Result<&'static str> {
    SORT_FIELDS
        .get(property)
        .copied()
        .ok_or_else(|| Error::InvalidSortProperty {
            property: property.to_string(),
        })
}

fn sort_term(field: &str, descending: bool) -> Result<Value> {
    let sign = if descending { '-' } else { '+' };
    Ok(Value::String(format!("{sign}{}", to_cmr_field(field)?)))
}

fn string_terms(sortby: &str) -> Result<Vec<Value>> {
    sortby
        .split(',')
        .map(str::trim)
        .filter(|term| !term.is_empty())
        .map(|term| match term.strip_prefix('-') {
            Some(field) => sort_term(field, true),
            None => sort_term(term.strip_prefix('+').unwrap_or(term), false),
        })
        .collect()
}

fn object_terms(sortby: &[Value]) -> Result<Vec<Value>> {
    sortby
        .iter()
        .map(|term| {
            let field = term
                .get("field")
                .and_then(Value::as_str)
                .filter(|field| !field.is_empty())
                .ok_or_else(|| Error::invalid_parameter(SORTBY_PARAM, format!("{term} has no field")))?;
            let descending = term.get("direction").and_then(Value::as_str) == Some("desc");
            sort_term(field, descending)
        })
        .collect()
}

/// Replace `sortby` with `sort_key`. Any unsortable property fails the whole
/// request.
pub fn prepare(mut params: Params) -> Result<Params> {
    let Some(sortby) = params.remove(SORTBY_PARAM) else {
        return Ok(params);
    };
    let terms = match &sortby {
        Value::String(sortby) => string_terms(sortby)?,
        Value::Array(sortby) => object_terms(sortby)?,
        other => {
            debug!(sortby = %other, "ignoring unsupported sortby form");
            return Ok(params);
        }
    };
    params.insert(SORT_KEY_PARAM.to_string(), Value::Array(terms));
    Ok(params)
}
