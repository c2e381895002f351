//! STAC query extension to CMR range and `query_key` parameters.

use serde_json::{Map, Value};
use tracing::{debug, warn};

use crate::convert::Params;
use crate::error::{Error, Result};

pub const QUERY_PARAM: &str = "query";
pub const QUERY_KEY_PARAM: &str = "query_key";

/// Operators a CMR range can express. `neq` has no range form and is skipped.
const LOWER_BOUND: [&str; 3] = ["eq", "gt", "gte"];
const UPPER_BOUND: [&str; 2] = ["lt", "lte"];

/// CMR parameter for a queryable STAC property.
pub fn to_cmr_field(property: &str) -> Result<&'static str> {
    match property {
        "eo:cloud_cover" | "properties.eo:cloud_cover" => Ok("cloud_cover"),
        _ => Err(Error::InvalidQueryProperty {
            property: property.to_string(),
        }),
    }
}

fn render(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Collapse `{operator: value}` into a CMR `lo,hi` range. `eq` pins both ends.
fn range(property: &str, operators: &Map<String, Value>) -> String {
    let mut lower = String::new();
    let mut upper = String::new();
    for (operator, value) in operators {
        let value = render(value);
        if operator == "eq" {
            upper = value.clone();
        }
        if LOWER_BOUND.contains(&operator.as_str()) {
            lower = value;
        } else if UPPER_BOUND.contains(&operator.as_str()) {
            upper = value;
        } else {
            warn!(property, operator = %operator, "ignoring unsupported query operator");
        }
    }
    format!("{lower},{upper}")
}

fn sort_terms(query: &[Value]) -> Result<Vec<Value>> {
    query
        .iter()
        .map(|term| {
            let field = term
                .get("field")
                .and_then(Value::as_str)
                .filter(|field| !field.is_empty())
                .ok_or_else(|| Error::invalid_parameter(QUERY_PARAM, format!("{term} has no field")))?;
            let sign = match term.get("direction").and_then(Value::as_str) {
                Some("desc") => '-',
                _ => '+',
            };
            Ok(Value::String(format!("{sign}{}", to_cmr_field(field)?)))
        })
        .collect()
}

/// Remove `query` and translate it. The string form is not supported and is
/// dropped without further effect.
pub fn prepare(mut params: Params) -> Result<Params> {
    let Some(query) = params.remove(QUERY_PARAM) else {
        return Ok(params);
    };
    match query {
        Value::Array(terms) => {
            let terms = sort_terms(&terms)?;
            params.insert(QUERY_KEY_PARAM.to_string(), Value::Array(terms));
        }
        Value::Object(properties) => {
            for (property, operators) in &properties {
                let field = to_cmr_field(property)?;
                match operators.as_object() {
                    Some(operators) => {
                        params.insert(field.to_string(), Value::String(range(property, operators)));
                    }
                    None => debug!(property = %property, "ignoring query without operators"),
                }
            }
        }
        Value::String(query) => {
            debug!(%query, "string query form is not supported; dropping it");
        }
        other => debug!(query = %other, "ignoring unsupported query form"),
    }
    Ok(params)
}
