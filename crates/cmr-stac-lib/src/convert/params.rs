//! Declarative parameter conversion maps.
//!
//! Each inbound vocabulary (STAC search body, STAC query string, WFS query
//! string) has one immutable table pairing a source key with a target key and
//! a pure value transform. Keys missing from the active table are passed
//! through untouched, so a conversion never drops a parameter.

use std::fmt;

use serde_json::{Map, Number, Value};
use tracing::{debug, error};
use url::form_urlencoded;

use crate::convert::bounding_box::{format_ordinates, parse_ordinate_string};
use crate::convert::datetime::to_cmr_temporal;
use crate::error::{Error, Result};

/// A request's parameter set, keyed by parameter name.
pub type Params = Map<String, Value>;

/// Pure function converting one parameter value.
pub type Transform = fn(&Value) -> Result<Value>;

/// One entry of a conversion map.
#[derive(Clone, Copy)]
pub struct ParamRule {
    pub source: &'static str,
    pub target: &'static str,
    pub transform: Transform,
}

impl fmt::Debug for ParamRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} -> {}", self.source, self.target)
    }
}

/// An immutable source-to-target parameter table.
#[derive(Debug)]
pub struct ConversionMap {
    pub name: &'static str,
    rules: &'static [ParamRule],
}

impl ConversionMap {
    pub fn rule(&self, source: &str) -> Option<&ParamRule> {
        self.rules.iter().find(|rule| rule.source == source)
    }

    pub fn rules(&self) -> &[ParamRule] {
        self.rules
    }
}

/// STAC search body (POST) to CMR.
pub static STAC_SEARCH_MAP: ConversionMap = ConversionMap {
    name: "stac-search",
    rules: &[
        ParamRule { source: "bbox", target: "bounding_box", transform: join_bbox },
        ParamRule { source: "time", target: "temporal", transform: identity },
        ParamRule { source: "datetime", target: "temporal", transform: datetime_range },
        ParamRule { source: "intersects", target: "polygon", transform: outer_ring },
        ParamRule { source: "limit", target: "page_size", transform: identity },
        ParamRule { source: "page", target: "page_num", transform: identity },
        ParamRule { source: "collectionId", target: "collection_concept_id", transform: identity },
        ParamRule { source: "collections", target: "collection_concept_id", transform: to_array },
        ParamRule { source: "ids", target: "concept_id", transform: to_array },
    ],
};

/// STAC query string (GET) to the internal search-body shape.
pub static STAC_QUERY_MAP: ConversionMap = ConversionMap {
    name: "stac-query",
    rules: &[
        ParamRule { source: "limit", target: "limit", transform: parse_integer },
        ParamRule { source: "page", target: "page", transform: parse_integer },
        ParamRule { source: "bbox", target: "bbox", transform: parse_bbox },
        ParamRule { source: "time", target: "time", transform: identity },
        ParamRule { source: "intersects", target: "intersects", transform: parse_json_text },
        ParamRule { source: "query", target: "query", transform: parse_json_text },
        ParamRule { source: "sortby", target: "sortby", transform: parse_json_text },
        ParamRule { source: "fields", target: "fields", transform: parse_json_text },
    ],
};

/// WFS / OGC query string to CMR.
pub static WFS_QUERY_MAP: ConversionMap = ConversionMap {
    name: "wfs",
    rules: &[
        ParamRule { source: "bbox", target: "bounding_box", transform: identity },
        ParamRule { source: "time", target: "temporal", transform: identity },
        ParamRule { source: "datetime", target: "temporal", transform: datetime_range },
        ParamRule { source: "limit", target: "page_size", transform: identity },
    ],
};

/// Inbound query vocabulary, selecting the active conversion map.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Vocabulary {
    StacSearch,
    StacQuery,
    Wfs,
}

impl Vocabulary {
    pub fn map(self) -> &'static ConversionMap {
        match self {
            Vocabulary::StacSearch => &STAC_SEARCH_MAP,
            Vocabulary::StacQuery => &STAC_QUERY_MAP,
            Vocabulary::Wfs => &WFS_QUERY_MAP,
        }
    }
}

/// CMR parameters that accept a list; several inbound keys feeding one of
/// them are concatenated.
const LIST_TARGETS: [&str; 2] = ["collection_concept_id", "concept_id"];

/// Convert every parameter through the vocabulary's map, failing on the first
/// transform error.
///
/// Two inbound keys landing on the same list target are merged. Any other
/// collision (`time` and `datetime` both set) is rejected.
pub fn try_convert_params(vocabulary: Vocabulary, params: &Params) -> Result<Params> {
    let map = vocabulary.map();
    let mut converted = Params::new();
    for (key, value) in params {
        match map.rule(key) {
            Some(rule) => {
                let value = (rule.transform)(value)?;
                insert_converted(&mut converted, key, rule.target, value)?;
            }
            None => insert_converted(&mut converted, key, key, value.clone())?,
        }
    }
    debug!(map = map.name, ?params, ?converted, "converted parameters");
    Ok(converted)
}

fn insert_converted(converted: &mut Params, source: &str, target: &str, value: Value) -> Result<()> {
    let Some(existing) = converted.remove(target) else {
        converted.insert(target.to_string(), value);
        return Ok(());
    };
    if !LIST_TARGETS.contains(&target) {
        return Err(Error::invalid_parameter(
            source,
            format!("conflicts with another parameter already mapped to {target}"),
        ));
    }
    let mut items = into_list(existing);
    for item in into_list(value) {
        if !items.contains(&item) {
            items.push(item);
        }
    }
    converted.insert(target.to_string(), Value::Array(items));
    Ok(())
}

fn into_list(value: Value) -> Vec<Value> {
    match value {
        Value::Array(items) => items,
        other => vec![other],
    }
}

/// Convert parameters, failing soft: when any transform fails the failure is
/// logged and the original parameters are returned untouched.
pub fn convert_params(vocabulary: Vocabulary, params: &Params) -> Params {
    match try_convert_params(vocabulary, params) {
        Ok(converted) => converted,
        Err(err) => {
            error!(map = vocabulary.map().name, error = %err, "parameter conversion failed; using original parameters");
            params.clone()
        }
    }
}

/// Percent-encode inbound parameters as a STAC query string, the inverse of
/// [`STAC_QUERY_MAP`]: lists of scalars are joined with `,`, objects and
/// lists of objects are written as JSON text, nulls are skipped.
pub fn encode_stac_query(params: &Params) -> String {
    let mut serializer = form_urlencoded::Serializer::new(String::new());
    for (key, value) in params {
        if let Some(value) = stac_query_value(value) {
            serializer.append_pair(key, &value);
        }
    }
    serializer.finish()
}

fn stac_query_value(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        Value::Array(items) if items.iter().all(is_scalar) => Some(
            items
                .iter()
                .map(|item| match item {
                    Value::String(s) => s.clone(),
                    other => other.to_string(),
                })
                .collect::<Vec<_>>()
                .join(","),
        ),
        other => Some(other.to_string()),
    }
}

fn is_scalar(value: &Value) -> bool {
    !matches!(value, Value::Array(_) | Value::Object(_) | Value::Null)
}

fn identity(value: &Value) -> Result<Value> {
    Ok(value.clone())
}

fn join_bbox(value: &Value) -> Result<Value> {
    match value {
        Value::String(_) => Ok(value.clone()),
        Value::Array(ordinates) => format_ordinates(ordinates)
            .map(Value::String)
            .ok_or_else(|| Error::invalid_parameter("bbox", "ordinates must be numbers")),
        _ => Err(Error::invalid_parameter("bbox", "expected an array of ordinates")),
    }
}

/// Flatten the first (outer) ring of a GeoJSON polygon. Holes are ignored.
fn outer_ring(value: &Value) -> Result<Value> {
    if let Some(kind) = value.get("type").and_then(Value::as_str) {
        if kind != "Polygon" {
            return Err(Error::UnsupportedGeometry {
                message: format!("intersects only supports Polygon, got {kind}"),
            });
        }
    }
    let ring = value
        .get("coordinates")
        .and_then(Value::as_array)
        .and_then(|rings| rings.first())
        .and_then(Value::as_array)
        .ok_or_else(|| Error::UnsupportedGeometry {
            message: "polygon has no outer ring".to_string(),
        })?;

    let mut ordinates = Vec::new();
    for position in ring {
        match position.as_array() {
            Some(position) => ordinates.extend(position.iter().cloned()),
            None => ordinates.push(position.clone()),
        }
    }
    format_ordinates(&ordinates)
        .map(Value::String)
        .ok_or_else(|| Error::UnsupportedGeometry {
            message: "polygon coordinates must be numbers".to_string(),
        })
}

fn datetime_range(value: &Value) -> Result<Value> {
    value
        .as_str()
        .map(|datetime| Value::String(to_cmr_temporal(datetime)))
        .ok_or_else(|| Error::invalid_parameter("datetime", "expected a string"))
}

fn to_array(value: &Value) -> Result<Value> {
    match value {
        Value::String(list) => Ok(Value::Array(
            list.split(',')
                .map(str::trim)
                .filter(|item| !item.is_empty())
                .map(|item| Value::String(item.to_string()))
                .collect(),
        )),
        Value::Array(_) => Ok(value.clone()),
        _ => Err(Error::invalid_parameter("collections", "expected a list")),
    }
}

fn parse_integer(value: &Value) -> Result<Value> {
    match value {
        Value::Number(number) if number.is_i64() || number.is_u64() => Ok(value.clone()),
        Value::String(raw) => raw
            .trim()
            .parse::<i64>()
            .map(Value::from)
            .map_err(|err| Error::invalid_parameter("limit", format!("{raw:?} is not an integer: {err}"))),
        _ => Err(Error::invalid_parameter("limit", "expected an integer")),
    }
}

/// Structured values travel through query strings as JSON text. Strings that
/// do not open a JSON object or array are left for the plain string forms.
fn parse_json_text(value: &Value) -> Result<Value> {
    match value {
        Value::String(raw) if raw.trim_start().starts_with(&['{', '['][..]) => {
            serde_json::from_str(raw).map_err(|err| {
                Error::invalid_parameter("query string", format!("{raw:?} is not valid JSON: {err}"))
            })
        }
        _ => Ok(value.clone()),
    }
}

fn parse_bbox(value: &Value) -> Result<Value> {
    match value {
        Value::String(raw) => {
            let ordinates = parse_ordinate_string(raw)
                .map_err(|err| Error::invalid_parameter("bbox", format!("{raw:?}: {err}")))?;
            if ordinates.len() != 4 {
                return Err(Error::invalid_parameter(
                    "bbox",
                    format!("expected 4 ordinates, got {}", ordinates.len()),
                ));
            }
            ordinates
                .into_iter()
                .map(|ordinate| {
                    Number::from_f64(ordinate)
                        .map(Value::Number)
                        .ok_or_else(|| Error::invalid_parameter("bbox", "ordinates must be finite"))
                })
                .collect::<Result<Vec<_>>>()
                .map(Value::Array)
        }
        Value::Array(_) => Ok(value.clone()),
        _ => Err(Error::invalid_parameter("bbox", "expected a comma separated string")),
    }
}
