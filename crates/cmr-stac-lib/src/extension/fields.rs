//! Field projection over the features of a result.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::debug;

use crate::convert::Params;

pub const FIELDS_PARAM: &str = "fields";

/// Paths every projected feature keeps unless explicitly excluded.
pub const DEFAULT_INCLUDES: [&str; 8] = [
    "id",
    "type",
    "geometry",
    "bbox",
    "links",
    "assets",
    "collection",
    "properties.datetime",
];

/// Requested include and exclude paths (dotted, e.g. `properties.eo:cloud_cover`).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldsSelection {
    #[serde(default)]
    pub include: Vec<String>,
    #[serde(default)]
    pub exclude: Vec<String>,
}

impl FieldsSelection {
    /// Parse `a,+b,-c`: a leading `-` excludes, a leading `+` is dropped.
    pub fn parse(fields: &str) -> Self {
        let mut selection = Self::default();
        for field in fields.split(',').map(str::trim).filter(|f| !f.is_empty()) {
            match field.strip_prefix('-') {
                Some(excluded) => selection.exclude.push(excluded.to_string()),
                None => selection
                    .include
                    .push(field.strip_prefix('+').unwrap_or(field).to_string()),
            }
        }
        selection
    }

    /// Read a selection from either its string or `{include, exclude}` form.
    pub fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::String(fields) => Some(Self::parse(fields)),
            Value::Object(_) => serde_json::from_value(value.clone()).ok(),
            _ => None,
        }
    }

    /// Defaults plus requested includes, minus every exclude.
    pub fn effective_includes(&self) -> Vec<String> {
        let mut includes: Vec<String> = DEFAULT_INCLUDES.iter().map(|f| f.to_string()).collect();
        for field in &self.include {
            if !includes.contains(field) {
                includes.push(field.clone());
            }
        }
        includes.retain(|field| !self.exclude.contains(field));
        includes
    }

    /// Project one feature: keep the effective includes, then drop the
    /// excludes.
    pub fn apply(&self, feature: &Value) -> Value {
        let mut projected = Value::Object(Map::new());
        for path in self.effective_includes() {
            if let Some(value) = lookup(feature, &path) {
                assign(&mut projected, &path, value.clone());
            }
        }
        for path in &self.exclude {
            remove(&mut projected, path);
        }
        projected
    }
}

/// Drop the `fields` parameter before the request goes upstream.
pub fn prepare(mut params: Params) -> Params {
    params.remove(FIELDS_PARAM);
    params
}

/// Project every feature of `result` independently. Without a selection the
/// result is returned untouched.
pub fn format(mut result: Value, selection: Option<&FieldsSelection>) -> Value {
    let Some(selection) = selection else {
        return result;
    };
    debug!(?selection, "projecting feature fields");
    if let Some(Value::Array(features)) = result.get_mut("features") {
        for feature in features.iter_mut() {
            *feature = selection.apply(feature);
        }
    }
    result
}

fn lookup<'a>(value: &'a Value, path: &str) -> Option<&'a Value> {
    path.split('.')
        .try_fold(value, |current, segment| current.as_object()?.get(segment))
}

fn assign(target: &mut Value, path: &str, value: Value) {
    let mut segments: Vec<&str> = path.split('.').collect();
    let Some(last) = segments.pop() else {
        return;
    };
    let mut current = target;
    for segment in segments {
        let Some(object) = current.as_object_mut() else {
            return;
        };
        current = object
            .entry(segment)
            .or_insert_with(|| Value::Object(Map::new()));
    }
    if let Some(object) = current.as_object_mut() {
        object.insert(last.to_string(), value);
    }
}

fn remove(target: &mut Value, path: &str) {
    let (parent, last) = match path.rsplit_once('.') {
        Some((parent, last)) => (lookup_mut(target, parent), last),
        None => (Some(target), path),
    };
    if let Some(Value::Object(object)) = parent {
        object.remove(last);
    }
}

fn lookup_mut<'a>(value: &'a mut Value, path: &str) -> Option<&'a mut Value> {
    path.split('.')
        .try_fold(value, |current, segment| current.as_object_mut()?.get_mut(segment))
}
