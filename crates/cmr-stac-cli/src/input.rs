//! Request parameters from `--param KEY=VALUE` flags and `--body` files.

use std::collections::HashSet;
use std::fs;
use std::path::Path;

use anyhow::{bail, Context, Result};
use serde_json::Value;

use cmr_stac_lib::Params;

/// Parse one `KEY=VALUE` flag. Used as a clap value parser.
pub fn parse_key_value(raw: &str) -> std::result::Result<(String, String), String> {
    match raw.split_once('=') {
        Some((key, value)) if !key.trim().is_empty() => {
            Ok((key.trim().to_string(), value.to_string()))
        }
        _ => Err(format!("expected KEY=VALUE, got `{raw}`")),
    }
}

/// Values that look like JSON objects or arrays are parsed as such so the
/// query and fields extensions can be driven from the command line.
fn flag_value(key: &str, raw: &str) -> Result<Value> {
    let trimmed = raw.trim_start();
    if trimmed.starts_with('{') || trimmed.starts_with('[') {
        return serde_json::from_str(raw)
            .with_context(|| format!("parameter `{key}` is not valid JSON"));
    }
    Ok(Value::String(raw.to_string()))
}

/// Merge an optional JSON body with `KEY=VALUE` flags. Flags override body
/// keys; a flag repeated for the same key collects into an array.
pub fn build_params(body: Option<&Path>, pairs: &[(String, String)]) -> Result<Params> {
    let mut params = match body {
        Some(path) => read_body(path)?,
        None => Params::new(),
    };

    let mut from_flags = HashSet::new();
    for (key, raw) in pairs {
        let value = flag_value(key, raw)?;
        if !from_flags.insert(key.as_str()) {
            match params.get_mut(key) {
                Some(Value::Array(values)) => values.push(value),
                Some(existing) => {
                    let first = existing.take();
                    *existing = Value::Array(vec![first, value]);
                }
                None => {
                    params.insert(key.clone(), value);
                }
            }
            continue;
        }
        params.insert(key.clone(), value);
    }
    Ok(params)
}

fn read_body(path: &Path) -> Result<Params> {
    let contents = fs::read_to_string(path)
        .with_context(|| format!("failed to read request body from {}", path.display()))?;
    let body: Value = serde_json::from_str(&contents)
        .with_context(|| format!("request body in {} is not valid JSON", path.display()))?;
    match body {
        Value::Object(params) => Ok(params),
        _ => bail!("request body in {} must be a JSON object", path.display()),
    }
}
