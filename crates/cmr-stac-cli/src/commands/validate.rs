//! Validation of a STAC document file against the shipped JSON Schemas.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use clap::ValueEnum;
use serde_json::Value;

use cmr_stac_lib::validator::missing_required_fields;
use cmr_stac_lib::{SchemaName, SchemaValidatorCache};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum SchemaArg {
    Catalog,
    Collection,
    Item,
}

impl From<SchemaArg> for SchemaName {
    fn from(arg: SchemaArg) -> Self {
        match arg {
            SchemaArg::Catalog => SchemaName::Catalog,
            SchemaArg::Collection => SchemaName::Collection,
            SchemaArg::Item => SchemaName::Item,
        }
    }
}

/// Handle the validate subcommand. Returns `false` when the document has
/// problems; each one is printed on its own line.
pub fn handle_validate(schema: SchemaName, file: &Path, schema_dir: &Path) -> Result<bool> {
    let document = read_document(file)?;
    let problems = check_document(schema, &document, schema_dir)?;
    if problems.is_empty() {
        println!("{} is a valid {schema}", file.display());
        return Ok(true);
    }
    for problem in &problems {
        println!("{problem}");
    }
    Ok(false)
}

pub fn read_document(file: &Path) -> Result<Value> {
    let contents = fs::read_to_string(file)
        .with_context(|| format!("failed to read {}", file.display()))?;
    serde_json::from_str(&contents).with_context(|| format!("{} is not valid JSON", file.display()))
}

/// Missing required fields first, then schema violations.
pub fn check_document(schema: SchemaName, document: &Value, schema_dir: &Path) -> Result<Vec<String>> {
    let mut problems: Vec<String> = missing_required_fields(document)
        .into_iter()
        .map(|field| format!("missing required field: {field}"))
        .collect();

    let cache = SchemaValidatorCache::new(schema_dir);
    let violations = cache
        .validate(schema.as_str(), document)
        .with_context(|| format!("failed to validate against the {schema} schema"))?;
    problems.extend(violations.iter().map(ToString::to_string));
    Ok(problems)
}
