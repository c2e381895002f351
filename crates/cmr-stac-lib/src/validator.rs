//! JSON Schema validation of emitted STAC documents.
//!
//! Compiled validators are cached per schema name for the lifetime of the
//! cache and never evicted. Compilation happens outside the lock: two threads
//! asking for the same schema at once may both compile it, and the first one
//! to insert wins.

use std::collections::HashMap;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};

use jsonschema::Validator;
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, warn};

use crate::error::{Error, Result};

/// Schemas shipped for emitted documents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SchemaName {
    Catalog,
    Collection,
    Item,
}

impl SchemaName {
    pub fn as_str(self) -> &'static str {
        match self {
            SchemaName::Catalog => "catalog",
            SchemaName::Collection => "collection",
            SchemaName::Item => "item",
        }
    }

    pub fn parse(name: &str) -> Option<Self> {
        match name {
            "catalog" => Some(SchemaName::Catalog),
            "collection" => Some(SchemaName::Collection),
            "item" => Some(SchemaName::Item),
            _ => None,
        }
    }
}

impl fmt::Display for SchemaName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One schema violation, located by JSON pointer into the document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SchemaViolation {
    pub instance_path: String,
    pub message: String,
}

impl fmt::Display for SchemaViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let path = if self.instance_path.is_empty() {
            "/"
        } else {
            &self.instance_path
        };
        write!(f, "{path}: {}", self.message)
    }
}

/// Lazily populated cache of compiled schema validators.
pub struct SchemaValidatorCache {
    schema_dir: PathBuf,
    validators: RwLock<HashMap<String, Arc<Validator>>>,
}

impl fmt::Debug for SchemaValidatorCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let cached: Vec<String> = match self.validators.read() {
            Ok(guard) => guard.keys().cloned().collect(),
            Err(poisoned) => poisoned.into_inner().keys().cloned().collect(),
        };
        f.debug_struct("SchemaValidatorCache")
            .field("schema_dir", &self.schema_dir)
            .field("cached", &cached)
            .finish()
    }
}

impl SchemaValidatorCache {
    /// Cache loading `<schema_dir>/<name>.json` on first use.
    pub fn new(schema_dir: impl Into<PathBuf>) -> Self {
        Self {
            schema_dir: schema_dir.into(),
            validators: RwLock::new(HashMap::new()),
        }
    }

    pub fn schema_dir(&self) -> &Path {
        &self.schema_dir
    }

    /// Compile and register `schema` under `name`, replacing nothing that is
    /// already cached.
    pub fn insert_schema(&self, name: &str, schema: Value) -> Result<Arc<Validator>> {
        let compiled = Arc::new(compile(name, schema)?);
        Ok(self.store(name, compiled))
    }

    /// Validate `document` against the schema called `name`. An empty vector
    /// means the document is valid.
    pub fn validate(&self, name: &str, document: &Value) -> Result<Vec<SchemaViolation>> {
        let validator = self.validator(name)?;
        let violations: Vec<SchemaViolation> = validator
            .iter_errors(document)
            .map(|error| SchemaViolation {
                instance_path: error.instance_path.to_string(),
                message: error.to_string(),
            })
            .collect();
        debug!(schema = name, violations = violations.len(), "validated document");
        Ok(violations)
    }

    /// Validate and, when `invalid_is_error` is set, turn violations into an
    /// error. Otherwise violations are only logged.
    pub fn assert_valid(
        &self,
        schema: SchemaName,
        document: &Value,
        invalid_is_error: bool,
    ) -> Result<Vec<SchemaViolation>> {
        let violations = self.validate(schema.as_str(), document)?;
        if violations.is_empty() {
            return Ok(violations);
        }
        for violation in &violations {
            warn!(schema = %schema, %violation, "created invalid document");
        }
        if invalid_is_error {
            return Err(Error::InvalidDocument {
                name: schema.to_string(),
                violations: violations.len(),
            });
        }
        Ok(violations)
    }

    fn validator(&self, name: &str) -> Result<Arc<Validator>> {
        if let Some(validator) = self.read_cached(name) {
            return Ok(validator);
        }
        let schema = self.load(name)?;
        self.insert_schema(name, schema)
    }

    fn read_cached(&self, name: &str) -> Option<Arc<Validator>> {
        let validators = match self.validators.read() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        validators.get(name).cloned()
    }

    fn store(&self, name: &str, compiled: Arc<Validator>) -> Arc<Validator> {
        let mut validators = match self.validators.write() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        validators
            .entry(name.to_string())
            .or_insert(compiled)
            .clone()
    }

    fn load(&self, name: &str) -> Result<Value> {
        let path = self.schema_dir.join(format!("{name}.json"));
        let contents = fs::read_to_string(&path).map_err(|err| Error::SchemaLoad {
            name: name.to_string(),
            message: format!("{}: {err}", path.display()),
        })?;
        let mut schema: Value = serde_json::from_str(&contents).map_err(|err| Error::SchemaLoad {
            name: name.to_string(),
            message: err.to_string(),
        })?;
        // Remote `$id`s would make the compiler try to resolve siblings over
        // the network.
        if let Some(object) = schema.as_object_mut() {
            object.remove("$id");
        }
        debug!(schema = name, path = %path.display(), "loaded schema");
        Ok(schema)
    }
}

fn compile(name: &str, schema: Value) -> Result<Validator> {
    jsonschema::validator_for(&schema).map_err(|err| Error::SchemaCompile {
        name: name.to_string(),
        message: err.to_string(),
    })
}

/// Fields every item must carry regardless of schema.
const ITEM_REQUIRED: [&str; 3] = ["stac_version", "id", "links"];
const CATALOG_REQUIRED: [&str; 4] = ["stac_version", "id", "links", "description"];

fn missing<'a>(document: &'a Value, fields: &'a [&'static str]) -> impl Iterator<Item = &'static str> + 'a {
    fields
        .iter()
        .copied()
        .filter(move |field| document.get(*field).map_or(true, Value::is_null))
}

/// Cheap structural check for a document without a schema round trip.
/// Catalogs and collections additionally need a `description`; feature
/// collections are checked feature by feature. Returns the missing fields.
pub fn missing_required_fields(document: &Value) -> Vec<String> {
    match document.get("type").and_then(Value::as_str) {
        Some("FeatureCollection") => document
            .get("features")
            .and_then(Value::as_array)
            .into_iter()
            .flatten()
            .enumerate()
            .flat_map(|(index, feature)| {
                missing(feature, &ITEM_REQUIRED).map(move |field| format!("features[{index}].{field}"))
            })
            .collect(),
        Some("Catalog") | Some("Collection") => missing(document, &CATALOG_REQUIRED)
            .map(str::to_string)
            .collect(),
        _ => missing(document, &ITEM_REQUIRED).map(str::to_string).collect(),
    }
}
