//! STAC API extensions as a two-stage pipeline.
//!
//! `prepare` stages rewrite request parameters before they go upstream;
//! `format` stages rewrite the response document afterwards. Both stages run
//! sequentially in a fixed order. Context counts are captured from the
//! upstream result before any format stage runs, so field projection cannot
//! influence them.

pub mod context;
pub mod fields;
pub mod query;
pub mod sort;

use std::fmt;

use serde_json::Value;
use tracing::trace;

use crate::convert::Params;
use crate::error::Result;

pub use context::ContextInput;
pub use fields::FieldsSelection;

/// One STAC API extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Extension {
    Fields,
    Query,
    Sort,
    Context,
}

/// Order in which request parameters are prepared.
pub const PREPARE_ORDER: [Extension; 3] = [Extension::Fields, Extension::Query, Extension::Sort];

/// Order in which response documents are formatted.
pub const FORMAT_ORDER: [Extension; 2] = [Extension::Fields, Extension::Context];

impl Extension {
    pub fn name(self) -> &'static str {
        match self {
            Extension::Fields => "fields",
            Extension::Query => "query",
            Extension::Sort => "sort",
            Extension::Context => "context",
        }
    }

    pub fn has_prepare(self) -> bool {
        !matches!(self, Extension::Context)
    }

    pub fn has_format(self) -> bool {
        matches!(self, Extension::Fields | Extension::Context)
    }

    /// Run this extension's prepare stage. Extensions without one pass the
    /// parameters through.
    pub fn prepare(self, params: Params) -> Result<Params> {
        match self {
            Extension::Fields => Ok(fields::prepare(params)),
            Extension::Query => query::prepare(params),
            Extension::Sort => sort::prepare(params),
            Extension::Context => Ok(params),
        }
    }

    /// Run this extension's format stage. Extensions without one pass the
    /// document through.
    pub fn format(self, result: Value, options: &FormatOptions) -> Value {
        match self {
            Extension::Fields => fields::format(result, options.fields.as_ref()),
            Extension::Context => context::format(result, options.context.as_ref()),
            Extension::Query | Extension::Sort => result,
        }
    }
}

impl fmt::Display for Extension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Inputs for the format stage.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FormatOptions {
    pub fields: Option<FieldsSelection>,
    pub context: Option<ContextInput>,
}

/// Ordered extension registry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtensionPipeline {
    prepare_order: Vec<Extension>,
    format_order: Vec<Extension>,
}

impl Default for ExtensionPipeline {
    fn default() -> Self {
        Self::standard()
    }
}

impl ExtensionPipeline {
    /// Fields, query, sort on the way in; fields, context on the way out.
    pub fn standard() -> Self {
        Self {
            prepare_order: PREPARE_ORDER.to_vec(),
            format_order: FORMAT_ORDER.to_vec(),
        }
    }

    pub fn prepare_order(&self) -> &[Extension] {
        &self.prepare_order
    }

    pub fn format_order(&self) -> &[Extension] {
        &self.format_order
    }

    /// Prepare a copy of `params`; the caller's map is never modified.
    pub fn prepare(&self, params: &Params) -> Result<Params> {
        self.prepare_order
            .iter()
            .filter(|extension| extension.has_prepare())
            .try_fold(params.clone(), |params, extension| {
                trace!(extension = %extension, "prepare");
                extension.prepare(params)
            })
    }

    pub fn format(&self, result: Value, options: &FormatOptions) -> Value {
        self.format_order
            .iter()
            .filter(|extension| extension.has_format())
            .fold(result, |result, extension| {
                trace!(extension = %extension, "format");
                extension.format(result, options)
            })
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn registries_have_fixed_order() {
        let pipeline = ExtensionPipeline::default();
        assert_eq!(
            pipeline.prepare_order(),
            &[Extension::Fields, Extension::Query, Extension::Sort]
        );
        assert_eq!(pipeline.format_order(), &[Extension::Fields, Extension::Context]);
        assert!(!Extension::Context.has_prepare());
        assert!(!Extension::Sort.has_format());
    }

    #[test]
    fn prepare_does_not_mutate_input() {
        let params = json!({
            "fields": "id",
            "sortby": "-properties.datetime",
            "query": {"eo:cloud_cover": {"lt": 10}},
            "provider": "PROV"
        })
        .as_object()
        .cloned()
        .unwrap();
        let snapshot = params.clone();

        let prepared = ExtensionPipeline::standard().prepare(&params).unwrap();

        assert_eq!(params, snapshot);
        assert_eq!(
            prepared,
            json!({
                "provider": "PROV",
                "sort_key": ["-start_date"],
                "cloud_cover": ",10"
            })
            .as_object()
            .cloned()
            .unwrap()
        );
    }

    #[test]
    fn context_survives_field_projection() {
        let options = FormatOptions {
            fields: Some(FieldsSelection::parse("-id")),
            context: Some(ContextInput {
                returned: 1,
                limit: None,
                matched: 5,
            }),
        };
        let result = ExtensionPipeline::standard().format(
            json!({"type": "FeatureCollection", "features": [{"id": "G1", "type": "Feature"}]}),
            &options,
        );
        assert_eq!(result["features"][0], json!({"type": "Feature"}));
        assert_eq!(result["context"], json!({"returned": 1, "limit": null, "matched": 5}));
        assert_eq!(result["type"], "FeatureCollection");
    }
}
