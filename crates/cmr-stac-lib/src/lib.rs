//! CMR-STAC library entry points.
//!
//! This crate translates STAC and WFS style queries into CMR search
//! parameters, runs them against CMR, and turns the CMR JSON feed back into
//! STAC catalogs, collections, and items. Front ends (the CLI, future HTTP
//! handlers) should only depend on the functions exported here instead of
//! reimplementing the translation rules.
//!

#![deny(warnings)]

pub mod cmr;
pub mod convert;
pub mod error;
pub mod extension;
pub mod search;
pub mod settings;
pub mod stac;
pub mod validator;

pub use cmr::{AddressMode, CmrClient, CmrEndpoint, CmrSearchResponse, UrlBuilder};
pub use convert::{convert_params, try_convert_params, Params, Vocabulary};
pub use error::{Error, Result};
pub use extension::{
    ContextInput, Extension, ExtensionPipeline, FieldsSelection, FormatOptions,
};
pub use search::{ProviderCollections, SearchService, Translation};
pub use settings::Settings;
pub use stac::{create_provider_catalog, create_root_catalog, Catalog, Link, Relation};
pub use validator::{SchemaName, SchemaValidatorCache, SchemaViolation};
