//! STAC document building blocks: hypermedia links and the catalog assembler.

pub mod catalog;
pub mod link;

pub use catalog::{create_provider_catalog, create_root_catalog, Catalog, DocumentKind};
pub use link::{Link, Relation, MEDIA_TYPE_JSON};
