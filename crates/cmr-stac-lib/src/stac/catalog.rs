//! Request-scoped assembly of STAC catalog, collection and item-set documents.
//!
//! The assembler owns the link graph of a single document. `self` and `root`
//! are held as dedicated fields rather than searched for in the link list,
//! and setting either one replaces the previous value, so a document never
//! carries two of them. Child, item and next links are derived from the
//! `self`/`root` links *as they are when the derived link is added*: callers
//! must establish `self` and `root` first. Replacing `self` afterwards leaves
//! previously derived links pointing at the old location.

use serde::ser::{Serialize, SerializeMap, Serializer};
use serde_json::{Map, Value};
use tracing::debug;

use crate::error::{Error, Result};
use crate::stac::link::{Link, Relation};

const ROOT_TITLE: &str = "Root Catalog";
const PARENT_TITLE: &str = "Parent Catalog";

/// STAC `type` of the assembled document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentKind {
    Catalog,
    Collection,
    FeatureCollection,
}

impl DocumentKind {
    pub fn as_str(self) -> &'static str {
        match self {
            DocumentKind::Catalog => "Catalog",
            DocumentKind::Collection => "Collection",
            DocumentKind::FeatureCollection => "FeatureCollection",
        }
    }
}

/// A STAC document under construction.
#[derive(Debug, Clone)]
pub struct Catalog {
    pub id: String,
    pub title: String,
    pub description: String,
    pub stac_version: String,
    pub kind: DocumentKind,
    root: Option<Link>,
    self_link: Option<Link>,
    links: Vec<Link>,
    extra: Map<String, Value>,
}

impl Catalog {
    pub fn new(
        id: impl Into<String>,
        title: impl Into<String>,
        description: impl Into<String>,
        stac_version: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            description: description.into(),
            stac_version: stac_version.into(),
            kind: DocumentKind::Catalog,
            root: None,
            self_link: None,
            links: Vec::new(),
            extra: Map::new(),
        }
    }

    /// Change the STAC `type` emitted for this document.
    pub fn with_kind(mut self, kind: DocumentKind) -> Self {
        self.kind = kind;
        self
    }

    /// Set the `root` link, replacing any previous one.
    pub fn create_root(&mut self, href: impl Into<String>) {
        self.root = Some(Link::root(ROOT_TITLE, href));
    }

    /// Set the `self` link, replacing any previous one. The link is titled
    /// after the catalog.
    pub fn create_self(&mut self, href: impl Into<String>) {
        self.self_link = Some(Link::self_link(self.title.clone(), href));
    }

    pub fn create_parent(&mut self, href: impl Into<String>) {
        self.links.push(Link::parent(PARENT_TITLE, href));
    }

    /// Append a `child` link at `self + relative_url`.
    pub fn add_child(&mut self, title: impl Into<String>, relative_url: &str) -> Result<()> {
        let href = format!("{}{}", self.anchor(Relation::SelfLink)?, relative_url);
        self.links.push(Link::child(title, href));
        Ok(())
    }

    /// Append an `item` link at `root/provider/collections/collection/items/item`.
    pub fn add_item(
        &mut self,
        title: impl Into<String>,
        provider_id: &str,
        collection_id: &str,
        item_id: &str,
    ) -> Result<()> {
        let href = format!(
            "{}/{}/collections/{}/items/{}",
            self.anchor(Relation::Root)?,
            provider_id,
            collection_id,
            item_id
        );
        self.links.push(Link::item(title, href));
        Ok(())
    }

    /// Append a `next` link at `self + relative_url`, used for paging.
    pub fn add_next(&mut self, title: impl Into<String>, relative_url: &str) -> Result<()> {
        let href = format!("{}{}", self.anchor(Relation::SelfLink)?, relative_url);
        self.links.push(Link::next(title, href));
        Ok(())
    }

    /// Attach an additional top-level field (`license`, `extent`, `features`, ...).
    pub fn insert(&mut self, key: impl Into<String>, value: Value) {
        self.extra.insert(key.into(), value);
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.extra.get(key)
    }

    pub fn self_href(&self) -> Option<&str> {
        self.self_link.as_ref().map(Link::href)
    }

    pub fn root_href(&self) -> Option<&str> {
        self.root.as_ref().map(Link::href)
    }

    /// All links in document order: root, self, then everything else in
    /// insertion order.
    pub fn links(&self) -> impl Iterator<Item = &Link> {
        self.root
            .iter()
            .chain(self.self_link.iter())
            .chain(self.links.iter())
    }

    pub fn links_with(&self, rel: Relation) -> impl Iterator<Item = &Link> {
        self.links().filter(move |link| link.rel() == rel)
    }

    /// Serialize into a JSON document for the extension pipeline.
    pub fn to_value(&self) -> Result<Value> {
        Ok(serde_json::to_value(self)?)
    }

    fn anchor(&self, relation: Relation) -> Result<&str> {
        let link = match relation {
            Relation::Root => self.root.as_ref(),
            _ => self.self_link.as_ref(),
        };
        link.map(Link::href)
            .ok_or(Error::MissingLink { relation })
    }
}

impl Serialize for Catalog {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(None)?;
        map.serialize_entry("type", self.kind.as_str())?;
        if !self.id.is_empty() {
            map.serialize_entry("id", &self.id)?;
        }
        if !self.title.is_empty() {
            map.serialize_entry("title", &self.title)?;
        }
        if !self.description.is_empty() {
            map.serialize_entry("description", &self.description)?;
        }
        map.serialize_entry("stac_version", &self.stac_version)?;
        for (key, value) in &self.extra {
            map.serialize_entry(key, value)?;
        }
        let links: Vec<&Link> = self.links().collect();
        map.serialize_entry("links", &links)?;
        map.end()
    }
}

/// Root catalog of the gateway, rooted and self-addressed at `stac_base_url`.
pub fn create_root_catalog(stac_base_url: &str, stac_version: &str) -> Catalog {
    let mut catalog = Catalog::new(
        "root",
        "Root Catalog",
        "Generated root catalog for CMR.",
        stac_version,
    );
    catalog.create_root(stac_base_url);
    catalog.create_self(stac_base_url);
    debug!(href = stac_base_url, "created root catalog");
    catalog
}

/// Catalog listing the holdings of one CMR provider.
pub fn create_provider_catalog(stac_base_url: &str, provider_id: &str, stac_version: &str) -> Catalog {
    let mut catalog = Catalog::new(
        provider_id,
        provider_id,
        format!("Root catalog for {provider_id}"),
        stac_version,
    );
    catalog.create_root(stac_base_url);
    catalog.create_self(format!("{stac_base_url}/{provider_id}"));
    catalog.create_parent(stac_base_url);
    catalog
}
