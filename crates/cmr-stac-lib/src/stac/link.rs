use std::fmt;

use serde::{Deserialize, Serialize};

/// Default media type for every link the gateway emits.
pub const MEDIA_TYPE_JSON: &str = "application/json";

/// Relation of a link to the document that carries it.
///
/// The set is closed: STAC relations the gateway does not produce are not
/// representable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Relation {
    #[serde(rename = "self")]
    SelfLink,
    Root,
    Parent,
    Child,
    Item,
    Next,
}

impl Relation {
    pub fn as_str(self) -> &'static str {
        match self {
            Relation::SelfLink => "self",
            Relation::Root => "root",
            Relation::Parent => "parent",
            Relation::Child => "child",
            Relation::Item => "item",
            Relation::Next => "next",
        }
    }
}

impl fmt::Display for Relation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single hypermedia link. Immutable once built.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Link {
    rel: Relation,
    title: String,
    href: String,
    #[serde(rename = "type")]
    media_type: String,
}

impl Link {
    fn new(rel: Relation, title: impl Into<String>, href: impl Into<String>) -> Self {
        Self {
            rel,
            title: title.into(),
            href: href.into(),
            media_type: MEDIA_TYPE_JSON.to_string(),
        }
    }

    pub fn root(title: impl Into<String>, href: impl Into<String>) -> Self {
        Self::new(Relation::Root, title, href)
    }

    /// Build a `self` link.
    ///
    /// A trailing bare `?` (left behind when a base path is concatenated with
    /// an empty query string) is stripped. No other constructor does this.
    pub fn self_link(title: impl Into<String>, href: impl Into<String>) -> Self {
        let mut href = href.into();
        if href.ends_with('?') {
            href.pop();
        }
        Self::new(Relation::SelfLink, title, href)
    }

    pub fn parent(title: impl Into<String>, href: impl Into<String>) -> Self {
        Self::new(Relation::Parent, title, href)
    }

    pub fn child(title: impl Into<String>, href: impl Into<String>) -> Self {
        Self::new(Relation::Child, title, href)
    }

    pub fn item(title: impl Into<String>, href: impl Into<String>) -> Self {
        Self::new(Relation::Item, title, href)
    }

    pub fn next(title: impl Into<String>, href: impl Into<String>) -> Self {
        Self::new(Relation::Next, title, href)
    }

    /// Return a copy of this link advertising a different media type.
    pub fn with_media_type(self, media_type: impl Into<String>) -> Self {
        Self {
            media_type: media_type.into(),
            ..self
        }
    }

    pub fn rel(&self) -> Relation {
        self.rel
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn href(&self) -> &str {
        &self.href
    }

    pub fn media_type(&self) -> &str {
        &self.media_type
    }
}
