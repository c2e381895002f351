//! CMR collection entries to STAC collections.

use serde_json::{json, Value};

use crate::convert::bounding_box::WHOLE_WORLD_BBOX;
use crate::convert::granules::spatial_to_bbox;
use crate::convert::Params;
use crate::error::Result;
use crate::settings::Settings;
use crate::stac::{Catalog, DocumentKind};

const INVALID_VERSIONS: [&str; 2] = ["Not provided", "NA"];
const VERSION_SEPARATOR: &str = ".v";
const DEFAULT_LICENSE: &str = "not-provided";

/// STAC collection id for a CMR short name and version: `short.vVERSION`, or
/// the bare short name when the version is absent or a placeholder.
pub fn cmr_collection_to_stac_id(short_name: &str, version: Option<&str>) -> String {
    match version {
        Some(version) if !version.is_empty() && !INVALID_VERSIONS.contains(&version) => {
            format!("{short_name}{VERSION_SEPARATOR}{version}")
        }
        _ => short_name.to_string(),
    }
}

/// CMR search parameters identifying the collection behind a STAC id.
///
/// The id is split at its last `.v`; short names containing `.v` themselves
/// keep it.
pub fn stac_collection_to_cmr_params(provider_id: &str, stac_id: &str) -> Params {
    let mut params = Params::new();
    params.insert("provider_id".to_string(), Value::from(provider_id));
    match stac_id.rsplit_once(VERSION_SEPARATOR) {
        Some((short_name, version)) => {
            params.insert("short_name".to_string(), Value::from(short_name));
            params.insert("version".to_string(), Value::from(version));
        }
        None => {
            params.insert("short_name".to_string(), Value::from(stac_id));
        }
    }
    params
}

/// Whether `id` already is a CMR collection concept id (`C1234-PROVIDER`).
pub fn is_collection_concept_id(id: &str) -> bool {
    let Some((head, provider)) = id.split_once('-') else {
        return false;
    };
    match head.strip_prefix('C') {
        Some(digits) => {
            !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit()) && !provider.is_empty()
        }
        None => false,
    }
}

/// STAC `extent` of a CMR collection. Collections without spatial metadata
/// cover the whole world.
pub fn collection_extent(entry: &Value) -> Result<Value> {
    let bbox = spatial_to_bbox(entry)?.unwrap_or(WHOLE_WORLD_BBOX);
    let start = entry.get("time_start").cloned().unwrap_or(Value::Null);
    let end = entry.get("time_end").cloned().unwrap_or(Value::Null);
    Ok(json!({
        "spatial": {"bbox": [bbox]},
        "temporal": {"interval": [[start, end]]}
    }))
}

fn text<'a>(entry: &'a Value, key: &str) -> &'a str {
    entry.get(key).and_then(Value::as_str).unwrap_or_default()
}

/// Convert one CMR collection entry into a STAC collection document.
pub fn collection_to_stac(settings: &Settings, provider: &str, entry: &Value) -> Result<Catalog> {
    let stac_id = cmr_collection_to_stac_id(
        text(entry, "short_name"),
        entry.get("version_id").and_then(Value::as_str),
    );
    let base = settings.stac_base_url.as_str();

    let mut collection = Catalog::new(
        stac_id.as_str(),
        text(entry, "dataset_id"),
        text(entry, "summary"),
        settings.stac_version.as_str(),
    )
    .with_kind(DocumentKind::Collection);
    collection.create_root(base);
    collection.create_self(format!("{base}/{provider}/collections/{stac_id}"));
    collection.create_parent(format!("{base}/{provider}"));
    collection.add_child("Granules in this collection", "/items")?;

    let license = entry
        .get("license")
        .and_then(Value::as_str)
        .unwrap_or(DEFAULT_LICENSE);
    collection.insert("license", Value::from(license));
    collection.insert("extent", collection_extent(entry)?);
    Ok(collection)
}

#[cfg(test)]
mod tests {
    use crate::stac::Relation;

    use super::*;

    #[test]
    fn stac_id_skips_placeholder_versions() {
        assert_eq!(cmr_collection_to_stac_id("MOD09", Some("006")), "MOD09.v006");
        assert_eq!(cmr_collection_to_stac_id("MOD09", Some("Not provided")), "MOD09");
        assert_eq!(cmr_collection_to_stac_id("MOD09", Some("NA")), "MOD09");
        assert_eq!(cmr_collection_to_stac_id("MOD09", None), "MOD09");
    }

    #[test]
    fn stac_id_splits_back_into_cmr_params() {
        let params = stac_collection_to_cmr_params("LPDAAC", "MOD09.v006");
        assert_eq!(params["provider_id"], "LPDAAC");
        assert_eq!(params["short_name"], "MOD09");
        assert_eq!(params["version"], "006");

        let params = stac_collection_to_cmr_params("LPDAAC", "a.very.long.v2");
        assert_eq!(params["short_name"], "a.very.long");
        assert_eq!(params["version"], "2");

        let params = stac_collection_to_cmr_params("LPDAAC", "NOVERSION");
        assert_eq!(params["short_name"], "NOVERSION");
        assert!(params.get("version").is_none());
    }

    #[test]
    fn concept_ids_are_told_apart_from_stac_ids() {
        assert!(is_collection_concept_id("C1379757686-USGS_EROS"));
        assert!(!is_collection_concept_id("MOD09GA.v006"));
        assert!(!is_collection_concept_id("Landsat-8.v1"));
        assert!(!is_collection_concept_id("C-PROV"));
        assert!(!is_collection_concept_id("C12-"));
    }

    #[test]
    fn extent_defaults_to_whole_world() {
        let extent = collection_extent(&json!({"time_start": "2000-01-01T00:00:00Z"})).unwrap();
        assert_eq!(extent["spatial"]["bbox"], json!([[-180.0, -90.0, 180.0, 90.0]]));
        assert_eq!(
            extent["temporal"]["interval"],
            json!([["2000-01-01T00:00:00Z", null]])
        );
    }

    #[test]
    fn collection_document_has_links_and_extent() {
        let settings = Settings::default();
        let entry = json!({
            "id": "C1-PROV",
            "short_name": "MOD09",
            "version_id": "006",
            "dataset_id": "MODIS Surface Reflectance",
            "summary": "Daily reflectance",
            "boxes": ["-90 -180 90 180"],
            "time_start": "2000-02-24T00:00:00.000Z"
        });
        let collection = collection_to_stac(&settings, "PROV", &entry).unwrap();

        assert_eq!(collection.id, "MOD09.v006");
        assert_eq!(
            collection.self_href(),
            Some("http://localhost:3000/stac/PROV/collections/MOD09.v006")
        );
        let items = collection.links_with(Relation::Child).next().unwrap();
        assert_eq!(
            items.href(),
            "http://localhost:3000/stac/PROV/collections/MOD09.v006/items"
        );
        let parent = collection.links_with(Relation::Parent).next().unwrap();
        assert_eq!(parent.href(), "http://localhost:3000/stac/PROV");

        let json = collection.to_value().unwrap();
        assert_eq!(json["type"], "Collection");
        assert_eq!(json["license"], "not-provided");
        assert_eq!(json["title"], "MODIS Surface Reflectance");
        assert_eq!(json["extent"]["spatial"]["bbox"][0], json!([-180.0, -90.0, 180.0, 90.0]));
    }
}
