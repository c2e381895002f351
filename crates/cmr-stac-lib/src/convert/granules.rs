//! CMR granule entries to STAC items.
//!
//! CMR spatial strings are latitude-first (`lat lon lat lon ...`); GeoJSON and
//! STAC are longitude-first, so every position is swapped on the way through.

use serde_json::{json, Map, Value};
use tracing::debug;

use crate::cmr::{make_search_url, AddressMode};
use crate::convert::bounding_box::{
    add_points_to_bbox, merge_boxes, parse_ordinate_string, reorder_box, BoundingBox,
};
use crate::error::{Error, Result};
use crate::settings::Settings;
use crate::stac::{Catalog, DocumentKind, Link};

pub const DATA_REL: &str = "http://esipfed.org/ns/fedsearch/1.1/data#";
pub const BROWSE_REL: &str = "http://esipfed.org/ns/fedsearch/1.1/browse#";
pub const DOC_REL: &str = "http://esipfed.org/ns/fedsearch/1.1/documentation#";

const NEXT_TITLE: &str = "Next page of results";

type Position = [f64; 2];

fn entry_id(entry: &Value) -> &str {
    entry.get("id").and_then(Value::as_str).unwrap_or_default()
}

fn strings<'a>(entry: &'a Value, key: &str) -> impl Iterator<Item = &'a str> {
    entry
        .get(key)
        .and_then(Value::as_array)
        .into_iter()
        .flatten()
        .filter_map(Value::as_str)
}

/// Parse a latitude-first CMR ordinate string into `[lon, lat]` positions.
fn positions(entry: &Value, raw: &str) -> Result<Vec<Position>> {
    let ordinates = parse_ordinate_string(raw).map_err(|_| Error::UnknownSpatial {
        id: entry_id(entry).to_string(),
    })?;
    Ok(ordinates
        .chunks_exact(2)
        .map(|pair| [pair[1], pair[0]])
        .collect())
}

/// Parse a CMR `s w n e` box string.
fn cmr_box(entry: &Value, raw: &str) -> Result<BoundingBox> {
    let ordinates = parse_ordinate_string(raw).map_err(|_| Error::UnknownSpatial {
        id: entry_id(entry).to_string(),
    })?;
    match ordinates.as_slice() {
        [s, w, n, e] => Ok([*s, *w, *n, *e]),
        _ => Err(Error::UnknownSpatial {
            id: entry_id(entry).to_string(),
        }),
    }
}

fn polygon_rings(entry: &Value, polygon: &Value) -> Result<Vec<Vec<Position>>> {
    polygon
        .as_array()
        .into_iter()
        .flatten()
        .filter_map(Value::as_str)
        .map(|ring| positions(entry, ring))
        .collect()
}

fn box_to_polygon([s, w, n, e]: BoundingBox) -> Value {
    json!({
        "type": "Polygon",
        "coordinates": [[[w, s], [e, s], [e, n], [w, n], [w, s]]]
    })
}

/// GeoJSON geometry of a CMR entry's `polygons`, `boxes`, `points` and
/// `lines`. Several shapes become a `GeometryCollection` (lines alone a
/// `MultiLineString`); no shape at all is an error.
pub fn spatial_to_geometry(entry: &Value) -> Result<Value> {
    let mut geometries = Vec::new();

    if let Some(polygons) = entry.get("polygons").and_then(Value::as_array) {
        for polygon in polygons {
            geometries.push(json!({
                "type": "Polygon",
                "coordinates": polygon_rings(entry, polygon)?
            }));
        }
    }
    for raw in strings(entry, "boxes") {
        geometries.push(box_to_polygon(cmr_box(entry, raw)?));
    }
    for raw in strings(entry, "points") {
        if let Some(point) = positions(entry, raw)?.first() {
            geometries.push(json!({"type": "Point", "coordinates": point}));
        }
    }

    let lines = strings(entry, "lines")
        .map(|raw| positions(entry, raw))
        .collect::<Result<Vec<_>>>()?;
    match lines.len() {
        0 => {}
        1 if geometries.is_empty() => {
            return Ok(json!({"type": "LineString", "coordinates": lines[0]}));
        }
        _ if geometries.is_empty() => {
            return Ok(json!({"type": "MultiLineString", "coordinates": lines}));
        }
        _ => geometries.extend(
            lines
                .iter()
                .map(|line| json!({"type": "LineString", "coordinates": line})),
        ),
    }

    match geometries.len() {
        0 => Err(Error::UnknownSpatial {
            id: entry_id(entry).to_string(),
        }),
        1 => Ok(geometries.remove(0)),
        _ => Ok(json!({"type": "GeometryCollection", "geometries": geometries})),
    }
}

/// STAC `[w, s, e, n]` box covering every shape of a CMR entry, or `None`
/// when the entry has no spatial extent.
pub fn spatial_to_bbox(entry: &Value) -> Result<Option<BoundingBox>> {
    let mut bbox = None;

    if let Some(polygons) = entry.get("polygons").and_then(Value::as_array) {
        for polygon in polygons {
            if let Some(outer) = polygon_rings(entry, polygon)?.first() {
                bbox = add_points_to_bbox(bbox, outer);
            }
        }
    }
    for raw in strings(entry, "points").chain(strings(entry, "lines")) {
        bbox = add_points_to_bbox(bbox, &positions(entry, raw)?);
    }
    for raw in strings(entry, "boxes") {
        bbox = Some(merge_boxes(bbox, reorder_box(cmr_box(entry, raw)?)));
    }

    Ok(bbox)
}

fn link_to_asset(link: &Value) -> Value {
    let mut asset = Map::new();
    if let Some(title) = link.get("title") {
        asset.insert("title".to_string(), title.clone());
    }
    for key in ["href", "type"] {
        if let Some(value) = link.get(key) {
            asset.insert(key.to_string(), value.clone());
        }
    }
    Value::Object(asset)
}

fn browse_media_type(href: &str) -> &'static str {
    match href.rsplit('.').next().unwrap_or_default() {
        "png" => "image/png",
        "tif" | "tiff" => "image/tiff",
        "raw" => "image/raw",
        _ => "image/jpeg",
    }
}

fn first_link<'a>(links: &'a [Value], predicate: impl Fn(&Value) -> bool) -> Option<&'a Value> {
    links.iter().find(|link| predicate(link))
}

fn is_inherited(link: &Value) -> bool {
    link.get("inherited").and_then(Value::as_bool).unwrap_or(false)
}

fn has_rel(link: &Value, rel: &str) -> bool {
    link.get("rel").and_then(Value::as_str) == Some(rel)
}

fn granule_assets(settings: &Settings, granule: &Value) -> Result<Map<String, Value>> {
    let links: &[Value] = granule
        .get("links")
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .unwrap_or_default();

    let mut assets = Map::new();
    if let Some(data) = first_link(links, |l| has_rel(l, DATA_REL) && !is_inherited(l)) {
        assets.insert("data".to_string(), link_to_asset(data));
    }
    if let Some(browse) = first_link(links, |l| has_rel(l, BROWSE_REL)) {
        let mut asset = link_to_asset(browse);
        let href = browse.get("href").and_then(Value::as_str).unwrap_or_default();
        asset["type"] = Value::from(browse_media_type(href));
        assets.insert("browse".to_string(), asset);
    }
    if let Some(opendap) = first_link(links, |l| {
        has_rel(l, DOC_REL)
            && !is_inherited(l)
            && l.get("href")
                .and_then(Value::as_str)
                .is_some_and(|href| href.contains("opendap"))
    }) {
        assets.insert("opendap".to_string(), link_to_asset(opendap));
    }

    let metadata = make_search_url(
        settings,
        AddressMode::Public,
        &format!("/concepts/{}.xml", entry_id(granule)),
        None,
    )?;
    assets.insert(
        "metadata".to_string(),
        json!({"href": metadata, "type": "application/xml"}),
    );
    Ok(assets)
}

/// Convert one CMR granule entry into a STAC item (`Feature`).
pub fn granule_to_item(settings: &Settings, provider: &str, granule: &Value) -> Result<Value> {
    let id = granule
        .get("id")
        .and_then(Value::as_str)
        .ok_or_else(|| Error::MissingParameter {
            name: "id".to_string(),
        })?;
    let collection = granule
        .get("collection_concept_id")
        .and_then(Value::as_str)
        .unwrap_or_default();

    let start = granule.get("time_start").cloned().unwrap_or(Value::Null);
    let end = granule
        .get("time_end")
        .filter(|end| !end.is_null())
        .cloned()
        .unwrap_or_else(|| start.clone());

    let base = &settings.stac_base_url;
    let collection_href = format!("{base}/{provider}/collections/{collection}");
    let links = vec![
        Link::self_link(id, format!("{collection_href}/items/{id}")),
        Link::parent(collection, collection_href.as_str()),
        Link::root("Root Catalog", base.as_str()),
    ];

    let bbox = spatial_to_bbox(granule)?;
    let mut item = json!({
        "type": "Feature",
        "stac_version": settings.stac_version,
        "id": id,
        "collection": collection,
        "geometry": spatial_to_geometry(granule)?,
        "properties": {
            "datetime": start,
            "start_datetime": start,
            "end_datetime": end,
        },
        "assets": granule_assets(settings, granule)?,
        "links": links,
    });
    if let Some(bbox) = bbox {
        item["bbox"] = json!(bbox);
    }
    Ok(item)
}

/// Paging information for an item search result.
#[derive(Debug, Clone, Default)]
pub struct ResultPage<'a> {
    /// Absolute href of the search resource, without a query string.
    pub path: &'a str,
    /// Encoded query string of the current request (may be empty).
    pub query: &'a str,
    /// Encoded query string of the next page, if there is one.
    pub next_query: Option<&'a str>,
}

/// Assemble a `FeatureCollection` of items for the granules of one search.
pub fn granules_to_feature_collection(
    settings: &Settings,
    provider: &str,
    granules: &[Value],
    page: &ResultPage<'_>,
) -> Result<Catalog> {
    let features = granules
        .iter()
        .map(|granule| granule_to_item(settings, provider, granule))
        .collect::<Result<Vec<_>>>()?;

    let mut collection = Catalog::new("", "", "", settings.stac_version.as_str())
        .with_kind(DocumentKind::FeatureCollection);
    collection.create_root(settings.stac_base_url.as_str());
    // `next` hangs off the bare path; self is then pinned to the full request.
    collection.create_self(page.path);
    if let Some(next_query) = page.next_query {
        collection.add_next(NEXT_TITLE, &format!("?{next_query}"))?;
    }
    collection.create_self(format!("{}?{}", page.path, page.query));

    debug!(provider, features = features.len(), "assembled feature collection");
    collection.insert("features", Value::Array(features));
    Ok(collection)
}
