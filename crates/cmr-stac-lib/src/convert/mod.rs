//! Conversions between the STAC/WFS and CMR vocabularies.
//!
//! `params` holds the inbound parameter maps; `granules` and `collections`
//! turn CMR feed entries back into STAC documents.

pub mod bounding_box;
pub mod collections;
pub mod datetime;
pub mod granules;
pub mod params;

pub use collections::{
    cmr_collection_to_stac_id, collection_to_stac, is_collection_concept_id,
    stac_collection_to_cmr_params,
};
pub use granules::{granule_to_item, granules_to_feature_collection, ResultPage};
pub use params::{
    convert_params, encode_stac_query, try_convert_params, ConversionMap, ParamRule, Params,
    Vocabulary, STAC_QUERY_MAP, STAC_SEARCH_MAP, WFS_QUERY_MAP,
};
