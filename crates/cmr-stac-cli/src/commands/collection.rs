//! Single collection lookup by STAC id.

use anyhow::{anyhow, Context, Result};
use serde_json::Value;

use cmr_stac_lib::{SearchService, Settings};

use crate::output::print_json;

/// Handle the collection subcommand. A STAC id CMR does not know is an error.
pub fn handle_collection(settings: Settings, provider: &str, stac_id: &str) -> Result<()> {
    let service = SearchService::new(settings).context("failed to set up the search service")?;
    print_json(&collection_document(&service, provider, stac_id)?)
}

pub fn collection_document(service: &SearchService, provider: &str, stac_id: &str) -> Result<Value> {
    let collection = service
        .collection(provider, stac_id)
        .with_context(|| format!("collection lookup for provider {provider} failed"))?
        .ok_or_else(|| anyhow!("collection {stac_id} not found for provider {provider}"))?;
    Ok(collection.to_value()?)
}
