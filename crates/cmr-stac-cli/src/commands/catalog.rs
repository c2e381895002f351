//! Root catalog rendering.

use anyhow::{Context, Result};
use serde_json::Value;

use cmr_stac_lib::{SearchService, Settings};

use crate::output::print_json;

/// Handle the catalog subcommand. Without explicit providers the list comes
/// from CMR.
pub fn handle_catalog(settings: Settings, providers: &[String]) -> Result<()> {
    let service = SearchService::new(settings).context("failed to set up the search service")?;
    let providers = if providers.is_empty() {
        service.providers().context("failed to list CMR providers")?
    } else {
        providers.to_vec()
    };
    print_json(&root_catalog_document(&service, &providers)?)
}

pub fn root_catalog_document(service: &SearchService, providers: &[String]) -> Result<Value> {
    let catalog = service.root_catalog(providers)?;
    Ok(catalog.to_value()?)
}
