//! Provider collection listing.

use anyhow::{Context, Result};

use cmr_stac_lib::{Params, SearchService, Settings};

use crate::output::print_json;

/// Handle the collections subcommand. Prints the provider catalog with its
/// collections embedded.
pub fn handle_collections(
    settings: Settings,
    provider: &str,
    params: &Params,
    validate: bool,
) -> Result<()> {
    let service = SearchService::new(settings).context("failed to set up the search service")?;
    let collections = service
        .provider_collections(provider, params, validate)
        .with_context(|| format!("collection search for provider {provider} failed"))?;
    print_json(&collections.to_value()?)
}
