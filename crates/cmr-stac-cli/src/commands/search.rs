//! Item search against CMR.

use anyhow::{Context, Result};

use cmr_stac_lib::{Params, SearchService, Settings, Vocabulary};

use crate::output::print_json;

/// Handle the search subcommand: run the full pipeline and print the
/// resulting `FeatureCollection`.
pub fn handle_search(
    settings: Settings,
    provider: &str,
    vocabulary: Vocabulary,
    params: &Params,
    validate: bool,
) -> Result<()> {
    let service = SearchService::new(settings).context("failed to set up the search service")?;
    let document = service
        .search_items(provider, vocabulary, params, validate)
        .with_context(|| format!("item search for provider {provider} failed"))?;
    print_json(&document)
}
