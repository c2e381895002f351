//! Translation of inbound parameters into the CMR request `search` would send.

use anyhow::{Context, Result};
use serde_json::{json, Value};

use cmr_stac_lib::cmr::{make_search_url, GRANULES_PATH};
use cmr_stac_lib::{AddressMode, Params, SearchService, Settings, Vocabulary};

use crate::output::print_json;

/// Handle the translate subcommand. CMR is only contacted to resolve STAC
/// collection ids for a provider.
pub fn handle_translate(
    settings: Settings,
    vocabulary: Vocabulary,
    params: &Params,
    provider: Option<&str>,
) -> Result<()> {
    let service = SearchService::new(settings).context("failed to set up the search service")?;
    let document = translate_document(&service, vocabulary, params, provider)?;
    print_json(&document)
}

/// CMR parameters and the internal granule search URL they would be sent to,
/// whatever the inbound vocabulary.
pub fn translate_document(
    service: &SearchService,
    vocabulary: Vocabulary,
    params: &Params,
    provider: Option<&str>,
) -> Result<Value> {
    let translation = service.translate(vocabulary, params, provider)?;
    let url = make_search_url(
        service.settings(),
        AddressMode::Internal,
        GRANULES_PATH,
        Some(&translation.cmr_params),
    )?;
    Ok(json!({
        "cmr_params": Value::Object(translation.cmr_params),
        "url": url,
    }))
}
