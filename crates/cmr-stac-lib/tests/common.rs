use std::fs;
use std::path::PathBuf;

use cmr_stac_lib::{CmrClient, CmrEndpoint, SearchService, Settings};

pub fn fixtures_dir() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("../../docs/fixtures")
}

pub fn schemas_dir() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("../../docs/schemas")
}

pub fn cmr_fixture(name: &str) -> String {
    let path = fixtures_dir().join("cmr").join(name);
    fs::read_to_string(&path).expect("read CMR fixture")
}

/// Settings with the shipped schemas and a fixed gateway base URL.
pub fn test_settings(extra: &[(&str, &str)]) -> Settings {
    let schemas = schemas_dir().display().to_string();
    let mut vars: Vec<(String, String)> = vec![
        ("CMR_STAC_SCHEMA_DIR".to_string(), schemas),
        ("CMR_STAC_BASE_URL".to_string(), "https://gateway.test/stac".to_string()),
    ];
    vars.extend(extra.iter().map(|(k, v)| (k.to_string(), v.to_string())));
    Settings::from_lookup(|key| {
        vars.iter()
            .rev()
            .find(|(name, _)| name == key)
            .map(|(_, value)| value.clone())
    })
}

pub fn service_for(server: &mockito::Server, settings: Settings) -> SearchService {
    let endpoint = CmrEndpoint::parse(&server.url()).expect("mock server url parses");
    let client = CmrClient::with_endpoint(endpoint, settings.client_id.clone()).expect("client builds");
    SearchService::with_client(settings, client)
}
