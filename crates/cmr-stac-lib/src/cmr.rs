//! Upstream CMR search client.
//!
//! URLs are assembled by [`UrlBuilder`] from a [`CmrEndpoint`]. The same
//! logical CMR deployment is reachable under a public address (embedded in
//! emitted documents) and an internal one (used for the gateway's own calls);
//! [`AddressMode`] picks between them.

use std::time::Duration;

use reqwest::blocking::Client;
use serde_json::Value;
use tracing::{debug, info};
use url::{form_urlencoded, Url};

use crate::convert::Params;
use crate::error::{Error, Result};
use crate::settings::Settings;

const CLIENT_ID_HEADER: &str = "Client-Id";
const HITS_HEADER: &str = "CMR-Hits";
pub const COLLECTIONS_PATH: &str = "/collections.json";
pub const GRANULES_PATH: &str = "/granules.json";
/// Provider listing, served by ingest next to the search root.
const PROVIDERS_PATH: &str = "/ingest/providers";
const PROVIDER_ID_KEY: &str = "provider-id";
const DEFAULT_PROTOCOL: &str = "http";

/// Protocol, host and root path of one CMR search address.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CmrEndpoint {
    pub protocol: String,
    /// Host name, optionally with `:port`.
    pub host: String,
    pub root_path: String,
}

impl CmrEndpoint {
    /// Split a base URL such as `https://cmr.earthdata.nasa.gov/search` into
    /// its parts.
    pub fn parse(base_url: &str) -> Result<Self> {
        let url = Url::parse(base_url)?;
        let host = url
            .host_str()
            .ok_or_else(|| Error::MissingParameter {
                name: "host".to_string(),
            })?;
        let host = match url.port() {
            Some(port) => format!("{host}:{port}"),
            None => host.to_string(),
        };
        Ok(Self {
            protocol: url.scheme().to_string(),
            host,
            root_path: url.path().trim_end_matches('/').to_string(),
        })
    }
}

/// Which of the two CMR addresses to use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AddressMode {
    /// Address published to clients in links.
    #[default]
    Public,
    /// Load-balancer address used for upstream calls.
    Internal,
}

/// Builder for fully qualified CMR URLs.
#[derive(Debug, Clone, Default)]
pub struct UrlBuilder {
    protocol: Option<String>,
    host: Option<String>,
    root_path: String,
    path: String,
    query: Vec<(String, String)>,
}

impl UrlBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start from the protocol, host and root path of `endpoint`.
    pub fn for_endpoint(endpoint: &CmrEndpoint) -> Self {
        Self::new()
            .with_protocol(&endpoint.protocol)
            .with_host(&endpoint.host)
            .with_root_path(&endpoint.root_path)
    }

    /// An empty protocol falls back to `http`.
    pub fn with_protocol(mut self, protocol: &str) -> Self {
        self.protocol = (!protocol.is_empty()).then(|| protocol.to_string());
        self
    }

    pub fn with_host(mut self, host: &str) -> Self {
        self.host = (!host.is_empty()).then(|| host.to_string());
        self
    }

    pub fn with_root_path(mut self, root_path: &str) -> Self {
        self.root_path = root_path.to_string();
        self
    }

    /// Resource path; a leading `/` is added when missing.
    pub fn with_path(mut self, path: &str) -> Self {
        self.path = if path.is_empty() || path.starts_with('/') {
            path.to_string()
        } else {
            format!("/{path}")
        };
        self
    }

    pub fn with_query(mut self, params: &Params) -> Self {
        self.query.extend(query_pairs(params));
        self
    }

    pub fn build(&self) -> Result<String> {
        let host = self.host.as_deref().ok_or_else(|| Error::MissingParameter {
            name: "host".to_string(),
        })?;
        let protocol = self.protocol.as_deref().unwrap_or(DEFAULT_PROTOCOL);
        let base = format!("{protocol}://{host}{}{}", self.root_path, self.path);
        if self.query.is_empty() {
            return Ok(base);
        }
        Ok(format!("{base}?{}", encode_pairs(&self.query)))
    }
}

fn encode_pairs(pairs: &[(String, String)]) -> String {
    form_urlencoded::Serializer::new(String::new())
        .extend_pairs(pairs.iter())
        .finish()
}

/// Flatten parameters into query pairs in CMR's convention: arrays become
/// repeated `key[]` pairs, nulls are skipped, scalars are rendered bare.
pub fn query_pairs(params: &Params) -> Vec<(String, String)> {
    let mut pairs = Vec::new();
    for (key, value) in params {
        match value {
            Value::Null => {}
            Value::Array(items) => {
                let key = format!("{key}[]");
                pairs.extend(
                    items
                        .iter()
                        .filter_map(scalar_to_string)
                        .map(|item| (key.clone(), item)),
                );
            }
            other => {
                if let Some(item) = scalar_to_string(other) {
                    pairs.push((key.clone(), item));
                }
            }
        }
    }
    pairs
}

fn scalar_to_string(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}

/// Build a CMR search URL for `path` against the public or internal address.
pub fn make_search_url(
    settings: &Settings,
    mode: AddressMode,
    path: &str,
    params: Option<&Params>,
) -> Result<String> {
    let mut builder = UrlBuilder::for_endpoint(settings.cmr_endpoint(mode)).with_path(path);
    if let Some(params) = params {
        builder = builder.with_query(params);
    }
    builder.build()
}

/// Entries of a CMR JSON feed together with the total hit count.
#[derive(Debug, Clone, PartialEq)]
pub struct CmrSearchResponse {
    pub entries: Vec<Value>,
    /// Total matches reported by CMR; falls back to the number of entries
    /// when the hits header is absent.
    pub hits: u64,
}

/// Blocking client for the CMR search API.
#[derive(Debug, Clone)]
pub struct CmrClient {
    http: Client,
    endpoint: CmrEndpoint,
    client_id: String,
}

impl CmrClient {
    /// Client against the internal CMR address from `settings`.
    pub fn new(settings: &Settings) -> Result<Self> {
        Self::with_endpoint(
            settings.cmr_endpoint(AddressMode::Internal).clone(),
            settings.client_id.clone(),
        )
    }

    pub fn with_endpoint(endpoint: CmrEndpoint, client_id: impl Into<String>) -> Result<Self> {
        Ok(Self {
            http: build_client()?,
            endpoint,
            client_id: client_id.into(),
        })
    }

    pub fn endpoint(&self) -> &CmrEndpoint {
        &self.endpoint
    }

    /// Run a search against `path` with `params`.
    ///
    /// Both arguments are mandatory: an empty path or absent parameter map is
    /// rejected before any request is made.
    pub fn search(&self, path: &str, params: Option<&Params>) -> Result<CmrSearchResponse> {
        if path.is_empty() {
            return Err(Error::MissingParameter {
                name: "path".to_string(),
            });
        }
        let params = params.ok_or_else(|| Error::MissingParameter {
            name: "params".to_string(),
        })?;

        let url = UrlBuilder::for_endpoint(&self.endpoint)
            .with_path(path)
            .with_query(params)
            .build()?;
        debug!(%url, "CMR search");

        let response = self
            .http
            .get(&url)
            .header(CLIENT_ID_HEADER, &self.client_id)
            .send()?;

        let status = response.status();
        if !status.is_success() {
            return Err(Error::UpstreamStatus {
                status: status.as_u16(),
                url,
            });
        }

        let hits = response
            .headers()
            .get(HITS_HEADER)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.trim().parse::<u64>().ok());

        let body: Value = response.json()?;
        let entries = match body.pointer("/feed/entry") {
            Some(Value::Array(entries)) => entries.clone(),
            _ => return Err(Error::UnexpectedResponse { url }),
        };
        let hits = hits.unwrap_or(entries.len() as u64);
        info!(path, returned = entries.len(), hits, "CMR search complete");

        Ok(CmrSearchResponse { entries, hits })
    }

    /// Collection search restricted to collections with downloadable granules.
    pub fn find_collections(&self, params: &Params) -> Result<CmrSearchResponse> {
        let mut params = params.clone();
        params.insert("has_granules".to_string(), Value::Bool(true));
        params.insert("downloadable".to_string(), Value::Bool(true));
        self.search(COLLECTIONS_PATH, Some(&params))
    }

    pub fn find_granules(&self, params: &Params) -> Result<CmrSearchResponse> {
        self.search(GRANULES_PATH, Some(params))
    }

    /// Ids of every provider registered with CMR, in CMR's order.
    pub fn providers(&self) -> Result<Vec<String>> {
        let url = UrlBuilder::for_endpoint(&self.endpoint)
            .with_root_path("")
            .with_path(PROVIDERS_PATH)
            .build()?;
        debug!(%url, "CMR provider list");

        let response = self
            .http
            .get(&url)
            .header(CLIENT_ID_HEADER, &self.client_id)
            .send()?;
        let status = response.status();
        if !status.is_success() {
            return Err(Error::UpstreamStatus {
                status: status.as_u16(),
                url,
            });
        }

        let body: Value = response.json()?;
        let Value::Array(entries) = body else {
            return Err(Error::UnexpectedResponse { url });
        };
        let providers: Vec<String> = entries
            .iter()
            .filter_map(|entry| match entry {
                Value::String(id) => Some(id.clone()),
                other => other.get(PROVIDER_ID_KEY).and_then(Value::as_str).map(str::to_string),
            })
            .collect();
        info!(count = providers.len(), "CMR provider list complete");
        Ok(providers)
    }

    /// Look up one collection by concept id. `None` when CMR has no match.
    pub fn get_collection(&self, concept_id: &str) -> Result<Option<Value>> {
        let mut params = Params::new();
        params.insert("concept_id".to_string(), Value::from(concept_id));
        let response = self.find_collections(&params)?;
        Ok(response.entries.into_iter().next())
    }
}

fn build_client() -> Result<Client> {
    Client::builder()
        .timeout(Duration::from_secs(30))
        .user_agent(user_agent())
        .build()
        .map_err(Error::Http)
}

fn user_agent() -> String {
    format!("cmr-stac-lib/{}", env!("CARGO_PKG_VERSION"))
}
