//! Runtime configuration resolved from environment variables.
//!
//! CMR is reachable under two addresses: the public one, used for links
//! embedded in emitted documents, and an internal (load balancer) one used
//! for the gateway's own upstream calls. Each part of either address can be
//! overridden independently; unset internal parts fall back to the public
//! ones.

use std::env;
use std::path::PathBuf;

use tracing::warn;

use crate::cmr::{AddressMode, CmrEndpoint};

pub const CMR_PUBLIC_PROTOCOL_ENV: &str = "CMR_PUBLIC_PROTOCOL";
pub const CMR_PUBLIC_HOST_ENV: &str = "CMR_PUBLIC_HOST";
pub const CMR_PUBLIC_ROOT_ENV: &str = "CMR_PUBLIC_ROOT";
pub const CMR_LB_PROTOCOL_ENV: &str = "CMR_LB_PROTOCOL";
pub const CMR_LB_HOST_ENV: &str = "CMR_LB_HOST";
pub const CMR_LB_ROOT_ENV: &str = "CMR_LB_ROOT";
pub const STAC_BASE_URL_ENV: &str = "CMR_STAC_BASE_URL";
pub const STAC_VERSION_ENV: &str = "STAC_VERSION";
pub const MAX_LIMIT_ENV: &str = "CMR_STAC_MAX_LIMIT";
pub const CLIENT_ID_ENV: &str = "CMR_STAC_CLIENT_ID";
pub const SCHEMA_DIR_ENV: &str = "CMR_STAC_SCHEMA_DIR";
pub const THROW_CONVERT_ERRORS_ENV: &str = "THROW_CMR_CONVERT_PARAM_ERRORS";
pub const INVALID_RESPONSE_IS_ERROR_ENV: &str = "INVALID_RESPONSE_IS_ERROR";

const DEFAULT_PROTOCOL: &str = "https";
const DEFAULT_HOST: &str = "cmr.earthdata.nasa.gov";
const DEFAULT_ROOT: &str = "/search";
const DEFAULT_STAC_BASE_URL: &str = "http://localhost:3000/stac";
const DEFAULT_STAC_VERSION: &str = "1.0.0";
const DEFAULT_MAX_LIMIT: u64 = 250;
const DEFAULT_CLIENT_ID: &str = "cmr-stac-api-proxy";
const DEFAULT_SCHEMA_DIR: &str = "docs/schemas";

/// Resolved gateway configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub cmr_public: CmrEndpoint,
    pub cmr_internal: CmrEndpoint,
    pub stac_base_url: String,
    pub stac_version: String,
    pub max_limit: u64,
    pub client_id: String,
    pub schema_dir: PathBuf,
    /// Propagate parameter conversion failures instead of failing soft.
    pub throw_convert_param_errors: bool,
    /// Treat a schema-invalid emitted document as an error.
    pub invalid_response_is_error: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self::from_lookup(|_| None)
    }
}

impl Settings {
    /// Resolve settings from the process environment.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Resolve settings from an arbitrary lookup. Tests use this to avoid
    /// mutating the process environment.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let cmr_public = CmrEndpoint {
            protocol: lookup(CMR_PUBLIC_PROTOCOL_ENV).unwrap_or_else(|| DEFAULT_PROTOCOL.into()),
            host: lookup(CMR_PUBLIC_HOST_ENV).unwrap_or_else(|| DEFAULT_HOST.into()),
            root_path: lookup(CMR_PUBLIC_ROOT_ENV).unwrap_or_else(|| DEFAULT_ROOT.into()),
        };
        let cmr_internal = CmrEndpoint {
            protocol: lookup(CMR_LB_PROTOCOL_ENV).unwrap_or_else(|| cmr_public.protocol.clone()),
            host: lookup(CMR_LB_HOST_ENV).unwrap_or_else(|| cmr_public.host.clone()),
            root_path: lookup(CMR_LB_ROOT_ENV).unwrap_or_else(|| cmr_public.root_path.clone()),
        };

        let stac_base_url = lookup(STAC_BASE_URL_ENV)
            .map(|url| url.trim_end_matches('/').to_string())
            .unwrap_or_else(|| DEFAULT_STAC_BASE_URL.into());

        Self {
            cmr_public,
            cmr_internal,
            stac_base_url,
            stac_version: lookup(STAC_VERSION_ENV).unwrap_or_else(|| DEFAULT_STAC_VERSION.into()),
            max_limit: parse_max_limit(lookup(MAX_LIMIT_ENV)),
            client_id: lookup(CLIENT_ID_ENV).unwrap_or_else(|| DEFAULT_CLIENT_ID.into()),
            schema_dir: lookup(SCHEMA_DIR_ENV)
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_SCHEMA_DIR)),
            throw_convert_param_errors: is_true(lookup(THROW_CONVERT_ERRORS_ENV)),
            invalid_response_is_error: is_true(lookup(INVALID_RESPONSE_IS_ERROR_ENV)),
        }
    }

    /// Address of CMR for the given addressing mode.
    pub fn cmr_endpoint(&self, mode: AddressMode) -> &CmrEndpoint {
        match mode {
            AddressMode::Public => &self.cmr_public,
            AddressMode::Internal => &self.cmr_internal,
        }
    }
}

fn is_true(value: Option<String>) -> bool {
    value.is_some_and(|v| v.eq_ignore_ascii_case("true"))
}

fn parse_max_limit(value: Option<String>) -> u64 {
    match value {
        None => DEFAULT_MAX_LIMIT,
        Some(raw) => raw.trim().parse().unwrap_or_else(|_| {
            warn!(value = %raw, "ignoring unparseable {MAX_LIMIT_ENV}");
            DEFAULT_MAX_LIMIT
        }),
    }
}
