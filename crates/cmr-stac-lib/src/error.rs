use thiserror::Error;

use crate::stac::Relation;

/// Convenient result alias for the CMR-STAC library.
pub type Result<T> = std::result::Result<T, Error>;

/// Top-level library error type.
#[derive(Debug, Error)]
pub enum Error {
    /// Raised when a sort request names a property CMR cannot sort on.
    #[error("Property [{property}] does not support sorting")]
    InvalidSortProperty { property: String },

    /// Raised when a query extension names a property CMR cannot query.
    #[error("Property [{property}] does not support querying")]
    InvalidQueryProperty { property: String },

    /// Raised when a single request parameter cannot be converted.
    #[error("invalid value for parameter {key}: {message}")]
    InvalidParameter { key: String, message: String },

    /// Raised when a relative link is derived before its anchor link exists.
    #[error("catalog has no {relation} link to derive from")]
    MissingLink { relation: Relation },

    /// Raised when a required argument for an upstream call is absent.
    #[error("missing required parameter: {name}")]
    MissingParameter { name: String },

    /// Raised when a GeoJSON geometry cannot be expressed as a CMR spatial parameter.
    #[error("unsupported geometry: {message}")]
    UnsupportedGeometry { message: String },

    /// Raised when a CMR spatial string could not be converted to GeoJSON.
    #[error("unknown spatial extent in CMR entry {id}")]
    UnknownSpatial { id: String },

    /// Raised when CMR answers with a non-success status.
    #[error("CMR returned status {status} for {url}")]
    UpstreamStatus { status: u16, url: String },

    /// Raised when CMR answers with a body that lacks the `feed.entry` array.
    #[error("unexpected CMR response shape from {url}")]
    UnexpectedResponse { url: String },

    /// Raised when a schema file could not be found or read.
    #[error("schema {name} could not be loaded: {message}")]
    SchemaLoad { name: String, message: String },

    /// Raised when a schema does not compile into a validator.
    #[error("schema {name} is not a valid JSON Schema: {message}")]
    SchemaCompile { name: String, message: String },

    /// Raised when an emitted document fails validation and invalid output is fatal.
    #[error("created invalid document against schema {name}: {violations} violation(s)")]
    InvalidDocument { name: String, violations: usize },

    /// Wrapper for HTTP client errors.
    #[error(transparent)]
    Http(#[from] reqwest::Error),

    /// Wrapper for IO errors.
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// Wrapper for JSON (de)serialization errors.
    #[error(transparent)]
    Json(#[from] serde_json::Error),

    /// Wrapper for URL parsing errors.
    #[error(transparent)]
    Url(#[from] url::ParseError),
}

impl Error {
    /// Whether the error was caused by the caller's input rather than by the
    /// gateway or CMR. Front ends map these to 4xx-class responses.
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            Error::InvalidSortProperty { .. }
                | Error::InvalidQueryProperty { .. }
                | Error::InvalidParameter { .. }
                | Error::UnsupportedGeometry { .. }
        )
    }

    pub(crate) fn invalid_parameter(key: &str, message: impl Into<String>) -> Self {
        Error::InvalidParameter {
            key: key.to_string(),
            message: message.into(),
        }
    }
}
