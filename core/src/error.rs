//! Error types for the REST API client.
//!
//! # Design
//! Transport failures, non-200 responses and local file failures are kept
//! apart so callers can decide which ones are fatal. `HttpStatus` carries the
//! raw body because the server explains most failures there.

use std::path::PathBuf;

use thiserror::Error;

/// Errors returned by `ApiClient`, the settings helpers and the id parser.
#[derive(Debug, Error)]
pub enum ApiError {
    /// The request never produced a response: connection refused, timeout,
    /// or a response that could not be read.
    #[error("request to {url} failed: {source}")]
    Network {
        url: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// The server answered with something other than 200.
    #[error("HTTP {status}: {body}")]
    HttpStatus { status: u16, body: String },

    /// A local file (upload attachment or settings file) could not be read or written.
    #[error("file {}: {source}", path.display())]
    File {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The base URL and path do not form a valid URL.
    #[error("invalid URL {url}: {source}")]
    InvalidUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },

    /// The request combines parts the wire format cannot carry.
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// A composite identifier without a `<pk>_` prefix.
    #[error("malformed composite id {0:?}: expected `<pk>_<suffix>`")]
    MalformedId(String),

    #[error("invalid configuration: {0}")]
    Config(String),

    /// The response body could not be deserialized into the expected type.
    #[error("deserialization failed: {0}")]
    Deserialization(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, ApiError>;
