//! Blocking client core for the social-media automation REST API.
//!
//! # Overview
//! Sends GET requests with query parameters and POST requests with
//! form-encoded or multipart bodies to a configurable base URL, and returns
//! the raw status and body. Endpoint semantics belong to the server and to
//! caller code; this crate only knows methods, paths and parameter kinds.
//!
//! # Design
//! - `ApiClient` is an explicit object built once from `ClientConfig` and
//!   passed to callers; there is no global instance.
//! - Request building (`build_request`) is pure; `Transport` does the I/O,
//!   so the encoding rules are testable without a server.
//! - Non-200 responses are data until the caller runs `check_status`.
//! - `settings` and `ids` are small helpers independent of the client.

pub mod client;
pub mod config;
pub mod error;
pub mod http;
pub mod ids;
pub mod multipart;
pub mod request;
pub mod settings;
pub mod transport;

pub use client::{check_status, ApiClient};
pub use config::ClientConfig;
pub use error::{ApiError, Result};
pub use http::{HttpMethod, HttpRequest, HttpResponse};
pub use request::{EndpointRequest, EndpointRequestBuilder, FileAttachment};
pub use transport::{Transport, UreqTransport};
