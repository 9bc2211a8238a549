//! Caller code for the REST API client: typed endpoint wrappers and the
//! scripted walkthrough the `restapi-demo` binary runs.

pub mod api;
pub mod walkthrough;

pub use api::RestApi;
