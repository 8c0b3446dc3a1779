//! Transport-agnostic request layer over `eventsched_core`.
//!
//! Callers hand in an [`ApiRequest`] and get back an [`ApiResponse`]; how
//! those travel (stdin lines, HTTP, tests) is up to the caller.

pub mod api;
pub mod envelope;

pub use api::EventApi;
pub use envelope::{ApiRequest, ApiResponse};
