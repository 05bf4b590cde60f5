//! HTTP transport for the expense API.
//!
//! ARCHITECTURE
//! ============
//! [`HttpClient`] owns one `reqwest::Client` with a fixed base URL and
//! per-request timeout. Every outgoing request runs through an ordered
//! [`middleware::Middleware`] chain: `on_request` hooks may rewrite the
//! request (the bearer token is attached here) and `on_response` hooks
//! observe the status of every response (the 401 session-expiry handler
//! lives here).
//!
//! ERROR HANDLING
//! ==============
//! 401 is surfaced as [`ClientError::Unauthorized`] after the middleware
//! has cleared the session. Every other non-success status becomes
//! [`ClientError::Status`]. Transport failures, timeouts included, are not
//! retried.

mod client;
mod error;
pub mod middleware;

pub use client::HttpClient;
pub use error::ClientError;
pub use middleware::{BearerAuth, Middleware, RequestTrace, ResponseMeta, SessionExpiry};
