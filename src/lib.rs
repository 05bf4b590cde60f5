//! # expense-desk
//!
//! Client library for the expense-tracking REST API.
//!
//! SYSTEM CONTEXT
//! ==============
//! A navigation attempt runs through the [`router`] guard, which consults the
//! [`store::AuthStore`]. The store may refresh the user through [`api`], whose
//! calls go through the [`http::HttpClient`] middleware chain. The chain
//! attaches the bearer token to every request and, on HTTP 401, clears the
//! shared [`session::SessionContext`] and sends the [`router::History`] back
//! to `/login`.
//!
//! Everything else is a single request/response cycle.

pub mod api;
pub mod app;
pub mod config;
pub mod http;
pub mod router;
pub mod schemas;
pub mod session;
pub mod storage;
pub mod store;

#[cfg(test)]
pub(crate) mod fake_backend;

pub use app::App;
pub use config::ClientConfig;
pub use http::{ClientError, HttpClient};
pub use router::{History, Location, NavigationError, Router};
pub use session::SessionContext;
pub use store::AuthStore;
