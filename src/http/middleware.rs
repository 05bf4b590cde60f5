//! Pre-request and post-response hooks around every API call.

#[cfg(test)]
#[path = "middleware_test.rs"]
mod middleware_test;

use reqwest::header::{AUTHORIZATION, HeaderValue};
use reqwest::{Method, Request, StatusCode, Url};

use super::ClientError;
use crate::router::{History, LOGIN_PATH, Location};
use crate::session::SessionContext;

/// What post-response hooks get to see.
#[derive(Clone, Debug)]
pub struct ResponseMeta {
    pub method: Method,
    pub url: Url,
    pub status: StatusCode,
}

/// One link in the client's middleware chain.
///
/// Hooks run in chain order. An `on_request` error aborts the call before
/// anything is sent.
pub trait Middleware: Send + Sync {
    fn on_request(&self, request: &mut Request) -> Result<(), ClientError> {
        let _ = request;
        Ok(())
    }

    fn on_response(&self, response: &ResponseMeta) {
        let _ = response;
    }
}

// =============================================================================
// BEARER AUTH
// =============================================================================

/// Attaches `Authorization: Bearer <token>` whenever the session holds a
/// token.
pub struct BearerAuth {
    session: SessionContext,
}

impl BearerAuth {
    #[must_use]
    pub fn new(session: SessionContext) -> Self {
        Self { session }
    }
}

impl Middleware for BearerAuth {
    fn on_request(&self, request: &mut Request) -> Result<(), ClientError> {
        let Some(token) = self.session.token() else {
            return Ok(());
        };
        let mut value = HeaderValue::from_str(&format!("Bearer {token}"))?;
        value.set_sensitive(true);
        request.headers_mut().insert(AUTHORIZATION, value);
        Ok(())
    }
}

// =============================================================================
// SESSION EXPIRY
// =============================================================================

/// Handles HTTP 401: drops the session (memory and storage) and sends the
/// history back to the login page.
///
/// A 401 while already on `/login` never pushes another login entry, and a
/// 401 against an already-empty session touches neither memory nor storage.
pub struct SessionExpiry {
    session: SessionContext,
    history: History,
}

impl SessionExpiry {
    #[must_use]
    pub fn new(session: SessionContext, history: History) -> Self {
        Self { session, history }
    }
}

impl Middleware for SessionExpiry {
    fn on_response(&self, response: &ResponseMeta) {
        if response.status != StatusCode::UNAUTHORIZED {
            return;
        }
        match self.session.clear() {
            Ok(true) => tracing::warn!(url = %response.url, "session rejected by API; credentials cleared"),
            Ok(false) => {}
            Err(e) => tracing::error!(error = %e, "failed to clear persisted session"),
        }
        if !self.history.is_at(LOGIN_PATH) {
            self.history.push(Location::new(LOGIN_PATH));
        }
    }
}

// =============================================================================
// REQUEST TRACE
// =============================================================================

/// Structured logging of every request and its response status.
#[derive(Default)]
pub struct RequestTrace;

impl Middleware for RequestTrace {
    fn on_request(&self, request: &mut Request) -> Result<(), ClientError> {
        tracing::debug!(method = %request.method(), url = %request.url(), "api request");
        Ok(())
    }

    fn on_response(&self, response: &ResponseMeta) {
        if response.status.is_success() {
            tracing::debug!(
                method = %response.method,
                url = %response.url,
                status = response.status.as_u16(),
                "api response"
            );
        } else {
            tracing::warn!(
                method = %response.method,
                url = %response.url,
                status = response.status.as_u16(),
                "api request failed"
            );
        }
    }
}
