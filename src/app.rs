//! Application wiring: one session, one history, one client.
//!
//! LIFECYCLE
//! =========
//! [`App::start`] restores the persisted token and builds the middleware
//! chain around it. Teardown is [`AuthStore::logout`], which clears memory
//! and storage; the `App` itself holds no other resources.

#[cfg(test)]
#[path = "app_test.rs"]
mod app_test;

use std::sync::Arc;

use crate::api::ExpenseApi;
use crate::config::ClientConfig;
use crate::http::{ClientError, HttpClient};
use crate::router::{History, Location, RouteTable, Router};
use crate::session::SessionContext;
use crate::storage::{FileStorage, TokenStorage};
use crate::store::AuthStore;

#[derive(Clone, Debug)]
pub struct App {
    session: SessionContext,
    history: History,
    store: AuthStore,
    router: Router,
    expenses: ExpenseApi,
}

impl App {
    /// Start against the durable file storage named in `config`.
    ///
    /// # Errors
    ///
    /// Fails when the storage file is unreadable or the HTTP client cannot
    /// be built.
    pub fn start(config: &ClientConfig) -> Result<Self, ClientError> {
        let storage = Arc::new(FileStorage::new(&config.storage_path));
        Self::with_storage(config, storage)
    }

    /// Start against any storage backend.
    ///
    /// # Errors
    ///
    /// See [`App::start`].
    pub fn with_storage(config: &ClientConfig, storage: Arc<dyn TokenStorage>) -> Result<Self, ClientError> {
        let session = SessionContext::restore(storage)?;
        let history = History::new(Location::new("/"));
        let client = HttpClient::for_session(config, &session, &history)?;
        let store = AuthStore::new(session.clone(), history.clone(), client.clone());
        let router = Router::new(RouteTable::standard(), history.clone());
        tracing::debug!(base_url = client.base_url(), restored = session.has_token(), "client started");
        Ok(Self { session, history, store, router, expenses: ExpenseApi::new(client) })
    }

    #[must_use]
    pub fn session(&self) -> &SessionContext {
        &self.session
    }

    #[must_use]
    pub fn history(&self) -> &History {
        &self.history
    }

    #[must_use]
    pub fn store(&self) -> &AuthStore {
        &self.store
    }

    #[must_use]
    pub fn router(&self) -> &Router {
        &self.router
    }

    #[must_use]
    pub fn expenses(&self) -> &ExpenseApi {
        &self.expenses
    }
}
