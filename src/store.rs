//! Auth session store: login, registration, profile refresh, logout.
//!
//! DESIGN
//! ======
//! The store is the only writer of the session besides the 401 middleware.
//! Operations are plain sequential request/response cycles. Overlapping
//! calls are not deduplicated: two concurrent logins both run to completion
//! and the last token written wins.

#[cfg(test)]
#[path = "store_test.rs"]
mod store_test;

use crate::api::AuthApi;
use crate::http::{ClientError, HttpClient};
use crate::router::{DEFAULT_LANDING, History, LOGIN_PATH, Location};
use crate::schemas::{LoginCredentials, User, UserCreate};
use crate::session::SessionContext;
use crate::storage::StorageError;

#[derive(Clone, Debug)]
pub struct AuthStore {
    session: SessionContext,
    history: History,
    auth: AuthApi,
}

impl AuthStore {
    /// `client` should carry the session's middleware chain (see
    /// [`HttpClient::for_session`]) so refreshes send the bearer token.
    #[must_use]
    pub fn new(session: SessionContext, history: History, client: HttpClient) -> Self {
        Self { session, history, auth: AuthApi::new(client) }
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
    pub fn is_logged_in(&self) -> bool {
        self.session.is_logged_in()
    }

    #[must_use]
    pub fn current_user(&self) -> Option<User> {
        self.session.user()
    }

    /// Exchange credentials for a token, load the profile, then land on the
    /// dashboard.
    ///
    /// A profile refresh failure after a successful exchange is handled like
    /// any refresh failure: the session is logged out and `Ok` is still
    /// returned. Check [`AuthStore::is_logged_in`] afterwards.
    ///
    /// # Errors
    ///
    /// Propagates rejection of the credential exchange and storage failures.
    pub async fn login(&self, credentials: &LoginCredentials) -> Result<(), ClientError> {
        let token = self.auth.login(credentials).await?;
        self.session.set_token(&token.access_token)?;
        tracing::info!(username = %credentials.username, "logged in");

        if self.fetch_current_user().await.is_some() {
            self.history.push(Location::new(DEFAULT_LANDING));
        }
        Ok(())
    }

    /// Create the account, then log in with the same credentials.
    ///
    /// # Errors
    ///
    /// Propagates registration rejection (e.g. duplicate email) and any
    /// [`AuthStore::login`] error.
    pub async fn register(&self, new_user: &UserCreate) -> Result<(), ClientError> {
        let created = self.auth.register(new_user).await?;
        tracing::info!(user_id = created.id, "account registered");
        self.login(&new_user.credentials()).await
    }

    /// Refresh the user profile. No-op without a token.
    ///
    /// Failures are not surfaced: an expired or invalid token forces a
    /// logout and `None` is returned.
    pub async fn fetch_current_user(&self) -> Option<User> {
        if !self.session.has_token() {
            return None;
        }
        match self.auth.current_user().await {
            Ok(user) => {
                if self.session.set_user(user.clone()) {
                    Some(user)
                } else {
                    tracing::debug!("session cleared while the profile was loading");
                    None
                }
            }
            Err(e) => {
                tracing::warn!(error = %e, "failed to fetch current user; logging out");
                if let Err(e) = self.logout() {
                    tracing::error!(error = %e, "logout after failed refresh could not clear storage");
                }
                None
            }
        }
    }

    /// Drop token and user from memory and storage, then go to `/login`.
    ///
    /// # Errors
    ///
    /// Returns the storage error if the durable entry could not be removed.
    /// Memory is cleared and navigation happens regardless.
    pub fn logout(&self) -> Result<(), StorageError> {
        let cleared = self.session.clear();
        self.history.push(Location::new(LOGIN_PATH));
        if matches!(cleared, Ok(true)) {
            tracing::info!("logged out");
        }
        cleared.map(|_| ())
    }
}
