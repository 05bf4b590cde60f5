//! Shared authenticated-session state.
//!
//! DESIGN
//! ======
//! `SessionContext` is a cheap `Arc` handle. The same context is handed to
//! the HTTP middleware chain (which reads the token and clears it on 401)
//! and to the [`crate::store::AuthStore`] (which drives login and logout).
//!
//! INVARIANTS
//! ==========
//! - A user is only ever present together with a token. `set_user` refuses
//!   when no token is held and `clear` always drops both.
//! - Under sequential use the in-memory token mirrors the durable
//!   [`TOKEN_KEY`] entry: it is written to storage before memory and removed
//!   from memory before storage. Overlapping `set_token` and `clear` calls
//!   are not serialized; a `set_token` landing inside a `clear` can leave a
//!   token in memory that storage no longer holds, until the next write.
//! - Locks are never held across an `.await`.

#[cfg(test)]
#[path = "session_test.rs"]
mod session_test;

use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::schemas::User;
use crate::storage::{StorageError, TOKEN_KEY, TokenStorage};

/// Point-in-time copy of the session.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SessionState {
    pub token: Option<String>,
    pub user: Option<User>,
}

impl SessionState {
    /// Session validity: both token and user are present.
    #[must_use]
    pub fn is_logged_in(&self) -> bool {
        self.token.is_some() && self.user.is_some()
    }
}

#[derive(Clone)]
pub struct SessionContext {
    inner: Arc<Inner>,
}

struct Inner {
    storage: Arc<dyn TokenStorage>,
    state: RwLock<SessionState>,
}

impl SessionContext {
    /// Empty session over `storage`. Any persisted token is ignored.
    pub fn new(storage: Arc<dyn TokenStorage>) -> Self {
        Self { inner: Arc::new(Inner { storage, state: RwLock::new(SessionState::default()) }) }
    }

    /// Session seeded with the persisted token, if any. The user profile is
    /// not known yet; the navigation guard fetches it lazily.
    pub fn restore(storage: Arc<dyn TokenStorage>) -> Result<Self, StorageError> {
        let token = storage.get(TOKEN_KEY)?.filter(|t| !t.is_empty());
        if token.is_some() {
            tracing::debug!("restored persisted session token");
        }
        let state = SessionState { token, user: None };
        Ok(Self { inner: Arc::new(Inner { storage, state: RwLock::new(state) }) })
    }

    fn read(&self) -> RwLockReadGuard<'_, SessionState> {
        self.inner.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, SessionState> {
        self.inner.state.write().unwrap_or_else(PoisonError::into_inner)
    }

    #[must_use]
    pub fn token(&self) -> Option<String> {
        self.read().token.clone()
    }

    #[must_use]
    pub fn user(&self) -> Option<User> {
        self.read().user.clone()
    }

    #[must_use]
    pub fn has_token(&self) -> bool {
        self.read().token.is_some()
    }

    #[must_use]
    pub fn snapshot(&self) -> SessionState {
        self.read().clone()
    }

    #[must_use]
    pub fn is_logged_in(&self) -> bool {
        self.read().is_logged_in()
    }

    /// Persist and install a freshly issued token.
    ///
    /// A previously loaded user is dropped since it may belong to another
    /// account.
    pub fn set_token(&self, token: &str) -> Result<(), StorageError> {
        self.inner.storage.set(TOKEN_KEY, token)?;
        let mut state = self.write();
        state.token = Some(token.to_owned());
        state.user = None;
        Ok(())
    }

    /// Install the current user profile. Returns `false` and leaves the
    /// session unchanged when no token is held.
    #[must_use]
    pub fn set_user(&self, user: User) -> bool {
        let mut state = self.write();
        if state.token.is_none() {
            return false;
        }
        state.user = Some(user);
        true
    }

    /// Drop token and user from memory and storage.
    ///
    /// Returns `Ok(false)` without touching storage when the session was
    /// already empty.
    pub fn clear(&self) -> Result<bool, StorageError> {
        let previous = std::mem::take(&mut *self.write());
        if previous.token.is_none() && previous.user.is_none() {
            return Ok(false);
        }
        self.inner.storage.remove(TOKEN_KEY)?;
        Ok(true)
    }
}

impl std::fmt::Debug for SessionContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.read();
        f.debug_struct("SessionContext")
            .field("has_token", &state.token.is_some())
            .field("user", &state.user.as_ref().map(|u| u.id))
            .finish()
    }
}
