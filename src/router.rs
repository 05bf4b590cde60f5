//! Route table, navigation history and the authentication guard.
//!
//! ARCHITECTURE
//! ============
//! `/login` is the only public route. Every other page lives under the
//! shared layout at `/` and requires an authenticated session. The layout
//! itself has no content and redirects to [`DEFAULT_LANDING`].
//!
//! Each navigation attempt runs the guard exactly once:
//!
//! ```text
//! token present, user missing  -> refresh user first
//! unauthenticated + protected  -> /login?redirect=<original full path>
//! authenticated + /login       -> /dashboard
//! otherwise                    -> proceed
//! ```
//!
//! Navigations started by the session itself (after login, logout, or a
//! rejected token) push straight onto [`History`]. Their targets already
//! satisfy the guard. When that happens during the guard's own user refresh,
//! the guard's decision replaces the pushed `/login` so one navigation leaves
//! one entry.

#[cfg(test)]
#[path = "router_test.rs"]
mod router_test;

use std::collections::BTreeMap;
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::store::AuthStore;

pub const LOGIN_PATH: &str = "/login";
pub const DEFAULT_LANDING: &str = "/dashboard";
/// Query key carrying the originally requested path through the login page.
pub const REDIRECT_QUERY_KEY: &str = "redirect";

/// Pages mounted under the authenticated layout.
pub const PROTECTED_PAGES: &[(&str, &str)] = &[
    ("dashboard", "/dashboard"),
    ("analytics", "/analytics"),
    ("organization", "/organization"),
    ("projects", "/projects"),
    ("transactions", "/transactions"),
    ("invoices", "/invoices"),
    ("payments", "/payments"),
    ("members", "/members"),
    ("permissions", "/permissions"),
    ("chat", "/chat"),
    ("meetings", "/meetings"),
    ("settings", "/settings"),
    ("help", "/help"),
];

// =============================================================================
// LOCATION
// =============================================================================

/// A path plus decoded query parameters.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Location {
    pub path: String,
    pub query: BTreeMap<String, String>,
}

impl Location {
    #[must_use]
    pub fn new(path: &str) -> Self {
        Self { path: normalize_path(path), query: BTreeMap::new() }
    }

    /// Parse a full path such as `/login?redirect=%2Fpayments`.
    #[must_use]
    pub fn parse(raw: &str) -> Self {
        let (path, query) = raw.split_once('?').unwrap_or((raw, ""));
        let query = url::form_urlencoded::parse(query.as_bytes()).into_owned().collect();
        Self { path: normalize_path(path), query }
    }

    #[must_use]
    pub fn with_query(mut self, key: &str, value: &str) -> Self {
        self.query.insert(key.to_owned(), value.to_owned());
        self
    }

    #[must_use]
    pub fn query_value(&self, key: &str) -> Option<&str> {
        self.query.get(key).map(String::as_str)
    }

    /// Path with the encoded query string, if any.
    #[must_use]
    pub fn full_path(&self) -> String {
        if self.query.is_empty() {
            return self.path.clone();
        }
        let query = url::form_urlencoded::Serializer::new(String::new())
            .extend_pairs(self.query.iter())
            .finish();
        format!("{}?{query}", self.path)
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.full_path())
    }
}

fn normalize_path(path: &str) -> String {
    let trimmed = path.trim();
    let trimmed = trimmed.trim_end_matches('/');
    if trimmed.is_empty() {
        return "/".to_owned();
    }
    if trimmed.starts_with('/') { trimmed.to_owned() } else { format!("/{trimmed}") }
}

// =============================================================================
// ROUTE TABLE
// =============================================================================

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Route {
    pub name: &'static str,
    pub path: &'static str,
    pub requires_auth: bool,
    /// Set on routes with no content of their own.
    pub redirect: Option<&'static str>,
}

#[derive(Clone, Debug)]
pub struct RouteTable {
    routes: Vec<Route>,
}

impl RouteTable {
    /// Login page plus the authenticated layout and its children.
    #[must_use]
    pub fn standard() -> Self {
        let mut routes = vec![
            Route { name: "login", path: LOGIN_PATH, requires_auth: false, redirect: None },
            Route { name: "layout", path: "/", requires_auth: true, redirect: Some(DEFAULT_LANDING) },
        ];
        routes.extend(
            PROTECTED_PAGES
                .iter()
                .map(|&(name, path)| Route { name, path, requires_auth: true, redirect: None }),
        );
        Self { routes }
    }

    #[must_use]
    pub fn routes(&self) -> &[Route] {
        &self.routes
    }

    #[must_use]
    pub fn resolve(&self, path: &str) -> Option<&Route> {
        let path = normalize_path(path);
        self.routes.iter().find(|route| route.path == path)
    }
}

impl Default for RouteTable {
    fn default() -> Self {
        Self::standard()
    }
}

// =============================================================================
// GUARD
// =============================================================================

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum GuardDecision {
    Proceed,
    Redirect(Location),
}

/// Pure guard rule for one navigation attempt.
#[must_use]
pub fn guard(route: &Route, target: &Location, authenticated: bool) -> GuardDecision {
    if route.requires_auth && !authenticated {
        let login = Location::new(LOGIN_PATH).with_query(REDIRECT_QUERY_KEY, &target.full_path());
        return GuardDecision::Redirect(login);
    }
    if route.path == LOGIN_PATH && authenticated {
        return GuardDecision::Redirect(Location::new(DEFAULT_LANDING));
    }
    GuardDecision::Proceed
}

// =============================================================================
// HISTORY
// =============================================================================

/// Shared navigation stack. The last entry is the current location.
#[derive(Clone)]
pub struct History {
    entries: Arc<Mutex<Vec<Location>>>,
}

impl History {
    #[must_use]
    pub fn new(initial: Location) -> Self {
        Self { entries: Arc::new(Mutex::new(vec![initial])) }
    }

    fn lock(&self) -> MutexGuard<'_, Vec<Location>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }

    #[must_use]
    pub fn current(&self) -> Location {
        self.lock().last().cloned().unwrap_or_default()
    }

    #[must_use]
    pub fn is_at(&self, path: &str) -> bool {
        self.lock().last().is_some_and(|loc| loc.path == normalize_path(path))
    }

    /// Push `location` unless it is already current. Returns whether the
    /// stack changed.
    pub fn push(&self, location: Location) -> bool {
        let mut entries = self.lock();
        if entries.last() == Some(&location) {
            return false;
        }
        tracing::debug!(to = %location, "history push");
        entries.push(location);
        true
    }

    /// Overwrite the current entry in place.
    pub fn replace_current(&self, location: Location) {
        let mut entries = self.lock();
        tracing::debug!(to = %location, "history replace");
        match entries.last_mut() {
            Some(current) => *current = location,
            None => entries.push(location),
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    #[must_use]
    pub fn entries(&self) -> Vec<Location> {
        self.lock().clone()
    }
}

impl Default for History {
    fn default() -> Self {
        Self::new(Location::new("/"))
    }
}

impl fmt::Debug for History {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("History").field("current", &self.current()).finish()
    }
}

// =============================================================================
// ROUTER
// =============================================================================

#[derive(Debug, thiserror::Error)]
pub enum NavigationError {
    #[error("no route matches {0}")]
    NotFound(String),
}

/// Outcome of a guarded navigation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Navigation {
    pub requested: Location,
    pub landed: Location,
}

impl Navigation {
    #[must_use]
    pub fn redirected(&self) -> bool {
        self.requested != self.landed
    }
}

#[derive(Clone, Debug)]
pub struct Router {
    table: RouteTable,
    history: History,
}

impl Router {
    #[must_use]
    pub fn new(table: RouteTable, history: History) -> Self {
        Self { table, history }
    }

    #[must_use]
    pub fn table(&self) -> &RouteTable {
        &self.table
    }

    #[must_use]
    pub fn history(&self) -> &History {
        &self.history
    }

    /// Run the guard for `target` and record where the navigation landed.
    ///
    /// # Errors
    ///
    /// Returns [`NavigationError::NotFound`] when `target` matches no route;
    /// history is left unchanged.
    pub async fn navigate(&self, store: &AuthStore, target: &str) -> Result<Navigation, NavigationError> {
        let requested = Location::parse(target);
        let mut route = self
            .table
            .resolve(&requested.path)
            .ok_or_else(|| NavigationError::NotFound(requested.path.clone()))?;
        let mut destination = requested.clone();

        if let Some(redirect) = route.redirect {
            destination = Location { path: redirect.to_owned(), query: requested.query.clone() };
            route = self
                .table
                .resolve(redirect)
                .ok_or_else(|| NavigationError::NotFound(redirect.to_owned()))?;
        }

        // A failed refresh logs out and pushes a bare `/login` on its own.
        // The guard's redirect then takes over that entry.
        let depth = self.history.len();
        let session = store.session();
        if session.has_token() && session.user().is_none() {
            store.fetch_current_user().await;
        }
        let refresh_pushed_login = self.history.len() > depth && self.history.is_at(LOGIN_PATH);
        let authenticated = store.session().user().is_some();

        let landed = match guard(route, &destination, authenticated) {
            GuardDecision::Proceed => destination,
            GuardDecision::Redirect(location) => {
                tracing::info!(from = %destination, to = %location, "navigation redirected by guard");
                location
            }
        };
        if refresh_pushed_login {
            self.history.replace_current(landed.clone());
        } else {
            self.history.push(landed.clone());
        }
        Ok(Navigation { requested, landed })
    }
}
