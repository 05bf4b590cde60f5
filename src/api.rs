//! Per-resource API wrappers. Each method performs exactly one HTTP call
//! through the shared [`HttpClient`] middleware chain.

#[cfg(test)]
#[path = "api_test.rs"]
mod api_test;

use crate::http::{ClientError, HttpClient};
use crate::schemas::{Expense, ExpenseCreate, ExpenseUpdate, LoginCredentials, Page, Token, User, UserCreate};

pub const LOGIN_ENDPOINT: &str = "/login/access-token";
pub const USERS_ENDPOINT: &str = "/users/";
pub const CURRENT_USER_ENDPOINT: &str = "/users/me";
pub const EXPENSES_ENDPOINT: &str = "/expenses/";
pub const MY_EXPENSES_ENDPOINT: &str = "/expenses/me";

pub(crate) fn expense_endpoint(expense_id: i64) -> String {
    format!("/expenses/{expense_id}")
}

#[derive(Clone, Debug)]
pub struct AuthApi {
    client: HttpClient,
}

impl AuthApi {
    #[must_use]
    pub fn new(client: HttpClient) -> Self {
        Self { client }
    }

    /// Exchange credentials for a bearer token (form-encoded).
    pub async fn login(&self, credentials: &LoginCredentials) -> Result<Token, ClientError> {
        self.client.post_form(LOGIN_ENDPOINT, credentials).await
    }

    pub async fn register(&self, user: &UserCreate) -> Result<User, ClientError> {
        self.client.post_json(USERS_ENDPOINT, user).await
    }

    pub async fn current_user(&self) -> Result<User, ClientError> {
        self.client.get_json(CURRENT_USER_ENDPOINT).await
    }
}

#[derive(Clone, Debug)]
pub struct ExpenseApi {
    client: HttpClient,
}

impl ExpenseApi {
    #[must_use]
    pub fn new(client: HttpClient) -> Self {
        Self { client }
    }

    /// Expenses owned by the current user, one page at a time.
    pub async fn list_mine(&self, page: Page) -> Result<Vec<Expense>, ClientError> {
        self.client.get_json_with_query(MY_EXPENSES_ENDPOINT, &page).await
    }

    pub async fn create(&self, expense: &ExpenseCreate) -> Result<Expense, ClientError> {
        self.client.post_json(EXPENSES_ENDPOINT, expense).await
    }

    pub async fn update(&self, expense_id: i64, changes: &ExpenseUpdate) -> Result<Expense, ClientError> {
        self.client.put_json(&expense_endpoint(expense_id), changes).await
    }

    /// Returns the deleted record.
    pub async fn delete(&self, expense_id: i64) -> Result<Expense, ClientError> {
        self.client.delete_json(&expense_endpoint(expense_id)).await
    }
}
