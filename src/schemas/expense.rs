#[cfg(test)]
#[path = "expense_test.rs"]
mod expense_test;

use serde::{Deserialize, Serialize};

pub const DEFAULT_PAGE_LIMIT: u32 = 100;

/// Expense record owned by the remote API.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Expense {
    pub id: i64,
    #[serde(default)]
    pub description: Option<String>,
    pub amount: f64,
    /// Not every backend revision stores a category.
    #[serde(default)]
    pub category: Option<String>,
    /// ISO-8601 timestamp assigned by the server.
    pub date: String,
    pub owner_id: i64,
}

/// Body for `POST /expenses/`. Server-assigned fields are omitted.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ExpenseCreate {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub amount: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date: Option<String>,
}

/// Body for `PUT /expenses/{id}`. Absent fields are left untouched, except
/// `amount`: the API answers 422 when it is missing.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ExpenseUpdate {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub amount: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date: Option<String>,
}

impl ExpenseUpdate {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.description.is_none() && self.amount.is_none() && self.category.is_none() && self.date.is_none()
    }
}

/// `skip`/`limit` query window for list endpoints.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct Page {
    pub skip: u32,
    pub limit: u32,
}

impl Default for Page {
    fn default() -> Self {
        Self { skip: 0, limit: DEFAULT_PAGE_LIMIT }
    }
}
