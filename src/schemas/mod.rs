//! Wire DTOs for the expense API.
//!
//! DESIGN
//! ======
//! These types mirror the backend's request/response bodies field for field
//! so serde stays lossless. They carry no behavior beyond small conversions.

pub mod expense;
pub mod token;
pub mod user;

pub use expense::{Expense, ExpenseCreate, ExpenseUpdate, Page};
pub use token::{ApiErrorBody, LoginCredentials, Token};
pub use user::{User, UserCreate};
