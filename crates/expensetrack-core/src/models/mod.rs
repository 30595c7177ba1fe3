//! Data models.
//!
//! - `Expense`, `ExpenseDraft`, `Category`: expense records
//! - `AuthSuccess`, `UserProfile`: identity service results

pub mod account;
pub mod expense;

pub use account::{AuthSuccess, UserProfile};
pub use expense::{Category, Expense, ExpenseDraft};
