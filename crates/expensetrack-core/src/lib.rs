//! Core library for expensetrack.
//!
//! - `auth`: session lifecycle (login, expiry timer, persistence, rehydration)
//! - `api`: identity service and expense store REST clients
//! - `models`: expense and account data types
//! - `expenses`: in-memory expense list with two-phase updates, CSV export
//! - `config`: application configuration
//! - `forms`: validation of form input
//! - `utils`: formatting helpers

pub mod api;
pub mod auth;
pub mod config;
pub mod expenses;
pub mod forms;
pub mod models;
pub mod utils;
