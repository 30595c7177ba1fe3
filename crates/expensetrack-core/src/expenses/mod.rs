//! Local expense state.
//!
//! - `ExpenseList`: the signed-in user's expenses with two-phase updates
//! - `export`: CSV download of the list

pub mod export;
pub mod list;

pub use export::{to_csv, write_csv};
pub use list::{ExpenseList, PendingChange, PREMIUM_THRESHOLD};
