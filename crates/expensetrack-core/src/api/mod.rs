//! REST API clients.
//!
//! - `IdentityClient`: sign-in, sign-up, password reset, email verification
//!   and profile calls against the identity service
//! - `ExpenseClient`: list/create/update/delete of the signed-in user's
//!   expenses in the remote JSON store
//!
//! Requests to the expense store are gated on a live session; see
//! [`require_session`].

pub mod error;
pub mod expenses;
pub mod http;
pub mod identity;

#[cfg(test)]
pub(crate) mod stub;

pub use error::ApiError;
pub use expenses::ExpenseClient;
pub use identity::{IdentityClient, ProfileUpdate, DEFAULT_IDENTITY_URL};

use crate::auth::{Session, SessionManager};

/// The live session, or `ApiError::Unauthorized` if there is none.
pub fn require_session(sessions: &SessionManager) -> Result<Session, ApiError> {
    sessions.current_session().ok_or(ApiError::Unauthorized)
}
