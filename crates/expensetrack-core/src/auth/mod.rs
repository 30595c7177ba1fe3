//! Session lifecycle management.
//!
//! This module provides:
//! - `SessionManager`: holds the current session, persists it, expires it on a
//!   timer and publishes every transition to subscribers
//! - `SessionStore`: durable storage for the persisted session record
//! - `Clock`: injectable wall-clock source
//! - verification polling bound to the lifetime of a session
//!
//! Sessions last five minutes by default and survive restarts until they expire.

pub mod clock;
pub mod session;
pub mod store;
pub mod verification;

pub use clock::{Clock, SystemClock};
pub use session::{AuthState, LogoutReason, Session, SessionManager, DEFAULT_SESSION_MINUTES};
pub use store::{FileSessionStore, MemorySessionStore, SessionRecord, SessionStore};
pub use verification::{
    poll_until_verified, spawn_verification_poll, VerificationOutcome, VerificationStatus,
    DEFAULT_VERIFICATION_POLL_SECS,
};
