use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use super::session::AuthState;

/// Default delay between email-verified checks, in seconds.
pub const DEFAULT_VERIFICATION_POLL_SECS: u64 = 5;

/// Anything that can answer "has this account verified its email?".
#[async_trait]
pub trait VerificationStatus: Send + Sync {
    async fn is_email_verified(&self, token: &str) -> Result<bool>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VerificationOutcome {
    Verified,
    /// The session the poll was started for ended first.
    SessionEnded,
}

/// Poll `source` every `interval` until the email is verified.
///
/// The poll belongs to the session that is live when it starts: it stops as
/// soon as that session is logged out, expires, or is replaced by another
/// login. Lookup errors are logged and retried on the next tick.
pub async fn poll_until_verified<S>(
    source: &S,
    mut session_rx: watch::Receiver<AuthState>,
    interval: Duration,
) -> VerificationOutcome
where
    S: VerificationStatus + ?Sized,
{
    let token = match session_rx.borrow_and_update().session() {
        Some(session) => session.token.clone(),
        None => return VerificationOutcome::SessionEnded,
    };

    let mut ticker = tokio::time::interval_at(tokio::time::Instant::now() + interval, interval);

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                match source.is_email_verified(&token).await {
                    Ok(true) => {
                        info!("Email verified");
                        return VerificationOutcome::Verified;
                    }
                    Ok(false) => debug!("Email not verified yet"),
                    Err(e) => warn!(error = %e, "Email verification check failed"),
                }
            }
            changed = session_rx.changed() => {
                if changed.is_err() {
                    return VerificationOutcome::SessionEnded;
                }
                let same_session = session_rx
                    .borrow_and_update()
                    .session()
                    .is_some_and(|s| s.token == token);
                if !same_session {
                    debug!("Session ended, stopping verification poll");
                    return VerificationOutcome::SessionEnded;
                }
            }
        }
    }
}

/// Run [`poll_until_verified`] on a background task.
pub fn spawn_verification_poll(
    source: Arc<dyn VerificationStatus>,
    session_rx: watch::Receiver<AuthState>,
    interval: Duration,
) -> JoinHandle<VerificationOutcome> {
    tokio::spawn(async move { poll_until_verified(source.as_ref(), session_rx, interval).await })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::clock::TokioClock;
    use crate::auth::session::SessionManager;
    use crate::auth::store::MemorySessionStore;
    use chrono::Utc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct VerifiesAfter {
        calls: AtomicUsize,
        verified_on: usize,
    }

    #[async_trait]
    impl VerificationStatus for VerifiesAfter {
        async fn is_email_verified(&self, _token: &str) -> Result<bool> {
            let n = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
            if n == 1 {
                anyhow::bail!("transient lookup failure");
            }
            Ok(n >= self.verified_on)
        }
    }

    fn manager(minutes: i64) -> SessionManager {
        SessionManager::new(
            Arc::new(MemorySessionStore::new()),
            Arc::new(TokioClock::starting_at(Utc::now())),
            chrono::Duration::minutes(minutes),
        )
    }

    #[tokio::test(start_paused = true)]
    async fn test_poll_stops_when_verified() {
        let manager = manager(5);
        manager.login("tok", "u1");
        let source = VerifiesAfter {
            calls: AtomicUsize::new(0),
            verified_on: 3,
        };
        let start = tokio::time::Instant::now();

        let outcome = poll_until_verified(&source, manager.subscribe(), Duration::from_secs(5)).await;

        assert_eq!(outcome, VerificationOutcome::Verified);
        assert_eq!(source.calls.load(Ordering::SeqCst), 3);
        assert_eq!(start.elapsed(), Duration::from_secs(15));
    }

    #[tokio::test(start_paused = true)]
    async fn test_poll_without_session_returns_immediately() {
        let manager = manager(5);
        let source = VerifiesAfter {
            calls: AtomicUsize::new(0),
            verified_on: 1,
        };

        let outcome = poll_until_verified(&source, manager.subscribe(), Duration::from_secs(5)).await;

        assert_eq!(outcome, VerificationOutcome::SessionEnded);
        assert_eq!(source.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_poll_is_bound_to_session_expiry() {
        let manager = manager(1);
        manager.login("tok", "u1");
        let source = Arc::new(VerifiesAfter {
            calls: AtomicUsize::new(0),
            verified_on: usize::MAX,
        });
        let start = tokio::time::Instant::now();

        let handle = spawn_verification_poll(source.clone(), manager.subscribe(), Duration::from_secs(5));
        let outcome = handle.await.unwrap();

        assert_eq!(outcome, VerificationOutcome::SessionEnded);
        assert_eq!(start.elapsed(), Duration::from_secs(60));
    }

    #[tokio::test(start_paused = true)]
    async fn test_poll_stops_on_relogin() {
        let manager = manager(5);
        manager.login("first", "u1");
        let source = Arc::new(VerifiesAfter {
            calls: AtomicUsize::new(0),
            verified_on: usize::MAX,
        });

        let handle = spawn_verification_poll(source, manager.subscribe(), Duration::from_secs(5));
        tokio::time::sleep(Duration::from_secs(7)).await;
        manager.login("second", "u1");

        assert_eq!(handle.await.unwrap(), VerificationOutcome::SessionEnded);
    }
}
