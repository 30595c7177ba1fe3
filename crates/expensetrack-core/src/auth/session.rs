use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration as StdDuration;

use chrono::{DateTime, Duration, Utc};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use super::clock::Clock;
use super::store::{SessionRecord, SessionStore};

/// Lifetime granted to every new login, in minutes.
pub const DEFAULT_SESSION_MINUTES: i64 = 5;

/// An authenticated credential and its validity window.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub token: String,
    pub user_id: String,
    pub expires_at: DateTime<Utc>,
}

impl Session {
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }

    pub fn time_until_expiry(&self, now: DateTime<Utc>) -> Duration {
        self.expires_at - now
    }

    /// Seconds remaining until expiry (for display)
    pub fn seconds_until_expiry(&self, now: DateTime<Utc>) -> i64 {
        self.time_until_expiry(now).num_seconds().max(0)
    }
}

/// Why the session ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogoutReason {
    /// The user asked to log out.
    UserRequested,
    /// The expiry timer fired, or the persisted session had already expired.
    Expired,
    /// Nothing usable was persisted at startup.
    NoStoredSession,
}

/// Observable session state, published to subscribers on every transition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthState {
    LoggedOut { reason: Option<LogoutReason> },
    LoggedIn(Session),
}

impl AuthState {
    pub fn session(&self) -> Option<&Session> {
        match self {
            AuthState::LoggedIn(session) => Some(session),
            AuthState::LoggedOut { .. } => None,
        }
    }

    pub fn is_logged_in(&self) -> bool {
        matches!(self, AuthState::LoggedIn(_))
    }
}

struct Inner {
    session: Option<Session>,
    /// Bumped on every transition; a timer only acts if its generation is current.
    generation: u64,
    timer: Option<JoinHandle<()>>,
}

struct Shared {
    store: Arc<dyn SessionStore>,
    clock: Arc<dyn Clock>,
    duration: Duration,
    inner: Mutex<Inner>,
    state_tx: watch::Sender<AuthState>,
}

/// Owns the current session: persists it, arms its expiry timer and publishes
/// every transition through a `watch` channel.
///
/// Timers are tokio tasks, so the manager must be used from within a tokio
/// runtime.
pub struct SessionManager {
    shared: Arc<Shared>,
}

impl std::fmt::Debug for SessionManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionManager")
            .field("duration", &self.shared.duration)
            .field("state", &*self.shared.state_tx.borrow())
            .finish()
    }
}

impl SessionManager {
    /// Create a logged-out manager without touching the store.
    pub fn new(store: Arc<dyn SessionStore>, clock: Arc<dyn Clock>, duration: Duration) -> Self {
        let (state_tx, _) = watch::channel(AuthState::LoggedOut { reason: None });
        Self {
            shared: Arc::new(Shared {
                store,
                clock,
                duration,
                inner: Mutex::new(Inner {
                    session: None,
                    generation: 0,
                    timer: None,
                }),
                state_tx,
            }),
        }
    }

    /// Create a manager and rehydrate it from the store.
    pub fn restore(store: Arc<dyn SessionStore>, clock: Arc<dyn Clock>, duration: Duration) -> Self {
        let manager = Self::new(store, clock, duration);
        manager.rehydrate();
        manager
    }

    /// Restore the persisted session if it is still valid, arming the timer
    /// for the remaining time only. Otherwise clear it and end up logged out.
    pub fn rehydrate(&self) -> AuthState {
        let record = match self.shared.store.load() {
            Ok(record) => record,
            Err(e) => {
                warn!(error = %e, "Failed to load persisted session");
                None
            }
        };

        let now = self.shared.clock.now();
        match record.and_then(SessionRecord::into_session) {
            Some(session) if !session.is_expired_at(now) => {
                info!(
                    user_id = %session.user_id,
                    remaining_secs = session.seconds_until_expiry(now),
                    "Restored persisted session"
                );
                Shared::install(&self.shared, session);
            }
            Some(session) => {
                debug!(expired_at = %session.expires_at, "Persisted session already expired");
                self.shared.clear(LogoutReason::Expired);
            }
            None => {
                debug!("No usable persisted session");
                self.shared.clear(LogoutReason::NoStoredSession);
            }
        }
        self.state()
    }

    /// Start a session for a credential the identity service has confirmed.
    pub fn login(&self, token: impl Into<String>, user_id: impl Into<String>) -> Session {
        let session = Session {
            token: token.into(),
            user_id: user_id.into(),
            expires_at: self.shared.clock.now() + self.shared.duration,
        };

        if let Err(e) = self.shared.store.save(&SessionRecord::from_session(&session)) {
            warn!(error = %e, "Failed to save session");
        }

        info!(user_id = %session.user_id, expires_at = %session.expires_at, "User logged in");
        Shared::install(&self.shared, session.clone());
        session
    }

    /// End the session. Safe to call when already logged out.
    pub fn logout(&self) {
        info!("User logged out");
        self.shared.clear(LogoutReason::UserRequested);
    }

    /// The live session, if any. A session whose expiry has passed is not
    /// returned even if its timer has not run yet.
    pub fn current_session(&self) -> Option<Session> {
        let now = self.shared.clock.now();
        self.shared
            .lock()
            .session
            .clone()
            .filter(|s| !s.is_expired_at(now))
    }

    pub fn is_logged_in(&self) -> bool {
        self.current_session().is_some()
    }

    /// Derived state at the current instant.
    pub fn state(&self) -> AuthState {
        let now = self.shared.clock.now();
        match self.shared.lock().session.clone() {
            Some(session) if !session.is_expired_at(now) => AuthState::LoggedIn(session),
            Some(_) => AuthState::LoggedOut {
                reason: Some(LogoutReason::Expired),
            },
            None => self.shared.state_tx.borrow().clone(),
        }
    }

    /// Receive every session transition.
    pub fn subscribe(&self) -> watch::Receiver<AuthState> {
        self.shared.state_tx.subscribe()
    }

    pub fn session_duration(&self) -> Duration {
        self.shared.duration
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.shared.clock.now()
    }

    /// Disarm the timer without ending the session; the persisted record is
    /// left for the next start.
    pub fn shutdown(&self) {
        let mut inner = self.shared.lock();
        inner.generation += 1;
        if let Some(timer) = inner.timer.take() {
            timer.abort();
            debug!("Expiry timer disarmed on shutdown");
        }
    }

    #[cfg(test)]
    fn generation(&self) -> u64 {
        self.shared.lock().generation
    }

    #[cfg(test)]
    fn has_timer(&self) -> bool {
        self.shared.lock().timer.is_some()
    }
}

impl Drop for SessionManager {
    fn drop(&mut self) {
        self.shutdown();
    }
}

impl Shared {
    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Make `session` current and arm a timer for its remaining lifetime,
    /// replacing any previously armed timer.
    fn install(this: &Arc<Self>, session: Session) {
        let delay = session
            .time_until_expiry(this.clock.now())
            .to_std()
            .unwrap_or(StdDuration::ZERO);

        let mut inner = this.lock();
        inner.generation += 1;
        if let Some(old) = inner.timer.take() {
            old.abort();
            debug!("Previous expiry timer disarmed");
        }

        // Fix the deadline now so a late first poll cannot push expiry back.
        let deadline = tokio::time::Instant::now() + delay;
        let generation = inner.generation;
        let weak = Arc::downgrade(this);
        inner.timer = Some(tokio::spawn(async move {
            tokio::time::sleep_until(deadline).await;
            if let Some(shared) = weak.upgrade() {
                shared.expire(generation);
            }
        }));
        debug!(delay_secs = delay.as_secs(), generation, "Expiry timer armed");

        inner.session = Some(session.clone());
        this.state_tx.send_replace(AuthState::LoggedIn(session));
    }

    /// Timer callback. Ignored unless no transition happened since arming.
    fn expire(&self, generation: u64) {
        let mut inner = self.lock();
        if inner.generation != generation {
            debug!(generation, current = inner.generation, "Ignoring stale expiry timer");
            return;
        }
        // This task is the timer; drop its handle rather than abort it.
        inner.timer = None;
        info!("Session expired");
        self.clear_locked(&mut inner, LogoutReason::Expired);
    }

    fn clear(&self, reason: LogoutReason) {
        let mut inner = self.lock();
        if let Some(timer) = inner.timer.take() {
            timer.abort();
        }
        self.clear_locked(&mut inner, reason);
    }

    fn clear_locked(&self, inner: &mut Inner, reason: LogoutReason) {
        inner.generation += 1;
        inner.session = None;
        if let Err(e) = self.store.clear() {
            warn!(error = %e, "Failed to remove persisted session");
        }
        self.state_tx.send_replace(AuthState::LoggedOut {
            reason: Some(reason),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::clock::TokioClock;
    use crate::auth::store::MemorySessionStore;
    use chrono::TimeZone;
    use tokio::time::Instant;

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 1, 1, 12, 0, 0).unwrap()
    }

    fn manager_with(store: Arc<MemorySessionStore>) -> (SessionManager, TokioClock) {
        let clock = TokioClock::starting_at(t0());
        let manager = SessionManager::new(
            store,
            Arc::new(clock),
            Duration::minutes(DEFAULT_SESSION_MINUTES),
        );
        (manager, clock)
    }

    fn record(token: &str, user_id: &str, expires_at: DateTime<Utc>) -> SessionRecord {
        SessionRecord {
            token: Some(token.to_string()),
            user_id: Some(user_id.to_string()),
            token_expiry: Some(expires_at.timestamp_millis()),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_login_sets_expiry_and_persists() {
        let store = Arc::new(MemorySessionStore::new());
        let (manager, _) = manager_with(store.clone());

        let session = manager.login("tok", "u1");

        assert!(manager.is_logged_in());
        assert_eq!(session.expires_at, t0() + Duration::minutes(5));
        assert_eq!(manager.current_session(), Some(session.clone()));
        assert_eq!(store.snapshot(), Some(SessionRecord::from_session(&session)));
        assert!(manager.has_timer());
    }

    #[tokio::test(start_paused = true)]
    async fn test_expiry_scenario_299_then_300_seconds() {
        let store = Arc::new(MemorySessionStore::new());
        let (manager, _) = manager_with(store.clone());
        let start = Instant::now();
        let mut rx = manager.subscribe();

        manager.login("tok", "u1");
        rx.borrow_and_update();

        tokio::time::advance(StdDuration::from_secs(299)).await;
        assert!(manager.is_logged_in());
        assert!(store.snapshot().is_some());

        rx.changed().await.unwrap();
        assert_eq!(start.elapsed(), StdDuration::from_secs(300));
        assert!(!manager.is_logged_in());
        assert_eq!(
            *rx.borrow(),
            AuthState::LoggedOut {
                reason: Some(LogoutReason::Expired)
            }
        );
        assert!(store.snapshot().is_none());
        assert!(!manager.has_timer());
    }

    #[tokio::test(start_paused = true)]
    async fn test_expiry_deadline_fixed_at_login() {
        let store = Arc::new(MemorySessionStore::new());
        let (manager, _) = manager_with(store.clone());
        let start = Instant::now();
        let mut rx = manager.subscribe();

        // The timer task is first polled only after the clock has moved.
        manager.login("tok", "u1");
        rx.borrow_and_update();
        tokio::time::advance(StdDuration::from_secs(100)).await;
        tokio::time::advance(StdDuration::from_secs(201)).await;

        rx.changed().await.unwrap();
        assert_eq!(start.elapsed(), StdDuration::from_secs(301));
        assert!(store.snapshot().is_none());
        assert!(!rx.borrow().is_logged_in());
    }

    #[tokio::test(start_paused = true)]
    async fn test_expired_without_any_call_reads_logged_out() {
        let store = Arc::new(MemorySessionStore::new());
        let (manager, _) = manager_with(store);

        manager.login("tok", "u1");
        tokio::time::advance(StdDuration::from_secs(301)).await;

        assert!(!manager.is_logged_in());
        assert!(manager.current_session().is_none());
        assert!(!manager.state().is_logged_in());
    }

    #[tokio::test(start_paused = true)]
    async fn test_logout_is_immediate_and_idempotent() {
        let store = Arc::new(MemorySessionStore::new());
        let (manager, _) = manager_with(store.clone());
        let rx = manager.subscribe();

        manager.logout();
        assert!(!manager.is_logged_in());
        assert_eq!(
            *rx.borrow(),
            AuthState::LoggedOut {
                reason: Some(LogoutReason::UserRequested)
            }
        );

        manager.login("tok", "u1");
        manager.logout();
        assert!(!manager.is_logged_in());
        assert!(store.snapshot().is_none());
        assert!(!manager.has_timer());

        manager.logout();
        assert!(!manager.is_logged_in());
    }

    #[tokio::test(start_paused = true)]
    async fn test_relogin_disarms_previous_timer() {
        let store = Arc::new(MemorySessionStore::new());
        let (manager, _) = manager_with(store.clone());

        manager.login("first", "u1");
        tokio::time::advance(StdDuration::from_secs(100)).await;
        let second = manager.login("second", "u1");
        assert_eq!(second.expires_at, t0() + Duration::seconds(400));

        // Past the first session's expiry, before the second's.
        tokio::time::advance(StdDuration::from_secs(250)).await;
        tokio::task::yield_now().await;

        assert_eq!(manager.current_session(), Some(second.clone()));
        assert_eq!(store.snapshot(), Some(SessionRecord::from_session(&second)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_stale_generation_is_ignored() {
        let store = Arc::new(MemorySessionStore::new());
        let (manager, _) = manager_with(store);

        manager.login("first", "u1");
        let stale = manager.generation();
        manager.login("second", "u1");

        manager.shared.expire(stale);
        assert!(manager.is_logged_in());
        assert_eq!(manager.current_session().unwrap().token, "second");
    }

    #[tokio::test(start_paused = true)]
    async fn test_rehydrate_future_expiry_keeps_original_deadline() {
        let expires_at = t0() + Duration::seconds(120);
        let store = Arc::new(MemorySessionStore::with_record(record("tok", "u1", expires_at)));
        let (manager, _) = manager_with(store.clone());
        let start = Instant::now();
        let mut rx = manager.subscribe();

        let state = manager.rehydrate();
        assert!(state.is_logged_in());
        assert_eq!(manager.current_session().unwrap().expires_at, expires_at);
        rx.borrow_and_update();

        rx.changed().await.unwrap();
        assert_eq!(start.elapsed(), StdDuration::from_secs(120));
        assert!(!manager.is_logged_in());
        assert!(store.snapshot().is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_rehydrate_past_expiry_logs_out() {
        let store = Arc::new(MemorySessionStore::with_record(record(
            "tok",
            "u1",
            t0() - Duration::seconds(1),
        )));
        let (manager, _) = manager_with(store.clone());

        let state = manager.rehydrate();
        assert_eq!(
            state,
            AuthState::LoggedOut {
                reason: Some(LogoutReason::Expired)
            }
        );
        assert!(store.snapshot().is_none());
        assert!(!manager.has_timer());
    }

    #[tokio::test(start_paused = true)]
    async fn test_rehydrate_incomplete_record_logs_out() {
        let store = Arc::new(MemorySessionStore::with_record(SessionRecord {
            token: Some("tok".to_string()),
            user_id: None,
            token_expiry: None,
        }));
        let (manager, _) = manager_with(store.clone());

        let state = manager.rehydrate();
        assert_eq!(
            state,
            AuthState::LoggedOut {
                reason: Some(LogoutReason::NoStoredSession)
            }
        );
        assert!(store.snapshot().is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_shutdown_disarms_but_keeps_record() {
        let store = Arc::new(MemorySessionStore::new());
        let (manager, _) = manager_with(store.clone());

        manager.login("tok", "u1");
        manager.shutdown();
        assert!(!manager.has_timer());

        tokio::time::advance(StdDuration::from_secs(600)).await;
        tokio::task::yield_now().await;
        assert!(store.snapshot().is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn test_restart_through_store_round_trip() {
        let store = Arc::new(MemorySessionStore::new());
        let clock = TokioClock::starting_at(t0());
        let first = SessionManager::new(store.clone(), Arc::new(clock), Duration::minutes(5));
        let session = first.login("tok", "u1");
        drop(first);

        tokio::time::advance(StdDuration::from_secs(60)).await;
        let second = SessionManager::restore(store.clone(), Arc::new(clock), Duration::minutes(5));
        assert_eq!(second.current_session(), Some(session.clone()));
        assert_eq!(
            second
                .current_session()
                .unwrap()
                .seconds_until_expiry(second.now()),
            240
        );
    }
}
