use std::path::{Path, PathBuf};
use std::sync::Mutex;

use anyhow::{Context, Result};
use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};

use super::session::Session;

/// Session file name in cache directory
const SESSION_FILE: &str = "session.json";

/// On-disk shape of the persisted session.
///
/// Every field is optional so a partially written or hand-edited file still
/// parses; an incomplete record is treated as no session at all.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionRecord {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
    #[serde(rename = "userId", default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    /// Absolute expiry, epoch milliseconds.
    #[serde(rename = "tokenExpiry", default, skip_serializing_if = "Option::is_none")]
    pub token_expiry: Option<i64>,
}

impl SessionRecord {
    pub fn from_session(session: &Session) -> Self {
        Self {
            token: Some(session.token.clone()),
            user_id: Some(session.user_id.clone()),
            token_expiry: Some(session.expires_at.timestamp_millis()),
        }
    }

    /// Convert to a session if all three fields are present and non-empty.
    pub fn into_session(self) -> Option<Session> {
        let token = self.token.filter(|t| !t.is_empty())?;
        let user_id = self.user_id.filter(|u| !u.is_empty())?;
        let expires_at = self
            .token_expiry
            .filter(|ms| *ms > 0)
            .and_then(|ms| Utc.timestamp_millis_opt(ms).single())?;
        Some(Session {
            token,
            user_id,
            expires_at,
        })
    }

    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        self.token_expiry
            .and_then(|ms| Utc.timestamp_millis_opt(ms).single())
    }
}

/// Durable storage for the single persisted session record.
pub trait SessionStore: Send + Sync + 'static {
    fn load(&self) -> Result<Option<SessionRecord>>;
    fn save(&self, record: &SessionRecord) -> Result<()>;
    fn clear(&self) -> Result<()>;
}

/// Stores the session as JSON in the cache directory.
#[derive(Debug, Clone)]
pub struct FileSessionStore {
    cache_dir: PathBuf,
}

impl FileSessionStore {
    pub fn new(cache_dir: impl Into<PathBuf>) -> Self {
        Self {
            cache_dir: cache_dir.into(),
        }
    }

    pub fn path(&self) -> PathBuf {
        self.cache_dir.join(SESSION_FILE)
    }

    fn ensure_parent(path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }
        Ok(())
    }
}

impl SessionStore for FileSessionStore {
    fn load(&self) -> Result<Option<SessionRecord>> {
        let path = self.path();
        if !path.exists() {
            return Ok(None);
        }
        let contents = std::fs::read_to_string(&path).context("Failed to read session file")?;
        let record: SessionRecord =
            serde_json::from_str(&contents).context("Failed to parse session file")?;
        Ok(Some(record))
    }

    fn save(&self, record: &SessionRecord) -> Result<()> {
        let path = self.path();
        Self::ensure_parent(&path)?;
        let contents = serde_json::to_string_pretty(record)?;
        std::fs::write(&path, contents).context("Failed to write session file")?;
        Ok(())
    }

    fn clear(&self) -> Result<()> {
        let path = self.path();
        if path.exists() {
            std::fs::remove_file(&path).context("Failed to remove session file")?;
        }
        Ok(())
    }
}

/// In-memory store, for tests and embedders that do not want disk persistence.
#[derive(Debug, Default)]
pub struct MemorySessionStore {
    record: Mutex<Option<SessionRecord>>,
}

impl MemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_record(record: SessionRecord) -> Self {
        Self {
            record: Mutex::new(Some(record)),
        }
    }

    /// Current stored record, if any.
    pub fn snapshot(&self) -> Option<SessionRecord> {
        self.record
            .lock()
            .map(|guard| guard.clone())
            .unwrap_or_else(|poisoned| poisoned.into_inner().clone())
    }
}

impl SessionStore for MemorySessionStore {
    fn load(&self) -> Result<Option<SessionRecord>> {
        Ok(self.snapshot())
    }

    fn save(&self, record: &SessionRecord) -> Result<()> {
        let mut guard = self
            .record
            .lock()
            .map_err(|_| anyhow::anyhow!("session store lock poisoned"))?;
        *guard = Some(record.clone());
        Ok(())
    }

    fn clear(&self) -> Result<()> {
        let mut guard = self
            .record
            .lock()
            .map_err(|_| anyhow::anyhow!("session store lock poisoned"))?;
        *guard = None;
        Ok(())
    }
}
