use std::collections::BTreeMap;
use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::Mutex;
use tracing::warn;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum SessionLogError {
    #[error("session log I/O on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("session log serialization: {0}")]
    Json(#[from] serde_json::Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggedMessage {
    pub timestamp: DateTime<Utc>,
    pub role: Role,
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionRecord {
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_activity: Option<DateTime<Utc>>,
    #[serde(default)]
    pub messages: Vec<LoggedMessage>,
}

impl SessionRecord {
    fn new(model: Option<&str>) -> Self {
        Self {
            created_at: Utc::now(),
            model: model.map(str::to_string),
            last_activity: None,
            messages: Vec::new(),
        }
    }
}

/// On-disk shape of `chat_sessions.json`.
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct SessionLogFile {
    #[serde(default)]
    pub sessions: BTreeMap<String, SessionRecord>,
}

/// Short session id: the first 8 characters of a v4 UUID.
pub fn new_session_id() -> String {
    Uuid::new_v4().simple().to_string()[..8].to_string()
}

/// Append-only JSON log of chat sessions.
///
/// Every write is a read-modify-write of the whole file, serialised by `lock`.
pub struct SessionLog {
    path: PathBuf,
    lock: Mutex<()>,
}

impl SessionLog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    #[cfg(test)]
    pub fn path(&self) -> &std::path::Path {
        &self.path
    }

    /// Records a new, empty session.
    pub async fn start(&self, session_id: &str) -> Result<(), SessionLogError> {
        let _guard = self.lock.lock().await;
        let mut log = self.load().await?;
        log.sessions
            .insert(session_id.to_string(), SessionRecord::new(None));
        self.save(&log).await
    }

    /// Appends one message, creating the session on first use. `model` is the
    /// "provider/model" label; it is stored on the session and on assistant messages.
    pub async fn append(
        &self,
        session_id: &str,
        role: Role,
        content: &str,
        model: &str,
    ) -> Result<(), SessionLogError> {
        let _guard = self.lock.lock().await;
        let mut log = self.load().await?;

        let now = Utc::now();
        let session = log
            .sessions
            .entry(session_id.to_string())
            .or_insert_with(|| SessionRecord::new(Some(model)));
        session.messages.push(LoggedMessage {
            timestamp: now,
            role,
            content: content.to_string(),
            model: (role == Role::Assistant).then(|| model.to_string()),
        });
        session.last_activity = Some(now);

        self.save(&log).await
    }

    #[cfg(test)]
    pub async fn read(&self) -> Result<SessionLogFile, SessionLogError> {
        let _guard = self.lock.lock().await;
        self.load().await
    }

    /// A missing file is an empty log; a corrupt one is logged and replaced on next save.
    async fn load(&self) -> Result<SessionLogFile, SessionLogError> {
        let raw = match tokio::fs::read_to_string(&self.path).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Ok(SessionLogFile::default())
            }
            Err(source) => {
                return Err(SessionLogError::Io {
                    path: self.path.clone(),
                    source,
                })
            }
        };

        match serde_json::from_str(&raw) {
            Ok(log) => Ok(log),
            Err(e) => {
                warn!(
                    "Chat session log {} is unreadable ({e}); starting a fresh log",
                    self.path.display()
                );
                Ok(SessionLogFile::default())
            }
        }
    }

    async fn save(&self, log: &SessionLogFile) -> Result<(), SessionLogError> {
        let io_err = |source| SessionLogError::Io {
            path: self.path.clone(),
            source,
        };

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await.map_err(io_err)?;
        }
        let body = serde_json::to_vec_pretty(log)?;
        tokio::fs::write(&self.path, body).await.map_err(io_err)
    }
}
