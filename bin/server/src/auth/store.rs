//! Session storage on the local filesystem.
//!
//! One JSON file per session, named after the session id. Writes go to a
//! temporary file first and are renamed into place, so readers never see
//! a half-written record.

use cartpal_core::SessionId;
use cartpal_platform_access::Session;
use rootcause::prelude::Report;
use std::fmt;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{debug, warn};

const RECORD_EXTENSION: &str = "json";

/// Session storage failures.
#[derive(Debug)]
pub enum SessionStoreError {
    /// Reading or writing the storage directory failed.
    Io { path: PathBuf, details: String },
    /// A record exists but cannot be decoded.
    Corrupt { path: PathBuf, details: String },
}

impl fmt::Display for SessionStoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io { path, details } => {
                write!(f, "session storage error at {}: {details}", path.display())
            }
            Self::Corrupt { path, details } => {
                write!(f, "corrupt session record {}: {details}", path.display())
            }
        }
    }
}

impl std::error::Error for SessionStoreError {}

fn io_error(path: &Path, err: &std::io::Error) -> SessionStoreError {
    SessionStoreError::Io {
        path: path.to_path_buf(),
        details: err.to_string(),
    }
}

/// Directory-backed repository for [`Session`] records.
#[derive(Debug, Clone)]
pub struct DirectorySessionStore {
    root: PathBuf,
}

impl DirectorySessionStore {
    /// Opens the store, creating the directory if needed.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory cannot be created.
    pub async fn open(root: impl Into<PathBuf>) -> Result<Self, Report<SessionStoreError>> {
        let root = root.into();
        fs::create_dir_all(&root)
            .await
            .map_err(|e| io_error(&root, &e))?;
        Ok(Self { root })
    }

    fn record_path(&self, id: &SessionId) -> PathBuf {
        self.root.join(format!("{id}.{RECORD_EXTENSION}"))
    }

    /// Persists a session, replacing any record with the same id.
    ///
    /// # Errors
    ///
    /// Returns an error if the record cannot be written.
    pub async fn create(&self, session: &Session) -> Result<(), Report<SessionStoreError>> {
        let path = self.record_path(session.id());
        let body = serde_json::to_vec(session).map_err(|e| SessionStoreError::Corrupt {
            path: path.clone(),
            details: e.to_string(),
        })?;

        let staging = path.with_extension("tmp");
        fs::write(&staging, body)
            .await
            .map_err(|e| io_error(&staging, &e))?;
        fs::rename(&staging, &path)
            .await
            .map_err(|e| io_error(&path, &e))?;
        debug!(session_id = %session.id(), "Stored session");
        Ok(())
    }

    /// Loads a session by id. A missing record is `Ok(None)`.
    ///
    /// # Errors
    ///
    /// Returns an error if the record exists but cannot be read or decoded.
    pub async fn find_by_id(
        &self,
        id: &SessionId,
    ) -> Result<Option<Session>, Report<SessionStoreError>> {
        let path = self.record_path(id);
        let body = match fs::read(&path).await {
            Ok(body) => body,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(io_error(&path, &e).into()),
        };
        let session = serde_json::from_slice(&body).map_err(|e| SessionStoreError::Corrupt {
            path,
            details: e.to_string(),
        })?;
        Ok(Some(session))
    }

    /// Removes a session. Returns whether a record existed.
    ///
    /// # Errors
    ///
    /// Returns an error if an existing record cannot be removed.
    pub async fn delete(&self, id: &SessionId) -> Result<bool, Report<SessionStoreError>> {
        let path = self.record_path(id);
        match fs::remove_file(&path).await {
            Ok(()) => {
                debug!(session_id = %id, "Deleted session");
                Ok(true)
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(e) => Err(io_error(&path, &e).into()),
        }
    }

    /// Removes every expired session and returns how many were removed.
    ///
    /// Unreadable records are removed too; they could never be resumed.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory cannot be listed.
    pub async fn delete_expired(&self) -> Result<u64, Report<SessionStoreError>> {
        let mut entries = fs::read_dir(&self.root)
            .await
            .map_err(|e| io_error(&self.root, &e))?;

        let mut deleted = 0;
        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| io_error(&self.root, &e))?
        {
            let path = entry.path();
            if path.extension().and_then(|ext| ext.to_str()) != Some(RECORD_EXTENSION) {
                continue;
            }

            let expired = match fs::read(&path).await {
                Ok(body) => serde_json::from_slice::<Session>(&body)
                    .map(|session| session.is_expired())
                    .unwrap_or(true),
                Err(e) if e.kind() == ErrorKind::NotFound => continue,
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "Skipping unreadable session record");
                    continue;
                }
            };
            if !expired {
                continue;
            }

            match fs::remove_file(&path).await {
                Ok(()) => deleted += 1,
                Err(e) if e.kind() == ErrorKind::NotFound => {}
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "Failed to remove expired session");
                }
            }
        }
        Ok(deleted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cartpal_platform_access::SessionArtifact;
    use chrono::Duration;

    fn session(duration: Duration) -> Session {
        Session::new(
            SessionId::new(),
            "u1".to_string(),
            SessionArtifact::new("artifact-1".to_string()),
            duration,
        )
    }

    #[tokio::test]
    async fn create_then_find() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = DirectorySessionStore::open(dir.path()).await.expect("open");
        let session = session(Duration::hours(1));

        store.create(&session).await.expect("create");
        let found = store.find_by_id(session.id()).await.expect("find");

        assert_eq!(found, Some(session));
    }

    #[tokio::test]
    async fn find_unknown_is_none() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = DirectorySessionStore::open(dir.path()).await.expect("open");

        let found = store.find_by_id(&SessionId::new()).await.expect("find");
        assert!(found.is_none());
    }

    #[tokio::test]
    async fn delete_reports_presence() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = DirectorySessionStore::open(dir.path()).await.expect("open");
        let session = session(Duration::hours(1));
        store.create(&session).await.expect("create");

        assert!(store.delete(session.id()).await.expect("delete"));
        assert!(!store.delete(session.id()).await.expect("delete again"));
        assert!(store.find_by_id(session.id()).await.expect("find").is_none());
    }

    #[tokio::test]
    async fn delete_expired_keeps_live_sessions() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = DirectorySessionStore::open(dir.path()).await.expect("open");
        let live = session(Duration::hours(1));
        let expired = session(Duration::seconds(-1));
        store.create(&live).await.expect("create live");
        store.create(&expired).await.expect("create expired");
        std::fs::write(dir.path().join("notes.txt"), "ignored").expect("write");

        assert_eq!(store.delete_expired().await.expect("sweep"), 1);
        assert!(store.find_by_id(live.id()).await.expect("find").is_some());
        assert!(store.find_by_id(expired.id()).await.expect("find").is_none());
        assert!(dir.path().join("notes.txt").exists());
    }

    #[tokio::test]
    async fn corrupt_record_is_an_error() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = DirectorySessionStore::open(dir.path()).await.expect("open");
        let id = SessionId::new();
        std::fs::write(dir.path().join(format!("{id}.json")), "{not json").expect("write");

        let err = store.find_by_id(&id).await.unwrap_err();
        assert!(matches!(
            err.current_context(),
            SessionStoreError::Corrupt { .. }
        ));
    }
}
