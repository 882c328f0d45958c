//! Server-side session records.
//!
//! A session is created by session login after the provider minted a
//! session artifact. The cookie carries only the [`SessionId`]; the record
//! with the artifact lives in session storage until logout, expiry or a
//! failed verification removes it.

use crate::auth::SessionArtifact;
use cartpal_core::SessionId;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// A persisted login session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    /// Unique identifier for this session.
    id: SessionId,
    /// Subject the session was issued to.
    uid: String,
    /// Provider-issued artifact, re-verified on every request.
    artifact: SessionArtifact,
    /// When the session was created.
    created_at: DateTime<Utc>,
    /// When the session expires.
    expires_at: DateTime<Utc>,
}

impl Session {
    /// Creates a new session valid for `duration` from now.
    #[must_use]
    pub fn new(id: SessionId, uid: String, artifact: SessionArtifact, duration: Duration) -> Self {
        let now = Utc::now();
        Self {
            id,
            uid,
            artifact,
            created_at: now,
            expires_at: now + duration,
        }
    }

    #[must_use]
    pub fn id(&self) -> &SessionId {
        &self.id
    }

    #[must_use]
    pub fn uid(&self) -> &str {
        &self.uid
    }

    #[must_use]
    pub fn artifact(&self) -> &SessionArtifact {
        &self.artifact
    }

    #[must_use]
    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    #[must_use]
    pub fn expires_at(&self) -> DateTime<Utc> {
        self.expires_at
    }

    /// Returns true if the session has expired.
    #[must_use]
    pub fn is_expired(&self) -> bool {
        Utc::now() >= self.expires_at
    }
}
