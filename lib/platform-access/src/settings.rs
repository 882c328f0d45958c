//! Auth layer settings.
//!
//! These are the raw, deserializable settings collected at process start.
//! Mandatory values are optional at the type level so that a missing value
//! is reported as a [`ConfigurationError`] by [`AuthSettings::validate`]
//! rather than as an opaque deserialization failure.

use crate::error::ConfigurationError;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Settings for cookie sessions, challenges and login redirects.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthSettings {
    /// Name of the session cookie. Required.
    #[serde(default)]
    cookie_name: Option<String>,
    /// Directory holding one file per session. Required.
    #[serde(default)]
    session_storage_path: Option<PathBuf>,
    /// Login page unauthenticated browsers are redirected to. Required.
    #[serde(default)]
    login_url: Option<String>,
    /// Base64 key (at least 64 bytes decoded) used to sign the cookie value.
    #[serde(default)]
    sign_key: Option<String>,
    /// Base64 key (at least 64 bytes decoded) used to encrypt the cookie value.
    /// Takes precedence over `sign_key`.
    #[serde(default)]
    encrypt_key: Option<String>,
    /// Session lifetime in seconds.
    /// Default: 5 days
    #[serde(default = "default_session_ttl_seconds")]
    session_ttl_seconds: u64,
    /// Realm advertised in `WWW-Authenticate` challenges.
    /// Default: "cartpal"
    #[serde(default = "default_realm")]
    realm: String,
    /// Prefix the session endpoints are mounted under. Empty means root.
    #[serde(default)]
    mount_path: String,
    /// Upper bound on a single identity provider call, in seconds.
    /// Default: 5
    #[serde(default = "default_verifier_timeout_seconds")]
    verifier_timeout_seconds: u64,
    /// Interval between expired-session sweeps, in seconds.
    /// Default: 3600
    #[serde(default = "default_cleanup_interval_seconds")]
    cleanup_interval_seconds: u64,
}

/// Shortest session the identity provider will mint (5 minutes).
pub const MIN_SESSION_TTL_SECONDS: u64 = 5 * 60;

/// Longest session the identity provider will mint (2 weeks).
pub const MAX_SESSION_TTL_SECONDS: u64 = 14 * 24 * 60 * 60;

fn default_session_ttl_seconds() -> u64 {
    5 * 24 * 60 * 60
}

fn default_realm() -> String {
    "cartpal".to_string()
}

fn default_verifier_timeout_seconds() -> u64 {
    5
}

fn default_cleanup_interval_seconds() -> u64 {
    3600
}

impl Default for AuthSettings {
    fn default() -> Self {
        Self {
            cookie_name: None,
            session_storage_path: None,
            login_url: None,
            sign_key: None,
            encrypt_key: None,
            session_ttl_seconds: default_session_ttl_seconds(),
            realm: default_realm(),
            mount_path: String::new(),
            verifier_timeout_seconds: default_verifier_timeout_seconds(),
            cleanup_interval_seconds: default_cleanup_interval_seconds(),
        }
    }
}

impl AuthSettings {
    /// Creates settings with the three mandatory values and defaults for
    /// everything else.
    #[must_use]
    pub fn new(
        cookie_name: impl Into<String>,
        session_storage_path: impl Into<PathBuf>,
        login_url: impl Into<String>,
    ) -> Self {
        Self {
            cookie_name: Some(cookie_name.into()),
            session_storage_path: Some(session_storage_path.into()),
            login_url: Some(login_url.into()),
            ..Self::default()
        }
    }

    /// Sets the cookie signing key.
    #[must_use]
    pub fn with_sign_key(mut self, key: impl Into<String>) -> Self {
        self.sign_key = Some(key.into());
        self
    }

    /// Sets the cookie encryption key.
    #[must_use]
    pub fn with_encrypt_key(mut self, key: impl Into<String>) -> Self {
        self.encrypt_key = Some(key.into());
        self
    }

    /// Sets the session lifetime.
    #[must_use]
    pub fn with_session_ttl(mut self, ttl: Duration) -> Self {
        self.session_ttl_seconds = ttl.as_secs();
        self
    }

    /// Sets the challenge realm.
    #[must_use]
    pub fn with_realm(mut self, realm: impl Into<String>) -> Self {
        self.realm = realm.into();
        self
    }

    /// Sets the mount prefix of the session endpoints.
    #[must_use]
    pub fn with_mount_path(mut self, mount_path: impl Into<String>) -> Self {
        self.mount_path = mount_path.into();
        self
    }

    /// Sets the identity provider call timeout.
    #[must_use]
    pub fn with_verifier_timeout(mut self, timeout: Duration) -> Self {
        self.verifier_timeout_seconds = timeout.as_secs();
        self
    }

    /// Checks that mandatory values are present and the rest are usable.
    ///
    /// # Errors
    ///
    /// Returns the first problem found.
    pub fn validate(&self) -> Result<(), ConfigurationError> {
        require_text(self.cookie_name.as_deref(), "cookie_name")?;
        require_text(
            self.session_storage_path
                .as_deref()
                .and_then(Path::to_str),
            "session_storage_path",
        )?;
        require_text(self.login_url.as_deref(), "login_url")?;

        if !(MIN_SESSION_TTL_SECONDS..=MAX_SESSION_TTL_SECONDS).contains(&self.session_ttl_seconds) {
            return Err(ConfigurationError::InvalidField {
                field: "session_ttl_seconds",
                reason: format!(
                    "must be between {MIN_SESSION_TTL_SECONDS} and {MAX_SESSION_TTL_SECONDS}"
                ),
            });
        }
        for (field, value) in [
            ("verifier_timeout_seconds", self.verifier_timeout_seconds),
            ("cleanup_interval_seconds", self.cleanup_interval_seconds),
        ] {
            if value == 0 {
                return Err(ConfigurationError::InvalidField {
                    field,
                    reason: "must be greater than zero".to_string(),
                });
            }
        }
        if !self.mount_path.is_empty() && !self.mount_path.starts_with('/') {
            return Err(ConfigurationError::InvalidField {
                field: "mount_path",
                reason: "must be empty or start with '/'".to_string(),
            });
        }
        Ok(())
    }

    #[must_use]
    pub fn cookie_name(&self) -> Option<&str> {
        self.cookie_name.as_deref()
    }

    #[must_use]
    pub fn session_storage_path(&self) -> Option<&Path> {
        self.session_storage_path.as_deref()
    }

    #[must_use]
    pub fn login_url(&self) -> Option<&str> {
        self.login_url.as_deref()
    }

    #[must_use]
    pub fn sign_key(&self) -> Option<&str> {
        self.sign_key.as_deref()
    }

    #[must_use]
    pub fn encrypt_key(&self) -> Option<&str> {
        self.encrypt_key.as_deref()
    }

    #[must_use]
    pub fn session_ttl(&self) -> Duration {
        Duration::from_secs(self.session_ttl_seconds)
    }

    #[must_use]
    pub fn realm(&self) -> &str {
        &self.realm
    }

    /// Returns the mount prefix without a trailing slash.
    #[must_use]
    pub fn mount_path(&self) -> &str {
        self.mount_path.trim_end_matches('/')
    }

    #[must_use]
    pub fn verifier_timeout(&self) -> Duration {
        Duration::from_secs(self.verifier_timeout_seconds)
    }

    #[must_use]
    pub fn cleanup_interval(&self) -> Duration {
        Duration::from_secs(self.cleanup_interval_seconds)
    }
}

fn require_text(value: Option<&str>, field: &'static str) -> Result<(), ConfigurationError> {
    match value {
        Some(v) if !v.trim().is_empty() => Ok(()),
        _ => Err(ConfigurationError::MissingField { field }),
    }
}
