//! Centralized server configuration.
//!
//! This module provides strongly-typed configuration for the server,
//! loaded via the `config` crate from environment variables
//! (`AUTH__COOKIE_NAME`, `IDENTITY__BASE_URL`, ...).
//!
//! See [`AuthSettings`](cartpal_platform_access::AuthSettings) for the
//! session and challenge settings.

use cartpal_platform_access::AuthSettings;
use serde::Deserialize;
use std::time::Duration;

/// Server configuration composed from library configs.
#[derive(Debug, Deserialize)]
pub struct ServerConfig {
    /// Address the HTTP listener binds to.
    #[serde(default = "default_bind_address")]
    pub bind_address: String,

    /// Authentication and session configuration.
    #[serde(default)]
    pub auth: AuthSettings,

    /// Identity provider connection.
    pub identity: IdentityProviderConfig,
}

/// Connection settings for the remote identity provider.
#[derive(Debug, Clone, Deserialize)]
pub struct IdentityProviderConfig {
    /// Base URL of the identity service (e.g. "https://identity.internal").
    pub base_url: String,

    /// API key sent as `x-api-key`, if the service requires one.
    #[serde(default)]
    pub api_key: Option<String>,

    /// Per-request HTTP timeout in seconds.
    #[serde(default = "default_request_timeout_seconds")]
    pub request_timeout_seconds: u64,
}

impl IdentityProviderConfig {
    #[must_use]
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_seconds)
    }
}

fn default_bind_address() -> String {
    "0.0.0.0:8080".to_string()
}

fn default_request_timeout_seconds() -> u64 {
    5
}

impl ServerConfig {
    /// Loads configuration from environment variables.
    ///
    /// # Errors
    ///
    /// Returns an error if required configuration is missing or invalid.
    pub fn from_env() -> Result<Self, config::ConfigError> {
        config::Config::builder()
            .add_source(
                config::Environment::default()
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()
    }
}
