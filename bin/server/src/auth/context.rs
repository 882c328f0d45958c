//! The auth layer's shared handle.
//!
//! [`AuthContext`] is built once in `main` and cloned into every layer and
//! handler that needs it. It owns the only path to the identity provider,
//! so every provider call here is bounded by the configured timeout.

use super::config::{AuthConfig, LOGGED_IN_PATH, LOGOUT_PATH, SESSION_LOGIN_PATH};
use super::store::{DirectorySessionStore, SessionStoreError};
use super::{middleware, redirect, routes};
use axum::Router;
use axum::middleware::from_fn_with_state;
use axum::routing::{get, post};
use cartpal_core::SessionId;
use cartpal_platform_access::{
    AuthenticationError, Credential, IdentityVerifier, Session, SessionArtifact, VerifiedToken,
};
use rootcause::prelude::Report;
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

/// Verifier, configuration and session storage, shared by reference.
#[derive(Clone)]
pub struct AuthContext {
    verifier: Arc<dyn IdentityVerifier>,
    config: Arc<AuthConfig>,
    sessions: DirectorySessionStore,
}

impl AuthContext {
    #[must_use]
    pub fn new(
        verifier: Arc<dyn IdentityVerifier>,
        config: AuthConfig,
        sessions: DirectorySessionStore,
    ) -> Self {
        Self {
            verifier,
            config: Arc::new(config),
            sessions,
        }
    }

    #[must_use]
    pub fn config(&self) -> &AuthConfig {
        &self.config
    }

    #[must_use]
    pub fn sessions(&self) -> &DirectorySessionStore {
        &self.sessions
    }

    async fn bounded<T, F>(&self, call: &'static str, pending: F) -> Result<T, Report<AuthenticationError>>
    where
        F: Future<Output = Result<T, Report<AuthenticationError>>>,
    {
        let limit = self.config.verifier_timeout();
        match tokio::time::timeout(limit, pending).await {
            Ok(outcome) => outcome,
            Err(_) => Err(AuthenticationError::ProviderUnavailable {
                reason: format!("{call} timed out after {}s", limit.as_secs()),
            }
            .into()),
        }
    }

    /// Verifies a credential with the identity provider.
    ///
    /// # Errors
    ///
    /// Returns an error if the credential is blank or rejected, or if the
    /// provider fails or does not answer in time.
    #[instrument(skip_all, fields(kind = credential.kind()))]
    pub async fn verify(
        &self,
        credential: Credential<'_>,
    ) -> Result<VerifiedToken, Report<AuthenticationError>> {
        match credential {
            Credential::Bearer(token) if token.trim().is_empty() => {
                Err(AuthenticationError::InvalidCredential {
                    reason: "empty bearer token".to_string(),
                }
                .into())
            }
            Credential::Bearer(token) => {
                self.bounded("bearer verification", self.verifier.verify_bearer(token))
                    .await
            }
            Credential::Session(artifact) => {
                self.bounded("session verification", self.verifier.verify_session(artifact))
                    .await
            }
        }
    }

    /// Exchanges an ID token for a session artifact valid for the
    /// configured session lifetime.
    ///
    /// # Errors
    ///
    /// Returns an error if the provider refuses or does not answer in time.
    #[instrument(skip_all)]
    pub async fn mint_session(
        &self,
        id_token: &str,
    ) -> Result<SessionArtifact, Report<AuthenticationError>> {
        let ttl = self.config.session_ttl();
        self.bounded("session minting", self.verifier.mint_session(id_token, ttl))
            .await
    }

    /// Persists a new session for `token` and returns it.
    ///
    /// # Errors
    ///
    /// Returns an error if the session cannot be stored.
    pub async fn start_session(
        &self,
        token: &VerifiedToken,
        artifact: SessionArtifact,
    ) -> Result<Session, Report<SessionStoreError>> {
        let ttl_seconds = i64::try_from(self.config.session_ttl().as_secs()).unwrap_or(i64::MAX);
        let session = Session::new(
            SessionId::new(),
            token.uid().to_owned(),
            artifact,
            chrono::Duration::seconds(ttl_seconds),
        );
        self.sessions.create(&session).await?;
        info!(uid = %session.uid(), session_id = %session.id(), "Session started");
        Ok(session)
    }

    fn session_id_from_cookie(&self, cookie_value: &str) -> Result<SessionId, AuthenticationError> {
        let opened = self
            .config
            .codec()
            .open(self.config.cookie_name(), cookie_value)
            .ok_or_else(|| AuthenticationError::InvalidSession {
                reason: "cookie failed integrity check".to_string(),
            })?;
        opened
            .parse()
            .map_err(|e| AuthenticationError::InvalidSession {
                reason: format!("{e}"),
            })
    }

    /// Resolves a session cookie value to verified claims.
    ///
    /// On any failure after the session id is known, the stored record is
    /// deleted so the session cannot be retried.
    ///
    /// # Errors
    ///
    /// Returns an error if the cookie is not a valid session reference, the
    /// session is unknown or expired, or the provider rejects the artifact.
    pub async fn resume_session(
        &self,
        cookie_value: &str,
    ) -> Result<VerifiedToken, Report<AuthenticationError>> {
        let id = self.session_id_from_cookie(cookie_value)?;

        let session = match self.sessions.find_by_id(&id).await {
            Ok(Some(session)) => session,
            Ok(None) => {
                return Err(AuthenticationError::InvalidSession {
                    reason: format!("session {id} not found"),
                }
                .into());
            }
            Err(report) => {
                return Err(AuthenticationError::InvalidSession {
                    reason: format!("session {id} could not be loaded: {report}"),
                }
                .into());
            }
        };

        let outcome = self.check_session(&session).await;
        if outcome.is_err() {
            self.discard(&id).await;
        }
        outcome
    }

    async fn check_session(
        &self,
        session: &Session,
    ) -> Result<VerifiedToken, Report<AuthenticationError>> {
        if session.is_expired() {
            return Err(AuthenticationError::InvalidSession {
                reason: format!("session {} expired at {}", session.id(), session.expires_at()),
            }
            .into());
        }

        let token = self.verify(Credential::Session(session.artifact())).await?;
        if token.uid() != session.uid() {
            return Err(AuthenticationError::InvalidSession {
                reason: format!("session {} belongs to another subject", session.id()),
            }
            .into());
        }
        Ok(token)
    }

    async fn discard(&self, id: &SessionId) {
        if let Err(report) = self.sessions.delete(id).await {
            warn!(session_id = %id, error = %report, "Failed to delete rejected session");
        }
    }

    /// Ends the session a cookie refers to. Returns whether a stored
    /// session was removed; unknown or malformed cookies are not an error.
    pub async fn end_session(&self, cookie_value: &str) -> bool {
        let Ok(id) = self.session_id_from_cookie(cookie_value) else {
            debug!("Ignoring unreadable session cookie on logout");
            return false;
        };
        match self.sessions.delete(&id).await {
            Ok(removed) => {
                if removed {
                    info!(session_id = %id, "Session ended");
                }
                removed
            }
            Err(report) => {
                warn!(session_id = %id, error = %report, "Failed to delete session");
                false
            }
        }
    }

    /// The session endpoints, with paths relative to the mount point.
    pub fn routes<S>(&self) -> Router<S>
    where
        S: Clone + Send + Sync + 'static,
    {
        let logged_in = self.protect(Router::new().route(LOGGED_IN_PATH, get(routes::logged_in)));
        Router::new()
            .route(SESSION_LOGIN_PATH, post(routes::session_login))
            .route(LOGOUT_PATH, get(routes::logout))
            .merge(logged_in)
            .with_state(self.clone())
    }

    /// Requires authentication on every route already added to `router`.
    ///
    /// Role guards added before this call run after authentication. The
    /// router must have at least one route.
    pub fn protect<S>(&self, router: Router<S>) -> Router<S>
    where
        S: Clone + Send + Sync + 'static,
    {
        router.route_layer(from_fn_with_state(self.clone(), middleware::authenticate))
    }

    /// Mounts the session endpoints on `app` and wraps the whole
    /// application in the login redirect.
    pub fn install<S>(&self, app: Router<S>) -> Router<S>
    where
        S: Clone + Send + Sync + 'static,
    {
        let mount = self.config.mount_path();
        let app = if mount.is_empty() {
            app.merge(self.routes())
        } else {
            app.nest(mount, self.routes())
        };
        app.layer(from_fn_with_state(
            self.clone(),
            redirect::redirect_unauthorized,
        ))
    }
}
