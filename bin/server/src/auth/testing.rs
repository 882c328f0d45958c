//! Test doubles shared by the auth tests.

use super::config::AuthConfig;
use super::context::AuthContext;
use super::store::DirectorySessionStore;
use async_trait::async_trait;
use axum::body::to_bytes;
use axum::http::header;
use axum::response::Response;
use cartpal_core::Result;
use cartpal_platform_access::{
    AuthSettings, AuthenticationError, IdentityVerifier, SessionArtifact, VerifiedToken,
};
use serde_json::{Value as JsonValue, json};
use std::collections::HashMap;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tempfile::TempDir;

pub(crate) const COOKIE_NAME: &str = "__session";
const ARTIFACT_PREFIX: &str = "artifact-";

#[derive(Default)]
struct State {
    tokens: Mutex<HashMap<String, JsonValue>>,
    calls: AtomicUsize,
    minted: AtomicUsize,
}

/// In-memory identity provider. Known tokens verify to their claims;
/// minted artifacts are `artifact-<token>` and verify while the token is
/// still known.
#[derive(Clone, Default)]
pub(crate) struct FakeVerifier {
    state: Arc<State>,
    delay: Option<Duration>,
}

impl FakeVerifier {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn with_token(self, token: &str, claims: JsonValue) -> Self {
        self.state
            .tokens
            .lock()
            .unwrap()
            .insert(token.to_owned(), claims);
        self
    }

    pub(crate) fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub(crate) fn revoke(&self, token: &str) {
        self.state.tokens.lock().unwrap().remove(token);
    }

    /// Provider calls made so far, of any kind.
    pub(crate) fn calls(&self) -> usize {
        self.state.calls.load(Ordering::SeqCst)
    }

    pub(crate) fn minted(&self) -> usize {
        self.state.minted.load(Ordering::SeqCst)
    }

    async fn lookup(&self, token: &str) -> Result<VerifiedToken, AuthenticationError> {
        self.state.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        let claims = self.state.tokens.lock().unwrap().get(token).cloned();
        let claims = claims.ok_or_else(|| AuthenticationError::InvalidCredential {
            reason: "unknown token".to_string(),
        })?;
        Ok(VerifiedToken::from_claims(claims)?)
    }
}

#[async_trait]
impl IdentityVerifier for FakeVerifier {
    async fn verify_bearer(&self, token: &str) -> Result<VerifiedToken, AuthenticationError> {
        self.lookup(token).await
    }

    async fn mint_session(
        &self,
        token: &str,
        _ttl: Duration,
    ) -> Result<SessionArtifact, AuthenticationError> {
        self.lookup(token).await?;
        self.state.minted.fetch_add(1, Ordering::SeqCst);
        Ok(SessionArtifact::new(format!("{ARTIFACT_PREFIX}{token}")))
    }

    async fn verify_session(
        &self,
        artifact: &SessionArtifact,
    ) -> Result<VerifiedToken, AuthenticationError> {
        let token = artifact
            .as_str()
            .strip_prefix(ARTIFACT_PREFIX)
            .unwrap_or_default();
        self.lookup(token).await
    }
}

/// Claims of a user who signed in just now.
pub(crate) fn fresh_claims(uid: &str) -> JsonValue {
    json!({ "uid": uid, "auth_time": chrono::Utc::now().timestamp() })
}

pub(crate) fn test_settings(dir: &Path) -> AuthSettings {
    AuthSettings::new(COOKIE_NAME, dir, "/login")
}

/// A context with default policies over a fresh session directory. Keep
/// the returned directory alive for the duration of the test.
pub(crate) async fn test_context(verifier: FakeVerifier) -> (AuthContext, TempDir) {
    let dir = tempfile::tempdir().expect("tempdir");
    let config = AuthConfig::builder(test_settings(dir.path()))
        .build()
        .expect("valid config");
    let store = DirectorySessionStore::open(dir.path())
        .await
        .expect("open store");
    (AuthContext::new(Arc::new(verifier), config, store), dir)
}

pub(crate) async fn body_text(response: Response) -> String {
    let bytes = to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("read body");
    String::from_utf8(bytes.to_vec()).expect("utf-8 body")
}

fn session_set_cookies(response: &Response) -> impl Iterator<Item = &str> {
    response
        .headers()
        .get_all(header::SET_COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .filter(|value| value.starts_with(&format!("{COOKIE_NAME}=")))
}

/// Value of the session cookie the response sets, if any.
pub(crate) fn session_cookie_value(response: &Response) -> Option<String> {
    session_set_cookies(response)
        .filter(|value| !value.contains("Max-Age=0"))
        .find_map(|value| {
            value
                .split(';')
                .next()
                .and_then(|pair| pair.split_once('='))
                .map(|(_, v)| v.to_owned())
        })
}

/// Whether the response tells the browser to drop the session cookie.
pub(crate) fn removes_session_cookie(response: &Response) -> bool {
    session_set_cookies(response).any(|value| value.contains("Max-Age=0"))
}
