//! HTTP client for the identity provider.

use crate::config::IdentityProviderConfig;
use async_trait::async_trait;
use cartpal_core::Result;
use cartpal_platform_access::{
    AuthenticationError, ConfigurationError, IdentityVerifier, SessionArtifact, VerifiedToken,
};
use rootcause::prelude::Report;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Value as JsonValue, json};
use std::time::Duration;
use tracing::{debug, instrument};

const VERIFY_TOKEN_PATH: &str = "/v1/tokens:verify";
const CREATE_SESSION_PATH: &str = "/v1/sessions";
const VERIFY_SESSION_PATH: &str = "/v1/sessions:verify";

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct MintedSession {
    session_cookie: String,
}

/// [`IdentityVerifier`] backed by the identity service's JSON API.
///
/// Rejections (4xx) become `InvalidCredential`; transport failures, 5xx
/// answers and unreadable bodies become `ProviderUnavailable`.
#[derive(Debug, Clone)]
pub struct HttpIdentityVerifier {
    client: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
}

impl HttpIdentityVerifier {
    /// Creates a client for the configured identity service.
    ///
    /// # Errors
    ///
    /// Returns an error if the base URL is blank or the HTTP client cannot
    /// be built.
    pub fn new(config: &IdentityProviderConfig) -> Result<Self, ConfigurationError> {
        let base_url = config.base_url.trim().trim_end_matches('/').to_owned();
        if base_url.is_empty() {
            return Err(ConfigurationError::MissingField {
                field: "identity.base_url",
            }
            .into());
        }

        let client = reqwest::Client::builder()
            .redirect(reqwest::redirect::Policy::none())
            .timeout(config.request_timeout())
            .build()
            .map_err(|e| ConfigurationError::InvalidField {
                field: "identity",
                reason: format!("failed to create HTTP client: {e}"),
            })?;

        Ok(Self {
            client,
            base_url,
            api_key: config.api_key.clone(),
        })
    }

    #[instrument(skip(self, body))]
    async fn call<B, T>(&self, path: &'static str, body: &B) -> Result<T, AuthenticationError>
    where
        B: Serialize + ?Sized + Sync,
        T: DeserializeOwned,
    {
        let mut request = self
            .client
            .post(format!("{}{path}", self.base_url))
            .json(body);
        if let Some(key) = &self.api_key {
            request = request.header("x-api-key", key);
        }

        let response = request
            .send()
            .await
            .map_err(|e| AuthenticationError::ProviderUnavailable {
                reason: format!("request to {path} failed: {e}"),
            })?;

        let status = response.status();
        debug!(status = %status, "Identity provider answered");
        if status.is_client_error() {
            return Err(AuthenticationError::InvalidCredential {
                reason: format!("{path} answered {status}"),
            }
            .into());
        }
        if !status.is_success() {
            return Err(AuthenticationError::ProviderUnavailable {
                reason: format!("{path} answered {status}"),
            }
            .into());
        }

        response
            .json::<T>()
            .await
            .map_err(|e| -> Report<AuthenticationError> {
                AuthenticationError::ProviderUnavailable {
                    reason: format!("unreadable answer from {path}: {e}"),
                }
                .into()
            })
    }
}

#[async_trait]
impl IdentityVerifier for HttpIdentityVerifier {
    async fn verify_bearer(&self, token: &str) -> Result<VerifiedToken, AuthenticationError> {
        let claims: JsonValue = self
            .call(VERIFY_TOKEN_PATH, &json!({ "idToken": token }))
            .await?;
        Ok(VerifiedToken::from_claims(claims)?)
    }

    async fn mint_session(
        &self,
        token: &str,
        ttl: Duration,
    ) -> Result<SessionArtifact, AuthenticationError> {
        let minted: MintedSession = self
            .call(
                CREATE_SESSION_PATH,
                &json!({ "idToken": token, "validDurationSeconds": ttl.as_secs() }),
            )
            .await?;
        Ok(SessionArtifact::new(minted.session_cookie))
    }

    async fn verify_session(
        &self,
        artifact: &SessionArtifact,
    ) -> Result<VerifiedToken, AuthenticationError> {
        let claims: JsonValue = self
            .call(
                VERIFY_SESSION_PATH,
                &json!({ "sessionCookie": artifact.as_str() }),
            )
            .await?;
        Ok(VerifiedToken::from_claims(claims)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::{HeaderMap, StatusCode};
    use axum::response::{IntoResponse, Response};
    use axum::routing::post;
    use axum::{Json, Router};

    async fn verify_token(Json(body): Json<JsonValue>) -> Response {
        match body["idToken"].as_str() {
            Some("good") => Json(json!({"uid": "u1", "roles": ["admin"]})).into_response(),
            Some("no-subject") => Json(json!({"email": "a@example.com"})).into_response(),
            Some("boom") => StatusCode::SERVICE_UNAVAILABLE.into_response(),
            _ => StatusCode::UNAUTHORIZED.into_response(),
        }
    }

    async fn create_session(headers: HeaderMap, Json(body): Json<JsonValue>) -> Response {
        if headers.get("x-api-key").and_then(|v| v.to_str().ok()) != Some("secret") {
            return StatusCode::FORBIDDEN.into_response();
        }
        let ttl = body["validDurationSeconds"].as_u64().unwrap_or_default();
        Json(json!({"sessionCookie": format!("minted-{ttl}")})).into_response()
    }

    async fn verify_session(Json(body): Json<JsonValue>) -> Response {
        match body["sessionCookie"].as_str() {
            Some("minted-600") => Json(json!({"uid": "u1"})).into_response(),
            _ => StatusCode::UNAUTHORIZED.into_response(),
        }
    }

    async fn provider(api_key: Option<&str>) -> HttpIdentityVerifier {
        let app = Router::new()
            .route(VERIFY_TOKEN_PATH, post(verify_token))
            .route(CREATE_SESSION_PATH, post(create_session))
            .route(VERIFY_SESSION_PATH, post(verify_session));
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        HttpIdentityVerifier::new(&IdentityProviderConfig {
            base_url: format!("http://{addr}/"),
            api_key: api_key.map(str::to_owned),
            request_timeout_seconds: 5,
        })
        .expect("valid client")
    }

    #[tokio::test]
    async fn verifies_bearer_tokens() {
        let verifier = provider(None).await;

        let token = verifier.verify_bearer("good").await.expect("verified");
        assert_eq!(token.uid(), "u1");
        assert!(token.roles().contains("admin"));

        let err = verifier.verify_bearer("bad").await.unwrap_err();
        assert!(matches!(
            err.current_context(),
            AuthenticationError::InvalidCredential { .. }
        ));

        let err = verifier.verify_bearer("boom").await.unwrap_err();
        assert!(matches!(
            err.current_context(),
            AuthenticationError::ProviderUnavailable { .. }
        ));

        let err = verifier.verify_bearer("no-subject").await.unwrap_err();
        assert!(matches!(
            err.current_context(),
            AuthenticationError::MissingClaim { .. }
        ));
    }

    #[tokio::test]
    async fn mints_and_verifies_sessions() {
        let verifier = provider(Some("secret")).await;

        let artifact = verifier
            .mint_session("good", Duration::from_secs(600))
            .await
            .expect("minted");
        assert_eq!(artifact.as_str(), "minted-600");

        let token = verifier.verify_session(&artifact).await.expect("verified");
        assert_eq!(token.uid(), "u1");
    }

    #[tokio::test]
    async fn missing_api_key_is_rejected() {
        let verifier = provider(None).await;

        let err = verifier
            .mint_session("good", Duration::from_secs(600))
            .await
            .unwrap_err();
        assert!(matches!(
            err.current_context(),
            AuthenticationError::InvalidCredential { .. }
        ));
    }

    #[tokio::test]
    async fn unreachable_provider_is_unavailable() {
        let verifier = HttpIdentityVerifier::new(&IdentityProviderConfig {
            base_url: "http://127.0.0.1:9".to_string(),
            api_key: None,
            request_timeout_seconds: 1,
        })
        .expect("valid client");

        let err = verifier.verify_bearer("good").await.unwrap_err();
        assert!(matches!(
            err.current_context(),
            AuthenticationError::ProviderUnavailable { .. }
        ));
    }

    #[test]
    fn blank_base_url_is_rejected() {
        let err = HttpIdentityVerifier::new(&IdentityProviderConfig {
            base_url: " ".to_string(),
            api_key: None,
            request_timeout_seconds: 5,
        })
        .unwrap_err();
        assert_eq!(
            err.current_context(),
            &ConfigurationError::MissingField {
                field: "identity.base_url"
            }
        );
    }
}
