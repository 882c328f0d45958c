//! Session lifecycle endpoints: session login, logged-in check and logout.

use super::context::AuthContext;
use super::middleware::{RequireAuth, challenge};
use axum::{
    Json,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use axum_extra::extract::CookieJar;
use cartpal_platform_access::{AuthenticationError, AuthorizationError, Credential};
use chrono::Utc;
use serde::Deserialize;
use std::fmt;
use tracing::{error, info, warn};

/// Oldest sign-in a session may be minted from, in seconds.
const MAX_AUTH_AGE_SECONDS: i64 = 5 * 60;

/// Body of a session login.
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionLoginRequest {
    pub id_token: String,
}

impl fmt::Debug for SessionLoginRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SessionLoginRequest { id_token: <redacted> }")
    }
}

/// Exchanges a freshly issued ID token for a session cookie.
pub async fn session_login(
    State(auth): State<AuthContext>,
    jar: CookieJar,
    Json(body): Json<SessionLoginRequest>,
) -> Response {
    let config = auth.config();

    let token = match auth.verify(Credential::Bearer(&body.id_token)).await {
        Ok(token) => token,
        Err(report) => {
            error!(error = %report, "Session login rejected an ID token");
            return challenge(config, false);
        }
    };

    match token.auth_age(Utc::now()) {
        Some(age) if age.num_seconds() < MAX_AUTH_AGE_SECONDS => {}
        age => {
            let stale = AuthenticationError::StaleAuthTime {
                age_seconds: age.map_or(i64::MAX, |age| age.num_seconds()),
            };
            error!(uid = %token.uid(), error = %stale, "Session login requires a recent sign-in");
            return challenge(config, false);
        }
    }

    if !config.login_policy().allows_session(&token) {
        let denial = AuthorizationError::LoginNotAllowed {
            uid: token.uid().to_owned(),
        };
        warn!(reason = %denial, "Session login refused by policy");
        return (StatusCode::FORBIDDEN, denial.to_string()).into_response();
    }

    let artifact = match auth.mint_session(&body.id_token).await {
        Ok(artifact) => artifact,
        Err(report) => {
            error!(uid = %token.uid(), error = %report, "Failed to mint session");
            return challenge(config, false);
        }
    };

    let session = match auth.start_session(&token, artifact).await {
        Ok(session) => session,
        Err(report) => {
            error!(uid = %token.uid(), error = %report, "Failed to store session");
            return (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error").into_response();
        }
    };

    if let Some(previous) = jar.get(config.cookie_name()) {
        auth.end_session(previous.value()).await;
    }

    let cookie = config.session_cookie(session.id().to_string(), &token);
    (jar.add(cookie), StatusCode::OK).into_response()
}

/// Confirms the caller is authenticated and still allowed a session.
pub async fn logged_in(
    State(auth): State<AuthContext>,
    RequireAuth(principal): RequireAuth,
) -> Response {
    if auth.config().login_policy().allows_session(principal.token()) {
        StatusCode::OK.into_response()
    } else {
        let denial = AuthorizationError::LoginNotAllowed {
            uid: principal.uid().to_owned(),
        };
        warn!(reason = %denial, "Logged-in check refused by policy");
        (StatusCode::FORBIDDEN, denial.to_string()).into_response()
    }
}

/// Ends the current session, if any, and clears the cookie.
pub async fn logout(State(auth): State<AuthContext>, jar: CookieJar) -> impl IntoResponse {
    let config = auth.config();
    if let Some(cookie) = jar.get(config.cookie_name()) {
        auth.end_session(cookie.value()).await;
    } else {
        info!("Logout without a session cookie");
    }

    (jar.add(config.expired_session_cookie()), StatusCode::OK)
}
