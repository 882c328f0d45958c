//! Authentication middleware and extractors for Axum.

use super::config::AuthConfig;
use super::context::AuthContext;
use axum::{
    extract::{FromRequestParts, Request, State},
    http::{HeaderMap, HeaderValue, StatusCode, header, request::Parts},
    middleware::Next,
    response::{IntoResponse, Response},
};
use axum_extra::extract::CookieJar;
use cartpal_platform_access::{Credential, Principal};
use tracing::{debug, error};

/// Returns the token of an `Authorization: Bearer` header.
///
/// The scheme is matched case-insensitively. A bearer header without a
/// token yields `Some("")`, which verification rejects.
#[must_use]
pub fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    let value = headers.get(header::AUTHORIZATION)?.to_str().ok()?.trim();
    let (scheme, token) = value.split_once(' ').unwrap_or((value, ""));
    scheme
        .eq_ignore_ascii_case("bearer")
        .then(|| token.trim())
}

/// The 401 challenge, optionally telling the browser to drop its session
/// cookie.
pub fn challenge(config: &AuthConfig, clear_cookie: bool) -> Response {
    let mut response = (
        StatusCode::UNAUTHORIZED,
        [(header::WWW_AUTHENTICATE, config.challenge_header())],
    )
        .into_response();
    if clear_cookie {
        append_cookie_removal(config, response.headers_mut());
    }
    response
}

pub(crate) fn append_cookie_removal(config: &AuthConfig, headers: &mut HeaderMap) {
    if let Ok(value) = HeaderValue::from_str(&config.expired_session_cookie().to_string()) {
        headers.append(header::SET_COOKIE, value);
    }
}

/// Resolves the request's [`Principal`] or answers with a challenge.
///
/// A bearer header always wins; when it fails the request is refused even
/// if a valid session cookie is also present.
pub async fn authenticate(
    State(auth): State<AuthContext>,
    mut request: Request,
    next: Next,
) -> Response {
    let config = auth.config();
    let session_cookie = CookieJar::from_headers(request.headers())
        .get(config.cookie_name())
        .map(|cookie| cookie.value().to_owned());

    let token = if let Some(bearer) = bearer_token(request.headers()).map(str::to_owned) {
        match auth.verify(Credential::Bearer(&bearer)).await {
            Ok(token) => token,
            Err(report) => {
                error!(
                    path = %request.uri().path(),
                    error = %report,
                    "Bearer token verification failed"
                );
                return challenge(config, session_cookie.is_some());
            }
        }
    } else if let Some(value) = session_cookie {
        match auth.resume_session(&value).await {
            Ok(token) => token,
            Err(report) => {
                error!(
                    path = %request.uri().path(),
                    error = %report,
                    "Session cookie verification failed"
                );
                return challenge(config, true);
            }
        }
    } else {
        debug!(path = %request.uri().path(), "No credentials presented");
        return challenge(config, false);
    };

    debug!(uid = %token.uid(), "Request authenticated");
    request.extensions_mut().insert(Principal::new(token));
    next.run(request).await
}

/// Extractor for the authenticated principal.
///
/// Only succeeds behind [`authenticate`]. Using it on a route that
/// [`AuthContext::protect`] does not cover is a wiring error: the request
/// is rejected with a bare 401 and no challenge, since the realm lives in
/// the auth configuration the extractor cannot see.
pub struct RequireAuth(pub Principal);

impl<S> FromRequestParts<S> for RequireAuth
where
    S: Send + Sync,
{
    type Rejection = StatusCode;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<Principal>()
            .cloned()
            .map(RequireAuth)
            .ok_or(StatusCode::UNAUTHORIZED)
    }
}
