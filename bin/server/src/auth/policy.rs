//! Pluggable decisions of the auth layer.
//!
//! - [`LoginPolicy`]: may this identity hold a browser session?
//! - [`RedirectPolicy`]: should an unauthenticated request get a bare 401?
//! - [`AuthHooks`]: last-moment tweaks to the session cookie and login redirect

use axum::http::{HeaderMap, Uri, header};
use axum_extra::extract::cookie::Cookie;
use cartpal_platform_access::VerifiedToken;

/// Decides whether a verified identity may log in with a session.
///
/// Consulted by session login before anything is minted, and by the
/// logged-in check on every call.
pub trait LoginPolicy: Send + Sync {
    fn allows_session(&self, token: &VerifiedToken) -> bool;
}

/// Lets every verified identity log in.
#[derive(Debug, Clone, Copy, Default)]
pub struct AllowAll;

impl LoginPolicy for AllowAll {
    fn allows_session(&self, _token: &VerifiedToken) -> bool {
        true
    }
}

/// Only identities with a provider-verified email may log in.
#[derive(Debug, Clone, Copy, Default)]
pub struct RequireVerifiedEmail;

impl LoginPolicy for RequireVerifiedEmail {
    fn allows_session(&self, token: &VerifiedToken) -> bool {
        token.email().is_some() && token.email_verified()
    }
}

/// Decides, for a request that ended in 401, whether the 401 is returned as
/// is (`true`) or turned into a login redirect (`false`).
pub trait RedirectPolicy: Send + Sync {
    fn respond_with_unauthorized(&self, uri: &Uri, headers: &HeaderMap) -> bool;
}

/// Programmatic clients asking for JSON get the bare 401.
#[derive(Debug, Clone, Copy, Default)]
pub struct AcceptsJson;

impl RedirectPolicy for AcceptsJson {
    fn respond_with_unauthorized(&self, _uri: &Uri, headers: &HeaderMap) -> bool {
        headers
            .get_all(header::ACCEPT)
            .iter()
            .filter_map(|value| value.to_str().ok())
            .flat_map(|value| value.split(','))
            .any(|media| {
                media
                    .split(';')
                    .next()
                    .is_some_and(|m| m.trim().eq_ignore_ascii_case("application/json"))
            })
    }
}

/// Never redirect; for deployments without a browser login page.
#[derive(Debug, Clone, Copy, Default)]
pub struct AlwaysUnauthorized;

impl RedirectPolicy for AlwaysUnauthorized {
    fn respond_with_unauthorized(&self, _uri: &Uri, _headers: &HeaderMap) -> bool {
        true
    }
}

/// Optional customizers; both default to doing nothing.
pub trait AuthHooks: Send + Sync {
    /// Adjusts the session cookie right before session login sets it.
    fn customize_session_cookie(&self, _cookie: &mut Cookie<'static>, _token: &VerifiedToken) {}

    /// Adjusts the login redirect location. `original` is the path and
    /// query of the request that was refused.
    fn customize_login_redirect(&self, _location: &mut String, _original: &str) {}
}

/// The no-op hooks.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoHooks;

impl AuthHooks for NoHooks {}
