//! Turns 401 responses into login redirects for browsers.

use super::context::AuthContext;
use super::middleware::append_cookie_removal;
use axum::{
    extract::{Request, State},
    http::{HeaderValue, StatusCode, header},
    middleware::Next,
    response::{IntoResponse, Response},
};
use axum_extra::extract::CookieJar;
use tracing::{debug, warn};

/// Wraps the whole application. Any 401 is passed through when the
/// redirect policy asks for it or the path is a session endpoint;
/// otherwise it becomes a 302 to the login page carrying the refused
/// path and query in `redirectUrl`.
pub async fn redirect_unauthorized(
    State(auth): State<AuthContext>,
    request: Request,
    next: Next,
) -> Response {
    let config = auth.config();
    let pass_through = config
        .redirect_policy()
        .respond_with_unauthorized(request.uri(), request.headers())
        || config.is_reserved_path(request.uri().path());
    let had_cookie = CookieJar::from_headers(request.headers())
        .get(config.cookie_name())
        .is_some();
    let original = request
        .uri()
        .path_and_query()
        .map_or_else(|| request.uri().path().to_owned(), |pq| pq.as_str().to_owned());

    let response = next.run(request).await;
    if response.status() != StatusCode::UNAUTHORIZED || pass_through {
        return response;
    }

    let location = config.login_redirect(&original);
    let Ok(location) = HeaderValue::from_str(&location) else {
        warn!(location = %location, "Login redirect is not a valid header value");
        return response;
    };

    debug!(original = %original, "Redirecting unauthenticated request to login");
    let mut redirect = (StatusCode::FOUND, [(header::LOCATION, location)]).into_response();
    if had_cookie {
        append_cookie_removal(config, redirect.headers_mut());
    }
    redirect
}

#[cfg(test)]
mod tests {
    use crate::auth::policy::AlwaysUnauthorized;
    use crate::auth::testing::{FakeVerifier, removes_session_cookie, test_context, test_settings};
    use crate::auth::{AuthConfig, AuthContext, DirectorySessionStore};
    use axum::body::Body;
    use axum::http::{Request, StatusCode, header};
    use axum::{Router, routing::get};
    use std::sync::Arc;
    use tower::ServiceExt;

    fn app(auth: &AuthContext) -> Router {
        let protected = auth.protect(Router::new().route("/dashboard", get(|| async { "ok" })));
        auth.install(Router::new().route("/public", get(|| async { "hi" })).merge(protected))
    }

    #[tokio::test]
    async fn browser_is_redirected_to_login() {
        let (auth, _dir) = test_context(FakeVerifier::new()).await;

        let response = app(&auth)
            .oneshot(
                Request::builder()
                    .uri("/dashboard")
                    .header(header::ACCEPT, "text/html")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::FOUND);
        assert_eq!(
            response.headers()[header::LOCATION],
            "/login?redirectUrl=%2Fdashboard"
        );
        assert!(response.headers().get(header::SET_COOKIE).is_none());
    }

    #[tokio::test]
    async fn redirect_keeps_query_and_clears_cookie() {
        let (auth, _dir) = test_context(FakeVerifier::new()).await;

        let response = app(&auth)
            .oneshot(
                Request::builder()
                    .uri("/dashboard?tab=lists")
                    .header(header::COOKIE, "__session=garbage")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::FOUND);
        assert_eq!(
            response.headers()[header::LOCATION],
            "/login?redirectUrl=%2Fdashboard%3Ftab%3Dlists"
        );
        assert!(removes_session_cookie(&response));
    }

    #[tokio::test]
    async fn json_client_gets_bare_unauthorized() {
        let (auth, _dir) = test_context(FakeVerifier::new()).await;

        let response = app(&auth)
            .oneshot(
                Request::builder()
                    .uri("/dashboard")
                    .header(header::ACCEPT, "application/json")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert!(response.headers().get(header::LOCATION).is_none());
        assert!(response.headers().contains_key(header::WWW_AUTHENTICATE));
    }

    #[tokio::test]
    async fn session_endpoints_are_never_redirected() {
        let (auth, _dir) = test_context(FakeVerifier::new()).await;

        let response = app(&auth)
            .oneshot(
                Request::builder()
                    .uri("/loggedIn")
                    .header(header::ACCEPT, "text/html")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert!(response.headers().get(header::LOCATION).is_none());
    }

    #[tokio::test]
    async fn other_statuses_pass_through() {
        let (auth, _dir) = test_context(FakeVerifier::new()).await;

        let public = app(&auth)
            .oneshot(Request::builder().uri("/public").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(public.status(), StatusCode::OK);

        let missing = app(&auth)
            .oneshot(Request::builder().uri("/nowhere").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(missing.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn custom_policy_disables_redirects() {
        let dir = tempfile::tempdir().expect("tempdir");
        let config = AuthConfig::builder(test_settings(dir.path()))
            .redirect_policy(AlwaysUnauthorized)
            .build()
            .expect("valid config");
        let store = DirectorySessionStore::open(dir.path()).await.expect("open");
        let auth = AuthContext::new(Arc::new(FakeVerifier::new()), config, store);

        let response = app(&auth)
            .oneshot(Request::builder().uri("/dashboard").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn mounted_endpoints_are_reserved() {
        let dir = tempfile::tempdir().expect("tempdir");
        let config = AuthConfig::builder(test_settings(dir.path()).with_mount_path("/auth"))
            .build()
            .expect("valid config");
        let store = DirectorySessionStore::open(dir.path()).await.expect("open");
        let auth = AuthContext::new(Arc::new(FakeVerifier::new()), config, store);

        let response = app(&auth)
            .oneshot(Request::builder().uri("/auth/loggedIn").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }
}
