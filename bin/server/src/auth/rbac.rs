//! Role-based route guards.
//!
//! Guards are route layers over a router's existing routes and read the
//! [`Principal`] left by authentication, so they must sit inside
//! [`AuthContext::protect`](super::AuthContext::protect):
//!
//! ```ignore
//! let admin = auth.protect(
//!     Router::new()
//!         .route("/admin/ping", get(ping))
//!         .require_all_roles(["admin"]),
//! );
//! ```

use axum::{
    Router,
    extract::{Request, State},
    http::StatusCode,
    middleware::{Next, from_fn_with_state},
    response::{IntoResponse, Response},
};
use cartpal_platform_access::{AuthorizationError, Principal, RequiredRoles};
use std::sync::Arc;
use tracing::warn;

/// Admits the request when its principal satisfies `required`; otherwise
/// answers 403 with the denial reason as the body.
pub async fn enforce_roles(
    State(required): State<Arc<RequiredRoles>>,
    request: Request,
    next: Next,
) -> Response {
    let decision = match request.extensions().get::<Principal>() {
        Some(principal) => required.evaluate(principal.roles()),
        None => Err(AuthorizationError::NotAuthenticated),
    };

    match decision {
        Ok(()) => next.run(request).await,
        Err(denial) => {
            warn!(
                path = %request.uri().path(),
                required = %required,
                reason = %denial,
                "Access denied"
            );
            (StatusCode::FORBIDDEN, denial.to_string()).into_response()
        }
    }
}

/// Role guard decorators for routers.
pub trait RoleGuardExt: Sized {
    /// Guards every route added so far with `required`.
    #[must_use]
    fn require_roles(self, required: RequiredRoles) -> Self;

    /// The principal must hold every role in `roles`.
    #[must_use]
    fn require_all_roles<I, R>(self, roles: I) -> Self
    where
        I: IntoIterator<Item = R>,
        R: Into<String>,
    {
        self.require_roles(RequiredRoles::all(roles))
    }

    /// The principal must hold at least one role in `roles`.
    #[must_use]
    fn require_any_role<I, R>(self, roles: I) -> Self
    where
        I: IntoIterator<Item = R>,
        R: Into<String>,
    {
        self.require_roles(RequiredRoles::any(roles))
    }

    /// The principal must hold none of the roles in `roles`.
    #[must_use]
    fn require_none_of_roles<I, R>(self, roles: I) -> Self
    where
        I: IntoIterator<Item = R>,
        R: Into<String>,
    {
        self.require_roles(RequiredRoles::none_of(roles))
    }
}

impl<S> RoleGuardExt for Router<S>
where
    S: Clone + Send + Sync + 'static,
{
    fn require_roles(self, required: RequiredRoles) -> Self {
        self.route_layer(from_fn_with_state(Arc::new(required), enforce_roles))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::testing::{FakeVerifier, body_text, test_context};
    use axum::body::Body;
    use axum::http::{Request, header};
    use axum::routing::get;
    use serde_json::json;
    use tower::ServiceExt;

    fn verifier() -> FakeVerifier {
        FakeVerifier::new()
            .with_token("admin", json!({"uid": "a", "roles": ["admin", "shopper"]}))
            .with_token("shopper", json!({"uid": "s", "roles": "shopper"}))
            .with_token("nobody", json!({"uid": "n"}))
    }

    async fn call(app: Router, token: &str) -> (StatusCode, String) {
        let response = app
            .oneshot(
                Request::builder()
                    .uri("/guarded")
                    .header(header::AUTHORIZATION, format!("Bearer {token}"))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        let status = response.status();
        (status, body_text(response).await)
    }

    fn guarded() -> Router {
        Router::new().route("/guarded", get(|| async { "ok" }))
    }

    #[tokio::test]
    async fn require_all_roles() {
        let (auth, _dir) = test_context(verifier()).await;
        let app = auth.protect(guarded().require_all_roles(["admin", "shopper"]));

        assert_eq!(call(app.clone(), "admin").await, (StatusCode::OK, "ok".into()));
        assert_eq!(
            call(app, "shopper").await,
            (StatusCode::FORBIDDEN, "missing required roles: admin".into())
        );
    }

    #[tokio::test]
    async fn require_any_role() {
        let (auth, _dir) = test_context(verifier()).await;
        let app = auth.protect(guarded().require_any_role(["admin", "support"]));

        assert_eq!(call(app.clone(), "admin").await.0, StatusCode::OK);
        assert_eq!(
            call(app, "nobody").await,
            (
                StatusCode::FORBIDDEN,
                "requires one of roles: admin, support".into()
            )
        );
    }

    #[tokio::test]
    async fn require_none_of_roles() {
        let (auth, _dir) = test_context(verifier()).await;
        let app = auth.protect(guarded().require_none_of_roles(["admin"]));

        assert_eq!(call(app.clone(), "shopper").await.0, StatusCode::OK);
        assert_eq!(call(app.clone(), "nobody").await.0, StatusCode::OK);
        assert_eq!(
            call(app, "admin").await,
            (StatusCode::FORBIDDEN, "holds forbidden roles: admin".into())
        );
    }

    #[tokio::test]
    async fn guard_without_authentication_denies() {
        let app = guarded().require_any_role(["shopper"]);

        let response = app
            .oneshot(Request::builder().uri("/guarded").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::FORBIDDEN);
        assert_eq!(body_text(response).await, "no authenticated principal");
    }
}
