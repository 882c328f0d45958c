//! Application routes behind the auth layer.

use crate::auth::{AuthContext, RequireAuth, RoleGuardExt};
use axum::{Json, Router, routing::get};
use serde::Serialize;
use serde_json::{Value as JsonValue, json};
use tower_http::trace::TraceLayer;

/// Public view of the caller's identity.
#[derive(Debug, Serialize)]
pub struct Profile {
    pub uid: String,
    pub tenant_id: Option<String>,
    pub name: Option<String>,
    pub picture: Option<String>,
    pub email: Option<String>,
    pub email_verified: bool,
    pub roles: Vec<String>,
}

/// Returns the caller's public claims.
pub async fn profile(RequireAuth(principal): RequireAuth) -> Json<Profile> {
    let token = principal.token();
    Json(Profile {
        uid: token.uid().to_owned(),
        tenant_id: token.tenant_id().map(str::to_owned),
        name: token.name().map(str::to_owned),
        picture: token.picture().map(str::to_owned),
        email: token.email().map(str::to_owned),
        email_verified: token.email_verified(),
        roles: token.roles().iter().map(str::to_owned).collect(),
    })
}

/// Liveness check for administrators.
pub async fn admin_ping(RequireAuth(principal): RequireAuth) -> Json<JsonValue> {
    Json(json!({ "pong": true, "uid": principal.uid() }))
}

/// The complete application: API routes, session endpoints, login
/// redirect and request tracing.
pub fn router(auth: &AuthContext) -> Router {
    let admin = Router::new()
        .route("/api/admin/ping", get(admin_ping))
        .require_all_roles(["admin"]);
    let api = auth.protect(
        Router::new()
            .route("/api/profile", get(profile))
            .merge(admin),
    );

    auth.install(api).layer(TraceLayer::new_for_http())
}
