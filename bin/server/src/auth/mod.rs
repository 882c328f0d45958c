//! Authentication and authorization for the cartpal server.
//!
//! This module provides:
//! - The per-request authentication strategy (bearer token, else session cookie)
//! - Session lifecycle endpoints (`/sessionLogin`, `/loggedIn`, `/logout`)
//! - The login redirect for unauthenticated browsers
//! - Role guards for route subtrees
//!
//! # Wiring
//!
//! An [`AuthContext`] is built once at startup and handed to the router:
//!
//! ```ignore
//! let api = auth.protect(
//!     Router::new()
//!         .route("/admin/ping", get(ping))
//!         .require_all_roles(["admin"]),
//! );
//! let app = auth.install(Router::new().merge(api));
//! ```
//!
//! [`AuthContext::protect`] runs authentication before any role guard added
//! to the same router; [`AuthContext::install`] mounts the session
//! endpoints and turns 401s into login redirects for browsers.

pub mod config;
pub mod context;
pub mod identity;
pub mod middleware;
pub mod policy;
pub mod rbac;
pub mod redirect;
pub mod routes;
pub mod store;

#[cfg(test)]
pub(crate) mod testing;

pub use config::{AuthConfig, AuthConfigBuilder, CookieCodec};
pub use context::AuthContext;
pub use identity::HttpIdentityVerifier;
pub use middleware::RequireAuth;
pub use policy::{
    AcceptsJson, AllowAll, AlwaysUnauthorized, AuthHooks, LoginPolicy, NoHooks, RedirectPolicy,
    RequireVerifiedEmail,
};
pub use rbac::RoleGuardExt;
pub use store::{DirectorySessionStore, SessionStoreError};
