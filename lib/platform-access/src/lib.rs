//! Identity and access primitives for the cartpal backend.
//!
//! This crate provides:
//! - Verified identity claims (`VerifiedToken`) and the request `Principal`
//! - Role sets and required-role checks (`RoleSet`, `RequiredRoles`)
//! - Server-side session records (`Session`)
//! - Auth layer settings (`AuthSettings`)
//! - The identity provider seam (`IdentityVerifier`)
//! - Authentication, authorization and configuration error types
//!
//! It has no HTTP dependency; the server crate wires these into axum.
//!
//! # Example
//!
//! ```
//! use cartpal_platform_access::{Principal, RequiredRoles, VerifiedToken};
//! use serde_json::json;
//!
//! let token = VerifiedToken::from_claims(json!({
//!     "uid": "u1",
//!     "roles": ["shopper", "admin"],
//! }))
//! .expect("claims carry a uid");
//! let principal = Principal::new(token);
//!
//! assert!(RequiredRoles::all(["admin"]).evaluate(principal.roles()).is_ok());
//! assert!(RequiredRoles::none_of(["admin"]).evaluate(principal.roles()).is_err());
//! ```

pub mod auth;
pub mod claims;
pub mod error;
pub mod role;
pub mod session;
pub mod settings;
pub mod verifier;

// Re-export main types at crate root
pub use auth::{Credential, Principal, SessionArtifact};
pub use claims::VerifiedToken;
pub use error::{AuthenticationError, AuthorizationError, ConfigurationError};
pub use role::{ROLES_CLAIM, RequiredRoles, RoleMode, RoleSet};
pub use session::Session;
pub use settings::AuthSettings;
pub use verifier::IdentityVerifier;
