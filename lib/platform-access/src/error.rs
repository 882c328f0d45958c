//! Error types for the platform-access crate.
//!
//! Errors are designed for layered context using rootcause:
//! - `AuthenticationError`: a credential could not be turned into an identity
//! - `AuthorizationError`: an identity is not allowed to do something
//! - `ConfigurationError`: the auth layer cannot start

use std::fmt;

/// Errors from authentication operations.
///
/// Every variant surfaces to clients as the same 401 challenge; the detail
/// only ever reaches the logs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthenticationError {
    /// The identity provider rejected the credential.
    InvalidCredential { reason: String },
    /// The session cookie did not resolve to a live session.
    InvalidSession { reason: String },
    /// A claim the layer depends on is absent or malformed.
    MissingClaim { claim: String },
    /// The token's `auth_time` is too old to mint a session from.
    StaleAuthTime { age_seconds: i64 },
    /// The identity provider could not be reached or timed out.
    ProviderUnavailable { reason: String },
}

impl fmt::Display for AuthenticationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidCredential { reason } => {
                write!(f, "invalid credential: {reason}")
            }
            Self::InvalidSession { reason } => {
                write!(f, "invalid session: {reason}")
            }
            Self::MissingClaim { claim } => {
                write!(f, "missing required claim: {claim}")
            }
            Self::StaleAuthTime { age_seconds } => {
                write!(f, "authentication is {age_seconds}s old, too old for session login")
            }
            Self::ProviderUnavailable { reason } => {
                write!(f, "identity provider unavailable: {reason}")
            }
        }
    }
}

impl std::error::Error for AuthenticationError {}

/// Errors from authorization operations.
///
/// The `Display` output is the human-readable reason placed in 403 bodies.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthorizationError {
    /// No principal was resolved for the request.
    NotAuthenticated,
    /// The principal lacks roles that are all required.
    MissingRoles { roles: Vec<String> },
    /// The principal holds none of the accepted roles.
    NoAcceptedRole { accepted: Vec<String> },
    /// The principal holds roles that are forbidden.
    ForbiddenRoles { roles: Vec<String> },
    /// The login policy refused the principal.
    LoginNotAllowed { uid: String },
}

impl fmt::Display for AuthorizationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotAuthenticated => write!(f, "no authenticated principal"),
            Self::MissingRoles { roles } => {
                write!(f, "missing required roles: {}", roles.join(", "))
            }
            Self::NoAcceptedRole { accepted } => {
                write!(f, "requires one of roles: {}", accepted.join(", "))
            }
            Self::ForbiddenRoles { roles } => {
                write!(f, "holds forbidden roles: {}", roles.join(", "))
            }
            Self::LoginNotAllowed { uid } => {
                write!(f, "user {uid} is not allowed to log in")
            }
        }
    }
}

impl std::error::Error for AuthorizationError {}

/// Errors raised while assembling the auth configuration at startup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigurationError {
    /// A mandatory setting is absent or blank.
    MissingField { field: &'static str },
    /// A setting is present but unusable.
    InvalidField { field: &'static str, reason: String },
}

impl fmt::Display for ConfigurationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingField { field } => {
                write!(f, "missing required auth setting: {field}")
            }
            Self::InvalidField { field, reason } => {
                write!(f, "invalid auth setting {field}: {reason}")
            }
        }
    }
}

impl std::error::Error for ConfigurationError {}
