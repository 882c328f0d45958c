//! Request-scoped authentication primitives.
//!
//! - `Principal`: the identity attached to a request after authentication
//! - `Credential`: what a request presented to prove that identity
//! - `SessionArtifact`: the provider-issued session token behind a cookie

use crate::claims::VerifiedToken;
use crate::role::RoleSet;
use serde::{Deserialize, Serialize};
use std::fmt;

/// The authenticated identity of the current request.
///
/// Created once per request by the authentication middleware and dropped
/// with the request. Wraps exactly one verified claim set.
#[derive(Debug, Clone)]
pub struct Principal {
    token: VerifiedToken,
}

impl Principal {
    #[must_use]
    pub fn new(token: VerifiedToken) -> Self {
        Self { token }
    }

    /// Returns the principal's stable subject identifier.
    #[must_use]
    pub fn uid(&self) -> &str {
        self.token.uid()
    }

    #[must_use]
    pub fn roles(&self) -> &RoleSet {
        self.token.roles()
    }

    /// Returns the verified claims this principal was built from.
    #[must_use]
    pub fn token(&self) -> &VerifiedToken {
        &self.token
    }
}

/// Opaque, provider-signed session token.
///
/// Never printed: `Debug` redacts the value.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionArtifact(String);

impl SessionArtifact {
    #[must_use]
    pub fn new(value: String) -> Self {
        Self(value)
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for SessionArtifact {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SessionArtifact(<redacted>)")
    }
}

/// A credential presented for verification.
#[derive(Clone, Copy)]
pub enum Credential<'a> {
    /// Raw token from an `Authorization: Bearer` header or a login body.
    Bearer(&'a str),
    /// Session artifact recovered from session storage.
    Session(&'a SessionArtifact),
}

impl Credential<'_> {
    /// Short label used in logs.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Bearer(_) => "bearer",
            Self::Session(_) => "session",
        }
    }
}

impl fmt::Debug for Credential<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Credential::{}(<redacted>)", self.kind())
    }
}
