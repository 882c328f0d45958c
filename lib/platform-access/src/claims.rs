//! Verified identity claims.
//!
//! A [`VerifiedToken`] only comes into existence from a claim set the
//! identity provider vouched for. It is never persisted by this layer.

use crate::error::AuthenticationError;
use crate::role::{ROLES_CLAIM, RoleSet};
use chrono::{DateTime, Duration, Utc};
use serde_json::{Map, Value as JsonValue};

/// Identity claims returned by a successful bearer or session verification.
#[derive(Debug, Clone, PartialEq)]
pub struct VerifiedToken {
    uid: String,
    tenant_id: Option<String>,
    issuer: Option<String>,
    name: Option<String>,
    picture: Option<String>,
    email: Option<String>,
    email_verified: bool,
    auth_time: Option<DateTime<Utc>>,
    claims: Map<String, JsonValue>,
    roles: RoleSet,
}

impl VerifiedToken {
    /// Builds a token from the provider's claim object.
    ///
    /// The subject is read from `uid`, falling back to `sub`. `auth_time`
    /// is seconds since the Unix epoch. The full object stays available
    /// through [`VerifiedToken::claim`].
    ///
    /// # Errors
    ///
    /// Returns `MissingClaim` if the value is not an object or carries no
    /// usable subject.
    pub fn from_claims(claims: JsonValue) -> Result<Self, AuthenticationError> {
        let JsonValue::Object(claims) = claims else {
            return Err(AuthenticationError::MissingClaim {
                claim: "claims object".to_string(),
            });
        };

        let text = |key: &str| {
            claims
                .get(key)
                .and_then(JsonValue::as_str)
                .filter(|v| !v.is_empty())
                .map(str::to_owned)
        };

        let uid = text("uid")
            .or_else(|| text("sub"))
            .ok_or_else(|| AuthenticationError::MissingClaim {
                claim: "uid".to_string(),
            })?;

        let auth_time = claims
            .get("auth_time")
            .and_then(JsonValue::as_i64)
            .and_then(|secs| DateTime::<Utc>::from_timestamp(secs, 0));

        Ok(Self {
            uid,
            tenant_id: text("tenant"),
            issuer: text("iss"),
            name: text("name"),
            picture: text("picture"),
            email: text("email"),
            email_verified: claims
                .get("email_verified")
                .and_then(JsonValue::as_bool)
                .unwrap_or(false),
            auth_time,
            roles: RoleSet::from_claim(claims.get(ROLES_CLAIM)),
            claims,
        })
    }

    /// Stable subject identifier.
    #[must_use]
    pub fn uid(&self) -> &str {
        &self.uid
    }

    #[must_use]
    pub fn tenant_id(&self) -> Option<&str> {
        self.tenant_id.as_deref()
    }

    #[must_use]
    pub fn issuer(&self) -> Option<&str> {
        self.issuer.as_deref()
    }

    #[must_use]
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    #[must_use]
    pub fn picture(&self) -> Option<&str> {
        self.picture.as_deref()
    }

    #[must_use]
    pub fn email(&self) -> Option<&str> {
        self.email.as_deref()
    }

    #[must_use]
    pub fn email_verified(&self) -> bool {
        self.email_verified
    }

    /// When the user last actively signed in with the provider.
    #[must_use]
    pub fn auth_time(&self) -> Option<DateTime<Utc>> {
        self.auth_time
    }

    /// Time elapsed between `auth_time` and `now`, if `auth_time` is known.
    #[must_use]
    pub fn auth_age(&self, now: DateTime<Utc>) -> Option<Duration> {
        self.auth_time.map(|at| now - at)
    }

    /// Roles derived from the `roles` claim.
    #[must_use]
    pub fn roles(&self) -> &RoleSet {
        &self.roles
    }

    /// Looks up an arbitrary claim.
    #[must_use]
    pub fn claim(&self, key: &str) -> Option<&JsonValue> {
        self.claims.get(key)
    }

    #[must_use]
    pub fn claims(&self) -> &Map<String, JsonValue> {
        &self.claims
    }
}
