//! Role sets and required-role specifications.
//!
//! Roles come from the `roles` claim of a verified token. Routes declare a
//! [`RequiredRoles`] value once, at router construction, and every request
//! that reaches them is checked against the principal's [`RoleSet`].

use crate::error::AuthorizationError;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::collections::BTreeSet;
use std::fmt;

/// Claim key the role set is read from.
pub const ROLES_CLAIM: &str = "roles";

/// Set of role names held by a principal.
///
/// Backed by an ordered set so that role lists in denial messages are
/// stable.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RoleSet {
    roles: BTreeSet<String>,
}

impl RoleSet {
    /// Creates an empty role set.
    #[must_use]
    pub fn none() -> Self {
        Self::default()
    }

    /// Reads a role set from the value of the `roles` claim.
    ///
    /// Accepts an array of strings or a single string. Non-string array
    /// entries are ignored; any other shape yields an empty set.
    #[must_use]
    pub fn from_claim(value: Option<&JsonValue>) -> Self {
        match value {
            Some(JsonValue::Array(items)) => items
                .iter()
                .filter_map(JsonValue::as_str)
                .map(str::to_owned)
                .collect(),
            Some(JsonValue::String(role)) => std::iter::once(role.clone()).collect(),
            _ => Self::none(),
        }
    }

    #[must_use]
    pub fn contains(&self, role: &str) -> bool {
        self.roles.contains(role)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.roles.is_empty()
    }

    /// Iterates over role names in sorted order.
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.roles.iter().map(String::as_str)
    }
}

impl<R: Into<String>> FromIterator<R> for RoleSet {
    fn from_iter<I: IntoIterator<Item = R>>(iter: I) -> Self {
        Self {
            roles: iter.into_iter().map(Into::into).collect(),
        }
    }
}

/// How a principal's roles are compared against a required set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RoleMode {
    /// Every required role must be held.
    All,
    /// At least one required role must be held.
    Any,
    /// None of the listed roles may be held.
    None,
}

impl fmt::Display for RoleMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::All => write!(f, "all"),
            Self::Any => write!(f, "any"),
            Self::None => write!(f, "none"),
        }
    }
}

/// Immutable role requirement attached to a route subtree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequiredRoles {
    roles: RoleSet,
    mode: RoleMode,
}

impl RequiredRoles {
    #[must_use]
    pub fn new(roles: RoleSet, mode: RoleMode) -> Self {
        Self { roles, mode }
    }

    /// Requires every role in `roles`.
    #[must_use]
    pub fn all<I, R>(roles: I) -> Self
    where
        I: IntoIterator<Item = R>,
        R: Into<String>,
    {
        Self::new(roles.into_iter().collect(), RoleMode::All)
    }

    /// Requires at least one role in `roles`.
    #[must_use]
    pub fn any<I, R>(roles: I) -> Self
    where
        I: IntoIterator<Item = R>,
        R: Into<String>,
    {
        Self::new(roles.into_iter().collect(), RoleMode::Any)
    }

    /// Forbids every role in `roles`.
    #[must_use]
    pub fn none_of<I, R>(roles: I) -> Self
    where
        I: IntoIterator<Item = R>,
        R: Into<String>,
    {
        Self::new(roles.into_iter().collect(), RoleMode::None)
    }

    #[must_use]
    pub fn roles(&self) -> &RoleSet {
        &self.roles
    }

    #[must_use]
    pub fn mode(&self) -> RoleMode {
        self.mode
    }

    /// Checks a principal's roles against this requirement.
    ///
    /// # Errors
    ///
    /// Returns the denial reason when the roles do not satisfy the mode.
    pub fn evaluate(&self, held: &RoleSet) -> Result<(), AuthorizationError> {
        match self.mode {
            RoleMode::All => {
                let missing: Vec<String> = self
                    .roles
                    .iter()
                    .filter(|role| !held.contains(role))
                    .map(str::to_owned)
                    .collect();
                if missing.is_empty() {
                    Ok(())
                } else {
                    Err(AuthorizationError::MissingRoles { roles: missing })
                }
            }
            RoleMode::Any => {
                if self.roles.iter().any(|role| held.contains(role)) {
                    Ok(())
                } else {
                    Err(AuthorizationError::NoAcceptedRole {
                        accepted: self.roles.iter().map(str::to_owned).collect(),
                    })
                }
            }
            RoleMode::None => {
                let forbidden: Vec<String> = self
                    .roles
                    .iter()
                    .filter(|role| held.contains(role))
                    .map(str::to_owned)
                    .collect();
                if forbidden.is_empty() {
                    Ok(())
                } else {
                    Err(AuthorizationError::ForbiddenRoles { roles: forbidden })
                }
            }
        }
    }
}

impl fmt::Display for RequiredRoles {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let roles: Vec<&str> = self.roles.iter().collect();
        write!(f, "{} of [{}]", self.mode, roles.join(", "))
    }
}
