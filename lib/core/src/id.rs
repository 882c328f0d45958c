//! Strongly-typed identifiers.
//!
//! Session identifiers use ULID format. Parsing is strict: anything that is
//! not a ULID (optionally carrying the `sess_` prefix) is rejected, so a
//! parsed id is always safe to use as a storage key or file name.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use ulid::Ulid;

/// Error returned when parsing an ID from a string fails.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseIdError {
    /// The type of ID that failed to parse.
    pub id_type: &'static str,
    /// The reason for the parse failure.
    pub reason: String,
}

impl fmt::Display for ParseIdError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "failed to parse {}: {}", self.id_type, self.reason)
    }
}

impl std::error::Error for ParseIdError {}

/// Identifier of a server-side session record.
///
/// Displayed as `sess_<ulid>`; this is the value carried (possibly signed or
/// encrypted) in the session cookie.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(Ulid);

impl SessionId {
    const PREFIX: &'static str = "sess";

    /// Creates a new session ID with a randomly generated ULID.
    #[must_use]
    pub fn new() -> Self {
        Self(Ulid::new())
    }

    /// Returns the underlying ULID.
    #[must_use]
    pub const fn as_ulid(&self) -> Ulid {
        self.0
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}_{}", Self::PREFIX, self.0)
    }
}

impl FromStr for SessionId {
    type Err = ParseIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let raw = s
            .strip_prefix(Self::PREFIX)
            .and_then(|rest| rest.strip_prefix('_'))
            .unwrap_or(s);

        Ulid::from_str(raw).map(Self).map_err(|e| ParseIdError {
            id_type: "SessionId",
            reason: e.to_string(),
        })
    }
}

impl From<Ulid> for SessionId {
    fn from(ulid: Ulid) -> Self {
        Self(ulid)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_uses_prefix() {
        let id = SessionId::new();
        assert!(id.to_string().starts_with("sess_"));
    }

    #[test]
    fn parse_with_and_without_prefix() {
        let id = SessionId::new();
        let parsed: SessionId = id.to_string().parse().expect("prefixed id should parse");
        assert_eq!(id, parsed);

        let bare: SessionId = id.as_ulid().to_string().parse().expect("bare ulid should parse");
        assert_eq!(id, bare);
    }

    #[test]
    fn parse_rejects_path_like_input() {
        for input in ["../../etc/passwd", "sess_", "", "sess_../x"] {
            let err = input.parse::<SessionId>().unwrap_err();
            assert_eq!(err.id_type, "SessionId");
        }
    }

    #[test]
    fn serde_is_transparent() {
        let id = SessionId::new();
        let json = serde_json::to_string(&id).expect("serialize");
        assert_eq!(json, format!("\"{}\"", id.as_ulid()));
    }
}
