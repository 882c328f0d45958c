//! Identity provider seam.
//!
//! The identity provider verifies tokens and mints session artifacts; this
//! crate never does either itself. Implementations talk to the provider
//! over the network, tests plug in fakes.

use crate::auth::SessionArtifact;
use crate::claims::VerifiedToken;
use crate::error::AuthenticationError;
use async_trait::async_trait;
use cartpal_core::Result;
use std::time::Duration;

/// Client of the external identity provider.
///
/// All three calls are asynchronous and fallible. Rejections are reported
/// as `InvalidCredential`; transport problems as `ProviderUnavailable`.
#[async_trait]
pub trait IdentityVerifier: Send + Sync {
    /// Verifies a bearer ID token and returns its claims.
    ///
    /// # Errors
    ///
    /// Returns an error if the provider rejects the token or cannot be reached.
    async fn verify_bearer(&self, token: &str) -> Result<VerifiedToken, AuthenticationError>;

    /// Exchanges a bearer ID token for a session artifact valid for `ttl`.
    ///
    /// # Errors
    ///
    /// Returns an error if the provider refuses to mint or cannot be reached.
    async fn mint_session(
        &self,
        token: &str,
        ttl: Duration,
    ) -> Result<SessionArtifact, AuthenticationError>;

    /// Verifies a previously minted session artifact and returns its claims.
    ///
    /// # Errors
    ///
    /// Returns an error if the artifact is invalid, expired, revoked, or the
    /// provider cannot be reached.
    async fn verify_session(
        &self,
        artifact: &SessionArtifact,
    ) -> Result<VerifiedToken, AuthenticationError>;
}
