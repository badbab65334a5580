//! Tenant context resolution: bearer token in, [`Principal`] out.

use tracing::debug;
use upkeep_core::context::Principal;
use upkeep_core::error::UpkeepResult;

use crate::config::AuthConfig;
use crate::token::TokenVerifier;

/// Resolves access tokens into the principal every core operation
/// receives. Stateless: no lookup happens after the signature check.
#[derive(Clone)]
pub struct TenantContext {
    verifier: TokenVerifier,
}

impl TenantContext {
    /// Fails with a crypto error if the configured public key is
    /// unusable.
    pub fn new(config: &AuthConfig) -> UpkeepResult<Self> {
        Ok(Self {
            verifier: TokenVerifier::new(config)?,
        })
    }

    /// Validate `token` and return who it speaks for.
    ///
    /// Every failure (bad signature, foreign issuer, expiry, malformed
    /// claims) is an `AuthenticationFailed`.
    pub fn resolve(&self, token: &str) -> UpkeepResult<Principal> {
        let principal = self
            .verifier
            .decode(token)
            .and_then(|claims| claims.principal())
            .inspect_err(|e| debug!(error = %e, "Rejected access token"))?;
        Ok(principal)
    }
}

impl std::fmt::Debug for TenantContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TenantContext").finish_non_exhaustive()
    }
}
