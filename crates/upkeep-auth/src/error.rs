//! Authentication error types.

use thiserror::Error;
use upkeep_core::error::UpkeepError;

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("invalid credentials")]
    InvalidCredentials,

    #[error("account is locked")]
    AccountLocked,

    #[error("account is inactive")]
    AccountInactive,

    #[error("account is pending verification")]
    AccountPendingVerification,

    #[error("token has expired")]
    TokenExpired,

    #[error("invalid token: {0}")]
    TokenInvalid(String),

    #[error("cryptography error: {0}")]
    Crypto(String),
}

impl From<AuthError> for UpkeepError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::Crypto(msg) => UpkeepError::Crypto(msg),
            other => UpkeepError::AuthenticationFailed {
                reason: other.to_string(),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn token_failures_are_authentication_failures() {
        for err in [
            AuthError::TokenExpired,
            AuthError::TokenInvalid("bad signature".into()),
            AuthError::InvalidCredentials,
        ] {
            assert!(matches!(
                UpkeepError::from(err),
                UpkeepError::AuthenticationFailed { .. }
            ));
        }
    }
}
