//! Settings for the credential and token layer.

/// Key material and policy for issuing and checking access tokens.
#[derive(Debug, Clone)]
pub struct AuthConfig {
    /// Ed25519 signing key, PEM.
    pub jwt_private_key_pem: String,
    /// Ed25519 verification key, PEM.
    pub jwt_public_key_pem: String,
    /// Seconds until an access token expires.
    pub access_token_lifetime_secs: u64,
    /// Written to and required in the `iss` claim.
    pub jwt_issuer: String,
    /// Must match the pepper the user store hashes with.
    pub pepper: Option<String>,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            jwt_private_key_pem: String::new(),
            jwt_public_key_pem: String::new(),
            access_token_lifetime_secs: 900,
            jwt_issuer: "upkeep".into(),
            pepper: None,
        }
    }
}
