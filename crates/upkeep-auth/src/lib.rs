//! upkeep auth: password verification, JWT issuance and validation,
//! and resolution of access tokens into a tenant context.

pub mod config;
pub mod context;
pub mod error;
pub mod password;
pub mod service;
pub mod token;

pub use config::AuthConfig;
pub use context::TenantContext;
pub use error::AuthError;
pub use service::{AuthService, LoginInput, LoginOutput};
pub use token::AccessTokenClaims;
