//! Authentication service: login orchestration.

use tracing::{debug, info};
use upkeep_core::context::Principal;
use upkeep_core::error::{UpkeepError, UpkeepResult};
use upkeep_core::models::user::UserStatus;
use upkeep_core::repository::UserRepository;
use uuid::Uuid;

use crate::config::AuthConfig;
use crate::error::AuthError;
use crate::password;
use crate::token;

/// Input for the login flow.
#[derive(Debug)]
pub struct LoginInput {
    pub tenant_id: Uuid,
    pub username_or_email: String,
    pub password: String,
}

/// Successful login result.
#[derive(Debug)]
pub struct LoginOutput {
    /// Signed JWT access token.
    pub access_token: String,
    /// The identity the token speaks for.
    pub principal: Principal,
    /// Access token lifetime in seconds.
    pub expires_in: u64,
}

/// Authentication service.
///
/// Generic over the user repository so that the auth layer has no
/// dependency on the database crate.
pub struct AuthService<U: UserRepository> {
    user_repo: U,
    config: AuthConfig,
}

impl<U: UserRepository> AuthService<U> {
    pub fn new(user_repo: U, config: AuthConfig) -> Self {
        Self { user_repo, config }
    }

    /// Authenticate a user with username/email + password and issue an
    /// access token.
    ///
    /// Unknown users and wrong passwords are indistinguishable to the
    /// caller.
    pub async fn login(&self, input: LoginInput) -> UpkeepResult<LoginOutput> {
        // 1. Look up user: try username first, then email.
        let user = match self
            .user_repo
            .get_by_username(input.tenant_id, &input.username_or_email)
            .await
        {
            Ok(u) => u,
            Err(UpkeepError::NotFound { .. }) => self
                .user_repo
                .get_by_email(input.tenant_id, &input.username_or_email)
                .await
                .map_err(|e| match e {
                    UpkeepError::NotFound { .. } => AuthError::InvalidCredentials.into(),
                    other => other,
                })?,
            Err(e) => return Err(e),
        };

        // 2. Verify password.
        let valid = password::verify_password(
            &input.password,
            &user.password_hash,
            self.config.pepper.as_deref(),
        )?;

        if !valid {
            debug!(tenant_id = %input.tenant_id, user_id = %user.id, "Password mismatch");
            return Err(AuthError::InvalidCredentials.into());
        }

        // 3. Check account status.
        match user.status {
            UserStatus::Active => {}
            UserStatus::Locked => return Err(AuthError::AccountLocked.into()),
            UserStatus::Inactive => return Err(AuthError::AccountInactive.into()),
            UserStatus::PendingVerification => {
                return Err(AuthError::AccountPendingVerification.into());
            }
        }

        // 4. Issue JWT access token.
        let principal = Principal::new(user.id, user.tenant_id, user.role);
        let access_token = token::issue_access_token(&principal, &self.config)?;

        info!(
            tenant_id = %principal.tenant_id,
            user_id = %principal.principal_id,
            role = %principal.role,
            "User logged in"
        );

        Ok(LoginOutput {
            access_token,
            principal,
            expires_in: self.config.access_token_lifetime_secs,
        })
    }
}
