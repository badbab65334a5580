//! Tenant context: the authenticated identity a request acts as.
//!
//! A [`Principal`] is produced by the credential layer and carries no
//! authority by itself; every operation still goes through the access
//! guard.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::UpkeepError;

/// Coarse permission label. Variants imply no hierarchy; each operation
/// lists the roles it admits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Role {
    Admin,
    Supervisor,
    Inspector,
}

impl Role {
    pub const ALL: &'static [Role] = &[Role::Admin, Role::Supervisor, Role::Inspector];

    pub fn as_str(self) -> &'static str {
        match self {
            Role::Admin => "Admin",
            Role::Supervisor => "Supervisor",
            Role::Inspector => "Inspector",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = UpkeepError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Admin" => Ok(Role::Admin),
            "Supervisor" => Ok(Role::Supervisor),
            "Inspector" => Ok(Role::Inspector),
            other => Err(UpkeepError::validation(format!("unknown role: {other}"))),
        }
    }
}

/// The caller of an operation: who, in which tenant, with which role.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Principal {
    pub principal_id: Uuid,
    pub tenant_id: Uuid,
    pub role: Role,
}

impl Principal {
    pub fn new(principal_id: Uuid, tenant_id: Uuid, role: Role) -> Self {
        Self {
            principal_id,
            tenant_id,
            role,
        }
    }
}
