//! Resource access guard.
//!
//! The single authorization boundary for tenant-scoped records. It
//! compares tenants first, unconditionally, and only then checks roles.
//! It is stateless and may be called any number of times.

use tracing::debug;
use uuid::Uuid;

use crate::context::{Principal, Role};
use crate::error::{UpkeepError, UpkeepResult};
use crate::models::resource::TenantScoped;

/// Roles admitted by each operation on one record family.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AccessRoles {
    pub read: &'static [Role],
    pub create: &'static [Role],
    pub update: &'static [Role],
    pub delete: &'static [Role],
}

impl AccessRoles {
    /// Assets, locations, suppliers, schedules and checklists.
    pub const MANAGED: AccessRoles = AccessRoles {
        read: Role::ALL,
        create: &[Role::Admin, Role::Supervisor],
        update: &[Role::Admin, Role::Supervisor],
        delete: &[Role::Admin],
    };

    /// Users and departments.
    pub const ADMINISTERED: AccessRoles = AccessRoles {
        read: Role::ALL,
        create: &[Role::Admin],
        update: &[Role::Admin],
        delete: &[Role::Admin],
    };

    /// Inspections, which field inspectors create and fill in.
    pub const FIELD_WORK: AccessRoles = AccessRoles {
        read: Role::ALL,
        create: Role::ALL,
        update: Role::ALL,
        delete: &[Role::Admin],
    };
}

/// Authorize `principal` against an existing record.
///
/// Fails with [`UpkeepError::AccessDenied`] if the record belongs to
/// another tenant, whatever the principal's role, or if the role is not
/// in `required`.
pub fn authorize<R>(principal: &Principal, target: &R, required: &[Role]) -> UpkeepResult<()>
where
    R: TenantScoped + ?Sized,
{
    authorize_tenant(principal, target.tenant_id(), required).inspect_err(|_| {
        debug!(
            principal_id = %principal.principal_id,
            resource_id = %target.id(),
            "Denied access to resource"
        );
    })
}

/// Authorize `principal` to act inside `tenant_id`, for operations that
/// have no existing target yet (create, list).
pub fn authorize_tenant(
    principal: &Principal,
    tenant_id: Uuid,
    required: &[Role],
) -> UpkeepResult<()> {
    if principal.tenant_id != tenant_id {
        debug!(
            principal_id = %principal.principal_id,
            principal_tenant = %principal.tenant_id,
            target_tenant = %tenant_id,
            "Cross-tenant access rejected"
        );
        return Err(UpkeepError::AccessDenied);
    }

    if !required.contains(&principal.role) {
        debug!(
            principal_id = %principal.principal_id,
            role = %principal.role,
            "Role not admitted for operation"
        );
        return Err(UpkeepError::AccessDenied);
    }

    Ok(())
}
