//! Versioned resource manager.
//!
//! The one entry point for reading and writing a tenant-scoped record
//! family. Every operation runs the same sequence: resolve the target,
//! authorize through the access guard, apply the family's lifecycle
//! rules, perform the store operation, then recompute the derived
//! counters the write may have touched.
//!
//! The manager holds no locks. Concurrent updates of the same record are
//! arbitrated by the store's compare-and-swap on `(id, version)`.

use tracing::{debug, info};
use upkeep_core::context::{Principal, Role};
use upkeep_core::error::{ConflictReason, UpkeepResult};
use upkeep_core::guard::{AccessRoles, authorize, authorize_tenant};
use upkeep_core::models::resource::{ResourceStamp, TenantScoped};
use upkeep_core::repository::{PaginatedResult, Pagination, RelationStore, VersionedRepository};
use uuid::Uuid;

use crate::counts::CountTracker;
use crate::integrity::IntegrityChecker;
use crate::lifecycle::Lifecycle;

/// Resource manager, generic over the record family's repository `R`,
/// its write rules `L` and the relation store `S`.
pub struct VersionedResourceManager<R, L, S> {
    repo: R,
    lifecycle: L,
    relations: S,
}

impl<R, L, S> VersionedResourceManager<R, L, S>
where
    R: VersionedRepository,
    L: Lifecycle<R>,
    S: RelationStore,
{
    pub fn new(repo: R, lifecycle: L, relations: S) -> Self {
        Self {
            repo,
            lifecycle,
            relations,
        }
    }

    fn roles(&self) -> AccessRoles {
        <L as Lifecycle<R>>::ROLES
    }

    fn counts(&self) -> CountTracker<'_, S> {
        CountTracker::new(&self.relations)
    }

    /// Find the record wherever it lives and check the principal may act
    /// on it. Another tenant's record yields `AccessDenied`, never
    /// `NotFound`.
    async fn guard(
        &self,
        principal: &Principal,
        id: Uuid,
        required: &[Role],
    ) -> UpkeepResult<ResourceStamp> {
        let stamp = self.repo.locate(id).await?;
        authorize(principal, &stamp, required)?;
        Ok(stamp)
    }

    pub async fn get(&self, principal: &Principal, id: Uuid) -> UpkeepResult<R::Resource> {
        let stamp = self.guard(principal, id, self.roles().read).await?;
        self.repo.get_by_id(stamp.tenant_id, id).await
    }

    /// A page of the principal's own tenant.
    pub async fn list(
        &self,
        principal: &Principal,
        pagination: Pagination,
    ) -> UpkeepResult<PaginatedResult<R::Resource>> {
        authorize_tenant(principal, principal.tenant_id, self.roles().read)?;
        self.repo.list(principal.tenant_id, pagination).await
    }

    /// Create a record at version 0 in the principal's tenant.
    pub async fn create(
        &self,
        principal: &Principal,
        mut input: R::Create,
    ) -> UpkeepResult<R::Resource> {
        let tenant_id = principal.tenant_id;
        authorize_tenant(principal, tenant_id, self.roles().create)?;

        self.lifecycle.prepare_create(tenant_id, &mut input).await?;
        let touched = self.lifecycle.counted_in_create(&input);

        let result = self.repo.create(tenant_id, input).await;
        self.counts().recompute_all(tenant_id, &touched).await;

        let created = result?;
        info!(
            %tenant_id,
            kind = %R::KIND,
            id = %created.id(),
            principal_id = %principal.principal_id,
            "Created resource"
        );
        Ok(created)
    }

    /// Apply `input` only if the record is still at `expected_version`.
    ///
    /// A stale version fails with `Conflict` before any lifecycle rule
    /// runs; the store's compare-and-swap repeats the check atomically
    /// with the write, so of several callers presenting the same version
    /// exactly one succeeds.
    pub async fn update(
        &self,
        principal: &Principal,
        id: Uuid,
        expected_version: u64,
        mut input: R::Update,
    ) -> UpkeepResult<R::Resource> {
        let stamp = self.guard(principal, id, self.roles().update).await?;
        let tenant_id = stamp.tenant_id;

        let current = self.repo.get_by_id(tenant_id, id).await?;
        if current.version() != expected_version {
            debug!(
                %tenant_id,
                kind = %R::KIND,
                %id,
                expected_version,
                actual = current.version(),
                "Stale update rejected"
            );
            return Err(ConflictReason::StaleVersion {
                entity: R::KIND.to_string(),
                id,
                expected: expected_version,
                actual: current.version(),
            }
            .into());
        }

        self.lifecycle
            .prepare_update(tenant_id, &current, &mut input)
            .await?;
        let touched = self.lifecycle.counted_in_update(&current, &input);

        let result = self.repo.update(tenant_id, id, expected_version, input).await;
        self.counts().recompute_all(tenant_id, &touched).await;

        let updated = result?;
        info!(
            %tenant_id,
            kind = %R::KIND,
            %id,
            version = updated.version(),
            principal_id = %principal.principal_id,
            "Updated resource"
        );
        Ok(updated)
    }

    /// Delete a record. Containers are only removed while no live
    /// dependent points at them.
    pub async fn delete(&self, principal: &Principal, id: Uuid) -> UpkeepResult<()> {
        let stamp = self.guard(principal, id, self.roles().delete).await?;
        let tenant_id = stamp.tenant_id;

        let current = self.repo.get_by_id(tenant_id, id).await?;
        let touched = self.lifecycle.counted_in_delete(&current);

        let result = match R::KIND.container(id) {
            Some(container) => {
                IntegrityChecker::new(&self.relations)
                    .delete(tenant_id, container)
                    .await
            }
            None => self.repo.delete(tenant_id, id).await,
        };
        self.counts().recompute_all(tenant_id, &touched).await;

        result?;
        info!(
            %tenant_id,
            kind = %R::KIND,
            %id,
            principal_id = %principal.principal_id,
            "Deleted resource"
        );
        Ok(())
    }

    /// Recompute the derived counter of the record itself, if it has one.
    /// Returns `None` for families without a counter.
    pub async fn recount(&self, principal: &Principal, id: Uuid) -> UpkeepResult<Option<u64>> {
        let stamp = self.guard(principal, id, self.roles().update).await?;
        match R::KIND.container(id) {
            Some(container) if container.counted().is_some() => self
                .counts()
                .recompute(stamp.tenant_id, container)
                .await
                .map(Some),
            _ => Ok(None),
        }
    }

    pub fn repository(&self) -> &R {
        &self.repo
    }
}
