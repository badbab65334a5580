//! Relationship integrity checker.
//!
//! A container may only be deleted while nothing live points at it. The
//! decision is always taken on a fresh count of the dependent rows; the
//! derived counters are not consulted.

use tracing::info;
use upkeep_core::error::{ConflictReason, UpkeepError, UpkeepResult};
use upkeep_core::models::resource::Container;
use upkeep_core::repository::RelationStore;
use uuid::Uuid;

pub struct IntegrityChecker<'a, S: RelationStore> {
    relations: &'a S,
}

impl<'a, S: RelationStore> IntegrityChecker<'a, S> {
    pub fn new(relations: &'a S) -> Self {
        Self { relations }
    }

    /// Fail with `Conflict` naming the first dependent kind that still
    /// has live rows pointing at `container`.
    pub async fn assert_deletable(&self, tenant_id: Uuid, container: Container) -> UpkeepResult<()> {
        for dependent in container.dependents() {
            let count = self
                .relations
                .count_dependents(tenant_id, container, *dependent)
                .await?;

            if count > 0 {
                info!(
                    %tenant_id,
                    container = %container,
                    count,
                    dependent = dependent.label(),
                    "Delete blocked by live dependents"
                );
                return Err(ConflictReason::Dependents {
                    entity: container.kind().to_string(),
                    id: container.id(),
                    count,
                    dependent: dependent.label().to_string(),
                }
                .into());
            }
        }
        Ok(())
    }

    /// Check, then delete with the same condition re-evaluated inside the
    /// delete statement.
    ///
    /// If the guarded delete keeps the row, either a dependent was
    /// attached in between (reported as `Conflict`) or the row is already
    /// gone (`NotFound`).
    pub async fn delete(&self, tenant_id: Uuid, container: Container) -> UpkeepResult<()> {
        self.assert_deletable(tenant_id, container).await?;

        if self
            .relations
            .delete_unreferenced(tenant_id, container)
            .await?
        {
            return Ok(());
        }

        self.assert_deletable(tenant_id, container).await?;
        Err(UpkeepError::not_found(
            container.kind().table(),
            container.id(),
        ))
    }
}
