//! SurrealDB implementation of [`RelationStore`].
//!
//! Every answer is computed from the pointer fields of the dependent
//! rows themselves. Stored counters are outputs of this module, never
//! inputs.

use surrealdb::{Connection, Surreal};
use surrealdb_types::SurrealValue;
use tracing::debug;
use upkeep_core::error::{UpkeepError, UpkeepResult};
use upkeep_core::models::resource::{Container, Dependent, ResourceKind};
use upkeep_core::repository::RelationStore;
use uuid::Uuid;

use crate::error::DbError;
use crate::repository::versioned::CountRow;

/// Where a dependent stores its pointer to a container.
#[derive(Debug)]
struct Pointer {
    table: &'static str,
    field: &'static str,
    /// Extra condition a row must meet to count as live.
    live: &'static str,
}

fn pointer(container: Container, dependent: Dependent) -> UpkeepResult<Pointer> {
    let (table, field, live) = match (container, dependent) {
        (Container::Location(_), Dependent::Asset) => ("asset", "location_id", ""),
        (Container::Location(_), Dependent::ChildLocation) => ("location", "parent_id", ""),
        (Container::Department(_), Dependent::Employee) => {
            ("user", "department_id", " AND status != 'Inactive'")
        }
        (Container::Supplier(_), Dependent::Asset) => ("asset", "supplier_id", ""),
        (Container::Checklist(_), Dependent::Inspection) => ("inspection", "checklist_id", ""),
        (Container::Checklist(_), Dependent::Schedule) => ("schedule", "checklist_id", ""),
        (container, dependent) => {
            return Err(UpkeepError::Internal(format!(
                "{} cannot hold {}",
                container.kind(),
                dependent.label()
            )));
        }
    };
    Ok(Pointer { table, field, live })
}

/// Sub-select of the ids of live dependents pointing at `$id`.
fn dependents_query(pointer: &Pointer) -> String {
    format!(
        "SELECT VALUE id FROM {} WHERE tenant_id = $tenant_id AND {} = $id{}",
        pointer.table, pointer.field, pointer.live
    )
}

#[derive(Debug, SurrealValue)]
struct TenantRow {
    #[allow(dead_code)]
    tenant_id: String,
}

#[derive(Debug, SurrealValue)]
struct LocationCounterRow {
    current_count: u64,
}

#[derive(Debug, SurrealValue)]
struct DepartmentCounterRow {
    employee_count: u64,
}

#[derive(Clone)]
pub struct SurrealRelationStore<C: Connection> {
    db: Surreal<C>,
}

impl<C: Connection> SurrealRelationStore<C> {
    pub fn new(db: Surreal<C>) -> Self {
        Self { db }
    }
}

impl<C: Connection> RelationStore for SurrealRelationStore<C> {
    async fn exists(&self, tenant_id: Uuid, kind: ResourceKind, id: Uuid) -> UpkeepResult<bool> {
        // Soft-deleted users do not count as live targets.
        let live = if kind == ResourceKind::User {
            " AND status != 'Inactive'"
        } else {
            ""
        };
        let query = format!(
            "SELECT tenant_id FROM type::record($table, $id) \
             WHERE tenant_id = $tenant_id{live}"
        );

        let mut result = self
            .db
            .query(&query)
            .bind(("table", kind.table()))
            .bind(("id", id.to_string()))
            .bind(("tenant_id", tenant_id.to_string()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<TenantRow> = result.take(0).map_err(DbError::from)?;
        Ok(!rows.is_empty())
    }

    async fn count_dependents(
        &self,
        tenant_id: Uuid,
        container: Container,
        dependent: Dependent,
    ) -> UpkeepResult<u64> {
        let pointer = pointer(container, dependent)?;
        let query = format!(
            "SELECT count() AS total FROM {} \
             WHERE tenant_id = $tenant_id AND {} = $id{} GROUP ALL",
            pointer.table, pointer.field, pointer.live
        );

        let mut result = self
            .db
            .query(&query)
            .bind(("tenant_id", tenant_id.to_string()))
            .bind(("id", container.id().to_string()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<CountRow> = result.take(0).map_err(DbError::from)?;
        Ok(rows.first().map(|r| r.total).unwrap_or(0))
    }

    async fn refresh_counter(&self, tenant_id: Uuid, container: Container) -> UpkeepResult<u64> {
        let (counter, dependent) = match container {
            Container::Location(_) => ("current_count", Dependent::Asset),
            Container::Department(_) => ("employee_count", Dependent::Employee),
            Container::Supplier(_) | Container::Checklist(_) => {
                return Err(UpkeepError::Internal(format!(
                    "{} has no derived counter",
                    container.kind()
                )));
            }
        };
        let pointer = pointer(container, dependent)?;
        let table = container.kind().table();

        // Count and write in one statement so the stored value is a
        // snapshot of the source rows.
        let query = format!(
            "UPDATE type::record('{table}', $id) \
             SET {counter} = array::len(({})) \
             WHERE tenant_id = $tenant_id",
            dependents_query(&pointer)
        );

        let result = self
            .db
            .query(&query)
            .bind(("id", container.id().to_string()))
            .bind(("tenant_id", tenant_id.to_string()))
            .await
            .map_err(DbError::from)?;

        let mut result = result.check().map_err(|e| DbError::statement(table, e))?;

        let count = match container {
            Container::Location(_) => {
                let rows: Vec<LocationCounterRow> = result.take(0).map_err(DbError::from)?;
                rows.first().map(|r| r.current_count)
            }
            _ => {
                let rows: Vec<DepartmentCounterRow> = result.take(0).map_err(DbError::from)?;
                rows.first().map(|r| r.employee_count)
            }
        };

        let count = count.ok_or_else(|| DbError::not_found(table, container.id()))?;
        debug!(%tenant_id, container = %container, count, "Refreshed derived counter");
        Ok(count)
    }

    async fn delete_unreferenced(&self, tenant_id: Uuid, container: Container) -> UpkeepResult<bool> {
        let mut guards = Vec::new();
        for dependent in container.dependents() {
            let pointer = pointer(container, *dependent)?;
            guards.push(format!(
                "array::len(({} LIMIT 1)) = 0",
                dependents_query(&pointer)
            ));
        }
        let table = container.kind().table();

        let query = format!(
            "DELETE type::record('{table}', $id) \
             WHERE tenant_id = $tenant_id AND {} \
             RETURN BEFORE",
            guards.join(" AND ")
        );

        let result = self
            .db
            .query(&query)
            .bind(("id", container.id().to_string()))
            .bind(("tenant_id", tenant_id.to_string()))
            .await
            .map_err(DbError::from)?;

        let mut result = result.check().map_err(|e| DbError::statement(table, e))?;

        let rows: Vec<TenantRow> = result.take(0).map_err(DbError::from)?;
        let deleted = !rows.is_empty();
        if !deleted {
            debug!(%tenant_id, container = %container, "Guarded delete kept the row");
        }
        Ok(deleted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_blocking_dependent_has_a_pointer() {
        let id = Uuid::new_v4();
        for container in [
            Container::Location(id),
            Container::Department(id),
            Container::Supplier(id),
            Container::Checklist(id),
        ] {
            for dependent in container.dependents() {
                assert!(pointer(container, *dependent).is_ok());
            }
        }
    }

    #[test]
    fn mismatched_pair_is_rejected() {
        let err = pointer(Container::Supplier(Uuid::new_v4()), Dependent::Employee).unwrap_err();
        assert!(matches!(err, UpkeepError::Internal(_)));
    }

    #[test]
    fn employee_pointer_skips_inactive_users() {
        let p = pointer(Container::Department(Uuid::new_v4()), Dependent::Employee).unwrap();
        assert!(dependents_query(&p).contains("status != 'Inactive'"));
    }
}
