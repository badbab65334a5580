//! Row plumbing shared by the tenant-scoped, version-stamped tables.

use surrealdb::{Connection, IndexedResults, Surreal};
use surrealdb_types::SurrealValue;
use upkeep_core::error::{ConflictReason, UpkeepError};
use upkeep_core::models::resource::{ResourceKind, ResourceStamp};
use uuid::Uuid;

use crate::error::DbError;

/// Row struct for count queries.
#[derive(Debug, SurrealValue)]
pub(crate) struct CountRow {
    pub(crate) total: u64,
}

#[derive(Debug, SurrealValue)]
struct StampRow {
    tenant_id: String,
    version: u64,
}

pub(crate) fn parse_uuid(value: &str, what: &str) -> Result<Uuid, DbError> {
    Uuid::parse_str(value).map_err(|e| DbError::corrupt(&format!("invalid {what} UUID"), e))
}

pub(crate) fn parse_opt_uuid(value: Option<String>, what: &str) -> Result<Option<Uuid>, DbError> {
    value.map(|v| parse_uuid(&v, what)).transpose()
}

pub(crate) fn opt_uuid_string(value: Option<Uuid>) -> Option<String> {
    value.map(|v| v.to_string())
}

/// Tenant, id and version of a row, looked up without a tenant filter.
pub(crate) async fn locate<C: Connection>(
    db: &Surreal<C>,
    kind: ResourceKind,
    id: Uuid,
) -> Result<ResourceStamp, DbError> {
    let mut result = db
        .query("SELECT tenant_id, version FROM type::record($table, $id)")
        .bind(("table", kind.table()))
        .bind(("id", id.to_string()))
        .await?;

    let rows: Vec<StampRow> = result.take(0)?;
    let row = rows
        .into_iter()
        .next()
        .ok_or_else(|| DbError::not_found(kind.table(), id))?;

    Ok(ResourceStamp {
        id,
        tenant_id: parse_uuid(&row.tenant_id, "tenant")?,
        version: row.version,
    })
}

/// Explain why a compare-and-swap write matched no row: the row is
/// missing from the tenant, or its version moved on.
pub(crate) async fn missed_write<C: Connection>(
    db: &Surreal<C>,
    kind: ResourceKind,
    tenant_id: Uuid,
    id: Uuid,
    expected: u64,
) -> UpkeepError {
    match locate(db, kind, id).await {
        Ok(stamp) if stamp.tenant_id == tenant_id => {
            tracing::debug!(
                %tenant_id,
                resource_id = %id,
                kind = %kind,
                expected,
                actual = stamp.version,
                "Rejected stale write"
            );
            ConflictReason::StaleVersion {
                entity: kind.table().to_string(),
                id,
                expected,
                actual: stamp.version,
            }
            .into()
        }
        Ok(_) => UpkeepError::not_found(kind.table(), id),
        Err(e) => e.into(),
    }
}

/// Number of rows of `kind` in the tenant.
pub(crate) async fn count_in_tenant<C: Connection>(
    db: &Surreal<C>,
    kind: ResourceKind,
    tenant_id: Uuid,
) -> Result<u64, DbError> {
    let mut result = db
        .query(
            "SELECT count() AS total FROM type::table($table) \
             WHERE tenant_id = $tenant_id GROUP ALL",
        )
        .bind(("table", kind.table()))
        .bind(("tenant_id", tenant_id.to_string()))
        .await?;
    let rows: Vec<CountRow> = result.take(0)?;
    Ok(rows.first().map(|r| r.total).unwrap_or(0))
}

/// Rows returned by the data statement of a write. A single statement
/// is read at index 0. A `BEGIN ... COMMIT` block is read from the
/// statement just before `COMMIT`, which adds a row of its own.
pub(crate) fn written_rows<T: SurrealValue>(
    entity: &str,
    mut response: IndexedResults,
    transaction: bool,
) -> Result<Vec<T>, DbError> {
    if let Some(err) = DbError::transaction(entity, response.take_errors().into_values()) {
        return Err(err);
    }
    let index = if transaction {
        response.num_statements().saturating_sub(2)
    } else {
        0
    };
    Ok(response.take(index)?)
}
