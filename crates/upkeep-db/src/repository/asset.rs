//! SurrealDB implementation of the asset repository.
//!
//! A write that places an asset in a location runs in one transaction
//! with the location's capacity check; see [`CAPACITY_GUARD`].

use chrono::{DateTime, Utc};
use surrealdb::{Connection, Surreal};
use surrealdb_types::SurrealValue;
use tracing::debug;
use upkeep_core::error::{ConflictReason, UpkeepError, UpkeepResult};
use upkeep_core::models::asset::{Asset, CreateAsset, UpdateAsset};
use upkeep_core::models::resource::{ResourceKind, ResourceStamp};
use upkeep_core::repository::{PaginatedResult, Pagination, VersionedRepository};
use uuid::Uuid;

use super::versioned::{self, CountRow, opt_uuid_string, parse_opt_uuid, parse_uuid};
use crate::error::DbError;

/// Sets `$open` when `$location_id` exists in the tenant and has room
/// for asset `$id` besides the assets already there, and bumps that
/// location's `occupancy_epoch` when it does. Two transactions moving
/// assets into the same location both write the location, so the
/// later one fails to commit.
const CAPACITY_GUARD: &str = "\
    LET $room = (SELECT max_capacity FROM type::record('location', $location_id) \
        WHERE tenant_id = $tenant_id)[0]; \
    LET $open = $room != NONE AND ( \
        $room.max_capacity = NONE OR $room.max_capacity = NULL \
        OR array::len((SELECT VALUE id FROM asset WHERE tenant_id = $tenant_id \
            AND location_id = $location_id \
            AND id != type::record('asset', $id))) < $room.max_capacity); \
    IF $open { UPDATE type::record('location', $location_id) \
        SET occupancy_epoch = occupancy_epoch + 1 };";

fn guarded(write: &str) -> String {
    format!("BEGIN TRANSACTION; {CAPACITY_GUARD} {write}; COMMIT TRANSACTION;")
}

#[derive(Debug, SurrealValue)]
struct CapacityRow {
    max_capacity: Option<u64>,
}

#[derive(Debug, SurrealValue)]
struct AssetRow {
    tenant_id: String,
    name: String,
    asset_tag: String,
    status: String,
    assigned_to: Option<String>,
    location_id: Option<String>,
    supplier_id: Option<String>,
    metadata: serde_json::Value,
    version: u64,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

#[derive(Debug, SurrealValue)]
struct AssetRowWithId {
    record_id: String,
    tenant_id: String,
    name: String,
    asset_tag: String,
    status: String,
    assigned_to: Option<String>,
    location_id: Option<String>,
    supplier_id: Option<String>,
    metadata: serde_json::Value,
    version: u64,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl AssetRow {
    fn into_asset(self, id: Uuid) -> Result<Asset, DbError> {
        Ok(Asset {
            id,
            tenant_id: parse_uuid(&self.tenant_id, "tenant")?,
            name: self.name,
            asset_tag: self.asset_tag,
            status: self
                .status
                .parse()
                .map_err(|e| DbError::corrupt("asset status", e))?,
            assigned_to: parse_opt_uuid(self.assigned_to, "assignee")?,
            location_id: parse_opt_uuid(self.location_id, "location")?,
            supplier_id: parse_opt_uuid(self.supplier_id, "supplier")?,
            metadata: self.metadata,
            version: self.version,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

impl AssetRowWithId {
    fn try_into_asset(self) -> Result<Asset, DbError> {
        let id = parse_uuid(&self.record_id, "asset")?;
        AssetRow {
            tenant_id: self.tenant_id,
            name: self.name,
            asset_tag: self.asset_tag,
            status: self.status,
            assigned_to: self.assigned_to,
            location_id: self.location_id,
            supplier_id: self.supplier_id,
            metadata: self.metadata,
            version: self.version,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
        .into_asset(id)
    }
}

#[derive(Clone)]
pub struct SurrealAssetRepository<C: Connection> {
    db: Surreal<C>,
}

impl<C: Connection> SurrealAssetRepository<C> {
    pub fn new(db: Surreal<C>) -> Self {
        Self { db }
    }

    /// Explain why the capacity guard refused to place asset `id` in
    /// `location_id`.
    async fn refusal(&self, tenant_id: Uuid, location_id: Uuid, id: Uuid) -> UpkeepError {
        match self.occupancy(tenant_id, location_id, id).await {
            Ok(Some((current, Some(max)))) => {
                debug!(%tenant_id, %location_id, current, max, "Capacity guard refused asset write");
                ConflictReason::Capacity {
                    location: location_id,
                    current,
                    max,
                }
                .into()
            }
            Ok(Some((_, None))) => ConflictReason::Concurrent {
                detail: format!("capacity of location {location_id} changed concurrently"),
            }
            .into(),
            Ok(None) => UpkeepError::not_found("location", location_id),
            Err(e) => e.into(),
        }
    }

    /// Assets in `location_id` other than `id`, and the location's
    /// limit. `None` when the location is not in the tenant.
    async fn occupancy(
        &self,
        tenant_id: Uuid,
        location_id: Uuid,
        id: Uuid,
    ) -> Result<Option<(u64, Option<u64>)>, DbError> {
        let mut result = self
            .db
            .query(
                "SELECT max_capacity FROM type::record('location', $location_id) \
                 WHERE tenant_id = $tenant_id",
            )
            .query(
                "SELECT count() AS total FROM asset \
                 WHERE tenant_id = $tenant_id AND location_id = $location_id \
                 AND id != type::record('asset', $id) GROUP ALL",
            )
            .bind(("location_id", location_id.to_string()))
            .bind(("tenant_id", tenant_id.to_string()))
            .bind(("id", id.to_string()))
            .await?;

        let rooms: Vec<CapacityRow> = result.take(0)?;
        let counts: Vec<CountRow> = result.take(1)?;
        Ok(rooms
            .into_iter()
            .next()
            .map(|room| (counts.first().map_or(0, |c| c.total), room.max_capacity)))
    }
}

impl<C: Connection> VersionedRepository for SurrealAssetRepository<C> {
    type Resource = Asset;
    type Create = CreateAsset;
    type Update = UpdateAsset;

    const KIND: ResourceKind = ResourceKind::Asset;

    async fn locate(&self, id: Uuid) -> UpkeepResult<ResourceStamp> {
        Ok(versioned::locate(&self.db, Self::KIND, id).await?)
    }

    async fn create(&self, tenant_id: Uuid, input: CreateAsset) -> UpkeepResult<Asset> {
        let id = Uuid::new_v4();
        let id_str = id.to_string();

        let metadata = input
            .metadata
            .unwrap_or(serde_json::Value::Object(Default::default()));

        let write = "CREATE type::record('asset', $id) SET \
                     tenant_id = $tenant_id, name = $name, \
                     asset_tag = $asset_tag, status = $status, \
                     assigned_to = $assigned_to, location_id = $location_id, \
                     supplier_id = $supplier_id, metadata = $metadata, \
                     version = 0";
        let query = match input.location_id {
            Some(_) => guarded(&format!("IF $open {{ {write} }} ELSE {{ [] }}")),
            None => write.to_string(),
        };

        let result = self
            .db
            .query(&query)
            .bind(("id", id_str.clone()))
            .bind(("tenant_id", tenant_id.to_string()))
            .bind(("name", input.name))
            .bind(("asset_tag", input.asset_tag))
            .bind(("status", input.status.as_str()))
            .bind(("assigned_to", opt_uuid_string(input.assigned_to)))
            .bind(("location_id", opt_uuid_string(input.location_id)))
            .bind(("supplier_id", opt_uuid_string(input.supplier_id)))
            .bind(("metadata", metadata))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<AssetRow> =
            versioned::written_rows("asset", result, input.location_id.is_some())?;
        match (rows.into_iter().next(), input.location_id) {
            (Some(row), _) => Ok(row.into_asset(id)?),
            (None, Some(location_id)) => Err(self.refusal(tenant_id, location_id, id).await),
            (None, None) => Err(DbError::not_found("asset", id_str).into()),
        }
    }

    async fn get_by_id(&self, tenant_id: Uuid, id: Uuid) -> UpkeepResult<Asset> {
        let id_str = id.to_string();

        let mut result = self
            .db
            .query(
                "SELECT * FROM type::record('asset', $id) \
                 WHERE tenant_id = $tenant_id",
            )
            .bind(("id", id_str.clone()))
            .bind(("tenant_id", tenant_id.to_string()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<AssetRow> = result.take(0).map_err(DbError::from)?;
        let row = rows
            .into_iter()
            .next()
            .ok_or_else(|| DbError::not_found("asset", id_str))?;

        Ok(row.into_asset(id)?)
    }

    async fn update(
        &self,
        tenant_id: Uuid,
        id: Uuid,
        expected_version: u64,
        input: UpdateAsset,
    ) -> UpkeepResult<Asset> {
        let mut sets = Vec::new();
        if input.name.is_some() {
            sets.push("name = $name");
        }
        if input.asset_tag.is_some() {
            sets.push("asset_tag = $asset_tag");
        }
        if input.status.is_some() {
            sets.push("status = $status");
        }
        if input.assigned_to.is_some() {
            sets.push("assigned_to = $assigned_to");
        }
        if input.location_id.is_some() {
            sets.push("location_id = $location_id");
        }
        if input.supplier_id.is_some() {
            sets.push("supplier_id = $supplier_id");
        }
        if input.metadata.is_some() {
            sets.push("metadata = $metadata");
        }
        sets.push("version = version + 1");
        sets.push("updated_at = time::now()");

        // Only a move into a location is capacity-guarded.
        let target = input.location_id.flatten();
        let query = match target {
            Some(_) => guarded(&format!(
                "UPDATE type::record('asset', $id) SET {} \
                 WHERE tenant_id = $tenant_id AND version = $expected_version AND $open",
                sets.join(", ")
            )),
            None => format!(
                "UPDATE type::record('asset', $id) SET {} \
                 WHERE tenant_id = $tenant_id AND version = $expected_version",
                sets.join(", ")
            ),
        };

        let mut builder = self
            .db
            .query(&query)
            .bind(("id", id.to_string()))
            .bind(("tenant_id", tenant_id.to_string()))
            .bind(("expected_version", expected_version));

        if let Some(name) = input.name {
            builder = builder.bind(("name", name));
        }
        if let Some(asset_tag) = input.asset_tag {
            builder = builder.bind(("asset_tag", asset_tag));
        }
        if let Some(status) = input.status {
            builder = builder.bind(("status", status.as_str()));
        }
        if let Some(assigned_to) = input.assigned_to {
            builder = builder.bind(("assigned_to", opt_uuid_string(assigned_to)));
        }
        if let Some(location_id) = input.location_id {
            builder = builder.bind(("location_id", opt_uuid_string(location_id)));
        }
        if let Some(supplier_id) = input.supplier_id {
            builder = builder.bind(("supplier_id", opt_uuid_string(supplier_id)));
        }
        if let Some(metadata) = input.metadata {
            builder = builder.bind(("metadata", metadata));
        }

        let result = builder.await.map_err(DbError::from)?;
        let rows: Vec<AssetRow> = versioned::written_rows("asset", result, target.is_some())?;
        if let Some(row) = rows.into_iter().next() {
            return Ok(row.into_asset(id)?);
        }

        // A row that still carries the expected version was held back by
        // the capacity guard, not by the version check.
        match (target, versioned::locate(&self.db, Self::KIND, id).await) {
            (Some(location_id), Ok(stamp))
                if stamp.tenant_id == tenant_id && stamp.version == expected_version =>
            {
                Err(self.refusal(tenant_id, location_id, id).await)
            }
            _ => Err(
                versioned::missed_write(&self.db, Self::KIND, tenant_id, id, expected_version)
                    .await,
            ),
        }
    }

    async fn delete(&self, tenant_id: Uuid, id: Uuid) -> UpkeepResult<()> {
        let id_str = id.to_string();

        let mut result = self
            .db
            .query(
                "DELETE type::record('asset', $id) \
                 WHERE tenant_id = $tenant_id RETURN BEFORE",
            )
            .bind(("id", id_str.clone()))
            .bind(("tenant_id", tenant_id.to_string()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<AssetRow> = result.take(0).map_err(DbError::from)?;
        if rows.is_empty() {
            return Err(DbError::not_found("asset", id_str).into());
        }

        Ok(())
    }

    async fn list(
        &self,
        tenant_id: Uuid,
        pagination: Pagination,
    ) -> UpkeepResult<PaginatedResult<Asset>> {
        let total = versioned::count_in_tenant(&self.db, Self::KIND, tenant_id).await?;

        let mut result = self
            .db
            .query(
                "SELECT meta::id(id) AS record_id, * FROM asset \
                 WHERE tenant_id = $tenant_id \
                 ORDER BY created_at ASC \
                 LIMIT $limit START $offset",
            )
            .bind(("tenant_id", tenant_id.to_string()))
            .bind(("limit", pagination.limit))
            .bind(("offset", pagination.offset))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<AssetRowWithId> = result.take(0).map_err(DbError::from)?;

        let items = rows
            .into_iter()
            .map(|row| row.try_into_asset())
            .collect::<Result<Vec<_>, DbError>>()?;

        Ok(PaginatedResult {
            items,
            total,
            offset: pagination.offset,
            limit: pagination.limit,
        })
    }
}
