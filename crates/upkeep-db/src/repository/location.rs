//! SurrealDB implementation of [`LocationRepository`].
//!
//! Locations form a tree via `parent_id`. The derived `current_count`
//! and the `occupancy_epoch` are never written through `update`; see
//! [`crate::SurrealRelationStore`] and the asset repository's capacity
//! guard.

use chrono::{DateTime, Utc};
use surrealdb::{Connection, Surreal};
use surrealdb_types::SurrealValue;
use tracing::debug;
use upkeep_core::error::{UpkeepError, UpkeepResult};
use upkeep_core::models::location::{CreateLocation, Location, UpdateLocation};
use upkeep_core::models::resource::{ResourceKind, ResourceStamp};
use upkeep_core::repository::{
    LocationRepository, PaginatedResult, Pagination, VersionedRepository,
};
use uuid::Uuid;

use super::versioned::{self, opt_uuid_string, parse_opt_uuid, parse_uuid};
use crate::error::DbError;

/// Upper bound on the parent walk. A chain deeper than this, or a
/// corrupt cycle, fails the walk instead of returning a partial list.
const MAX_ANCESTOR_DEPTH: usize = 50;

#[derive(Debug, SurrealValue)]
struct LocationRow {
    tenant_id: String,
    name: String,
    parent_id: Option<String>,
    max_capacity: Option<u64>,
    current_count: u64,
    occupancy_epoch: u64,
    version: u64,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

#[derive(Debug, SurrealValue)]
struct LocationRowWithId {
    record_id: String,
    tenant_id: String,
    name: String,
    parent_id: Option<String>,
    max_capacity: Option<u64>,
    current_count: u64,
    occupancy_epoch: u64,
    version: u64,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl LocationRow {
    fn into_location(self, id: Uuid) -> Result<Location, DbError> {
        Ok(Location {
            id,
            tenant_id: parse_uuid(&self.tenant_id, "tenant")?,
            name: self.name,
            parent_id: parse_opt_uuid(self.parent_id, "parent")?,
            max_capacity: self.max_capacity,
            current_count: self.current_count,
            occupancy_epoch: self.occupancy_epoch,
            version: self.version,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

impl LocationRowWithId {
    fn try_into_location(self) -> Result<Location, DbError> {
        Ok(Location {
            id: parse_uuid(&self.record_id, "location")?,
            tenant_id: parse_uuid(&self.tenant_id, "tenant")?,
            name: self.name,
            parent_id: parse_opt_uuid(self.parent_id, "parent")?,
            max_capacity: self.max_capacity,
            current_count: self.current_count,
            occupancy_epoch: self.occupancy_epoch,
            version: self.version,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

#[derive(Clone)]
pub struct SurrealLocationRepository<C: Connection> {
    db: Surreal<C>,
}

impl<C: Connection> SurrealLocationRepository<C> {
    pub fn new(db: Surreal<C>) -> Self {
        Self { db }
    }
}

impl<C: Connection> VersionedRepository for SurrealLocationRepository<C> {
    type Resource = Location;
    type Create = CreateLocation;
    type Update = UpdateLocation;

    const KIND: ResourceKind = ResourceKind::Location;

    async fn locate(&self, id: Uuid) -> UpkeepResult<ResourceStamp> {
        Ok(versioned::locate(&self.db, Self::KIND, id).await?)
    }

    async fn create(&self, tenant_id: Uuid, input: CreateLocation) -> UpkeepResult<Location> {
        let id = Uuid::new_v4();
        let id_str = id.to_string();

        let result = self
            .db
            .query(
                "CREATE type::record('location', $id) SET \
                 tenant_id = $tenant_id, name = $name, \
                 parent_id = $parent_id, max_capacity = $max_capacity, \
                 current_count = 0, occupancy_epoch = 0, version = 0",
            )
            .bind(("id", id_str.clone()))
            .bind(("tenant_id", tenant_id.to_string()))
            .bind(("name", input.name))
            .bind(("parent_id", opt_uuid_string(input.parent_id)))
            .bind(("max_capacity", input.max_capacity))
            .await
            .map_err(DbError::from)?;

        let mut result = result
            .check()
            .map_err(|e| DbError::statement("location", e))?;

        let rows: Vec<LocationRow> = result.take(0).map_err(DbError::from)?;
        let row = rows
            .into_iter()
            .next()
            .ok_or_else(|| DbError::not_found("location", id_str))?;

        Ok(row.into_location(id)?)
    }

    async fn get_by_id(&self, tenant_id: Uuid, id: Uuid) -> UpkeepResult<Location> {
        let id_str = id.to_string();

        let mut result = self
            .db
            .query(
                "SELECT * FROM type::record('location', $id) \
                 WHERE tenant_id = $tenant_id",
            )
            .bind(("id", id_str.clone()))
            .bind(("tenant_id", tenant_id.to_string()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<LocationRow> = result.take(0).map_err(DbError::from)?;
        let row = rows
            .into_iter()
            .next()
            .ok_or_else(|| DbError::not_found("location", id_str))?;

        Ok(row.into_location(id)?)
    }

    async fn update(
        &self,
        tenant_id: Uuid,
        id: Uuid,
        expected_version: u64,
        input: UpdateLocation,
    ) -> UpkeepResult<Location> {
        let mut sets = Vec::new();
        if input.name.is_some() {
            sets.push("name = $name");
        }
        if input.parent_id.is_some() {
            sets.push("parent_id = $parent_id");
        }
        if input.max_capacity.is_some() {
            sets.push("max_capacity = $max_capacity");
        }
        sets.push("version = version + 1");
        sets.push("updated_at = time::now()");

        let query = format!(
            "UPDATE type::record('location', $id) SET {} \
             WHERE tenant_id = $tenant_id AND version = $expected_version",
            sets.join(", ")
        );

        let mut builder = self
            .db
            .query(&query)
            .bind(("id", id.to_string()))
            .bind(("tenant_id", tenant_id.to_string()))
            .bind(("expected_version", expected_version));

        if let Some(name) = input.name {
            builder = builder.bind(("name", name));
        }
        if let Some(parent_id) = input.parent_id {
            builder = builder.bind(("parent_id", opt_uuid_string(parent_id)));
        }
        if let Some(max_capacity) = input.max_capacity {
            builder = builder.bind(("max_capacity", max_capacity));
        }

        let result = builder.await.map_err(DbError::from)?;
        let mut result = result
            .check()
            .map_err(|e| DbError::statement("location", e))?;

        let rows: Vec<LocationRow> = result.take(0).map_err(DbError::from)?;
        match rows.into_iter().next() {
            Some(row) => Ok(row.into_location(id)?),
            None => {
                Err(versioned::missed_write(&self.db, Self::KIND, tenant_id, id, expected_version)
                    .await)
            }
        }
    }

    async fn delete(&self, tenant_id: Uuid, id: Uuid) -> UpkeepResult<()> {
        let id_str = id.to_string();

        let mut result = self
            .db
            .query(
                "DELETE type::record('location', $id) \
                 WHERE tenant_id = $tenant_id RETURN BEFORE",
            )
            .bind(("id", id_str.clone()))
            .bind(("tenant_id", tenant_id.to_string()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<LocationRow> = result.take(0).map_err(DbError::from)?;
        if rows.is_empty() {
            return Err(DbError::not_found("location", id_str).into());
        }

        Ok(())
    }

    async fn list(
        &self,
        tenant_id: Uuid,
        pagination: Pagination,
    ) -> UpkeepResult<PaginatedResult<Location>> {
        let total = versioned::count_in_tenant(&self.db, Self::KIND, tenant_id).await?;

        let mut result = self
            .db
            .query(
                "SELECT meta::id(id) AS record_id, * FROM location \
                 WHERE tenant_id = $tenant_id \
                 ORDER BY created_at ASC \
                 LIMIT $limit START $offset",
            )
            .bind(("tenant_id", tenant_id.to_string()))
            .bind(("limit", pagination.limit))
            .bind(("offset", pagination.offset))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<LocationRowWithId> = result.take(0).map_err(DbError::from)?;

        let items = rows
            .into_iter()
            .map(|row| row.try_into_location())
            .collect::<Result<Vec<_>, DbError>>()?;

        Ok(PaginatedResult {
            items,
            total,
            offset: pagination.offset,
            limit: pagination.limit,
        })
    }
}

impl<C: Connection> LocationRepository for SurrealLocationRepository<C> {
    async fn get_children(&self, tenant_id: Uuid, parent_id: Uuid) -> UpkeepResult<Vec<Location>> {
        let mut result = self
            .db
            .query(
                "SELECT meta::id(id) AS record_id, * FROM location \
                 WHERE tenant_id = $tenant_id AND parent_id = $parent_id \
                 ORDER BY created_at ASC",
            )
            .bind(("tenant_id", tenant_id.to_string()))
            .bind(("parent_id", parent_id.to_string()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<LocationRowWithId> = result.take(0).map_err(DbError::from)?;

        rows.into_iter()
            .map(|row| row.try_into_location())
            .collect::<Result<Vec<_>, DbError>>()
            .map_err(Into::into)
    }

    async fn get_ancestors(&self, tenant_id: Uuid, id: Uuid) -> UpkeepResult<Vec<Location>> {
        let tenant_id_str = tenant_id.to_string();
        let mut ancestors = Vec::new();
        let mut next = Some(id);

        // One extra hop fetches the starting location itself.
        for _ in 0..=MAX_ANCESTOR_DEPTH {
            let Some(current_id) = next else {
                return Ok(ancestors);
            };

            let mut result = self
                .db
                .query(
                    "SELECT * FROM type::record('location', $id) \
                     WHERE tenant_id = $tenant_id",
                )
                .bind(("id", current_id.to_string()))
                .bind(("tenant_id", tenant_id_str.clone()))
                .await
                .map_err(DbError::from)?;

            let rows: Vec<LocationRow> = result.take(0).map_err(DbError::from)?;
            let Some(row) = rows.into_iter().next() else {
                return Ok(ancestors);
            };

            let location = row.into_location(current_id)?;
            next = location.parent_id;

            // Only ancestors, not the starting location itself.
            if current_id != id {
                ancestors.push(location);
            }
        }

        if next.is_none() {
            return Ok(ancestors);
        }
        debug!(%tenant_id, location_id = %id, "Ancestor walk hit the depth limit");
        Err(UpkeepError::validation(format!(
            "location hierarchy exceeds the depth limit of {MAX_ANCESTOR_DEPTH}"
        )))
    }
}
