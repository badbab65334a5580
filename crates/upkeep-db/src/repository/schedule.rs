//! SurrealDB implementation of the maintenance schedule repository.

use chrono::{DateTime, Utc};
use surrealdb::{Connection, Surreal};
use surrealdb_types::SurrealValue;
use upkeep_core::error::UpkeepResult;
use upkeep_core::models::resource::{ResourceKind, ResourceStamp};
use upkeep_core::models::schedule::{CreateSchedule, Schedule, UpdateSchedule};
use upkeep_core::repository::{PaginatedResult, Pagination, VersionedRepository};
use uuid::Uuid;

use super::versioned::{self, opt_uuid_string, parse_opt_uuid, parse_uuid};
use crate::error::DbError;

#[derive(Debug, SurrealValue)]
struct ScheduleRow {
    tenant_id: String,
    name: String,
    asset_id: Option<String>,
    checklist_id: Option<String>,
    interval_days: u32,
    next_due_at: DateTime<Utc>,
    active: bool,
    version: u64,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

#[derive(Debug, SurrealValue)]
struct ScheduleRowWithId {
    record_id: String,
    tenant_id: String,
    name: String,
    asset_id: Option<String>,
    checklist_id: Option<String>,
    interval_days: u32,
    next_due_at: DateTime<Utc>,
    active: bool,
    version: u64,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl ScheduleRow {
    fn into_schedule(self, id: Uuid) -> Result<Schedule, DbError> {
        Ok(Schedule {
            id,
            tenant_id: parse_uuid(&self.tenant_id, "tenant")?,
            name: self.name,
            asset_id: parse_opt_uuid(self.asset_id, "asset")?,
            checklist_id: parse_opt_uuid(self.checklist_id, "checklist")?,
            interval_days: self.interval_days,
            next_due_at: self.next_due_at,
            active: self.active,
            version: self.version,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

impl ScheduleRowWithId {
    fn try_into_schedule(self) -> Result<Schedule, DbError> {
        Ok(Schedule {
            id: parse_uuid(&self.record_id, "schedule")?,
            tenant_id: parse_uuid(&self.tenant_id, "tenant")?,
            name: self.name,
            asset_id: parse_opt_uuid(self.asset_id, "asset")?,
            checklist_id: parse_opt_uuid(self.checklist_id, "checklist")?,
            interval_days: self.interval_days,
            next_due_at: self.next_due_at,
            active: self.active,
            version: self.version,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

#[derive(Clone)]
pub struct SurrealScheduleRepository<C: Connection> {
    db: Surreal<C>,
}

impl<C: Connection> SurrealScheduleRepository<C> {
    pub fn new(db: Surreal<C>) -> Self {
        Self { db }
    }
}

impl<C: Connection> VersionedRepository for SurrealScheduleRepository<C> {
    type Resource = Schedule;
    type Create = CreateSchedule;
    type Update = UpdateSchedule;

    const KIND: ResourceKind = ResourceKind::Schedule;

    async fn locate(&self, id: Uuid) -> UpkeepResult<ResourceStamp> {
        Ok(versioned::locate(&self.db, Self::KIND, id).await?)
    }

    async fn create(&self, tenant_id: Uuid, input: CreateSchedule) -> UpkeepResult<Schedule> {
        let id = Uuid::new_v4();
        let id_str = id.to_string();

        let result = self
            .db
            .query(
                "CREATE type::record('schedule', $id) SET \
                 tenant_id = $tenant_id, name = $name, \
                 asset_id = $asset_id, checklist_id = $checklist_id, \
                 interval_days = $interval_days, next_due_at = $next_due_at, \
                 active = true, version = 0",
            )
            .bind(("id", id_str.clone()))
            .bind(("tenant_id", tenant_id.to_string()))
            .bind(("name", input.name))
            .bind(("asset_id", opt_uuid_string(input.asset_id)))
            .bind(("checklist_id", opt_uuid_string(input.checklist_id)))
            .bind(("interval_days", input.interval_days))
            .bind(("next_due_at", input.next_due_at))
            .await
            .map_err(DbError::from)?;

        let mut result = result
            .check()
            .map_err(|e| DbError::statement("schedule", e))?;

        let rows: Vec<ScheduleRow> = result.take(0).map_err(DbError::from)?;
        let row = rows
            .into_iter()
            .next()
            .ok_or_else(|| DbError::not_found("schedule", id_str))?;

        Ok(row.into_schedule(id)?)
    }

    async fn get_by_id(&self, tenant_id: Uuid, id: Uuid) -> UpkeepResult<Schedule> {
        let id_str = id.to_string();

        let mut result = self
            .db
            .query(
                "SELECT * FROM type::record('schedule', $id) \
                 WHERE tenant_id = $tenant_id",
            )
            .bind(("id", id_str.clone()))
            .bind(("tenant_id", tenant_id.to_string()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<ScheduleRow> = result.take(0).map_err(DbError::from)?;
        let row = rows
            .into_iter()
            .next()
            .ok_or_else(|| DbError::not_found("schedule", id_str))?;

        Ok(row.into_schedule(id)?)
    }

    async fn update(
        &self,
        tenant_id: Uuid,
        id: Uuid,
        expected_version: u64,
        input: UpdateSchedule,
    ) -> UpkeepResult<Schedule> {
        let mut sets = Vec::new();
        if input.name.is_some() {
            sets.push("name = $name");
        }
        if input.asset_id.is_some() {
            sets.push("asset_id = $asset_id");
        }
        if input.checklist_id.is_some() {
            sets.push("checklist_id = $checklist_id");
        }
        if input.interval_days.is_some() {
            sets.push("interval_days = $interval_days");
        }
        if input.next_due_at.is_some() {
            sets.push("next_due_at = $next_due_at");
        }
        if input.active.is_some() {
            sets.push("active = $active");
        }
        sets.push("version = version + 1");
        sets.push("updated_at = time::now()");

        let query = format!(
            "UPDATE type::record('schedule', $id) SET {} \
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
        if let Some(asset_id) = input.asset_id {
            builder = builder.bind(("asset_id", opt_uuid_string(asset_id)));
        }
        if let Some(checklist_id) = input.checklist_id {
            builder = builder.bind(("checklist_id", opt_uuid_string(checklist_id)));
        }
        if let Some(interval_days) = input.interval_days {
            builder = builder.bind(("interval_days", interval_days));
        }
        if let Some(next_due_at) = input.next_due_at {
            builder = builder.bind(("next_due_at", next_due_at));
        }
        if let Some(active) = input.active {
            builder = builder.bind(("active", active));
        }

        let result = builder.await.map_err(DbError::from)?;
        let mut result = result
            .check()
            .map_err(|e| DbError::statement("schedule", e))?;

        let rows: Vec<ScheduleRow> = result.take(0).map_err(DbError::from)?;
        match rows.into_iter().next() {
            Some(row) => Ok(row.into_schedule(id)?),
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
                "DELETE type::record('schedule', $id) \
                 WHERE tenant_id = $tenant_id RETURN BEFORE",
            )
            .bind(("id", id_str.clone()))
            .bind(("tenant_id", tenant_id.to_string()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<ScheduleRow> = result.take(0).map_err(DbError::from)?;
        if rows.is_empty() {
            return Err(DbError::not_found("schedule", id_str).into());
        }

        Ok(())
    }

    async fn list(
        &self,
        tenant_id: Uuid,
        pagination: Pagination,
    ) -> UpkeepResult<PaginatedResult<Schedule>> {
        let total = versioned::count_in_tenant(&self.db, Self::KIND, tenant_id).await?;

        let mut result = self
            .db
            .query(
                "SELECT meta::id(id) AS record_id, * FROM schedule \
                 WHERE tenant_id = $tenant_id \
                 ORDER BY next_due_at ASC \
                 LIMIT $limit START $offset",
            )
            .bind(("tenant_id", tenant_id.to_string()))
            .bind(("limit", pagination.limit))
            .bind(("offset", pagination.offset))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<ScheduleRowWithId> = result.take(0).map_err(DbError::from)?;

        let items = rows
            .into_iter()
            .map(|row| row.try_into_schedule())
            .collect::<Result<Vec<_>, DbError>>()?;

        Ok(PaginatedResult {
            items,
            total,
            offset: pagination.offset,
            limit: pagination.limit,
        })
    }
}
