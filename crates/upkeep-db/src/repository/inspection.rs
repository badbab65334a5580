//! SurrealDB implementation of the inspection repository.

use chrono::{DateTime, Utc};
use surrealdb::{Connection, Surreal};
use surrealdb_types::SurrealValue;
use upkeep_core::error::UpkeepResult;
use upkeep_core::models::inspection::{CreateInspection, Inspection, UpdateInspection};
use upkeep_core::models::resource::{ResourceKind, ResourceStamp};
use upkeep_core::repository::{PaginatedResult, Pagination, VersionedRepository};
use uuid::Uuid;

use super::versioned::{self, opt_uuid_string, parse_opt_uuid, parse_uuid};
use crate::error::DbError;

#[derive(Debug, SurrealValue)]
struct InspectionRow {
    tenant_id: String,
    checklist_id: String,
    asset_id: Option<String>,
    inspector_id: String,
    status: String,
    report: Option<serde_json::Value>,
    completed_at: Option<DateTime<Utc>>,
    version: u64,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

#[derive(Debug, SurrealValue)]
struct InspectionRowWithId {
    record_id: String,
    tenant_id: String,
    checklist_id: String,
    asset_id: Option<String>,
    inspector_id: String,
    status: String,
    report: Option<serde_json::Value>,
    completed_at: Option<DateTime<Utc>>,
    version: u64,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl InspectionRow {
    fn into_inspection(self, id: Uuid) -> Result<Inspection, DbError> {
        Ok(Inspection {
            id,
            tenant_id: parse_uuid(&self.tenant_id, "tenant")?,
            checklist_id: parse_uuid(&self.checklist_id, "checklist")?,
            asset_id: parse_opt_uuid(self.asset_id, "asset")?,
            inspector_id: parse_uuid(&self.inspector_id, "inspector")?,
            status: self
                .status
                .parse()
                .map_err(|e| DbError::corrupt("inspection status", e))?,
            report: self.report,
            completed_at: self.completed_at,
            version: self.version,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

impl InspectionRowWithId {
    fn try_into_inspection(self) -> Result<Inspection, DbError> {
        let id = parse_uuid(&self.record_id, "inspection")?;
        InspectionRow {
            tenant_id: self.tenant_id,
            checklist_id: self.checklist_id,
            asset_id: self.asset_id,
            inspector_id: self.inspector_id,
            status: self.status,
            report: self.report,
            completed_at: self.completed_at,
            version: self.version,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
        .into_inspection(id)
    }
}

#[derive(Clone)]
pub struct SurrealInspectionRepository<C: Connection> {
    db: Surreal<C>,
}

impl<C: Connection> SurrealInspectionRepository<C> {
    pub fn new(db: Surreal<C>) -> Self {
        Self { db }
    }
}

impl<C: Connection> VersionedRepository for SurrealInspectionRepository<C> {
    type Resource = Inspection;
    type Create = CreateInspection;
    type Update = UpdateInspection;

    const KIND: ResourceKind = ResourceKind::Inspection;

    async fn locate(&self, id: Uuid) -> UpkeepResult<ResourceStamp> {
        Ok(versioned::locate(&self.db, Self::KIND, id).await?)
    }

    async fn create(&self, tenant_id: Uuid, input: CreateInspection) -> UpkeepResult<Inspection> {
        let id = Uuid::new_v4();
        let id_str = id.to_string();

        let result = self
            .db
            .query(
                "CREATE type::record('inspection', $id) SET \
                 tenant_id = $tenant_id, checklist_id = $checklist_id, \
                 asset_id = $asset_id, inspector_id = $inspector_id, \
                 status = $status, report = $report, \
                 completed_at = $completed_at, version = 0",
            )
            .bind(("id", id_str.clone()))
            .bind(("tenant_id", tenant_id.to_string()))
            .bind(("checklist_id", input.checklist_id.to_string()))
            .bind(("asset_id", opt_uuid_string(input.asset_id)))
            .bind(("inspector_id", input.inspector_id.to_string()))
            .bind(("status", input.status.as_str()))
            .bind(("report", input.report))
            .bind(("completed_at", input.completed_at))
            .await
            .map_err(DbError::from)?;

        let mut result = result
            .check()
            .map_err(|e| DbError::statement("inspection", e))?;

        let rows: Vec<InspectionRow> = result.take(0).map_err(DbError::from)?;
        let row = rows
            .into_iter()
            .next()
            .ok_or_else(|| DbError::not_found("inspection", id_str))?;

        Ok(row.into_inspection(id)?)
    }

    async fn get_by_id(&self, tenant_id: Uuid, id: Uuid) -> UpkeepResult<Inspection> {
        let id_str = id.to_string();

        let mut result = self
            .db
            .query(
                "SELECT * FROM type::record('inspection', $id) \
                 WHERE tenant_id = $tenant_id",
            )
            .bind(("id", id_str.clone()))
            .bind(("tenant_id", tenant_id.to_string()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<InspectionRow> = result.take(0).map_err(DbError::from)?;
        let row = rows
            .into_iter()
            .next()
            .ok_or_else(|| DbError::not_found("inspection", id_str))?;

        Ok(row.into_inspection(id)?)
    }

    async fn update(
        &self,
        tenant_id: Uuid,
        id: Uuid,
        expected_version: u64,
        input: UpdateInspection,
    ) -> UpkeepResult<Inspection> {
        let mut sets = Vec::new();
        if input.asset_id.is_some() {
            sets.push("asset_id = $asset_id");
        }
        if input.status.is_some() {
            sets.push("status = $status");
        }
        if input.report.is_some() {
            sets.push("report = $report");
        }
        if input.completed_at.is_some() {
            sets.push("completed_at = $completed_at");
        }
        sets.push("version = version + 1");
        sets.push("updated_at = time::now()");

        let query = format!(
            "UPDATE type::record('inspection', $id) SET {} \
             WHERE tenant_id = $tenant_id AND version = $expected_version",
            sets.join(", ")
        );

        let mut builder = self
            .db
            .query(&query)
            .bind(("id", id.to_string()))
            .bind(("tenant_id", tenant_id.to_string()))
            .bind(("expected_version", expected_version));

        if let Some(asset_id) = input.asset_id {
            builder = builder.bind(("asset_id", opt_uuid_string(asset_id)));
        }
        if let Some(status) = input.status {
            builder = builder.bind(("status", status.as_str()));
        }
        if let Some(report) = input.report {
            builder = builder.bind(("report", report));
        }
        if let Some(completed_at) = input.completed_at {
            builder = builder.bind(("completed_at", completed_at));
        }

        let result = builder.await.map_err(DbError::from)?;
        let mut result = result
            .check()
            .map_err(|e| DbError::statement("inspection", e))?;

        let rows: Vec<InspectionRow> = result.take(0).map_err(DbError::from)?;
        match rows.into_iter().next() {
            Some(row) => Ok(row.into_inspection(id)?),
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
                "DELETE type::record('inspection', $id) \
                 WHERE tenant_id = $tenant_id RETURN BEFORE",
            )
            .bind(("id", id_str.clone()))
            .bind(("tenant_id", tenant_id.to_string()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<InspectionRow> = result.take(0).map_err(DbError::from)?;
        if rows.is_empty() {
            return Err(DbError::not_found("inspection", id_str).into());
        }

        Ok(())
    }

    async fn list(
        &self,
        tenant_id: Uuid,
        pagination: Pagination,
    ) -> UpkeepResult<PaginatedResult<Inspection>> {
        let total = versioned::count_in_tenant(&self.db, Self::KIND, tenant_id).await?;

        let mut result = self
            .db
            .query(
                "SELECT meta::id(id) AS record_id, * FROM inspection \
                 WHERE tenant_id = $tenant_id \
                 ORDER BY created_at ASC \
                 LIMIT $limit START $offset",
            )
            .bind(("tenant_id", tenant_id.to_string()))
            .bind(("limit", pagination.limit))
            .bind(("offset", pagination.offset))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<InspectionRowWithId> = result.take(0).map_err(DbError::from)?;

        let items = rows
            .into_iter()
            .map(|row| row.try_into_inspection())
            .collect::<Result<Vec<_>, DbError>>()?;

        Ok(PaginatedResult {
            items,
            total,
            offset: pagination.offset,
            limit: pagination.limit,
        })
    }
}
