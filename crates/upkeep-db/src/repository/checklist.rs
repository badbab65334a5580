//! SurrealDB implementation of the checklist repository.
//!
//! Templates are stored as flexible objects and are expected to have
//! passed the document validator before they reach this layer.

use chrono::{DateTime, Utc};
use surrealdb::{Connection, Surreal};
use surrealdb_types::SurrealValue;
use upkeep_core::error::UpkeepResult;
use upkeep_core::models::checklist::{Checklist, CreateChecklist, UpdateChecklist};
use upkeep_core::models::resource::{ResourceKind, ResourceStamp};
use upkeep_core::repository::{PaginatedResult, Pagination, VersionedRepository};
use uuid::Uuid;

use super::versioned::{self, parse_uuid};
use crate::error::DbError;

#[derive(Debug, SurrealValue)]
struct ChecklistRow {
    tenant_id: String,
    name: String,
    description: String,
    template: Option<serde_json::Value>,
    version: u64,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

#[derive(Debug, SurrealValue)]
struct ChecklistRowWithId {
    record_id: String,
    tenant_id: String,
    name: String,
    description: String,
    template: Option<serde_json::Value>,
    version: u64,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl ChecklistRow {
    fn into_checklist(self, id: Uuid) -> Result<Checklist, DbError> {
        Ok(Checklist {
            id,
            tenant_id: parse_uuid(&self.tenant_id, "tenant")?,
            name: self.name,
            description: self.description,
            template: self.template,
            version: self.version,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

impl ChecklistRowWithId {
    fn try_into_checklist(self) -> Result<Checklist, DbError> {
        Ok(Checklist {
            id: parse_uuid(&self.record_id, "checklist")?,
            tenant_id: parse_uuid(&self.tenant_id, "tenant")?,
            name: self.name,
            description: self.description,
            template: self.template,
            version: self.version,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

#[derive(Clone)]
pub struct SurrealChecklistRepository<C: Connection> {
    db: Surreal<C>,
}

impl<C: Connection> SurrealChecklistRepository<C> {
    pub fn new(db: Surreal<C>) -> Self {
        Self { db }
    }
}

impl<C: Connection> VersionedRepository for SurrealChecklistRepository<C> {
    type Resource = Checklist;
    type Create = CreateChecklist;
    type Update = UpdateChecklist;

    const KIND: ResourceKind = ResourceKind::Checklist;

    async fn locate(&self, id: Uuid) -> UpkeepResult<ResourceStamp> {
        Ok(versioned::locate(&self.db, Self::KIND, id).await?)
    }

    async fn create(&self, tenant_id: Uuid, input: CreateChecklist) -> UpkeepResult<Checklist> {
        let id = Uuid::new_v4();
        let id_str = id.to_string();

        let result = self
            .db
            .query(
                "CREATE type::record('checklist', $id) SET \
                 tenant_id = $tenant_id, name = $name, \
                 description = $description, template = $template, \
                 version = 0",
            )
            .bind(("id", id_str.clone()))
            .bind(("tenant_id", tenant_id.to_string()))
            .bind(("name", input.name))
            .bind(("description", input.description))
            .bind(("template", input.template))
            .await
            .map_err(DbError::from)?;

        let mut result = result
            .check()
            .map_err(|e| DbError::statement("checklist", e))?;

        let rows: Vec<ChecklistRow> = result.take(0).map_err(DbError::from)?;
        let row = rows
            .into_iter()
            .next()
            .ok_or_else(|| DbError::not_found("checklist", id_str))?;

        Ok(row.into_checklist(id)?)
    }

    async fn get_by_id(&self, tenant_id: Uuid, id: Uuid) -> UpkeepResult<Checklist> {
        let id_str = id.to_string();

        let mut result = self
            .db
            .query(
                "SELECT * FROM type::record('checklist', $id) \
                 WHERE tenant_id = $tenant_id",
            )
            .bind(("id", id_str.clone()))
            .bind(("tenant_id", tenant_id.to_string()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<ChecklistRow> = result.take(0).map_err(DbError::from)?;
        let row = rows
            .into_iter()
            .next()
            .ok_or_else(|| DbError::not_found("checklist", id_str))?;

        Ok(row.into_checklist(id)?)
    }

    async fn update(
        &self,
        tenant_id: Uuid,
        id: Uuid,
        expected_version: u64,
        input: UpdateChecklist,
    ) -> UpkeepResult<Checklist> {
        let mut sets = Vec::new();
        if input.name.is_some() {
            sets.push("name = $name");
        }
        if input.description.is_some() {
            sets.push("description = $description");
        }
        if input.template.is_some() {
            sets.push("template = $template");
        }
        sets.push("version = version + 1");
        sets.push("updated_at = time::now()");

        let query = format!(
            "UPDATE type::record('checklist', $id) SET {} \
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
        if let Some(description) = input.description {
            builder = builder.bind(("description", description));
        }
        if let Some(template) = input.template {
            builder = builder.bind(("template", template));
        }

        let result = builder.await.map_err(DbError::from)?;
        let mut result = result
            .check()
            .map_err(|e| DbError::statement("checklist", e))?;

        let rows: Vec<ChecklistRow> = result.take(0).map_err(DbError::from)?;
        match rows.into_iter().next() {
            Some(row) => Ok(row.into_checklist(id)?),
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
                "DELETE type::record('checklist', $id) \
                 WHERE tenant_id = $tenant_id RETURN BEFORE",
            )
            .bind(("id", id_str.clone()))
            .bind(("tenant_id", tenant_id.to_string()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<ChecklistRow> = result.take(0).map_err(DbError::from)?;
        if rows.is_empty() {
            return Err(DbError::not_found("checklist", id_str).into());
        }

        Ok(())
    }

    async fn list(
        &self,
        tenant_id: Uuid,
        pagination: Pagination,
    ) -> UpkeepResult<PaginatedResult<Checklist>> {
        let total = versioned::count_in_tenant(&self.db, Self::KIND, tenant_id).await?;

        let mut result = self
            .db
            .query(
                "SELECT meta::id(id) AS record_id, * FROM checklist \
                 WHERE tenant_id = $tenant_id \
                 ORDER BY created_at ASC \
                 LIMIT $limit START $offset",
            )
            .bind(("tenant_id", tenant_id.to_string()))
            .bind(("limit", pagination.limit))
            .bind(("offset", pagination.offset))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<ChecklistRowWithId> = result.take(0).map_err(DbError::from)?;

        let items = rows
            .into_iter()
            .map(|row| row.try_into_checklist())
            .collect::<Result<Vec<_>, DbError>>()?;

        Ok(PaginatedResult {
            items,
            total,
            offset: pagination.offset,
            limit: pagination.limit,
        })
    }
}
