//! Organizations: the tenants themselves. They live outside every
//! tenant, so nothing here takes a `tenant_id`.

use chrono::{DateTime, Utc};
use surrealdb::{Connection, Surreal};
use surrealdb_types::SurrealValue;
use upkeep_core::error::UpkeepResult;
use upkeep_core::models::organization::{CreateOrganization, Organization};
use upkeep_core::repository::{OrganizationRepository, PaginatedResult, Pagination};
use uuid::Uuid;

use super::versioned::{CountRow, parse_uuid};
use crate::error::DbError;

/// Every query selects `meta::id(id) AS record_id`, so one row shape
/// serves them all.
#[derive(Debug, SurrealValue)]
struct TenantRow {
    record_id: String,
    name: String,
    slug: String,
    metadata: serde_json::Value,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<TenantRow> for Organization {
    type Error = DbError;

    fn try_from(row: TenantRow) -> Result<Self, DbError> {
        Ok(Organization {
            id: parse_uuid(&row.record_id, "organization")?,
            name: row.name,
            slug: row.slug,
            metadata: row.metadata,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

#[derive(Clone)]
pub struct SurrealOrganizationRepository<C: Connection> {
    db: Surreal<C>,
}

impl<C: Connection> SurrealOrganizationRepository<C> {
    pub fn new(db: Surreal<C>) -> Self {
        Self { db }
    }

    /// The single organization matched by `filter`, which may refer to
    /// `$key`.
    async fn find_one(&self, filter: &str, key: String, shown: &str) -> UpkeepResult<Organization> {
        let query = format!("SELECT meta::id(id) AS record_id, * FROM {filter}");
        let mut result = self
            .db
            .query(&query)
            .bind(("key", key))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<TenantRow> = result.take(0).map_err(DbError::from)?;
        let row = rows
            .into_iter()
            .next()
            .ok_or_else(|| DbError::not_found("organization", shown))?;
        Ok(row.try_into()?)
    }
}

impl<C: Connection> OrganizationRepository for SurrealOrganizationRepository<C> {
    async fn create(&self, input: CreateOrganization) -> UpkeepResult<Organization> {
        let id = Uuid::new_v4();
        let metadata = input.metadata.unwrap_or_else(|| serde_json::json!({}));

        self.db
            .query(
                "CREATE type::record('organization', $id) \
                 SET name = $name, slug = $slug, metadata = $metadata",
            )
            .bind(("id", id.to_string()))
            .bind(("name", input.name))
            .bind(("slug", input.slug))
            .bind(("metadata", metadata))
            .await
            .map_err(DbError::from)?
            .check()
            .map_err(|e| DbError::statement("organization", e))?;

        self.get_by_id(id).await
    }

    async fn get_by_id(&self, id: Uuid) -> UpkeepResult<Organization> {
        let id = id.to_string();
        self.find_one("type::record('organization', $key)", id.clone(), &id)
            .await
    }

    async fn get_by_slug(&self, slug: &str) -> UpkeepResult<Organization> {
        self.find_one(
            "organization WHERE slug = $key",
            slug.to_string(),
            &format!("slug={slug}"),
        )
        .await
    }

    async fn list(&self, pagination: Pagination) -> UpkeepResult<PaginatedResult<Organization>> {
        let mut result = self
            .db
            .query("SELECT count() AS total FROM organization GROUP ALL")
            .query(
                "SELECT meta::id(id) AS record_id, * FROM organization \
                 ORDER BY created_at ASC LIMIT $limit START $offset",
            )
            .bind(("limit", pagination.limit))
            .bind(("offset", pagination.offset))
            .await
            .map_err(DbError::from)?;

        let counts: Vec<CountRow> = result.take(0).map_err(DbError::from)?;
        let rows: Vec<TenantRow> = result.take(1).map_err(DbError::from)?;

        Ok(PaginatedResult {
            items: rows
                .into_iter()
                .map(Organization::try_from)
                .collect::<Result<_, _>>()?,
            total: counts.first().map_or(0, |c| c.total),
            offset: pagination.offset,
            limit: pagination.limit,
        })
    }
}
