//! SurrealDB implementation of the department repository.

use chrono::{DateTime, Utc};
use surrealdb::{Connection, Surreal};
use surrealdb_types::SurrealValue;
use upkeep_core::error::UpkeepResult;
use upkeep_core::models::department::{CreateDepartment, Department, UpdateDepartment};
use upkeep_core::models::resource::{ResourceKind, ResourceStamp};
use upkeep_core::repository::{PaginatedResult, Pagination, VersionedRepository};
use uuid::Uuid;

use super::versioned::{self, opt_uuid_string, parse_opt_uuid, parse_uuid};
use crate::error::DbError;

#[derive(Debug, SurrealValue)]
struct DepartmentRow {
    tenant_id: String,
    name: String,
    description: String,
    manager_id: Option<String>,
    employee_count: u64,
    version: u64,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

#[derive(Debug, SurrealValue)]
struct DepartmentRowWithId {
    record_id: String,
    tenant_id: String,
    name: String,
    description: String,
    manager_id: Option<String>,
    employee_count: u64,
    version: u64,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl DepartmentRow {
    fn into_department(self, id: Uuid) -> Result<Department, DbError> {
        Ok(Department {
            id,
            tenant_id: parse_uuid(&self.tenant_id, "tenant")?,
            name: self.name,
            description: self.description,
            manager_id: parse_opt_uuid(self.manager_id, "manager")?,
            employee_count: self.employee_count,
            version: self.version,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

impl DepartmentRowWithId {
    fn try_into_department(self) -> Result<Department, DbError> {
        Ok(Department {
            id: parse_uuid(&self.record_id, "department")?,
            tenant_id: parse_uuid(&self.tenant_id, "tenant")?,
            name: self.name,
            description: self.description,
            manager_id: parse_opt_uuid(self.manager_id, "manager")?,
            employee_count: self.employee_count,
            version: self.version,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

#[derive(Clone)]
pub struct SurrealDepartmentRepository<C: Connection> {
    db: Surreal<C>,
}

impl<C: Connection> SurrealDepartmentRepository<C> {
    pub fn new(db: Surreal<C>) -> Self {
        Self { db }
    }
}

impl<C: Connection> VersionedRepository for SurrealDepartmentRepository<C> {
    type Resource = Department;
    type Create = CreateDepartment;
    type Update = UpdateDepartment;

    const KIND: ResourceKind = ResourceKind::Department;

    async fn locate(&self, id: Uuid) -> UpkeepResult<ResourceStamp> {
        Ok(versioned::locate(&self.db, Self::KIND, id).await?)
    }

    async fn create(&self, tenant_id: Uuid, input: CreateDepartment) -> UpkeepResult<Department> {
        let id = Uuid::new_v4();
        let id_str = id.to_string();

        let result = self
            .db
            .query(
                "CREATE type::record('department', $id) SET \
                 tenant_id = $tenant_id, name = $name, \
                 description = $description, manager_id = $manager_id, \
                 employee_count = 0, version = 0",
            )
            .bind(("id", id_str.clone()))
            .bind(("tenant_id", tenant_id.to_string()))
            .bind(("name", input.name))
            .bind(("description", input.description))
            .bind(("manager_id", opt_uuid_string(input.manager_id)))
            .await
            .map_err(DbError::from)?;

        let mut result = result
            .check()
            .map_err(|e| DbError::statement("department", e))?;

        let rows: Vec<DepartmentRow> = result.take(0).map_err(DbError::from)?;
        let row = rows
            .into_iter()
            .next()
            .ok_or_else(|| DbError::not_found("department", id_str))?;

        Ok(row.into_department(id)?)
    }

    async fn get_by_id(&self, tenant_id: Uuid, id: Uuid) -> UpkeepResult<Department> {
        let id_str = id.to_string();

        let mut result = self
            .db
            .query(
                "SELECT * FROM type::record('department', $id) \
                 WHERE tenant_id = $tenant_id",
            )
            .bind(("id", id_str.clone()))
            .bind(("tenant_id", tenant_id.to_string()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<DepartmentRow> = result.take(0).map_err(DbError::from)?;
        let row = rows
            .into_iter()
            .next()
            .ok_or_else(|| DbError::not_found("department", id_str))?;

        Ok(row.into_department(id)?)
    }

    async fn update(
        &self,
        tenant_id: Uuid,
        id: Uuid,
        expected_version: u64,
        input: UpdateDepartment,
    ) -> UpkeepResult<Department> {
        let mut sets = Vec::new();
        if input.name.is_some() {
            sets.push("name = $name");
        }
        if input.description.is_some() {
            sets.push("description = $description");
        }
        if input.manager_id.is_some() {
            sets.push("manager_id = $manager_id");
        }
        sets.push("version = version + 1");
        sets.push("updated_at = time::now()");

        let query = format!(
            "UPDATE type::record('department', $id) SET {} \
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
        if let Some(manager_id) = input.manager_id {
            builder = builder.bind(("manager_id", opt_uuid_string(manager_id)));
        }

        let result = builder.await.map_err(DbError::from)?;
        let mut result = result
            .check()
            .map_err(|e| DbError::statement("department", e))?;

        let rows: Vec<DepartmentRow> = result.take(0).map_err(DbError::from)?;
        match rows.into_iter().next() {
            Some(row) => Ok(row.into_department(id)?),
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
                "DELETE type::record('department', $id) \
                 WHERE tenant_id = $tenant_id RETURN BEFORE",
            )
            .bind(("id", id_str.clone()))
            .bind(("tenant_id", tenant_id.to_string()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<DepartmentRow> = result.take(0).map_err(DbError::from)?;
        if rows.is_empty() {
            return Err(DbError::not_found("department", id_str).into());
        }

        Ok(())
    }

    async fn list(
        &self,
        tenant_id: Uuid,
        pagination: Pagination,
    ) -> UpkeepResult<PaginatedResult<Department>> {
        let total = versioned::count_in_tenant(&self.db, Self::KIND, tenant_id).await?;

        let mut result = self
            .db
            .query(
                "SELECT meta::id(id) AS record_id, * FROM department \
                 WHERE tenant_id = $tenant_id \
                 ORDER BY created_at ASC \
                 LIMIT $limit START $offset",
            )
            .bind(("tenant_id", tenant_id.to_string()))
            .bind(("limit", pagination.limit))
            .bind(("offset", pagination.offset))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<DepartmentRowWithId> = result.take(0).map_err(DbError::from)?;

        let items = rows
            .into_iter()
            .map(|row| row.try_into_department())
            .collect::<Result<Vec<_>, DbError>>()?;

        Ok(PaginatedResult {
            items,
            total,
            offset: pagination.offset,
            limit: pagination.limit,
        })
    }
}
