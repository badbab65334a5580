//! Versioned schema and the migration runner.
//!
//! Tables are SCHEMAFULL. UUIDs are kept as strings and enums as
//! strings guarded by `ASSERT`. Every tenant-scoped table pins
//! `tenant_id` with `READONLY` and carries a non-negative `version`
//! for compare-and-swap updates.

use surrealdb::{Connection, Surreal};
use surrealdb_types::SurrealValue;
use tracing::info;

use crate::error::DbError;

// -----------------------------------------------------------------------
// Migration tracking
// -----------------------------------------------------------------------

const MIGRATION_TABLE_DDL: &str = "\
DEFINE TABLE IF NOT EXISTS _migration SCHEMAFULL;
DEFINE FIELD IF NOT EXISTS version ON TABLE _migration TYPE int;
DEFINE FIELD IF NOT EXISTS name ON TABLE _migration TYPE string;
DEFINE FIELD IF NOT EXISTS applied_at ON TABLE _migration TYPE datetime \
    DEFAULT time::now();
DEFINE INDEX IF NOT EXISTS idx_migration_version ON TABLE _migration \
    COLUMNS version UNIQUE;
";

#[derive(Debug, SurrealValue)]
struct MigrationRecord {
    version: u32,
}

struct Migration {
    version: u32,
    name: &'static str,
    sql: &'static str,
}

static MIGRATIONS: &[Migration] = &[Migration {
    version: 1,
    name: "initial_schema",
    sql: SCHEMA_V1,
}];

// -----------------------------------------------------------------------
// Schema v1: tenants and the asset/maintenance record families
// -----------------------------------------------------------------------

const SCHEMA_V1: &str = "\
-- =======================================================================
-- Organizations (global scope; each one is a tenant)
-- =======================================================================
DEFINE TABLE organization SCHEMAFULL;
DEFINE FIELD name ON TABLE organization TYPE string;
DEFINE FIELD slug ON TABLE organization TYPE string;
DEFINE FIELD metadata ON TABLE organization TYPE object FLEXIBLE \
    DEFAULT {};
DEFINE FIELD created_at ON TABLE organization TYPE datetime \
    DEFAULT time::now() READONLY;
DEFINE FIELD updated_at ON TABLE organization TYPE datetime \
    DEFAULT time::now();
DEFINE INDEX idx_organization_slug ON TABLE organization \
    COLUMNS slug UNIQUE;

-- =======================================================================
-- Users (tenant scope)
-- =======================================================================
DEFINE TABLE user SCHEMAFULL;
DEFINE FIELD tenant_id ON TABLE user TYPE string READONLY;
DEFINE FIELD username ON TABLE user TYPE string;
DEFINE FIELD email ON TABLE user TYPE string;
DEFINE FIELD password_hash ON TABLE user TYPE string;
DEFINE FIELD role ON TABLE user TYPE string \
    ASSERT $value IN ['Admin', 'Supervisor', 'Inspector'];
DEFINE FIELD status ON TABLE user TYPE string \
    ASSERT $value IN ['Active', 'Inactive', 'Locked', \
    'PendingVerification'];
DEFINE FIELD department_id ON TABLE user TYPE option<string>;
DEFINE FIELD metadata ON TABLE user TYPE object FLEXIBLE DEFAULT {};
DEFINE FIELD version ON TABLE user TYPE int DEFAULT 0 \
    ASSERT $value >= 0;
DEFINE FIELD created_at ON TABLE user TYPE datetime \
    DEFAULT time::now() READONLY;
DEFINE FIELD updated_at ON TABLE user TYPE datetime \
    DEFAULT time::now();
DEFINE INDEX idx_user_tenant_username ON TABLE user \
    COLUMNS tenant_id, username UNIQUE;
DEFINE INDEX idx_user_tenant_email ON TABLE user \
    COLUMNS tenant_id, email UNIQUE;
DEFINE INDEX idx_user_department ON TABLE user \
    COLUMNS tenant_id, department_id;

-- =======================================================================
-- Departments (tenant scope)
-- =======================================================================
DEFINE TABLE department SCHEMAFULL;
DEFINE FIELD tenant_id ON TABLE department TYPE string READONLY;
DEFINE FIELD name ON TABLE department TYPE string;
DEFINE FIELD description ON TABLE department TYPE string DEFAULT '';
DEFINE FIELD manager_id ON TABLE department TYPE option<string>;
DEFINE FIELD employee_count ON TABLE department TYPE int DEFAULT 0 \
    ASSERT $value >= 0;
DEFINE FIELD version ON TABLE department TYPE int DEFAULT 0 \
    ASSERT $value >= 0;
DEFINE FIELD created_at ON TABLE department TYPE datetime \
    DEFAULT time::now() READONLY;
DEFINE FIELD updated_at ON TABLE department TYPE datetime \
    DEFAULT time::now();
DEFINE INDEX idx_department_tenant_name ON TABLE department \
    COLUMNS tenant_id, name UNIQUE;

-- =======================================================================
-- Locations (tenant scope, tree via parent_id)
-- =======================================================================
DEFINE TABLE location SCHEMAFULL;
DEFINE FIELD tenant_id ON TABLE location TYPE string READONLY;
DEFINE FIELD name ON TABLE location TYPE string;
DEFINE FIELD parent_id ON TABLE location TYPE option<string>;
DEFINE FIELD max_capacity ON TABLE location TYPE option<int> \
    ASSERT $value = NONE OR $value >= 0;
DEFINE FIELD current_count ON TABLE location TYPE int DEFAULT 0 \
    ASSERT $value >= 0;
DEFINE FIELD occupancy_epoch ON TABLE location TYPE int DEFAULT 0 \
    ASSERT $value >= 0;
DEFINE FIELD version ON TABLE location TYPE int DEFAULT 0 \
    ASSERT $value >= 0;
DEFINE FIELD created_at ON TABLE location TYPE datetime \
    DEFAULT time::now() READONLY;
DEFINE FIELD updated_at ON TABLE location TYPE datetime \
    DEFAULT time::now();
DEFINE INDEX idx_location_parent ON TABLE location \
    COLUMNS tenant_id, parent_id;

-- =======================================================================
-- Suppliers (tenant scope)
-- =======================================================================
DEFINE TABLE supplier SCHEMAFULL;
DEFINE FIELD tenant_id ON TABLE supplier TYPE string READONLY;
DEFINE FIELD name ON TABLE supplier TYPE string;
DEFINE FIELD code ON TABLE supplier TYPE string;
DEFINE FIELD contact_email ON TABLE supplier TYPE option<string>;
DEFINE FIELD metadata ON TABLE supplier TYPE object FLEXIBLE DEFAULT {};
DEFINE FIELD version ON TABLE supplier TYPE int DEFAULT 0 \
    ASSERT $value >= 0;
DEFINE FIELD created_at ON TABLE supplier TYPE datetime \
    DEFAULT time::now() READONLY;
DEFINE FIELD updated_at ON TABLE supplier TYPE datetime \
    DEFAULT time::now();
DEFINE INDEX idx_supplier_tenant_code ON TABLE supplier \
    COLUMNS tenant_id, code UNIQUE;

-- =======================================================================
-- Assets (tenant scope)
-- =======================================================================
DEFINE TABLE asset SCHEMAFULL;
DEFINE FIELD tenant_id ON TABLE asset TYPE string READONLY;
DEFINE FIELD name ON TABLE asset TYPE string;
DEFINE FIELD asset_tag ON TABLE asset TYPE string;
DEFINE FIELD status ON TABLE asset TYPE string \
    ASSERT $value IN ['Available', 'InUse', 'Maintenance', 'Retired'];
DEFINE FIELD assigned_to ON TABLE asset TYPE option<string>;
DEFINE FIELD location_id ON TABLE asset TYPE option<string>;
DEFINE FIELD supplier_id ON TABLE asset TYPE option<string>;
DEFINE FIELD metadata ON TABLE asset TYPE object FLEXIBLE DEFAULT {};
DEFINE FIELD version ON TABLE asset TYPE int DEFAULT 0 \
    ASSERT $value >= 0;
DEFINE FIELD created_at ON TABLE asset TYPE datetime \
    DEFAULT time::now() READONLY;
DEFINE FIELD updated_at ON TABLE asset TYPE datetime \
    DEFAULT time::now();
DEFINE INDEX idx_asset_tenant_tag ON TABLE asset \
    COLUMNS tenant_id, asset_tag UNIQUE;
DEFINE INDEX idx_asset_location ON TABLE asset \
    COLUMNS tenant_id, location_id;
DEFINE INDEX idx_asset_supplier ON TABLE asset \
    COLUMNS tenant_id, supplier_id;

-- =======================================================================
-- Checklists (tenant scope)
-- =======================================================================
DEFINE TABLE checklist SCHEMAFULL;
DEFINE FIELD tenant_id ON TABLE checklist TYPE string READONLY;
DEFINE FIELD name ON TABLE checklist TYPE string;
DEFINE FIELD description ON TABLE checklist TYPE string DEFAULT '';
DEFINE FIELD template ON TABLE checklist TYPE option<object> FLEXIBLE;
DEFINE FIELD version ON TABLE checklist TYPE int DEFAULT 0 \
    ASSERT $value >= 0;
DEFINE FIELD created_at ON TABLE checklist TYPE datetime \
    DEFAULT time::now() READONLY;
DEFINE FIELD updated_at ON TABLE checklist TYPE datetime \
    DEFAULT time::now();

-- =======================================================================
-- Maintenance schedules (tenant scope)
-- =======================================================================
DEFINE TABLE schedule SCHEMAFULL;
DEFINE FIELD tenant_id ON TABLE schedule TYPE string READONLY;
DEFINE FIELD name ON TABLE schedule TYPE string;
DEFINE FIELD asset_id ON TABLE schedule TYPE option<string>;
DEFINE FIELD checklist_id ON TABLE schedule TYPE option<string>;
DEFINE FIELD interval_days ON TABLE schedule TYPE int \
    ASSERT $value > 0;
DEFINE FIELD next_due_at ON TABLE schedule TYPE datetime;
DEFINE FIELD active ON TABLE schedule TYPE bool DEFAULT true;
DEFINE FIELD version ON TABLE schedule TYPE int DEFAULT 0 \
    ASSERT $value >= 0;
DEFINE FIELD created_at ON TABLE schedule TYPE datetime \
    DEFAULT time::now() READONLY;
DEFINE FIELD updated_at ON TABLE schedule TYPE datetime \
    DEFAULT time::now();
DEFINE INDEX idx_schedule_checklist ON TABLE schedule \
    COLUMNS tenant_id, checklist_id;

-- =======================================================================
-- Inspections (tenant scope)
-- =======================================================================
DEFINE TABLE inspection SCHEMAFULL;
DEFINE FIELD tenant_id ON TABLE inspection TYPE string READONLY;
DEFINE FIELD checklist_id ON TABLE inspection TYPE string;
DEFINE FIELD asset_id ON TABLE inspection TYPE option<string>;
DEFINE FIELD inspector_id ON TABLE inspection TYPE string;
DEFINE FIELD status ON TABLE inspection TYPE string \
    ASSERT $value IN ['Pending', 'Completed'];
DEFINE FIELD report ON TABLE inspection TYPE option<object> FLEXIBLE;
DEFINE FIELD completed_at ON TABLE inspection TYPE option<datetime>;
DEFINE FIELD version ON TABLE inspection TYPE int DEFAULT 0 \
    ASSERT $value >= 0;
DEFINE FIELD created_at ON TABLE inspection TYPE datetime \
    DEFAULT time::now() READONLY;
DEFINE FIELD updated_at ON TABLE inspection TYPE datetime \
    DEFAULT time::now();
DEFINE INDEX idx_inspection_checklist ON TABLE inspection \
    COLUMNS tenant_id, checklist_id;
";

// -----------------------------------------------------------------------
// Runner
// -----------------------------------------------------------------------

/// Highest migration version recorded in `_migration`, 0 on a fresh
/// database.
async fn applied_version<C: Connection>(db: &Surreal<C>) -> Result<u32, DbError> {
    let mut result = db
        .query("SELECT version FROM _migration ORDER BY version DESC LIMIT 1")
        .await?;
    let rows: Vec<MigrationRecord> = result.take(0)?;
    Ok(rows.into_iter().map(|r| r.version).max().unwrap_or(0))
}

async fn apply<C: Connection>(db: &Surreal<C>, migration: &Migration) -> Result<(), DbError> {
    let failed = |stage: &str, e: surrealdb::Error| {
        DbError::Migration(format!(
            "v{} ({}) {stage}: {e}",
            migration.version, migration.name
        ))
    };

    db.query(migration.sql)
        .await?
        .check()
        .map_err(|e| failed("failed", e))?;

    db.query("CREATE _migration SET version = $version, name = $name")
        .bind(("version", migration.version))
        .bind(("name", migration.name))
        .await?
        .check()
        .map_err(|e| failed("applied but not recorded", e))?;

    Ok(())
}

/// Bring the schema up to date.
///
/// Applies, in order, every migration newer than the last one recorded.
/// Safe to call on every start.
pub async fn run_migrations<C: Connection>(db: &Surreal<C>) -> Result<(), DbError> {
    db.query(MIGRATION_TABLE_DDL)
        .await?
        .check()
        .map_err(|e| DbError::Migration(format!("tracking table: {e}")))?;

    let current = applied_version(db).await?;
    let pending = MIGRATIONS.iter().filter(|m| m.version > current);

    for migration in pending {
        info!(version = migration.version, name = migration.name, "Applying migration");
        apply(db, migration).await?;
    }

    info!(version = MIGRATIONS.last().map_or(0, |m| m.version), "Schema is current");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tenant_tables_are_pinned_and_versioned() {
        for table in [
            "user",
            "department",
            "location",
            "supplier",
            "asset",
            "checklist",
            "schedule",
            "inspection",
        ] {
            assert!(
                SCHEMA_V1.contains(&format!(
                    "DEFINE FIELD tenant_id ON TABLE {table} TYPE string READONLY;"
                )),
                "{table} tenant_id must be READONLY"
            );
            assert!(
                SCHEMA_V1.contains(&format!(
                    "DEFINE FIELD version ON TABLE {table} TYPE int DEFAULT 0"
                )),
                "{table} must carry a version"
            );
        }
    }

    #[test]
    fn migrations_are_ordered() {
        for window in MIGRATIONS.windows(2) {
            assert!(
                window[0].version < window[1].version,
                "Migrations must be in ascending version order"
            );
        }
    }
}
