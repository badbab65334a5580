//! Integration tests for the record repositories using in-memory
//! SurrealDB.

use upkeep_core::context::Role;
use upkeep_core::error::{ConflictReason, UpkeepError};
use upkeep_core::models::asset::{AssetStatus, CreateAsset, UpdateAsset};
use upkeep_core::models::department::{CreateDepartment, UpdateDepartment};
use upkeep_core::models::organization::CreateOrganization;
use upkeep_core::models::supplier::{CreateSupplier, UpdateSupplier};
use upkeep_core::models::user::{CreateUser, UpdateUser, UserStatus};
use upkeep_core::repository::{
    OrganizationRepository, Pagination, UserRepository, VersionedRepository,
};
use upkeep_db::repository::{
    SurrealAssetRepository, SurrealDepartmentRepository, SurrealOrganizationRepository,
    SurrealSupplierRepository, SurrealUserRepository,
};
use surrealdb::Surreal;
use surrealdb::engine::local::{Db, Mem};
use uuid::Uuid;

/// Helper: spin up in-memory DB, run migrations, create two tenants.
async fn setup() -> (Surreal<Db>, Uuid, Uuid) {
    let db = Surreal::new::<Mem>(()).await.unwrap();
    db.use_ns("test").use_db("test").await.unwrap();
    upkeep_db::run_migrations(&db).await.unwrap();

    let orgs = SurrealOrganizationRepository::new(db.clone());
    let a = orgs
        .create(CreateOrganization {
            name: "Tenant A".into(),
            slug: "tenant-a".into(),
            metadata: None,
        })
        .await
        .unwrap();
    let b = orgs
        .create(CreateOrganization {
            name: "Tenant B".into(),
            slug: "tenant-b".into(),
            metadata: None,
        })
        .await
        .unwrap();

    (db, a.id, b.id)
}

fn supplier(code: &str) -> CreateSupplier {
    CreateSupplier {
        name: format!("Supplier {code}"),
        code: code.into(),
        contact_email: None,
        metadata: None,
    }
}

fn asset(tag: &str) -> CreateAsset {
    CreateAsset {
        name: format!("Asset {tag}"),
        asset_tag: tag.into(),
        status: AssetStatus::Available,
        assigned_to: None,
        location_id: None,
        supplier_id: None,
        metadata: None,
    }
}

// -----------------------------------------------------------------------
// Organizations
// -----------------------------------------------------------------------

#[tokio::test]
async fn organization_lookup_by_id_and_slug() {
    let (db, tenant_a, _) = setup().await;
    let repo = SurrealOrganizationRepository::new(db);

    let by_id = repo.get_by_id(tenant_a).await.unwrap();
    assert_eq!(by_id.slug, "tenant-a");

    let by_slug = repo.get_by_slug("tenant-a").await.unwrap();
    assert_eq!(by_slug.id, tenant_a);

    let page = repo.list(Pagination::default()).await.unwrap();
    assert_eq!(page.total, 2);

    let err = repo.get_by_slug("missing").await.unwrap_err();
    assert!(matches!(err, UpkeepError::NotFound { .. }));
}

#[tokio::test]
async fn duplicate_organization_slug_is_a_conflict() {
    let (db, _, _) = setup().await;
    let repo = SurrealOrganizationRepository::new(db);

    let err = repo
        .create(CreateOrganization {
            name: "Again".into(),
            slug: "tenant-a".into(),
            metadata: None,
        })
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        UpkeepError::Conflict(ConflictReason::Duplicate { .. })
    ));
}

// -----------------------------------------------------------------------
// Versioned writes
// -----------------------------------------------------------------------

#[tokio::test]
async fn create_starts_at_version_zero() {
    let (db, tenant, _) = setup().await;
    let repo = SurrealSupplierRepository::new(db);

    let created = repo.create(tenant, supplier("ACME")).await.unwrap();
    assert_eq!(created.version, 0);
    assert_eq!(created.tenant_id, tenant);
    assert_eq!(created.metadata, serde_json::json!({}));

    let stamp = repo.locate(created.id).await.unwrap();
    assert_eq!(stamp.tenant_id, tenant);
    assert_eq!(stamp.version, 0);
}

#[tokio::test]
async fn matching_version_applies_and_bumps_by_one() {
    let (db, tenant, _) = setup().await;
    let repo = SurrealSupplierRepository::new(db);
    let created = repo.create(tenant, supplier("ACME")).await.unwrap();

    let updated = repo
        .update(
            tenant,
            created.id,
            0,
            UpdateSupplier {
                name: Some("Acme Tools".into()),
                contact_email: Some(Some("sales@acme.test".into())),
                ..Default::default()
            },
        )
        .await
        .unwrap();

    assert_eq!(updated.version, 1);
    assert_eq!(updated.name, "Acme Tools");
    assert_eq!(updated.contact_email.as_deref(), Some("sales@acme.test"));
    assert_eq!(updated.code, "ACME");
    assert!(updated.updated_at >= created.updated_at);
}

#[tokio::test]
async fn stale_version_is_rejected_and_changes_nothing() {
    let (db, tenant, _) = setup().await;
    let repo = SurrealAssetRepository::new(db);
    let created = repo.create(tenant, asset("A-1")).await.unwrap();

    repo.update(
        tenant,
        created.id,
        0,
        UpdateAsset {
            status: Some(AssetStatus::InUse),
            ..Default::default()
        },
    )
    .await
    .unwrap();

    let err = repo
        .update(
            tenant,
            created.id,
            0,
            UpdateAsset {
                status: Some(AssetStatus::Retired),
                ..Default::default()
            },
        )
        .await
        .unwrap_err();

    match err {
        UpkeepError::Conflict(ConflictReason::StaleVersion {
            expected, actual, ..
        }) => {
            assert_eq!(expected, 0);
            assert_eq!(actual, 1);
        }
        other => panic!("expected stale version conflict, got {other:?}"),
    }

    let stored = repo.get_by_id(tenant, created.id).await.unwrap();
    assert_eq!(stored.version, 1);
    assert_eq!(stored.status, AssetStatus::InUse);
}

#[tokio::test]
async fn update_of_missing_row_is_not_found() {
    let (db, tenant, _) = setup().await;
    let repo = SurrealAssetRepository::new(db);

    let err = repo
        .update(tenant, Uuid::new_v4(), 0, UpdateAsset::default())
        .await
        .unwrap_err();
    assert!(matches!(err, UpkeepError::NotFound { .. }));
}

#[tokio::test]
async fn racing_updates_on_one_version_have_a_single_winner() {
    let (db, tenant, _) = setup().await;
    let repo = SurrealDepartmentRepository::new(db);
    let dept = repo
        .create(
            tenant,
            CreateDepartment {
                name: "Facilities".into(),
                description: String::new(),
                manager_id: None,
            },
        )
        .await
        .unwrap();

    let attempts = (0..8).map(|i| {
        repo.update(
            tenant,
            dept.id,
            0,
            UpdateDepartment {
                description: Some(format!("writer {i}")),
                ..Default::default()
            },
        )
    });
    let results = futures::future::join_all(attempts).await;

    let winners = results.iter().filter(|r| r.is_ok()).count();
    assert_eq!(winners, 1, "exactly one writer may win");
    for result in results.iter().filter(|r| r.is_err()) {
        assert!(result.as_ref().unwrap_err().is_conflict());
    }

    let stored = repo.get_by_id(tenant, dept.id).await.unwrap();
    assert_eq!(stored.version, 1);
}

// -----------------------------------------------------------------------
// Tenant isolation and uniqueness
// -----------------------------------------------------------------------

#[tokio::test]
async fn rows_are_invisible_across_tenants() {
    let (db, tenant_a, tenant_b) = setup().await;
    let repo = SurrealAssetRepository::new(db);
    let created = repo.create(tenant_a, asset("A-1")).await.unwrap();

    let err = repo.get_by_id(tenant_b, created.id).await.unwrap_err();
    assert!(matches!(err, UpkeepError::NotFound { .. }));

    let err = repo
        .update(tenant_b, created.id, 0, UpdateAsset::default())
        .await
        .unwrap_err();
    assert!(matches!(err, UpkeepError::NotFound { .. }));

    let err = repo.delete(tenant_b, created.id).await.unwrap_err();
    assert!(matches!(err, UpkeepError::NotFound { .. }));

    let page = repo.list(tenant_b, Pagination::default()).await.unwrap();
    assert_eq!(page.total, 0);
    assert!(page.items.is_empty());

    let stored = repo.get_by_id(tenant_a, created.id).await.unwrap();
    assert_eq!(stored.version, 0);
}

#[tokio::test]
async fn unique_keys_are_scoped_per_tenant() {
    let (db, tenant_a, tenant_b) = setup().await;
    let repo = SurrealAssetRepository::new(db);

    repo.create(tenant_a, asset("A-1")).await.unwrap();
    repo.create(tenant_b, asset("A-1")).await.unwrap();

    let err = repo.create(tenant_a, asset("A-1")).await.unwrap_err();
    assert!(matches!(
        err,
        UpkeepError::Conflict(ConflictReason::Duplicate { .. })
    ));
}

#[tokio::test]
async fn list_is_paginated() {
    let (db, tenant, _) = setup().await;
    let repo = SurrealSupplierRepository::new(db);
    for code in ["S1", "S2", "S3"] {
        repo.create(tenant, supplier(code)).await.unwrap();
    }

    let page = repo
        .list(
            tenant,
            Pagination {
                offset: 1,
                limit: 1,
            },
        )
        .await
        .unwrap();
    assert_eq!(page.total, 3);
    assert_eq!(page.items.len(), 1);
}

// -----------------------------------------------------------------------
// Users
// -----------------------------------------------------------------------

fn user(name: &str) -> CreateUser {
    CreateUser {
        username: name.into(),
        email: format!("{name}@example.com"),
        password: "SuperSecret123!".into(),
        role: Role::Inspector,
        department_id: None,
        metadata: None,
    }
}

#[tokio::test]
async fn user_password_is_hashed_and_lookups_work() {
    let (db, tenant, _) = setup().await;
    let repo = SurrealUserRepository::new(db);

    let created = repo.create(tenant, user("alice")).await.unwrap();
    assert_eq!(created.status, UserStatus::Active);
    assert_eq!(created.role, Role::Inspector);
    assert!(created.password_hash.starts_with("$argon2id$"));

    let by_name = repo.get_by_username(tenant, "alice").await.unwrap();
    assert_eq!(by_name.id, created.id);
    let by_email = repo
        .get_by_email(tenant, "alice@example.com")
        .await
        .unwrap();
    assert_eq!(by_email.id, created.id);
}

#[tokio::test]
async fn user_delete_is_soft_and_bumps_version() {
    let (db, tenant, _) = setup().await;
    let repo = SurrealUserRepository::new(db);
    let created = repo.create(tenant, user("bob")).await.unwrap();

    repo.delete(tenant, created.id).await.unwrap();

    let stored = repo.get_by_id(tenant, created.id).await.unwrap();
    assert_eq!(stored.status, UserStatus::Inactive);
    assert_eq!(stored.version, 1);
}

#[tokio::test]
async fn user_role_change_requires_current_version() {
    let (db, tenant, _) = setup().await;
    let repo = SurrealUserRepository::new(db);
    let created = repo.create(tenant, user("carol")).await.unwrap();

    let promoted = repo
        .update(
            tenant,
            created.id,
            0,
            UpdateUser {
                role: Some(Role::Supervisor),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(promoted.role, Role::Supervisor);

    let err = repo
        .update(
            tenant,
            created.id,
            0,
            UpdateUser {
                role: Some(Role::Admin),
                ..Default::default()
            },
        )
        .await
        .unwrap_err();
    assert!(err.is_conflict());
}
