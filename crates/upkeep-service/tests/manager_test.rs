//! Compare-and-swap updates, tenant isolation, role checks and document
//! guarding through the resource manager.

mod common;

use common::{Harness, asset, user};
use futures::future::join_all;
use serde_json::json;
use upkeep_core::context::Role;
use upkeep_core::error::{ConflictReason, UpkeepError};
use upkeep_core::models::asset::{AssetStatus, UpdateAsset};
use upkeep_core::models::checklist::{CreateChecklist, UpdateChecklist};
use upkeep_core::models::inspection::{CreateInspection, InspectionStatus, UpdateInspection};
use upkeep_core::models::schedule::CreateSchedule;
use upkeep_core::models::supplier::CreateSupplier;
use upkeep_core::repository::Pagination;
use uuid::Uuid;

fn rename(name: &str) -> UpdateAsset {
    UpdateAsset {
        name: Some(name.into()),
        ..Default::default()
    }
}

// -----------------------------------------------------------------------
// Versioning
// -----------------------------------------------------------------------

#[tokio::test]
async fn resubmitting_an_applied_update_conflicts() {
    let h = Harness::new().await;
    let assets = h.assets();
    let admin = h.admin();

    let created = assets.create(&admin, asset("PUMP-1", None)).await.unwrap();
    assert_eq!(created.version, 0);

    let updated = assets
        .update(&admin, created.id, 0, rename("Feed pump"))
        .await
        .unwrap();
    assert_eq!(updated.version, 1);
    assert_eq!(updated.name, "Feed pump");

    let err = assets
        .update(&admin, created.id, 0, rename("Feed pump"))
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        UpkeepError::Conflict(ConflictReason::StaleVersion {
            expected: 0,
            actual: 1,
            ..
        })
    ));
}

#[tokio::test]
async fn stale_update_leaves_the_record_untouched() {
    let h = Harness::new().await;
    let assets = h.assets();
    let admin = h.admin();

    let created = assets.create(&admin, asset("PUMP-1", None)).await.unwrap();

    for stale in [1, 7, u64::MAX] {
        let err = assets
            .update(
                &admin,
                created.id,
                stale,
                UpdateAsset {
                    name: Some("Changed".into()),
                    status: Some(AssetStatus::Retired),
                    ..Default::default()
                },
            )
            .await
            .unwrap_err();
        assert!(err.is_conflict());
    }

    let stored = assets.get(&admin, created.id).await.unwrap();
    assert_eq!(stored.version, 0);
    assert_eq!(stored.name, "Asset PUMP-1");
    assert_eq!(stored.status, AssetStatus::Available);
}

#[tokio::test]
async fn racing_updates_on_one_version_have_a_single_winner() {
    let h = Harness::new().await;
    let assets = h.assets();
    let admin = h.admin();

    let created = assets.create(&admin, asset("PUMP-1", None)).await.unwrap();

    let results = join_all((0..5).map(|i| {
        assets.update(&admin, created.id, 0, rename(&format!("Writer {i}")))
    }))
    .await;

    let winners: Vec<_> = results.iter().filter_map(|r| r.as_ref().ok()).collect();
    assert_eq!(winners.len(), 1);
    assert_eq!(winners[0].version, 1);
    for result in &results {
        if let Err(e) = result {
            assert!(e.is_conflict(), "expected conflict, got {e:?}");
        }
    }

    let stored = assets.get(&admin, created.id).await.unwrap();
    assert_eq!(stored.version, 1);
    assert_eq!(stored.name, winners[0].name);
}

#[tokio::test]
async fn update_of_a_missing_record_is_not_found() {
    let h = Harness::new().await;
    let err = h
        .assets()
        .update(&h.admin(), Uuid::new_v4(), 0, rename("x"))
        .await
        .unwrap_err();
    assert!(matches!(err, UpkeepError::NotFound { .. }));
}

// -----------------------------------------------------------------------
// Access guard
// -----------------------------------------------------------------------

#[tokio::test]
async fn another_tenant_is_denied_whatever_the_role() {
    let h = Harness::new().await;
    let assets = h.assets();
    let created = assets
        .create(&h.admin(), asset("PUMP-1", None))
        .await
        .unwrap();

    for role in Role::ALL {
        let outsider = h.outsider(*role);

        let err = assets.get(&outsider, created.id).await.unwrap_err();
        assert!(matches!(err, UpkeepError::AccessDenied));

        let err = assets
            .update(&outsider, created.id, 0, rename("Stolen"))
            .await
            .unwrap_err();
        assert!(matches!(err, UpkeepError::AccessDenied));

        let err = assets.delete(&outsider, created.id).await.unwrap_err();
        assert!(matches!(err, UpkeepError::AccessDenied));

        let page = assets.list(&outsider, Pagination::default()).await.unwrap();
        assert_eq!(page.total, 0);
    }

    let stored = assets.get(&h.admin(), created.id).await.unwrap();
    assert_eq!(stored.version, 0);
    assert_eq!(stored.name, "Asset PUMP-1");
}

#[tokio::test]
async fn roles_gate_each_operation() {
    let h = Harness::new().await;
    let assets = h.assets();
    let supervisor = h.principal(Role::Supervisor);
    let inspector = h.principal(Role::Inspector);

    let err = assets
        .create(&inspector, asset("PUMP-1", None))
        .await
        .unwrap_err();
    assert!(matches!(err, UpkeepError::AccessDenied));

    let created = assets
        .create(&supervisor, asset("PUMP-1", None))
        .await
        .unwrap();
    assets.get(&inspector, created.id).await.unwrap();

    let err = assets.delete(&supervisor, created.id).await.unwrap_err();
    assert!(matches!(err, UpkeepError::AccessDenied));
    assets.delete(&h.admin(), created.id).await.unwrap();

    let err = assets.get(&inspector, created.id).await.unwrap_err();
    assert!(matches!(err, UpkeepError::NotFound { .. }));
}

#[tokio::test]
async fn references_must_resolve_inside_the_tenant() {
    let h = Harness::new().await;
    let admin = h.admin();

    // A supplier that exists, but in another tenant.
    let foreign = h
        .suppliers()
        .create(
            &h.outsider(Role::Admin),
            CreateSupplier {
                name: "Acme".into(),
                code: "ACME".into(),
                contact_email: None,
                metadata: None,
            },
        )
        .await
        .unwrap();

    let mut input = asset("PUMP-1", None);
    input.supplier_id = Some(foreign.id);
    let err = h.assets().create(&admin, input).await.unwrap_err();
    assert!(matches!(err, UpkeepError::NotFound { .. }));

    let err = h
        .schedules()
        .create(
            &admin,
            CreateSchedule {
                name: "Weekly".into(),
                asset_id: Some(Uuid::new_v4()),
                checklist_id: None,
                interval_days: 7,
                next_due_at: chrono::Utc::now(),
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(err, UpkeepError::NotFound { .. }));

    let page = h.assets().list(&admin, Pagination::default()).await.unwrap();
    assert_eq!(page.total, 0);
}

#[tokio::test]
async fn zero_day_schedule_is_invalid() {
    let h = Harness::new().await;
    let err = h
        .schedules()
        .create(
            &h.admin(),
            CreateSchedule {
                name: "Never".into(),
                asset_id: None,
                checklist_id: None,
                interval_days: 0,
                next_due_at: chrono::Utc::now(),
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(err, UpkeepError::Validation { .. }));
}

// -----------------------------------------------------------------------
// Documents
// -----------------------------------------------------------------------

fn checklist(template: Option<serde_json::Value>) -> CreateChecklist {
    CreateChecklist {
        name: "Pump walkdown".into(),
        description: "Monthly walkdown".into(),
        template,
    }
}

#[tokio::test]
async fn template_is_stored_as_given_and_null_is_accepted() {
    let h = Harness::new().await;
    let checklists = h.checklists();
    let admin = h.admin();

    let template = json!({
        "sections": [
            {"title": "Seals", "items": ["leaks", "noise"]},
            {"title": "Motor", "items": ["temperature"]}
        ],
        "version": 2
    });
    let created = checklists
        .create(&admin, checklist(Some(template.clone())))
        .await
        .unwrap();
    assert_eq!(created.template, Some(template));

    let empty = checklists
        .create(&admin, checklist(Some(serde_json::Value::Null)))
        .await
        .unwrap();
    assert_eq!(empty.template, None);
}

#[tokio::test]
async fn malformed_template_is_rejected_before_anything_is_written() {
    let h = Harness::new().await;
    let checklists = h.checklists();
    let admin = h.admin();

    let mut deep = json!({});
    for _ in 0..100 {
        deep = json!({ "nested": deep });
    }
    let err = checklists
        .create(&admin, checklist(Some(deep)))
        .await
        .unwrap_err();
    assert!(matches!(err, UpkeepError::Validation { .. }));

    let err = checklists
        .create(&admin, checklist(Some(json!(["not", "an", "object"]))))
        .await
        .unwrap_err();
    assert!(matches!(err, UpkeepError::Validation { .. }));

    let page = checklists.list(&admin, Pagination::default()).await.unwrap();
    assert_eq!(page.total, 0);

    let created = checklists.create(&admin, checklist(None)).await.unwrap();
    let err = checklists
        .update(
            &admin,
            created.id,
            0,
            UpdateChecklist {
                template: Some(Some(json!(42))),
                ..Default::default()
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(err, UpkeepError::Validation { .. }));
    assert_eq!(checklists.get(&admin, created.id).await.unwrap().version, 0);
}

#[tokio::test]
async fn completed_report_is_frozen() {
    let h = Harness::new().await;
    let admin = h.admin();

    let inspector_user = h
        .users()
        .create(&admin, user("ines", Role::Inspector, None))
        .await
        .unwrap();
    let inspector = upkeep_core::Principal::new(inspector_user.id, h.tenant, Role::Inspector);
    let list = h.checklists().create(&admin, checklist(None)).await.unwrap();

    let inspections = h.inspections();
    let created = inspections
        .create(
            &inspector,
            CreateInspection {
                checklist_id: list.id,
                asset_id: None,
                inspector_id: inspector_user.id,
                status: InspectionStatus::Pending,
                report: Some(json!({"seals": "ok"})),
                completed_at: None,
            },
        )
        .await
        .unwrap();
    assert!(created.completed_at.is_none());

    // Pending reports may still change.
    let draft = inspections
        .update(
            &inspector,
            created.id,
            0,
            UpdateInspection {
                report: Some(json!({"seals": "ok", "motor": "hot"})),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(draft.version, 1);

    let done = inspections
        .update(
            &inspector,
            created.id,
            1,
            UpdateInspection {
                status: Some(InspectionStatus::Completed),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(done.status, InspectionStatus::Completed);
    assert!(done.completed_at.is_some());

    let err = inspections
        .update(
            &admin,
            created.id,
            2,
            UpdateInspection {
                report: Some(json!({"seals": "leaking"})),
                ..Default::default()
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        UpkeepError::Conflict(ConflictReason::Finalized { .. })
    ));

    let err = inspections
        .update(
            &admin,
            created.id,
            2,
            UpdateInspection {
                status: Some(InspectionStatus::Pending),
                ..Default::default()
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        UpkeepError::Conflict(ConflictReason::Finalized { .. })
    ));

    let stored = inspections.get(&inspector, created.id).await.unwrap();
    assert_eq!(stored.version, 2);
    assert_eq!(stored.report, Some(json!({"seals": "ok", "motor": "hot"})));
}

#[tokio::test]
async fn inspection_created_completed_is_stamped() {
    let h = Harness::new().await;
    let admin = h.admin();
    let inspector_user = h
        .users()
        .create(&admin, user("ines", Role::Inspector, None))
        .await
        .unwrap();
    let list = h.checklists().create(&admin, checklist(None)).await.unwrap();

    let created = h
        .inspections()
        .create(
            &admin,
            CreateInspection {
                checklist_id: list.id,
                asset_id: None,
                inspector_id: inspector_user.id,
                status: InspectionStatus::Completed,
                report: Some(json!({"result": "pass"})),
                completed_at: None,
            },
        )
        .await
        .unwrap();
    assert!(created.completed_at.is_some());
}
