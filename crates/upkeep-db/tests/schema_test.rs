//! Integration tests for schema initialization using in-memory SurrealDB.

use surrealdb::Surreal;
use surrealdb::engine::local::Mem;

#[tokio::test]
async fn schema_migration_applies_successfully() {
    let db = Surreal::new::<Mem>(()).await.unwrap();
    db.use_ns("test").use_db("test").await.unwrap();

    upkeep_db::run_migrations(&db).await.unwrap();

    let mut result = db.query("INFO FOR DB").await.unwrap();
    let info: Option<surrealdb_types::Value> = result.take(0).unwrap();
    let info = info.expect("INFO FOR DB should return a value");
    let info_str = format!("{:?}", info);

    for table in [
        "organization",
        "user",
        "department",
        "location",
        "supplier",
        "asset",
        "checklist",
        "schedule",
        "inspection",
        "_migration",
    ] {
        assert!(info_str.contains(table), "missing {table} table");
    }
}

#[tokio::test]
async fn migration_is_idempotent() {
    let db = Surreal::new::<Mem>(()).await.unwrap();
    db.use_ns("test").use_db("test").await.unwrap();

    upkeep_db::run_migrations(&db).await.unwrap();
    upkeep_db::run_migrations(&db).await.unwrap();

    let mut result = db.query("SELECT * FROM _migration").await.unwrap();
    let records: Vec<surrealdb_types::Value> = result.take(0).unwrap();
    assert_eq!(records.len(), 1, "expected exactly one migration record");
}

#[tokio::test]
async fn tenant_id_cannot_be_rewritten() {
    let db = Surreal::new::<Mem>(()).await.unwrap();
    db.use_ns("test").use_db("test").await.unwrap();
    upkeep_db::run_migrations(&db).await.unwrap();

    db.query(
        "CREATE supplier:s1 SET tenant_id = 't1', name = 'Bolt Co', \
         code = 'BOLT', metadata = {}, version = 0",
    )
    .await
    .unwrap()
    .check()
    .unwrap();

    let result = db
        .query("UPDATE supplier:s1 SET tenant_id = 't2'")
        .await
        .unwrap()
        .check();
    assert!(result.is_err(), "tenant_id must be READONLY");
}

#[tokio::test]
async fn negative_version_is_rejected() {
    let db = Surreal::new::<Mem>(()).await.unwrap();
    db.use_ns("test").use_db("test").await.unwrap();
    upkeep_db::run_migrations(&db).await.unwrap();

    let result = db
        .query(
            "CREATE supplier SET tenant_id = 't1', name = 'Bolt Co', \
             code = 'BOLT', metadata = {}, version = -1",
        )
        .await
        .unwrap()
        .check();
    assert!(result.is_err(), "version must be non-negative");
}

#[tokio::test]
async fn unique_index_prevents_duplicate_slugs() {
    let db = Surreal::new::<Mem>(()).await.unwrap();
    db.use_ns("test").use_db("test").await.unwrap();

    upkeep_db::run_migrations(&db).await.unwrap();

    db.query(
        "CREATE organization SET \
         name = 'ACME Facilities', \
         slug = 'acme', \
         metadata = {}",
    )
    .await
    .unwrap()
    .check()
    .unwrap();

    let result = db
        .query(
            "CREATE organization SET \
             name = 'Another Corp', \
             slug = 'acme', \
             metadata = {}",
        )
        .await
        .unwrap()
        .check();

    assert!(result.is_err(), "duplicate slug should be rejected");
}
