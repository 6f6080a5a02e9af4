/// Integration tests for database migrations
///
/// Migrations run against throwaway SQLite files in a temporary directory.

use brightline_shared::db::migrations::{ensure_database_exists, get_migration_status, run_migrations};
use brightline_shared::db::pool::{close_pool, create_pool, DatabaseConfig};
use tempfile::TempDir;

fn database_url(dir: &TempDir) -> String {
    format!("sqlite://{}", dir.path().join("brightline.db").display())
}

async fn fresh_pool(dir: &TempDir) -> sqlx::SqlitePool {
    let db_url = database_url(dir);
    ensure_database_exists(&db_url).await.expect("Failed to create database");

    create_pool(DatabaseConfig {
        url: db_url,
        max_connections: 2,
        ..Default::default()
    })
    .await
    .expect("Failed to create pool")
}

#[tokio::test]
async fn test_ensure_database_exists_creates_file() {
    let dir = TempDir::new().unwrap();
    let db_url = database_url(&dir);

    let result = ensure_database_exists(&db_url).await;
    assert!(result.is_ok(), "Failed to ensure database exists: {:?}", result.err());
    assert!(dir.path().join("brightline.db").exists());

    // Second call sees the existing file
    assert!(ensure_database_exists(&db_url).await.is_ok());
}

#[tokio::test]
async fn test_migrations_are_idempotent() {
    let dir = TempDir::new().unwrap();
    let pool = fresh_pool(&dir).await;

    run_migrations(&pool).await.expect("First migration run failed");
    let status_1 = get_migration_status(&pool).await.expect("Failed to get status");

    run_migrations(&pool).await.expect("Second migration run failed");
    let status_2 = get_migration_status(&pool).await.expect("Failed to get status");

    assert_eq!(
        status_1.applied_migrations, status_2.applied_migrations,
        "Migrations should be idempotent"
    );

    close_pool(pool).await;
}

#[tokio::test]
async fn test_get_migration_status_before_and_after() {
    let dir = TempDir::new().unwrap();
    let pool = fresh_pool(&dir).await;

    let before = get_migration_status(&pool).await.expect("Failed to get migration status");
    assert_eq!(before.applied_migrations, 0, "Should have 0 migrations before running");
    assert!(before.latest_version.is_none(), "Latest version should be None");
    assert!(!before.is_up_to_date);

    run_migrations(&pool).await.expect("Migrations failed");

    let after = get_migration_status(&pool).await.expect("Failed to get migration status");
    assert!(after.applied_migrations > 0, "Should have migrations applied");
    assert!(after.latest_version.is_some(), "Latest version should be set");
    assert!(after.is_up_to_date, "Should be up to date after migrations");

    close_pool(pool).await;
}

#[tokio::test]
async fn test_migration_creates_all_tables() {
    let dir = TempDir::new().unwrap();
    let pool = fresh_pool(&dir).await;
    run_migrations(&pool).await.expect("Migrations failed");

    let expected_tables = [
        "users",
        "services",
        "service_features",
        "industries",
        "case_studies",
        "case_study_results",
        "case_study_services",
        "locations",
        "impact_stories",
        "impact_metrics",
        "form_submissions",
        "file_uploads",
        "file_analyses",
    ];

    for table_name in expected_tables {
        let exists: bool = sqlx::query_scalar(
            "SELECT EXISTS (
                SELECT 1 FROM sqlite_master
                WHERE type = 'table' AND name = $1
            )",
        )
        .bind(table_name)
        .fetch_one(&pool)
        .await
        .unwrap_or_else(|e| panic!("Failed to check for table {}: {}", table_name, e));

        assert!(exists, "Table '{}' should exist after migrations", table_name);
    }

    close_pool(pool).await;
}

#[tokio::test]
async fn test_status_checks_are_enforced() {
    let dir = TempDir::new().unwrap();
    let pool = fresh_pool(&dir).await;
    run_migrations(&pool).await.expect("Migrations failed");

    let result = sqlx::query(
        "INSERT INTO form_submissions (id, form_type, payload, status, created_at, updated_at)
         VALUES ($1, 'contact', '{}', 'archived', '2024-01-01T00:00:00Z', '2024-01-01T00:00:00Z')",
    )
    .bind(uuid::Uuid::new_v4())
    .execute(&pool)
    .await;

    assert!(result.is_err(), "Unknown status should violate the CHECK constraint");

    close_pool(pool).await;
}
