use sqlx::SqlitePool;

/// Helper to create an in-memory test database with migrations applied
pub async fn create_test_db() -> SqlitePool {
    let pool = SqlitePool::connect("sqlite::memory:")
        .await
        .expect("Failed to create in-memory database");

    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .expect("Failed to run migrations");

    pool
}

/// Insert an organization with a single member
pub async fn seed_org(pool: &SqlitePool, org_id: &str, user_id: &str) {
    let now = chrono::Utc::now().timestamp();

    sqlx::query("INSERT INTO organizations (id, name, created_at) VALUES (?, ?, ?)")
        .bind(org_id)
        .bind(format!("{org_id} organization"))
        .bind(now)
        .execute(pool)
        .await
        .expect("Failed to insert organization");

    sqlx::query(
        "INSERT INTO organization_members (org_id, user_id, role, created_at) VALUES (?, ?, 'member', ?)",
    )
    .bind(org_id)
    .bind(user_id)
    .bind(now)
    .execute(pool)
    .await
    .expect("Failed to insert organization member");
}
