//! Common test utilities and helpers for atoll-orchestrator tests
//!
//! This module provides shared functionality for all test files to reduce code duplication
//! and improve maintainability of the test suite.

#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use sqlx::SqlitePool;

use atoll_driver::scripted::ScriptedDriver;
use atoll_orchestrator::test_utils::{create_test_db, seed_org};
use atoll_orchestrator::{
    ClusterStatus, CreateWorkspaceRequest, LifecycleOrchestrator, LifecycleStore, Task, Workspace,
};

pub const TEST_ORG: &str = "org-acme";
pub const TEST_USER: &str = "user-alice";

/// Everything a test needs: the orchestrator under test, the scripted
/// driver behind it, and direct store/pool access for assertions.
pub struct Harness {
    pub pool: SqlitePool,
    pub store: LifecycleStore,
    pub driver: Arc<ScriptedDriver>,
    pub orchestrator: LifecycleOrchestrator,
}

/// Harness with a seeded org and default executor limits
pub async fn harness() -> Harness {
    harness_with(4, Duration::from_secs(5)).await
}

/// Harness with explicit executor limits
pub async fn harness_with(max_concurrent_tasks: usize, driver_timeout: Duration) -> Harness {
    let pool = create_test_db().await;
    seed_org(&pool, TEST_ORG, TEST_USER).await;

    let driver = Arc::new(ScriptedDriver::new());
    let orchestrator = LifecycleOrchestrator::new(
        pool.clone(),
        driver.clone(),
        max_concurrent_tasks,
        driver_timeout,
    );

    Harness {
        store: LifecycleStore::new(pool.clone()),
        pool,
        driver,
        orchestrator,
    }
}

/// Fixture: workspace in the default PENDING_CREATION status
pub async fn fixture_workspace(harness: &Harness, name: &str) -> Workspace {
    harness
        .orchestrator
        .create_workspace(
            TEST_ORG,
            CreateWorkspaceRequest {
                name: name.to_string(),
            },
        )
        .await
        .expect("Failed to create fixture workspace")
}

/// Fixture: workspace already in the given cluster status
pub async fn fixture_workspace_in(
    harness: &Harness,
    name: &str,
    status: ClusterStatus,
) -> Workspace {
    let workspace = fixture_workspace(harness, name).await;

    harness
        .store
        .set_cluster_status(&workspace.id, status)
        .await
        .expect("Failed to set cluster status");

    harness
        .store
        .get_workspace(TEST_ORG, &workspace.id)
        .await
        .expect("Failed to re-read fixture workspace")
}

/// Poll a task until it reaches COMPLETED or FAILED
pub async fn wait_for_terminal(store: &LifecycleStore, task_id: &str) -> Task {
    tokio::time::timeout(Duration::from_secs(5), async {
        loop {
            let task = store.get_task(task_id).await.expect("Failed to get task");
            if task.status.is_terminal() {
                return task;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .expect("Task did not reach a terminal status in time")
}

/// Shift a task's created_at into the past for ordering assertions
pub async fn backdate_task(pool: &SqlitePool, task_id: &str, seconds: i64) {
    let ts = chrono::Utc::now().timestamp() - seconds;

    sqlx::query("UPDATE lifecycle_tasks SET created_at = ? WHERE id = ?")
        .bind(ts)
        .bind(task_id)
        .execute(pool)
        .await
        .expect("Failed to backdate task");
}
