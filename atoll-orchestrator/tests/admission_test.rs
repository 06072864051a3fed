//! Admission tests: status preconditions, conflict detection, and the
//! versioned compare-and-set that serializes concurrent intents.

mod common;

use std::time::Duration;

use atoll_driver::scripted::Behavior;
use atoll_driver::{BackupParams, CreateParams, RestoreParams, UpgradeParams};
use atoll_orchestrator::{
    ClusterStatus, CreateWorkspaceRequest, OrchestratorError, TaskStatus, TaskType,
};

use common::{fixture_workspace, fixture_workspace_in, harness, TEST_ORG};

#[tokio::test]
async fn test_provision_from_fresh_workspace() {
    let h = harness().await;
    h.driver
        .set_behavior(Behavior::Hang(Duration::from_secs(30)));

    let workspace = fixture_workspace(&h, "dev-env").await;
    assert_eq!(workspace.cluster_status, ClusterStatus::PendingCreation);

    let task = h
        .orchestrator
        .provision(TEST_ORG, &workspace.id, CreateParams::default())
        .await
        .expect("Failed to admit provision");

    assert_eq!(task.task_type, TaskType::Create);
    assert_eq!(task.workspace_id, workspace.id);
    // Returned immediately, before the driver has done anything
    assert_eq!(task.status, TaskStatus::Pending);

    // The admission itself moved the workspace to the intermediate status
    // and consumed the observed version.
    let updated = h
        .orchestrator
        .get_workspace(TEST_ORG, &workspace.id)
        .await
        .expect("Failed to get workspace");
    assert_eq!(updated.cluster_status, ClusterStatus::Configuring);
    assert_eq!(updated.version, workspace.version + 1);
}

#[tokio::test]
async fn test_provision_records_requested_parameters() {
    let h = harness().await;
    let workspace = fixture_workspace(&h, "pinned").await;

    let params = CreateParams {
        version: Some("0.20.1".to_string()),
        features: Some(vec!["ingress".to_string(), "metrics".to_string()]),
        ..Default::default()
    };

    let task = h
        .orchestrator
        .provision(TEST_ORG, &workspace.id, params)
        .await
        .expect("Failed to admit provision");

    assert_eq!(task.payload["version"], "0.20.1");
    assert_eq!(task.payload["features"][0], "ingress");
}

#[tokio::test]
async fn test_provision_conflicts_while_running() {
    let h = harness().await;
    let workspace = fixture_workspace_in(&h, "live", ClusterStatus::Running).await;

    let err = h
        .orchestrator
        .provision(TEST_ORG, &workspace.id, CreateParams::default())
        .await
        .expect_err("Provision against a running cluster should conflict");

    assert!(matches!(err, OrchestratorError::Conflict(_)));

    // A rejected admission leaves no trace in the task log.
    let task_count: i64 =
        sqlx::query_scalar("SELECT COUNT(*) FROM lifecycle_tasks WHERE workspace_id = ?")
            .bind(&workspace.id)
            .fetch_one(&h.pool)
            .await
            .expect("Failed to count tasks");
    assert_eq!(task_count, 0);
}

#[tokio::test]
async fn test_provision_conflicts_while_provisioning() {
    let h = harness().await;
    let workspace = fixture_workspace_in(&h, "mid-create", ClusterStatus::Configuring).await;

    let err = h
        .orchestrator
        .provision(TEST_ORG, &workspace.id, CreateParams::default())
        .await
        .expect_err("Provision should conflict while a create is in flight");

    assert!(matches!(err, OrchestratorError::Conflict(_)));
}

#[tokio::test]
async fn test_destroy_moves_to_deleting() {
    let h = harness().await;
    h.driver
        .set_behavior(Behavior::Hang(Duration::from_secs(30)));

    let workspace = fixture_workspace_in(&h, "doomed", ClusterStatus::Running).await;

    let task = h
        .orchestrator
        .destroy(TEST_ORG, &workspace.id)
        .await
        .expect("Failed to admit destroy");

    assert_eq!(task.task_type, TaskType::Delete);

    let updated = h
        .orchestrator
        .get_workspace(TEST_ORG, &workspace.id)
        .await
        .expect("Failed to get workspace");
    assert_eq!(updated.cluster_status, ClusterStatus::Deleting);
}

#[tokio::test]
async fn test_destroy_conflicts_while_deleting() {
    let h = harness().await;
    let workspace = fixture_workspace_in(&h, "going", ClusterStatus::Deleting).await;

    let err = h
        .orchestrator
        .destroy(TEST_ORG, &workspace.id)
        .await
        .expect_err("Destroy should conflict while a delete is in flight");

    assert!(matches!(err, OrchestratorError::Conflict(_)));
}

#[tokio::test]
async fn test_start_requires_stopped_cluster() {
    let h = harness().await;
    let workspace = fixture_workspace_in(&h, "already-up", ClusterStatus::Running).await;

    let err = h
        .orchestrator
        .start(TEST_ORG, &workspace.id)
        .await
        .expect_err("Start should be rejected unless the cluster is stopped");

    match err {
        OrchestratorError::Conflict(msg) => {
            assert_eq!(msg, "Cluster must be in STOPPED state");
        }
        other => panic!("Expected Conflict, got {other:?}"),
    }
}

#[tokio::test]
async fn test_start_moves_to_starting() {
    let h = harness().await;
    h.driver
        .set_behavior(Behavior::Hang(Duration::from_secs(30)));

    let workspace = fixture_workspace_in(&h, "parked", ClusterStatus::Stopped).await;

    let task = h
        .orchestrator
        .start(TEST_ORG, &workspace.id)
        .await
        .expect("Failed to admit start");

    assert_eq!(task.task_type, TaskType::Start);

    let updated = h
        .orchestrator
        .get_workspace(TEST_ORG, &workspace.id)
        .await
        .expect("Failed to get workspace");
    assert_eq!(updated.cluster_status, ClusterStatus::Starting);
}

#[tokio::test]
async fn test_stop_requires_running_cluster() {
    let h = harness().await;
    let workspace = fixture_workspace_in(&h, "already-down", ClusterStatus::Stopped).await;

    let err = h
        .orchestrator
        .stop(TEST_ORG, &workspace.id)
        .await
        .expect_err("Stop should be rejected unless the cluster is running");

    assert!(matches!(err, OrchestratorError::Conflict(_)));
}

#[tokio::test]
async fn test_upgrade_requires_running_cluster() {
    let h = harness().await;
    let workspace = fixture_workspace_in(&h, "cold", ClusterStatus::Stopped).await;

    let params = UpgradeParams {
        target_version: "0.21.0".to_string(),
        strategy: None,
    };

    let err = h
        .orchestrator
        .upgrade(TEST_ORG, &workspace.id, params)
        .await
        .expect_err("Upgrade should be rejected unless the cluster is running");

    assert!(matches!(err, OrchestratorError::Conflict(_)));
}

#[tokio::test]
async fn test_upgrade_leaves_status_untouched() {
    let h = harness().await;
    h.driver
        .set_behavior(Behavior::Hang(Duration::from_secs(30)));

    let workspace = fixture_workspace_in(&h, "rolling", ClusterStatus::Running).await;

    let params = UpgradeParams {
        target_version: "0.21.0".to_string(),
        strategy: None,
    };

    h.orchestrator
        .upgrade(TEST_ORG, &workspace.id, params)
        .await
        .expect("Failed to admit upgrade");

    // No intermediate status for upgrades, but the admission still
    // consumes the version so concurrent intents lose.
    let updated = h
        .orchestrator
        .get_workspace(TEST_ORG, &workspace.id)
        .await
        .expect("Failed to get workspace");
    assert_eq!(updated.cluster_status, ClusterStatus::Running);
    assert_eq!(updated.version, workspace.version + 1);
}

#[tokio::test]
async fn test_upgrade_rejects_empty_target_version() {
    let h = harness().await;
    let workspace = fixture_workspace_in(&h, "no-target", ClusterStatus::Running).await;

    let params = UpgradeParams {
        target_version: "  ".to_string(),
        strategy: None,
    };

    let err = h
        .orchestrator
        .upgrade(TEST_ORG, &workspace.id, params)
        .await
        .expect_err("Upgrade without a target version should be rejected");

    assert!(matches!(err, OrchestratorError::InvalidInput(_)));
}

#[tokio::test]
async fn test_backup_requires_running_cluster() {
    let h = harness().await;
    let workspace = fixture_workspace_in(&h, "unsteady", ClusterStatus::Error).await;

    let params = BackupParams {
        backup_name: "nightly".to_string(),
        retention: None,
    };

    let err = h
        .orchestrator
        .backup(TEST_ORG, &workspace.id, params)
        .await
        .expect_err("Backup should be rejected unless the cluster is running");

    assert!(matches!(err, OrchestratorError::Conflict(_)));
}

#[tokio::test]
async fn test_backup_rejects_empty_name() {
    let h = harness().await;
    let workspace = fixture_workspace_in(&h, "unnamed", ClusterStatus::Running).await;

    let params = BackupParams {
        backup_name: String::new(),
        retention: None,
    };

    let err = h
        .orchestrator
        .backup(TEST_ORG, &workspace.id, params)
        .await
        .expect_err("Backup without a name should be rejected");

    assert!(matches!(err, OrchestratorError::InvalidInput(_)));
}

#[tokio::test]
async fn test_restore_allowed_from_error_status() {
    let h = harness().await;
    h.driver
        .set_behavior(Behavior::Hang(Duration::from_secs(30)));

    // Restore carries no status precondition: it is the way out of a
    // broken cluster.
    let workspace = fixture_workspace_in(&h, "broken", ClusterStatus::Error).await;

    let params = RestoreParams {
        backup_name: "nightly".to_string(),
        strategy: None,
    };

    let task = h
        .orchestrator
        .restore(TEST_ORG, &workspace.id, params)
        .await
        .expect("Restore should be admitted regardless of cluster status");

    assert_eq!(task.task_type, TaskType::Restore);
}

#[tokio::test]
async fn test_restore_rejects_empty_backup_name() {
    let h = harness().await;
    let workspace = fixture_workspace_in(&h, "nameless", ClusterStatus::Running).await;

    let params = RestoreParams {
        backup_name: String::new(),
        strategy: None,
    };

    let err = h
        .orchestrator
        .restore(TEST_ORG, &workspace.id, params)
        .await
        .expect_err("Restore without a backup name should be rejected");

    assert!(matches!(err, OrchestratorError::InvalidInput(_)));
}

#[tokio::test]
async fn test_stale_version_admission_rejected() {
    let h = harness().await;
    let workspace = fixture_workspace(&h, "contended").await;

    // Another intent consumes the version this one observed.
    h.store
        .cas_cluster_status(&workspace.id, workspace.version, None)
        .await
        .expect("First admission write should succeed");

    let err = h
        .store
        .cas_cluster_status(
            &workspace.id,
            workspace.version,
            Some(ClusterStatus::Configuring),
        )
        .await
        .expect_err("Admission keyed on a stale version should fail");

    assert!(matches!(err, OrchestratorError::Conflict(_)));

    // The losing write must not have touched the status.
    let unchanged = h
        .orchestrator
        .get_workspace(TEST_ORG, &workspace.id)
        .await
        .expect("Failed to get workspace");
    assert_eq!(unchanged.cluster_status, ClusterStatus::PendingCreation);
}

#[tokio::test]
async fn test_concurrent_provisions_admit_exactly_one() {
    let h = harness().await;
    h.driver
        .set_behavior(Behavior::Hang(Duration::from_secs(30)));

    let workspace = fixture_workspace(&h, "racy").await;

    let (a, b) = tokio::join!(
        h.orchestrator
            .provision(TEST_ORG, &workspace.id, CreateParams::default()),
        h.orchestrator
            .provision(TEST_ORG, &workspace.id, CreateParams::default()),
    );

    let ok_count = [a.is_ok(), b.is_ok()].iter().filter(|ok| **ok).count();
    assert_eq!(ok_count, 1, "Exactly one concurrent provision should win");

    let loser = a.err().or_else(|| b.err()).expect("One admission should lose");
    assert!(matches!(loser, OrchestratorError::Conflict(_)));

    // Only the winner recorded a task.
    let task_count: i64 =
        sqlx::query_scalar("SELECT COUNT(*) FROM lifecycle_tasks WHERE workspace_id = ?")
            .bind(&workspace.id)
            .fetch_one(&h.pool)
            .await
            .expect("Failed to count tasks");
    assert_eq!(task_count, 1);
}

#[tokio::test]
async fn test_create_workspace_requires_name() {
    let h = harness().await;

    let err = h
        .orchestrator
        .create_workspace(
            TEST_ORG,
            CreateWorkspaceRequest {
                name: "   ".to_string(),
            },
        )
        .await
        .expect_err("Blank workspace names should be rejected");

    assert!(matches!(err, OrchestratorError::InvalidInput(_)));
}

#[tokio::test]
async fn test_unknown_workspace_not_found() {
    let h = harness().await;

    let err = h
        .orchestrator
        .provision(TEST_ORG, "ws-missing", CreateParams::default())
        .await
        .expect_err("Unknown workspace should not admit anything");

    assert!(matches!(err, OrchestratorError::NotFound(_)));
}

#[tokio::test]
async fn test_workspace_scoped_to_org() {
    let h = harness().await;
    let workspace = fixture_workspace(&h, "scoped").await;

    let err = h
        .orchestrator
        .provision("org-other", &workspace.id, CreateParams::default())
        .await
        .expect_err("Workspace should be invisible outside its organization");

    assert!(matches!(err, OrchestratorError::NotFound(_)));
}
