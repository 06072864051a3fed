//! Admission gate and public API for workspace cluster lifecycle intents.
//!
//! Every lifecycle method follows the same shape: check the workspace's
//! current cluster status against the action's precondition, write the
//! intermediate status with a compare-and-set keyed on the version the
//! check observed, record a PENDING task, and hand it to the executor.
//! The task id is returned immediately; completion is observed by polling.

use std::sync::Arc;
use std::time::Duration;

use sqlx::SqlitePool;
use tracing::info;

use atoll_driver::{BackupParams, ClusterDriver, CreateParams, RestoreParams, UpgradeParams};

use crate::error::{OrchestratorError, Result};
use crate::executor::TaskExecutor;
use crate::store::LifecycleStore;
use crate::task::{Task, TaskFilters, TaskPage, TaskStatus, TaskType};
use crate::workspace::{ClusterStatus, CreateWorkspaceRequest, Workspace};

#[derive(Clone)]
pub struct LifecycleOrchestrator {
    store: LifecycleStore,
    executor: TaskExecutor,
}

impl LifecycleOrchestrator {
    pub fn new(
        pool: SqlitePool,
        driver: Arc<dyn ClusterDriver>,
        max_concurrent_tasks: usize,
        driver_timeout: Duration,
    ) -> Self {
        let store = LifecycleStore::new(pool);
        let executor = TaskExecutor::new(
            store.clone(),
            driver,
            max_concurrent_tasks,
            driver_timeout,
        );

        Self { store, executor }
    }

    /// Get a reference to the database pool
    pub fn pool(&self) -> &SqlitePool {
        self.store.pool()
    }

    /// Create a new workspace record. No cluster is provisioned until a
    /// provision intent is admitted explicitly.
    pub async fn create_workspace(
        &self,
        org_id: &str,
        req: CreateWorkspaceRequest,
    ) -> Result<Workspace> {
        if req.name.trim().is_empty() {
            return Err(OrchestratorError::InvalidInput(
                "Workspace name is required".to_string(),
            ));
        }

        self.store.create_workspace(org_id, req).await
    }

    /// Get a workspace within an organization scope
    pub async fn get_workspace(&self, org_id: &str, workspace_id: &str) -> Result<Workspace> {
        self.store.get_workspace(org_id, workspace_id).await
    }

    /// List an organization's workspaces, newest first
    pub async fn list_workspaces(&self, org_id: &str) -> Result<Vec<Workspace>> {
        self.store.list_workspaces(org_id).await
    }

    /// Check whether a user belongs to an organization
    pub async fn is_org_member(&self, org_id: &str, user_id: &str) -> Result<bool> {
        self.store.is_org_member(org_id, user_id).await
    }

    /// Admit a provision intent. Conflicts while a cluster is running or a
    /// create is already in flight; otherwise moves the workspace to
    /// CONFIGURING and dispatches a CREATE task.
    pub async fn provision(
        &self,
        org_id: &str,
        workspace_id: &str,
        params: CreateParams,
    ) -> Result<Task> {
        let workspace = self.store.get_workspace(org_id, workspace_id).await?;

        if matches!(
            workspace.cluster_status,
            ClusterStatus::Running | ClusterStatus::Configuring
        ) {
            return Err(OrchestratorError::Conflict(
                "Cluster is already provisioned or provisioning is in progress".to_string(),
            ));
        }

        self.dispatch(
            &workspace,
            TaskType::Create,
            serde_json::to_value(&params)?,
            Some(ClusterStatus::Configuring),
        )
        .await
    }

    /// Admit a destroy intent. Conflicts if a delete is already in flight;
    /// otherwise moves the workspace to DELETING and dispatches a DELETE
    /// task.
    pub async fn destroy(&self, org_id: &str, workspace_id: &str) -> Result<Task> {
        let workspace = self.store.get_workspace(org_id, workspace_id).await?;

        if workspace.cluster_status == ClusterStatus::Deleting {
            return Err(OrchestratorError::Conflict(
                "Cluster deletion is already in progress".to_string(),
            ));
        }

        self.dispatch(
            &workspace,
            TaskType::Delete,
            serde_json::json!({}),
            Some(ClusterStatus::Deleting),
        )
        .await
    }

    /// Admit a start intent. Requires a STOPPED cluster; moves it to
    /// STARTING.
    pub async fn start(&self, org_id: &str, workspace_id: &str) -> Result<Task> {
        self.perform_action(
            org_id,
            workspace_id,
            TaskType::Start,
            Some(ClusterStatus::Stopped),
            Some(ClusterStatus::Starting),
            serde_json::json!({}),
        )
        .await
    }

    /// Admit a stop intent. Requires a RUNNING cluster; moves it to
    /// STOPPING.
    pub async fn stop(&self, org_id: &str, workspace_id: &str) -> Result<Task> {
        self.perform_action(
            org_id,
            workspace_id,
            TaskType::Stop,
            Some(ClusterStatus::Running),
            Some(ClusterStatus::Stopping),
            serde_json::json!({}),
        )
        .await
    }

    /// Admit an upgrade intent. Requires a RUNNING cluster; the status is
    /// left untouched while the upgrade runs.
    pub async fn upgrade(
        &self,
        org_id: &str,
        workspace_id: &str,
        params: UpgradeParams,
    ) -> Result<Task> {
        if params.target_version.trim().is_empty() {
            return Err(OrchestratorError::InvalidInput(
                "target_version is required".to_string(),
            ));
        }

        self.perform_action(
            org_id,
            workspace_id,
            TaskType::Upgrade,
            Some(ClusterStatus::Running),
            None,
            serde_json::to_value(&params)?,
        )
        .await
    }

    /// Admit a backup intent. Requires a RUNNING cluster.
    pub async fn backup(
        &self,
        org_id: &str,
        workspace_id: &str,
        params: BackupParams,
    ) -> Result<Task> {
        if params.backup_name.trim().is_empty() {
            return Err(OrchestratorError::InvalidInput(
                "backup_name is required".to_string(),
            ));
        }

        self.perform_action(
            org_id,
            workspace_id,
            TaskType::Backup,
            Some(ClusterStatus::Running),
            None,
            serde_json::to_value(&params)?,
        )
        .await
    }

    /// Admit a restore intent. No status precondition: restoring into a
    /// broken or stopped cluster must stay possible.
    pub async fn restore(
        &self,
        org_id: &str,
        workspace_id: &str,
        params: RestoreParams,
    ) -> Result<Task> {
        if params.backup_name.trim().is_empty() {
            return Err(OrchestratorError::InvalidInput(
                "backup_name is required".to_string(),
            ));
        }

        self.perform_action(
            org_id,
            workspace_id,
            TaskType::Restore,
            None,
            None,
            serde_json::to_value(&params)?,
        )
        .await
    }

    /// List tasks visible to the user through organization membership
    pub async fn list_tasks(
        &self,
        user_id: &str,
        filters: &TaskFilters,
        limit: i64,
        offset: i64,
    ) -> Result<TaskPage> {
        self.store
            .list_tasks_for_user(user_id, filters, limit, offset)
            .await
    }

    /// Get a single task visible to the user
    pub async fn get_task(&self, user_id: &str, task_id: &str) -> Result<Task> {
        self.store.get_task_for_user(user_id, task_id).await
    }

    /// Retry a FAILED task: reset the same record to PENDING, clear its
    /// error, and re-dispatch it through the normal execution path using
    /// the recorded task type and payload.
    pub async fn retry_task(&self, user_id: &str, task_id: &str) -> Result<Task> {
        let task = self.store.get_task_for_user(user_id, task_id).await?;

        if task.status != TaskStatus::Failed {
            return Err(OrchestratorError::InvalidState(
                "Only failed tasks can be retried".to_string(),
            ));
        }

        // Guarded reset; loses cleanly if the task changed since the read.
        self.store.reset_task_for_retry(task_id).await?;
        let task = self.store.get_task(task_id).await?;

        self.executor.spawn(task.clone());

        info!(
            "Task retry dispatched: {} {} for workspace {}",
            task.task_type, task.id, task.workspace_id
        );

        Ok(task)
    }

    /// Generic admission path for actions gated on a single required
    /// status.
    async fn perform_action(
        &self,
        org_id: &str,
        workspace_id: &str,
        task_type: TaskType,
        required_status: Option<ClusterStatus>,
        intermediate_status: Option<ClusterStatus>,
        payload: serde_json::Value,
    ) -> Result<Task> {
        let workspace = self.store.get_workspace(org_id, workspace_id).await?;

        if let Some(required) = required_status {
            if workspace.cluster_status != required {
                return Err(OrchestratorError::Conflict(format!(
                    "Cluster must be in {required} state"
                )));
            }
        }

        self.dispatch(&workspace, task_type, payload, intermediate_status)
            .await
    }

    /// Shared admission tail: CAS against the observed workspace version,
    /// record the PENDING task, hand it to the executor.
    async fn dispatch(
        &self,
        workspace: &Workspace,
        task_type: TaskType,
        payload: serde_json::Value,
        intermediate_status: Option<ClusterStatus>,
    ) -> Result<Task> {
        self.store
            .cas_cluster_status(&workspace.id, workspace.version, intermediate_status)
            .await?;

        let task = self
            .store
            .create_task(&workspace.id, task_type, payload)
            .await?;

        self.executor.spawn(task.clone());

        info!(
            "Lifecycle task admitted: {} {} for workspace {}",
            task.task_type, task.id, workspace.id
        );

        Ok(task)
    }
}
