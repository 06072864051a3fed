//! Background execution of lifecycle tasks.
//!
//! Admission hands tasks to [`TaskExecutor::spawn`] and returns; everything
//! after that happens here. The executor claims the task, invokes the
//! driver inside a supervised region (deadline + panic boundary), applies
//! the terminal effect on the workspace, and records the outcome. Any fault
//! in that region, including a panicking driver, lands on the task record
//! as FAILED instead of escaping.

use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;

use futures::FutureExt;
use tokio::sync::Semaphore;
use tracing::{error, info, warn};

use atoll_driver::{
    BackupParams, ClusterDriver, ClusterSpec, CreateParams, RestoreParams, UpgradeParams,
};

use crate::error::Result;
use crate::store::LifecycleStore;
use crate::task::{Task, TaskStatus, TaskType};
use crate::workspace::ClusterStatus;

#[derive(Clone)]
pub struct TaskExecutor {
    store: LifecycleStore,
    driver: Arc<dyn ClusterDriver>,
    permits: Arc<Semaphore>,
    driver_timeout: Duration,
}

impl TaskExecutor {
    pub fn new(
        store: LifecycleStore,
        driver: Arc<dyn ClusterDriver>,
        max_concurrent_tasks: usize,
        driver_timeout: Duration,
    ) -> Self {
        Self {
            store,
            driver,
            permits: Arc::new(Semaphore::new(max_concurrent_tasks)),
            driver_timeout,
        }
    }

    /// Dispatch a task for background execution and return immediately.
    ///
    /// Used for both first dispatch and retry; a retried task re-enters
    /// exactly the same path as a fresh one.
    pub fn spawn(&self, task: Task) {
        let executor = self.clone();
        tokio::spawn(async move {
            executor.run(task).await;
        });
    }

    async fn run(&self, task: Task) {
        // The permit wait happens inside the spawned task, so a full pool
        // delays execution without ever blocking admission.
        let _permit = match self.permits.clone().acquire_owned().await {
            Ok(permit) => permit,
            Err(_) => return, // semaphore closed, service shutting down
        };

        let claimed = match self
            .store
            .transition_task(&task.id, TaskStatus::Pending, TaskStatus::Running, None)
            .await
        {
            Ok(claimed) => claimed,
            Err(e) => {
                error!(task_id = %task.id, error = %e, "Failed to claim task");
                return;
            }
        };
        if !claimed {
            warn!(task_id = %task.id, "Task is no longer pending, skipping");
            return;
        }

        let outcome = tokio::time::timeout(
            self.driver_timeout,
            AssertUnwindSafe(self.execute(&task)).catch_unwind(),
        )
        .await;

        let failure = match outcome {
            Ok(Ok(Ok(()))) => None,
            Ok(Ok(Err(e))) => Some(e.to_string()),
            Ok(Err(panic_error)) => {
                let panic_msg = if let Some(s) = panic_error.downcast_ref::<&str>() {
                    s.to_string()
                } else if let Some(s) = panic_error.downcast_ref::<String>() {
                    s.clone()
                } else {
                    "Unknown panic".to_string()
                };
                Some(format!("Task processing panicked: {panic_msg}"))
            }
            Err(_) => Some(format!(
                "Driver call timed out after {}s",
                self.driver_timeout.as_secs()
            )),
        };

        let recorded = match &failure {
            None => {
                info!(
                    task_id = %task.id,
                    task_type = %task.task_type,
                    workspace_id = %task.workspace_id,
                    "Task completed"
                );
                self.store
                    .transition_task(&task.id, TaskStatus::Running, TaskStatus::Completed, None)
                    .await
            }
            Some(message) => {
                error!(
                    task_id = %task.id,
                    task_type = %task.task_type,
                    workspace_id = %task.workspace_id,
                    error = %message,
                    "Task failed"
                );
                self.store
                    .transition_task(
                        &task.id,
                        TaskStatus::Running,
                        TaskStatus::Failed,
                        Some(message),
                    )
                    .await
            }
        };

        // Execution is fire-and-forget; an outcome we cannot record is only
        // visible in the log.
        match recorded {
            Ok(true) => {}
            Ok(false) => warn!(task_id = %task.id, "Task left RUNNING state mid-execution"),
            Err(e) => error!(task_id = %task.id, error = %e, "Failed to record task outcome"),
        }
    }

    /// Driver call plus terminal workspace effect for one task type.
    ///
    /// This is the single dispatch table: admission and retry both end up
    /// here, keyed only on the recorded `task_type` and `payload`.
    async fn execute(&self, task: &Task) -> Result<()> {
        let workspace = self.store.get_workspace_by_id(&task.workspace_id).await?;
        let spec = ClusterSpec {
            workspace_id: workspace.id.clone(),
            name: workspace.name.clone(),
            instance_name: workspace.instance_name.clone(),
        };

        match task.task_type {
            TaskType::Create => {
                let params: CreateParams = serde_json::from_value(task.payload.clone())?;
                let cluster = self.driver.create(&spec, &params).await?;
                self.store
                    .apply_provisioned_cluster(&workspace.id, &cluster)
                    .await?;
            }
            TaskType::Delete => {
                self.driver.delete(&spec).await?;
                self.store.clear_cluster_instance(&workspace.id).await?;
            }
            TaskType::Start => {
                self.driver.start(&spec).await?;
                self.store
                    .set_cluster_status(&workspace.id, ClusterStatus::Running)
                    .await?;
            }
            TaskType::Stop => {
                self.driver.stop(&spec).await?;
                self.store
                    .set_cluster_status(&workspace.id, ClusterStatus::Stopped)
                    .await?;
            }
            TaskType::Upgrade => {
                let params: UpgradeParams = serde_json::from_value(task.payload.clone())?;
                self.driver.upgrade(&spec, &params).await?;
                self.store
                    .apply_cluster_upgrade(&workspace.id, &params.target_version)
                    .await?;
            }
            TaskType::Backup => {
                let params: BackupParams = serde_json::from_value(task.payload.clone())?;
                self.driver.backup(&spec, &params).await?;
            }
            TaskType::Restore => {
                let params: RestoreParams = serde_json::from_value(task.payload.clone())?;
                self.driver.restore(&spec, &params).await?;
            }
        }

        Ok(())
    }
}
