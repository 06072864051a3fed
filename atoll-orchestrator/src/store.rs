//! Persistence layer for workspaces, lifecycle tasks, and membership scoping.

use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use uuid::Uuid;

use atoll_driver::ProvisionedCluster;

use crate::error::{OrchestratorError, Result};
use crate::task::{Task, TaskFilters, TaskPage, TaskStatus, TaskType};
use crate::workspace::{ClusterStatus, CreateWorkspaceRequest, Workspace};

#[derive(Clone)]
pub struct LifecycleStore {
    pool: SqlitePool,
}

impl LifecycleStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Get a reference to the database pool
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Create a new workspace record. The cluster itself is provisioned
    /// later through an explicit lifecycle intent.
    pub async fn create_workspace(
        &self,
        org_id: &str,
        req: CreateWorkspaceRequest,
    ) -> Result<Workspace> {
        let id = format!("ws-{}", Uuid::new_v4());
        let now = Utc::now().timestamp();

        sqlx::query(
            r#"
            INSERT INTO workspaces (id, org_id, name, cluster_status, version, created_at, updated_at)
            VALUES (?, ?, ?, ?, 0, ?, ?)
            "#,
        )
        .bind(&id)
        .bind(org_id)
        .bind(&req.name)
        .bind(ClusterStatus::PendingCreation)
        .bind(now)
        .bind(now)
        .execute(&self.pool)
        .await?;

        self.get_workspace_by_id(&id).await
    }

    /// Get a workspace within an organization scope
    pub async fn get_workspace(&self, org_id: &str, workspace_id: &str) -> Result<Workspace> {
        let row = sqlx::query_as::<_, WorkspaceRow>(
            "SELECT * FROM workspaces WHERE id = ? AND org_id = ?",
        )
        .bind(workspace_id)
        .bind(org_id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| {
            OrchestratorError::NotFound(format!("Workspace not found: {workspace_id}"))
        })?;

        Ok(row.into())
    }

    /// Get a workspace by id alone. Used by the executor, which runs with
    /// no organization context.
    pub async fn get_workspace_by_id(&self, workspace_id: &str) -> Result<Workspace> {
        let row = sqlx::query_as::<_, WorkspaceRow>("SELECT * FROM workspaces WHERE id = ?")
            .bind(workspace_id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| {
                OrchestratorError::NotFound(format!("Workspace not found: {workspace_id}"))
            })?;

        Ok(row.into())
    }

    /// List an organization's workspaces, newest first
    pub async fn list_workspaces(&self, org_id: &str) -> Result<Vec<Workspace>> {
        let rows = sqlx::query_as::<_, WorkspaceRow>(
            "SELECT * FROM workspaces WHERE org_id = ? ORDER BY created_at DESC",
        )
        .bind(org_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(|row| row.into()).collect())
    }

    /// Compare-and-set admission write.
    ///
    /// Bumps the workspace's version and optionally moves the cluster
    /// status, keyed on the version the caller observed when it checked
    /// the precondition. Zero rows updated means another intent was
    /// admitted in between, and this one must be rejected.
    pub async fn cas_cluster_status(
        &self,
        workspace_id: &str,
        observed_version: i64,
        status: Option<ClusterStatus>,
    ) -> Result<()> {
        let result = sqlx::query(
            "UPDATE workspaces
             SET version = version + 1, cluster_status = COALESCE(?, cluster_status), updated_at = ?
             WHERE id = ? AND version = ?",
        )
        .bind(status)
        .bind(Utc::now().timestamp())
        .bind(workspace_id)
        .bind(observed_version)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(OrchestratorError::Conflict(
                "Workspace was modified by a concurrent request".to_string(),
            ));
        }

        Ok(())
    }

    /// Unconditionally set the cluster status (executor terminal effects).
    pub async fn set_cluster_status(
        &self,
        workspace_id: &str,
        status: ClusterStatus,
    ) -> Result<()> {
        sqlx::query("UPDATE workspaces SET cluster_status = ?, updated_at = ? WHERE id = ?")
            .bind(status)
            .bind(Utc::now().timestamp())
            .bind(workspace_id)
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    /// Record a successful provision: the cluster is running and its
    /// instance metadata becomes visible on the workspace.
    pub async fn apply_provisioned_cluster(
        &self,
        workspace_id: &str,
        cluster: &ProvisionedCluster,
    ) -> Result<()> {
        let config = serde_json::json!({
            "version": cluster.version,
            "endpoint": cluster.endpoint,
            "status": "ready",
        });

        sqlx::query(
            "UPDATE workspaces
             SET cluster_status = ?, instance_name = ?, cluster_config = ?, cluster_version = ?, updated_at = ?
             WHERE id = ?",
        )
        .bind(ClusterStatus::Running)
        .bind(&cluster.instance_name)
        .bind(config.to_string())
        .bind(&cluster.version)
        .bind(Utc::now().timestamp())
        .bind(workspace_id)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Record a completed delete: back to the pre-provisioning state with
    /// all instance metadata cleared.
    pub async fn clear_cluster_instance(&self, workspace_id: &str) -> Result<()> {
        sqlx::query(
            "UPDATE workspaces
             SET cluster_status = ?, instance_name = NULL, cluster_config = '{}', cluster_version = NULL, updated_at = ?
             WHERE id = ?",
        )
        .bind(ClusterStatus::PendingCreation)
        .bind(Utc::now().timestamp())
        .bind(workspace_id)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Record a completed upgrade by rewriting the version in the stored
    /// cluster config. Status is untouched.
    pub async fn apply_cluster_upgrade(
        &self,
        workspace_id: &str,
        target_version: &str,
    ) -> Result<()> {
        let workspace = self.get_workspace_by_id(workspace_id).await?;

        let mut config = workspace.cluster_config;
        if let Some(obj) = config.as_object_mut() {
            obj.insert(
                "version".to_string(),
                serde_json::Value::String(target_version.to_string()),
            );
        }

        sqlx::query(
            "UPDATE workspaces SET cluster_config = ?, cluster_version = ?, updated_at = ? WHERE id = ?",
        )
        .bind(config.to_string())
        .bind(target_version)
        .bind(Utc::now().timestamp())
        .bind(workspace_id)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Check whether a user belongs to an organization
    pub async fn is_org_member(&self, org_id: &str, user_id: &str) -> Result<bool> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM organization_members WHERE org_id = ? AND user_id = ?",
        )
        .bind(org_id)
        .bind(user_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(count > 0)
    }

    /// Insert a new PENDING task with an immutable type and payload.
    pub async fn create_task(
        &self,
        workspace_id: &str,
        task_type: TaskType,
        payload: serde_json::Value,
    ) -> Result<Task> {
        let id = format!("task-{}", Uuid::new_v4());
        let now = Utc::now().timestamp();

        sqlx::query(
            r#"
            INSERT INTO lifecycle_tasks (id, workspace_id, task_type, status, payload, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&id)
        .bind(workspace_id)
        .bind(task_type)
        .bind(TaskStatus::Pending)
        .bind(payload.to_string())
        .bind(now)
        .bind(now)
        .execute(&self.pool)
        .await?;

        self.get_task(&id).await
    }

    /// Get a task by id with no ownership scoping. Internal callers only;
    /// user-facing reads go through [`Self::get_task_for_user`].
    pub async fn get_task(&self, task_id: &str) -> Result<Task> {
        let row = sqlx::query_as::<_, TaskRow>("SELECT * FROM lifecycle_tasks WHERE id = ?")
            .bind(task_id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| OrchestratorError::NotFound(format!("Task not found: {task_id}")))?;

        Ok(row.into())
    }

    /// Get a task the user can see through an organization membership.
    /// Tasks outside the user's organizations are indistinguishable from
    /// tasks that do not exist.
    pub async fn get_task_for_user(&self, user_id: &str, task_id: &str) -> Result<Task> {
        let row = sqlx::query_as::<_, TaskRow>(
            "SELECT lifecycle_tasks.* FROM lifecycle_tasks
             JOIN workspaces ON workspaces.id = lifecycle_tasks.workspace_id
             JOIN organization_members ON organization_members.org_id = workspaces.org_id
             WHERE lifecycle_tasks.id = ? AND organization_members.user_id = ?",
        )
        .bind(task_id)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| OrchestratorError::NotFound(format!("Task not found: {task_id}")))?;

        Ok(row.into())
    }

    /// List tasks visible to the user, newest first, with filters and
    /// limit/offset pagination. `total` counts all matching rows, not the
    /// page.
    pub async fn list_tasks_for_user(
        &self,
        user_id: &str,
        filters: &TaskFilters,
        limit: i64,
        offset: i64,
    ) -> Result<TaskPage> {
        let mut from_clause = String::from(
            " FROM lifecycle_tasks
             JOIN workspaces ON workspaces.id = lifecycle_tasks.workspace_id
             JOIN organization_members ON organization_members.org_id = workspaces.org_id
             WHERE organization_members.user_id = ?",
        );

        if filters.workspace_id.is_some() {
            from_clause.push_str(" AND lifecycle_tasks.workspace_id = ?");
        }
        if filters.task_type.is_some() {
            from_clause.push_str(" AND lifecycle_tasks.task_type = ?");
        }
        if filters.status.is_some() {
            from_clause.push_str(" AND lifecycle_tasks.status = ?");
        }

        let count_query = format!("SELECT COUNT(*){from_clause}");
        let mut count_q = sqlx::query_scalar::<_, i64>(&count_query).bind(user_id);
        if let Some(workspace_id) = &filters.workspace_id {
            count_q = count_q.bind(workspace_id);
        }
        if let Some(task_type) = &filters.task_type {
            count_q = count_q.bind(task_type);
        }
        if let Some(status) = &filters.status {
            count_q = count_q.bind(status);
        }
        let total = count_q.fetch_one(&self.pool).await?;

        let list_query = format!(
            "SELECT lifecycle_tasks.*{from_clause} ORDER BY lifecycle_tasks.created_at DESC LIMIT ? OFFSET ?"
        );
        let mut list_q = sqlx::query_as::<_, TaskRow>(&list_query).bind(user_id);
        if let Some(workspace_id) = &filters.workspace_id {
            list_q = list_q.bind(workspace_id);
        }
        if let Some(task_type) = &filters.task_type {
            list_q = list_q.bind(task_type);
        }
        if let Some(status) = &filters.status {
            list_q = list_q.bind(status);
        }
        let rows = list_q.bind(limit).bind(offset).fetch_all(&self.pool).await?;

        Ok(TaskPage {
            tasks: rows.into_iter().map(|row| row.into()).collect(),
            total,
        })
    }

    /// Guarded status transition: the update only applies while the task
    /// is still in `from`. Returns whether a row was updated, so callers
    /// can tell a won race from a lost one.
    pub async fn transition_task(
        &self,
        task_id: &str,
        from: TaskStatus,
        to: TaskStatus,
        error_message: Option<&str>,
    ) -> Result<bool> {
        let result = sqlx::query(
            "UPDATE lifecycle_tasks SET status = ?, error_message = ?, updated_at = ?
             WHERE id = ? AND status = ?",
        )
        .bind(to)
        .bind(error_message)
        .bind(Utc::now().timestamp())
        .bind(task_id)
        .bind(from)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Reset a FAILED task to PENDING and clear its error, guarded so only
    /// failed tasks are retryable.
    pub async fn reset_task_for_retry(&self, task_id: &str) -> Result<()> {
        let result = sqlx::query(
            "UPDATE lifecycle_tasks SET status = ?, error_message = NULL, updated_at = ?
             WHERE id = ? AND status = ?",
        )
        .bind(TaskStatus::Pending)
        .bind(Utc::now().timestamp())
        .bind(task_id)
        .bind(TaskStatus::Failed)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(OrchestratorError::InvalidState(
                "Only failed tasks can be retried".to_string(),
            ));
        }

        Ok(())
    }
}

// Internal row types for sqlx
#[derive(sqlx::FromRow)]
struct WorkspaceRow {
    id: String,
    org_id: String,
    name: String,
    cluster_status: ClusterStatus,
    version: i64,
    instance_name: Option<String>,
    cluster_config: String,
    cluster_version: Option<String>,
    created_at: i64,
    updated_at: i64,
}

#[derive(sqlx::FromRow)]
struct TaskRow {
    id: String,
    workspace_id: String,
    task_type: TaskType,
    status: TaskStatus,
    payload: String,
    error_message: Option<String>,
    created_at: i64,
    updated_at: i64,
}

impl From<WorkspaceRow> for Workspace {
    fn from(row: WorkspaceRow) -> Self {
        Self {
            id: row.id,
            org_id: row.org_id,
            name: row.name,
            cluster_status: row.cluster_status,
            version: row.version,
            instance_name: row.instance_name,
            cluster_config: serde_json::from_str(&row.cluster_config)
                .unwrap_or_else(|_| serde_json::json!({})),
            cluster_version: row.cluster_version,
            created_at: DateTime::from_timestamp(row.created_at, 0).unwrap(),
            updated_at: DateTime::from_timestamp(row.updated_at, 0).unwrap(),
        }
    }
}

impl From<TaskRow> for Task {
    fn from(row: TaskRow) -> Self {
        Self {
            id: row.id,
            workspace_id: row.workspace_id,
            task_type: row.task_type,
            status: row.status,
            payload: serde_json::from_str(&row.payload).unwrap_or_else(|_| serde_json::json!({})),
            error_message: row.error_message,
            created_at: DateTime::from_timestamp(row.created_at, 0).unwrap(),
            updated_at: DateTime::from_timestamp(row.updated_at, 0).unwrap(),
        }
    }
}
