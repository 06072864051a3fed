//! Cluster lifecycle endpoints. Every mutating route answers 202 with a
//! task id; completion is observed through the tasks API.

use crate::{
    auth::{check_org_member, AuthenticatedUser},
    error::ApiResult,
    state::AppState,
};
use atoll_driver::{BackupParams, CreateParams, RestoreParams, UpgradeParams};
use atoll_orchestrator::{ClusterStatus, Task};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post},
    Extension, Json, Router,
};
use serde::Serialize;
use utoipa::ToSchema;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route(
            "/api/v1/orgs/{org_id}/workspaces/{workspace_id}/cluster",
            get(get_cluster_status)
                .post(provision_cluster)
                .delete(destroy_cluster),
        )
        .route(
            "/api/v1/orgs/{org_id}/workspaces/{workspace_id}/cluster/start",
            post(start_cluster),
        )
        .route(
            "/api/v1/orgs/{org_id}/workspaces/{workspace_id}/cluster/stop",
            post(stop_cluster),
        )
        .route(
            "/api/v1/orgs/{org_id}/workspaces/{workspace_id}/cluster/upgrade",
            post(upgrade_cluster),
        )
        .route(
            "/api/v1/orgs/{org_id}/workspaces/{workspace_id}/cluster/backup",
            post(backup_cluster),
        )
        .route(
            "/api/v1/orgs/{org_id}/workspaces/{workspace_id}/cluster/restore",
            post(restore_cluster),
        )
}

/// Body returned by every admission endpoint
#[derive(Debug, Serialize, ToSchema)]
pub struct TaskAccepted {
    pub task_id: String,
    pub status: String,
    pub message: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ClusterStatusResponse {
    pub status: ClusterStatus,
    pub workspace: String,
    pub cluster_info: serde_json::Value,
}

fn accepted(task: &Task, action: &str) -> (StatusCode, Json<TaskAccepted>) {
    (
        StatusCode::ACCEPTED,
        Json(TaskAccepted {
            task_id: task.id.clone(),
            status: format!("{action}_initiated"),
            message: format!("Cluster {action} has been started"),
        }),
    )
}

#[utoipa::path(
    get,
    path = "/api/v1/orgs/{org_id}/workspaces/{workspace_id}/cluster",
    params(
        ("org_id" = String, Path, description = "Organization id"),
        ("workspace_id" = String, Path, description = "Workspace id")
    ),
    responses(
        (status = 200, description = "Current cluster status", body = ClusterStatusResponse),
        (status = 404, description = "Workspace not found")
    )
)]
pub(crate) async fn get_cluster_status(
    State(state): State<AppState>,
    Extension(user): Extension<AuthenticatedUser>,
    Path((org_id, workspace_id)): Path<(String, String)>,
) -> ApiResult<Json<ClusterStatusResponse>> {
    check_org_member(&state.orchestrator, &org_id, &user).await?;

    let workspace = state
        .orchestrator
        .get_workspace(&org_id, &workspace_id)
        .await?;

    Ok(Json(ClusterStatusResponse {
        status: workspace.cluster_status,
        workspace: workspace.name,
        cluster_info: workspace.cluster_config,
    }))
}

#[utoipa::path(
    post,
    path = "/api/v1/orgs/{org_id}/workspaces/{workspace_id}/cluster",
    params(
        ("org_id" = String, Path, description = "Organization id"),
        ("workspace_id" = String, Path, description = "Workspace id")
    ),
    request_body = CreateParams,
    responses(
        (status = 202, description = "Provisioning started", body = TaskAccepted),
        (status = 409, description = "Cluster already provisioned or provisioning")
    )
)]
pub(crate) async fn provision_cluster(
    State(state): State<AppState>,
    Extension(user): Extension<AuthenticatedUser>,
    Path((org_id, workspace_id)): Path<(String, String)>,
    body: Option<Json<CreateParams>>,
) -> ApiResult<(StatusCode, Json<TaskAccepted>)> {
    check_org_member(&state.orchestrator, &org_id, &user).await?;

    // Body is optional; an empty provision takes all defaults.
    let params = body.map(|Json(params)| params).unwrap_or_default();

    let task = state
        .orchestrator
        .provision(&org_id, &workspace_id, params)
        .await?;

    Ok(accepted(&task, "provisioning"))
}

#[utoipa::path(
    delete,
    path = "/api/v1/orgs/{org_id}/workspaces/{workspace_id}/cluster",
    params(
        ("org_id" = String, Path, description = "Organization id"),
        ("workspace_id" = String, Path, description = "Workspace id")
    ),
    responses(
        (status = 202, description = "Deletion started", body = TaskAccepted),
        (status = 409, description = "Deletion already in progress")
    )
)]
pub(crate) async fn destroy_cluster(
    State(state): State<AppState>,
    Extension(user): Extension<AuthenticatedUser>,
    Path((org_id, workspace_id)): Path<(String, String)>,
) -> ApiResult<(StatusCode, Json<TaskAccepted>)> {
    check_org_member(&state.orchestrator, &org_id, &user).await?;

    let task = state.orchestrator.destroy(&org_id, &workspace_id).await?;

    Ok(accepted(&task, "deletion"))
}

#[utoipa::path(
    post,
    path = "/api/v1/orgs/{org_id}/workspaces/{workspace_id}/cluster/start",
    params(
        ("org_id" = String, Path, description = "Organization id"),
        ("workspace_id" = String, Path, description = "Workspace id")
    ),
    responses(
        (status = 202, description = "Start initiated", body = TaskAccepted),
        (status = 409, description = "Cluster is not stopped")
    )
)]
pub(crate) async fn start_cluster(
    State(state): State<AppState>,
    Extension(user): Extension<AuthenticatedUser>,
    Path((org_id, workspace_id)): Path<(String, String)>,
) -> ApiResult<(StatusCode, Json<TaskAccepted>)> {
    check_org_member(&state.orchestrator, &org_id, &user).await?;

    let task = state.orchestrator.start(&org_id, &workspace_id).await?;

    Ok(accepted(&task, "start"))
}

#[utoipa::path(
    post,
    path = "/api/v1/orgs/{org_id}/workspaces/{workspace_id}/cluster/stop",
    params(
        ("org_id" = String, Path, description = "Organization id"),
        ("workspace_id" = String, Path, description = "Workspace id")
    ),
    responses(
        (status = 202, description = "Stop initiated", body = TaskAccepted),
        (status = 409, description = "Cluster is not running")
    )
)]
pub(crate) async fn stop_cluster(
    State(state): State<AppState>,
    Extension(user): Extension<AuthenticatedUser>,
    Path((org_id, workspace_id)): Path<(String, String)>,
) -> ApiResult<(StatusCode, Json<TaskAccepted>)> {
    check_org_member(&state.orchestrator, &org_id, &user).await?;

    let task = state.orchestrator.stop(&org_id, &workspace_id).await?;

    Ok(accepted(&task, "stop"))
}

#[utoipa::path(
    post,
    path = "/api/v1/orgs/{org_id}/workspaces/{workspace_id}/cluster/upgrade",
    params(
        ("org_id" = String, Path, description = "Organization id"),
        ("workspace_id" = String, Path, description = "Workspace id")
    ),
    request_body = UpgradeParams,
    responses(
        (status = 202, description = "Upgrade initiated", body = TaskAccepted),
        (status = 409, description = "Cluster is not running")
    )
)]
pub(crate) async fn upgrade_cluster(
    State(state): State<AppState>,
    Extension(user): Extension<AuthenticatedUser>,
    Path((org_id, workspace_id)): Path<(String, String)>,
    Json(params): Json<UpgradeParams>,
) -> ApiResult<(StatusCode, Json<TaskAccepted>)> {
    check_org_member(&state.orchestrator, &org_id, &user).await?;

    let task = state
        .orchestrator
        .upgrade(&org_id, &workspace_id, params)
        .await?;

    Ok(accepted(&task, "upgrade"))
}

#[utoipa::path(
    post,
    path = "/api/v1/orgs/{org_id}/workspaces/{workspace_id}/cluster/backup",
    params(
        ("org_id" = String, Path, description = "Organization id"),
        ("workspace_id" = String, Path, description = "Workspace id")
    ),
    request_body = BackupParams,
    responses(
        (status = 202, description = "Backup initiated", body = TaskAccepted),
        (status = 409, description = "Cluster is not running")
    )
)]
pub(crate) async fn backup_cluster(
    State(state): State<AppState>,
    Extension(user): Extension<AuthenticatedUser>,
    Path((org_id, workspace_id)): Path<(String, String)>,
    Json(params): Json<BackupParams>,
) -> ApiResult<(StatusCode, Json<TaskAccepted>)> {
    check_org_member(&state.orchestrator, &org_id, &user).await?;

    let task = state
        .orchestrator
        .backup(&org_id, &workspace_id, params)
        .await?;

    Ok(accepted(&task, "backup"))
}

#[utoipa::path(
    post,
    path = "/api/v1/orgs/{org_id}/workspaces/{workspace_id}/cluster/restore",
    params(
        ("org_id" = String, Path, description = "Organization id"),
        ("workspace_id" = String, Path, description = "Workspace id")
    ),
    request_body = RestoreParams,
    responses(
        (status = 202, description = "Restore initiated", body = TaskAccepted),
        (status = 404, description = "Workspace not found")
    )
)]
pub(crate) async fn restore_cluster(
    State(state): State<AppState>,
    Extension(user): Extension<AuthenticatedUser>,
    Path((org_id, workspace_id)): Path<(String, String)>,
    Json(params): Json<RestoreParams>,
) -> ApiResult<(StatusCode, Json<TaskAccepted>)> {
    check_org_member(&state.orchestrator, &org_id, &user).await?;

    let task = state
        .orchestrator
        .restore(&org_id, &workspace_id, params)
        .await?;

    Ok(accepted(&task, "restore"))
}
