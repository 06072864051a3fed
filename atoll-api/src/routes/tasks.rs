use crate::{
    auth::AuthenticatedUser,
    error::{ApiError, ApiResult},
    state::AppState,
};
use atoll_orchestrator::{Task, TaskFilters, TaskPage, TaskStatus, TaskType};
use axum::{
    extract::{Path, Query, State},
    routing::{get, post},
    Extension, Json, Router,
};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/api/v1/tasks", get(list_tasks))
        .route("/api/v1/tasks/{task_id}", get(get_task))
        .route("/api/v1/tasks/{task_id}/retry", post(retry_task))
}

#[derive(Debug, Deserialize, IntoParams)]
pub(crate) struct TasksQuery {
    workspace_id: Option<String>,
    #[serde(rename = "type")]
    task_type: Option<String>,
    status: Option<String>,
    limit: Option<i64>,
    offset: Option<i64>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct RetryResponse {
    pub message: String,
    pub task: Task,
}

#[utoipa::path(
    get,
    path = "/api/v1/tasks",
    params(TasksQuery),
    responses(
        (status = 200, description = "Tasks visible to the caller", body = TaskPage),
        (status = 400, description = "Invalid filter value")
    )
)]
pub(crate) async fn list_tasks(
    State(state): State<AppState>,
    Extension(user): Extension<AuthenticatedUser>,
    Query(query): Query<TasksQuery>,
) -> ApiResult<Json<TaskPage>> {
    let task_type = query
        .task_type
        .map(|s| s.parse::<TaskType>())
        .transpose()
        .map_err(ApiError::BadRequest)?;

    let status = query
        .status
        .map(|s| s.parse::<TaskStatus>())
        .transpose()
        .map_err(ApiError::BadRequest)?;

    let filters = TaskFilters {
        workspace_id: query.workspace_id,
        task_type,
        status,
    };

    let limit = query.limit.unwrap_or(50);
    let offset = query.offset.unwrap_or(0);

    let page = state
        .orchestrator
        .list_tasks(&user.user_id, &filters, limit, offset)
        .await?;

    Ok(Json(page))
}

#[utoipa::path(
    get,
    path = "/api/v1/tasks/{task_id}",
    params(("task_id" = String, Path, description = "Task id")),
    responses(
        (status = 200, description = "Task detail", body = Task),
        (status = 404, description = "Task not found or not visible")
    )
)]
pub(crate) async fn get_task(
    State(state): State<AppState>,
    Extension(user): Extension<AuthenticatedUser>,
    Path(task_id): Path<String>,
) -> ApiResult<Json<Task>> {
    let task = state.orchestrator.get_task(&user.user_id, &task_id).await?;

    Ok(Json(task))
}

#[utoipa::path(
    post,
    path = "/api/v1/tasks/{task_id}/retry",
    params(("task_id" = String, Path, description = "Task id")),
    responses(
        (status = 200, description = "Task reset to PENDING and re-dispatched", body = RetryResponse),
        (status = 400, description = "Task is not in FAILED status"),
        (status = 404, description = "Task not found or not visible")
    )
)]
pub(crate) async fn retry_task(
    State(state): State<AppState>,
    Extension(user): Extension<AuthenticatedUser>,
    Path(task_id): Path<String>,
) -> ApiResult<Json<RetryResponse>> {
    let task = state
        .orchestrator
        .retry_task(&user.user_id, &task_id)
        .await?;

    Ok(Json(RetryResponse {
        message: "task has been retried".to_string(),
        task,
    }))
}
