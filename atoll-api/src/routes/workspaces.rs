use crate::{
    auth::{check_org_member, AuthenticatedUser},
    error::ApiResult,
    state::AppState,
};
use axum::{
    extract::{Path, State},
    routing::get,
    Extension, Json, Router,
};
use atoll_orchestrator::{CreateWorkspaceRequest, Workspace};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route(
            "/api/v1/orgs/{org_id}/workspaces",
            get(list_workspaces).post(create_workspace),
        )
        .route(
            "/api/v1/orgs/{org_id}/workspaces/{workspace_id}",
            get(get_workspace),
        )
}

#[utoipa::path(
    post,
    path = "/api/v1/orgs/{org_id}/workspaces",
    params(("org_id" = String, Path, description = "Organization id")),
    request_body = CreateWorkspaceRequest,
    responses(
        (status = 200, description = "Workspace created", body = Workspace),
        (status = 403, description = "Not a member of the organization")
    )
)]
pub(crate) async fn create_workspace(
    State(state): State<AppState>,
    Extension(user): Extension<AuthenticatedUser>,
    Path(org_id): Path<String>,
    Json(req): Json<CreateWorkspaceRequest>,
) -> ApiResult<Json<Workspace>> {
    check_org_member(&state.orchestrator, &org_id, &user).await?;

    let workspace = state.orchestrator.create_workspace(&org_id, req).await?;

    Ok(Json(workspace))
}

#[utoipa::path(
    get,
    path = "/api/v1/orgs/{org_id}/workspaces",
    params(("org_id" = String, Path, description = "Organization id")),
    responses((status = 200, description = "Workspaces in the organization", body = [Workspace]))
)]
pub(crate) async fn list_workspaces(
    State(state): State<AppState>,
    Extension(user): Extension<AuthenticatedUser>,
    Path(org_id): Path<String>,
) -> ApiResult<Json<Vec<Workspace>>> {
    check_org_member(&state.orchestrator, &org_id, &user).await?;

    let workspaces = state.orchestrator.list_workspaces(&org_id).await?;

    Ok(Json(workspaces))
}

#[utoipa::path(
    get,
    path = "/api/v1/orgs/{org_id}/workspaces/{workspace_id}",
    params(
        ("org_id" = String, Path, description = "Organization id"),
        ("workspace_id" = String, Path, description = "Workspace id")
    ),
    responses(
        (status = 200, description = "Workspace detail", body = Workspace),
        (status = 404, description = "Workspace not found")
    )
)]
pub(crate) async fn get_workspace(
    State(state): State<AppState>,
    Extension(user): Extension<AuthenticatedUser>,
    Path((org_id, workspace_id)): Path<(String, String)>,
) -> ApiResult<Json<Workspace>> {
    check_org_member(&state.orchestrator, &org_id, &user).await?;

    let workspace = state
        .orchestrator
        .get_workspace(&org_id, &workspace_id)
        .await?;

    Ok(Json(workspace))
}
