use atoll_driver::{BackupParams, CreateParams, RestoreParams, UpgradeParams};
use atoll_orchestrator::{
    ClusterStatus, CreateWorkspaceRequest, Task, TaskPage, TaskStatus, TaskType, Workspace,
};
use utoipa::OpenApi;

use crate::routes::cluster::{ClusterStatusResponse, TaskAccepted};
use crate::routes::tasks::RetryResponse;

#[derive(OpenApi)]
#[openapi(
    paths(
        crate::routes::health::health_check,
        crate::routes::health::readiness_check,
        crate::routes::workspaces::create_workspace,
        crate::routes::workspaces::list_workspaces,
        crate::routes::workspaces::get_workspace,
        crate::routes::cluster::get_cluster_status,
        crate::routes::cluster::provision_cluster,
        crate::routes::cluster::destroy_cluster,
        crate::routes::cluster::start_cluster,
        crate::routes::cluster::stop_cluster,
        crate::routes::cluster::upgrade_cluster,
        crate::routes::cluster::backup_cluster,
        crate::routes::cluster::restore_cluster,
        crate::routes::tasks::list_tasks,
        crate::routes::tasks::get_task,
        crate::routes::tasks::retry_task,
    ),
    components(
        schemas(
            Workspace,
            ClusterStatus,
            CreateWorkspaceRequest,
            Task,
            TaskStatus,
            TaskType,
            TaskPage,
            CreateParams,
            UpgradeParams,
            BackupParams,
            RestoreParams,
            TaskAccepted,
            ClusterStatusResponse,
            RetryResponse
        )
    ),
    tags(
        (name = "atoll-api", description = "Workspace cluster lifecycle API")
    )
)]
pub struct ApiDoc;
