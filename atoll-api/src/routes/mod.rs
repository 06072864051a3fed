pub mod cluster;
pub mod health;
pub mod tasks;
pub mod workspaces;

use crate::{api_docs::ApiDoc, auth::auth_middleware, state::AppState};
use axum::{middleware, Router};
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

pub async fn create_app(state: AppState) -> anyhow::Result<Router> {
    // Allow CORS for local development (frontend on different port)
    let cors = CorsLayer::permissive();

    let app = Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .merge(health::routes()) // Health routes don't need auth
        .merge(
            workspaces::routes()
                .merge(cluster::routes())
                .merge(tasks::routes())
                .layer(middleware::from_fn(auth_middleware)), // Auth for workspaces, cluster lifecycle, and tasks
        )
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    Ok(app)
}
