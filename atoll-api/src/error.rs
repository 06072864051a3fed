use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

pub type ApiResult<T> = Result<T, ApiError>;

#[derive(Debug)]
pub enum ApiError {
    NotFound(String),
    Conflict(String),
    BadRequest(String),
    Forbidden(String),
    Internal(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            ApiError::Conflict(msg) => (StatusCode::CONFLICT, msg),
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            ApiError::Forbidden(msg) => (StatusCode::FORBIDDEN, msg),
            ApiError::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg),
        };

        (status, Json(json!({ "error": message }))).into_response()
    }
}

impl From<atoll_orchestrator::OrchestratorError> for ApiError {
    fn from(err: atoll_orchestrator::OrchestratorError) -> Self {
        use atoll_orchestrator::OrchestratorError;

        match err {
            OrchestratorError::NotFound(msg) => ApiError::NotFound(msg),
            OrchestratorError::Conflict(msg) => ApiError::Conflict(msg),
            OrchestratorError::InvalidInput(msg) => ApiError::BadRequest(msg),
            OrchestratorError::InvalidState(msg) => ApiError::BadRequest(msg),
            _ => ApiError::Internal(err.to_string()),
        }
    }
}
