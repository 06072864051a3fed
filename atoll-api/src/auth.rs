use crate::error::ApiError;
use atoll_orchestrator::LifecycleOrchestrator;
use axum::{extract::Request, http::StatusCode, middleware::Next, response::Response};

#[derive(Clone, Debug)]
pub struct AuthenticatedUser {
    pub user_id: String,
    pub email: Option<String>,
}

/// Auth middleware - extracts user from atoll-auth-proxy headers
///
/// In production, atoll-auth-proxy should be deployed in front of atoll-api
/// and will set X-Atoll-User header after OAuth verification.
///
/// For local development without auth proxy, we fall back to x-user header.
pub async fn auth_middleware(mut req: Request, next: Next) -> Result<Response, StatusCode> {
    // Try atoll-auth-proxy headers first (production)
    let user_id = req
        .headers()
        .get("x-atoll-user")
        .or_else(|| req.headers().get("x-forwarded-user")) // oauth2-proxy format
        .or_else(|| req.headers().get("x-user")) // fallback for dev
        .and_then(|h| h.to_str().ok())
        .map(|s| s.to_string());

    let email = req
        .headers()
        .get("x-atoll-email")
        .or_else(|| req.headers().get("x-forwarded-email"))
        .and_then(|h| h.to_str().ok())
        .map(|s| s.to_string());

    // If no user id, return 401
    let user_id = user_id.ok_or(StatusCode::UNAUTHORIZED)?;

    req.extensions_mut()
        .insert(AuthenticatedUser { user_id, email });

    Ok(next.run(req).await)
}

/// Check that the authenticated user belongs to the organization
///
/// Membership is the only access rule: non-members get Forbidden whether
/// or not the organization exists, so org ids cannot be probed.
pub async fn check_org_member(
    orchestrator: &LifecycleOrchestrator,
    org_id: &str,
    user: &AuthenticatedUser,
) -> Result<(), ApiError> {
    let is_member = orchestrator.is_org_member(org_id, &user.user_id).await?;

    if !is_member {
        return Err(ApiError::Forbidden(
            "not authorized to access this organization".to_string(),
        ));
    }

    Ok(())
}
