use std::sync::Arc;

use axum::{
    extract::{Request, State},
    http::header::AUTHORIZATION,
    middleware::Next,
    response::Response,
};

use crate::app::AppState;
use crate::errors::AppError;
use crate::middleware::jwt::bearer_token;

/// Middleware: validates the hub's bearer JWT.
///
/// On success the decoded claims are stored in the request extensions for
/// the [`ConnectorContext`](crate::context::ConnectorContext) extractor.
/// Any failure answers 401 and the handler is never reached.
pub async fn require_jwt(
    State(state): State<Arc<AppState>>,
    mut req: Request,
    next: Next,
) -> Result<Response, AppError> {
    let header = req
        .headers()
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok());

    let token = bearer_token(header).map_err(|e| {
        tracing::warn!(error = %e, "rejecting request without usable bearer token");
        AppError::Unauthorized(e.to_string())
    })?;

    let claims = state.validator.validate(token).await.map_err(|e| {
        tracing::warn!(error = %e, "jwt validation failed");
        AppError::Unauthorized(e.to_string())
    })?;

    tracing::debug!(
        tenant = claims.tenant_id().unwrap_or("-"),
        user = claims.username().unwrap_or("-"),
        "jwt validated"
    );

    req.extensions_mut().insert(claims);
    Ok(next.run(req).await)
}
