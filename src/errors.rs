use axum::extract::rejection::FormRejection;
use axum::http::{HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use thiserror::Error;

use crate::backend::BackendError;

pub const X_BACKEND_STATUS: &str = "x-backend-status";

#[derive(Debug, Error)]
pub enum AppError {
    #[error("{0}")]
    Unauthorized(String),

    /// A required hub header is absent. Holds the lower-case header name.
    #[error("The {0} is required")]
    MissingHeader(&'static str),

    #[error("{0}")]
    BadRequest(String),

    #[error("{method} failed: {source}")]
    Backend {
        method: &'static str,
        #[source]
        source: BackendError,
    },

    #[error("internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl AppError {
    /// Adapter for `map_err` that tags a backend failure with the operation
    /// that produced it.
    pub fn backend(method: &'static str) -> impl FnOnce(BackendError) -> AppError {
        move |source| AppError::Backend { method, source }
    }
}

impl From<FormRejection> for AppError {
    fn from(rejection: FormRejection) -> Self {
        AppError::BadRequest(rejection.body_text())
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        match self {
            AppError::Unauthorized(msg) => {
                (StatusCode::UNAUTHORIZED, Json(json!({ "message": msg }))).into_response()
            }
            AppError::MissingHeader(name) => (
                StatusCode::BAD_REQUEST,
                Json(json!({ "message": format!("The {} is required", name) })),
            )
                .into_response(),
            AppError::BadRequest(msg) => {
                (StatusCode::BAD_REQUEST, Json(json!({ "message": msg }))).into_response()
            }
            AppError::Backend { method, source } => prepare_error_response(method, &source),
            AppError::Internal(e) => {
                tracing::error!("Internal error: {:#}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(json!({ "message": "internal server error" })),
                )
                    .into_response()
            }
        }
    }
}

/// Map a normalized backend failure to the connector's HTTP answer.
///
/// Unauthorized backend calls become 400 with `X-Backend-Status: 401` so
/// the hub can prompt the user to re-link their account; everything else is
/// a 500 carrying the backend's own status (or `unknown`).
pub fn prepare_error_response(method: &str, err: &BackendError) -> Response {
    let status = match err {
        BackendError::Unauthorized { .. } => StatusCode::BAD_REQUEST,
        BackendError::Status { .. } | BackendError::Unknown { .. } => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    };
    let label = err.status_label();

    tracing::warn!(
        method = method,
        backend_status = %label,
        error = %err,
        "backend call failed"
    );

    let body = Json(json!({
        "method": method,
        "message": err.message(),
    }));

    let mut response = (status, body).into_response();
    if let Ok(value) = HeaderValue::from_str(&label) {
        response.headers_mut().insert(X_BACKEND_STATUS, value);
    }
    response
}

#[cfg(test)]
mod tests {
    use super::*;

    fn backend_status(resp: &Response) -> Option<&str> {
        resp.headers()
            .get(X_BACKEND_STATUS)
            .and_then(|v| v.to_str().ok())
    }

    #[test]
    fn test_unauthorized_backend_maps_to_400() {
        let err = BackendError::Unauthorized {
            status: 404,
            message: "token expired".into(),
        };
        let resp = prepare_error_response("getTickets", &err);
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        assert_eq!(backend_status(&resp), Some("401"));
    }

    #[test]
    fn test_other_backend_status_is_echoed() {
        let err = BackendError::Status {
            status: 503,
            message: "maintenance".into(),
        };
        let resp = prepare_error_response("getTickets", &err);
        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(backend_status(&resp), Some("503"));
    }

    #[test]
    fn test_unknown_backend_error_is_labelled() {
        let err = BackendError::Unknown {
            message: "connection reset".into(),
        };
        let resp = prepare_error_response("getTickets", &err);
        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(backend_status(&resp), Some("unknown"));
    }

    #[test]
    fn test_missing_header_message() {
        let err = AppError::MissingHeader("x-connector-base-url");
        assert_eq!(err.to_string(), "The x-connector-base-url is required");
        let resp = err.into_response();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn test_auth_failure_is_401() {
        let resp = AppError::Unauthorized("invalid token".into()).into_response();
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
        assert!(backend_status(&resp).is_none());
    }
}
