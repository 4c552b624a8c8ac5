//! Per-request connector context built from hub headers and JWT claims.

use axum::async_trait;
use axum::extract::{FromRequest, FromRequestParts};
use axum::http::request::Parts;
use axum::http::HeaderMap;

use crate::errors::AppError;
use crate::middleware::request_id::{RequestId, X_REQUEST_ID};
use crate::models::claims::ConnectorClaims;

pub const X_CONNECTOR_BASE_URL: &str = "x-connector-base-url";
pub const X_CONNECTOR_AUTHORIZATION: &str = "x-connector-authorization";
pub const X_ROUTING_PREFIX: &str = "x-routing-prefix";
pub const X_ROUTING_TEMPLATE: &str = "x-routing-template";

/// Placeholder the hub puts in `X-Routing-Template`.
const OBJECT_TYPE_PLACEHOLDER: &str = "INSERT_OBJECT_TYPE";

/// Where the hub wants action links to point. Both headers are optional.
#[derive(Debug, Clone, Default)]
pub struct Routing {
    pub prefix: Option<String>,
    pub template: Option<String>,
}

impl Routing {
    pub fn from_headers(headers: &HeaderMap) -> Self {
        Self {
            prefix: header(headers, X_ROUTING_PREFIX),
            template: header(headers, X_ROUTING_TEMPLATE),
        }
    }

    /// Absolute URL the hub should call for a connector path.
    ///
    /// Prefers the routing template (with the object type filled in), then
    /// the routing prefix; without either the path is returned unchanged.
    pub fn action_url(&self, object_type: &str, path: &str) -> String {
        let path = path.trim_start_matches('/');
        if let Some(template) = &self.template {
            let base = template.replace(OBJECT_TYPE_PLACEHOLDER, object_type);
            return format!("{}/{}", base.trim_end_matches('/'), path);
        }
        if let Some(prefix) = &self.prefix {
            return format!("{}/{}", prefix.trim_end_matches('/'), path);
        }
        format!("/{}", path)
    }
}

#[async_trait]
impl<S: Send + Sync> FromRequestParts<S> for Routing {
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(Self::from_headers(&parts.headers))
    }
}

#[derive(Debug, Clone)]
pub struct ConnectorContext {
    pub base_url: String,
    authorization: Option<String>,
    pub routing: Routing,
    pub request_id: Option<String>,
    pub claims: ConnectorClaims,
}

impl ConnectorContext {
    pub fn from_headers(headers: &HeaderMap, claims: ConnectorClaims) -> Result<Self, AppError> {
        let base_url = header(headers, X_CONNECTOR_BASE_URL)
            .ok_or(AppError::MissingHeader(X_CONNECTOR_BASE_URL))?
            .trim_end_matches('/')
            .to_string();

        Ok(Self {
            base_url,
            authorization: header(headers, X_CONNECTOR_AUTHORIZATION),
            routing: Routing::from_headers(headers),
            request_id: header(headers, X_REQUEST_ID),
            claims,
        })
    }

    /// Backend credentials forwarded by the hub.
    pub fn authorization(&self) -> Result<&str, AppError> {
        self.authorization
            .as_deref()
            .ok_or(AppError::MissingHeader(X_CONNECTOR_AUTHORIZATION))
    }

    pub fn email(&self) -> Result<&str, AppError> {
        self.claims
            .email
            .as_deref()
            .ok_or_else(|| AppError::BadRequest("The token has no email claim".into()))
    }

    pub fn username(&self) -> Result<&str, AppError> {
        self.claims
            .username()
            .ok_or_else(|| AppError::BadRequest("The token has no username claim".into()))
    }

    pub fn tenant(&self) -> Result<&str, AppError> {
        self.claims
            .tenant_id()
            .ok_or_else(|| AppError::BadRequest("The token has no tenant claim".into()))
    }

    pub fn action_url(&self, object_type: &str, path: &str) -> String {
        self.routing.action_url(object_type, path)
    }
}

#[async_trait]
impl<S: Send + Sync> FromRequestParts<S> for ConnectorContext {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let claims = parts
            .extensions
            .get::<ConnectorClaims>()
            .cloned()
            .ok_or_else(|| AppError::Unauthorized("missing validated token".into()))?;
        let mut ctx = Self::from_headers(&parts.headers, claims)?;
        if ctx.request_id.is_none() {
            ctx.request_id = parts.extensions.get::<RequestId>().map(|r| r.0.clone());
        }
        Ok(ctx)
    }
}

/// Urlencoded action body. Unparseable or incomplete forms are answered
/// with a JSON 400 instead of axum's plain-text rejection.
#[derive(Debug, FromRequest)]
#[from_request(via(axum::Form), rejection(AppError))]
pub struct ActionForm<T>(pub T);

fn header(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(String::from)
}
