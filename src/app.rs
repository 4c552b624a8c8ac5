use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use axum::{
    extract::State,
    http::{header::CONTENT_TYPE, HeaderMap},
    middleware,
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use serde_json::{json, Value};
use tower_http::trace::TraceLayer;

use crate::backend::CredentialCache;
use crate::config::Config;
use crate::connectors::ConnectorKind;
use crate::discovery;
use crate::middleware::auth::require_jwt;
use crate::middleware::jwt::{JwtValidator, PublicKeyCache};
use crate::middleware::request_id::request_id_middleware;
use crate::settings::SettingsHandle;

/// Shared application state passed to handlers and middleware.
pub struct AppState {
    pub config: Config,
    pub kind: ConnectorKind,
    pub validator: JwtValidator,
    pub settings: SettingsHandle,
    /// Client for all outbound calls (backends and the key endpoint).
    pub http: reqwest::Client,
    /// Backend session credentials keyed by tenant.
    pub credentials: CredentialCache,
}

impl AppState {
    pub fn new(
        config: Config,
        kind: ConnectorKind,
        settings: SettingsHandle,
    ) -> anyhow::Result<Self> {
        let http = outbound_client()?;
        let keys = Arc::new(PublicKeyCache::new(http.clone(), config.pub_key_cache_ttl));
        let validator = JwtValidator::new(config.jwt_pub_key_uri.clone(), keys)
            .with_audience(config.jwt_audience.clone())
            .with_leeway(config.jwt_leeway.as_secs());
        let credentials = CredentialCache::new(config.credential_ttl);

        Ok(Self {
            config,
            kind,
            validator,
            settings,
            http,
            credentials,
        })
    }
}

pub fn outbound_client() -> anyhow::Result<reqwest::Client> {
    reqwest::Client::builder()
        .use_rustls_tls()
        .pool_max_idle_per_host(16)
        .connect_timeout(Duration::from_secs(5))
        .timeout(Duration::from_secs(30))
        .user_agent(concat!("mobile-flows-connectors/", env!("CARGO_PKG_VERSION")))
        .build()
        .context("failed to build HTTP client")
}

/// Full router for the connector in `state.kind`.
///
/// `/health`, discovery and the icon are public; everything the connector
/// module contributes sits behind JWT validation.
pub fn build_router(state: Arc<AppState>) -> Router {
    let protected = state
        .kind
        .router()
        .route_layer(middleware::from_fn_with_state(state.clone(), require_jwt));

    Router::new()
        .route("/health", get(health))
        .route("/", get(discovery_handler))
        .route(discovery::IMAGE_PATH, get(icon))
        .merge(protected)
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(middleware::from_fn(request_id_middleware))
}

async fn health() -> Json<Value> {
    Json(json!({ "status": "UP" }))
}

async fn discovery_handler(State(state): State<Arc<AppState>>, headers: HeaderMap) -> Json<Value> {
    let base = discovery::base_url(&headers);
    let settings = state.settings.current();
    Json(discovery::discovery_document(state.kind, &base, &settings))
}

async fn icon(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    ([(CONTENT_TYPE, "image/svg+xml")], discovery::icon_svg(state.kind))
}
