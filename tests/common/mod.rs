//! Shared harness: a fake hub key endpoint, token minting and in-process
//! requests against the router.

#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::http::{header, Request, Response};
use axum::Router;
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use serde_json::{json, Value};
use tower::ServiceExt;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use connectors::app::{build_router, AppState};
use connectors::config::Config;
use connectors::connectors::ConnectorKind;
use connectors::settings::{ConnectorSettings, SettingsHandle};

pub const KEY_PATH: &str = "/security/public-key";

pub const SIGNING_PRIVATE: &str = include_str!("../fixtures/signing-private.pem");
pub const SIGNING_PUBLIC: &str = include_str!("../fixtures/signing-public.pem");
pub const OTHER_PRIVATE: &str = include_str!("../fixtures/other-private.pem");
pub const RSA_PRIVATE: &str = include_str!("../fixtures/rsa-private.pem");
pub const RSA_PUBLIC: &str = include_str!("../fixtures/rsa-public.pem");

/// Key server that publishes `pem`, expecting `fetches` downloads if given.
pub async fn key_server(pem: &str, fetches: Option<u64>) -> MockServer {
    let server = MockServer::start().await;
    let mock = Mock::given(method("GET"))
        .and(path(KEY_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_string(pem));
    match fetches {
        Some(n) => mock.expect(n).mount(&server).await,
        None => mock.mount(&server).await,
    }
    server
}

pub fn key_uri(server: &MockServer) -> String {
    format!("{}{}", server.uri(), KEY_PATH)
}

pub fn now() -> i64 {
    chrono::Utc::now().timestamp()
}

pub fn default_claims() -> Value {
    json!({
        "sub": "jdoe",
        "prn": "jdoe@acme",
        "tenant": "acme",
        "email": "jdoe@acme.com",
        "domain": "acme.com",
        "iss": "https://hub.example.test",
        "exp": now() + 3600,
    })
}

pub fn sign(claims: &Value, alg: Algorithm, private_pem: &str) -> String {
    let key = match alg {
        Algorithm::RS256 | Algorithm::RS384 | Algorithm::RS512 => {
            EncodingKey::from_rsa_pem(private_pem.as_bytes()).unwrap()
        }
        _ => EncodingKey::from_ec_pem(private_pem.as_bytes()).unwrap(),
    };
    encode(&Header::new(alg), claims, &key).unwrap()
}

/// A valid ES256 token for the default user.
pub fn token() -> String {
    sign(&default_claims(), Algorithm::ES256, SIGNING_PRIVATE)
}

pub fn state_with(config: Config, kind: ConnectorKind, settings: ConnectorSettings) -> Arc<AppState> {
    Arc::new(AppState::new(config, kind, SettingsHandle::fixed(settings)).unwrap())
}

pub fn app(kind: ConnectorKind, key_uri: &str) -> Router {
    build_router(state_with(
        Config::with_key_uri(key_uri),
        kind,
        ConnectorSettings::default(),
    ))
}

pub fn app_with_key_ttl(kind: ConnectorKind, key_uri: &str, ttl: Duration) -> Router {
    let mut config = Config::with_key_uri(key_uri);
    config.pub_key_cache_ttl = ttl;
    build_router(state_with(config, kind, ConnectorSettings::default()))
}

/// Authenticated POST with hub headers; `form` is sent urlencoded.
pub fn post(uri: &str, token: &str, base_url: Option<&str>, form: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::AUTHORIZATION, format!("Bearer {}", token))
        .header("x-connector-authorization", "Bearer backend-token")
        .header("x-routing-prefix", "https://hub.example.test/conn/card/");
    if let Some(base) = base_url {
        builder = builder.header("x-connector-base-url", base);
    }
    match form {
        Some(form) => builder
            .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
            .body(Body::from(form.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    }
}

pub async fn send(app: &Router, req: Request<Body>) -> Response<Body> {
    app.clone().oneshot(req).await.unwrap()
}

pub async fn read_json(resp: Response<Body>) -> Value {
    let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

pub fn backend_status(resp: &Response<Body>) -> Option<String> {
    resp.headers()
        .get("x-backend-status")
        .and_then(|v| v.to_str().ok())
        .map(String::from)
}
