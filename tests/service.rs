//! Public endpoints, request ids and configuration loading.

mod common;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use serde_json::json;

use common::*;
use connectors::config;
use connectors::connectors::ConnectorKind;

#[tokio::test]
async fn test_card_discovery_uses_forwarded_headers() {
    let keys = key_server(SIGNING_PUBLIC, Some(0)).await;
    let app = app(ConnectorKind::Jira, &key_uri(&keys));

    let req = Request::builder()
        .uri("/")
        .header("x-forwarded-proto", "https")
        .header("x-forwarded-host", "connectors.example.test")
        .header("x-forwarded-port", "443")
        .header("x-forwarded-prefix", "/jira")
        .body(Body::empty())
        .unwrap();
    let resp = send(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);

    let doc = read_json(resp).await;
    assert_eq!(doc["name"], "Jira Service Desk");
    assert_eq!(
        doc["object_types"]["card"]["endpoint"]["href"],
        "https://connectors.example.test/jira/cards/requests"
    );
    assert_eq!(
        doc["image"]["href"],
        "https://connectors.example.test/jira/images/connector.svg"
    );
}

#[tokio::test]
async fn test_bot_discovery_document() {
    let keys = key_server(SIGNING_PUBLIC, Some(0)).await;
    let app = app(ConnectorKind::Saba, &key_uri(&keys));

    let req = Request::builder()
        .uri("/")
        .header("host", "localhost:3000")
        .body(Body::empty())
        .unwrap();
    let doc = read_json(send(&app, req).await).await;
    assert_eq!(
        doc["object_types"]["botDiscovery"]["endpoint"]["href"],
        "http://localhost:3000/bot/discovery"
    );
    assert!(doc["object_types"].get("card").is_none());
}

#[tokio::test]
async fn test_icon_is_svg() {
    let keys = key_server(SIGNING_PUBLIC, Some(0)).await;
    let app = app(ConnectorKind::Hubspot, &key_uri(&keys));

    let req = Request::builder()
        .uri("/images/connector.svg")
        .body(Body::empty())
        .unwrap();
    let resp = send(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(resp.headers()["content-type"], "image/svg+xml");
}

#[tokio::test]
async fn test_request_id_is_echoed_or_minted() {
    let keys = key_server(SIGNING_PUBLIC, Some(0)).await;
    let app = app(ConnectorKind::Zendesk, &key_uri(&keys));

    let req = Request::builder()
        .uri("/health")
        .header("x-request-id", "req-123")
        .body(Body::empty())
        .unwrap();
    let resp = send(&app, req).await;
    assert_eq!(resp.headers()["x-request-id"], "req-123");

    let req = Request::builder().uri("/health").body(Body::empty()).unwrap();
    let resp = send(&app, req).await;
    let minted = resp.headers()["x-request-id"].to_str().unwrap();
    assert_eq!(minted.len(), 36);
}

#[tokio::test]
async fn test_unknown_route_is_404() {
    let keys = key_server(SIGNING_PUBLIC, Some(0)).await;
    let app = app(ConnectorKind::Zendesk, &key_uri(&keys));

    let resp = send(&app, post("/bot/actions/top-picks", &token(), Some("http://x"), None)).await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

#[test]
fn test_missing_key_uri_fails_configuration() {
    let err = config::from_lookup(|_| None).unwrap_err();
    assert!(err.to_string().contains("MF_JWT_PUB_KEY_URI"));
}

#[test]
fn test_configuration_from_variables() {
    let vars = json!({
        "MF_JWT_PUB_KEY_URI": "https://hub.example.test/key.pub",
        "CONNECTOR_PORT": "8080",
        "PUB_KEY_CACHE_TTL_SECS": "60"
    });
    let cfg = config::from_lookup(|k| vars.get(k).and_then(|v| v.as_str()).map(String::from)).unwrap();
    assert_eq!(cfg.port, 8080);
    assert_eq!(cfg.pub_key_cache_ttl.as_secs(), 60);
    assert!(cfg.jwt_audience.is_none());
}
