//! Discovery documents advertised on `GET /`.
//!
//! The hub reaches connectors through a proxy, so the absolute base URL is
//! rebuilt from the `X-Forwarded-*` headers rather than the socket address.

use axum::http::header::HOST;
use axum::http::HeaderMap;
use serde_json::{json, Value};

use crate::connectors::{ConnectorKind, ObjectStyle};
use crate::settings::ConnectorSettings;

pub const IMAGE_PATH: &str = "/images/connector.svg";

fn first_header(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(String::from)
}

/// Absolute URL of this connector as seen by the hub.
pub fn base_url(headers: &HeaderMap) -> String {
    let proto = first_header(headers, "x-forwarded-proto").unwrap_or_else(|| "http".into());
    let host = first_header(headers, "x-forwarded-host")
        .or_else(|| first_header(headers, HOST.as_str()))
        .unwrap_or_else(|| "localhost".into());

    let port = match first_header(headers, "x-forwarded-port") {
        Some(port) if !host.contains(':') && !is_default_port(&proto, &port) => {
            format!(":{}", port)
        }
        _ => String::new(),
    };

    let prefix = first_header(headers, "x-forwarded-prefix").unwrap_or_default();
    let prefix = prefix.trim_end_matches('/');
    let prefix = if prefix.is_empty() || prefix.starts_with('/') {
        prefix.to_string()
    } else {
        format!("/{}", prefix)
    };

    format!("{}://{}{}{}", proto, host, port, prefix)
}

fn is_default_port(proto: &str, port: &str) -> bool {
    matches!((proto, port), ("http", "80") | ("https", "443"))
}

/// Discovery document for `kind`, with every href made absolute.
pub fn discovery_document(kind: ConnectorKind, base: &str, settings: &ConnectorSettings) -> Value {
    let image = settings
        .image_url
        .clone()
        .unwrap_or_else(|| format!("{}{}", base, IMAGE_PATH));

    let object_types = match kind.style() {
        ObjectStyle::Cards => json!({
            "card": {
                "pollable": true,
                "endpoint": { "href": format!("{}/cards/requests", base) },
                "doc": { "href": kind.doc_url() },
            }
        }),
        ObjectStyle::Bot => json!({
            "botDiscovery": {
                "endpoint": { "href": format!("{}/bot/discovery", base) },
                "doc": { "href": kind.doc_url() },
            }
        }),
    };

    json!({
        "name": kind.display_name(),
        "image": { "href": image },
        "object_types": object_types,
    })
}

/// Small generated icon so the advertised image always resolves.
pub fn icon_svg(kind: ConnectorKind) -> String {
    let initials: String = kind
        .display_name()
        .split_whitespace()
        .filter_map(|w| w.chars().next())
        .take(2)
        .collect();
    format!(
        r##"<svg xmlns="http://www.w3.org/2000/svg" width="64" height="64" viewBox="0 0 64 64"><circle cx="32" cy="32" r="32" fill="{}"/><text x="32" y="40" font-family="sans-serif" font-size="22" text-anchor="middle" fill="#ffffff">{}</text></svg>"##,
        kind.brand_color(),
        initials
    )
}
