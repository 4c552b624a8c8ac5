use std::path::PathBuf;
use std::time::Duration;

use anyhow::Context;

use crate::backend::credentials::DEFAULT_CREDENTIAL_TTL;
use crate::middleware::jwt::{DEFAULT_KEY_TTL, DEFAULT_LEEWAY_SECS};

pub const DEFAULT_PORT: u16 = 3000;

#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    /// Where the hub publishes its JWT signing key (PEM).
    pub jwt_pub_key_uri: String,
    /// Expected `aud` claim. Not checked when unset.
    pub jwt_audience: Option<String>,
    /// Clock skew tolerated on `exp`/`nbf`.
    pub jwt_leeway: Duration,
    pub pub_key_cache_ttl: Duration,
    pub credential_ttl: Duration,
    /// Optional JSON settings file, watched for changes.
    pub settings_path: Option<PathBuf>,
}

impl Config {
    /// Configuration for tests and tooling that only need the key URL.
    pub fn with_key_uri(jwt_pub_key_uri: impl Into<String>) -> Self {
        Self {
            port: DEFAULT_PORT,
            jwt_pub_key_uri: jwt_pub_key_uri.into(),
            jwt_audience: None,
            jwt_leeway: Duration::from_secs(DEFAULT_LEEWAY_SECS),
            pub_key_cache_ttl: DEFAULT_KEY_TTL,
            credential_ttl: DEFAULT_CREDENTIAL_TTL,
            settings_path: None,
        }
    }
}

pub fn load() -> anyhow::Result<Config> {
    dotenvy::dotenv().ok();
    from_lookup(|key| std::env::var(key).ok())
}

/// Build the configuration from an arbitrary variable source.
pub fn from_lookup(get: impl Fn(&str) -> Option<String>) -> anyhow::Result<Config> {
    let non_empty = |key: &str| get(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

    let jwt_pub_key_uri = non_empty("MF_JWT_PUB_KEY_URI")
        .context("MF_JWT_PUB_KEY_URI is required (URL of the Mobile Flows public key)")?;
    url::Url::parse(&jwt_pub_key_uri)
        .with_context(|| format!("MF_JWT_PUB_KEY_URI is not a valid URL: {}", jwt_pub_key_uri))?;

    let port = match non_empty("CONNECTOR_PORT").or_else(|| non_empty("PORT")) {
        Some(raw) => raw
            .parse()
            .with_context(|| format!("invalid port: {}", raw))?,
        None => DEFAULT_PORT,
    };

    let secs = |key: &str, default: Duration| -> anyhow::Result<Duration> {
        match non_empty(key) {
            Some(raw) => raw
                .parse::<u64>()
                .map(Duration::from_secs)
                .with_context(|| format!("{} must be a number of seconds", key)),
            None => Ok(default),
        }
    };

    Ok(Config {
        port,
        jwt_pub_key_uri,
        jwt_audience: non_empty("MF_JWT_AUDIENCE"),
        jwt_leeway: secs("JWT_LEEWAY_SECS", Duration::from_secs(DEFAULT_LEEWAY_SECS))?,
        pub_key_cache_ttl: secs("PUB_KEY_CACHE_TTL_SECS", DEFAULT_KEY_TTL)?,
        credential_ttl: secs("BACKEND_CREDENTIAL_TTL_SECS", DEFAULT_CREDENTIAL_TTL)?,
        settings_path: non_empty("CONNECTOR_SETTINGS_PATH").map(PathBuf::from),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_key_uri_is_required() {
        let err = from_lookup(lookup(&[])).unwrap_err();
        assert!(err.to_string().contains("MF_JWT_PUB_KEY_URI"));

        let err = from_lookup(lookup(&[("MF_JWT_PUB_KEY_URI", "  ")])).unwrap_err();
        assert!(err.to_string().contains("MF_JWT_PUB_KEY_URI"));
    }

    #[test]
    fn test_defaults() {
        let cfg = from_lookup(lookup(&[(
            "MF_JWT_PUB_KEY_URI",
            "https://prod.hero.vmwservices.com/security/public-key",
        )]))
        .unwrap();
        assert_eq!(cfg.port, DEFAULT_PORT);
        assert_eq!(cfg.pub_key_cache_ttl, Duration::from_secs(3600));
        assert_eq!(cfg.credential_ttl, Duration::from_secs(86400));
        assert!(cfg.jwt_audience.is_none());
        assert_eq!(cfg.jwt_leeway, Duration::from_secs(60));
        assert!(cfg.settings_path.is_none());
    }

    #[test]
    fn test_overrides() {
        let cfg = from_lookup(lookup(&[
            ("MF_JWT_PUB_KEY_URI", "http://localhost:9000/key"),
            ("PORT", "8080"),
            ("PUB_KEY_CACHE_TTL_SECS", "60"),
            ("MF_JWT_AUDIENCE", "https://hub/connectors/jira"),
            ("CONNECTOR_SETTINGS_PATH", "/etc/connector.json"),
        ]))
        .unwrap();
        assert_eq!(cfg.port, 8080);
        assert_eq!(cfg.pub_key_cache_ttl, Duration::from_secs(60));
        assert_eq!(cfg.jwt_audience.as_deref(), Some("https://hub/connectors/jira"));
        assert_eq!(cfg.settings_path, Some(PathBuf::from("/etc/connector.json")));
    }

    #[test]
    fn test_invalid_values_are_rejected() {
        assert!(from_lookup(lookup(&[("MF_JWT_PUB_KEY_URI", "not a url")])).is_err());
        assert!(from_lookup(lookup(&[
            ("MF_JWT_PUB_KEY_URI", "http://localhost/key"),
            ("PORT", "http"),
        ]))
        .is_err());
        assert!(from_lookup(lookup(&[
            ("MF_JWT_PUB_KEY_URI", "http://localhost/key"),
            ("PUB_KEY_CACHE_TTL_SECS", "-1"),
        ]))
        .is_err());
    }
}
