//! Hub JWT validation.
//!
//! The hub signs its bearer tokens with a key pair whose public half is
//! published as PEM text at `MF_JWT_PUB_KEY_URI`. Workflow:
//! 1. Read the `alg` from the token header and reject anything that is not
//!    RSA or ECDSA
//! 2. Look the PEM up in the public-key cache, fetching it on miss/expiry
//! 3. Verify signature and expiry (60 s leeway), optionally the audience
//! 4. Return the decoded [`ConnectorClaims`]
//!
//! Keys are cached per URL with a 1-hour TTL by default. Concurrent misses
//! may fetch the key more than once; the fetch is an idempotent read.

use std::sync::Arc;
use std::time::Duration;

use jsonwebtoken::{decode, decode_header, Algorithm, DecodingKey, Validation};
use thiserror::Error;

use crate::cache::TtlCache;
use crate::models::claims::ConnectorClaims;

pub const DEFAULT_KEY_TTL: Duration = Duration::from_secs(3600);
pub const DEFAULT_LEEWAY_SECS: u64 = 60;

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("missing authorization header")]
    MissingToken,

    #[error("authorization header is not a bearer token")]
    MalformedHeader,

    #[error("unsupported signing algorithm {0:?}")]
    UnsupportedAlgorithm(Algorithm),

    #[error("failed to fetch public key: {0}")]
    KeyFetch(String),

    #[error("invalid public key: {0}")]
    InvalidKey(jsonwebtoken::errors::Error),

    #[error("invalid token: {0}")]
    InvalidToken(#[from] jsonwebtoken::errors::Error),
}

// ── Public key cache ────────────────────────────────────────

/// PEM public keys keyed by the URL they were fetched from.
#[derive(Clone)]
pub struct PublicKeyCache {
    client: reqwest::Client,
    keys: TtlCache<String>,
}

impl PublicKeyCache {
    pub fn new(client: reqwest::Client, ttl: Duration) -> Self {
        Self {
            client,
            keys: TtlCache::new(ttl),
        }
    }

    /// Return the PEM published at `url`, from cache while it is fresh.
    pub async fn get(&self, url: &str) -> Result<String, AuthError> {
        if let Some(pem) = self.keys.get(url) {
            return Ok(pem);
        }

        tracing::info!(url = %url, "fetching hub public key");
        let resp = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| AuthError::KeyFetch(e.to_string()))?;

        let status = resp.status();
        if !status.is_success() {
            tracing::warn!(url = %url, status = status.as_u16(), "public key fetch failed");
            return Err(AuthError::KeyFetch(format!("key endpoint returned {}", status)));
        }

        let pem = resp
            .text()
            .await
            .map_err(|e| AuthError::KeyFetch(e.to_string()))?;

        // Never cache a body that is not a usable key (e.g. an HTML error page).
        let bytes = pem.as_bytes();
        if DecodingKey::from_ec_pem(bytes).is_err() && DecodingKey::from_rsa_pem(bytes).is_err() {
            tracing::warn!(url = %url, "key endpoint did not return a PEM public key");
            return Err(AuthError::KeyFetch("key endpoint returned no PEM public key".into()));
        }

        self.keys.insert(url, pem.clone());
        Ok(pem)
    }

    pub fn invalidate(&self, url: &str) {
        self.keys.invalidate(url);
    }
}

// ── Validator ───────────────────────────────────────────────

#[derive(Clone)]
pub struct JwtValidator {
    key_url: String,
    cache: Arc<PublicKeyCache>,
    audience: Option<String>,
    leeway: u64,
}

impl JwtValidator {
    pub fn new(key_url: impl Into<String>, cache: Arc<PublicKeyCache>) -> Self {
        Self {
            key_url: key_url.into(),
            cache,
            audience: None,
            leeway: DEFAULT_LEEWAY_SECS,
        }
    }

    pub fn with_audience(mut self, audience: Option<String>) -> Self {
        self.audience = audience;
        self
    }

    pub fn with_leeway(mut self, leeway_secs: u64) -> Self {
        self.leeway = leeway_secs;
        self
    }

    /// Verify `token` and return its claims.
    pub async fn validate(&self, token: &str) -> Result<ConnectorClaims, AuthError> {
        let header = decode_header(token)?;
        let alg = header.alg;

        let pem = self.cache.get(&self.key_url).await?;
        let key = match decoding_key(alg, pem.as_bytes()) {
            Err(AuthError::InvalidKey(e)) => {
                // Key type does not match the token; the hub may have rotated.
                self.cache.invalidate(&self.key_url);
                return Err(AuthError::InvalidKey(e));
            }
            other => other?,
        };

        let mut validation = Validation::new(alg);
        validation.leeway = self.leeway;
        validation.set_required_spec_claims(&["exp"]);
        match &self.audience {
            Some(aud) => validation.set_audience(&[aud]),
            None => validation.validate_aud = false,
        }

        let data = decode::<ConnectorClaims>(token, &key, &validation)?;
        Ok(data.claims)
    }
}

/// Extract the token from an `Authorization: Bearer <jwt>` header value.
pub fn bearer_token(header: Option<&str>) -> Result<&str, AuthError> {
    let value = header.ok_or(AuthError::MissingToken)?;
    let (scheme, token) = value
        .trim()
        .split_once(' ')
        .ok_or(AuthError::MalformedHeader)?;
    if !scheme.eq_ignore_ascii_case("bearer") {
        return Err(AuthError::MalformedHeader);
    }
    let token = token.trim();
    if token.is_empty() {
        return Err(AuthError::MalformedHeader);
    }
    Ok(token)
}

fn decoding_key(alg: Algorithm, pem: &[u8]) -> Result<DecodingKey, AuthError> {
    match alg {
        Algorithm::RS256 | Algorithm::RS384 | Algorithm::RS512 => {
            DecodingKey::from_rsa_pem(pem).map_err(AuthError::InvalidKey)
        }
        Algorithm::ES256 | Algorithm::ES384 => {
            DecodingKey::from_ec_pem(pem).map_err(AuthError::InvalidKey)
        }
        other => Err(AuthError::UnsupportedAlgorithm(other)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bearer_token_extraction() {
        assert_eq!(bearer_token(Some("Bearer abc.def.ghi")).unwrap(), "abc.def.ghi");
        assert_eq!(bearer_token(Some("bearer   abc ")).unwrap(), "abc");
        assert!(matches!(bearer_token(None), Err(AuthError::MissingToken)));
        assert!(matches!(
            bearer_token(Some("Basic dXNlcjpwYXNz")),
            Err(AuthError::MalformedHeader)
        ));
        assert!(matches!(bearer_token(Some("Bearer")), Err(AuthError::MalformedHeader)));
    }

    #[test]
    fn test_hmac_algorithms_rejected() {
        let result = decoding_key(Algorithm::HS256, b"secret");
        assert!(matches!(
            result,
            Err(AuthError::UnsupportedAlgorithm(Algorithm::HS256))
        ));
    }

    #[test]
    fn test_garbage_pem_is_invalid_key() {
        let result = decoding_key(Algorithm::ES256, b"not a pem");
        assert!(matches!(result, Err(AuthError::InvalidKey(_))));
    }

    #[tokio::test]
    async fn test_malformed_token_fails_before_key_fetch() {
        // Port 1 is never listening; a fetch attempt would surface as KeyFetch.
        let cache = Arc::new(PublicKeyCache::new(reqwest::Client::new(), DEFAULT_KEY_TTL));
        let validator = JwtValidator::new("http://127.0.0.1:1/key", cache);
        let result = validator.validate("not-a-jwt").await;
        assert!(matches!(result, Err(AuthError::InvalidToken(_))));
    }
}
