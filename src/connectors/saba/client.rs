//! Saba Cloud REST client.
//!
//! Saba does not take the forwarded credentials directly: the connector logs
//! in with `username:password` once per tenant and sends the returned
//! certificate on every call. The certificate is cached in
//! [`CredentialCache`] and dropped as soon as Saba rejects it.

use reqwest::StatusCode;
use serde::Deserialize;
use serde_json::Value;
use urlencoding::encode;

use crate::app::AppState;
use crate::backend::{BackendError, BackendHttp, CredentialCache};
use crate::context::ConnectorContext;
use crate::errors::AppError;
use crate::shape::text_at;

const CERTIFICATE_HEADER: &str = "sabacertificate";

/// Saba answers 401 for a bad login and for a stale certificate, but some
/// endpoints report an invalid certificate with a 400/500 and a message.
fn is_unauthorized(status: StatusCode, message: &str) -> bool {
    status == StatusCode::UNAUTHORIZED || message.to_ascii_lowercase().contains("certificate")
}

/// Split the forwarded `username:password` credential.
pub fn parse_credentials(raw: &str) -> Result<(&str, &str), AppError> {
    match raw.split_once(':') {
        Some((user, password)) if !user.is_empty() && !password.is_empty() => Ok((user, password)),
        _ => Err(AppError::BadRequest(
            "x-connector-authorization must be username:password".into(),
        )),
    }
}

#[derive(Debug, Deserialize)]
struct Login {
    certificate: String,
}

#[derive(Debug, Deserialize)]
struct Results {
    #[serde(default)]
    results: Vec<Value>,
}

pub struct SabaClient<'a> {
    http: BackendHttp,
    tenant: String,
    credentials: &'a CredentialCache,
}

impl<'a> SabaClient<'a> {
    /// Client authenticated for the caller's tenant, logging in only when no
    /// certificate is cached.
    pub async fn connect(state: &'a AppState, ctx: &ConnectorContext) -> Result<Self, AppError> {
        let tenant = ctx.tenant()?.to_string();

        let certificate = match state.credentials.get(&tenant) {
            Some(certificate) => certificate,
            None => {
                let (user, password) = parse_credentials(ctx.authorization()?)?;
                let login: Login = BackendHttp::new(state.http.clone(), &ctx.base_url)
                    .with_header("user", user)?
                    .with_header("password", password)?
                    .with_unauthorized_rule(is_unauthorized)
                    .get_json("/v1/login", &[])
                    .await
                    .map_err(AppError::backend("login"))?;
                tracing::info!(tenant = %tenant, "obtained saba certificate");
                state.credentials.store(&tenant, login.certificate.clone());
                login.certificate
            }
        };

        let http = BackendHttp::new(state.http.clone(), &ctx.base_url)
            .with_header(CERTIFICATE_HEADER, &certificate)?
            .with_unauthorized_rule(is_unauthorized);

        Ok(Self {
            http,
            tenant,
            credentials: &state.credentials,
        })
    }

    /// Drop the cached certificate when Saba rejected it.
    fn check<T>(&self, result: Result<T, BackendError>) -> Result<T, BackendError> {
        if let Err(e) = &result {
            if e.is_unauthorized() {
                self.credentials.invalidate(&self.tenant);
            }
        }
        result
    }

    pub async fn person_id(&self, username: &str) -> Result<Option<String>, BackendError> {
        let found = self.check(
            self.http
                .get_json::<Value>(&format!("/v1/people/username={}", encode(username)), &[])
                .await,
        );
        match found {
            Ok(person) => Ok(text_at(&person, "/id")),
            Err(BackendError::Status { status: 404, .. }) => Ok(None),
            Err(e) => Err(e),
        }
    }

    pub async fn enrollments(
        &self,
        person_id: &str,
        count: u32,
    ) -> Result<Vec<Value>, BackendError> {
        let found: Results = self.check(
            self.http
                .get_json(
                    "/v1/learning/enrollments/search",
                    &[
                        ("type", "user".to_string()),
                        ("personId", person_id.to_string()),
                        ("count", count.to_string()),
                    ],
                )
                .await,
        )?;
        Ok(found.results)
    }

    /// Courses created on or after `since` (`YYYY-MM-DD`).
    pub async fn courses_since(&self, since: &str, count: u32) -> Result<Vec<Value>, BackendError> {
        let found: Results = self.check(
            self.http
                .get_json(
                    "/v1/course",
                    &[
                        ("q", format!("(createdOn=ge={})", since)),
                        ("count", count.to_string()),
                    ],
                )
                .await,
        )?;
        Ok(found.results)
    }
}
