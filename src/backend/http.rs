/// HTTP client wrapper for calls to a connector's backend.
/// Holds the backend base URL and forwarded credentials for one request.
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::{Method, RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

use super::BackendError;
use crate::errors::AppError;

/// Decides whether a failed response means "credentials rejected".
/// Receives the status and the extracted error message.
pub type UnauthorizedRule = fn(StatusCode, &str) -> bool;

pub fn unauthorized_on_401(status: StatusCode, _message: &str) -> bool {
    status == StatusCode::UNAUTHORIZED
}

#[derive(Clone)]
pub struct BackendHttp {
    client: reqwest::Client,
    base_url: String,
    headers: HeaderMap,
    is_unauthorized: UnauthorizedRule,
}

impl BackendHttp {
    pub fn new(client: reqwest::Client, base_url: &str) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            headers: HeaderMap::new(),
            is_unauthorized: unauthorized_on_401,
        }
    }

    /// Attach a header to every call. Values come from the hub, so an
    /// unencodable one is the caller's fault.
    pub fn with_header(mut self, name: &'static str, value: &str) -> Result<Self, AppError> {
        let value = HeaderValue::from_str(value)
            .map_err(|_| AppError::BadRequest(format!("invalid value for {}", name)))?;
        self.headers.insert(HeaderName::from_static(name), value);
        Ok(self)
    }

    pub fn with_unauthorized_rule(mut self, rule: UnauthorizedRule) -> Self {
        self.is_unauthorized = rule;
        self
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    pub async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<T, BackendError> {
        let req = self.client.get(self.url(path)).query(query);
        self.execute(Method::GET, path, req).await
    }

    pub async fn send_json<B: Serialize + ?Sized, T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        body: &B,
    ) -> Result<T, BackendError> {
        let req = self.client.request(method.clone(), self.url(path)).json(body);
        self.execute(method, path, req).await
    }

    /// Issue a request whose response body is not needed.
    pub async fn send_empty<B: Serialize + ?Sized>(
        &self,
        method: Method,
        path: &str,
        body: &B,
    ) -> Result<(), BackendError> {
        self.send_json::<B, Value>(method, path, body).await.map(|_| ())
    }

    async fn execute<T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        req: RequestBuilder,
    ) -> Result<T, BackendError> {
        tracing::debug!(method = %method, path = %path, "backend call");

        let resp = req
            .headers(self.headers.clone())
            .send()
            .await
            .map_err(|e| {
                tracing::warn!(method = %method, path = %path, "backend unreachable: {}", e);
                BackendError::Unknown {
                    message: e.to_string(),
                }
            })?;

        let status = resp.status();
        let body = resp.text().await.map_err(|e| BackendError::Unknown {
            message: e.to_string(),
        })?;

        if !status.is_success() {
            let err = self.normalize(status, &body);
            tracing::warn!(
                method = %method,
                path = %path,
                status = status.as_u16(),
                "backend call failed"
            );
            return Err(err);
        }

        // 204 and friends: treat as JSON null.
        let text = if body.trim().is_empty() { "null" } else { body.as_str() };
        serde_json::from_str(text).map_err(|e| BackendError::Unknown {
            message: format!("unreadable backend response: {}", e),
        })
    }

    fn normalize(&self, status: StatusCode, body: &str) -> BackendError {
        let message = extract_message(body)
            .unwrap_or_else(|| status.canonical_reason().unwrap_or("backend error").to_string());
        if (self.is_unauthorized)(status, &message) {
            BackendError::Unauthorized {
                status: status.as_u16(),
                message,
            }
        } else {
            BackendError::Status {
                status: status.as_u16(),
                message,
            }
        }
    }
}

/// Pull a human-readable message out of the error bodies the backends use.
fn extract_message(body: &str) -> Option<String> {
    let trimmed = body.trim();
    if trimmed.is_empty() {
        return None;
    }
    let Ok(json) = serde_json::from_str::<Value>(trimmed) else {
        return Some(trimmed.chars().take(200).collect());
    };

    let candidates = [
        json.get("message"),
        json.get("errorMessage"),
        json.get("error_description"),
        json.get("errorMessages").and_then(|v| v.get(0)),
        json.get("error").and_then(|v| v.get("message")),
        json.get("error"),
        json.get(0).and_then(|v| v.get("message")),
        json.get("description"),
    ];
    let found = candidates
        .into_iter()
        .flatten()
        .find_map(|v| v.as_str().map(String::from));
    found
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_message_shapes() {
        assert_eq!(extract_message(r#"{"message":"nope"}"#).as_deref(), Some("nope"));
        assert_eq!(
            extract_message(r#"{"errorMessages":["Issue does not exist"],"errors":{}}"#).as_deref(),
            Some("Issue does not exist")
        );
        assert_eq!(
            extract_message(r#"[{"message":"Session expired or invalid","errorCode":"INVALID_SESSION_ID"}]"#)
                .as_deref(),
            Some("Session expired or invalid")
        );
        assert_eq!(
            extract_message(r#"{"error":{"message":"Couldn't authenticate you"}}"#).as_deref(),
            Some("Couldn't authenticate you")
        );
        assert_eq!(extract_message(r#"{"error":"invalid_token"}"#).as_deref(), Some("invalid_token"));
        assert_eq!(extract_message("<html>502</html>").as_deref(), Some("<html>502</html>"));
        assert_eq!(extract_message("  "), None);
    }

    #[test]
    fn test_normalize_uses_rule() {
        fn jira_rule(status: StatusCode, message: &str) -> bool {
            status == StatusCode::UNAUTHORIZED
                || (status == StatusCode::NOT_FOUND && message.contains("permission"))
        }
        let http = BackendHttp::new(reqwest::Client::new(), "https://example.test/")
            .with_unauthorized_rule(jira_rule);

        let err = http.normalize(
            StatusCode::NOT_FOUND,
            r#"{"errorMessages":["Issue does not exist or you do not have permission to see it."]}"#,
        );
        assert!(err.is_unauthorized());

        let err = http.normalize(StatusCode::NOT_FOUND, r#"{"errorMessages":["gone"]}"#);
        assert_eq!(
            err,
            BackendError::Status {
                status: 404,
                message: "gone".into()
            }
        );
    }

    #[test]
    fn test_normalize_falls_back_to_reason_phrase() {
        let http = BackendHttp::new(reqwest::Client::new(), "https://example.test");
        let err = http.normalize(StatusCode::BAD_GATEWAY, "");
        assert_eq!(err.message(), "Bad Gateway");
        assert_eq!(err.status_label(), "502");
    }

    #[test]
    fn test_invalid_header_value_is_bad_request() {
        let result = BackendHttp::new(reqwest::Client::new(), "https://example.test")
            .with_header("authorization", "bad\nvalue");
        assert!(matches!(result, Err(AppError::BadRequest(_))));
    }

    #[test]
    fn test_base_url_is_trimmed() {
        let http = BackendHttp::new(reqwest::Client::new(), "https://example.test///");
        assert_eq!(http.url("/api/v2/tickets"), "https://example.test/api/v2/tickets");
    }
}
