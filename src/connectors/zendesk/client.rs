use base64::Engine;
use reqwest::Method;
use serde::Deserialize;
use serde_json::{json, Value};
use urlencoding::encode;

use crate::app::AppState;
use crate::backend::{BackendError, BackendHttp};
use crate::context::ConnectorContext;
use crate::errors::AppError;

/// Statuses an agent may set from a card.
pub const STATUSES: [&str; 4] = ["open", "pending", "hold", "solved"];

/// Header value for the forwarded credential. A bare `email/token:key`
/// API-token credential is sent as HTTP Basic; anything carrying a scheme
/// (`Bearer ...`, `Basic ...`) is passed through.
pub fn authorization_value(raw: &str) -> String {
    if raw.contains(' ') {
        raw.to_string()
    } else {
        format!("Basic {}", base64::engine::general_purpose::STANDARD.encode(raw))
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct Ticket {
    pub id: u64,
    #[serde(default)]
    pub subject: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub priority: Option<String>,
    #[serde(default, rename = "type")]
    pub kind: Option<String>,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct SearchResults {
    #[serde(default)]
    results: Vec<Ticket>,
}

pub struct ZendeskClient {
    http: BackendHttp,
}

impl ZendeskClient {
    pub fn new(state: &AppState, ctx: &ConnectorContext) -> Result<Self, AppError> {
        let http = BackendHttp::new(state.http.clone(), &ctx.base_url)
            .with_header("authorization", &authorization_value(ctx.authorization()?))?;
        Ok(Self { http })
    }

    /// Unsolved tickets assigned to `email`, newest first.
    pub async fn assigned_tickets(
        &self,
        email: &str,
        limit: u32,
    ) -> Result<Vec<Ticket>, BackendError> {
        let found: SearchResults = self
            .http
            .get_json(
                "/api/v2/search.json",
                &[
                    ("query", format!("type:ticket status<solved assignee:{}", email)),
                    ("sort_by", "created_at".to_string()),
                    ("sort_order", "desc".to_string()),
                    ("per_page", limit.to_string()),
                ],
            )
            .await?;
        Ok(found.results)
    }

    async fn update(&self, ticket_id: &str, ticket: Value) -> Result<(), BackendError> {
        self.http
            .send_empty(
                Method::PUT,
                &format!("/api/v2/tickets/{}.json", encode(ticket_id)),
                &json!({ "ticket": ticket }),
            )
            .await
    }

    /// Private comment on a ticket.
    pub async fn add_comment(&self, ticket_id: &str, body: &str) -> Result<(), BackendError> {
        self.update(ticket_id, json!({ "comment": { "body": body, "public": false } }))
            .await
    }

    pub async fn set_status(&self, ticket_id: &str, status: &str) -> Result<(), BackendError> {
        self.update(ticket_id, json!({ "status": status })).await
    }

    pub fn agent_url(&self, ticket_id: u64) -> String {
        self.http.url(&format!("/agent/tickets/{}", ticket_id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_api_token_credentials_become_basic() {
        assert_eq!(authorization_value("Bearer abc"), "Bearer abc");
        assert_eq!(
            authorization_value("agent@acme.com/token:secret"),
            "Basic YWdlbnRAYWNtZS5jb20vdG9rZW46c2VjcmV0"
        );
    }

    #[test]
    fn test_search_result_parsing() {
        let found: SearchResults = serde_json::from_value(json!({
            "results": [{
                "id": 35436,
                "subject": "Help, my printer is on fire!",
                "status": "open",
                "type": "incident",
                "result_type": "ticket"
            }],
            "count": 1
        }))
        .unwrap();
        let ticket = &found.results[0];
        assert_eq!(ticket.id, 35436);
        assert_eq!(ticket.kind.as_deref(), Some("incident"));
        assert!(ticket.tags.is_empty());
    }
}
