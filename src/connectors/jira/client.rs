//! Jira Service Desk REST client (`/rest/servicedeskapi`).

use reqwest::{Method, StatusCode};
use serde::Deserialize;
use serde_json::{json, Value};
use urlencoding::encode;

use crate::app::AppState;
use crate::backend::{BackendError, BackendHttp};
use crate::context::ConnectorContext;
use crate::errors::AppError;

/// Stop paging after this many pages even if Jira keeps saying there is more.
const MAX_PAGES: u32 = 20;

/// Jira answers 404 instead of 401/403 for requests the user cannot see
/// with the forwarded credentials.
fn is_unauthorized(status: StatusCode, message: &str) -> bool {
    status == StatusCode::UNAUTHORIZED
        || (status == StatusCode::NOT_FOUND && message.contains("do not have permission"))
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceDeskRequest {
    pub issue_key: String,
    #[serde(default)]
    pub reporter: Option<User>,
    #[serde(default)]
    pub created_date: Option<JiraDate>,
    #[serde(default)]
    pub current_status: Option<CurrentStatus>,
    #[serde(default)]
    pub request_field_values: Vec<FieldValue>,
    #[serde(default, rename = "_links")]
    pub links: Option<Links>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default)]
    pub email_address: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct JiraDate {
    #[serde(default)]
    pub friendly: Option<String>,
    #[serde(default)]
    pub iso8601: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CurrentStatus {
    #[serde(default)]
    pub status: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldValue {
    pub field_id: String,
    #[serde(default)]
    pub label: Option<String>,
    #[serde(default)]
    pub value: Value,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Links {
    #[serde(default)]
    pub web: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Approval {
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub final_decision: Option<String>,
    #[serde(default)]
    pub can_answer_approval: bool,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Page<T> {
    #[serde(default = "Vec::new")]
    values: Vec<T>,
    #[serde(default = "default_last_page")]
    is_last_page: bool,
}

fn default_last_page() -> bool {
    true
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Approve,
    Decline,
}

impl Decision {
    fn as_str(self) -> &'static str {
        match self {
            Decision::Approve => "approve",
            Decision::Decline => "decline",
        }
    }
}

pub struct JiraClient {
    http: BackendHttp,
}

impl JiraClient {
    pub fn new(state: &AppState, ctx: &ConnectorContext) -> Result<Self, AppError> {
        let http = BackendHttp::new(state.http.clone(), &ctx.base_url)
            .with_header("authorization", ctx.authorization()?)?
            .with_unauthorized_rule(is_unauthorized);
        Ok(Self { http })
    }

    /// Open requests waiting on the current user's approval, all pages.
    pub async fn pending_requests(
        &self,
        page_size: u32,
    ) -> Result<Vec<ServiceDeskRequest>, BackendError> {
        let mut all = Vec::new();
        let mut start = 0u32;

        for _ in 0..MAX_PAGES {
            let page: Page<ServiceDeskRequest> = self
                .http
                .get_json(
                    "/rest/servicedeskapi/request",
                    &[
                        ("requestOwnership", "APPROVER".to_string()),
                        ("requestStatus", "OPEN_REQUESTS".to_string()),
                        ("approvalStatus", "MY_PENDING_APPROVAL".to_string()),
                        ("start", start.to_string()),
                        ("limit", page_size.to_string()),
                    ],
                )
                .await?;

            let fetched = page.values.len() as u32;
            all.extend(page.values);
            if page.is_last_page || fetched == 0 {
                return Ok(all);
            }
            start += fetched;
        }

        tracing::warn!(fetched = all.len(), "jira pagination stopped at page limit");
        Ok(all)
    }

    /// Approvals on a request that the current user can still answer.
    pub async fn pending_approvals(&self, issue_key: &str) -> Result<Vec<Approval>, BackendError> {
        let page: Page<Approval> = self
            .http
            .get_json(&format!("/rest/servicedeskapi/request/{}/approval", encode(issue_key)), &[])
            .await?;
        Ok(page
            .values
            .into_iter()
            .filter(|a| a.can_answer_approval && a.final_decision.as_deref() == Some("pending"))
            .collect())
    }

    pub async fn answer_approval(
        &self,
        issue_key: &str,
        approval_id: &str,
        decision: Decision,
    ) -> Result<(), BackendError> {
        self.http
            .send_empty(
                Method::POST,
                &format!(
                    "/rest/servicedeskapi/request/{}/approval/{}",
                    encode(issue_key),
                    encode(approval_id)
                ),
                &json!({ "decision": decision.as_str() }),
            )
            .await
    }

    /// Add a public comment; returns the new comment id.
    pub async fn add_comment(
        &self,
        issue_key: &str,
        body: &str,
    ) -> Result<Option<String>, BackendError> {
        let created: Value = self
            .http
            .send_json(
                Method::POST,
                &format!("/rest/servicedeskapi/request/{}/comment", encode(issue_key)),
                &json!({ "body": body, "public": true }),
            )
            .await?;
        Ok(crate::shape::text_at(&created, "/id"))
    }
}
