//! Jira Service Desk: approval cards with approve / decline / comment.

use std::sync::Arc;

use axum::{extract::State, routing::post, Json, Router};
use futures::future::try_join_all;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::app::AppState;
use crate::context::{ActionForm, ConnectorContext};
use crate::errors::AppError;
use crate::models::card::{Card, CardAction, CardBuilder};
use crate::shape;

pub mod client;

use client::{Approval, Decision, JiraClient, ServiceDeskRequest};

const CARD_NAME: &str = "Jira Service Desk";
const DECISION_SET: &str = "approval-decision";

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/cards/requests", post(cards))
        .route("/api/actions/approve", post(approve))
        .route("/api/actions/decline", post(decline))
        .route("/api/actions/comment", post(comment))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApprovalForm {
    pub issue_key: String,
    pub approval_id: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommentForm {
    pub issue_key: String,
    pub comment: String,
}

/// POST /cards/requests: one card per pending approval.
async fn cards(
    State(state): State<Arc<AppState>>,
    ctx: ConnectorContext,
) -> Result<Json<Value>, AppError> {
    let client = JiraClient::new(&state, &ctx)?;
    let settings = state.settings.current();

    let requests = client
        .pending_requests(settings.page_size)
        .await
        .map_err(AppError::backend("getPendingRequests"))?;

    let approvals = try_join_all(
        requests
            .iter()
            .map(|r| client.pending_approvals(&r.issue_key)),
    )
    .await
    .map_err(AppError::backend("getApprovals"))?;

    let cards: Vec<Card> = requests
        .iter()
        .zip(approvals.iter())
        .flat_map(|(request, approvals)| {
            approvals
                .iter()
                .map(|approval| approval_card(&ctx, request, approval, settings.image_url.clone()))
                .collect::<Vec<_>>()
        })
        .collect();

    tracing::info!(requests = requests.len(), cards = cards.len(), "jira cards built");
    Ok(Json(json!({ "objects": cards })))
}

async fn approve(
    State(state): State<Arc<AppState>>,
    ctx: ConnectorContext,
    ActionForm(form): ActionForm<ApprovalForm>,
) -> Result<Json<Value>, AppError> {
    decide(&state, &ctx, &form, Decision::Approve).await
}

async fn decline(
    State(state): State<Arc<AppState>>,
    ctx: ConnectorContext,
    ActionForm(form): ActionForm<ApprovalForm>,
) -> Result<Json<Value>, AppError> {
    decide(&state, &ctx, &form, Decision::Decline).await
}

async fn decide(
    state: &AppState,
    ctx: &ConnectorContext,
    form: &ApprovalForm,
    decision: Decision,
) -> Result<Json<Value>, AppError> {
    JiraClient::new(state, ctx)?
        .answer_approval(&form.issue_key, &form.approval_id, decision)
        .await
        .map_err(AppError::backend("answerApproval"))?;
    tracing::info!(issue = %form.issue_key, ?decision, "jira approval answered");
    Ok(Json(json!({})))
}

async fn comment(
    State(state): State<Arc<AppState>>,
    ctx: ConnectorContext,
    ActionForm(form): ActionForm<CommentForm>,
) -> Result<Json<Value>, AppError> {
    if form.comment.trim().is_empty() {
        return Err(AppError::BadRequest("comment must not be empty".into()));
    }
    let id = JiraClient::new(&state, &ctx)?
        .add_comment(&form.issue_key, &form.comment)
        .await
        .map_err(AppError::backend("addComment"))?;
    Ok(Json(json!({ "commentId": id })))
}

fn field_value<'a>(request: &'a ServiceDeskRequest, field_id: &str) -> Option<&'a Value> {
    request
        .request_field_values
        .iter()
        .find(|f| f.field_id == field_id)
        .map(|f| &f.value)
}

fn approval_card(
    ctx: &ConnectorContext,
    request: &ServiceDeskRequest,
    approval: &Approval,
    image: Option<String>,
) -> Card {
    let key = &request.issue_key;
    let summary = field_value(request, "summary").and_then(shape::text);
    let description = field_value(request, "description")
        .and_then(shape::text)
        .map(|d| shape::truncate(&d, 500));

    let title = match &summary {
        Some(summary) => format!("[{}] {}", key, summary),
        None => format!("[{}] Approval requested", key),
    };

    let mut builder = CardBuilder::new(CARD_NAME, format!("{}-{}", key, approval.id))
        .title(title)
        .subtitle(approval.name.clone())
        .description(description)
        .image(image)
        .field(
            "Reporter",
            request.reporter.as_ref().and_then(|r| {
                r.display_name.clone().or_else(|| r.email_address.clone())
            }),
        )
        .field(
            "Created",
            request
                .created_date
                .as_ref()
                .and_then(|d| d.friendly.clone().or_else(|| d.iso8601.clone())),
        )
        .field(
            "Status",
            request.current_status.as_ref().and_then(|s| s.status.clone()),
        );

    for extra in request
        .request_field_values
        .iter()
        .filter(|f| f.field_id != "summary" && f.field_id != "description")
    {
        let label = extra.label.as_deref().unwrap_or(&extra.field_id);
        builder = builder.json_field(label, &extra.value);
    }

    builder = builder
        .action(
            CardAction::direct("Approve", "Approved", ctx.action_url("card", "api/actions/approve"))
                .param("issueKey", key.as_str())
                .param("approvalId", approval.id.as_str())
                .primary()
                .exclusive(DECISION_SET),
        )
        .action(
            CardAction::direct("Decline", "Declined", ctx.action_url("card", "api/actions/decline"))
                .param("issueKey", key.as_str())
                .param("approvalId", approval.id.as_str())
                .exclusive(DECISION_SET),
        )
        .action(
            CardAction::user_input(
                "Comment",
                "Commented",
                ctx.action_url("card", "api/actions/comment"),
                "comment",
                "Comment",
            )
            .param("issueKey", key.as_str())
            .repeatable(),
        );

    if let Some(web) = request.links.as_ref().and_then(|l| l.web.clone()) {
        builder = builder.action(CardAction::open_in("Open in Jira", web));
    }

    builder.build()
}
