//! Salesforce: cards for the user's open cases.

use std::sync::Arc;

use axum::{extract::State, routing::post, Json, Router};
use serde::Deserialize;
use serde_json::{json, Value};

use crate::app::AppState;
use crate::context::{ActionForm, ConnectorContext};
use crate::errors::AppError;
use crate::models::card::{Card, CardAction, CardBuilder};
use crate::shape::{self, text_at};

pub mod client;

use client::SalesforceClient;

const CARD_NAME: &str = "Salesforce";

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/cards/requests", post(cards))
        .route("/api/actions/comment", post(comment))
        .route("/api/actions/close", post(close))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CaseForm {
    pub case_id: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommentForm {
    pub case_id: String,
    pub comment: String,
}

async fn cards(
    State(state): State<Arc<AppState>>,
    ctx: ConnectorContext,
) -> Result<Json<Value>, AppError> {
    let client = SalesforceClient::new(&state, &ctx)?;
    let email = ctx.email()?;

    let Some(user_id) = client
        .user_id_by_email(email)
        .await
        .map_err(AppError::backend("getUserId"))?
    else {
        tracing::info!("no salesforce user for token email");
        return Ok(Json(json!({ "objects": [] })));
    };

    let settings = state.settings.current();
    let cases = client
        .open_cases(&user_id, settings.page_size)
        .await
        .map_err(AppError::backend("getOpenCases"))?;

    let cards: Vec<Card> = cases
        .iter()
        .filter_map(|case| case_card(&ctx, &client, case, settings.image_url.clone()))
        .collect();
    Ok(Json(json!({ "objects": cards })))
}

async fn comment(
    State(state): State<Arc<AppState>>,
    ctx: ConnectorContext,
    ActionForm(form): ActionForm<CommentForm>,
) -> Result<Json<Value>, AppError> {
    if form.comment.trim().is_empty() {
        return Err(AppError::BadRequest("comment must not be empty".into()));
    }
    let id = SalesforceClient::new(&state, &ctx)?
        .add_comment(&form.case_id, &form.comment)
        .await
        .map_err(AppError::backend("addCaseComment"))?;
    Ok(Json(json!({ "commentId": id })))
}

async fn close(
    State(state): State<Arc<AppState>>,
    ctx: ConnectorContext,
    ActionForm(form): ActionForm<CaseForm>,
) -> Result<Json<Value>, AppError> {
    SalesforceClient::new(&state, &ctx)?
        .close_case(&form.case_id)
        .await
        .map_err(AppError::backend("closeCase"))?;
    Ok(Json(json!({})))
}

fn case_card(
    ctx: &ConnectorContext,
    client: &SalesforceClient,
    case: &Value,
    image: Option<String>,
) -> Option<Card> {
    let id = text_at(case, "/Id")?;
    let number = text_at(case, "/CaseNumber").unwrap_or_else(|| id.clone());
    let subject = text_at(case, "/Subject").unwrap_or_else(|| "(no subject)".into());
    let comments = case
        .pointer("/CaseComments/records")
        .and_then(Value::as_array)
        .map(|records| {
            records
                .iter()
                .filter_map(|c| text_at(c, "/CommentBody"))
                .collect()
        })
        .unwrap_or_default();

    let card = CardBuilder::new(CARD_NAME, id.clone())
        .title(format!("Case {}: {}", number, subject))
        .description(text_at(case, "/Description").map(|d| shape::truncate(&d, 500)))
        .field("Status", text_at(case, "/Status"))
        .field("Priority", text_at(case, "/Priority"))
        .field("Account", text_at(case, "/Account/Name"))
        .field("Contact", text_at(case, "/Contact/Name"))
        .field("Contact Email", text_at(case, "/Contact/Email"))
        .field("Created", text_at(case, "/CreatedDate"))
        .comments("Recent comments", comments)
        .image(image)
        .action(
            CardAction::user_input(
                "Comment",
                "Commented",
                ctx.action_url("card", "api/actions/comment"),
                "comment",
                "Comment",
            )
            .param("caseId", id.as_str())
            .repeatable(),
        )
        .action(
            CardAction::direct("Close case", "Closed", ctx.action_url("card", "api/actions/close"))
                .param("caseId", id.as_str()),
        )
        .action(CardAction::open_in("Open in Salesforce", client.record_url(&id)))
        .build();
    Some(card)
}
