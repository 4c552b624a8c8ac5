//! Zendesk: cards for unsolved tickets assigned to the user.

use std::sync::Arc;

use axum::{extract::State, routing::post, Json, Router};
use serde::Deserialize;
use serde_json::{json, Value};

use crate::app::AppState;
use crate::context::{ActionForm, ConnectorContext};
use crate::errors::AppError;
use crate::models::card::{Card, CardAction, CardBuilder};
use crate::shape;

pub mod client;

use client::{Ticket, ZendeskClient, STATUSES};

const CARD_NAME: &str = "Zendesk";

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/cards/requests", post(cards))
        .route("/api/actions/comment", post(comment))
        .route("/api/actions/status", post(status))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommentForm {
    pub ticket_id: String,
    pub comment: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusForm {
    pub ticket_id: String,
    pub status: String,
}

async fn cards(
    State(state): State<Arc<AppState>>,
    ctx: ConnectorContext,
) -> Result<Json<Value>, AppError> {
    let client = ZendeskClient::new(&state, &ctx)?;
    let settings = state.settings.current();

    let tickets = client
        .assigned_tickets(ctx.email()?, settings.page_size)
        .await
        .map_err(AppError::backend("searchTickets"))?;

    let cards: Vec<Card> = tickets
        .iter()
        .map(|t| ticket_card(&ctx, &client, t, settings.image_url.clone()))
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
    ZendeskClient::new(&state, &ctx)?
        .add_comment(&form.ticket_id, &form.comment)
        .await
        .map_err(AppError::backend("addComment"))?;
    Ok(Json(json!({})))
}

async fn status(
    State(state): State<Arc<AppState>>,
    ctx: ConnectorContext,
    ActionForm(form): ActionForm<StatusForm>,
) -> Result<Json<Value>, AppError> {
    let wanted = form.status.trim().to_ascii_lowercase();
    if !STATUSES.contains(&wanted.as_str()) {
        return Err(AppError::BadRequest(format!("unsupported status '{}'", form.status)));
    }
    ZendeskClient::new(&state, &ctx)?
        .set_status(&form.ticket_id, &wanted)
        .await
        .map_err(AppError::backend("updateStatus"))?;
    Ok(Json(json!({})))
}

fn ticket_card(
    ctx: &ConnectorContext,
    client: &ZendeskClient,
    ticket: &Ticket,
    image: Option<String>,
) -> Card {
    let id = ticket.id.to_string();
    let subject = ticket.subject.clone().unwrap_or_else(|| "(no subject)".into());
    let tags = (!ticket.tags.is_empty()).then(|| ticket.tags.join(", "));

    CardBuilder::new(CARD_NAME, id.clone())
        .title(format!("#{} {}", id, subject))
        .description(
            ticket
                .description
                .as_deref()
                .map(|d| shape::truncate(&shape::strip_html(d), 500)),
        )
        .image(image)
        .field("Status", ticket.status.clone())
        .field("Priority", ticket.priority.clone())
        .field("Type", ticket.kind.clone())
        .field("Tags", tags)
        .field("Created", ticket.created_at.clone())
        .action(
            CardAction::user_input(
                "Comment",
                "Commented",
                ctx.action_url("card", "api/actions/comment"),
                "comment",
                "Internal note",
            )
            .param("ticketId", id.as_str())
            .repeatable(),
        )
        .action(
            CardAction::direct(
                "Mark solved",
                "Solved",
                ctx.action_url("card", "api/actions/status"),
            )
            .param("ticketId", id.as_str())
            .param("status", "solved"),
        )
        .action(CardAction::open_in("Open in Zendesk", client.agent_url(ticket.id)))
        .build()
}
