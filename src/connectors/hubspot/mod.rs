//! HubSpot: cards for tickets owned by the user, enriched with the
//! associated contact and company.

use std::sync::Arc;

use axum::{extract::State, routing::post, Json, Router};
use futures::future::try_join_all;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::app::AppState;
use crate::backend::BackendError;
use crate::context::{ActionForm, ConnectorContext};
use crate::errors::AppError;
use crate::models::card::{Card, CardAction, CardBuilder};
use crate::shape;

pub mod client;

use client::{CrmObject, HubspotClient};

const CARD_NAME: &str = "HubSpot";
/// "Closed" in the default ticket pipeline.
pub const CLOSED_STAGE: &str = "4";

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
    pub stage: String,
}

/// A ticket with its first associated contact and company.
struct TicketView {
    ticket: CrmObject,
    contact: Option<CrmObject>,
    company: Option<CrmObject>,
}

async fn cards(
    State(state): State<Arc<AppState>>,
    ctx: ConnectorContext,
) -> Result<Json<Value>, AppError> {
    let client = HubspotClient::new(&state, &ctx)?;
    let email = ctx.email()?;

    let Some(owner) = client
        .owner_id(email)
        .await
        .map_err(AppError::backend("getOwner"))?
    else {
        tracing::info!("no hubspot owner for token email");
        return Ok(Json(json!({ "objects": [] })));
    };

    let settings = state.settings.current();
    let tickets = client
        .owned_tickets(&owner, settings.page_size)
        .await
        .map_err(AppError::backend("searchTickets"))?;

    let views = try_join_all(tickets.into_iter().map(|t| enrich(&client, t)))
        .await
        .map_err(AppError::backend("getTicketDetails"))?;

    let cards: Vec<Card> = views
        .iter()
        .map(|v| ticket_card(&ctx, v, settings.image_url.clone()))
        .collect();
    Ok(Json(json!({ "objects": cards })))
}

async fn enrich(client: &HubspotClient, ticket: CrmObject) -> Result<TicketView, BackendError> {
    let (contacts, companies) = futures::try_join!(
        client.associations(&ticket.id, "contacts"),
        client.associations(&ticket.id, "companies"),
    )?;

    let contact_id = contacts.first().and_then(|a| a.id());
    let company_id = companies.first().and_then(|a| a.id());

    let (contact, company) = futures::try_join!(
        async {
            match &contact_id {
                Some(id) => client
                    .object("contacts", id, &["firstname", "lastname", "email"])
                    .await
                    .map(Some),
                None => Ok(None),
            }
        },
        async {
            match &company_id {
                Some(id) => client.object("companies", id, &["name", "domain"]).await.map(Some),
                None => Ok(None),
            }
        },
    )?;

    Ok(TicketView {
        ticket,
        contact,
        company,
    })
}

async fn comment(
    State(state): State<Arc<AppState>>,
    ctx: ConnectorContext,
    ActionForm(form): ActionForm<CommentForm>,
) -> Result<Json<Value>, AppError> {
    if form.comment.trim().is_empty() {
        return Err(AppError::BadRequest("comment must not be empty".into()));
    }
    let id = HubspotClient::new(&state, &ctx)?
        .add_note(&form.ticket_id, &form.comment)
        .await
        .map_err(AppError::backend("addNote"))?;
    Ok(Json(json!({ "noteId": id })))
}

async fn status(
    State(state): State<Arc<AppState>>,
    ctx: ConnectorContext,
    ActionForm(form): ActionForm<StatusForm>,
) -> Result<Json<Value>, AppError> {
    HubspotClient::new(&state, &ctx)?
        .set_stage(&form.ticket_id, &form.stage)
        .await
        .map_err(AppError::backend("updateTicketStage"))?;
    Ok(Json(json!({})))
}

fn contact_label(contact: &CrmObject) -> Option<String> {
    let name = [contact.prop("firstname"), contact.prop("lastname")]
        .into_iter()
        .flatten()
        .collect::<Vec<_>>()
        .join(" ");
    match (name.is_empty(), contact.prop("email")) {
        (false, Some(email)) => Some(format!("{} <{}>", name, email)),
        (false, None) => Some(name),
        (true, email) => email,
    }
}

fn ticket_card(ctx: &ConnectorContext, view: &TicketView, image: Option<String>) -> Card {
    let ticket = &view.ticket;
    let subject = ticket.prop("subject").unwrap_or_else(|| "(no subject)".into());

    CardBuilder::new(CARD_NAME, ticket.id.clone())
        .title(format!("Ticket: {}", subject))
        .subtitle(view.company.as_ref().and_then(|c| c.prop("name")))
        .description(
            ticket
                .prop("content")
                .map(|c| shape::truncate(&shape::strip_html(&c), 500)),
        )
        .image(image)
        .field("Priority", ticket.prop("hs_ticket_priority"))
        .field("Stage", ticket.prop("hs_pipeline_stage"))
        .field("Created", ticket.prop("createdate"))
        .field("Contact", view.contact.as_ref().and_then(contact_label))
        .field("Company", view.company.as_ref().and_then(|c| c.prop("name")))
        .action(
            CardAction::user_input(
                "Add note",
                "Note added",
                ctx.action_url("card", "api/actions/comment"),
                "comment",
                "Note",
            )
            .param("ticketId", ticket.id.as_str())
            .repeatable(),
        )
        .action(
            CardAction::direct("Close", "Closed", ctx.action_url("card", "api/actions/status"))
                .param("ticketId", ticket.id.as_str())
                .param("stage", CLOSED_STAGE),
        )
        .build()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn object(id: &str, properties: Value) -> CrmObject {
        serde_json::from_value(json!({ "id": id, "properties": properties })).unwrap()
    }

    #[test]
    fn test_contact_label() {
        let c = object("1", json!({ "firstname": "Ada", "lastname": "Lovelace", "email": "ada@x.io" }));
        assert_eq!(contact_label(&c).as_deref(), Some("Ada Lovelace <ada@x.io>"));
        let c = object("2", json!({ "email": "anon@x.io" }));
        assert_eq!(contact_label(&c).as_deref(), Some("anon@x.io"));
        let c = object("3", json!({}));
        assert_eq!(contact_label(&c), None);
    }
}
