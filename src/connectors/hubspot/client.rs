//! HubSpot CRM v3/v4 client: owners, tickets, associations, notes.

use reqwest::Method;
use serde::Deserialize;
use serde_json::{json, Value};
use urlencoding::encode;

use crate::app::AppState;
use crate::backend::{BackendError, BackendHttp};
use crate::context::ConnectorContext;
use crate::errors::AppError;
use crate::shape::text_at;

pub const TICKET_PROPERTIES: [&str; 6] = [
    "subject",
    "content",
    "hs_pipeline",
    "hs_pipeline_stage",
    "hs_ticket_priority",
    "createdate",
];

/// HubSpot-defined association type for note → ticket.
const NOTE_TO_TICKET: u32 = 228;

#[derive(Debug, Deserialize)]
struct Results<T> {
    #[serde(default = "Vec::new")]
    results: Vec<T>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Association {
    pub to_object_id: Value,
}

impl Association {
    /// Ids arrive as numbers from v4 and as strings elsewhere.
    pub fn id(&self) -> Option<String> {
        crate::shape::text(&self.to_object_id)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct CrmObject {
    pub id: String,
    #[serde(default)]
    pub properties: Value,
}

impl CrmObject {
    pub fn prop(&self, name: &str) -> Option<String> {
        text_at(&self.properties, &format!("/{}", name))
    }
}

pub struct HubspotClient {
    http: BackendHttp,
}

impl HubspotClient {
    pub fn new(state: &AppState, ctx: &ConnectorContext) -> Result<Self, AppError> {
        let http = BackendHttp::new(state.http.clone(), &ctx.base_url)
            .with_header("authorization", ctx.authorization()?)?;
        Ok(Self { http })
    }

    pub async fn owner_id(&self, email: &str) -> Result<Option<String>, BackendError> {
        let owners: Results<CrmObject> = self
            .http
            .get_json("/crm/v3/owners", &[("email", email.to_string())])
            .await?;
        Ok(owners.results.into_iter().next().map(|o| o.id))
    }

    /// Tickets owned by `owner_id`, newest first.
    pub async fn owned_tickets(
        &self,
        owner_id: &str,
        limit: u32,
    ) -> Result<Vec<CrmObject>, BackendError> {
        let body = json!({
            "filterGroups": [{
                "filters": [{
                    "propertyName": "hubspot_owner_id",
                    "operator": "EQ",
                    "value": owner_id,
                }]
            }],
            "sorts": [{ "propertyName": "createdate", "direction": "DESCENDING" }],
            "properties": TICKET_PROPERTIES,
            "limit": limit,
        });
        let found: Results<CrmObject> = self
            .http
            .send_json(Method::POST, "/crm/v3/objects/tickets/search", &body)
            .await?;
        Ok(found.results)
    }

    pub async fn associations(
        &self,
        ticket_id: &str,
        to: &str,
    ) -> Result<Vec<Association>, BackendError> {
        let found: Results<Association> = self
            .http
            .get_json(
                &format!("/crm/v4/objects/tickets/{}/associations/{}", encode(ticket_id), to),
                &[],
            )
            .await?;
        Ok(found.results)
    }

    pub async fn object(
        &self,
        object_type: &str,
        id: &str,
        properties: &[&str],
    ) -> Result<CrmObject, BackendError> {
        self.http
            .get_json(
                &format!("/crm/v3/objects/{}/{}", object_type, encode(id)),
                &[("properties", properties.join(","))],
            )
            .await
    }

    /// Attach a note to a ticket; returns the note id.
    pub async fn add_note(&self, ticket_id: &str, body: &str) -> Result<String, BackendError> {
        let note = json!({
            "properties": {
                "hs_note_body": body,
                "hs_timestamp": chrono::Utc::now().to_rfc3339(),
            },
            "associations": [{
                "to": { "id": ticket_id },
                "types": [{
                    "associationCategory": "HUBSPOT_DEFINED",
                    "associationTypeId": NOTE_TO_TICKET,
                }]
            }]
        });
        let created: CrmObject = self
            .http
            .send_json(Method::POST, "/crm/v3/objects/notes", &note)
            .await?;
        Ok(created.id)
    }

    pub async fn set_stage(&self, ticket_id: &str, stage: &str) -> Result<(), BackendError> {
        self.http
            .send_empty(
                Method::PATCH,
                &format!("/crm/v3/objects/tickets/{}", encode(ticket_id)),
                &json!({ "properties": { "hs_pipeline_stage": stage } }),
            )
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_association_id_accepts_numbers_and_strings() {
        let a: Association = serde_json::from_value(json!({ "toObjectId": 901 })).unwrap();
        assert_eq!(a.id().as_deref(), Some("901"));
        let a: Association = serde_json::from_value(json!({ "toObjectId": "902" })).unwrap();
        assert_eq!(a.id().as_deref(), Some("902"));
    }

    #[test]
    fn test_object_properties() {
        let t: CrmObject = serde_json::from_value(json!({
            "id": "77",
            "properties": { "subject": "Printer on fire", "content": "" }
        }))
        .unwrap();
        assert_eq!(t.prop("subject").as_deref(), Some("Printer on fire"));
        assert_eq!(t.prop("content"), None);
        assert_eq!(t.prop("missing"), None);
    }
}
