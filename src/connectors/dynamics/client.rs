//! Dynamics 365 Web API client.

use reqwest::Method;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::app::AppState;
use crate::backend::{BackendError, BackendHttp};
use crate::context::ConnectorContext;
use crate::errors::AppError;

const API: &str = "/api/data/v9.1";

pub const ACCOUNT_COLUMNS: &str = "accountid,name,accountnumber,telephone1,emailaddress1,\
                                   websiteurl,address1_city,address1_country,revenue";

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct WhoAmI {
    user_id: String,
}

#[derive(Debug, Deserialize)]
struct Collection {
    #[serde(default)]
    value: Vec<Value>,
}

/// Dynamics GUIDs are 36 hex-and-dash characters; anything else would break
/// out of the OData literal.
pub fn is_guid(id: &str) -> bool {
    id.len() == 36 && id.chars().all(|c| c.is_ascii_hexdigit() || c == '-')
}

pub struct DynamicsClient {
    http: BackendHttp,
}

impl DynamicsClient {
    pub fn new(state: &AppState, ctx: &ConnectorContext) -> Result<Self, AppError> {
        let http = BackendHttp::new(state.http.clone(), &ctx.base_url)
            .with_header("authorization", ctx.authorization()?)?
            .with_header("odata-version", "4.0")?
            .with_header("prefer", "return=representation")?;
        Ok(Self { http })
    }

    pub async fn who_am_i(&self) -> Result<String, BackendError> {
        let me: WhoAmI = self.http.get_json(&format!("{}/WhoAmI", API), &[]).await?;
        Ok(me.user_id)
    }

    pub async fn owned_accounts(
        &self,
        user_id: &str,
        top: u32,
    ) -> Result<Vec<Value>, BackendError> {
        let found: Collection = self
            .http
            .get_json(
                &format!("{}/accounts", API),
                &[
                    ("$select", ACCOUNT_COLUMNS.to_string()),
                    ("$filter", format!("_ownerid_value eq {}", user_id)),
                    ("$orderby", "name asc".to_string()),
                    ("$top", top.to_string()),
                ],
            )
            .await?;
        Ok(found.value)
    }

    /// Create a task regarding an account; returns the activity id.
    pub async fn create_task(
        &self,
        account_id: &str,
        subject: &str,
        description: Option<&str>,
    ) -> Result<Option<String>, BackendError> {
        let mut task = json!({
            "subject": subject,
            "regardingobjectid_account@odata.bind": format!("/accounts({})", account_id),
        });
        if let Some(description) = description {
            task["description"] = json!(description);
        }
        let created: Value = self
            .http
            .send_json(Method::POST, &format!("{}/tasks", API), &task)
            .await?;
        Ok(crate::shape::text_at(&created, "/activityid"))
    }

    pub fn account_url(&self, account_id: &str) -> String {
        self.http.url(&format!(
            "/main.aspx?pagetype=entityrecord&etn=account&id={}",
            account_id
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_guid_check() {
        assert!(is_guid("a5f1c7e2-7c3d-4a8e-9b1f-0c2d3e4f5a6b"));
        assert!(!is_guid("a5f1c7e2) or (1 eq 1"));
        assert!(!is_guid(""));
    }

    #[test]
    fn test_who_am_i_parsing() {
        let me: WhoAmI = serde_json::from_value(json!({
            "@odata.context": "https://org.crm.dynamics.com/api/data/v9.1/$metadata#...",
            "BusinessUnitId": "b1",
            "UserId": "u1",
            "OrganizationId": "o1"
        }))
        .unwrap();
        assert_eq!(me.user_id, "u1");
    }
}
