use reqwest::{Method, StatusCode};
use serde::Deserialize;
use serde_json::{json, Value};
use urlencoding::encode;

use crate::app::AppState;
use crate::backend::{BackendError, BackendHttp};
use crate::context::ConnectorContext;
use crate::errors::AppError;
use crate::shape;

pub const API_VERSION: &str = "v44.0";

fn is_unauthorized(status: StatusCode, message: &str) -> bool {
    status == StatusCode::UNAUTHORIZED || message.contains("Session expired or invalid")
}

/// Quote a value for a SOQL string literal.
pub fn soql_quote(value: &str) -> String {
    format!("'{}'", value.replace('\\', "\\\\").replace('\'', "\\'"))
}

#[derive(Debug, Deserialize)]
struct QueryResult {
    #[serde(default)]
    records: Vec<Value>,
}

pub struct SalesforceClient {
    http: BackendHttp,
}

impl SalesforceClient {
    pub fn new(state: &AppState, ctx: &ConnectorContext) -> Result<Self, AppError> {
        let http = BackendHttp::new(state.http.clone(), &ctx.base_url)
            .with_header("authorization", ctx.authorization()?)?
            .with_unauthorized_rule(is_unauthorized);
        Ok(Self { http })
    }

    async fn query(&self, soql: &str) -> Result<Vec<Value>, BackendError> {
        let result: QueryResult = self
            .http
            .get_json(
                &format!("/services/data/{}/query", API_VERSION),
                &[("q", soql.to_string())],
            )
            .await?;
        Ok(result.records)
    }

    pub async fn user_id_by_email(&self, email: &str) -> Result<Option<String>, BackendError> {
        let records = self
            .query(&format!(
                "SELECT Id FROM User WHERE Email = {} LIMIT 1",
                soql_quote(email)
            ))
            .await?;
        Ok(records.first().and_then(|r| shape::text_at(r, "/Id")))
    }

    pub async fn open_cases(&self, owner_id: &str, limit: u32) -> Result<Vec<Value>, BackendError> {
        self.query(&format!(
            "SELECT Id, CaseNumber, Subject, Description, Status, Priority, CreatedDate, \
             Account.Name, Contact.Name, Contact.Email, \
             (SELECT CommentBody FROM CaseComments ORDER BY CreatedDate DESC LIMIT 3) \
             FROM Case WHERE OwnerId = {} AND IsClosed = false \
             ORDER BY CreatedDate DESC LIMIT {}",
            soql_quote(owner_id),
            limit
        ))
        .await
    }

    pub async fn add_comment(
        &self,
        case_id: &str,
        body: &str,
    ) -> Result<Option<String>, BackendError> {
        let created: Value = self
            .http
            .send_json(
                Method::POST,
                &format!("/services/data/{}/sobjects/CaseComment", API_VERSION),
                &json!({ "ParentId": case_id, "CommentBody": body }),
            )
            .await?;
        Ok(shape::text_at(&created, "/id"))
    }

    pub async fn close_case(&self, case_id: &str) -> Result<(), BackendError> {
        self.http
            .send_empty(
                Method::PATCH,
                &format!("/services/data/{}/sobjects/Case/{}", API_VERSION, encode(case_id)),
                &json!({ "Status": "Closed" }),
            )
            .await
    }

    pub fn record_url(&self, id: &str) -> String {
        self.http.url(&format!("/{}", encode(id)))
    }
}
