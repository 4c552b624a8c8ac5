//! Microsoft Dynamics bot: the user's accounts and task creation.

use std::sync::Arc;

use axum::{
    extract::State,
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use serde_json::{json, Value};

use crate::app::AppState;
use crate::context::{ActionForm, ConnectorContext, Routing};
use crate::errors::AppError;
use crate::models::bot::{bot_response, BotAction, BotObject};
use crate::shape::{self, text_at};

pub mod client;

use client::{is_guid, DynamicsClient};

/// Columns used for the title or links rather than shown as fields.
const HIDDEN_COLUMNS: [&str; 2] = ["accountid", "name"];

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/bot/discovery", get(bot_discovery))
        .route("/bot/actions/accounts", post(accounts))
        .route("/api/actions/task", post(create_task))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskForm {
    pub account_id: String,
    pub subject: String,
    #[serde(default)]
    pub description: Option<String>,
}

async fn bot_discovery(routing: Routing) -> Json<Value> {
    let objects = vec![BotObject::new("My accounts")
        .description(Some("Accounts you own in Dynamics".into()))
        .workflow("vmw_GET_MY_ACCOUNTS")
        .action(BotAction::post(
            "My accounts",
            routing.action_url("botDiscovery", "bot/actions/accounts"),
        ))];
    Json(json!({ "objects": objects }))
}

async fn accounts(
    State(state): State<Arc<AppState>>,
    ctx: ConnectorContext,
) -> Result<Json<Value>, AppError> {
    let client = DynamicsClient::new(&state, &ctx)?;
    let user_id = client
        .who_am_i()
        .await
        .map_err(AppError::backend("whoAmI"))?;

    let top = state.settings.current().max_results;
    let accounts = client
        .owned_accounts(&user_id, top)
        .await
        .map_err(AppError::backend("getAccounts"))?;

    let objects = accounts
        .iter()
        .filter_map(|a| account_object(&ctx, &client, a))
        .collect();
    Ok(Json(bot_response(objects, "You do not own any accounts.")))
}

async fn create_task(
    State(state): State<Arc<AppState>>,
    ctx: ConnectorContext,
    ActionForm(form): ActionForm<TaskForm>,
) -> Result<Json<Value>, AppError> {
    if !is_guid(&form.account_id) {
        return Err(AppError::BadRequest("accountId must be a GUID".into()));
    }
    if form.subject.trim().is_empty() {
        return Err(AppError::BadRequest("subject must not be empty".into()));
    }
    let description = form.description.as_deref().filter(|d| !d.trim().is_empty());

    let id = DynamicsClient::new(&state, &ctx)?
        .create_task(&form.account_id, form.subject.trim(), description)
        .await
        .map_err(AppError::backend("createTask"))?;
    Ok(Json(json!({ "taskId": id })))
}

/// `address1_city` -> `Address1 City`.
fn label(key: &str) -> String {
    key.split(['_', '.'])
        .filter(|part| !part.is_empty())
        .map(|part| {
            let mut chars = part.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

fn account_object(
    ctx: &ConnectorContext,
    client: &DynamicsClient,
    account: &Value,
) -> Option<BotObject> {
    let id = text_at(account, "/accountid")?;
    let name = text_at(account, "/name").unwrap_or_else(|| id.clone());

    let mut object = BotObject::new(name)
        .subtitle(text_at(account, "/accountnumber"))
        .url(Some(client.account_url(&id)));

    for (key, value) in shape::linearize(account) {
        if HIDDEN_COLUMNS.contains(&key.as_str()) || key.starts_with('_') {
            continue;
        }
        object = object.field(&label(&key), Some(value));
    }

    Some(
        object.action(
            BotAction::post("Create task", ctx.action_url("botDiscovery", "api/actions/task"))
                .payload("accountId", id)
                .input("subject", "Task subject"),
        ),
    )
}
