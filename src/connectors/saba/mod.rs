//! Saba bot: current enrollments and recently added courses.

use std::sync::Arc;

use axum::{
    extract::State,
    routing::{get, post},
    Json, Router,
};
use chrono::{DateTime, Duration, Utc};
use serde_json::{json, Value};

use crate::app::AppState;
use crate::context::{ConnectorContext, Routing};
use crate::errors::AppError;
use crate::models::bot::{bot_response, BotAction, BotObject};
use crate::shape::{self, text_at};

pub mod client;

use client::SabaClient;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/bot/discovery", get(bot_discovery))
        .route("/bot/actions/enrollments", post(enrollments))
        .route("/bot/actions/new-courses", post(new_courses))
}

async fn bot_discovery(routing: Routing) -> Json<Value> {
    let objects = vec![
        BotObject::new("My enrollments")
            .description(Some("Courses you are enrolled in".into()))
            .workflow("vmw_GET_ENROLLMENTS")
            .action(BotAction::post(
                "My enrollments",
                routing.action_url("botDiscovery", "bot/actions/enrollments"),
            )),
        BotObject::new("New courses")
            .description(Some("Recently published courses".into()))
            .workflow("vmw_GET_NEW_COURSES")
            .action(BotAction::post(
                "New courses",
                routing.action_url("botDiscovery", "bot/actions/new-courses"),
            )),
    ];
    Json(json!({ "objects": objects }))
}

async fn enrollments(
    State(state): State<Arc<AppState>>,
    ctx: ConnectorContext,
) -> Result<Json<Value>, AppError> {
    let username = ctx.username()?;
    let client = SabaClient::connect(&state, &ctx).await?;

    let Some(person) = client
        .person_id(username)
        .await
        .map_err(AppError::backend("getPerson"))?
    else {
        return Ok(Json(bot_response(Vec::new(), "You have no current enrollments.")));
    };

    let count = state.settings.current().max_results;
    let found = client
        .enrollments(&person, count)
        .await
        .map_err(AppError::backend("getEnrollments"))?;

    let objects = found.iter().filter_map(enrollment_object).collect();
    Ok(Json(bot_response(objects, "You have no current enrollments.")))
}

async fn new_courses(
    State(state): State<Arc<AppState>>,
    ctx: ConnectorContext,
) -> Result<Json<Value>, AppError> {
    let settings = state.settings.current();
    let since = lookback_date(Utc::now(), settings.lookback_days)?;

    let found = SabaClient::connect(&state, &ctx)
        .await?
        .courses_since(&since, settings.max_results)
        .await
        .map_err(AppError::backend("getNewCourses"))?;

    let objects = found.iter().filter_map(course_object).collect();
    Ok(Json(bot_response(
        objects,
        &format!("No courses were added in the last {} days.", settings.lookback_days),
    )))
}

/// `YYYY-MM-DD` of the day `days` before `now`.
fn lookback_date(now: DateTime<Utc>, days: u32) -> Result<String, AppError> {
    now.checked_sub_signed(Duration::days(i64::from(days)))
        .map(|t| t.format("%Y-%m-%d").to_string())
        .ok_or_else(|| anyhow::anyhow!("lookback_days {} is out of range", days).into())
}

fn enrollment_object(enrollment: &Value) -> Option<BotObject> {
    let title = text_at(enrollment, "/course/displayName")
        .or_else(|| text_at(enrollment, "/offering_temp_id/displayName"))
        .or_else(|| text_at(enrollment, "/name"))?;

    Some(
        BotObject::new(title)
            .field(
                "Status",
                text_at(enrollment, "/status/displayName")
                    .or_else(|| text_at(enrollment, "/status")),
            )
            .field("Registered", text_at(enrollment, "/registration_date"))
            .field("Due", text_at(enrollment, "/target_date")),
    )
}

fn course_object(course: &Value) -> Option<BotObject> {
    let title = text_at(course, "/name")?;
    Some(
        BotObject::new(title)
            .subtitle(text_at(course, "/course_no"))
            .description(
                text_at(course, "/description")
                    .map(|d| shape::truncate(&shape::strip_html(&d), 300)),
            )
            .field("Added", text_at(course, "/createdOn")),
    )
}
