//! LinkedIn Learning bot: popular courses and keyword search.

use std::sync::Arc;

use axum::{
    extract::State,
    routing::{get, post},
    Json, Router,
};
use chrono::{TimeZone, Utc};
use serde::Deserialize;
use serde_json::{json, Value};

use crate::app::AppState;
use crate::context::{ActionForm, ConnectorContext, Routing};
use crate::errors::AppError;
use crate::models::bot::{bot_response, BotAction, BotObject};
use crate::shape::{self, text_at};

pub mod client;

use client::{LinkedinClient, SortBy};

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/bot/discovery", get(bot_discovery))
        .route("/bot/actions/top-picks", post(top_picks))
        .route("/bot/actions/search", post(search))
}

#[derive(Debug, Deserialize)]
pub struct SearchForm {
    pub keyword: String,
}

async fn bot_discovery(routing: Routing) -> Json<Value> {
    let objects = vec![
        BotObject::new("Top picks")
            .description(Some("Popular LinkedIn Learning courses".into()))
            .workflow("vmw_GET_TOP_PICKS")
            .action(BotAction::post(
                "Top picks",
                routing.action_url("botDiscovery", "bot/actions/top-picks"),
            )),
        BotObject::new("Search courses")
            .description(Some("Find LinkedIn Learning courses by keyword".into()))
            .workflow("vmw_SEARCH_COURSES")
            .action(
                BotAction::post("Search", routing.action_url("botDiscovery", "bot/actions/search"))
                    .input("keyword", "Keywords"),
            ),
    ];
    Json(json!({ "objects": objects }))
}

async fn top_picks(
    State(state): State<Arc<AppState>>,
    ctx: ConnectorContext,
) -> Result<Json<Value>, AppError> {
    let settings = state.settings.current();
    let courses = LinkedinClient::new(&state, &ctx)?
        .courses(None, SortBy::Popularity, &settings.locale, settings.max_results)
        .await
        .map_err(AppError::backend("getTopPicks"))?;

    let objects = courses.iter().filter_map(course_object).collect();
    Ok(Json(bot_response(objects, "There are no popular courses right now.")))
}

async fn search(
    State(state): State<Arc<AppState>>,
    ctx: ConnectorContext,
    ActionForm(form): ActionForm<SearchForm>,
) -> Result<Json<Value>, AppError> {
    let keyword = form.keyword.trim();
    if keyword.is_empty() {
        return Err(AppError::BadRequest("keyword must not be empty".into()));
    }

    let settings = state.settings.current();
    let courses = LinkedinClient::new(&state, &ctx)?
        .courses(Some(keyword), SortBy::Relevance, &settings.locale, settings.max_results)
        .await
        .map_err(AppError::backend("searchCourses"))?;

    let objects = courses.iter().filter_map(course_object).collect();
    Ok(Json(bot_response(
        objects,
        &format!("No courses match \"{}\".", keyword),
    )))
}

/// `1h 5m`, `45m`, `30s`.
pub fn format_duration(seconds: u64) -> String {
    let (h, m, s) = (seconds / 3600, (seconds % 3600) / 60, seconds % 60);
    match (h, m) {
        (0, 0) => format!("{}s", s),
        (0, m) => format!("{}m", m),
        (h, 0) => format!("{}h", h),
        (h, m) => format!("{}h {}m", h, m),
    }
}

fn duration(course: &Value) -> Option<String> {
    let amount = course.pointer("/details/timeToComplete/duration")?.as_u64()?;
    let unit = text_at(course, "/details/timeToComplete/unit").unwrap_or_else(|| "SECOND".into());
    let seconds = match unit.as_str() {
        "MINUTE" => amount.checked_mul(60)?,
        "HOUR" => amount.checked_mul(3600)?,
        _ => amount,
    };
    Some(format_duration(seconds))
}

fn published(course: &Value) -> Option<String> {
    let millis = course.pointer("/details/publishedAt")?.as_i64()?;
    Utc.timestamp_millis_opt(millis)
        .single()
        .map(|t| t.format("%Y-%m-%d").to_string())
}

fn course_object(course: &Value) -> Option<BotObject> {
    let title = text_at(course, "/title/value")?;
    let description = text_at(course, "/details/shortDescription/value")
        .or_else(|| text_at(course, "/details/description/value"))
        .map(|d| shape::truncate(&shape::strip_html(&d), 300));

    Some(
        BotObject::new(title)
            .description(description)
            .url(text_at(course, "/details/urls/webLaunch"))
            .image(text_at(course, "/details/images/primary"))
            .field("Duration", duration(course))
            .field("Author", text_at(course, "/details/contributors/0/name/value"))
            .field("Published", published(course)),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_duration() {
        assert_eq!(format_duration(3900), "1h 5m");
        assert_eq!(format_duration(2700), "45m");
        assert_eq!(format_duration(7200), "2h");
        assert_eq!(format_duration(30), "30s");
    }

    #[test]
    fn test_course_object_shape() {
        let course = json!({
            "urn": "urn:li:lyndaCourse:123",
            "title": { "value": "Rust Essentials", "locale": { "language": "en" } },
            "details": {
                "shortDescription": { "value": "<p>Learn <b>Rust</b></p>" },
                "urls": { "webLaunch": "https://www.linkedin.com/learning/rust" },
                "images": { "primary": "https://media/rust.png" },
                "timeToComplete": { "duration": 65, "unit": "MINUTE" },
                "publishedAt": 1_577_836_800_000i64,
                "contributors": [{ "name": { "value": "Ferris" } }]
            }
        });
        let obj = serde_json::to_value(course_object(&course).unwrap()).unwrap();
        let details = &obj["itemDetails"];
        assert_eq!(details["title"], "Rust Essentials");
        assert_eq!(details["description"], "Learn Rust");
        assert_eq!(details["url"]["href"], "https://www.linkedin.com/learning/rust");
        let fields = details["fields"].as_array().unwrap();
        assert_eq!(fields[0]["description"], "1h 5m");
        assert_eq!(fields[1]["description"], "Ferris");
        assert_eq!(fields[2]["description"], "2020-01-01");
    }

    #[test]
    fn test_oversized_duration_is_dropped() {
        let course = json!({
            "title": { "value": "Forever" },
            "details": { "timeToComplete": { "duration": u64::MAX, "unit": "HOUR" } }
        });
        assert_eq!(duration(&course), None);
        let obj = serde_json::to_value(course_object(&course).unwrap()).unwrap();
        assert!(obj["itemDetails"].get("fields").is_none());
    }

    #[test]
    fn test_untitled_course_is_skipped() {
        assert!(course_object(&json!({ "details": {} })).is_none());
    }
}
