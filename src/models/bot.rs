use std::collections::BTreeMap;

use serde::Serialize;
use uuid::Uuid;

use super::card::{Link, UserInput};

pub const NO_RESULTS_TITLE: &str = "No results found";

/// One entry of a bot response (`{"objects": [...]}`).
#[derive(Debug, Clone, Serialize)]
pub struct BotObject {
    #[serde(rename = "itemDetails")]
    pub item_details: ItemDetails,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemDetails {
    pub id: Uuid,
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subtitle: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<Link>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image: Option<Link>,
    #[serde(rename = "type")]
    pub kind: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub workflow_id: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub fields: Vec<BotField>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub actions: Vec<BotAction>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct BotField {
    pub title: String,
    pub description: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BotAction {
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(rename = "type")]
    pub method: &'static str,
    pub url: Link,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub payload: BTreeMap<String, String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub user_input: Vec<UserInput>,
}

impl BotAction {
    pub fn post(title: &str, href: impl Into<String>) -> Self {
        Self {
            title: title.to_string(),
            description: None,
            method: "POST",
            url: Link::new(href),
            payload: BTreeMap::new(),
            user_input: Vec::new(),
        }
    }

    pub fn payload(mut self, key: &str, value: impl Into<String>) -> Self {
        self.payload.insert(key.to_string(), value.into());
        self
    }

    pub fn input(mut self, id: &str, label: &str) -> Self {
        self.user_input.push(UserInput {
            id: id.to_string(),
            label: label.to_string(),
            min_length: Some(1),
        });
        self
    }
}

impl BotObject {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            item_details: ItemDetails {
                id: Uuid::new_v4(),
                title: title.into(),
                subtitle: None,
                description: None,
                url: None,
                image: None,
                kind: "text",
                workflow_id: None,
                fields: Vec::new(),
                actions: Vec::new(),
            },
        }
    }

    /// Placeholder shown when the backend returned nothing.
    pub fn no_results(description: &str) -> Self {
        Self::new(NO_RESULTS_TITLE).description(Some(description.to_string()))
    }

    pub fn subtitle(mut self, subtitle: Option<String>) -> Self {
        self.item_details.subtitle = subtitle.filter(|s| !s.trim().is_empty());
        self
    }

    pub fn description(mut self, description: Option<String>) -> Self {
        self.item_details.description = description.filter(|s| !s.trim().is_empty());
        self
    }

    pub fn url(mut self, href: Option<String>) -> Self {
        self.item_details.url = href.map(Link::new);
        self
    }

    pub fn image(mut self, href: Option<String>) -> Self {
        self.item_details.image = href.map(Link::new);
        self
    }

    pub fn workflow(mut self, workflow_id: &str) -> Self {
        self.item_details.workflow_id = Some(workflow_id.to_string());
        self
    }

    pub fn field(mut self, title: &str, value: Option<String>) -> Self {
        if let Some(description) = value.filter(|v| !v.trim().is_empty()) {
            self.item_details.fields.push(BotField {
                title: title.to_string(),
                description,
            });
        }
        self
    }

    pub fn action(mut self, action: BotAction) -> Self {
        self.item_details.actions.push(action);
        self
    }
}

/// Wrap bot objects for the hub, substituting the placeholder for an empty
/// list.
pub fn bot_response(objects: Vec<BotObject>, empty_message: &str) -> serde_json::Value {
    let objects = if objects.is_empty() {
        vec![BotObject::no_results(empty_message)]
    } else {
        objects
    };
    serde_json::json!({ "objects": objects })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_list_gets_placeholder() {
        let json = bot_response(Vec::new(), "You have no current enrollments.");
        let objects = json["objects"].as_array().unwrap();
        assert_eq!(objects.len(), 1);
        assert_eq!(objects[0]["itemDetails"]["title"], NO_RESULTS_TITLE);
        assert_eq!(
            objects[0]["itemDetails"]["description"],
            "You have no current enrollments."
        );
    }

    #[test]
    fn test_object_serialization_skips_empty_parts() {
        let obj = BotObject::new("Rust Essentials")
            .url(Some("https://learn/rust".into()))
            .field("Duration", Some("1h 5m".into()))
            .field("Author", None);
        let json = serde_json::to_value(&obj).unwrap();
        let details = &json["itemDetails"];
        assert_eq!(details["type"], "text");
        assert_eq!(details["url"]["href"], "https://learn/rust");
        assert_eq!(details["fields"].as_array().unwrap().len(), 1);
        assert!(details.get("actions").is_none());
        assert!(details.get("workflowId").is_none());
    }

    #[test]
    fn test_action_payload_and_input() {
        let action = BotAction::post("Search", "/bot/actions/search").input("query", "Keywords");
        let json = serde_json::to_value(&action).unwrap();
        assert_eq!(json["type"], "POST");
        assert_eq!(json["userInput"][0]["id"], "query");
        assert!(json.get("payload").is_none());
    }
}
