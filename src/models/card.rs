//! Hub card schema.
//!
//! A card is identified twice: `backend_id` names the backend record, and
//! `hash` fingerprints what the user sees so the hub can tell an unchanged
//! card from an updated one. Only the header and body feed the hash; ids,
//! timestamps and action URLs do not.

use std::collections::BTreeMap;

use serde::Serialize;
use serde_json::Value;
use sha2::{Digest, Sha256};
use uuid::Uuid;

use crate::shape;

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct Link {
    pub href: String,
}

impl Link {
    pub fn new(href: impl Into<String>) -> Self {
        Self { href: href.into() }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Card {
    pub id: Uuid,
    pub backend_id: String,
    pub hash: String,
    pub name: String,
    pub creation_date: String,
    pub header: CardHeader,
    pub body: CardBody,
    pub actions: Vec<CardAction>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image: Option<Link>,
}

#[derive(Debug, Clone, Default, Serialize, PartialEq)]
pub struct CardHeader {
    pub title: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub subtitle: Vec<String>,
}

#[derive(Debug, Clone, Default, Serialize, PartialEq)]
pub struct CardBody {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub fields: Vec<CardField>,
}

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FieldType {
    General,
    Comment,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct CardField {
    #[serde(rename = "type")]
    pub field_type: FieldType,
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub content: Vec<CommentEntry>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct CommentEntry {
    pub text: String,
}

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ActionKey {
    Direct,
    UserInput,
    OpenIn,
}

#[derive(Debug, Clone, Serialize)]
pub struct UserInput {
    pub id: String,
    pub label: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_length: Option<u32>,
}

#[derive(Debug, Clone, Serialize)]
pub struct CardAction {
    pub id: Uuid,
    pub action_key: ActionKey,
    pub label: String,
    pub completed_label: String,
    pub url: Link,
    #[serde(rename = "type")]
    pub method: &'static str,
    pub primary: bool,
    pub allow_repeated: bool,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub request: BTreeMap<String, String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub user_input: Vec<UserInput>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mutually_exclusive_set_id: Option<String>,
}

impl CardAction {
    /// One-tap action posted straight to the connector.
    pub fn direct(label: &str, completed_label: &str, href: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            action_key: ActionKey::Direct,
            label: label.to_string(),
            completed_label: completed_label.to_string(),
            url: Link::new(href),
            method: "POST",
            primary: false,
            allow_repeated: false,
            request: BTreeMap::new(),
            user_input: Vec::new(),
            mutually_exclusive_set_id: None,
        }
    }

    /// Action that asks the user for text (e.g. a comment) first.
    pub fn user_input(
        label: &str,
        completed_label: &str,
        href: impl Into<String>,
        input_id: &str,
        input_label: &str,
    ) -> Self {
        let mut action = Self::direct(label, completed_label, href);
        action.action_key = ActionKey::UserInput;
        action.user_input.push(UserInput {
            id: input_id.to_string(),
            label: input_label.to_string(),
            min_length: Some(1),
        });
        action
    }

    /// Deep link into the backend's own UI.
    pub fn open_in(label: &str, href: impl Into<String>) -> Self {
        let mut action = Self::direct(label, label, href);
        action.action_key = ActionKey::OpenIn;
        action.method = "GET";
        action.allow_repeated = true;
        action
    }

    pub fn param(mut self, key: &str, value: impl Into<String>) -> Self {
        self.request.insert(key.to_string(), value.into());
        self
    }

    pub fn primary(mut self) -> Self {
        self.primary = true;
        self
    }

    pub fn exclusive(mut self, set_id: &str) -> Self {
        self.mutually_exclusive_set_id = Some(set_id.to_string());
        self
    }

    pub fn repeatable(mut self) -> Self {
        self.allow_repeated = true;
        self
    }
}

#[derive(Serialize)]
struct Fingerprint<'a> {
    header: &'a CardHeader,
    body: &'a CardBody,
}

/// Hex SHA-256 of a card's visible content.
pub fn card_hash(header: &CardHeader, body: &CardBody) -> String {
    // Serializing plain structs cannot fail; fall back to Debug just in case.
    let bytes = serde_json::to_vec(&Fingerprint { header, body })
        .unwrap_or_else(|_| format!("{:?}{:?}", header, body).into_bytes());
    hex::encode(Sha256::digest(&bytes))
}

/// Builder that prunes empty fields and stamps the fingerprint.
pub struct CardBuilder {
    name: String,
    backend_id: String,
    header: CardHeader,
    body: CardBody,
    actions: Vec<CardAction>,
    image: Option<Link>,
}

impl CardBuilder {
    pub fn new(name: &str, backend_id: impl Into<String>) -> Self {
        Self {
            name: name.to_string(),
            backend_id: backend_id.into(),
            header: CardHeader::default(),
            body: CardBody::default(),
            actions: Vec::new(),
            image: None,
        }
    }

    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.header.title = title.into();
        self
    }

    pub fn subtitle(mut self, subtitle: Option<String>) -> Self {
        if let Some(s) = subtitle.filter(|s| !s.trim().is_empty()) {
            self.header.subtitle.push(s);
        }
        self
    }

    pub fn description(mut self, description: Option<String>) -> Self {
        self.body.description = description.filter(|s| !s.trim().is_empty());
        self
    }

    /// Add a field; skipped when there is nothing to show.
    pub fn field(mut self, title: &str, value: Option<String>) -> Self {
        if let Some(v) = value.filter(|v| !v.trim().is_empty()) {
            self.body.fields.push(CardField {
                field_type: FieldType::General,
                title: title.to_string(),
                description: Some(v),
                content: Vec::new(),
            });
        }
        self
    }

    /// Add a field from raw backend JSON, coercing scalars to strings.
    pub fn json_field(self, title: &str, value: &Value) -> Self {
        self.field(title, shape::text(value))
    }

    pub fn comments(mut self, title: &str, comments: Vec<String>) -> Self {
        let content: Vec<CommentEntry> = comments
            .into_iter()
            .filter(|c| !c.trim().is_empty())
            .map(|text| CommentEntry { text })
            .collect();
        if !content.is_empty() {
            self.body.fields.push(CardField {
                field_type: FieldType::Comment,
                title: title.to_string(),
                description: None,
                content,
            });
        }
        self
    }

    pub fn action(mut self, action: CardAction) -> Self {
        self.actions.push(action);
        self
    }

    pub fn image(mut self, href: Option<String>) -> Self {
        self.image = href.map(Link::new);
        self
    }

    pub fn build(self) -> Card {
        let hash = card_hash(&self.header, &self.body);
        Card {
            id: Uuid::new_v4(),
            backend_id: self.backend_id,
            hash,
            name: self.name,
            creation_date: chrono::Utc::now().to_rfc3339(),
            header: self.header,
            body: self.body,
            actions: self.actions,
            image: self.image,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample(summary: &str) -> Card {
        CardBuilder::new("Jira Service Desk", "SD-42")
            .title("Approval requested")
            .subtitle(Some("SD-42".into()))
            .field("Summary", Some(summary.into()))
            .field("Reporter", Some("Ann".into()))
            .field("Empty", Some("   ".into()))
            .field("Missing", None)
            .json_field("Priority", &json!(3))
            .action(CardAction::direct("Approve", "Approved", "https://hub/actions/approve"))
            .build()
    }

    #[test]
    fn test_hash_is_stable_for_same_content() {
        let a = sample("Laptop");
        let b = sample("Laptop");
        assert_ne!(a.id, b.id);
        assert_eq!(a.hash, b.hash);
        assert_eq!(a.hash.len(), 64);
    }

    #[test]
    fn test_hash_changes_with_visible_field() {
        assert_ne!(sample("Laptop").hash, sample("Monitor").hash);
    }

    #[test]
    fn test_empty_fields_are_pruned() {
        let card = sample("Laptop");
        let titles: Vec<&str> = card.body.fields.iter().map(|f| f.title.as_str()).collect();
        assert_eq!(titles, vec!["Summary", "Reporter", "Priority"]);
        assert_eq!(card.body.fields[2].description.as_deref(), Some("3"));
    }

    #[test]
    fn test_serialized_shape() {
        let card = sample("Laptop");
        let json = serde_json::to_value(&card).unwrap();
        assert_eq!(json["backend_id"], "SD-42");
        assert_eq!(json["header"]["subtitle"][0], "SD-42");
        assert_eq!(json["body"]["fields"][0]["type"], "GENERAL");
        assert_eq!(json["actions"][0]["action_key"], "DIRECT");
        assert_eq!(json["actions"][0]["type"], "POST");
        assert!(json.get("image").is_none());
        assert!(json["actions"][0].get("user_input").is_none());
    }

    #[test]
    fn test_user_input_action() {
        let action = CardAction::user_input("Comment", "Commented", "/c", "comment", "Comment")
            .param("issueKey", "SD-1");
        let json = serde_json::to_value(&action).unwrap();
        assert_eq!(json["action_key"], "USER_INPUT");
        assert_eq!(json["user_input"][0]["id"], "comment");
        assert_eq!(json["request"]["issueKey"], "SD-1");
    }

    #[test]
    fn test_comment_field_skipped_when_empty() {
        let card = CardBuilder::new("Zendesk", "1")
            .comments("Comments", vec!["".into(), " ".into()])
            .build();
        assert!(card.body.fields.is_empty());
    }
}
