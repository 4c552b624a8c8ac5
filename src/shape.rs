//! Helpers for turning backend JSON into display strings.

use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;

static TAG_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?s)<[^>]*>").unwrap());
static SPACE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").unwrap());

/// Coerce a scalar to a display string. Null, empty strings, arrays and
/// objects yield `None`.
pub fn text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => {
            let s = s.trim();
            (!s.is_empty()).then(|| s.to_string())
        }
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Null | Value::Array(_) | Value::Object(_) => None,
    }
}

/// `text` of the value at a JSON pointer (`/fields/summary`).
pub fn text_at(value: &Value, pointer: &str) -> Option<String> {
    value.pointer(pointer).and_then(text)
}

/// Flatten nested objects into `(dotted.key, value)` pairs.
///
/// Arrays are indexed (`items.0.name`). Keys whose value is null or an
/// empty string are dropped, as are OData annotations (`@odata.etag`).
pub fn linearize(value: &Value) -> Vec<(String, String)> {
    let mut out = Vec::new();
    linearize_into(value, String::new(), &mut out);
    out
}

fn linearize_into(value: &Value, prefix: String, out: &mut Vec<(String, String)>) {
    match value {
        Value::Object(map) => {
            for (key, child) in map {
                if key.contains('@') {
                    continue;
                }
                let path = if prefix.is_empty() {
                    key.clone()
                } else {
                    format!("{}.{}", prefix, key)
                };
                linearize_into(child, path, out);
            }
        }
        Value::Array(items) => {
            for (i, child) in items.iter().enumerate() {
                let path = if prefix.is_empty() {
                    i.to_string()
                } else {
                    format!("{}.{}", prefix, i)
                };
                linearize_into(child, path, out);
            }
        }
        scalar => {
            if let Some(s) = text(scalar) {
                out.push((prefix, s));
            }
        }
    }
}

/// Strip markup from rich-text descriptions and collapse whitespace.
pub fn strip_html(input: &str) -> String {
    let without_tags = TAG_RE.replace_all(input, " ");
    let decoded = without_tags
        .replace("&nbsp;", " ")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&amp;", "&");
    SPACE_RE.replace_all(decoded.trim(), " ").into_owned()
}

/// Cut `input` to at most `max` characters, marking the cut with `...`.
pub fn truncate(input: &str, max: usize) -> String {
    if input.chars().count() <= max {
        return input.to_string();
    }
    let kept: String = input.chars().take(max.saturating_sub(3)).collect();
    format!("{}...", kept.trim_end())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_text_coercion() {
        assert_eq!(text(&json!(" hi ")), Some("hi".into()));
        assert_eq!(text(&json!(42)), Some("42".into()));
        assert_eq!(text(&json!(1.5)), Some("1.5".into()));
        assert_eq!(text(&json!(true)), Some("true".into()));
        assert_eq!(text(&json!("")), None);
        assert_eq!(text(&json!(null)), None);
        assert_eq!(text(&json!({"a": 1})), None);
    }

    #[test]
    fn test_linearize_flattens_and_prunes() {
        let value = json!({
            "@odata.etag": "W/\"123\"",
            "name": "Contoso",
            "telephone1": null,
            "primarycontactid": { "fullname": "Yvonne McKay", "emailaddress1": "" },
            "tags": ["a", "b"],
            "revenue": 1000
        });
        let flat = linearize(&value);
        assert!(flat.contains(&("name".into(), "Contoso".into())));
        assert!(flat.contains(&("primarycontactid.fullname".into(), "Yvonne McKay".into())));
        assert!(flat.contains(&("tags.1".into(), "b".into())));
        assert!(flat.contains(&("revenue".into(), "1000".into())));
        assert!(!flat.iter().any(|(k, _)| k.contains("etag")));
        assert!(!flat.iter().any(|(k, _)| k == "telephone1"));
        assert!(!flat.iter().any(|(k, _)| k == "primarycontactid.emailaddress1"));
    }

    #[test]
    fn test_strip_html() {
        assert_eq!(
            strip_html("<p>Learn <b>Rust</b>&nbsp;&amp; more</p>\n<br/>today"),
            "Learn Rust & more today"
        );
    }

    #[test]
    fn test_truncate() {
        assert_eq!(truncate("short", 10), "short");
        assert_eq!(truncate("a long description here", 10), "a long...");
    }
}
