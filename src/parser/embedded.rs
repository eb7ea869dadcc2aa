use std::collections::HashMap;
use std::sync::LazyLock;

use scraper::{Html, Selector};
use serde_json::{Map, Value};

use super::text::{norm, unescape_entities};

static SCRIPT: LazyLock<Selector> = LazyLock::new(|| Selector::parse("script").unwrap());

/// Review as it sits in the embedded cache: the author is still an opaque
/// back-reference, resolved against the user directory afterwards and never
/// part of the output.
#[derive(Debug, Clone)]
pub struct RawReview {
    pub review_id: String,
    pub author_ref: String,
    pub stars: Value,
    pub date_local: String,
    pub text: String,
}

/// Per-document map of user id → display name.
pub type UserDirectory = HashMap<String, String>;

/// What one `<script>` block turned out to contain. Most blocks are not the
/// cache payload, so "not JSON" is an ordinary branch here, not an error.
enum Payload {
    Object(Map<String, Value>),
    NotJson,
}

fn classify_script(content: &str) -> Payload {
    let unescaped = unescape_entities(content);
    let mut body = unescaped.trim();
    // Some payloads ship wrapped as an HTML comment: <!-- { ... } -->
    if let Some(inner) = body.strip_prefix("<!--").and_then(|b| b.strip_suffix("-->")) {
        body = inner.trim();
    }
    match serde_json::from_str::<Value>(body) {
        Ok(Value::Object(map)) => Payload::Object(map),
        _ => Payload::NotJson,
    }
}

/// Scan every inline script block for a cache object keyed by type-prefixed
/// ids ("Review:xxxx", "User:yyyy") and pull out reviews plus the user
/// directory needed to resolve their author references.
pub fn extract(doc: &Html) -> (Vec<RawReview>, UserDirectory) {
    let mut reviews = Vec::new();
    let mut users = UserDirectory::new();

    for script in doc.select(&SCRIPT) {
        let content: String = script.text().collect();
        if content.trim().is_empty() {
            continue;
        }
        let Payload::Object(map) = classify_script(&content) else {
            continue;
        };

        for (key, val) in &map {
            let Value::Object(entry) = val else { continue };
            match entry.get("__typename").and_then(Value::as_str) {
                Some("Review") => {
                    if let Some(review) = review_entry(key, entry) {
                        reviews.push(review);
                    }
                }
                Some("User") => {
                    let uid = strip_type_prefix(key);
                    let display = entry
                        .get("displayName")
                        .and_then(Value::as_str)
                        .unwrap_or("");
                    if !uid.is_empty() && !display.is_empty() {
                        users.insert(uid.to_string(), display.to_string());
                    }
                }
                _ => {}
            }
        }
    }

    (reviews, users)
}

fn review_entry(key: &str, entry: &Map<String, Value>) -> Option<RawReview> {
    // Prefer text.full, fall back to text.plain.
    let text_obj = entry.get("text");
    let text = text_obj
        .and_then(|t| t.get("full"))
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
        .or_else(|| text_obj.and_then(|t| t.get("plain")).and_then(Value::as_str))
        .unwrap_or("");
    let text = norm(text);
    if text.is_empty() {
        return None;
    }

    let stars = entry.get("rating").cloned().unwrap_or(Value::Null);

    let date_local = entry
        .get("createdAt")
        .and_then(|c| c.get("localDateTimeForBusiness"))
        .and_then(Value::as_str)
        .or_else(|| entry.get("localizedDate").and_then(Value::as_str))
        .unwrap_or("")
        .to_string();

    let review_id = entry
        .get("encid")
        .and_then(Value::as_str)
        .or_else(|| entry.get("reviewId").and_then(Value::as_str))
        .unwrap_or(key)
        .to_string();

    let author_ref = entry
        .get("author")
        .and_then(|a| a.get("__ref"))
        .and_then(Value::as_str)
        .map(|r| strip_type_prefix(r).to_string())
        .unwrap_or_default();

    Some(RawReview {
        review_id,
        author_ref,
        stars,
        date_local,
        text,
    })
}

/// "User:123" → "123"; a key without a type prefix passes through unchanged.
fn strip_type_prefix(key: &str) -> &str {
    key.split_once(':').map(|(_, id)| id).unwrap_or(key)
}
