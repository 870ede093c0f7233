use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Body of `POST 1.1/guest/activate.json`.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ActivateResponse {
    // observed as both string and number
    #[serde(default)]
    pub guest_token: Option<Value>,
}

impl ActivateResponse {
    pub fn token(&self) -> Option<String> {
        match self.guest_token.as_ref()? {
            Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
            Value::Number(n) => Some(n.to_string()),
            _ => None,
        }
    }
}

/// One element of a GraphQL timeline's `instructions` array.
///
/// Entries stay raw so a single malformed entry is dropped on its own
/// instead of failing the whole instruction.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimelineInstruction {
    #[serde(rename = "type", default)]
    pub kind: String,
    #[serde(default)]
    pub entries: Vec<Value>,
}

impl TimelineInstruction {
    pub const ADD_ENTRIES: &'static str = "TimelineAddEntries";

    /// Entries that carry an `entryId`, in order.
    pub fn timeline_entries(self) -> impl Iterator<Item = TimelineEntry> {
        self.entries
            .into_iter()
            .filter_map(|e| serde_json::from_value::<TimelineEntry>(e).ok())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimelineEntry {
    #[serde(rename = "entryId")]
    pub entry_id: String,
    #[serde(default)]
    pub content: Value,
}

impl TimelineEntry {
    const CONTENT_PREFIX: &'static str = "tweet-";

    /// Plain posts only: cursors, promoted posts and recommendation modules
    /// use other entry id prefixes.
    pub fn is_content(&self) -> bool {
        self.entry_id.starts_with(Self::CONTENT_PREFIX)
            && crate::twitter::extract::find_key(&self.content, "promotedMetadata").is_none()
    }
}
