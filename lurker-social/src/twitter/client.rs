//! Timeline listing client for guest sessions.
//!
//! Calls the user timeline endpoint with both credentials (application bearer
//! plus guest token) and reduces the response to plain posts. The endpoint
//! mixes cursors, promoted posts and recommendation modules into its entries,
//! so more entries are requested than the caller asked for and the extra ones
//! are filtered out here.
use crate::error::{Result, ScrapeStage, SocialError};
use crate::twitter::extract::{ID_KEY, find_key, to_item_list};
use crate::twitter::types::{TimelineEntry, TimelineInstruction};
use lurker_http::{Auth, HttpClient, RequestOpts};
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use serde_json::{Value, json};

/// Extra entries requested to make room for non-content entries.
pub const OVERFETCH_MARGIN: usize = 20;

/// Upper bound on the page size sent upstream.
pub const MAX_REQUEST_COUNT: usize = 200;

const DEFAULT_TIMELINE_PATH: &str = "graphql/UserTweets";

#[derive(Clone)]
pub struct TimelineApi {
    http: HttpClient,
    timeline_path: String,
}

impl TimelineApi {
    pub fn new(api_base: &str) -> Result<Self> {
        let http = HttpClient::new(api_base)?;
        Ok(Self {
            http,
            timeline_path: DEFAULT_TIMELINE_PATH.to_string(),
        })
    }

    pub fn with_timeline_path(mut self, path: impl Into<String>) -> Self {
        self.timeline_path = path.into();
        self
    }

    /// Up to `count` most recent posts by `subject_id`, newest first.
    ///
    /// Fewer posts than requested is not an error. Auth rejections, rate
    /// limits and server errors surface as [`SocialError::Upstream`](crate::SocialError::Upstream).
    pub async fn fetch_recent_items(
        &self,
        subject_id: &str,
        count: usize,
        bearer_token: &str,
        guest_token: &str,
    ) -> Result<Vec<Value>> {
        if count == 0 {
            return Ok(Vec::new());
        }

        let variables = json!({
            "userId": subject_id,
            "count": request_count(count),
            "includePromotedContent": false,
            "withVoice": false,
        })
        .to_string();

        let mut headers = HeaderMap::new();
        headers.insert(
            HeaderName::from_static("x-guest-token"),
            HeaderValue::from_str(guest_token.trim()).map_err(|e| {
                SocialError::extraction(ScrapeStage::GuestToken, format!("unusable guest token: {e}"))
            })?,
        );
        headers.insert(
            HeaderName::from_static("x-twitter-active-user"),
            HeaderValue::from_static("yes"),
        );

        tracing::info!(subject_id, count, path = %self.timeline_path, "timeline.fetch.start");

        let resp: Value = self
            .http
            .get_json(
                &self.timeline_path,
                RequestOpts {
                    auth: Some(Auth::Bearer(bearer_token)),
                    headers: Some(headers),
                    query: Some(vec![("variables", variables.into())]),
                    retries: Some(0),
                    ..Default::default()
                },
            )
            .await?;

        let items = recent_items(&resp, count);
        tracing::info!(subject_id, requested = count, returned = items.len(), "timeline.fetch.done");
        Ok(items)
    }
}

/// Reduce a timeline response to at most `count` posts in response order.
///
/// GraphQL responses are read from their `TimelineAddEntries` instructions
/// (pinned posts arrive in a separate instruction and are left out). Other
/// shapes go through [`to_item_list`]; elements that look like timeline
/// entries are filtered the same way, anything else is taken as a post.
pub fn recent_items(resp: &Value, count: usize) -> Vec<Value> {
    let candidates: Vec<Value> = match find_key(resp, "instructions") {
        Some(Value::Array(instructions)) => instructions
            .iter()
            .filter_map(|i| serde_json::from_value::<TimelineInstruction>(i.clone()).ok())
            .filter(|i| i.kind == TimelineInstruction::ADD_ENTRIES)
            .flat_map(TimelineInstruction::timeline_entries)
            .filter_map(entry_item)
            .collect(),
        _ => to_item_list(resp)
            .into_iter()
            .filter_map(|v| {
                if v.get("entryId").is_some() {
                    serde_json::from_value::<TimelineEntry>(v).ok().and_then(entry_item)
                } else {
                    Some(v)
                }
            })
            .collect(),
    };

    let raw = candidates.len();
    let items: Vec<Value> = candidates.into_iter().take(count).collect();
    tracing::debug!(candidates = raw, kept = items.len(), "timeline.entries");
    items
}

/// Page size to ask for when the caller wants `count` posts.
fn request_count(count: usize) -> usize {
    count.saturating_add(OVERFETCH_MARGIN).min(MAX_REQUEST_COUNT)
}

fn entry_item(entry: TimelineEntry) -> Option<Value> {
    if !entry.is_content() {
        tracing::trace!(entry_id = %entry.entry_id, "timeline.entry.skipped");
        return None;
    }

    let mut item = entry
        .content
        .pointer("/itemContent/tweet_results/result")
        .cloned()
        .unwrap_or(entry.content);

    // visibility-limited posts wrap the real post one level down
    if item.get("__typename").and_then(Value::as_str) == Some("TweetWithVisibilityResults") {
        if let Some(inner) = item.get("tweet").cloned() {
            item = inner;
        }
    }

    // identify posts by their own id rather than a nested author's
    if let Value::Object(map) = &mut item {
        if !map.contains_key(ID_KEY) {
            if let Some(rest_id) = map.get("rest_id").cloned() {
                map.insert(ID_KEY.to_string(), rest_id);
            }
        }
    }
    Some(item)
}
