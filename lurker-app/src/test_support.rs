use crate::tether::{AppState, SyncSettings};
use async_trait::async_trait;
use lurker_social::twitter::{GuestToken, GuestTokenSource, TimelineApi};
use lurker_social::{ResponseCache, ScrapeStage, SocialError};
use serde_json::{Value, json};
use std::sync::Arc;
use url::Url;
use wiremock::MockServer;

/// Token source that skips scraping and answers with a fixed outcome.
pub struct FixedTokens(pub Result<String, ()>);

#[async_trait]
impl GuestTokenSource for FixedTokens {
    async fn resolve_guest_token(&self, target: &Url) -> lurker_social::Result<GuestToken> {
        match &self.0 {
            Ok(guest) => Ok(GuestToken::new(guest.clone(), target.clone(), "scraped-bearer")),
            Err(()) => Err(SocialError::Extraction {
                stage: ScrapeStage::BearerToken,
                detail: "no bearer in bundle".into(),
            }),
        }
    }
}

pub fn state_with(server: &MockServer, guest: Result<&str, ()>, bearer: Option<&str>) -> AppState {
    AppState {
        cache: ResponseCache::new(),
        tokens: Arc::new(FixedTokens(guest.map(str::to_string))),
        timeline: TimelineApi::new(&server.uri()).unwrap(),
        settings: Arc::new(SyncSettings {
            target: Url::parse(&format!("{}/jack", server.uri())).unwrap(),
            subject_id: "44196397".into(),
            count: 5,
            bearer: bearer.map(str::to_string),
        }),
    }
}

pub fn timeline_body(ids: &[&str]) -> Value {
    let entries: Vec<Value> = ids
        .iter()
        .map(|id| {
            json!({
                "entryId": format!("tweet-{id}"),
                "content": { "itemContent": { "tweet_results": { "result": {
                    "rest_id": id,
                    "legacy": { "full_text": format!("post {id}") }
                }}}}
            })
        })
        .collect();
    json!({ "data": { "user": { "result": { "timeline_v2": { "timeline": {
        "instructions": [{ "type": "TimelineAddEntries", "entries": entries }]
    }}}}}})
}
