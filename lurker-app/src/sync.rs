//! One refresh pass: guest session, timeline fetch, cache write.
use crate::tether::AppState;
use lurker_social::Result;
use lurker_social::twitter::GuestSession;
use lurker_social::twitter::extract::item_id;
use serde::Serialize;
use serde_json::Value;

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct RefreshReport {
    /// Posts returned by the timeline.
    pub fetched: usize,
    /// Posts not already cached.
    pub inserted: usize,
    pub ids: Vec<String>,
}

/// Acquire a guest session, fetch the subject's recent posts and cache them.
///
/// Every call starts a fresh session; concurrent calls each activate their own.
pub async fn refresh(state: &AppState) -> Result<RefreshReport> {
    let settings = &state.settings;
    let mut session = GuestSession::new(settings.target.clone());
    let token = session.acquire(state.tokens.as_ref()).await?;

    let bearer = settings.bearer.as_deref().unwrap_or(token.bearer());
    let items = state
        .timeline
        .fetch_recent_items(&settings.subject_id, settings.count, bearer, token.value())
        .await?;

    let ids: Vec<String> = items.iter().filter_map(item_id).collect();
    let fetched = items.len();
    let inserted = state.cache.write(&Value::Array(items));

    tracing::info!(fetched, inserted, cached = state.cache.len(), "sync.refresh.done");
    Ok(RefreshReport {
        fetched,
        inserted,
        ids,
    })
}

/// Background variant run at startup; failures are logged and dropped.
pub async fn refresh_logged(state: AppState) {
    match refresh(&state).await {
        Ok(report) => tracing::info!(
            fetched = report.fetched,
            inserted = report.inserted,
            "sync.startup.done"
        ),
        Err(err) => tracing::warn!(error = %err, "sync.startup.failed"),
    }
}
