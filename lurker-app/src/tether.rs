//! Wires the shared services the HTTP surface and the sync job run on.
use anyhow::{Context, Result};
use lurker_config::LurkerConfig;
use lurker_social::ResponseCache;
use lurker_social::twitter::{GuestTokenProvider, GuestTokenSource, TimelineApi};
use std::sync::Arc;
use url::Url;

/// What one refresh pass fetches.
#[derive(Debug, Clone)]
pub struct SyncSettings {
    pub target: Url,
    pub subject_id: String,
    pub count: usize,
    /// Configured bearer; the scraped one is used when `None`.
    pub bearer: Option<String>,
}

#[derive(Clone)]
pub struct AppState {
    pub cache: ResponseCache,
    pub tokens: Arc<dyn GuestTokenSource>,
    pub timeline: TimelineApi,
    pub settings: Arc<SyncSettings>,
}

pub fn build_from_config(cfg: &LurkerConfig) -> Result<AppState> {
    let tw = &cfg.twitter;

    let target = Url::parse(&tw.target_url)
        .with_context(|| format!("invalid twitter.target_url: {}", tw.target_url))?;
    let provider =
        GuestTokenProvider::new(&tw.api_base).context("failed to build guest token provider")?;
    let timeline = TimelineApi::new(&tw.api_base)
        .context("failed to build timeline client")?
        .with_timeline_path(tw.timeline_path.clone());

    let settings = SyncSettings {
        target,
        subject_id: tw.subject_id.clone(),
        count: tw.count as usize,
        bearer: tw.bearer_token().map(str::to_string),
    };
    tracing::info!(
        target_url = %settings.target,
        subject_id = %settings.subject_id,
        count = settings.count,
        configured_bearer = settings.bearer.is_some(),
        "tether.ready"
    );

    Ok(AppState {
        cache: ResponseCache::new(),
        tokens: Arc::new(provider),
        timeline,
        settings: Arc::new(settings),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use lurker_config::LurkerConfigLoader;

    #[test]
    fn builds_state_from_defaults() {
        let cfg = LurkerConfig::default();
        let state = build_from_config(&cfg).unwrap();
        assert_eq!(state.settings.subject_id, "44196397");
        assert_eq!(state.settings.count, 5);
        assert!(state.settings.bearer.is_none());
        assert!(state.cache.is_empty());
    }

    #[test]
    fn configured_bearer_is_carried() {
        let cfg = LurkerConfigLoader::new()
            .with_yaml_str("twitter:\n  auth_token: \"app-bearer\"\n  count: 3\n")
            .load()
            .unwrap();
        let state = build_from_config(&cfg).unwrap();
        assert_eq!(state.settings.bearer.as_deref(), Some("app-bearer"));
        assert_eq!(state.settings.count, 3);
    }

    #[test]
    fn rejects_unparsable_target() {
        let mut cfg = LurkerConfig::default();
        cfg.twitter.target_url = "not a url".into();
        assert!(build_from_config(&cfg).is_err());
    }
}
