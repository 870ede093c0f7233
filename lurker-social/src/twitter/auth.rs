//! Anonymous guest sessions for the public web front end.
//!
//! Acquiring a guest token takes three chained requests:
//!
//! 1. fetch the target page and find the bootstrap bundle (`main.<hash>.js`)
//! 2. fetch the bundle and pull out the application bearer baked into it
//! 3. activate a guest session with that bearer
//!
//! Steps 1 and 2 scrape undocumented markup and break whenever the front end
//! is reshuffled. The patterns live in [`ScrapePatterns`] and callers only see
//! the [`GuestTokenSource`] trait, so the matching strategy can change without
//! touching them. Nothing here retries; a failed attempt is reported as either
//! [`SocialError::Upstream`] or [`SocialError::Extraction`].
use crate::error::{Result, ScrapeStage, SocialError};
use crate::twitter::types::ActivateResponse;
use async_trait::async_trait;
use lurker_http::{Auth, HttpClient, RequestOpts};
use regex::Regex;
use std::fmt;
use std::sync::{Arc, LazyLock};
use url::Url;

const ACTIVATE_PATH: &str = "1.1/guest/activate.json";
const GUEST_TOKEN_HEADER: &str = "x-guest-token";

/// Regexes used to scrape the page and the bundle. Each must have one capture group.
#[derive(Debug, Clone)]
pub struct ScrapePatterns {
    /// Finds the bootstrap bundle reference in page markup.
    pub bundle: Regex,
    /// Tried in order against the bundle body; first capture wins.
    pub bearer: Vec<Regex>,
}

static BUNDLE_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?:src|href)\s*=\s*["']((?:[^"']*/)?main\.[0-9A-Za-z_-]+\.js)["']"#)
        .expect("static bundle pattern")
});

static BEARER_LITERAL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"["'](AAAAAAAAAAAAAAAAAAAAA[A-Za-z0-9%_-]+)["']"#)
        .expect("static bearer literal pattern")
});

static BEARER_FIELD: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)token"?\s*:\s*"([A-Za-z0-9%_.=-]+)""#).expect("static bearer field pattern")
});

impl Default for ScrapePatterns {
    fn default() -> Self {
        Self {
            bundle: BUNDLE_PATTERN.clone(),
            bearer: vec![BEARER_LITERAL.clone(), BEARER_FIELD.clone()],
        }
    }
}

/// Find the bootstrap bundle URL in `html`, resolved against the page URL.
pub fn extract_bundle_url(html: &str, page: &Url, patterns: &ScrapePatterns) -> Result<Url> {
    let raw = patterns
        .bundle
        .captures(html)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str())
        .ok_or_else(|| {
            SocialError::extraction(ScrapeStage::BundleUrl, "no bootstrap bundle reference in page")
        })?;
    page.join(raw)
        .map_err(|e| SocialError::Url(format!("{raw}: {e}")))
}

/// Find the application bearer in a bundle body.
pub fn extract_bearer(js: &str, patterns: &ScrapePatterns) -> Result<String> {
    patterns
        .bearer
        .iter()
        .find_map(|re| re.captures(js).and_then(|c| c.get(1)))
        .map(|m| m.as_str().to_string())
        .ok_or_else(|| {
            SocialError::extraction(ScrapeStage::BearerToken, "no bearer token in bundle")
        })
}

/// Anonymous session credential. The secret never appears in `Debug` output.
#[derive(Clone, PartialEq, Eq)]
pub struct GuestToken {
    value: String,
    target: Url,
    bearer: String,
}

impl GuestToken {
    pub fn new(value: impl Into<String>, target: Url, bearer: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            target,
            bearer: bearer.into(),
        }
    }

    pub fn value(&self) -> &str {
        &self.value
    }

    /// Resource the session was scoped to.
    pub fn target(&self) -> &Url {
        &self.target
    }

    /// Application bearer the session was activated with.
    pub fn bearer(&self) -> &str {
        &self.bearer
    }
}

impl fmt::Debug for GuestToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GuestToken")
            .field("value", &"<redacted>")
            .field("target", &self.target.as_str())
            .finish()
    }
}

/// Anything that can turn a target URL into a guest session.
#[async_trait]
pub trait GuestTokenSource: Send + Sync {
    async fn resolve_guest_token(&self, target: &Url) -> Result<GuestToken>;
}

/// Scrapes the public front end for a bearer and activates guest sessions with it.
#[derive(Clone)]
pub struct GuestTokenProvider {
    http: HttpClient,
    patterns: Arc<ScrapePatterns>,
}

impl GuestTokenProvider {
    /// `api_base` hosts the activation endpoint; page and bundle URLs are absolute.
    pub fn new(api_base: &str) -> Result<Self> {
        let http = HttpClient::new(api_base)?;
        Ok(Self {
            http,
            patterns: Arc::new(ScrapePatterns::default()),
        })
    }

    pub fn with_patterns(mut self, patterns: ScrapePatterns) -> Self {
        self.patterns = Arc::new(patterns);
        self
    }

    /// Run the full page → bundle → activation chain for `target`.
    pub async fn acquire(&self, target: &Url) -> Result<GuestToken> {
        tracing::info!(target_url = %target, "guest.acquire.start");

        let result = self.acquire_inner(target).await;
        match &result {
            Ok(_) => tracing::info!(target_url = %target, "guest.acquire.done"),
            Err(err) => tracing::warn!(target_url = %target, error = %err, "guest.acquire.failed"),
        }
        result
    }

    async fn acquire_inner(&self, target: &Url) -> Result<GuestToken> {
        let bundle = self.find_bundle_url(target).await?;
        let bearer = self.find_bearer(&bundle).await?;
        let guest = self.activate(&bearer).await?;
        Ok(GuestToken::new(guest, target.clone(), bearer))
    }

    async fn find_bundle_url(&self, target: &Url) -> Result<Url> {
        let html = self.http.get_text(target.as_str(), absolute()).await?;
        let bundle = extract_bundle_url(&html, target, &self.patterns)?;
        tracing::debug!(page_len = html.len(), bundle = %bundle, "guest.bundle_url");
        Ok(bundle)
    }

    async fn find_bearer(&self, bundle: &Url) -> Result<String> {
        let js = self.http.get_text(bundle.as_str(), absolute()).await?;
        let bearer = extract_bearer(&js, &self.patterns)?;
        tracing::debug!(bundle_len = js.len(), bearer_len = bearer.len(), "guest.bearer");
        Ok(bearer)
    }

    /// Exchange an application bearer for a guest token.
    ///
    /// The token is taken from the `x-guest-token` response header when
    /// present, otherwise from the `guest_token` body field.
    pub async fn activate(&self, bearer: &str) -> Result<String> {
        let resp = self
            .http
            .post_raw(
                ACTIVATE_PATH,
                RequestOpts {
                    auth: Some(Auth::Bearer(bearer)),
                    retries: Some(0),
                    ..Default::default()
                },
            )
            .await?;

        if let Some(tok) = resp
            .header_str(GUEST_TOKEN_HEADER)
            .map(str::trim)
            .filter(|t| !t.is_empty())
        {
            return Ok(tok.to_string());
        }

        resp.json::<ActivateResponse>()
            .ok()
            .and_then(|body| body.token())
            .ok_or_else(|| {
                SocialError::extraction(
                    ScrapeStage::GuestToken,
                    "activation response carried no guest token",
                )
            })
    }
}

#[async_trait]
impl GuestTokenSource for GuestTokenProvider {
    async fn resolve_guest_token(&self, target: &Url) -> Result<GuestToken> {
        self.acquire(target).await
    }
}

fn absolute<'a>() -> RequestOpts<'a> {
    RequestOpts {
        allow_absolute: true,
        retries: Some(0),
        ..Default::default()
    }
}

/// Where a [`GuestSession`] stands.
#[derive(Debug, Clone)]
pub enum SessionState {
    Unauthenticated,
    Authenticated(GuestToken),
    /// Last attempt failed; the reason is kept for diagnostics.
    Failed(String),
}

/// Holds at most one guest token for a target and reuses it.
///
/// There is no refresh: once authenticated, the token is kept until the
/// session is dropped. A failed attempt can be followed by another
/// [`acquire`](Self::acquire) call if the caller wants to retry.
#[derive(Debug)]
pub struct GuestSession {
    target: Url,
    state: SessionState,
}

impl GuestSession {
    pub fn new(target: Url) -> Self {
        Self {
            target,
            state: SessionState::Unauthenticated,
        }
    }

    pub fn target(&self) -> &Url {
        &self.target
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn token(&self) -> Option<&GuestToken> {
        match &self.state {
            SessionState::Authenticated(tok) => Some(tok),
            _ => None,
        }
    }

    /// Return the held token, acquiring one through `source` if needed.
    pub async fn acquire(&mut self, source: &dyn GuestTokenSource) -> Result<&GuestToken> {
        if !matches!(self.state, SessionState::Authenticated(_)) {
            match source.resolve_guest_token(&self.target).await {
                Ok(tok) => self.state = SessionState::Authenticated(tok),
                Err(err) => {
                    self.state = SessionState::Failed(err.to_string());
                    return Err(err);
                }
            }
        }
        self.token().ok_or_else(|| {
            SocialError::extraction(ScrapeStage::GuestToken, "session is not authenticated")
        })
    }
}
