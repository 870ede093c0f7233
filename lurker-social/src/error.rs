use lurker_http::HttpError;
use std::fmt;
use thiserror::Error;

/// Which scraping step failed to find what it was looking for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScrapeStage {
    /// Bootstrap bundle reference in the target page markup.
    BundleUrl,
    /// Application bearer literal in the bundle body.
    BearerToken,
    /// Guest token in the activation response.
    GuestToken,
}

impl fmt::Display for ScrapeStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ScrapeStage::BundleUrl => "bundle_url",
            ScrapeStage::BearerToken => "bearer_token",
            ScrapeStage::GuestToken => "guest_token",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Error)]
pub enum SocialError {
    /// Upstream markup or payload no longer matches the expected layout.
    #[error("extraction failed at {stage}: {detail}")]
    Extraction { stage: ScrapeStage, detail: String },

    /// Network or HTTP failure from any outbound call.
    #[error("upstream rejected request: {0}")]
    Upstream(#[from] HttpError),

    /// An item lacks the identifier field a caller required.
    #[error("key not found: {key}")]
    KeyNotFound { key: String },

    #[error("invalid URL: {0}")]
    Url(String),
}

impl SocialError {
    pub(crate) fn extraction(stage: ScrapeStage, detail: impl Into<String>) -> Self {
        SocialError::Extraction {
            stage,
            detail: detail.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, SocialError>;
