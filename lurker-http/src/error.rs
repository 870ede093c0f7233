use reqwest::StatusCode;
use serde_json::Value;
use thiserror::Error;

const SNIPPET_MAX: usize = 500;

#[derive(Debug, Error)]
pub enum HttpError {
    #[error("invalid URL: {0}")]
    Url(String),
    #[error("request build failed: {0}")]
    Build(String),
    #[error("network error: {0}")]
    Network(String),
    #[error("decode error: {0}, body_snippet: {1}")]
    Decode(String, String),
    #[error("upstream returned {status}: {message}, request_id={request_id}")]
    Api {
        status: StatusCode,
        message: String,
        request_id: String,
    },
}

impl HttpError {
    /// HTTP status for API errors, `None` for transport/build/decode failures.
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            HttpError::Api { status, .. } => Some(*status),
            _ => None,
        }
    }

    pub fn is_rate_limited(&self) -> bool {
        self.status() == Some(StatusCode::TOO_MANY_REQUESTS)
    }
}

/// Human-readable reason from an error body.
///
/// Understands the platform's `{"errors":[{"message"|"detail"|"title"}]}`
/// envelope and flat `{"message"|"detail"|"error"}` objects; anything else
/// falls back to a body snippet.
pub(crate) fn upstream_message(body: &[u8]) -> String {
    let Ok(v) = serde_json::from_slice::<Value>(body) else {
        return snippet(body);
    };
    let first_error = v.get("errors").and_then(|e| e.get(0));
    let candidates = first_error
        .into_iter()
        .flat_map(|e| ["message", "detail", "title"].map(|k| e.get(k)))
        .chain(["message", "detail", "error"].map(|k| v.get(k)));

    candidates
        .flatten()
        .filter_map(Value::as_str)
        .find(|s| !s.is_empty())
        .map(str::to_string)
        .unwrap_or_else(|| snippet(body))
}

/// Lossy UTF-8 prefix of `body`, cut on a char boundary.
pub(crate) fn snippet(body: &[u8]) -> String {
    let text = String::from_utf8_lossy(body);
    if text.len() <= SNIPPET_MAX {
        return text.into_owned();
    }
    let cut = (0..=SNIPPET_MAX)
        .rev()
        .find(|i| text.is_char_boundary(*i))
        .unwrap_or(0);
    format!("{}...", &text[..cut])
}
