//! Log-safe renderings of outgoing requests.
use reqwest::header::HeaderMap;
use reqwest::{Method, Url};

const REDACTED: &str = "<redacted>";

const SECRET_HEADERS: &[&str] = &["authorization", "x-guest-token", "cookie", "x-csrf-token"];

const SECRET_QUERY_KEYS: &[&str] = &[
    "access_token",
    "auth",
    "authorization",
    "bearer",
    "guest_token",
    "key",
    "token",
];

pub(crate) fn is_secret_header(name: &str) -> bool {
    SECRET_HEADERS.iter().any(|h| name.eq_ignore_ascii_case(h))
}

pub(crate) fn is_secret_query_key(key: &str) -> bool {
    SECRET_QUERY_KEYS.iter().any(|k| key.eq_ignore_ascii_case(k))
}

pub(crate) fn headers(h: &HeaderMap) -> Vec<(String, String)> {
    h.iter()
        .map(|(name, value)| {
            let shown = if is_secret_header(name.as_str()) {
                REDACTED
            } else {
                value.to_str().unwrap_or("<binary>")
            };
            (name.as_str().to_string(), shown.to_string())
        })
        .collect()
}

pub(crate) fn query(pairs: &[(&str, std::borrow::Cow<'_, str>)]) -> Vec<(String, String)> {
    pairs
        .iter()
        .map(|(k, v)| {
            let shown = if is_secret_query_key(k) { REDACTED } else { v.as_ref() };
            ((*k).to_string(), shown.to_string())
        })
        .collect()
}

/// `host/path` without scheme or query.
pub(crate) fn host_path(url: &Url) -> String {
    format!("{}{}", url.host_str().unwrap_or("-"), url.path())
}

/// Replayable curl line for raw logging. The query string is left out since
/// its values may carry credentials.
pub(crate) fn curl(method: &Method, url: &Url, h: &HeaderMap) -> String {
    let quote = |s: &str| format!("'{}'", s.replace('\'', r"'\''"));
    let mut line = format!("curl -X{method}");
    for (name, value) in headers(h) {
        line.push_str(" -H ");
        line.push_str(&quote(&format!("{name}: {value}")));
    }
    line.push(' ');
    line.push_str(&quote(&format!("{}://{}", url.scheme(), host_path(url))));
    line
}
