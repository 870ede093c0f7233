use crate::error::{HttpError, snippet, upstream_message};
use crate::redact;
use crate::retry::{RateLimit, RetryPolicy};
use reqwest::header::{CONTENT_LENGTH, HeaderMap, HeaderValue};
use reqwest::{Client, Method, StatusCode, Url};
use serde::de::DeserializeOwned;
use std::borrow::Cow;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};
use tokio::time::sleep;

const RAW_ENV: &str = "LURKER_HTTP_RAW";
const RAW_MAX_BODY: usize = 64 * 1024;

/// Browser-like agent; the public web front end serves different markup to
/// unknown clients.
pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/126.0 Safari/537.36";

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(15);
const CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

static NEXT_REQUEST: AtomicU64 = AtomicU64::new(1);

fn raw_enabled() -> bool {
    matches!(
        std::env::var(RAW_ENV).as_deref(),
        Ok("1") | Ok("true") | Ok("yes")
    )
}

/// Credentials attached to a request.
///
/// ```
/// use lurker_http::Auth;
///
/// let bearer = Auth::Bearer("token");
/// assert!(matches!(bearer, Auth::Bearer("token")));
/// ```
#[derive(Clone, Debug)]
pub enum Auth<'a> {
    /// `Authorization: Bearer <token>`
    Bearer(&'a str),
    None,
}

/// Per-request overrides.
///
/// ```
/// use lurker_http::{Auth, RequestOpts};
/// use std::time::Duration;
///
/// let opts = RequestOpts {
///     timeout: Some(Duration::from_secs(30)),
///     retries: Some(0),
///     auth: Some(Auth::Bearer("app-token")),
///     ..Default::default()
/// };
/// assert!(!opts.allow_absolute);
/// ```
#[derive(Clone, Debug, Default)]
pub struct RequestOpts<'a> {
    pub timeout: Option<Duration>,
    /// Retry budget for this request; the client's policy applies when `None`.
    pub retries: Option<usize>,
    pub auth: Option<Auth<'a>>,
    pub headers: Option<HeaderMap>,
    pub query: Option<Vec<(&'a str, Cow<'a, str>)>>,
    /// Use `path` as-is when it parses as an absolute URL instead of joining it to the base.
    pub allow_absolute: bool,
}

/// Successful response with everything a caller might need to scrape.
#[derive(Debug, Clone)]
pub struct RawResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Vec<u8>,
}

impl RawResponse {
    /// Body decoded as UTF-8, replacing invalid sequences.
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }

    /// Header value as a string, if present and visible ASCII.
    pub fn header_str(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    pub fn json<T: DeserializeOwned>(&self) -> Result<T, HttpError> {
        serde_json::from_slice(&self.body).map_err(|e| {
            let body_snippet = snippet(&self.body);
            tracing::warn!(
                serde_line = e.line(),
                serde_col = e.column(),
                error = %e,
                body_snippet = %body_snippet,
                "http.response.decode_error"
            );
            HttpError::Decode(e.to_string(), body_snippet)
        })
    }
}

enum Outcome {
    Done(RawResponse),
    Retry { delay: Duration, reason: String },
    Fail(HttpError),
}

/// Shared client anchored to a base URL.
///
/// Cloning is cheap; clones share the connection pool.
#[derive(Clone)]
pub struct HttpClient {
    base: Url,
    inner: Client,
    timeout: Duration,
    retry: RetryPolicy,
}

impl HttpClient {
    /// ```no_run
    /// use lurker_http::{HttpClient, HttpError};
    /// use std::time::Duration;
    ///
    /// let client = HttpClient::new("https://api.example.com")?;
    /// assert_eq!(client.timeout(), Duration::from_secs(15));
    /// assert_eq!(client.retry_policy().budget, 0);
    /// # Ok::<(), HttpError>(())
    /// ```
    pub fn new(base: &str) -> Result<Self, HttpError> {
        let base = Url::parse(base).map_err(|e| HttpError::Url(format!("{base}: {e}")))?;
        let inner = Client::builder()
            .connect_timeout(CONNECT_TIMEOUT)
            .user_agent(DEFAULT_USER_AGENT)
            .build()
            .map_err(|e| HttpError::Build(e.to_string()))?;
        Ok(Self {
            base,
            inner,
            timeout: DEFAULT_TIMEOUT,
            retry: RetryPolicy::default(),
        })
    }

    pub fn with_timeout(mut self, dur: Duration) -> Self {
        self.timeout = dur;
        self
    }

    /// Retry budget used when a request does not set its own.
    pub fn with_retries(mut self, n: usize) -> Self {
        self.retry = self.retry.with_budget(n);
        self
    }

    pub fn with_retry_policy(mut self, policy: RetryPolicy) -> Self {
        self.retry = policy;
        self
    }

    pub fn base(&self) -> &Url {
        &self.base
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn retry_policy(&self) -> &RetryPolicy {
        &self.retry
    }

    pub async fn get_json<T>(&self, path: &str, opts: RequestOpts<'_>) -> Result<T, HttpError>
    where
        T: DeserializeOwned,
    {
        self.execute(Method::GET, path, opts).await?.json()
    }

    /// GET a text document (HTML, JavaScript).
    pub async fn get_text(&self, path: &str, opts: RequestOpts<'_>) -> Result<String, HttpError> {
        Ok(self.execute(Method::GET, path, opts).await?.text())
    }

    /// Bodiless POST returning status, headers and bytes, for answers that
    /// live in a response header rather than the body.
    pub async fn post_raw(&self, path: &str, opts: RequestOpts<'_>) -> Result<RawResponse, HttpError> {
        self.execute(Method::POST, path, opts).await
    }

    fn resolve_url(&self, path: &str, allow_absolute: bool) -> Result<Url, HttpError> {
        if allow_absolute {
            if let Ok(abs) = Url::parse(path) {
                return Ok(abs);
            }
        }
        self.base
            .join(path)
            .map_err(|e| HttpError::Url(format!("{path}: {e}")))
    }

    async fn execute(
        &self,
        method: Method,
        path: &str,
        opts: RequestOpts<'_>,
    ) -> Result<RawResponse, HttpError> {
        let url = self.resolve_url(path, opts.allow_absolute)?;
        let budget = opts.retries.unwrap_or(self.retry.budget);
        let bearer = match &opts.auth {
            Some(Auth::Bearer(tok)) => Some(sanitize_bearer(tok)?),
            Some(Auth::None) | None => None,
        };

        let mut headers = opts.headers.clone().unwrap_or_default();
        if let Some(tok) = &bearer {
            let mut value = HeaderValue::from_str(&format!("Bearer {tok}"))
                .map_err(|e| HttpError::Build(format!("invalid Authorization header: {e}")))?;
            value.set_sensitive(true);
            headers.insert(reqwest::header::AUTHORIZATION, value);
        }
        if method == Method::POST {
            // some upstreams reject a bodiless POST without an explicit length
            headers.insert(CONTENT_LENGTH, HeaderValue::from_static("0"));
        }

        let query = opts.query.as_deref().unwrap_or_default();
        let timeout = opts.timeout.unwrap_or(self.timeout);
        let req_id = format!("r{:x}", NEXT_REQUEST.fetch_add(1, Ordering::Relaxed));
        let auth_kind = if bearer.is_some() { "bearer" } else { "none" };

        tracing::debug!(
            %req_id,
            %method,
            host_path = %redact::host_path(&url),
            query = ?redact::query(query),
            timeout_ms = timeout.as_millis() as u64,
            auth_kind,
            budget,
            "http.request.start"
        );
        if raw_enabled() {
            let curl = redact::curl(&method, &url, &headers);
            tracing::debug!(target: "http.raw", %req_id, %curl, "request");
        }

        let mut attempt = 0usize;
        loop {
            let rb = self
                .inner
                .request(method.clone(), url.clone())
                .timeout(timeout)
                .query(query)
                .headers(headers.clone());

            let outcome = self.send_once(rb, &req_id, attempt, budget).await;
            match outcome {
                Outcome::Done(resp) => return Ok(resp),
                Outcome::Fail(err) => return Err(err),
                Outcome::Retry { delay, reason } => {
                    attempt += 1;
                    tracing::warn!(
                        %req_id,
                        attempt,
                        budget,
                        backoff_ms = delay.as_millis() as u64,
                        reason = %reason,
                        "http.retrying"
                    );
                    sleep(delay).await;
                }
            }
        }
    }

    async fn send_once(
        &self,
        rb: reqwest::RequestBuilder,
        req_id: &str,
        attempt: usize,
        budget: usize,
    ) -> Outcome {
        let can_retry = attempt < budget;
        let started = Instant::now();

        let network_failure = |err: reqwest::Error, stage: &str| {
            let message = err.to_string();
            if can_retry {
                Outcome::Retry {
                    delay: self.retry.backoff(attempt + 1),
                    reason: format!("{stage}: {message}"),
                }
            } else {
                tracing::warn!(req_id, stage, message = %message, "http.network_error");
                Outcome::Fail(HttpError::Network(message))
            }
        };

        let resp = match rb.send().await {
            Ok(resp) => resp,
            Err(err) => return network_failure(err, "send"),
        };
        let status = resp.status();
        let headers = resp.headers().clone();
        let body = match resp.bytes().await {
            Ok(bytes) => bytes.to_vec(),
            Err(err) => return network_failure(err, "body"),
        };

        let request_id = headers
            .get("x-request-id")
            .or_else(|| headers.get("x-transaction-id"))
            .and_then(|v| v.to_str().ok())
            .unwrap_or("-")
            .to_string();
        let rate = RateLimit::from_headers(&headers);

        tracing::debug!(
            req_id,
            %status,
            duration_ms = started.elapsed().as_millis() as u64,
            body_len = body.len(),
            x_request_id = %request_id,
            rate_limit.limit = ?rate.limit,
            rate_limit.remaining = ?rate.remaining,
            rate_limit.reset = ?rate.reset,
            "http.response"
        );
        if raw_enabled() {
            let shown = &body[..body.len().min(RAW_MAX_BODY)];
            tracing::info!(
                target: "http.raw",
                req_id,
                %status,
                headers = ?redact::headers(&headers),
                body = %String::from_utf8_lossy(shown),
                truncated = body.len() > RAW_MAX_BODY,
                "response"
            );
        }

        if status.is_success() {
            return Outcome::Done(RawResponse {
                status,
                headers,
                body,
            });
        }

        let message = upstream_message(&body);
        if can_retry && RetryPolicy::retryable(status) {
            return Outcome::Retry {
                delay: self.retry.delay_for(attempt + 1, status, &headers),
                reason: format!("{status}: {message}"),
            };
        }

        tracing::warn!(
            req_id,
            %status,
            message = %message,
            x_request_id = %request_id,
            rate_limit_exhausted = rate.exhausted(),
            body_snippet = %snippet(&body),
            "http.error"
        );
        Outcome::Fail(HttpError::Api {
            status,
            message,
            request_id,
        })
    }
}

/// Normalize a pasted bearer: strip outer quotes and all ASCII whitespace,
/// then reject anything that cannot go into a header.
fn sanitize_bearer(raw: &str) -> Result<String, HttpError> {
    let mut s = raw
        .trim()
        .trim_matches(|c| c == '"' || c == '\'')
        .to_string();
    s.retain(|ch| !ch.is_ascii_whitespace());

    if s.is_empty() {
        return Err(HttpError::Build("bearer token is empty".into()));
    }
    if !s.is_ascii() || s.bytes().any(|b| b.is_ascii_control()) {
        return Err(HttpError::Build(
            "bearer token contains non-ASCII or control characters".into(),
        ));
    }
    Ok(s)
}
