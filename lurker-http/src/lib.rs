//! Small HTTP layer shared by the Lurker clients.
//!
//! - per-request options: headers, [`Auth`], query params, timeout, retry budget
//! - credentials are redacted from every log line, including the optional raw
//!   request/response dump enabled with `LURKER_HTTP_RAW=1` (target `http.raw`)
//! - `429`/`5xx` retries with exponential backoff and `Retry-After`, opt-in
//!   through [`RetryPolicy`]
//! - JSON, text and raw (status + headers + body) responses
//!
//! ```no_run
//! # async fn demo() -> Result<(), lurker_http::HttpError> {
//! let client = lurker_http::HttpClient::new("https://api.example.com")?;
//! let got: serde_json::Value = client
//!     .get_json("1.1/items.json", lurker_http::RequestOpts::default())
//!     .await?;
//! # Ok(()) }
//! ```
mod client;
mod error;
mod redact;
mod retry;

pub use client::{Auth, DEFAULT_USER_AGENT, HttpClient, RawResponse, RequestOpts};
pub use error::HttpError;
pub use retry::{RateLimit, RetryPolicy};
