use reqwest::StatusCode;
use reqwest::header::{HeaderMap, RETRY_AFTER};
use std::time::Duration;

/// How many times, and how long between, a failed request is re-sent.
///
/// Only network failures, `429` and `5xx` are retried. The default budget is
/// zero: callers that want retries opt in per client or per request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub budget: usize,
    pub base_delay: Duration,
    /// Minimum wait after a `429` that came without `Retry-After`.
    pub rate_limit_floor: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            budget: 0,
            base_delay: Duration::from_millis(200),
            rate_limit_floor: Duration::from_millis(1100),
        }
    }
}

impl RetryPolicy {
    pub fn with_budget(self, budget: usize) -> Self {
        Self { budget, ..self }
    }

    pub fn retryable(status: StatusCode) -> bool {
        status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error()
    }

    /// Exponential delay before retry number `attempt` (1-based).
    pub fn backoff(&self, attempt: usize) -> Duration {
        let shift = attempt.saturating_sub(1).min(16) as u32;
        self.base_delay.saturating_mul(1u32 << shift)
    }

    /// Delay before retrying a response with `status`, honouring `Retry-After`.
    pub fn delay_for(&self, attempt: usize, status: StatusCode, headers: &HeaderMap) -> Duration {
        if let Some(secs) = retry_after_secs(headers) {
            return Duration::from_secs(secs);
        }
        let exp = self.backoff(attempt);
        if status == StatusCode::TOO_MANY_REQUESTS {
            exp.max(self.rate_limit_floor)
        } else {
            exp
        }
    }
}

fn retry_after_secs(h: &HeaderMap) -> Option<u64> {
    h.get(RETRY_AFTER)?.to_str().ok()?.trim().parse().ok()
}

/// Rate-limit headers the platform attaches to API responses.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RateLimit {
    pub limit: Option<u64>,
    pub remaining: Option<u64>,
    /// Epoch seconds at which the window resets.
    pub reset: Option<u64>,
}

impl RateLimit {
    pub fn from_headers(h: &HeaderMap) -> Self {
        let num = |name: &str| -> Option<u64> { h.get(name)?.to_str().ok()?.trim().parse().ok() };
        Self {
            limit: num("x-rate-limit-limit"),
            remaining: num("x-rate-limit-remaining"),
            reset: num("x-rate-limit-reset"),
        }
    }

    pub fn exhausted(&self) -> bool {
        self.remaining == Some(0)
    }
}
