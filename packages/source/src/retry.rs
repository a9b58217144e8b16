//! Opt-in HTTP retry for transient failures.
//!
//! The default [`RetryPolicy`] makes exactly one attempt. When
//! `max_retries` is raised, connection errors, timeouts, HTTP 429, and HTTP
//! 5xx are retried with exponential backoff (`base_delay`, `2 * base_delay`,
//! `4 * base_delay`, ...). Other 4xx responses are permanent.

use std::time::Duration;

use serde::Deserialize;

use crate::FetchError;

/// Largest backoff exponent, so the delay computation cannot overflow.
const MAX_BACKOFF_SHIFT: u32 = 16;

/// How many times to retry a transient failure, and how long to wait.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct RetryPolicy {
    /// Retries after the first attempt. `0` disables retrying.
    #[serde(default)]
    pub max_retries: u32,
    /// Delay before the first retry, in milliseconds.
    #[serde(default = "default_base_delay_ms")]
    pub base_delay_ms: u64,
}

const fn default_base_delay_ms() -> u64 {
    2_000
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 0,
            base_delay_ms: default_base_delay_ms(),
        }
    }
}

impl RetryPolicy {
    /// Backoff before retry number `attempt` (1-based).
    #[must_use]
    pub fn delay(&self, attempt: u32) -> Duration {
        let shift = attempt.saturating_sub(1).min(MAX_BACKOFF_SHIFT);
        Duration::from_millis(self.base_delay_ms.saturating_mul(1u64 << shift))
    }
}

/// Sends a GET for `url` and returns the body as text, retrying transient
/// failures according to `policy`.
///
/// # Errors
///
/// Returns [`FetchError`] if the request fails after all attempts, the server
/// answers with a non-retryable status, or the body cannot be read.
pub async fn get_text(
    client: &reqwest::Client,
    url: &str,
    policy: &RetryPolicy,
) -> Result<String, FetchError> {
    let mut attempt = 0;

    loop {
        if attempt > 0 {
            let delay = policy.delay(attempt);
            log::warn!("  retry {attempt}/{} in {delay:?}...", policy.max_retries);
            tokio::time::sleep(delay).await;
        }
        let can_retry = attempt < policy.max_retries;
        attempt += 1;

        let response = match client.get(url).send().await {
            Ok(response) => response,
            Err(e) if can_retry && is_transient(&e) => {
                log::warn!("  transient error: {e}");
                continue;
            }
            Err(e) => return Err(FetchError::Http(e)),
        };

        let status = response.status();
        if status.is_success() {
            return Ok(response.text().await?);
        }

        if can_retry && is_retryable_status(status) {
            log::warn!("  HTTP {status} from {url}");
            continue;
        }

        return Err(FetchError::Status {
            status,
            url: url.to_string(),
        });
    }
}

/// Returns `true` for statuses worth retrying (429 and 5xx).
#[must_use]
pub fn is_retryable_status(status: reqwest::StatusCode) -> bool {
    status == reqwest::StatusCode::TOO_MANY_REQUESTS || status.is_server_error()
}

/// Returns `true` if the error is likely transient and worth retrying.
fn is_transient(e: &reqwest::Error) -> bool {
    e.is_timeout() || e.is_connect() || e.is_request()
}
