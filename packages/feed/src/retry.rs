//! HTTP retry helpers for transient errors.
//!
//! Every feed request goes through [`send_json`] or [`send_ack`] instead of
//! calling `reqwest::RequestBuilder::send()` directly, so connection
//! failures, timeouts and 429/5xx answers get a short exponential
//! backoff. Keep the budget well under the polling interval.

use std::time::Duration;

use crate::FeedError;

/// Maximum length of the response body preview included in error logs.
const BODY_PREVIEW_LEN: usize = 500;

/// How many times a failed request is re-sent and how long to wait.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Number of re-sends after the first attempt.
    pub max_retries: u32,
    /// Delay before the first re-send; doubles on every further attempt.
    pub base_delay: Duration,
}

impl RetryPolicy {
    /// A policy that never re-sends.
    pub const NONE: Self = Self {
        max_retries: 0,
        base_delay: Duration::ZERO,
    };

    /// Backoff before re-send number `attempt` (1-based).
    #[must_use]
    pub fn delay_for(&self, attempt: u32) -> Duration {
        self.base_delay
            .saturating_mul(1u32 << attempt.saturating_sub(1).min(16))
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 1,
            base_delay: Duration::from_millis(250),
        }
    }
}

/// Sends an HTTP request and parses the response body as JSON.
///
/// The `build_request` closure is called on each attempt to construct a
/// fresh [`reqwest::RequestBuilder`] (since builders are consumed by
/// `.send()`).
///
/// A body that cannot be decoded is a malformed payload and is not
/// retried; the caller's next cycle will fetch it again.
///
/// # Errors
///
/// Returns [`FeedError`] if the request fails after all retries, the
/// server returns a non-retryable status code, or the body is not JSON.
pub async fn send_json<F>(
    build_request: F,
    policy: RetryPolicy,
) -> Result<serde_json::Value, FeedError>
where
    F: Fn() -> reqwest::RequestBuilder + Send + Sync,
{
    let response = send_inner(&build_request, policy).await?;
    let url = response.url().to_string();
    let status = response.status();
    let text = response.text().await?;

    if text.trim().is_empty() {
        return Ok(serde_json::Value::Null);
    }

    serde_json::from_str(&text).map_err(|e| {
        let preview = if text.len() > BODY_PREVIEW_LEN {
            let mut end = BODY_PREVIEW_LEN;
            while !text.is_char_boundary(end) {
                end -= 1;
            }
            format!("{}...", &text[..end])
        } else {
            text.clone()
        };
        log::warn!(
            "JSON parse failed\n  \
             url: {url}\n  \
             status: {status}\n  \
             received: {} bytes\n  \
             parse error: {e}\n  \
             body preview: {preview}",
            text.len(),
        );
        FeedError::Json(e)
    })
}

/// Sends a write request and discards the acknowledgement body.
///
/// # Errors
///
/// Returns [`FeedError`] if the request fails after all retries or the
/// server returns an error status.
pub async fn send_ack<F>(build_request: F, policy: RetryPolicy) -> Result<(), FeedError>
where
    F: Fn() -> reqwest::RequestBuilder + Send + Sync,
{
    let response = send_inner(&build_request, policy).await?;
    log::debug!("{} acknowledged with {}", response.url(), response.status());
    Ok(())
}

/// Core retry loop shared by [`send_json`] and [`send_ack`].
///
/// Returns the successful [`reqwest::Response`] (status 2xx or 3xx).
async fn send_inner<F>(build_request: &F, policy: RetryPolicy) -> Result<reqwest::Response, FeedError>
where
    F: Fn() -> reqwest::RequestBuilder + Send + Sync,
{
    let max_retries = policy.max_retries;
    let mut attempt = 0;

    loop {
        if attempt > 0 {
            let delay = policy.delay_for(attempt);
            log::debug!("  retry {attempt}/{max_retries} in {delay:?}...");
            tokio::time::sleep(delay).await;
        }

        match build_request().send().await {
            Err(e) => {
                if is_transient(&e) && attempt < max_retries {
                    log::debug!("  transient error: {e}");
                    attempt += 1;
                    continue;
                }
                return Err(FeedError::Http(e));
            }
            Ok(response) => {
                let status = response.status();

                // 429 and 5xx are worth another try; other 4xx are permanent
                if (status == reqwest::StatusCode::TOO_MANY_REQUESTS
                    || status.is_server_error())
                    && attempt < max_retries
                {
                    log::debug!("  HTTP {status} from {}", response.url());
                    attempt += 1;
                    continue;
                }

                if status.is_client_error() || status.is_server_error() {
                    return Err(FeedError::Status {
                        status: status.as_u16(),
                        url: response.url().to_string(),
                    });
                }

                return Ok(response);
            }
        }
    }
}

/// Returns `true` if the error is likely transient and worth retrying.
fn is_transient(e: &reqwest::Error) -> bool {
    e.is_timeout() || e.is_connect() || e.is_body() || e.is_request()
}
