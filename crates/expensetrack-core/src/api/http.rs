//! Shared HTTP plumbing: client construction and rate-limit backoff.

use std::time::Duration;

use anyhow::{Context, Result};
use reqwest::{Client, RequestBuilder, Response};
use tracing::warn;

use super::ApiError;

/// HTTP request timeout in seconds.
/// 30s allows for slow API responses while failing fast enough for good UX.
const REQUEST_TIMEOUT_SECS: u64 = 30;

/// Maximum number of retries for rate-limited (429) requests.
const MAX_RATE_LIMIT_RETRIES: u32 = 3;

/// Initial backoff delay in milliseconds for rate limiting.
const INITIAL_BACKOFF_MS: u64 = 1000;

pub fn build_client() -> Result<Client> {
    Client::builder()
        .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
        .build()
        .context("Failed to build HTTP client")
}

/// Strip the query string, which carries API keys and auth tokens.
pub(crate) fn redact(url: &str) -> &str {
    url.split('?').next().unwrap_or(url)
}

/// Send a request, retrying with exponential backoff while the server answers 429.
/// `build` is called once per attempt.
pub(crate) async fn send_with_backoff<F>(url: &str, build: F) -> Result<Response>
where
    F: Fn() -> RequestBuilder,
{
    let mut retries = 0;
    let mut backoff_ms = INITIAL_BACKOFF_MS;

    loop {
        let response = build()
            .send()
            .await
            .map_err(ApiError::from)
            .with_context(|| format!("Failed to send request to {}", redact(url)))?;

        if response.status().as_u16() != 429 {
            return Ok(response);
        }

        retries += 1;
        if retries > MAX_RATE_LIMIT_RETRIES {
            return Err(ApiError::RateLimited.into());
        }
        warn!(url = redact(url), retry = retries, backoff_ms = backoff_ms, "Rate limited, backing off");
        tokio::time::sleep(Duration::from_millis(backoff_ms)).await;
        backoff_ms *= 2;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_redact_strips_query() {
        assert_eq!(
            redact("https://db.example/expenses/u1.json?auth=secret"),
            "https://db.example/expenses/u1.json"
        );
        assert_eq!(redact("https://db.example/"), "https://db.example/");
    }
}
