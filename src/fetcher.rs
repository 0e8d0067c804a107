use crate::types::{DigestError, Result};
use backoff::{backoff::Backoff, exponential::ExponentialBackoff};
use reqwest::Client;
use std::time::Duration;
use tracing::{debug, warn};

#[derive(Debug, Clone)]
pub struct FetchConfig {
    pub user_agent: String,
    pub timeout_seconds: u64,
    pub max_retries: u32,
    /// First retry delay; doubles on every subsequent attempt.
    pub initial_backoff_seconds: u64,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            user_agent: "weekly-digest/0.1".to_string(),
            timeout_seconds: 30,
            max_retries: 3,
            initial_backoff_seconds: 1,
        }
    }
}

/// Retrying HTTP client. This is the single point where network flakiness is
/// absorbed: timeouts, non-2xx statuses, and connection errors are all
/// retryable until the budget is exhausted. A call can still fail after the
/// retries, so callers catch the error at the call site rather than letting
/// it abort the run.
pub struct Fetcher {
    client: Client,
    config: FetchConfig,
}

impl Fetcher {
    pub fn new(config: FetchConfig) -> Self {
        let client = Client::builder()
            .user_agent(&config.user_agent)
            .timeout(Duration::from_secs(config.timeout_seconds))
            .gzip(true)
            .deflate(true)
            .brotli(true)
            .build()
            .expect("Failed to create HTTP client");

        Self { client, config }
    }

    /// GET the URL and return the response body as text.
    pub async fn fetch_text(&self, url: &str) -> Result<String> {
        let mut backoff: ExponentialBackoff<backoff::SystemClock> = ExponentialBackoff {
            current_interval: Duration::from_secs(self.config.initial_backoff_seconds),
            initial_interval: Duration::from_secs(self.config.initial_backoff_seconds),
            max_interval: Duration::from_secs(self.config.initial_backoff_seconds * 64),
            multiplier: 2.0,
            randomization_factor: 0.0,
            max_elapsed_time: None,
            ..Default::default()
        };

        let mut last_error = String::from("no attempt made");

        for attempt in 0..=self.config.max_retries {
            if attempt > 0 {
                if let Some(delay) = backoff.next_backoff() {
                    warn!(
                        "Attempt {} failed for {}, retrying in {:?}",
                        attempt, url, delay
                    );
                    tokio::time::sleep(delay).await;
                }
            }

            match self.client.get(url).send().await {
                Ok(response) => {
                    let status = response.status();
                    if !status.is_success() {
                        last_error = format!(
                            "HTTP {}: {}",
                            status,
                            status.canonical_reason().unwrap_or("Unknown")
                        );
                        continue;
                    }

                    match response.text().await {
                        Ok(body) => {
                            debug!("Fetched {} ({} bytes)", url, body.len());
                            return Ok(body);
                        }
                        Err(e) => {
                            last_error = e.to_string();
                        }
                    }
                }
                Err(e) => {
                    last_error = e.to_string();
                }
            }
        }

        Err(DigestError::Fetch {
            url: url.to_string(),
            attempts: self.config.max_retries + 1,
            reason: last_error,
        })
    }
}
