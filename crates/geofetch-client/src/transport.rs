//! Authenticated JSON POSTs with exponential backoff.

use std::sync::Arc;
use std::time::{Duration, Instant};

use bytes::Bytes;
use metrics::counter;
use rand::Rng;
use reqwest::{Client, StatusCode};
use serde::Serialize;
use tracing::{debug, instrument, warn};

use crate::auth::TokenProvider;
use crate::config::ClientConfig;
use crate::error::{FetchError, FetchResult};

/// Backoff schedule for one request.
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    /// Total attempts, including the first.
    pub max_attempts: u32,
    pub initial_delay: Duration,
    pub max_delay: Duration,
    /// No retry is scheduled that would end past this much time since the
    /// first attempt.
    pub max_elapsed: Duration,
    pub jitter: bool,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            initial_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(60),
            max_elapsed: Duration::from_secs(300),
            jitter: true,
        }
    }
}

impl RetryPolicy {
    /// Single attempt, no backoff.
    pub fn none() -> Self {
        Self {
            max_attempts: 1,
            ..Self::default()
        }
    }

    /// Delay before attempt `attempt + 1`, given the un-jittered delay used
    /// for the previous retry.
    fn next_delay(&self, previous: Option<Duration>) -> Duration {
        match previous {
            None => self.initial_delay.min(self.max_delay),
            Some(d) => (d * 2).min(self.max_delay),
        }
    }

    fn jittered(&self, delay: Duration) -> Duration {
        if !self.jitter {
            return delay;
        }
        let factor = rand::thread_rng().gen_range(0.0..=1.0);
        (delay + delay.mul_f64(factor)).min(self.max_delay)
    }
}

/// Status and body of a completed request.
#[derive(Debug, Clone)]
pub struct RawResponse {
    pub status: u16,
    pub body: Bytes,
}

impl RawResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// What a single attempt produced.
enum Attempt {
    Done(RawResponse),
    Retry(String),
}

/// Shared HTTP client plus credentials and retry policy.
#[derive(Debug, Clone)]
pub struct Transport {
    client: Client,
    tokens: Arc<dyn TokenProvider>,
    policy: RetryPolicy,
}

impl Transport {
    pub fn new(config: &ClientConfig, tokens: Arc<dyn TokenProvider>) -> FetchResult<Self> {
        let client = Client::builder()
            .timeout(config.request_timeout())
            .connect_timeout(config.connect_timeout())
            .pool_max_idle_per_host(config.max_workers)
            .tcp_nodelay(true)
            .build()
            .map_err(|e| FetchError::config(format!("failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            tokens,
            policy: config.retry.to_policy(),
        })
    }

    pub fn with_policy(mut self, policy: RetryPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// POST `payload` as JSON to `url`, retrying transient failures.
    ///
    /// 404 fails at once. Connection errors, 5xx and 429 are retried under
    /// the policy. Any other status is returned to the caller.
    #[instrument(skip(self, payload), fields(url = %url))]
    pub async fn send<P>(&self, url: &str, payload: &P) -> FetchResult<RawResponse>
    where
        P: Serialize + ?Sized,
    {
        let started = Instant::now();
        let mut attempt: u32 = 0;
        let mut delay: Option<Duration> = None;

        loop {
            attempt += 1;
            counter!("geofetch_requests_total").increment(1);
            debug!(attempt, "Sending request");

            let reason = match self.attempt(url, payload).await? {
                Attempt::Done(response) => {
                    debug!(attempt, status = response.status, bytes = response.body.len(), "Request complete");
                    return Ok(response);
                }
                Attempt::Retry(reason) => reason,
            };

            let next = self.policy.next_delay(delay);
            let wait = self.policy.jittered(next);
            let out_of_time = started.elapsed() + wait > self.policy.max_elapsed;
            if attempt >= self.policy.max_attempts || out_of_time {
                return Err(FetchError::Transport {
                    url: url.to_string(),
                    attempts: attempt,
                    message: reason,
                });
            }

            counter!("geofetch_retries_total").increment(1);
            warn!(
                error = %reason,
                attempt,
                max_attempts = self.policy.max_attempts,
                delay_ms = wait.as_millis() as u64,
                "Request failed, retrying"
            );
            tokio::time::sleep(wait).await;
            delay = Some(next);
        }
    }

    async fn attempt<P>(&self, url: &str, payload: &P) -> FetchResult<Attempt>
    where
        P: Serialize + ?Sized,
    {
        let mut request = self.client.post(url).json(payload);
        if let Some(token) = self.tokens.token().await? {
            request = request.bearer_auth(token);
        }

        let response = match request.send().await {
            Ok(response) => response,
            Err(e) => return Ok(Attempt::Retry(e.to_string())),
        };

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Err(FetchError::NotFound {
                url: url.to_string(),
            });
        }
        if status.is_server_error() || status == StatusCode::TOO_MANY_REQUESTS {
            return Ok(Attempt::Retry(format!("HTTP {}", status)));
        }

        match response.bytes().await {
            Ok(body) => Ok(Attempt::Done(RawResponse {
                status: status.as_u16(),
                body,
            })),
            Err(e) => Ok(Attempt::Retry(e.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_delay_doubles_and_caps() {
        let policy = RetryPolicy {
            initial_delay: Duration::from_millis(100),
            max_delay: Duration::from_millis(350),
            jitter: false,
            ..RetryPolicy::default()
        };
        let d1 = policy.next_delay(None);
        let d2 = policy.next_delay(Some(d1));
        let d3 = policy.next_delay(Some(d2));
        assert_eq!(d1, Duration::from_millis(100));
        assert_eq!(d2, Duration::from_millis(200));
        assert_eq!(d3, Duration::from_millis(350));
    }

    #[test]
    fn test_jitter_stays_within_bounds() {
        let policy = RetryPolicy {
            max_delay: Duration::from_secs(10),
            ..RetryPolicy::default()
        };
        for _ in 0..100 {
            let d = policy.jittered(Duration::from_millis(100));
            assert!(d >= Duration::from_millis(100));
            assert!(d <= Duration::from_millis(200));
        }
    }

    #[test]
    fn test_config_policy() {
        let config = ClientConfig::for_project("p");
        let policy = config.retry.to_policy();
        assert_eq!(policy, RetryPolicy::default());
    }
}
