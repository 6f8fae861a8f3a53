//! Request pacing and rate-limit tracking
//!
//! One `Pacer` drives every deliberate wait in the tool: the fixed delay
//! before each API request, the quota wait when the advertised remaining
//! count runs low, the wait after an explicit rate-limit rejection, and the
//! delay between unfollow candidates.

use chrono::{DateTime, TimeZone, Utc};
use reqwest::header::HeaderMap;
use std::time::Duration;

use crate::config::PacingConfig;

/// Quota assumed before the first response arrives
const SEED_REMAINING: u32 = 5000;

const HEADER_REMAINING: &str = "x-ratelimit-remaining";
const HEADER_RESET: &str = "x-ratelimit-reset";

/// Rate-limit state reported by the most recent response
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitState {
    /// Requests left in the current window
    pub remaining: u32,
    /// When the window resets
    pub reset_at: DateTime<Utc>,
}

impl Default for RateLimitState {
    fn default() -> Self {
        Self {
            remaining: SEED_REMAINING,
            reset_at: Utc::now(),
        }
    }
}

impl RateLimitState {
    /// Update from `X-RateLimit-Remaining` / `X-RateLimit-Reset`
    ///
    /// Missing or malformed headers leave the corresponding field unchanged.
    pub fn update_from_headers(&mut self, headers: &HeaderMap) {
        if let Some(remaining) = header_value::<u32>(headers, HEADER_REMAINING) {
            self.remaining = remaining;
        }

        if let Some(reset) = header_value::<i64>(headers, HEADER_RESET)
            .and_then(|secs| Utc.timestamp_opt(secs, 0).single())
        {
            self.reset_at = reset;
        }
    }
}

fn header_value<T: std::str::FromStr>(headers: &HeaderMap, name: &str) -> Option<T> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.trim().parse().ok())
}

/// Pacing policy shared by the API client and the batch reconciler
#[derive(Debug, Clone)]
pub struct Pacer {
    /// Delay before every request
    pub request_delay: Duration,
    /// Delay after every processed unfollow candidate
    pub account_delay: Duration,
    /// Remaining count at or below which requests wait for the reset
    pub low_quota_threshold: u32,
    /// Added to the wait until the advertised reset
    pub reset_buffer: Duration,
    /// Wait after an explicit rate-limit rejection
    pub exhausted_wait: Duration,
    /// Rejections of a single request that are waited out before giving up
    pub max_rate_limit_retries: u32,
}

impl Pacer {
    pub fn from_config(config: &PacingConfig) -> Self {
        Self {
            request_delay: config.request_delay(),
            account_delay: config.account_delay(),
            low_quota_threshold: config.low_quota_threshold,
            reset_buffer: Duration::from_secs(config.reset_buffer_seconds),
            exhausted_wait: Duration::from_secs(config.exhausted_wait_seconds),
            max_rate_limit_retries: config.max_rate_limit_retries,
        }
    }

    /// Pacer without fixed delays or rejection waits, for tests
    pub fn immediate() -> Self {
        Self {
            request_delay: Duration::ZERO,
            account_delay: Duration::ZERO,
            low_quota_threshold: 0,
            reset_buffer: Duration::ZERO,
            exhausted_wait: Duration::ZERO,
            max_rate_limit_retries: 3,
        }
    }

    pub fn with_max_rate_limit_retries(mut self, retries: u32) -> Self {
        self.max_rate_limit_retries = retries;
        self
    }

    /// How long to wait for the quota window given `state` at `now`
    ///
    /// `None` when the quota is above the threshold or the reset has passed.
    pub fn low_quota_wait(&self, state: &RateLimitState, now: DateTime<Utc>) -> Option<Duration> {
        if state.remaining > self.low_quota_threshold {
            return None;
        }

        let until_reset = (state.reset_at - now).to_std().ok()?;
        if until_reset.is_zero() {
            return None;
        }

        Some(until_reset + self.reset_buffer)
    }

    /// Wait before issuing a request
    pub async fn before_request(&self, state: &RateLimitState) {
        if let Some(wait) = self.low_quota_wait(state, Utc::now()) {
            tracing::warn!(
                remaining = state.remaining,
                wait_secs = wait.as_secs(),
                "Rate limit low, sleeping until reset"
            );
            sleep(wait).await;
        }

        sleep(self.request_delay).await;
    }

    /// Wait after the API rejected a request for quota reasons
    pub async fn after_rate_limit_rejection(&self, attempt: u32) {
        tracing::error!(
            attempt,
            wait_secs = self.exhausted_wait.as_secs(),
            "Rate limit exceeded, waiting before retry"
        );
        sleep(self.exhausted_wait).await;
    }

    /// Wait between two unfollow candidates
    pub async fn between_accounts(&self) {
        sleep(self.account_delay).await;
    }
}

impl Default for Pacer {
    fn default() -> Self {
        Self::from_config(&PacingConfig {
            request_delay_seconds: 1.0,
            account_delay_seconds: 2.0,
            low_quota_threshold: 100,
            reset_buffer_seconds: 60,
            exhausted_wait_seconds: 3600,
            max_rate_limit_retries: 3,
        })
    }
}

async fn sleep(duration: Duration) {
    if !duration.is_zero() {
        tokio::time::sleep(duration).await;
    }
}
