//! GitHub REST client
//!
//! Thin wrapper over `reqwest` that knows the handful of endpoints the tool
//! uses, walks paginated collections, and applies the pacing policy to every
//! request.

use chrono::{DateTime, TimeZone, Utc};
use reqwest::header::{ACCEPT, AUTHORIZATION, HeaderMap, HeaderValue};
use reqwest::{Method, Response, StatusCode};
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;

use super::pacing::{Pacer, RateLimitState};
use super::{FollowState, GraphClient};
use crate::config::{GitHubConfig, parse_api_base};
use crate::data::Account;
use crate::error::AppError;

/// Page size for collection endpoints (GitHub maximum)
pub const PAGE_SIZE: u32 = 100;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Quota of one rate-limit resource as reported by `GET /rate_limit`
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct RateLimitResource {
    pub limit: u32,
    pub remaining: u32,
    #[serde(default)]
    pub used: u32,
    /// Window reset, seconds since the epoch
    pub reset: i64,
}

impl RateLimitResource {
    pub fn reset_at(&self) -> Option<DateTime<Utc>> {
        Utc.timestamp_opt(self.reset, 0).single()
    }
}

/// Core REST quota of the authenticated token
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RateLimitStatus {
    pub core: RateLimitResource,
}

#[derive(Deserialize)]
struct RateLimitBody {
    resources: RateLimitResources,
}

#[derive(Deserialize)]
struct RateLimitResources {
    core: RateLimitResource,
}

/// GitHub API client
///
/// Owns its rate-limit state; the state only changes from response headers.
pub struct GitHubClient {
    http: reqwest::Client,
    api_base: url::Url,
    pacer: Arc<Pacer>,
    rate_limit: RateLimitState,
}

impl GitHubClient {
    /// Create a client authenticated with the configured token
    ///
    /// # Errors
    /// Returns error if the base URL or token is unusable
    pub fn new(config: &GitHubConfig, pacer: Arc<Pacer>) -> Result<Self, AppError> {
        let api_base = parse_api_base(&config.api_base)?;

        let mut auth = HeaderValue::from_str(&format!("Bearer {}", config.token.trim()))
            .map_err(|_| {
                AppError::Config("github.token contains characters not valid in a header".to_string())
            })?;
        auth.set_sensitive(true);

        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, auth);
        headers.insert(
            ACCEPT,
            HeaderValue::from_static("application/vnd.github+json"),
        );

        let http = reqwest::Client::builder()
            .default_headers(headers)
            .user_agent(config.user_agent.clone())
            .timeout(REQUEST_TIMEOUT)
            .build()?;

        Ok(Self {
            http,
            api_base,
            pacer,
            rate_limit: RateLimitState::default(),
        })
    }

    /// Rate-limit state seen on the last response
    pub fn rate_limit_state(&self) -> RateLimitState {
        self.rate_limit
    }

    /// Current core quota from `GET /rate_limit`
    pub async fn rate_limit_status(&mut self) -> Result<RateLimitStatus, AppError> {
        let response = self.send(Method::GET, "rate_limit", &[]).await?;
        let response = expect_success(response)?;

        let body: RateLimitBody = response
            .json()
            .await
            .map_err(|e| AppError::Transport(format!("invalid rate_limit body: {e}")))?;

        Ok(RateLimitStatus {
            core: body.resources.core,
        })
    }

    /// Send one request under the pacing policy
    ///
    /// Quota rejections (403 mentioning the rate limit, or 429) are waited
    /// out and the identical request is repeated, at most
    /// `max_rate_limit_retries` times. Other statuses are returned to the
    /// caller, except a plain 403 whose body has already been consumed.
    async fn send(
        &mut self,
        method: Method,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<Response, AppError> {
        let url = self
            .api_base
            .join(path)
            .map_err(|e| AppError::Internal(anyhow::anyhow!("invalid request path {path}: {e}")))?;
        let mut rejections = 0u32;

        loop {
            self.pacer.before_request(&self.rate_limit).await;

            tracing::debug!(method = %method, url = %url, "Sending GitHub request");
            let response = self
                .http
                .request(method.clone(), url.clone())
                .query(query)
                .send()
                .await
                .map_err(|e| {
                    tracing::error!(method = %method, url = %url, error = %e, "Request failed");
                    AppError::Transport(format!("{method} {url}: {e}"))
                })?;

            self.rate_limit.update_from_headers(response.headers());

            let status = response.status();
            if status != StatusCode::FORBIDDEN && status != StatusCode::TOO_MANY_REQUESTS {
                return Ok(response);
            }

            let body = response.text().await.unwrap_or_default();
            if status == StatusCode::FORBIDDEN && !body.to_ascii_lowercase().contains("rate limit")
            {
                tracing::warn!(url = %url, "Request forbidden");
                return Err(AppError::Api {
                    status: status.as_u16(),
                    url: url.to_string(),
                });
            }

            rejections += 1;
            if rejections > self.pacer.max_rate_limit_retries {
                return Err(AppError::RateLimited {
                    attempts: rejections,
                });
            }

            self.pacer.after_rate_limit_rejection(rejections).await;
        }
    }

    /// Walk `users/{username}/{relation}` until an empty page
    async fn fetch_all(&mut self, username: &str, relation: &str) -> Result<Vec<Account>, AppError> {
        let path = format!("users/{username}/{relation}");
        let mut accounts = Vec::new();
        let mut page = 1u32;

        loop {
            tracing::info!(relation, page, "Fetching {} page {}", relation, page);

            let query = [
                ("page", page.to_string()),
                ("per_page", PAGE_SIZE.to_string()),
            ];
            let response = self.send(Method::GET, &path, &query).await?;
            let response = expect_success(response)?;

            let batch: Vec<Account> = response.json().await.map_err(|e| {
                AppError::Transport(format!("invalid {relation} page {page}: {e}"))
            })?;

            if batch.is_empty() {
                break;
            }

            accounts.extend(batch);
            page += 1;

            tracing::info!(relation, collected = accounts.len(), "Collected {} so far", relation);
        }

        tracing::info!(relation, total = accounts.len(), "Finished collecting {}", relation);
        Ok(accounts)
    }
}

impl GraphClient for GitHubClient {
    async fn fetch_all_following(&mut self, username: &str) -> Result<Vec<Account>, AppError> {
        self.fetch_all(username, "following").await
    }

    async fn fetch_all_followers(&mut self, username: &str) -> Result<Vec<Account>, AppError> {
        self.fetch_all(username, "followers").await
    }

    async fn check_following(&mut self, login: &str) -> FollowState {
        let path = format!("user/following/{login}");

        match self.send(Method::GET, &path, &[]).await {
            Ok(response) if response.status() == StatusCode::NO_CONTENT => FollowState::Following,
            Ok(response) if response.status() == StatusCode::NOT_FOUND => {
                FollowState::NotFollowing
            }
            Ok(response) => {
                tracing::warn!(
                    login,
                    status = %response.status(),
                    "Follow check returned an unexpected status"
                );
                FollowState::Unknown
            }
            Err(error) => {
                tracing::warn!(login, %error, "Follow check failed");
                FollowState::Unknown
            }
        }
    }

    async fn unfollow(&mut self, login: &str) -> bool {
        let path = format!("user/following/{login}");

        match self.send(Method::DELETE, &path, &[]).await {
            Ok(response) if response.status().is_success() => {
                tracing::info!(login, "Unfollowed");
                true
            }
            Ok(response) => {
                tracing::error!(login, status = %response.status(), "Failed to unfollow");
                false
            }
            Err(error) => {
                tracing::error!(login, %error, "Failed to unfollow");
                false
            }
        }
    }
}

fn expect_success(response: Response) -> Result<Response, AppError> {
    let status = response.status();
    if status.is_success() {
        Ok(response)
    } else {
        Err(AppError::Api {
            status: status.as_u16(),
            url: response.url().to_string(),
        })
    }
}
