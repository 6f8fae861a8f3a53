//! Error types for Unfollower
//!
//! All fallible operations return `AppError`. Failures that only affect a
//! single candidate (verification, unfollow) are absorbed by the reconciler
//! and never surface as `AppError`.

use thiserror::Error;

/// Application-wide error type
#[derive(Debug, Error)]
pub enum AppError {
    /// Request could not be completed (connection, TLS, body decoding)
    #[error("Transport error: {0}")]
    Transport(String),

    /// HTTP client error
    #[error("HTTP client error: {0}")]
    HttpClient(#[from] reqwest::Error),

    /// Remote API answered with an unexpected status
    #[error("GitHub API returned HTTP {status} for {url}")]
    Api { status: u16, url: String },

    /// Quota still exhausted after the configured number of waits
    #[error("Rate limit still exhausted after {attempts} attempts")]
    RateLimited { attempts: u32 },

    /// Database error
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Schema migration failed
    #[error("Migration failed: {0}")]
    Migration(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl AppError {
    /// True for failures talking to the remote API.
    pub fn is_transport(&self) -> bool {
        matches!(
            self,
            AppError::Transport(_)
                | AppError::HttpClient(_)
                | AppError::Api { .. }
                | AppError::RateLimited { .. }
        )
    }

    /// True for local store failures.
    pub fn is_persistence(&self) -> bool {
        matches!(self, AppError::Database(_) | AppError::Migration(_))
    }

    /// Short label for log fields
    pub fn kind(&self) -> &'static str {
        if self.is_transport() {
            "remote"
        } else if self.is_persistence() {
            "store"
        } else {
            "local"
        }
    }
}

impl From<config::ConfigError> for AppError {
    fn from(err: config::ConfigError) -> Self {
        AppError::Config(err.to_string())
    }
}
