//! Configuration management
//!
//! Loads configuration from:
//! 1. Default values
//! 2. Configuration files (config/default.toml, config/local.toml)
//! 3. Environment variables (UNFOLLOWER__*, override)
//! 4. Plain GitHub variables (GITHUB_TOKEN, GITHUB_USERNAME, ...)

use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;

use crate::error::AppError;

/// Main application configuration
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub github: GitHubConfig,
    pub pacing: PacingConfig,
    pub batch: BatchConfig,
    pub database: DatabaseConfig,
    pub logging: LoggingConfig,
}

/// GitHub API access
#[derive(Debug, Clone, Deserialize)]
pub struct GitHubConfig {
    /// Personal access token with the `user:follow` scope
    pub token: String,
    /// Account whose following/followers are reconciled
    pub username: String,
    /// REST API base URL (e.g., "https://api.github.com")
    pub api_base: String,
    /// User-Agent header sent with every request
    pub user_agent: String,
}

/// Request and batch pacing
#[derive(Debug, Clone, Deserialize)]
pub struct PacingConfig {
    /// Fixed delay before every API request (default: 1.0)
    pub request_delay_seconds: f64,
    /// Fixed delay after every processed unfollow candidate (default: 2.0)
    pub account_delay_seconds: f64,
    /// Remaining-quota level at or below which requests wait for the reset
    pub low_quota_threshold: u32,
    /// Extra wait added after the advertised reset time
    pub reset_buffer_seconds: u64,
    /// Wait after an explicit rate-limit rejection (default: 3600)
    pub exhausted_wait_seconds: u64,
    /// How many rate-limit rejections of one request are waited out
    pub max_rate_limit_retries: u32,
}

impl PacingConfig {
    pub fn request_delay(&self) -> Duration {
        Duration::from_secs_f64(self.request_delay_seconds)
    }

    pub fn account_delay(&self) -> Duration {
        Duration::from_secs_f64(self.account_delay_seconds)
    }
}

/// Unfollow batch settings
#[derive(Debug, Clone, Deserialize)]
pub struct BatchConfig {
    /// Informational batch size, kept for parity with older setups
    pub batch_size: usize,
    /// Upper bound of candidates processed by one `--unfollow` run
    pub max_unfollows_per_run: usize,
    /// What to do when the follow check cannot be answered
    #[serde(default)]
    pub unknown_verification: UnknownPolicy,
}

/// Handling of candidates whose follow state could not be verified
#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum UnknownPolicy {
    /// Leave the candidate for a later run
    #[default]
    Skip,
    /// Attempt the unfollow anyway
    Proceed,
    /// Record the candidate as already unfollowed without a mutation
    AssumeNotFollowing,
}

/// Database configuration (SQLite only)
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    /// Path to SQLite database file
    pub path: PathBuf,
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log level: trace, debug, info, warn, error
    pub level: String,
    /// Console format: "pretty" or "json"
    pub format: String,
    /// Log file (plain text, appended)
    pub file: PathBuf,
}

/// Plain environment variables honoured on top of the prefixed ones
const LEGACY_ENV_OVERRIDES: &[(&str, &str)] = &[
    ("GITHUB_TOKEN", "github.token"),
    ("GITHUB_USERNAME", "github.username"),
    ("BATCH_SIZE", "batch.batch_size"),
    ("DELAY_BETWEEN_REQUESTS", "pacing.request_delay_seconds"),
    ("MAX_UNFOLLOWS_PER_RUN", "batch.max_unfollows_per_run"),
];

impl AppConfig {
    /// Load configuration from file and environment
    ///
    /// # Loading Order
    /// 1. Default values
    /// 2. config/default.toml (if exists)
    /// 3. config/local.toml (if exists)
    /// 4. Environment variables (UNFOLLOWER__SECTION__KEY)
    /// 5. GITHUB_TOKEN, GITHUB_USERNAME, BATCH_SIZE, DELAY_BETWEEN_REQUESTS,
    ///    MAX_UNFOLLOWS_PER_RUN
    ///
    /// # Errors
    /// Returns error if configuration is missing or invalid
    pub fn load() -> Result<Self, AppError> {
        use config::{Config, Environment, File};

        let mut builder = Config::builder()
            .set_default("github.token", "")?
            .set_default("github.username", "")?
            .set_default("github.api_base", "https://api.github.com")?
            .set_default("github.user_agent", "unfollower/0.1")?
            .set_default("pacing.request_delay_seconds", 1.0)?
            .set_default("pacing.account_delay_seconds", 2.0)?
            .set_default("pacing.low_quota_threshold", 100)?
            .set_default("pacing.reset_buffer_seconds", 60)?
            .set_default("pacing.exhausted_wait_seconds", 3600)?
            .set_default("pacing.max_rate_limit_retries", 3)?
            .set_default("batch.batch_size", 10)?
            .set_default("batch.max_unfollows_per_run", 50)?
            .set_default("batch.unknown_verification", "skip")?
            .set_default("database.path", "github_followers.db")?
            .set_default("logging.level", "info")?
            .set_default("logging.format", "pretty")?
            .set_default("logging.file", "github_unfollow.log")?
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name("config/local").required(false))
            .add_source(
                Environment::with_prefix("UNFOLLOWER")
                    .separator("__")
                    .try_parsing(true),
            );

        for (var, key) in LEGACY_ENV_OVERRIDES {
            builder = builder.set_override_option(*key, std::env::var(var).ok())?;
        }

        let app_config: Self = builder
            .build()
            .map_err(|e| AppError::Config(e.to_string()))?
            .try_deserialize()
            .map_err(|e| AppError::Config(e.to_string()))?;
        app_config.validate()?;
        Ok(app_config)
    }

    /// Parsed API base, always ending in `/` so relative joins keep its path
    pub fn api_base_url(&self) -> Result<url::Url, AppError> {
        parse_api_base(&self.github.api_base)
    }

    /// Check the settings every action needs
    ///
    /// Credentials are not required here; see [`AppConfig::validate_remote`].
    fn validate(&self) -> Result<(), AppError> {
        self.api_base_url()?;

        for (name, value) in [
            ("pacing.request_delay_seconds", self.pacing.request_delay_seconds),
            ("pacing.account_delay_seconds", self.pacing.account_delay_seconds),
        ] {
            if !value.is_finite() || value < 0.0 {
                return Err(AppError::Config(format!(
                    "{name} must be a non-negative number of seconds"
                )));
            }
        }

        if self.batch.max_unfollows_per_run == 0 {
            return Err(AppError::Config(
                "batch.max_unfollows_per_run must be greater than 0".to_string(),
            ));
        }

        if !matches!(self.logging.format.as_str(), "pretty" | "json") {
            return Err(AppError::Config(format!(
                "logging.format must be \"pretty\" or \"json\", got \"{}\"",
                self.logging.format
            )));
        }

        Ok(())
    }

    /// Check the settings needed to talk to the GitHub API
    ///
    /// Only actions that contact GitHub call this, so local actions work
    /// without a token.
    pub fn validate_remote(&self) -> Result<(), AppError> {
        if self.github.token.trim().is_empty() {
            return Err(AppError::Config(
                "github.token is required (set GITHUB_TOKEN)".to_string(),
            ));
        }

        if self.github.username.trim().is_empty() {
            return Err(AppError::Config(
                "github.username is required (set GITHUB_USERNAME)".to_string(),
            ));
        }

        Ok(())
    }
}

pub(crate) fn parse_api_base(raw: &str) -> Result<url::Url, AppError> {
    let trimmed = raw.trim();
    let with_slash = if trimmed.ends_with('/') {
        trimmed.to_string()
    } else {
        format!("{trimmed}/")
    };

    let parsed = url::Url::parse(&with_slash)
        .map_err(|e| AppError::Config(format!("github.api_base is not a valid URL: {e}")))?;

    if !matches!(parsed.scheme(), "http" | "https") {
        return Err(AppError::Config(format!(
            "github.api_base must use http or https, got {}",
            parsed.scheme()
        )));
    }

    Ok(parsed)
}
