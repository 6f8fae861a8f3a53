//! Command-line interface
//!
//! Flags are combinable; they run in a fixed order regardless of how they
//! are given (see [`Cli::has_action`] and `main`).

use clap::Parser;

use crate::config::AppConfig;
use crate::data::{Account, ProcessingStatusEntry, Stats};
use crate::error::AppError;
use crate::github::RateLimitStatus;

/// Logins shown by a dry run before truncating
const DRY_RUN_PREVIEW: usize = 10;

/// Unfollow GitHub accounts that do not follow you back
#[derive(Debug, Parser)]
#[command(name = "unfollower")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Refresh the following and followers snapshots from GitHub
    #[arg(long)]
    pub sync: bool,

    /// Unfollow accounts that do not follow back
    #[arg(long)]
    pub unfollow: bool,

    /// Show statistics
    #[arg(long)]
    pub stats: bool,

    /// Show who would be unfollowed without unfollowing
    #[arg(long)]
    pub dry_run: bool,

    /// Show the current API quota
    #[arg(long)]
    pub rate_limit: bool,

    /// Show the most recent runs
    #[arg(long, value_name = "N", num_args = 0..=1, default_missing_value = "10")]
    pub history: Option<usize>,

    /// Remove a login from the unfollowed ledger (repeatable)
    #[arg(long, value_name = "LOGIN")]
    pub forget: Vec<String>,

    /// Empty the unfollowed ledger
    #[arg(long)]
    pub forget_all: bool,

    /// Override the maximum number of unfollows for this run
    #[arg(long, value_name = "N")]
    pub max: Option<usize>,
}

impl Cli {
    /// Whether any flag asks for work to be done
    pub fn has_action(&self) -> bool {
        self.sync
            || self.unfollow
            || self.stats
            || self.dry_run
            || self.rate_limit
            || self.history.is_some()
            || !self.forget.is_empty()
            || self.forget_all
    }

    /// Whether the GitHub API will be contacted
    pub fn needs_remote(&self) -> bool {
        self.sync || self.rate_limit || (self.unfollow && !self.dry_run)
    }

    /// Check `config` for the requested actions
    ///
    /// GitHub credentials are only demanded when the API will be contacted.
    pub fn check_config(&self, config: &AppConfig) -> Result<(), AppError> {
        if self.needs_remote() {
            config.validate_remote()?;
        }
        Ok(())
    }
}

/// Statistics banner
pub fn render_stats(stats: &Stats) -> String {
    let rule = "=".repeat(50);
    format!(
        "\n{rule}\nGitHub Follower Statistics\n{rule}\n\
         Following: {}\n\
         Followers: {}\n\
         Users to unfollow: {}\n\
         Already unfollowed: {}\n\
         Follow ratio: {}/{} = {:.2}%\n\
         {rule}\n",
        stats.following_count,
        stats.followers_count,
        stats.to_unfollow_count,
        stats.unfollowed_count,
        stats.followers_count,
        stats.following_count,
        stats.follow_ratio() * 100.0,
    )
}

/// Dry-run listing, truncated after the first few logins
pub fn render_dry_run(candidates: &[Account]) -> String {
    let mut out = format!("\nDRY RUN: Would unfollow {} users:\n", candidates.len());

    for account in candidates.iter().take(DRY_RUN_PREVIEW) {
        out.push_str(&format!("  - {}\n", account.login));
    }

    if candidates.len() > DRY_RUN_PREVIEW {
        out.push_str(&format!(
            "  ... and {} more\n",
            candidates.len() - DRY_RUN_PREVIEW
        ));
    }

    out
}

pub fn render_history(entries: &[ProcessingStatusEntry]) -> String {
    if entries.is_empty() {
        return "\nNo runs recorded yet\n".to_string();
    }

    let mut out = String::from("\nRecent runs:\n");
    for entry in entries {
        out.push_str(&format!(
            "  {}  {:<15} {:<10} {}\n",
            entry.last_run.format("%Y-%m-%d %H:%M:%S"),
            entry.process_type,
            entry.status,
            entry.details.as_deref().unwrap_or("")
        ));
    }
    out
}

pub fn render_rate_limit(status: &RateLimitStatus) -> String {
    let core = &status.core;
    let reset = core
        .reset_at()
        .map(|at| at.format("%Y-%m-%d %H:%M:%S UTC").to_string())
        .unwrap_or_else(|| core.reset.to_string());

    format!(
        "\nAPI quota: {}/{} remaining ({} used), resets at {}\n",
        core.remaining, core.limit, core.used, reset
    )
}
