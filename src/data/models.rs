//! Data models
//!
//! Rust structs representing database rows and remote accounts.
//! Timestamps are chrono `DateTime<Utc>`, stored as RFC 3339 text.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// =============================================================================
// Account
// =============================================================================

/// A remote GitHub identity
///
/// `login` is the durable local key; `id` is GitHub's numeric user id.
/// Deserializes straight from GitHub user objects, ignoring the other fields.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::FromRow)]
pub struct Account {
    pub login: String,
    pub id: i64,
}

impl Account {
    pub fn new(login: impl Into<String>, id: i64) -> Self {
        Self {
            login: login.into(),
            id,
        }
    }
}

// =============================================================================
// Snapshots
// =============================================================================

/// Which snapshot table a record belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Relation {
    /// Accounts the user follows
    Following,
    /// Accounts following the user
    Followers,
}

impl Relation {
    pub fn table(self) -> &'static str {
        match self {
            Relation::Following => "following",
            Relation::Followers => "followers",
        }
    }
}

/// One row of the `following` or `followers` snapshot
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct FollowRecord {
    pub login: String,
    pub id: i64,
    /// First sync that saw this account in the relation
    pub first_seen_at: DateTime<Utc>,
    /// Most recent sync that saw this account in the relation
    pub last_updated_at: DateTime<Utc>,
}

// =============================================================================
// Ledger
// =============================================================================

/// Default ledger reason for a performed unfollow
pub const REASON_NOT_FOLLOWING_BACK: &str = "not_following_back";

/// Ledger reason when verification showed the follow was already gone
pub const REASON_ALREADY_NOT_FOLLOWING: &str = "already_not_following";

/// Ledger entry for an account that no longer needs processing
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct UnfollowedRecord {
    pub login: String,
    pub id: i64,
    pub unfollowed_at: DateTime<Utc>,
    pub reason: String,
}

// =============================================================================
// Audit trail
// =============================================================================

/// Kind of top-level operation recorded in `processing_status`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessType {
    Sync,
    UnfollowBatch,
}

impl ProcessType {
    pub fn as_str(self) -> &'static str {
        match self {
            ProcessType::Sync => "sync",
            ProcessType::UnfollowBatch => "unfollow_batch",
        }
    }
}

/// Outcome recorded for an operation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunStatus {
    Completed,
    Failed,
}

impl RunStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            RunStatus::Completed => "completed",
            RunStatus::Failed => "failed",
        }
    }
}

/// Audit row, never updated or deleted
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct ProcessingStatusEntry {
    pub id: i64,
    pub process_type: String,
    pub last_run: DateTime<Utc>,
    pub status: String,
    pub details: Option<String>,
}

// =============================================================================
// Stats
// =============================================================================

/// Aggregate counts for display
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Stats {
    pub following_count: i64,
    pub followers_count: i64,
    pub unfollowed_count: i64,
    pub to_unfollow_count: i64,
}

impl Stats {
    /// Followers per followed account; zero following counts as one
    pub fn follow_ratio(&self) -> f64 {
        self.followers_count as f64 / self.following_count.max(1) as f64
    }
}
