//! Batch reconciler
//!
//! Pulls the remote following/follower sets into the store and unfollows
//! accounts that do not follow back, one at a time, recording each outcome
//! in the ledger and each run in the audit trail.

use std::collections::HashSet;
use std::sync::Arc;

use crate::config::UnknownPolicy;
use crate::data::{
    Account, Database, ProcessType, REASON_ALREADY_NOT_FOLLOWING, REASON_NOT_FOLLOWING_BACK,
    RunStatus,
};
use crate::error::AppError;
use crate::github::{FollowState, GraphClient, Pacer};

/// Per-run behaviour of the unfollow batch
#[derive(Debug, Clone, Copy, Default)]
pub struct BatchOptions {
    pub unknown_policy: UnknownPolicy,
}

/// Result of a successful sync
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SyncReport {
    pub following: usize,
    pub followers: usize,
}

/// Counters of one unfollow batch
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BatchReport {
    /// Candidates read from the store
    pub candidates: usize,
    /// Unfollow mutations that succeeded
    pub unfollowed: usize,
    /// Unfollow mutations that failed
    pub failed: usize,
    /// Candidates already not followed, recorded without a mutation
    pub already_resolved: usize,
    /// Candidates left alone because verification was inconclusive
    pub skipped: usize,
}

impl BatchReport {
    fn details(&self) -> String {
        format!(
            "Unfollowed: {}, Failed: {}, Already resolved: {}, Skipped: {}",
            self.unfollowed, self.failed, self.already_resolved, self.skipped
        )
    }
}

/// Orchestrates sync and unfollow batches
pub struct Reconciler<C: GraphClient> {
    client: C,
    db: Arc<Database>,
    pacer: Arc<Pacer>,
    username: String,
    options: BatchOptions,
}

impl<C: GraphClient> Reconciler<C> {
    /// Create new reconciler
    ///
    /// # Arguments
    /// * `client` - Remote graph client (owned, it carries rate-limit state)
    /// * `db` - Local store
    /// * `pacer` - Pacing policy, the same one the client uses
    /// * `username` - Account whose relations are reconciled
    pub fn new(
        client: C,
        db: Arc<Database>,
        pacer: Arc<Pacer>,
        username: impl Into<String>,
        options: BatchOptions,
    ) -> Self {
        Self {
            client,
            db,
            pacer,
            username: username.into(),
            options,
        }
    }

    pub fn client(&self) -> &C {
        &self.client
    }

    pub fn client_mut(&mut self) -> &mut C {
        &mut self.client
    }

    /// Refresh both snapshots from the remote side
    ///
    /// Both sets are fetched before anything is written, then both tables
    /// are replaced in one transaction. Any failure records a failed audit
    /// row and is returned to the caller.
    pub async fn sync(&mut self) -> Result<SyncReport, AppError> {
        tracing::info!(username = %self.username, "Starting sync of followers and following lists");

        match self.sync_inner().await {
            Ok(report) => {
                let details = format!(
                    "Following: {}, Followers: {}",
                    report.following, report.followers
                );
                self.db
                    .record_status(ProcessType::Sync, RunStatus::Completed, Some(&details))
                    .await?;
                tracing::info!(
                    following = report.following,
                    followers = report.followers,
                    "Sync completed"
                );
                Ok(report)
            }
            Err(error) => {
                tracing::error!(%error, "Sync failed");
                self.record_failure(ProcessType::Sync, &error).await;
                Err(error)
            }
        }
    }

    async fn sync_inner(&mut self) -> Result<SyncReport, AppError> {
        tracing::info!("Fetching accounts being followed...");
        let following = dedupe_by_login(self.client.fetch_all_following(&self.username).await?);

        tracing::info!("Fetching followers...");
        let followers = dedupe_by_login(self.client.fetch_all_followers(&self.username).await?);

        self.db.replace_snapshots(&following, &followers).await?;

        Ok(SyncReport {
            following: following.len(),
            followers: followers.len(),
        })
    }

    /// Candidates the next batch would process, without touching the remote
    pub async fn preview(&self, max_count: usize) -> Result<Vec<Account>, AppError> {
        self.db.candidates_to_unfollow(Some(max_count)).await
    }

    /// Verify and unfollow up to `max_count` candidates
    ///
    /// Per-candidate remote failures are counted, never raised. A store
    /// failure aborts the batch with a failed audit row; ledger rows written
    /// before the failure stay.
    pub async fn unfollow_batch(&mut self, max_count: usize) -> Result<BatchReport, AppError> {
        tracing::info!(max = max_count, "Starting unfollow batch");

        let candidates = match self.db.candidates_to_unfollow(Some(max_count)).await {
            Ok(candidates) => candidates,
            Err(error) => {
                tracing::error!(%error, "Unfollow batch failed");
                self.record_failure(ProcessType::UnfollowBatch, &error).await;
                return Err(error);
            }
        };

        if candidates.is_empty() {
            tracing::info!("No accounts to unfollow");
            return Ok(BatchReport::default());
        }

        let mut report = BatchReport {
            candidates: candidates.len(),
            ..BatchReport::default()
        };

        for account in &candidates {
            if let Err(error) = self.process_candidate(account, &mut report).await {
                tracing::error!(login = %account.login, %error, "Unfollow batch failed");
                self.record_failure(ProcessType::UnfollowBatch, &error).await;
                return Err(error);
            }

            self.pacer.between_accounts().await;
        }

        let details = report.details();
        self.db
            .record_status(ProcessType::UnfollowBatch, RunStatus::Completed, Some(&details))
            .await?;

        tracing::info!(
            unfollowed = report.unfollowed,
            failed = report.failed,
            already_resolved = report.already_resolved,
            skipped = report.skipped,
            "Unfollow batch completed"
        );
        Ok(report)
    }

    async fn process_candidate(
        &mut self,
        account: &Account,
        report: &mut BatchReport,
    ) -> Result<(), AppError> {
        let login = account.login.as_str();
        tracing::info!(login, "Attempting to unfollow");

        let state = match self.client.check_following(login).await {
            FollowState::Unknown => match self.options.unknown_policy {
                UnknownPolicy::Skip => {
                    tracing::warn!(login, "Could not verify follow state, skipping");
                    report.skipped += 1;
                    return Ok(());
                }
                UnknownPolicy::Proceed => {
                    tracing::warn!(login, "Could not verify follow state, unfollowing anyway");
                    FollowState::Following
                }
                UnknownPolicy::AssumeNotFollowing => {
                    tracing::warn!(
                        login,
                        "Could not verify follow state, assuming already unfollowed"
                    );
                    FollowState::NotFollowing
                }
            },
            known => known,
        };

        if state == FollowState::NotFollowing {
            tracing::info!(login, "Already not following, marking as unfollowed");
            self.db
                .record_unfollowed(account, REASON_ALREADY_NOT_FOLLOWING)
                .await?;
            report.already_resolved += 1;
            return Ok(());
        }

        if self.client.unfollow(login).await {
            self.db
                .record_unfollowed(account, REASON_NOT_FOLLOWING_BACK)
                .await?;
            report.unfollowed += 1;
        } else {
            report.failed += 1;
        }

        Ok(())
    }

    /// Audit a failed run; a failure to write the row is only logged
    async fn record_failure(&self, process_type: ProcessType, error: &AppError) {
        let details = error.to_string();
        if let Err(status_error) = self
            .db
            .record_status(process_type, RunStatus::Failed, Some(&details))
            .await
        {
            tracing::error!(
                process = process_type.as_str(),
                error = %status_error,
                "Failed to record processing status"
            );
        }
    }
}

/// Drop repeated logins, keeping the first occurrence
///
/// Pages can overlap when the remote list changes mid-walk.
fn dedupe_by_login(accounts: Vec<Account>) -> Vec<Account> {
    let mut seen = HashSet::new();
    let total = accounts.len();

    let unique: Vec<Account> = accounts
        .into_iter()
        .filter(|account| seen.insert(account.login.clone()))
        .collect();

    if unique.len() != total {
        tracing::debug!(
            dropped = total - unique.len(),
            "Dropped duplicate accounts from paginated listing"
        );
    }

    unique
}
