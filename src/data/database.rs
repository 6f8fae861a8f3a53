//! SQLite database operations
//!
//! All database access goes through this module.
//! Uses SQLx with embedded migrations.

use chrono::{DateTime, Utc};
use sqlx::{Pool, Sqlite, SqlitePool, Transaction};
use std::collections::HashMap;
use std::path::Path;

use super::models::*;
use crate::error::AppError;

/// Candidate query shared by the listing and the count.
///
/// Accounts in `following` that are neither in `followers` nor in the ledger.
const CANDIDATES_FROM: &str = r#"
    FROM following f
    LEFT JOIN followers fo ON f.login = fo.login
    LEFT JOIN unfollowed u ON f.login = u.login
    WHERE fo.login IS NULL
    AND u.login IS NULL
"#;

/// Database connection pool wrapper.
pub struct Database {
    pool: Pool<Sqlite>,
}

impl Database {
    /// Connect to the SQLite database
    ///
    /// Creates the database file if it doesn't exist.
    /// Runs pending migrations automatically.
    ///
    /// # Arguments
    /// * `path` - Path to SQLite database file
    ///
    /// # Errors
    /// Returns error if connection or migration fails
    pub async fn connect(path: &Path) -> Result<Self, AppError> {
        // Create parent directory if it doesn't exist
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)
                    .map_err(|e| AppError::Database(sqlx::Error::Io(e)))?;
            }
        }

        let connection_string = format!("sqlite:{}?mode=rwc", path.display());
        let pool = SqlitePool::connect(&connection_string).await?;

        sqlx::migrate!("./migrations")
            .run(&pool)
            .await
            .map_err(|e| {
                tracing::error!("Migration failed: {}", e);
                AppError::Migration(e.to_string())
            })?;

        tracing::info!(path = %path.display(), "Database connected and migrated successfully");

        Ok(Self { pool })
    }

    /// Underlying pool, for tests that need raw SQL
    #[cfg(test)]
    pub(crate) fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    // =========================================================================
    // Snapshots
    // =========================================================================

    /// Replace the `following` snapshot
    pub async fn replace_following(&self, accounts: &[Account]) -> Result<(), AppError> {
        let mut tx = self.pool.begin().await?;
        replace_relation(&mut tx, Relation::Following, accounts).await?;
        tx.commit().await?;
        Ok(())
    }

    /// Replace the `followers` snapshot
    pub async fn replace_followers(&self, accounts: &[Account]) -> Result<(), AppError> {
        let mut tx = self.pool.begin().await?;
        replace_relation(&mut tx, Relation::Followers, accounts).await?;
        tx.commit().await?;
        Ok(())
    }

    /// Replace both snapshots in one transaction
    ///
    /// Either both tables hold the new snapshot or both keep their prior
    /// contents.
    pub async fn replace_snapshots(
        &self,
        following: &[Account],
        followers: &[Account],
    ) -> Result<(), AppError> {
        let mut tx = self.pool.begin().await?;
        replace_relation(&mut tx, Relation::Following, following).await?;
        replace_relation(&mut tx, Relation::Followers, followers).await?;
        tx.commit().await?;
        Ok(())
    }

    /// Current `following` snapshot ordered by login
    pub async fn following(&self) -> Result<Vec<FollowRecord>, AppError> {
        self.relation_records(Relation::Following).await
    }

    /// Current `followers` snapshot ordered by login
    pub async fn followers(&self) -> Result<Vec<FollowRecord>, AppError> {
        self.relation_records(Relation::Followers).await
    }

    async fn relation_records(&self, relation: Relation) -> Result<Vec<FollowRecord>, AppError> {
        let query = format!(
            "SELECT login, id, first_seen_at, last_updated_at FROM {} ORDER BY login ASC",
            relation.table()
        );
        let records = sqlx::query_as::<_, FollowRecord>(&query)
            .fetch_all(&self.pool)
            .await?;

        Ok(records)
    }

    // =========================================================================
    // Candidates
    // =========================================================================

    /// Accounts followed that do not follow back and are not in the ledger
    ///
    /// Ordered by login so a dry run and a live run see the same prefix.
    ///
    /// # Arguments
    /// * `limit` - Maximum number of accounts; `None` returns all
    pub async fn candidates_to_unfollow(
        &self,
        limit: Option<usize>,
    ) -> Result<Vec<Account>, AppError> {
        let query = format!("SELECT f.login, f.id {CANDIDATES_FROM} ORDER BY f.login ASC LIMIT ?");
        // SQLite treats a negative LIMIT as unbounded
        let limit = limit.map(|l| l as i64).unwrap_or(-1);

        let accounts = sqlx::query_as::<_, Account>(&query)
            .bind(limit)
            .fetch_all(&self.pool)
            .await?;

        Ok(accounts)
    }

    // =========================================================================
    // Ledger
    // =========================================================================

    /// Record an account as unfollowed
    ///
    /// Idempotent: a second call for the same login keeps the original
    /// `unfollowed_at` and refreshes `id` and `reason`.
    pub async fn record_unfollowed(&self, account: &Account, reason: &str) -> Result<(), AppError> {
        sqlx::query(
            r#"
            INSERT INTO unfollowed (login, id, unfollowed_at, reason)
            VALUES (?, ?, ?, ?)
            ON CONFLICT(login) DO UPDATE SET
                id = excluded.id,
                reason = excluded.reason
            "#,
        )
        .bind(&account.login)
        .bind(account.id)
        .bind(Utc::now())
        .bind(reason)
        .execute(&self.pool)
        .await?;

        tracing::info!(login = %account.login, reason, "Marked as unfollowed");
        Ok(())
    }

    /// Check whether a login is in the ledger
    pub async fn is_unfollowed(&self, login: &str) -> Result<bool, AppError> {
        let exists = sqlx::query_scalar::<_, i64>(
            "SELECT EXISTS(SELECT 1 FROM unfollowed WHERE login = ?)",
        )
        .bind(login)
        .fetch_one(&self.pool)
        .await?;

        Ok(exists != 0)
    }

    /// Get a ledger entry
    pub async fn get_unfollowed(&self, login: &str) -> Result<Option<UnfollowedRecord>, AppError> {
        let record = sqlx::query_as::<_, UnfollowedRecord>(
            "SELECT login, id, unfollowed_at, reason FROM unfollowed WHERE login = ?",
        )
        .bind(login)
        .fetch_optional(&self.pool)
        .await?;

        Ok(record)
    }

    /// Remove one ledger entry so the account can be selected again
    ///
    /// # Returns
    /// Whether an entry existed
    pub async fn forget_unfollowed(&self, login: &str) -> Result<bool, AppError> {
        let result = sqlx::query("DELETE FROM unfollowed WHERE login = ?")
            .bind(login)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Remove every ledger entry
    ///
    /// # Returns
    /// Number of entries removed
    pub async fn clear_unfollowed(&self) -> Result<u64, AppError> {
        let result = sqlx::query("DELETE FROM unfollowed")
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected())
    }

    // =========================================================================
    // Audit trail
    // =========================================================================

    /// Append an audit row
    pub async fn record_status(
        &self,
        process_type: ProcessType,
        status: RunStatus,
        details: Option<&str>,
    ) -> Result<(), AppError> {
        sqlx::query(
            "INSERT INTO processing_status (process_type, last_run, status, details) VALUES (?, ?, ?, ?)",
        )
        .bind(process_type.as_str())
        .bind(Utc::now())
        .bind(status.as_str())
        .bind(details)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Most recent audit rows, newest first
    pub async fn recent_status(&self, limit: usize) -> Result<Vec<ProcessingStatusEntry>, AppError> {
        let entries = sqlx::query_as::<_, ProcessingStatusEntry>(
            r#"
            SELECT id, process_type, last_run, status, details
            FROM processing_status
            ORDER BY id DESC
            LIMIT ?
            "#,
        )
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await?;

        Ok(entries)
    }

    // =========================================================================
    // Stats
    // =========================================================================

    /// Aggregate counts; each is an independent query
    pub async fn stats(&self) -> Result<Stats, AppError> {
        let following_count = self.count("SELECT COUNT(*) FROM following").await?;
        let followers_count = self.count("SELECT COUNT(*) FROM followers").await?;
        let unfollowed_count = self.count("SELECT COUNT(*) FROM unfollowed").await?;
        let to_unfollow_count = self
            .count(&format!("SELECT COUNT(*) {CANDIDATES_FROM}"))
            .await?;

        Ok(Stats {
            following_count,
            followers_count,
            unfollowed_count,
            to_unfollow_count,
        })
    }

    async fn count(&self, query: &str) -> Result<i64, AppError> {
        let count = sqlx::query_scalar::<_, i64>(query)
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }
}

/// Clear and repopulate one snapshot table inside `tx`
///
/// `first_seen_at` survives for logins already present. Nothing is visible
/// until the caller commits; dropping `tx` on error rolls the table back.
async fn replace_relation(
    tx: &mut Transaction<'_, Sqlite>,
    relation: Relation,
    accounts: &[Account],
) -> Result<(), AppError> {
    let table = relation.table();
    let now = Utc::now();

    let select_previous = format!("SELECT login, first_seen_at FROM {table}");
    let previous: HashMap<String, DateTime<Utc>> =
        sqlx::query_as::<_, (String, DateTime<Utc>)>(&select_previous)
            .fetch_all(&mut **tx)
            .await?
            .into_iter()
            .collect();

    let delete = format!("DELETE FROM {table}");
    sqlx::query(&delete).execute(&mut **tx).await?;

    let insert = format!(
        "INSERT INTO {table} (login, id, first_seen_at, last_updated_at) VALUES (?, ?, ?, ?)"
    );
    for account in accounts {
        let first_seen_at = previous.get(&account.login).copied().unwrap_or(now);
        sqlx::query(&insert)
            .bind(&account.login)
            .bind(account.id)
            .bind(first_seen_at)
            .bind(now)
            .execute(&mut **tx)
            .await?;
    }

    tracing::info!(
        table,
        count = accounts.len(),
        "Replaced {} snapshot",
        table
    );
    Ok(())
}
