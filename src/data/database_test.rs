//! Database tests

use super::*;
use tempfile::TempDir;

/// Helper to create a test database
async fn create_test_db() -> (Database, TempDir) {
    let temp_dir = TempDir::new().unwrap();
    let db_path = temp_dir.path().join("test.db");
    let db = Database::connect(&db_path).await.unwrap();
    (db, temp_dir)
}

fn accounts(logins: &[&str]) -> Vec<Account> {
    logins
        .iter()
        .enumerate()
        .map(|(i, login)| Account::new(*login, i as i64 + 1))
        .collect()
}

fn logins(accounts: &[Account]) -> Vec<&str> {
    accounts.iter().map(|a| a.login.as_str()).collect()
}

#[tokio::test]
async fn test_database_connection() {
    let (db, _temp_dir) = create_test_db().await;
    let stats = db.stats().await.unwrap();
    assert_eq!(stats, Stats::default());
}

#[tokio::test]
async fn test_connect_creates_parent_directory() {
    let temp_dir = TempDir::new().unwrap();
    let db_path = temp_dir.path().join("nested").join("state").join("test.db");

    let _db = Database::connect(&db_path).await.unwrap();
    assert!(db_path.exists());
}

#[tokio::test]
async fn test_candidates_are_following_minus_followers() {
    let (db, _temp_dir) = create_test_db().await;

    db.replace_following(&accounts(&["carol", "alice", "bob"]))
        .await
        .unwrap();
    db.replace_followers(&accounts(&["bob"])).await.unwrap();

    let candidates = db.candidates_to_unfollow(None).await.unwrap();
    assert_eq!(logins(&candidates), vec!["alice", "carol"]);
}

#[tokio::test]
async fn test_candidates_exclude_ledger_and_ignore_insertion_order() {
    let (db, _temp_dir) = create_test_db().await;

    db.replace_following(&accounts(&["zed", "mia", "ann", "kim", "bob"]))
        .await
        .unwrap();
    db.replace_followers(&accounts(&["kim", "unrelated"]))
        .await
        .unwrap();
    db.record_unfollowed(&Account::new("mia", 99), REASON_NOT_FOLLOWING_BACK)
        .await
        .unwrap();

    let candidates = db.candidates_to_unfollow(None).await.unwrap();
    assert_eq!(logins(&candidates), vec!["ann", "bob", "zed"]);

    let limited = db.candidates_to_unfollow(Some(2)).await.unwrap();
    assert_eq!(logins(&limited), vec!["ann", "bob"]);

    let none = db.candidates_to_unfollow(Some(0)).await.unwrap();
    assert!(none.is_empty());
}

#[tokio::test]
async fn test_replace_is_full_snapshot() {
    let (db, _temp_dir) = create_test_db().await;

    db.replace_following(&accounts(&["alice", "bob"]))
        .await
        .unwrap();
    db.replace_following(&accounts(&["carol"])).await.unwrap();

    let following = db.following().await.unwrap();
    assert_eq!(following.len(), 1);
    assert_eq!(following[0].login, "carol");
}

#[tokio::test]
async fn test_replace_keeps_first_seen_for_known_logins() {
    let (db, _temp_dir) = create_test_db().await;

    db.replace_followers(&accounts(&["alice"])).await.unwrap();
    let first = db.followers().await.unwrap();

    tokio::time::sleep(std::time::Duration::from_millis(20)).await;
    db.replace_followers(&accounts(&["alice", "bob"]))
        .await
        .unwrap();
    let second = db.followers().await.unwrap();

    assert_eq!(second.len(), 2);
    assert_eq!(second[0].login, "alice");
    assert_eq!(second[0].first_seen_at, first[0].first_seen_at);
    assert!(second[0].last_updated_at > first[0].last_updated_at);
    assert_eq!(second[1].first_seen_at, second[1].last_updated_at);
}

#[tokio::test]
async fn test_failed_replace_leaves_prior_snapshot() {
    let (db, _temp_dir) = create_test_db().await;

    db.replace_following(&accounts(&["alice", "bob"]))
        .await
        .unwrap();

    // Duplicate login violates the primary key halfway through the insert
    let broken = vec![
        Account::new("carol", 3),
        Account::new("dave", 4),
        Account::new("carol", 3),
    ];
    let result = db.replace_following(&broken).await;
    assert!(matches!(result, Err(crate::error::AppError::Database(_))));

    let following = db.following().await.unwrap();
    let remaining: Vec<&str> = following.iter().map(|r| r.login.as_str()).collect();
    assert_eq!(remaining, vec!["alice", "bob"]);
}

#[tokio::test]
async fn test_record_unfollowed_is_idempotent() {
    let (db, _temp_dir) = create_test_db().await;

    db.replace_following(&accounts(&["alice", "bob"]))
        .await
        .unwrap();

    let alice = Account::new("alice", 1);
    db.record_unfollowed(&alice, REASON_NOT_FOLLOWING_BACK)
        .await
        .unwrap();
    let first = db.get_unfollowed("alice").await.unwrap().unwrap();

    db.record_unfollowed(&alice, REASON_ALREADY_NOT_FOLLOWING)
        .await
        .unwrap();
    let second = db.get_unfollowed("alice").await.unwrap().unwrap();

    let stats = db.stats().await.unwrap();
    assert_eq!(stats.unfollowed_count, 1);
    assert_eq!(second.unfollowed_at, first.unfollowed_at);
    assert_eq!(second.reason, REASON_ALREADY_NOT_FOLLOWING);
    assert!(db.is_unfollowed("alice").await.unwrap());

    let candidates = db.candidates_to_unfollow(None).await.unwrap();
    assert_eq!(logins(&candidates), vec!["bob"]);
}

#[tokio::test]
async fn test_ledger_survives_resync() {
    let (db, _temp_dir) = create_test_db().await;

    db.record_unfollowed(&Account::new("alice", 1), REASON_NOT_FOLLOWING_BACK)
        .await
        .unwrap();

    // Re-followed upstream and synced again
    db.replace_following(&accounts(&["alice"])).await.unwrap();
    db.replace_followers(&[]).await.unwrap();

    assert!(db.candidates_to_unfollow(None).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_forget_makes_account_a_candidate_again() {
    let (db, _temp_dir) = create_test_db().await;

    db.replace_following(&accounts(&["alice", "bob"]))
        .await
        .unwrap();
    db.record_unfollowed(&Account::new("alice", 1), REASON_NOT_FOLLOWING_BACK)
        .await
        .unwrap();
    db.record_unfollowed(&Account::new("bob", 2), REASON_NOT_FOLLOWING_BACK)
        .await
        .unwrap();

    assert!(db.forget_unfollowed("alice").await.unwrap());
    assert!(!db.forget_unfollowed("alice").await.unwrap());

    let candidates = db.candidates_to_unfollow(None).await.unwrap();
    assert_eq!(logins(&candidates), vec!["alice"]);

    assert_eq!(db.clear_unfollowed().await.unwrap(), 1);
    let candidates = db.candidates_to_unfollow(None).await.unwrap();
    assert_eq!(logins(&candidates), vec!["alice", "bob"]);
}

#[tokio::test]
async fn test_status_rows_are_appended() {
    let (db, _temp_dir) = create_test_db().await;

    db.record_status(
        ProcessType::Sync,
        RunStatus::Completed,
        Some("Following: 3, Followers: 1"),
    )
    .await
    .unwrap();
    db.record_status(ProcessType::UnfollowBatch, RunStatus::Failed, None)
        .await
        .unwrap();

    let entries = db.recent_status(10).await.unwrap();
    assert_eq!(entries.len(), 2);
    assert_eq!(entries[0].process_type, "unfollow_batch");
    assert_eq!(entries[0].status, "failed");
    assert_eq!(entries[0].details, None);
    assert_eq!(entries[1].process_type, "sync");
    assert_eq!(entries[1].status, "completed");
    assert_eq!(
        entries[1].details.as_deref(),
        Some("Following: 3, Followers: 1")
    );

    let latest = db.recent_status(1).await.unwrap();
    assert_eq!(latest.len(), 1);
    assert_eq!(latest[0].id, entries[0].id);
}

#[tokio::test]
async fn test_stats_counts() {
    let (db, _temp_dir) = create_test_db().await;

    db.replace_following(&accounts(&["alice", "bob", "carol", "dave"]))
        .await
        .unwrap();
    db.replace_followers(&accounts(&["bob", "erin"]))
        .await
        .unwrap();
    db.record_unfollowed(&Account::new("carol", 3), REASON_NOT_FOLLOWING_BACK)
        .await
        .unwrap();

    let stats = db.stats().await.unwrap();
    assert_eq!(
        stats,
        Stats {
            following_count: 4,
            followers_count: 2,
            unfollowed_count: 1,
            to_unfollow_count: 2,
        }
    );
    assert_eq!(stats.follow_ratio(), 0.5);
}

#[tokio::test]
async fn test_replace_snapshots_is_all_or_nothing() {
    let (db, _temp_dir) = create_test_db().await;

    db.replace_snapshots(&accounts(&["alice"]), &[])
        .await
        .unwrap();

    sqlx::query(
        "CREATE TRIGGER reject_followers BEFORE INSERT ON followers \
         BEGIN SELECT RAISE(ABORT, 'disk full'); END",
    )
    .execute(db.pool())
    .await
    .unwrap();

    let result = db
        .replace_snapshots(&accounts(&["alice", "carol"]), &accounts(&["carol"]))
        .await;
    assert!(matches!(result, Err(crate::error::AppError::Database(_))));

    let following = db.following().await.unwrap();
    let remaining: Vec<&str> = following.iter().map(|r| r.login.as_str()).collect();
    assert_eq!(remaining, vec!["alice"]);

    let candidates = db.candidates_to_unfollow(None).await.unwrap();
    assert_eq!(logins(&candidates), vec!["alice"]);
}
