//! Common test utilities for E2E tests
//!
//! A `wiremock` server stands in for the GitHub REST API.

#![allow(dead_code)]

use serde_json::{Value, json};
use std::sync::Arc;
use tempfile::TempDir;
use unfollower::config::GitHubConfig;
use unfollower::data::Database;
use unfollower::github::{GitHubClient, Pacer};
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

pub const USERNAME: &str = "octocat";
pub const TOKEN: &str = "ghp_test_token";

/// GitHub user objects for `logins`, ids counting up from `first_id`
pub fn users_json(logins: &[&str], first_id: i64) -> Value {
    Value::Array(
        logins
            .iter()
            .enumerate()
            .map(|(i, login)| {
                json!({
                    "login": login,
                    "id": first_id + i as i64,
                    "type": "User",
                    "site_admin": false
                })
            })
            .collect(),
    )
}

/// `count` generated logins with a common prefix
pub fn generated_logins(prefix: &str, count: usize) -> Vec<String> {
    (0..count).map(|i| format!("{prefix}{i:03}")).collect()
}

/// Serve `pages` for `users/{USERNAME}/{relation}`, followed by an empty page
pub async fn mount_pages(server: &MockServer, relation: &str, pages: &[Vec<&str>]) {
    let route = format!("/users/{USERNAME}/{relation}");
    let mut next_id = 1;

    for (i, page) in pages.iter().enumerate() {
        Mock::given(method("GET"))
            .and(path(route.as_str()))
            .and(query_param("page", (i + 1).to_string()))
            .and(query_param("per_page", "100"))
            .respond_with(ResponseTemplate::new(200).set_body_json(users_json(page, next_id)))
            .mount(server)
            .await;
        next_id += page.len() as i64;
    }

    Mock::given(method("GET"))
        .and(path(route.as_str()))
        .and(query_param("page", (pages.len() + 1).to_string()))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .expect(1)
        .mount(server)
        .await;
}

/// Answer `GET /user/following/{login}` with `status`
pub async fn mount_follow_check(server: &MockServer, login: &str, status: u16) {
    Mock::given(method("GET"))
        .and(path(format!("/user/following/{login}")))
        .respond_with(ResponseTemplate::new(status))
        .mount(server)
        .await;
}

/// Answer `DELETE /user/following/{login}` with `status`, expecting `calls` requests
pub async fn mount_unfollow(server: &MockServer, login: &str, status: u16, calls: u64) {
    Mock::given(method("DELETE"))
        .and(path(format!("/user/following/{login}")))
        .respond_with(ResponseTemplate::new(status))
        .expect(calls)
        .mount(server)
        .await;
}

pub fn github_config(server: &MockServer) -> GitHubConfig {
    GitHubConfig {
        token: TOKEN.to_string(),
        username: USERNAME.to_string(),
        api_base: server.uri(),
        user_agent: "unfollower-test".to_string(),
    }
}

/// Client against the mock server with no pacing delays
pub fn test_client(server: &MockServer) -> GitHubClient {
    test_client_with(server, Pacer::immediate())
}

pub fn test_client_with(server: &MockServer, pacer: Pacer) -> GitHubClient {
    GitHubClient::new(&github_config(server), Arc::new(pacer)).unwrap()
}

/// Fresh database in a temporary directory
pub async fn test_db() -> (Arc<Database>, TempDir) {
    let temp_dir = TempDir::new().unwrap();
    let db = Database::connect(&temp_dir.path().join("test.db"))
        .await
        .unwrap();
    (Arc::new(db), temp_dir)
}
