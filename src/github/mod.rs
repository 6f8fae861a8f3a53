//! GitHub social-graph access
//!
//! - `GraphClient`: the operations the reconciler needs from the remote side
//! - `GitHubClient`: REST implementation with pagination and rate limiting
//! - `Pacer`: pacing policy shared with the reconciler

mod client;
mod pacing;

pub use client::{GitHubClient, PAGE_SIZE, RateLimitResource, RateLimitStatus};
pub use pacing::{Pacer, RateLimitState};

use crate::data::Account;
use crate::error::AppError;

/// Answer of a follow-relationship check
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FollowState {
    /// The remote confirmed the relationship (204)
    Following,
    /// The remote confirmed its absence (404)
    NotFollowing,
    /// Any other outcome; the caller decides how to treat it
    Unknown,
}

/// Remote operations used by the reconciler
///
/// Methods take `&mut self` because implementations track rate-limit state
/// from every response.
#[allow(async_fn_in_trait)]
pub trait GraphClient {
    /// Every account `username` follows, in API order
    async fn fetch_all_following(&mut self, username: &str) -> Result<Vec<Account>, AppError>;

    /// Every account following `username`, in API order
    async fn fetch_all_followers(&mut self, username: &str) -> Result<Vec<Account>, AppError>;

    /// Whether the authenticated user currently follows `login`
    async fn check_following(&mut self, login: &str) -> FollowState;

    /// Remove the follow; `false` on any failure
    async fn unfollow(&mut self, login: &str) -> bool;
}
