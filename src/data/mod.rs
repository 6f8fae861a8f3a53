//! Data layer module
//!
//! Handles all data persistence:
//! - Following / follower snapshots
//! - Unfollowed ledger
//! - Processing audit trail

mod database;
mod models;

pub use database::Database;
pub use models::*;

#[cfg(test)]
mod database_test;
