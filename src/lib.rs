//! Unfollower - unfollow GitHub accounts that do not follow back
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                       CLI (clap)                             │
//! │  - stats / sync / dry-run / unfollow / history               │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//! ┌─────────────────────────────────────────────────────────────┐
//! │                     Service Layer                            │
//! │  - Sync of following / followers snapshots                   │
//! │  - Verified, paced unfollow batches                          │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//! ┌──────────────────────────────┐ ┌────────────────────────────┐
//! │        GitHub Layer          │ │        Data Layer          │
//! │  - REST client (reqwest)     │ │  - SQLite (sqlx)           │
//! │  - Pagination, rate limits   │ │  - Ledger and audit trail  │
//! └──────────────────────────────┘ └────────────────────────────┘
//! ```
//!
//! # Modules
//!
//! - `cli`: Command-line flags
//! - `service`: Sync and unfollow orchestration
//! - `github`: GitHub API client and pacing
//! - `data`: Database layer
//! - `logging`: Tracing subscriber setup
//! - `config`: Configuration management
//! - `error`: Error types

pub mod cli;
pub mod config;
pub mod data;
pub mod error;
pub mod github;
pub mod logging;
pub mod service;
