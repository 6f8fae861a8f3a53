//! Service layer
//!
//! Business logic separated from the CLI and the remote client.
//! The reconciler orchestrates the GitHub client, the pacer, and the store.

mod reconciler;

pub use reconciler::{BatchOptions, BatchReport, Reconciler, SyncReport};
