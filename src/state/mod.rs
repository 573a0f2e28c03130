//! State management module
//!
//! Handles replication bookmarks for incremental streams.
//! State is persisted between sync runs so that `orders` only re-emits
//! records updated since the previous run.
//!
//! # Overview
//!
//! The state module provides:
//! - `State` - Singer-style `{"bookmarks": {...}}` document
//! - `StateManager` - File-based state persistence
//! - `ReplicationTracker` - Per-run record filter and bookmark candidate

mod manager;
mod replication;
mod types;

pub use manager::StateManager;
pub use replication::{compare_replication_values, ReplicationTracker};
pub use types::{Bookmark, State};
