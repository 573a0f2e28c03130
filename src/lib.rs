// Allow common clippy pedantic lints that aren't critical for this codebase
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::cast_sign_loss)]
#![allow(clippy::cast_lossless)]
#![allow(clippy::too_many_lines)]
#![allow(clippy::ref_option)]
#![allow(clippy::unused_self)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::items_after_statements)]
#![allow(clippy::unnecessary_wraps)]
#![allow(clippy::match_same_arms)]
#![allow(clippy::needless_pass_by_value)]
#![allow(clippy::unused_async)]

//! # tap-ad-manager
//!
//! Extraction tap for the Ad Manager REST API.
//!
//! ## Features
//!
//! - **Listing Streams**: `orders`, `placements` and `reports`, paginated by
//!   opaque page token
//! - **Report Runs**: declared reports are created if missing, run, polled to
//!   completion and emitted as `report_results` records
//! - **Credentials**: OAuth refresh token, client credentials, service
//!   account assertion or a pre-issued access token
//! - **Incremental Sync**: `orders` is bookmarked on `updateTime`
//! - **Output**: JSON lines messages on stdout, optional Parquet per stream
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use tap_ad_manager::{config::TapConfig, engine::{SyncConfig, SyncEngine}};
//! use tap_ad_manager::output::JsonLinesSink;
//! use tap_ad_manager::state::StateManager;
//! use tap_ad_manager::streams::catalog;
//!
//! #[tokio::main]
//! async fn main() -> tap_ad_manager::Result<()> {
//!     let config = TapConfig::from_file("config.yaml")?;
//!     let sync_config = SyncConfig::new(&config.network_id)
//!         .with_reports(config.report_definitions()?);
//!
//!     let mut engine = SyncEngine::new(config.build_client()?, StateManager::in_memory(), sync_config);
//!     let summary = engine.run(&catalog(), &mut JsonLinesSink::stdout()).await?;
//!     println!("{:?}", summary.status);
//!     Ok(())
//! }
//! ```
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                           CLI                                   │
//! │  spec    check    discover    streams    read                   │
//! └─────────────────────────────────────────────────────────────────┘
//!                                │
//! ┌──────────┬───────────┬───────┴───────┬───────────┬─────────────┐
//! │   Auth   │   HTTP    │   Streams     │  Reports  │   Output    │
//! ├──────────┼───────────┼───────────────┼───────────┼─────────────┤
//! │ Refresh  │ GET/POST  │ Lister        │ Reconcile │ JSON lines  │
//! │ Client   │ Retry     │ Page token    │ Run       │ Parquet     │
//! │ Service  │ Rate Limit│ Bookmarks     │ Poll      │             │
//! │ Bearer   │ Backoff   │               │ Rows      │             │
//! └──────────┴───────────┴───────────────┴───────────┴─────────────┘
//! ```

#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::doc_markdown)]

// ============================================================================
// Module declarations
// ============================================================================

/// Error types for the tap
pub mod error;

/// Common types and type aliases
pub mod types;

/// Credential flows and token caching
pub mod auth;

/// HTTP client with retry and rate limiting
pub mod http;

/// Page token pagination
pub mod pagination;

/// Response decoders
pub mod decode;

/// Bounded wait-and-recheck helper
pub mod poll;

/// Declared record schemas
pub mod schema;

/// Report reconciliation and runs
pub mod reports;

/// Stream catalog and listing
pub mod streams;

/// Replication bookmarks
pub mod state;

/// JSON lines and Parquet output
pub mod output;

/// Main execution engine
pub mod engine;

/// Tap configuration
pub mod config;

/// Command-line interface
pub mod cli;

// ============================================================================
// Re-exports
// ============================================================================

pub use error::{Error, Result};
pub use types::*;

pub use config::TapConfig;

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Crate name
pub const NAME: &str = env!("CARGO_PKG_NAME");
