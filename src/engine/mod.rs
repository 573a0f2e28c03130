//! Execution engine module
//!
//! Main read loop and stream orchestration.
//!
//! # Overview
//!
//! The engine module provides:
//! - `SyncEngine` - Runs selected streams with bookmark filtering
//! - `SyncConfig` - Configuration for sync operations
//! - Message types for output (Schema, Record, State, Log, Summary)
//!
//! Streams run one after another. A stream that fails is logged and recorded
//! as failed; the others still run. Configuration and credential errors abort
//! the whole run.

mod types;

pub use types::{
    Message, StreamStatus, StreamSummary, SyncConfig, SyncStats, SyncStatus, SyncSummary,
};

use crate::error::{Error, Result};
use crate::http::HttpClient;
use crate::output::MessageSink;
use crate::state::{ReplicationTracker, StateManager};
use crate::streams::{RecordSink, StreamContext, TapStream};
use crate::types::JsonValue;
use std::time::Instant;
use tracing::{error, info, warn};

/// Sync engine for orchestrating data extraction
pub struct SyncEngine {
    /// HTTP client
    client: HttpClient,
    /// State manager
    state: StateManager,
    /// Sync configuration
    config: SyncConfig,
    /// Statistics
    stats: SyncStats,
}

impl SyncEngine {
    /// Create a new sync engine
    pub fn new(client: HttpClient, state: StateManager, config: SyncConfig) -> Self {
        Self {
            client,
            state,
            config,
            stats: SyncStats::default(),
        }
    }

    /// Get the state manager
    pub fn state(&self) -> &StateManager {
        &self.state
    }

    /// Get statistics
    pub fn stats(&self) -> &SyncStats {
        &self.stats
    }

    /// Get the sync configuration
    pub fn config(&self) -> &SyncConfig {
        &self.config
    }

    fn context(&self) -> StreamContext<'_> {
        StreamContext {
            client: &self.client,
            network_id: &self.config.network_id,
            reports: &self.config.reports,
            reconcile: self.config.reconcile,
        }
    }

    /// Verify credentials and network access by fetching the network
    pub async fn check(&self) -> Result<JsonValue> {
        let path = format!("networks/{}", self.config.network_id);
        let network: JsonValue = self.client.get_json(&path).await?;
        info!(network_id = %self.config.network_id, "Connection check succeeded");
        Ok(network)
    }

    /// Run `streams` in order, emitting every message into `sink`
    ///
    /// Ends with a STATE message carrying all bookmarks. Returns the
    /// summary; the caller emits it once output files are known.
    pub async fn run(
        &mut self,
        streams: &[Box<dyn TapStream>],
        sink: &mut dyn MessageSink,
    ) -> Result<SyncSummary> {
        let start = Instant::now();
        self.stats = SyncStats::default();
        let mut summaries = Vec::with_capacity(streams.len());

        for stream in streams {
            let summary = self.sync_stream(stream.as_ref(), sink).await?;
            self.stats.add_stream(&summary);
            summaries.push(summary);
        }

        sink.emit(&Message::state(self.state.to_value().await?))?;

        #[allow(clippy::cast_possible_truncation)]
        self.stats.set_duration(start.elapsed().as_millis() as u64);

        let summary = SyncSummary::new(self.stats.clone(), summaries);
        info!(
            status = ?summary.status,
            records = self.stats.records_synced,
            streams_synced = self.stats.streams_synced,
            streams_failed = self.stats.streams_failed,
            "Sync finished"
        );
        Ok(summary)
    }

    /// Sync one stream, isolating non-fatal failures
    async fn sync_stream(
        &self,
        stream: &dyn TapStream,
        sink: &mut dyn MessageSink,
    ) -> Result<StreamSummary> {
        let start = Instant::now();
        let name = stream.name().to_string();
        let replication_key = stream.replication_key();

        sink.emit(&Message::info(format!("Starting sync for stream: {name}")))?;
        sink.emit(&Message::Schema {
            stream: name.clone(),
            schema: stream.schema(),
            key_properties: stream.key_properties(),
            bookmark_properties: replication_key.map(str::to_string).into_iter().collect(),
        })?;

        let tracker = match replication_key {
            Some(key) => {
                let threshold = match self.state.bookmark_value(&name).await {
                    Some(value) => Some(value),
                    None => self.config.start_date.clone(),
                };
                Some(ReplicationTracker::new(key, threshold))
            }
            None => None,
        };

        let mut emitter = RecordEmitter {
            stream: &name,
            sink,
            tracker,
            emitted: 0,
            filtered: 0,
            output_failed: false,
        };

        let ctx = self.context();
        let outcome = stream.read(&ctx, &mut emitter).await;

        let RecordEmitter {
            sink,
            tracker,
            emitted,
            filtered,
            output_failed,
            ..
        } = emitter;

        #[allow(clippy::cast_possible_truncation)]
        let duration_ms = start.elapsed().as_millis() as u64;
        let mut summary = StreamSummary {
            stream: name.clone(),
            status: StreamStatus::Success,
            records_synced: emitted,
            records_filtered: filtered,
            duration_ms,
            bookmark: None,
            error: None,
        };

        match outcome {
            Ok(_) => {
                if let Some(tracker) = &tracker {
                    if let Some(value) = tracker.bookmark() {
                        self.state.set_bookmark(&name, tracker.key(), value).await?;
                        summary.bookmark = Some(value.to_string());
                    }
                    sink.emit(&Message::state(self.state.to_value().await?))?;
                }
                info!(
                    stream = %name,
                    records = emitted,
                    filtered,
                    duration_ms,
                    "Stream complete"
                );
            }
            Err(e) if e.is_fatal() || output_failed => {
                error!(stream = %name, error = %e, "Aborting sync");
                return Err(e);
            }
            Err(e) => {
                warn!(stream = %name, error = %e, records = emitted, "Stream failed");
                sink.emit(&Message::error(format!("Stream {name} failed: {e}")))?;
                summary.status = StreamStatus::Failed;
                summary.error = Some(e.to_string());
            }
        }

        Ok(summary)
    }
}

/// Filters a stream's records against its bookmark and emits the rest
struct RecordEmitter<'a> {
    stream: &'a str,
    sink: &'a mut dyn MessageSink,
    tracker: Option<ReplicationTracker>,
    emitted: u64,
    filtered: u64,
    output_failed: bool,
}

impl RecordSink for RecordEmitter<'_> {
    fn push(&mut self, record: JsonValue) -> Result<()> {
        if let Some(tracker) = &mut self.tracker {
            if !tracker.admit(&record) {
                self.filtered += 1;
                return Ok(());
            }
        }

        self.sink
            .emit(&Message::record(self.stream, record))
            .map_err(|e| {
                self.output_failed = true;
                Error::output(format!("Failed to emit record: {e}"))
            })?;
        self.emitted += 1;
        Ok(())
    }
}
