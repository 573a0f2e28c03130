//! Engine types
//!
//! Message types, configuration and statistics for the sync engine.

use crate::output::OutputFile;
use crate::reports::{ReconcileConfig, ReportDefinition};
use crate::schema::JsonSchema;
use crate::types::{JsonValue, LogLevel};
use chrono::{SecondsFormat, Utc};
use serde::Serialize;

/// A message emitted on stdout, one JSON object per line
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Message {
    /// Declared shape of a stream, sent before its first record
    Schema {
        stream: String,
        schema: JsonSchema,
        key_properties: Vec<String>,
        bookmark_properties: Vec<String>,
    },
    /// One extracted record
    Record {
        stream: String,
        record: JsonValue,
        time_extracted: String,
    },
    /// Current bookmarks
    State { value: JsonValue },
    /// Diagnostic line
    Log { level: LogLevel, message: String },
    /// Outcome of the `check` command
    ConnectionStatus { status: String, message: String },
    /// Configuration schema, for the `spec` command
    Spec { spec: JsonValue },
    /// Stream catalog, for the `discover` command
    Catalog { streams: Vec<JsonValue> },
    /// Stream names, for the `streams` command
    Streams { streams: Vec<String> },
    /// Final statistics of a `read`
    SyncSummary { summary: SyncSummary },
}

impl Message {
    /// Create a record message stamped with the current time
    pub fn record(stream: impl Into<String>, record: JsonValue) -> Self {
        Self::Record {
            stream: stream.into(),
            record,
            time_extracted: Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true),
        }
    }

    /// Create a state message
    pub fn state(value: JsonValue) -> Self {
        Self::State { value }
    }

    /// Create a log message
    pub fn log(level: LogLevel, message: impl Into<String>) -> Self {
        Self::Log {
            level,
            message: message.into(),
        }
    }

    /// Create an info log
    pub fn info(message: impl Into<String>) -> Self {
        Self::log(LogLevel::Info, message)
    }

    /// Create an error log
    pub fn error(message: impl Into<String>) -> Self {
        Self::log(LogLevel::Error, message)
    }

    /// Check if this is a record message
    pub fn is_record(&self) -> bool {
        matches!(self, Self::Record { .. })
    }

    /// Check if this is a state message
    pub fn is_state(&self) -> bool {
        matches!(self, Self::State { .. })
    }
}

/// Configuration for sync operation
#[derive(Debug, Clone, PartialEq)]
pub struct SyncConfig {
    /// Ad Manager network code
    pub network_id: String,
    /// Declared reports for `report_results`
    pub reports: Vec<ReportDefinition>,
    /// Report workflow intervals and bounds
    pub reconcile: ReconcileConfig,
    /// Lower bound for incremental streams without a bookmark
    pub start_date: Option<String>,
}

impl SyncConfig {
    /// Create a new sync config
    #[must_use]
    pub fn new(network_id: impl Into<String>) -> Self {
        Self {
            network_id: network_id.into(),
            reports: Vec::new(),
            reconcile: ReconcileConfig::default(),
            start_date: None,
        }
    }

    /// Set declared reports
    #[must_use]
    pub fn with_reports(mut self, reports: Vec<ReportDefinition>) -> Self {
        self.reports = reports;
        self
    }

    /// Set report workflow settings
    #[must_use]
    pub fn with_reconcile(mut self, reconcile: ReconcileConfig) -> Self {
        self.reconcile = reconcile;
        self
    }

    /// Set the incremental lower bound
    #[must_use]
    pub fn with_start_date(mut self, start_date: Option<String>) -> Self {
        self.start_date = start_date;
        self
    }
}

/// Statistics from a sync operation
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SyncStats {
    /// Records emitted
    pub records_synced: u64,
    /// Records dropped as older than the bookmark
    pub records_filtered: u64,
    /// Streams that completed
    pub streams_synced: u64,
    /// Streams that failed
    pub streams_failed: u64,
    /// Duration in milliseconds
    pub duration_ms: u64,
}

impl SyncStats {
    /// Create new stats
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold one stream's outcome in
    pub fn add_stream(&mut self, stream: &StreamSummary) {
        self.records_synced += stream.records_synced;
        self.records_filtered += stream.records_filtered;
        match stream.status {
            StreamStatus::Success => self.streams_synced += 1,
            StreamStatus::Failed => self.streams_failed += 1,
        }
    }

    /// Set duration
    pub fn set_duration(&mut self, ms: u64) {
        self.duration_ms = ms;
    }
}

/// Terminal state of one stream
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum StreamStatus {
    Success,
    Failed,
}

/// Per-stream line of the sync summary
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StreamSummary {
    pub stream: String,
    pub status: StreamStatus,
    pub records_synced: u64,
    pub records_filtered: u64,
    pub duration_ms: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bookmark: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Overall result of a sync
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum SyncStatus {
    /// Every stream completed
    Succeeded,
    /// Some streams failed
    Partial,
    /// Every stream failed
    Failed,
}

/// Final report of a `read`
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SyncSummary {
    pub status: SyncStatus,
    #[serde(flatten)]
    pub stats: SyncStats,
    pub streams: Vec<StreamSummary>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub output_files: Vec<OutputFile>,
}

impl SyncSummary {
    /// Summarize the per-stream results
    pub fn new(stats: SyncStats, streams: Vec<StreamSummary>) -> Self {
        let status = match (stats.streams_synced, stats.streams_failed) {
            (_, 0) => SyncStatus::Succeeded,
            (0, _) => SyncStatus::Failed,
            _ => SyncStatus::Partial,
        };
        Self {
            status,
            stats,
            streams,
            output_files: Vec::new(),
        }
    }
}
