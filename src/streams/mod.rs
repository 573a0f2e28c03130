//! Stream catalog
//!
//! The tap exposes four streams:
//! - `orders`, `placements`, `reports` - plain collection listings
//! - `report_results` - one record per completed report run
//!
//! Each stream declares its schema and keys, and pushes its records into a
//! [`RecordSink`] supplied by the sync engine.

mod lister;
mod listing;
mod report_results;

pub use lister::ResourceLister;
pub use listing::ListingStream;
pub use report_results::ReportResultsStream;

use crate::error::{Error, Result};
use crate::http::HttpClient;
use crate::reports::{ReconcileConfig, ReportDefinition};
use crate::schema::JsonSchema;
use crate::types::{JsonValue, SyncMode};
use async_trait::async_trait;
use serde_json::json;

/// Everything a stream needs to read from one network
#[derive(Debug, Clone, Copy)]
pub struct StreamContext<'a> {
    /// Executor carrying credentials
    pub client: &'a HttpClient,
    /// Ad Manager network code
    pub network_id: &'a str,
    /// Declared report definitions
    pub reports: &'a [ReportDefinition],
    /// Report workflow intervals and bounds
    pub reconcile: ReconcileConfig,
}

/// Receives records as a stream produces them
pub trait RecordSink: Send {
    /// Accept one record
    fn push(&mut self, record: JsonValue) -> Result<()>;
}

impl RecordSink for Vec<JsonValue> {
    fn push(&mut self, record: JsonValue) -> Result<()> {
        Vec::push(self, record);
        Ok(())
    }
}

/// A named source of records with a declared shape
#[async_trait]
pub trait TapStream: Send + Sync {
    /// Stream name
    fn name(&self) -> &str;

    /// Fields that identify a record
    fn key_properties(&self) -> Vec<String>;

    /// Field whose maximum is bookmarked between runs
    fn replication_key(&self) -> Option<&str> {
        None
    }

    /// Declared record schema
    fn schema(&self) -> JsonSchema;

    /// Incremental when a replication key is declared
    fn sync_mode(&self) -> SyncMode {
        if self.replication_key().is_some() {
            SyncMode::Incremental
        } else {
            SyncMode::FullRefresh
        }
    }

    /// Produce every record into `sink`, returning the count
    async fn read(&self, ctx: &StreamContext<'_>, sink: &mut dyn RecordSink) -> Result<u64>;
}

/// Every stream the tap knows, in emission order
pub fn catalog() -> Vec<Box<dyn TapStream>> {
    vec![
        Box::new(ListingStream::orders()),
        Box::new(ListingStream::placements()),
        Box::new(ListingStream::reports()),
        Box::new(ReportResultsStream),
    ]
}

/// Catalog entry describing a stream, as emitted by `discover`
pub fn catalog_entry(stream: &dyn TapStream) -> JsonValue {
    let replication_method = match stream.sync_mode() {
        SyncMode::Incremental => "INCREMENTAL",
        SyncMode::FullRefresh => "FULL_TABLE",
    };
    json!({
        "stream": stream.name(),
        "tap_stream_id": stream.name(),
        "schema": stream.schema(),
        "key_properties": stream.key_properties(),
        "replication_key": stream.replication_key(),
        "replication_method": replication_method,
    })
}

/// Select streams by name, keeping catalog order
///
/// An empty selection means every stream. Unknown names are an error.
pub fn select_streams(names: &[String]) -> Result<Vec<Box<dyn TapStream>>> {
    let streams = catalog();
    if let Some(unknown) = names
        .iter()
        .find(|name| !streams.iter().any(|s| s.name() == name.as_str()))
    {
        return Err(Error::StreamNotFound {
            stream: unknown.clone(),
        });
    }
    if names.is_empty() {
        return Ok(streams);
    }
    Ok(streams
        .into_iter()
        .filter(|s| names.iter().any(|n| n == s.name()))
        .collect())
}

#[cfg(test)]
mod tests;
