//! Message sinks
//!
//! Every message the tap produces goes through a [`MessageSink`]. The JSON
//! lines sink writes one message per line; the Parquet sink diverts records
//! into one file per stream and passes everything else through.

use super::schema::{arrow_schema, records_to_batch};
use super::writer::{ParquetWriter, ParquetWriterConfig};
use crate::engine::Message;
use crate::error::{Error, Result};
use crate::types::JsonValue;
use arrow::datatypes::Schema;
use serde::Serialize;
use std::collections::BTreeMap;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// A Parquet file produced by a run
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OutputFile {
    pub stream: String,
    pub path: String,
    pub rows: usize,
}

/// Destination for emitted messages
pub trait MessageSink: Send {
    /// Write one message
    fn emit(&mut self, message: &Message) -> Result<()>;

    /// Flush buffered output, returning any files written
    fn finish(&mut self) -> Result<Vec<OutputFile>> {
        Ok(Vec::new())
    }
}

// ============================================================================
// JSON lines
// ============================================================================

/// Writes each message as JSON, one per line
pub struct JsonLinesSink<W: Write + Send> {
    writer: W,
    pretty: bool,
}

impl JsonLinesSink<std::io::Stdout> {
    /// Compact JSON lines on stdout
    pub fn stdout() -> Self {
        Self::new(std::io::stdout())
    }
}

impl<W: Write + Send> JsonLinesSink<W> {
    /// Compact JSON lines
    pub fn new(writer: W) -> Self {
        Self {
            writer,
            pretty: false,
        }
    }

    /// Indented JSON, for humans
    #[must_use]
    pub fn pretty(mut self, pretty: bool) -> Self {
        self.pretty = pretty;
        self
    }

    /// Recover the underlying writer
    pub fn into_inner(self) -> W {
        self.writer
    }
}

impl<W: Write + Send> MessageSink for JsonLinesSink<W> {
    fn emit(&mut self, message: &Message) -> Result<()> {
        if self.pretty {
            serde_json::to_writer_pretty(&mut self.writer, message)?;
        } else {
            serde_json::to_writer(&mut self.writer, message)?;
        }
        self.writer.write_all(b"\n")?;
        self.writer.flush()?;
        Ok(())
    }

    fn finish(&mut self) -> Result<Vec<OutputFile>> {
        self.writer.flush()?;
        Ok(Vec::new())
    }
}

// ============================================================================
// Parquet
// ============================================================================

/// Buffered records and open file of one stream
struct StreamFile {
    schema: Schema,
    pending: Vec<JsonValue>,
    writer: ParquetWriter,
}

/// Writes records to `{dir}/{stream}.parquet`, everything else to `inner`
pub struct ParquetSink<S: MessageSink> {
    dir: PathBuf,
    config: ParquetWriterConfig,
    batch_size: usize,
    echo_records: bool,
    streams: BTreeMap<String, StreamFile>,
    inner: S,
}

impl<S: MessageSink> ParquetSink<S> {
    /// Create the output directory and a sink writing into it
    pub fn new(dir: impl AsRef<Path>, inner: S) -> Result<Self> {
        let dir = dir.as_ref().to_path_buf();
        std::fs::create_dir_all(&dir).map_err(|e| {
            Error::output(format!("Failed to create output directory {}: {e}", dir.display()))
        })?;
        Ok(Self {
            dir,
            config: ParquetWriterConfig::default(),
            batch_size: 10_000,
            echo_records: false,
            streams: BTreeMap::new(),
            inner,
        })
    }

    /// Writer settings
    #[must_use]
    pub fn with_config(mut self, config: ParquetWriterConfig) -> Self {
        self.config = config;
        self
    }

    /// Records buffered before a batch is written
    #[must_use]
    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size.max(1);
        self
    }

    /// Also pass records through to the inner sink
    #[must_use]
    pub fn echo_records(mut self, echo: bool) -> Self {
        self.echo_records = echo;
        self
    }

    /// Recover the inner sink
    pub fn into_inner(self) -> S {
        self.inner
    }

    fn open_stream(&mut self, stream: &str, schema: Schema) -> Result<()> {
        if self.streams.contains_key(stream) {
            return Ok(());
        }
        let path = self.dir.join(format!("{stream}.parquet"));
        debug!(stream, path = %path.display(), "Opening Parquet file");
        let writer = ParquetWriter::new(&path, &schema, &self.config)?;
        self.streams.insert(
            stream.to_string(),
            StreamFile {
                schema,
                pending: Vec::new(),
                writer,
            },
        );
        Ok(())
    }

    fn push_record(&mut self, stream: &str, record: &JsonValue) -> Result<()> {
        let batch_size = self.batch_size;
        let file = self.streams.get_mut(stream).ok_or_else(|| {
            Error::output(format!("Record for stream '{stream}' arrived before its schema"))
        })?;
        file.pending.push(record.clone());
        if file.pending.len() >= batch_size {
            file.flush()?;
        }
        Ok(())
    }
}

impl StreamFile {
    fn flush(&mut self) -> Result<()> {
        if self.pending.is_empty() {
            return Ok(());
        }
        let batch = records_to_batch(&self.pending, &self.schema)?;
        self.writer.write(&batch)?;
        self.pending.clear();
        Ok(())
    }
}

impl<S: MessageSink> MessageSink for ParquetSink<S> {
    fn emit(&mut self, message: &Message) -> Result<()> {
        match message {
            Message::Schema { stream, schema, .. } => {
                self.open_stream(stream, arrow_schema(schema))?;
                self.inner.emit(message)
            }
            Message::Record { stream, record, .. } => {
                self.push_record(stream, record)?;
                if self.echo_records {
                    self.inner.emit(message)?;
                }
                Ok(())
            }
            _ => self.inner.emit(message),
        }
    }

    fn finish(&mut self) -> Result<Vec<OutputFile>> {
        let mut files = Vec::with_capacity(self.streams.len());
        for (stream, mut file) in std::mem::take(&mut self.streams) {
            file.flush()?;
            let path = file.writer.path().display().to_string();
            let rows = file.writer.close()?;
            info!(stream = %stream, path = %path, rows, "Wrote Parquet file");
            files.push(OutputFile { stream, path, rows });
        }
        self.inner.finish()?;
        Ok(files)
    }
}
