//! Output module
//!
//! Emits tap messages and writes records to Parquet.
//!
//! # Overview
//!
//! This module provides utilities for:
//! - Mapping declared stream schemas to Arrow schemas
//! - Converting JSON records to Arrow RecordBatches
//! - Writing Parquet files, one per stream
//! - JSON lines message output on stdout

mod schema;
mod sink;
mod writer;

pub use schema::{arrow_schema, records_to_batch};
pub use sink::{JsonLinesSink, MessageSink, OutputFile, ParquetSink};
pub use writer::{ParquetWriter, ParquetWriterConfig};

#[cfg(test)]
mod tests;
