//! Record schemas
//!
//! JSON Schema documents declared for each stream, emitted in SCHEMA
//! messages and used to lay out Parquet columns.

mod catalog;
mod types;

pub use catalog::{orders_schema, placements_schema, report_results_schema, reports_schema};
pub use types::{JsonSchema, JsonType, JsonTypeOrArray, SchemaProperty};
