//! Tests for output module

use super::*;
use crate::engine::Message;
use crate::schema::{orders_schema, report_results_schema};
use arrow::array::{Array, BooleanArray, ListArray, StringArray};
use arrow::datatypes::DataType;
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use pretty_assertions::assert_eq;
use serde_json::{json, Value};
use std::fs::File;
use tempfile::tempdir;

fn schema_message(stream: &str, schema: crate::schema::JsonSchema) -> Message {
    Message::Schema {
        stream: stream.to_string(),
        schema,
        key_properties: vec!["orderId".to_string()],
        bookmark_properties: vec![],
    }
}

fn read_parquet(path: &std::path::Path) -> (arrow::datatypes::SchemaRef, usize) {
    let builder = ParquetRecordBatchReaderBuilder::try_new(File::open(path).unwrap()).unwrap();
    let schema = builder.schema().clone();
    let rows = builder
        .build()
        .unwrap()
        .map(|batch| batch.unwrap().num_rows())
        .sum();
    (schema, rows)
}

fn lines(buffer: Vec<u8>) -> Vec<Value> {
    String::from_utf8(buffer)
        .unwrap()
        .lines()
        .map(|line| serde_json::from_str(line).unwrap())
        .collect()
}

// ============================================================================
// Schema Mapping Tests
// ============================================================================

#[test]
fn test_arrow_schema_from_declared_orders() {
    let schema = arrow_schema(&orders_schema());

    assert_eq!(schema.fields().len(), 20);
    assert_eq!(
        schema.field_with_name("orderId").unwrap().data_type(),
        &DataType::Utf8
    );
    assert_eq!(
        schema.field_with_name("archived").unwrap().data_type(),
        &DataType::Boolean
    );
    assert!(matches!(
        schema.field_with_name("appliedLabels").unwrap().data_type(),
        DataType::List(item) if item.data_type() == &DataType::Utf8
    ));
    // Arrays of objects are stored as JSON text
    assert_eq!(
        schema.field_with_name("customFieldValues").unwrap().data_type(),
        &DataType::Utf8
    );
    assert!(schema.fields().iter().all(|f| f.is_nullable()));
}

#[test]
fn test_records_to_batch_with_declared_schema() {
    let schema = arrow_schema(&orders_schema());
    let records = vec![
        json!({
            "orderId": "1",
            "archived": true,
            "appliedLabels": ["a", "b"],
            "customFieldValues": [{"customField": "cf", "value": "v"}],
            "undeclared": 42
        }),
        json!({"orderId": "2", "archived": null}),
    ];

    let batch = records_to_batch(&records, &schema).unwrap();
    assert_eq!(batch.num_rows(), 2);
    assert_eq!(batch.num_columns(), 20);

    let ids = batch
        .column_by_name("orderId")
        .unwrap()
        .as_any()
        .downcast_ref::<StringArray>()
        .unwrap();
    assert_eq!(ids.value(1), "2");

    let archived = batch
        .column_by_name("archived")
        .unwrap()
        .as_any()
        .downcast_ref::<BooleanArray>()
        .unwrap();
    assert!(archived.value(0));
    assert!(archived.is_null(1));

    let labels = batch
        .column_by_name("appliedLabels")
        .unwrap()
        .as_any()
        .downcast_ref::<ListArray>()
        .unwrap();
    assert_eq!(labels.value(0).len(), 2);
    assert_eq!(labels.value(1).len(), 0);

    let custom = batch
        .column_by_name("customFieldValues")
        .unwrap()
        .as_any()
        .downcast_ref::<StringArray>()
        .unwrap();
    let decoded: Value = serde_json::from_str(custom.value(0)).unwrap();
    assert_eq!(decoded, json!([{"customField": "cf", "value": "v"}]));
    assert!(custom.is_null(1));
}

#[test]
fn test_records_to_batch_empty() {
    let schema = arrow_schema(&report_results_schema());
    let batch = records_to_batch(&[], &schema).unwrap();
    assert_eq!(batch.num_rows(), 0);
    assert_eq!(batch.num_columns(), 5);
}

// ============================================================================
// JSON Lines Sink Tests
// ============================================================================

#[test]
fn test_json_lines_sink_writes_singer_messages() {
    let mut sink = JsonLinesSink::new(Vec::new());
    sink.emit(&schema_message("orders", orders_schema())).unwrap();
    sink.emit(&Message::record("orders", json!({"orderId": "1"})))
        .unwrap();
    sink.emit(&Message::state(json!({"bookmarks": {}}))).unwrap();
    assert!(sink.finish().unwrap().is_empty());

    let messages = lines(sink.into_inner());
    assert_eq!(messages.len(), 3);

    assert_eq!(messages[0]["type"], "SCHEMA");
    assert_eq!(messages[0]["stream"], "orders");
    assert_eq!(messages[0]["key_properties"], json!(["orderId"]));
    assert_eq!(messages[0]["schema"]["type"], "object");

    assert_eq!(messages[1]["type"], "RECORD");
    assert_eq!(messages[1]["record"], json!({"orderId": "1"}));
    assert!(messages[1]["time_extracted"].as_str().unwrap().ends_with('Z'));

    assert_eq!(messages[2], json!({"type": "STATE", "value": {"bookmarks": {}}}));
}

#[test]
fn test_json_lines_sink_pretty() {
    let mut sink = JsonLinesSink::new(Vec::new()).pretty(true);
    sink.emit(&Message::info("hello")).unwrap();

    let text = String::from_utf8(sink.into_inner()).unwrap();
    assert!(text.lines().count() > 1);
    let value: Value = serde_json::from_str(&text).unwrap();
    assert_eq!(value, json!({"type": "LOG", "level": "INFO", "message": "hello"}));
}

// ============================================================================
// Parquet Sink Tests
// ============================================================================

#[test]
fn test_parquet_sink_writes_one_file_per_stream() {
    let dir = tempdir().unwrap();
    let mut sink = ParquetSink::new(dir.path(), JsonLinesSink::new(Vec::new()))
        .unwrap()
        .with_batch_size(2);

    sink.emit(&schema_message("orders", orders_schema())).unwrap();
    for id in ["1", "2", "3"] {
        sink.emit(&Message::record("orders", json!({"orderId": id})))
            .unwrap();
    }
    sink.emit(&Message::state(json!({"bookmarks": {}}))).unwrap();

    let files = sink.finish().unwrap();
    assert_eq!(files.len(), 1);
    assert_eq!(files[0].stream, "orders");
    assert_eq!(files[0].rows, 3);

    let path = dir.path().join("orders.parquet");
    assert_eq!(files[0].path, path.display().to_string());
    let (schema, rows) = read_parquet(&path);
    assert_eq!(rows, 3);
    assert_eq!(schema.fields().len(), 20);
    assert!(schema.field_with_name("updateTime").is_ok());

    // Records went to the file only; schema and state passed through
    let passed = lines(sink.into_inner().into_inner());
    let types: Vec<&str> = passed.iter().map(|m| m["type"].as_str().unwrap()).collect();
    assert_eq!(types, vec!["SCHEMA", "STATE"]);
}

#[test]
fn test_parquet_sink_echoes_records_when_asked() {
    let dir = tempdir().unwrap();
    let mut sink = ParquetSink::new(dir.path(), JsonLinesSink::new(Vec::new()))
        .unwrap()
        .echo_records(true);

    sink.emit(&schema_message("orders", orders_schema())).unwrap();
    sink.emit(&Message::record("orders", json!({"orderId": "1"})))
        .unwrap();
    sink.finish().unwrap();

    let passed = lines(sink.into_inner().into_inner());
    assert_eq!(passed.len(), 2);
    assert_eq!(passed[1]["type"], "RECORD");
}

#[test]
fn test_parquet_sink_stream_without_records_gets_empty_file() {
    let dir = tempdir().unwrap();
    let mut sink = ParquetSink::new(dir.path(), JsonLinesSink::new(Vec::new())).unwrap();

    sink.emit(&schema_message("report_results", report_results_schema()))
        .unwrap();
    let files = sink.finish().unwrap();

    assert_eq!(files[0].rows, 0);
    let (schema, rows) = read_parquet(&dir.path().join("report_results.parquet"));
    assert_eq!(rows, 0);
    assert!(schema.field_with_name("rows").is_ok());
}

#[test]
fn test_parquet_sink_rejects_record_before_schema() {
    let dir = tempdir().unwrap();
    let mut sink = ParquetSink::new(dir.path(), JsonLinesSink::new(Vec::new())).unwrap();

    let err = sink
        .emit(&Message::record("orders", json!({"orderId": "1"})))
        .unwrap_err();
    assert!(matches!(err, crate::error::Error::Output { .. }));
}

#[test]
fn test_parquet_sink_creates_nested_directory() {
    let dir = tempdir().unwrap();
    let nested = dir.path().join("a").join("b");
    let _sink = ParquetSink::new(&nested, JsonLinesSink::new(Vec::new())).unwrap();
    assert!(nested.is_dir());
}

// ============================================================================
// Writer Tests
// ============================================================================

#[test]
fn test_parquet_writer_config() {
    assert_eq!(ParquetWriterConfig::default().row_group_size(), 1024 * 1024);
    let config = ParquetWriterConfig::new()
        .with_row_group_size(500)
        .uncompressed();
    assert_eq!(config.row_group_size(), 500);
}

#[test]
fn test_parquet_writer_rows_written() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("reports.parquet");
    let schema = arrow_schema(&crate::schema::reports_schema());

    let config = ParquetWriterConfig::new().uncompressed();
    let mut writer = ParquetWriter::new(&path, &schema, &config).unwrap();
    assert_eq!(writer.path(), path.as_path());

    let batch = records_to_batch(
        &[json!({"name": "networks/1/reports/1", "dimensions": ["DATE"]})],
        &schema,
    )
    .unwrap();
    writer.write(&batch).unwrap();
    writer.write(&batch).unwrap();
    assert_eq!(writer.rows_written(), 2);
    assert_eq!(writer.close().unwrap(), 2);

    assert_eq!(read_parquet(&path).1, 2);
}
