//! Declared JSON schema to Arrow, and JSON records to RecordBatches
//!
//! Scalar properties map to native Arrow types and arrays of scalars to
//! lists. Objects and arrays of objects have open-ended shapes, so they are
//! stored as JSON text.

use crate::error::{Error, Result};
use crate::schema::{JsonSchema, JsonType, SchemaProperty};
use arrow::array::{ArrayRef, BooleanArray, Float64Array, Int64Array, ListArray, StringArray};
use arrow::buffer::OffsetBuffer;
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use serde_json::Value;
use std::sync::Arc;

/// Build the Arrow schema for a stream's declared JSON schema
///
/// Columns are in property name order. Every column is nullable.
pub fn arrow_schema(schema: &JsonSchema) -> Schema {
    let fields: Vec<Field> = schema
        .properties
        .iter()
        .map(|(name, property)| Field::new(name, arrow_type(property), true))
        .collect();
    Schema::new(fields)
}

/// Arrow type for one declared property
fn arrow_type(property: &SchemaProperty) -> DataType {
    match property.json_type.primary_type() {
        Some(JsonType::Boolean) => DataType::Boolean,
        Some(JsonType::Integer) => DataType::Int64,
        Some(JsonType::Number) => DataType::Float64,
        Some(JsonType::Array) => {
            let item = property
                .items
                .as_deref()
                .and_then(|items| items.json_type.primary_type());
            match item {
                Some(JsonType::String) => list_of(DataType::Utf8),
                Some(JsonType::Boolean) => list_of(DataType::Boolean),
                Some(JsonType::Integer) => list_of(DataType::Int64),
                Some(JsonType::Number) => list_of(DataType::Float64),
                _ => DataType::Utf8,
            }
        }
        _ => DataType::Utf8,
    }
}

fn list_of(item: DataType) -> DataType {
    DataType::List(Arc::new(Field::new("item", item, true)))
}

/// Convert JSON records to an Arrow RecordBatch with the given schema
///
/// Fields missing from a record become nulls; fields not in the schema are
/// dropped.
pub fn records_to_batch(records: &[Value], schema: &Schema) -> Result<RecordBatch> {
    let schema = Arc::new(schema.clone());
    if records.is_empty() {
        return Ok(RecordBatch::new_empty(schema));
    }

    let mut columns: Vec<ArrayRef> = Vec::with_capacity(schema.fields().len());
    for field in schema.fields() {
        let values: Vec<Option<&Value>> = records
            .iter()
            .map(|record| record.get(field.name()).filter(|v| !v.is_null()))
            .collect();
        columns.push(build_array(&values, field.data_type())?);
    }

    RecordBatch::try_new(schema, columns)
        .map_err(|e| Error::output(format!("Failed to create RecordBatch: {e}")))
}

/// Build an Arrow array from JSON values
fn build_array(values: &[Option<&Value>], data_type: &DataType) -> Result<ArrayRef> {
    match data_type {
        DataType::Boolean => {
            let arr: BooleanArray = values.iter().map(|v| v.and_then(Value::as_bool)).collect();
            Ok(Arc::new(arr))
        }

        DataType::Int64 => {
            let arr: Int64Array = values
                .iter()
                .map(|v| v.and_then(|v| v.as_i64().or_else(|| v.as_str()?.parse().ok())))
                .collect();
            Ok(Arc::new(arr))
        }

        DataType::Float64 => {
            let arr: Float64Array = values
                .iter()
                .map(|v| v.and_then(|v| v.as_f64().or_else(|| v.as_str()?.parse().ok())))
                .collect();
            Ok(Arc::new(arr))
        }

        DataType::List(field) => build_list_array(values, field),

        // Strings as-is, anything else as JSON text
        _ => {
            let arr: StringArray = values
                .iter()
                .map(|v| {
                    v.map(|v| match v {
                        Value::String(s) => s.clone(),
                        _ => v.to_string(),
                    })
                })
                .collect();
            Ok(Arc::new(arr))
        }
    }
}

/// Build a list array from JSON arrays
fn build_list_array(values: &[Option<&Value>], field: &Arc<Field>) -> Result<ArrayRef> {
    let mut all_items: Vec<Option<&Value>> = Vec::new();
    let mut offsets: Vec<i32> = vec![0];

    for value in values {
        if let Some(Value::Array(arr)) = value {
            all_items.extend(arr.iter().map(Some));
        }
        // Both array and non-array cases need an offset
        let offset = i32::try_from(all_items.len())
            .map_err(|_| Error::output("Array too large for i32 offset"))?;
        offsets.push(offset);
    }

    let items_array = build_array(&all_items, field.data_type())?;
    let offset_buffer = OffsetBuffer::new(offsets.into());

    let list_array = ListArray::new(Arc::clone(field), offset_buffer, items_array, None);
    Ok(Arc::new(list_array))
}
