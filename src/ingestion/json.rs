//! JSON ingestion implementation.
//!
//! Supported inputs:
//! - A JSON array of objects: `[{"a":1}, {"a":2}]`
//! - Newline-delimited JSON (NDJSON): `{"a":1}\n{"a":2}\n`
//!
//! Nested fields are supported using dot paths in schema field names (e.g. `user.name`).
//!
//! Text fields are lenient: JSON numbers and booleans are rendered to their textual form, and
//! nested arrays or objects to compact JSON text, so raw sources whose producers disagree on
//! quoting still extract.
//!
//! Problems are judged per record. A key absent from one object reads as null, and a record that
//! is not an object (or an NDJSON line that does not parse) becomes an all-null row. A required
//! field is a schema mismatch only when no record in the source carries it.

use std::fs;
use std::path::Path;

use tracing::warn;

use crate::error::{IngestionError, IngestionResult};
use crate::types::{DataSet, DataType, Schema, Value};

/// Ingest JSON into an in-memory `DataSet`.
pub fn ingest_json_from_path(path: impl AsRef<Path>, schema: &Schema) -> IngestionResult<DataSet> {
    let text = fs::read_to_string(path)?;
    ingest_json_from_str(&text, schema)
}

/// Ingest JSON from an in-memory string into a [`DataSet`].
pub fn ingest_json_from_str(input: &str, schema: &Schema) -> IngestionResult<DataSet> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Err(IngestionError::SchemaMismatch {
            message: "json input is empty".to_string(),
        });
    }

    // First try parsing as a single JSON value (array or object).
    if let Ok(v) = serde_json::from_str::<serde_json::Value>(trimmed) {
        match v {
            serde_json::Value::Array(items) => ingest_json_values(&items, schema),
            serde_json::Value::Object(_) => ingest_json_values(std::slice::from_ref(&v), schema),
            _ => Err(IngestionError::SchemaMismatch {
                message: "json must be an object, an array of objects, or NDJSON".to_string(),
            }),
        }
    } else {
        // Fall back to NDJSON.
        let mut values = Vec::new();
        for (i, line) in trimmed.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            match serde_json::from_str::<serde_json::Value>(line) {
                Ok(v) => values.push(v),
                Err(e) => {
                    warn!(line = i + 1, error = %e, "unparsable ndjson line read as an empty record");
                    values.push(serde_json::Value::Null);
                }
            }
        }
        ingest_json_values(&values, schema)
    }
}

fn ingest_json_values(values: &[serde_json::Value], schema: &Schema) -> IngestionResult<DataSet> {
    let mut rows: Vec<Vec<Value>> = Vec::with_capacity(values.len());
    let mut present = vec![false; schema.fields.len()];

    for (idx0, v) in values.iter().enumerate() {
        let row_num = idx0 + 1;
        let Some(obj) = v.as_object() else {
            if !v.is_null() {
                warn!(row = row_num, "json record is not an object; read as an empty record");
            }
            rows.push(vec![Value::Null; schema.fields.len()]);
            continue;
        };

        let mut row: Vec<Value> = Vec::with_capacity(schema.fields.len());
        for (field, seen) in schema.fields.iter().zip(present.iter_mut()) {
            match get_by_dot_path(obj, &field.name) {
                Some(jv) => {
                    *seen = true;
                    row.push(convert_json_value(row_num, &field.name, &field.data_type, jv)?);
                }
                None => row.push(Value::Null),
            }
        }
        rows.push(row);
    }

    if !rows.is_empty() {
        let missing: Vec<&str> = schema
            .fields
            .iter()
            .zip(&present)
            .filter(|(f, seen)| f.required && !**seen)
            .map(|(f, _)| f.name.as_str())
            .collect();
        if !missing.is_empty() {
            return Err(IngestionError::SchemaMismatch {
                message: format!("no record carries required field(s) {missing:?}"),
            });
        }
    }

    Ok(DataSet::new(schema.clone(), rows))
}

fn get_by_dot_path<'a>(
    root: &'a serde_json::Map<String, serde_json::Value>,
    path: &str,
) -> Option<&'a serde_json::Value> {
    let mut segments = path.split('.');
    let mut current: &serde_json::Value = root.get(segments.next().unwrap_or(path))?;

    for segment in segments {
        match current {
            serde_json::Value::Object(map) => current = map.get(segment)?,
            _ => return None,
        }
    }
    Some(current)
}

fn convert_json_value(
    row: usize,
    column: &str,
    data_type: &DataType,
    v: &serde_json::Value,
) -> IngestionResult<Value> {
    let parse_error = |message: String| IngestionError::ParseError {
        row,
        column: column.to_string(),
        raw: v.to_string(),
        message,
    };

    match (data_type, v) {
        (_, serde_json::Value::Null) => Ok(Value::Null),
        (_, serde_json::Value::String(s)) => Value::parse_as(data_type, s).map_err(parse_error),
        (DataType::Utf8, other) => Ok(Value::Utf8(other.to_string())),
        (_, serde_json::Value::Number(n)) => Value::parse_as(data_type, &n.to_string()).map_err(parse_error),
        (_, other) => Err(parse_error(format!("unexpected json value {other}"))),
    }
}
