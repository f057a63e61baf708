//! Parquet ingestion implementation.

use std::collections::{HashMap, HashSet};
use std::path::Path;

use chrono::{DateTime, NaiveDate};
use parquet::file::reader::{ChunkReader, FileReader};
use parquet::file::serialized_reader::SerializedFileReader;
use parquet::record::Field;

use crate::error::{IngestionError, IngestionResult};
use crate::types::{DataSet, DataType, Schema, Value};

/// Ingest a Parquet file into an in-memory `DataSet`.
///
/// Notes:
/// - Validates that all required schema fields exist as Parquet leaf columns (by column path
///   string); optional ones that are absent read as null
/// - Uses the Parquet record API (`RowIter`)
pub fn ingest_parquet_from_path(path: impl AsRef<Path>, schema: &Schema) -> IngestionResult<DataSet> {
    let reader = SerializedFileReader::try_from(path.as_ref())?;

    let available_columns = parquet_leaf_column_paths(&reader);
    for field in schema.fields.iter().filter(|f| f.required) {
        if !available_columns.contains(field.name.as_str()) {
            return Err(IngestionError::SchemaMismatch {
                message: format!("missing required column '{}'", field.name),
            });
        }
    }

    let mut rows: Vec<Vec<Value>> = Vec::new();
    for (idx0, row_res) in reader.into_iter().enumerate() {
        let row_num = idx0 + 1;
        let row = row_res?;

        let map: HashMap<&str, &Field> = row
            .get_column_iter()
            .map(|(name, field)| (name.as_str(), field))
            .collect();

        let mut out_row: Vec<Value> = Vec::with_capacity(schema.fields.len());
        for f in &schema.fields {
            match map.get(f.name.as_str()) {
                Some(v) => out_row.push(convert_parquet_field(row_num, &f.name, &f.data_type, v)?),
                None => out_row.push(Value::Null),
            }
        }
        rows.push(out_row);
    }

    Ok(DataSet::new(schema.clone(), rows))
}

fn parquet_leaf_column_paths<R: ChunkReader + 'static>(
    reader: &SerializedFileReader<R>,
) -> HashSet<String> {
    reader
        .metadata()
        .file_metadata()
        .schema_descr()
        .columns()
        .iter()
        .map(|c| c.path().string())
        .collect()
}

fn convert_parquet_field(
    row: usize,
    column: &str,
    data_type: &DataType,
    f: &Field,
) -> IngestionResult<Value> {
    let parse_error = |message: String| IngestionError::ParseError {
        row,
        column: column.to_string(),
        raw: f.to_string(),
        message,
    };

    if matches!(f, Field::Null) {
        return Ok(Value::Null);
    }

    match data_type {
        DataType::Utf8 => match f {
            Field::Str(s) => Ok(Value::Utf8(s.clone())),
            Field::Bytes(b) => Ok(Value::Utf8(String::from_utf8_lossy(b.data()).into_owned())),
            Field::Date(_) | Field::TimestampMillis(_) | Field::TimestampMicros(_) => {
                temporal_field(f)
                    .map(|v| Value::Utf8(v.to_string()))
                    .ok_or_else(|| parse_error("timestamp out of range".to_string()))
            }
            other => Ok(Value::Utf8(other.to_string())),
        },
        DataType::Decimal | DataType::Date | DataType::Timestamp => match f {
            Field::Str(s) => Value::parse_as(data_type, s).map_err(parse_error),
            Field::Date(_) | Field::TimestampMillis(_) | Field::TimestampMicros(_) => {
                let value = temporal_field(f)
                    .ok_or_else(|| parse_error("timestamp out of range".to_string()))?;
                match (data_type, value) {
                    (DataType::Date, Value::Timestamp(ts)) => Ok(Value::Date(ts.date())),
                    (DataType::Timestamp, Value::Date(d)) => d
                        .and_hms_opt(0, 0, 0)
                        .map(Value::Timestamp)
                        .ok_or_else(|| parse_error("invalid date".to_string())),
                    (DataType::Decimal, _) => Err(parse_error("expected decimal".to_string())),
                    (_, v) => Ok(v),
                }
            }
            Field::Bool(_) | Field::Group(_) | Field::ListInternal(_) | Field::MapInternal(_) => {
                Err(parse_error("expected scalar".to_string()))
            }
            other => Value::parse_as(data_type, &other.to_string()).map_err(parse_error),
        },
    }
}

/// Decode parquet's physical date/timestamp representations.
fn temporal_field(f: &Field) -> Option<Value> {
    match f {
        Field::Date(days) => NaiveDate::from_ymd_opt(1970, 1, 1)?
            .checked_add_signed(chrono::Duration::days(i64::from(*days)))
            .map(Value::Date),
        Field::TimestampMillis(ms) => DateTime::from_timestamp_millis(*ms).map(|dt| Value::Timestamp(dt.naive_utc())),
        Field::TimestampMicros(us) => DateTime::from_timestamp_micros(*us).map(|dt| Value::Timestamp(dt.naive_utc())),
        _ => None,
    }
}
