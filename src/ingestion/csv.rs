//! CSV ingestion implementation.

use std::path::Path;

use crate::error::{IngestionError, IngestionResult};
use crate::types::{DataSet, Schema, Value};

/// Ingest a CSV file into an in-memory [`DataSet`].
///
/// Rules:
///
/// - CSV must have headers.
/// - Headers must contain all required schema fields (order can differ, surrounding whitespace in
///   header names is ignored). Missing optional fields are filled with [`Value::Null`].
/// - Extra columns are ignored.
/// - Each value is parsed according to the schema field type. Field bytes that are not valid UTF-8
///   are decoded lossily, so an oddly encoded row still extracts.
pub fn ingest_csv_from_path(path: impl AsRef<Path>, schema: &Schema) -> IngestionResult<DataSet> {
    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_path(path)?;
    ingest_csv_from_reader(&mut rdr, schema)
}

/// Ingest CSV data from an existing CSV reader.
pub fn ingest_csv_from_reader<R: std::io::Read>(
    rdr: &mut csv::Reader<R>,
    schema: &Schema,
) -> IngestionResult<DataSet> {
    let headers = rdr.headers()?.clone();

    // Map schema fields -> CSV column indexes (allows re-ordered CSV columns).
    let mut col_idxs: Vec<Option<usize>> = Vec::with_capacity(schema.fields.len());
    for field in &schema.fields {
        let idx = headers.iter().position(|h| h.trim() == field.name);
        if idx.is_none() && field.required {
            return Err(IngestionError::SchemaMismatch {
                message: format!(
                    "missing required column '{field}'. headers={:?}",
                    headers.iter().collect::<Vec<_>>(),
                    field = field.name
                ),
            });
        }
        col_idxs.push(idx);
    }

    let mut rows: Vec<Vec<Value>> = Vec::new();
    for (row_idx0, result) in rdr.byte_records().enumerate() {
        // Report 1-based row number for users; +1 again because header is row 1.
        let user_row = row_idx0 + 2;
        let record = result?;

        let mut row: Vec<Value> = Vec::with_capacity(schema.fields.len());
        for (field, csv_idx) in schema.fields.iter().zip(col_idxs.iter()) {
            let bytes = csv_idx.and_then(|i| record.get(i)).unwrap_or_default();
            let raw = String::from_utf8_lossy(bytes);
            let value = Value::parse_as(&field.data_type, &raw).map_err(|message| {
                IngestionError::ParseError {
                    row: user_row,
                    column: field.name.clone(),
                    raw: raw.to_string(),
                    message,
                }
            })?;
            row.push(value);
        }
        rows.push(row);
    }

    Ok(DataSet::new(schema.clone(), rows))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{DataType, Field};

    fn reader(data: &str) -> csv::Reader<&[u8]> {
        csv::ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .from_reader(data.as_bytes())
    }

    #[test]
    fn optional_columns_missing_from_headers_become_null() {
        let schema = Schema::new(vec![
            Field::new("id", DataType::Utf8),
            Field::optional("segment", DataType::Utf8),
        ]);
        let ds = ingest_csv_from_reader(&mut reader("id,extra\nC1,x\n"), &schema).unwrap();
        assert_eq!(ds.rows, vec![vec![Value::Utf8("C1".to_string()), Value::Null]]);
    }

    #[test]
    fn missing_required_column_is_schema_mismatch() {
        let schema = Schema::new(vec![Field::new("id", DataType::Utf8)]);
        let err = ingest_csv_from_reader(&mut reader("name\nx\n"), &schema).unwrap_err();
        assert!(matches!(err, IngestionError::SchemaMismatch { .. }));
    }

    #[test]
    fn invalid_utf8_in_one_row_keeps_the_others() {
        let schema = Schema::new(vec![
            Field::new("id", DataType::Utf8),
            Field::new("name", DataType::Utf8),
        ]);
        let data: &[u8] = b"id,name\nC1,Ana\nC2,Jos\xe9\nC3,Cy\n";
        let mut rdr = csv::ReaderBuilder::new().has_headers(true).flexible(true).from_reader(data);
        let ds = ingest_csv_from_reader(&mut rdr, &schema).unwrap();

        assert_eq!(ds.row_count(), 3);
        assert_eq!(ds.rows[1][1], Value::Utf8("Jos\u{fffd}".to_string()));
        assert_eq!(ds.rows[2][0], Value::Utf8("C3".to_string()));
    }

    #[test]
    fn typed_columns_report_row_and_column_on_parse_failure() {
        let schema = Schema::new(vec![Field::new("amount", DataType::Decimal)]);
        let err = ingest_csv_from_reader(&mut reader("amount\n1.5\nabc\n"), &schema).unwrap_err();
        match err {
            IngestionError::ParseError { row, column, .. } => {
                assert_eq!(row, 3);
                assert_eq!(column, "amount");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
