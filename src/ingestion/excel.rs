#![cfg(feature = "excel")]

use std::path::Path;

use calamine::{open_workbook_auto, Data, DataType as _, Reader};

use crate::error::{IngestionError, IngestionResult};
use crate::types::{DataSet, DataType, Schema, Value, TIMESTAMP_FORMAT};

/// Ingest an Excel document (`.xlsx`, `.xls`, `.ods`, etc.) into an in-memory `DataSet`.
///
/// Behavior:
/// - Picks `sheet_name` if provided; otherwise uses the first sheet in the workbook
/// - Detects the first non-empty row as the header row
/// - Validates that all required schema fields exist as headers; missing optional ones are null
/// - Reads remaining rows and converts cells into typed `Value`s; error cells (`#N/A`,
///   `#DIV/0!`, ...) read as null
pub fn ingest_excel_from_path(
    path: impl AsRef<Path>,
    sheet_name: Option<&str>,
    schema: &Schema,
) -> IngestionResult<DataSet> {
    let mut workbook = open_workbook_auto(path)?;

    let sheet = match sheet_name {
        Some(name) => name.to_string(),
        None => workbook
            .sheet_names()
            .first()
            .cloned()
            .ok_or_else(|| IngestionError::SchemaMismatch {
                message: "workbook has no sheets".to_string(),
            })?,
    };

    let range = workbook.worksheet_range(&sheet)?;
    let rows = ingest_sheet_range(&sheet, &range, schema)?;
    Ok(DataSet::new(schema.clone(), rows))
}

fn ingest_sheet_range(
    sheet: &str,
    range: &calamine::Range<Data>,
    schema: &Schema,
) -> IngestionResult<Vec<Vec<Value>>> {
    let (header_row_idx, col_idxs) =
        build_header_projection(range, schema).map_err(|e| wrap_schema_err_with_sheet(sheet, e))?;

    let mut rows: Vec<Vec<Value>> = Vec::new();
    for (idx0, row) in range.rows().enumerate() {
        if idx0 <= header_row_idx {
            continue;
        }
        if row.iter().all(|c| matches!(c, Data::Empty)) {
            continue;
        }

        // Report 1-based row number (Excel-like).
        let user_row = idx0 + 1;

        let mut out_row: Vec<Value> = Vec::with_capacity(schema.fields.len());
        for (field, col_idx) in schema.fields.iter().zip(col_idxs.iter()) {
            let cell = col_idx.and_then(|i| row.get(i)).unwrap_or(&Data::Empty);
            let col_label = format!("{sheet}:{name}", name = field.name);
            out_row.push(convert_cell(user_row, &col_label, &field.data_type, cell)?);
        }
        rows.push(out_row);
    }

    Ok(rows)
}

fn wrap_schema_err_with_sheet(sheet: &str, err: IngestionError) -> IngestionError {
    match err {
        IngestionError::SchemaMismatch { message } => IngestionError::SchemaMismatch {
            message: format!("sheet '{sheet}': {message}"),
        },
        other => other,
    }
}

fn build_header_projection(
    range: &calamine::Range<Data>,
    schema: &Schema,
) -> IngestionResult<(usize, Vec<Option<usize>>)> {
    let (header_row_idx, header_cells) = range
        .rows()
        .enumerate()
        .find(|(_, row)| row.iter().any(|c| !matches!(c, Data::Empty)))
        .map(|(idx0, row)| (idx0, row.iter().map(cell_to_string).collect::<Vec<_>>()))
        .ok_or_else(|| IngestionError::SchemaMismatch {
            message: "sheet has no non-empty rows (no header row found)".to_string(),
        })?;

    // Build a projection of schema field -> column index by searching header_cells.
    let mut col_idxs: Vec<Option<usize>> = Vec::with_capacity(schema.fields.len());
    for f in &schema.fields {
        let idx = header_cells.iter().position(|h| h.trim() == f.name);
        if idx.is_none() && f.required {
            return Err(IngestionError::SchemaMismatch {
                message: format!(
                    "missing required column '{}'. headers={:?}",
                    f.name, header_cells
                ),
            });
        }
        col_idxs.push(idx);
    }

    Ok((header_row_idx, col_idxs))
}

/// Render a cell as text. Whole floats drop their fractional part and date cells use the
/// canonical timestamp layout.
fn cell_to_string(c: &Data) -> String {
    match c {
        Data::String(s) => s.clone(),
        Data::Int(i) => i.to_string(),
        Data::Float(f) => {
            if f.fract() == 0.0 && f.abs() < i64::MAX as f64 {
                (*f as i64).to_string()
            } else {
                f.to_string()
            }
        }
        Data::Bool(b) => b.to_string(),
        Data::DateTime(_) | Data::DateTimeIso(_) => c
            .as_datetime()
            .map(|dt| dt.format(TIMESTAMP_FORMAT).to_string())
            .unwrap_or_else(|| c.to_string()),
        Data::DurationIso(s) => s.clone(),
        Data::Error(e) => format!("{e:?}"),
        Data::Empty => String::new(),
    }
}

fn convert_cell(row: usize, column: &str, data_type: &DataType, c: &Data) -> IngestionResult<Value> {
    let parse_error = |message: String| IngestionError::ParseError {
        row,
        column: column.to_string(),
        raw: c.to_string(),
        message,
    };

    match (data_type, c) {
        (_, Data::Empty | Data::Error(_)) => Ok(Value::Null),
        (DataType::Date, Data::DateTime(_) | Data::DateTimeIso(_)) => c
            .as_datetime()
            .map(|dt| Value::Date(dt.date()))
            .ok_or_else(|| parse_error("expected date".to_string())),
        (DataType::Timestamp, Data::DateTime(_) | Data::DateTimeIso(_)) => c
            .as_datetime()
            .map(Value::Timestamp)
            .ok_or_else(|| parse_error("expected timestamp".to_string())),
        _ => Value::parse_as(data_type, &cell_to_string(c)).map_err(parse_error),
    }
}

#[cfg(test)]
mod tests {
    use calamine::CellErrorType;

    use super::*;

    #[test]
    fn error_cells_read_as_null() {
        for err in [CellErrorType::NA, CellErrorType::Div0, CellErrorType::Ref] {
            let cell = Data::Error(err);
            assert_eq!(convert_cell(2, "master:interest_rate", &DataType::Utf8, &cell).unwrap(), Value::Null);
            assert_eq!(convert_cell(2, "master:interest_rate", &DataType::Decimal, &cell).unwrap(), Value::Null);
        }
    }

    #[test]
    fn numeric_cells_render_as_text() {
        assert_eq!(
            convert_cell(2, "s:amount", &DataType::Utf8, &Data::Float(120.5)).unwrap(),
            Value::Utf8("120.5".to_string())
        );
        assert_eq!(
            convert_cell(2, "s:id", &DataType::Utf8, &Data::Float(7.0)).unwrap(),
            Value::Utf8("7".to_string())
        );
    }
}
