//! Core data model types shared by every pipeline stage.
//!
//! Sources are extracted into an in-memory [`DataSet`] shaped by a [`Schema`] (a list of typed
//! [`Field`]s). Normalization rewrites columns into their canonical [`DataType`]s, validation
//! partitions rows, and the warehouse loader binds [`Value`]s straight into SQL parameters.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use rust_decimal::Decimal;

/// Canonical text layout for [`Value::Date`].
pub const DATE_FORMAT: &str = "%Y-%m-%d";
/// Canonical text layout for [`Value::Timestamp`].
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

static NULL: Value = Value::Null;

/// Logical data type for a schema field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DataType {
    /// UTF-8 string.
    Utf8,
    /// Exact signed decimal (monetary amounts).
    Decimal,
    /// Calendar date without time zone.
    Date,
    /// Date and time without time zone (UTC by convention).
    Timestamp,
}

/// A single named, typed field in a [`Schema`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Field {
    /// Field/column name.
    pub name: String,
    /// Field data type.
    pub data_type: DataType,
    /// Whether the column must be present in a source.
    ///
    /// Optional columns that are missing from a source are filled with [`Value::Null`].
    pub required: bool,
}

impl Field {
    /// Create a new required field.
    pub fn new(name: impl Into<String>, data_type: DataType) -> Self {
        Self {
            name: name.into(),
            data_type,
            required: true,
        }
    }

    /// Create a field that may be absent from a source.
    pub fn optional(name: impl Into<String>, data_type: DataType) -> Self {
        Self {
            required: false,
            ..Self::new(name, data_type)
        }
    }
}

/// A list of fields describing the expected shape of incoming data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Schema {
    /// Ordered list of fields.
    pub fields: Vec<Field>,
}

impl Schema {
    /// Create a new schema from fields.
    pub fn new(fields: Vec<Field>) -> Self {
        Self { fields }
    }

    /// Iterate field names in order.
    pub fn field_names(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|f| f.name.as_str())
    }

    /// Returns the index of a field by name, if present.
    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.fields.iter().position(|f| f.name == name)
    }
}

/// A single typed value in a [`DataSet`].
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// Missing/empty value.
    Null,
    /// UTF-8 string.
    Utf8(String),
    /// Exact decimal.
    Decimal(Decimal),
    /// Calendar date.
    Date(NaiveDate),
    /// Date and time.
    Timestamp(NaiveDateTime),
}

impl Value {
    /// Parse `raw` into a value of `data_type`.
    ///
    /// Surrounding whitespace is ignored and blank input is [`Value::Null`]. Errors carry a short
    /// human-readable message; callers decide whether that is fatal (ingestion) or coerces to null
    /// (normalization).
    pub fn parse_as(data_type: &DataType, raw: &str) -> Result<Value, String> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Ok(Value::Null);
        }

        match data_type {
            DataType::Utf8 => Ok(Value::Utf8(trimmed.to_owned())),
            DataType::Decimal => parse_decimal(trimmed).map(Value::Decimal),
            DataType::Date => parse_date(trimmed)
                .map(Value::Date)
                .ok_or_else(|| "expected date (YYYY-MM-DD or MM/DD/YYYY)".to_string()),
            DataType::Timestamp => parse_timestamp(trimmed)
                .map(Value::Timestamp)
                .ok_or_else(|| "expected timestamp (ISO 8601 / RFC 3339)".to_string()),
        }
    }

    /// Returns `true` for [`Value::Null`].
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Borrow the string payload of a [`Value::Utf8`].
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Utf8(s) => Some(s.as_str()),
            _ => None,
        }
    }

    /// The payload of a [`Value::Decimal`].
    pub fn as_decimal(&self) -> Option<Decimal> {
        match self {
            Value::Decimal(d) => Some(*d),
            _ => None,
        }
    }

    /// Returns `true` when the value is null or a string that is empty after trimming.
    pub fn is_blank(&self) -> bool {
        match self {
            Value::Null => true,
            Value::Utf8(s) => s.trim().is_empty(),
            _ => false,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => Ok(()),
            Value::Utf8(s) => f.write_str(s),
            Value::Decimal(d) => write!(f, "{d}"),
            Value::Date(d) => write!(f, "{}", d.format(DATE_FORMAT)),
            Value::Timestamp(ts) => write!(f, "{}", ts.format(TIMESTAMP_FORMAT)),
        }
    }
}

fn parse_decimal(s: &str) -> Result<Decimal, String> {
    Decimal::from_str(s)
        .or_else(|_| Decimal::from_scientific(s))
        .map_err(|e| e.to_string())
}

/// Parse a calendar date. Accepts the layouts understood by [`parse_timestamp`] as well (the time
/// part is discarded).
pub fn parse_date(s: &str) -> Option<NaiveDate> {
    const LAYOUTS: [&str; 3] = ["%Y-%m-%d", "%m/%d/%Y", "%Y/%m/%d"];
    LAYOUTS
        .iter()
        .find_map(|layout| NaiveDate::parse_from_str(s, layout).ok())
        .or_else(|| parse_timestamp(s).map(|ts| ts.date()))
}

/// Parse a date-time. Offsets (RFC 3339) are converted to UTC; a bare date means midnight.
pub fn parse_timestamp(s: &str) -> Option<NaiveDateTime> {
    const LAYOUTS: [&str; 4] = [
        "%Y-%m-%d %H:%M:%S%.f",
        "%Y-%m-%dT%H:%M:%S%.f",
        "%Y-%m-%d %H:%M",
        "%m/%d/%Y %H:%M:%S",
    ];

    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc).naive_utc());
    }
    LAYOUTS
        .iter()
        .find_map(|layout| NaiveDateTime::parse_from_str(s, layout).ok())
        .or_else(|| {
            ["%Y-%m-%d", "%m/%d/%Y"]
                .iter()
                .find_map(|layout| NaiveDate::parse_from_str(s, layout).ok())
                .and_then(|d| d.and_hms_opt(0, 0, 0))
        })
}

/// In-memory tabular dataset.
///
/// Rows are stored as `Vec<Vec<Value>>` in the same order as the [`Schema`] fields.
#[derive(Debug, Clone, PartialEq)]
pub struct DataSet {
    /// Schema describing row shape.
    pub schema: Schema,
    /// Row-major value storage.
    pub rows: Vec<Vec<Value>>,
}

impl DataSet {
    /// Create a dataset from schema and rows.
    pub fn new(schema: Schema, rows: Vec<Vec<Value>>) -> Self {
        Self { schema, rows }
    }

    /// Create a dataset with the given schema and no rows.
    pub fn empty(schema: Schema) -> Self {
        Self::new(schema, Vec::new())
    }

    /// Number of rows in the dataset.
    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    /// Returns `true` if the dataset has no rows.
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Iterate the values of one column, or `None` if the column does not exist.
    pub fn column(&self, name: &str) -> Option<impl Iterator<Item = &Value>> {
        let idx = self.schema.index_of(name)?;
        Some(self.rows.iter().map(move |row| row.get(idx).unwrap_or(&NULL)))
    }

    /// Create a new dataset with `schema` by applying `mapper` to every row.
    ///
    /// Used when a mapping changes column types (e.g. text into dates).
    ///
    /// # Panics
    ///
    /// Panics if `mapper` returns a row with a different length than `schema`.
    pub fn map_rows_into<F>(&self, schema: Schema, mut mapper: F) -> Self
    where
        F: FnMut(&[Value]) -> Vec<Value>,
    {
        let expected_len = schema.fields.len();
        let rows = self
            .rows
            .iter()
            .map(|row| {
                let out = mapper(row.as_slice());
                assert!(
                    out.len() == expected_len,
                    "mapped row length {} does not match schema length {}",
                    out.len(),
                    expected_len
                );
                out
            })
            .collect();

        Self { schema, rows }
    }

    /// Project the dataset onto `columns` (in that order).
    ///
    /// Returns `None` if any requested column does not exist.
    pub fn select(&self, columns: &[&str]) -> Option<Self> {
        let idxs = columns
            .iter()
            .map(|c| self.schema.index_of(c))
            .collect::<Option<Vec<_>>>()?;

        let schema = Schema::new(idxs.iter().map(|&i| self.schema.fields[i].clone()).collect());
        let rows = self
            .rows
            .iter()
            .map(|row| idxs.iter().map(|&i| row.get(i).cloned().unwrap_or(Value::Null)).collect())
            .collect();
        Some(Self { schema, rows })
    }
}
