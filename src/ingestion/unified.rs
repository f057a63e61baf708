//! Unified ingestion entrypoint.
//!
//! Most callers should use [`ingest_from_path`], which ingests a file into an in-memory
//! [`crate::types::DataSet`] using a provided [`crate::types::Schema`].
//!
//! - If [`IngestionOptions::format`] is `None`, the ingestion format is inferred from the file
//!   extension.
//! - If an [`super::observability::IngestionObserver`] is provided, success/failure/alerts are
//!   reported to it.

use std::error::Error as StdError;
use std::fmt;
use std::path::Path;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::error::{IngestionError, IngestionResult};
use crate::types::{DataSet, Schema};

use super::observability::{IngestionContext, IngestionObserver, IngestionSeverity, IngestionStats};
use super::{csv, json, parquet};

/// Supported ingestion formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IngestionFormat {
    /// Comma-separated values.
    Csv,
    /// JSON array-of-objects or NDJSON.
    Json,
    /// Apache Parquet.
    Parquet,
    /// Spreadsheet/workbook formats (feature-gated behind `excel`).
    Excel,
}

impl IngestionFormat {
    /// Parse an ingestion format from a file extension (case-insensitive).
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_ascii_lowercase().as_str() {
            "csv" => Some(Self::Csv),
            "json" | "ndjson" => Some(Self::Json),
            "parquet" | "pq" => Some(Self::Parquet),
            "xlsx" | "xls" | "xlsm" | "xlsb" | "ods" => Some(Self::Excel),
            _ => None,
        }
    }
}

/// Options controlling unified ingestion behavior.
///
/// Use [`Default`] for common cases.
#[derive(Clone)]
pub struct IngestionOptions {
    /// If `None`, auto-detect format from file extension.
    pub format: Option<IngestionFormat>,
    /// Workbook sheet to read; `None` reads the first sheet.
    pub sheet: Option<String>,
    /// Optional observer for logging/alerts.
    pub observer: Option<Arc<dyn IngestionObserver>>,
    /// Severity threshold at which `on_alert` is invoked.
    pub alert_at_or_above: IngestionSeverity,
}

impl fmt::Debug for IngestionOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IngestionOptions")
            .field("format", &self.format)
            .field("sheet", &self.sheet)
            .field("observer_set", &self.observer.is_some())
            .field("alert_at_or_above", &self.alert_at_or_above)
            .finish()
    }
}

impl Default for IngestionOptions {
    fn default() -> Self {
        Self {
            format: None,
            sheet: None,
            observer: None,
            alert_at_or_above: IngestionSeverity::Critical,
        }
    }
}

/// Unified ingestion entry point for path-based sources.
///
/// When an observer is configured, this function reports:
///
/// - `on_success` on success, with row count stats
/// - `on_alert` on failure when the computed severity is >= `options.alert_at_or_above`
/// - `on_failure` on any other failure, with the computed severity
///
/// Each failure is reported through exactly one of the two callbacks.
///
/// # Examples
///
/// ```no_run
/// use finance_etl::ingestion::{ingest_from_path, IngestionOptions};
/// use finance_etl::types::{DataType, Field, Schema};
///
/// # fn main() -> Result<(), finance_etl::IngestionError> {
/// let schema = Schema::new(vec![
///     Field::new("customer_id", DataType::Utf8),
///     Field::optional("segment", DataType::Utf8),
/// ]);
///
/// // Uses `.csv` to select CSV ingestion.
/// let ds = ingest_from_path("customers_raw.csv", &schema, &IngestionOptions::default())?;
/// println!("rows={}", ds.row_count());
/// # Ok(())
/// # }
/// ```
///
/// Force a format (and pick a sheet) when the extension is missing or misleading:
///
/// ```no_run
/// use finance_etl::ingestion::{ingest_from_path, IngestionFormat, IngestionOptions};
/// use finance_etl::types::{DataType, Field, Schema};
///
/// # fn main() -> Result<(), finance_etl::IngestionError> {
/// let schema = Schema::new(vec![Field::new("product_id", DataType::Utf8)]);
/// let opts = IngestionOptions {
///     format: Some(IngestionFormat::Excel),
///     sheet: Some("master".to_string()),
///     ..Default::default()
/// };
/// let ds = ingest_from_path("products_export", &schema, &opts)?;
/// println!("rows={}", ds.row_count());
/// # Ok(())
/// # }
/// ```
pub fn ingest_from_path(
    path: impl AsRef<Path>,
    schema: &Schema,
    options: &IngestionOptions,
) -> IngestionResult<DataSet> {
    let path = path.as_ref();
    let fmt = infer_or(options.format, path)?;
    let ctx = IngestionContext {
        path: path.to_path_buf(),
        format: fmt,
    };

    let result = match fmt {
        IngestionFormat::Csv => csv::ingest_csv_from_path(path, schema),
        IngestionFormat::Json => json::ingest_json_from_path(path, schema),
        IngestionFormat::Parquet => parquet::ingest_parquet_from_path(path, schema),
        IngestionFormat::Excel => ingest_excel_dispatch(path, schema, options.sheet.as_deref()),
    };

    report(options, &ctx, &result);
    result
}

fn report(options: &IngestionOptions, ctx: &IngestionContext, result: &IngestionResult<DataSet>) {
    let Some(obs) = options.observer.as_ref() else {
        return;
    };
    match result {
        Ok(ds) => obs.on_success(ctx, IngestionStats { rows: ds.row_count() }),
        Err(e) => {
            let sev = severity_for_error(e);
            if sev >= options.alert_at_or_above {
                obs.on_alert(ctx, sev, e);
            } else {
                obs.on_failure(ctx, sev, e);
            }
        }
    }
}

/// Classify an ingestion failure. I/O problems (missing file, permissions) are `Critical`.
pub fn severity_for_error(e: &IngestionError) -> IngestionSeverity {
    match e {
        IngestionError::Io(_) => IngestionSeverity::Critical,
        IngestionError::Parquet(err) => {
            // Parquet errors often wrap IO, but not always in a structured way.
            if error_chain_contains_io(err) {
                IngestionSeverity::Critical
            } else {
                IngestionSeverity::Error
            }
        }
        IngestionError::Csv(err) => match err.kind() {
            ::csv::ErrorKind::Io(_) => IngestionSeverity::Critical,
            _ => IngestionSeverity::Error,
        },
        #[cfg(feature = "excel")]
        IngestionError::Excel(err) => {
            if error_chain_contains_io(err) {
                IngestionSeverity::Critical
            } else {
                IngestionSeverity::Error
            }
        }
        IngestionError::SchemaMismatch { .. } => IngestionSeverity::Error,
        IngestionError::ParseError { .. } => IngestionSeverity::Error,
    }
}

fn error_chain_contains_io(e: &(dyn StdError + 'static)) -> bool {
    let mut cur: Option<&(dyn StdError + 'static)> = Some(e);
    while let Some(err) = cur {
        if err.is::<std::io::Error>() {
            return true;
        }
        cur = err.source();
    }
    false
}

fn infer_or(format: Option<IngestionFormat>, path: &Path) -> IngestionResult<IngestionFormat> {
    if let Some(f) = format {
        return Ok(f);
    }

    let ext = path
        .extension()
        .and_then(|s| s.to_str())
        .ok_or_else(|| IngestionError::SchemaMismatch {
            message: format!(
                "cannot infer format: path has no extension ({})",
                path.display()
            ),
        })?;

    IngestionFormat::from_extension(ext).ok_or_else(|| IngestionError::SchemaMismatch {
        message: format!(
            "cannot infer format from extension '{ext}' for path ({})",
            path.display()
        ),
    })
}

fn ingest_excel_dispatch(path: &Path, schema: &Schema, sheet: Option<&str>) -> IngestionResult<DataSet> {
    #[cfg(feature = "excel")]
    {
        super::excel::ingest_excel_from_path(path, sheet, schema)
    }

    #[cfg(not(feature = "excel"))]
    {
        let _ = (path, schema, sheet);
        Err(IngestionError::SchemaMismatch {
            message: "excel ingestion not enabled (enable cargo feature 'excel')".to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;

    #[test]
    fn formats_deserialize_from_lowercase_names() {
        #[derive(Deserialize)]
        struct Wrapper {
            format: IngestionFormat,
        }
        let w: Wrapper = toml::from_str("format = \"excel\"").unwrap();
        assert_eq!(w.format, IngestionFormat::Excel);
    }

    #[test]
    fn io_failures_are_critical() {
        let err = IngestionError::Io(std::io::Error::from(std::io::ErrorKind::NotFound));
        assert_eq!(severity_for_error(&err), IngestionSeverity::Critical);
        let err = IngestionError::SchemaMismatch { message: "x".to_string() };
        assert_eq!(severity_for_error(&err), IngestionSeverity::Error);
    }

    #[derive(Default)]
    struct CountingObserver {
        failures: AtomicUsize,
        alerts: AtomicUsize,
    }

    impl IngestionObserver for CountingObserver {
        fn on_failure(&self, _: &IngestionContext, _: IngestionSeverity, _: &IngestionError) {
            self.failures.fetch_add(1, Ordering::Relaxed);
        }

        fn on_alert(&self, _: &IngestionContext, _: IngestionSeverity, _: &IngestionError) {
            self.alerts.fetch_add(1, Ordering::Relaxed);
        }
    }

    #[test]
    fn each_failure_is_reported_once() {
        let observer = Arc::new(CountingObserver::default());
        let schema = Schema::new(vec![crate::types::Field::new("id", crate::types::DataType::Utf8)]);
        let options = IngestionOptions {
            observer: Some(observer.clone()),
            ..Default::default()
        };

        let _ = ingest_from_path("definitely/missing.csv", &schema, &options);
        assert_eq!(observer.alerts.load(Ordering::Relaxed), 1);
        assert_eq!(observer.failures.load(Ordering::Relaxed), 0);

        // No `id` header: a schema mismatch stays below the default threshold.
        let _ = ingest_from_path("tests/fixtures/products.csv", &schema, &options);
        assert_eq!(observer.alerts.load(Ordering::Relaxed), 1);
        assert_eq!(observer.failures.load(Ordering::Relaxed), 1);
    }

    #[test]
    fn unknown_extension_is_schema_mismatch() {
        let err = infer_or(None, Path::new("data/raw/customers.txt")).unwrap_err();
        assert!(matches!(err, IngestionError::SchemaMismatch { .. }));
        assert_eq!(
            infer_or(None, Path::new("x.NDJSON")).unwrap(),
            IngestionFormat::Json
        );
    }
}
