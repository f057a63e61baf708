//! Ingestion entrypoints and implementations.
//!
//! Pipeline code should use [`Extractor`] (from [`extract`]) which wraps [`ingest_from_path`] and
//! turns failures into an empty, schema-shaped [`Extraction::Unavailable`] instead of an error.
//!
//! [`ingest_from_path`] (from [`unified`]):
//!
//! - auto-detects format by file extension (or you can override via [`IngestionOptions`])
//! - performs ingestion into an in-memory [`crate::types::DataSet`]
//! - optionally reports success/failure/alerts to an [`IngestionObserver`]
//!
//! Format-specific functions are also available under:
//! - [`csv`]
//! - [`json`]
//! - [`parquet`]
//! - `excel` (feature `excel`)

pub mod csv;
#[cfg(feature = "excel")]
pub mod excel;
pub mod extract;
pub mod json;
pub mod observability;
pub mod parquet;
pub mod unified;

pub use extract::{Extraction, Extractor, SourceDescriptor};
pub use observability::{IngestionContext, IngestionObserver, IngestionSeverity, IngestionStats, TracingObserver};
pub use unified::{ingest_from_path, severity_for_error, IngestionFormat, IngestionOptions};
