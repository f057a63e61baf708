use std::path::PathBuf;

use thiserror::Error;

use crate::pipeline::PipelineState;

/// Convenience result type for ingestion operations.
pub type IngestionResult<T> = Result<T, IngestionError>;

/// Error type returned by ingestion functions.
///
/// This is a single error enum shared across CSV/JSON/Parquet (and optional Excel) ingestion.
/// The [`crate::ingestion::Extractor`] turns it into an
/// [`crate::ingestion::Extraction::Unavailable`] outcome instead of propagating it.
#[derive(Debug, Error)]
pub enum IngestionError {
    /// Underlying I/O error (e.g. file not found, permission denied).
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[cfg(feature = "excel")]
    /// Excel ingestion error (feature-gated behind `excel`).
    #[error("excel error: {0}")]
    Excel(#[from] calamine::Error),

    /// CSV ingestion error.
    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),

    /// Parquet ingestion error.
    #[error("parquet error: {0}")]
    Parquet(#[from] parquet::errors::ParquetError),

    /// The input does not conform to the provided schema (missing required fields/columns, etc.).
    #[error("schema mismatch: {message}")]
    SchemaMismatch { message: String },

    /// A value could not be parsed into the required [`crate::types::DataType`].
    #[error("failed to parse value at row {row} column '{column}': {message} (raw='{raw}')")]
    ParseError {
        row: usize,
        column: String,
        raw: String,
        message: String,
    },
}

/// Errors raised by the SQLite warehouse.
#[derive(Debug, Error)]
pub enum WarehouseError {
    /// The warehouse could not be opened or provisioned.
    #[error("cannot open warehouse at {path}: {message}")]
    Setup { path: PathBuf, message: String },

    /// Underlying SQLite error.
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// A column outside the table's allow-list was requested or supplied.
    #[error("table '{table}' has no column '{column}'")]
    UnknownColumn { table: String, column: String },
}

/// Errors raised while writing quarantined rows.
#[derive(Debug, Error)]
pub enum QuarantineError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),
}

/// Errors raised while reading or validating configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read config {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("invalid config value: {0}")]
    Invalid(String),
}

/// Unrecoverable pipeline errors. Everything else is logged and absorbed by the run.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// The warehouse connection could not be established.
    #[error("setup failure: {0}")]
    Setup(#[from] WarehouseError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    /// The orchestrator was driven out of its phase order.
    #[error("invalid phase transition {from:?} -> {to:?}")]
    InvalidTransition { from: PipelineState, to: PipelineState },
}
