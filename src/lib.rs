//! `finance-etl` is a batch ETL for a small financial domain: customers, financial products and
//! the transactions linking them.
//!
//! A run extracts each entity from its configured source, normalizes it, routes rows that fail
//! quality rules to a quarantine file, and loads the rest into a SQLite warehouse. Transactions
//! are admitted only when both foreign keys are among the identifiers the warehouse actually
//! committed, so a parent row that failed to persist never leaves a dangling child.
//!
//! ## Sources
//!
//! **File formats (auto-detected by extension):**
//!
//! - **CSV**: `.csv`
//! - **JSON**: `.json` (array-of-objects) and `.ndjson` (newline-delimited objects)
//! - **Parquet**: `.parquet`, `.pq`
//! - **Excel/workbooks** (Cargo feature `excel`, on by default): `.xlsx`, `.xls`, `.xlsm`, `.xlsb`, `.ods`
//!
//! A missing or unreadable source does not abort the run: the [`ingestion::Extractor`] logs it
//! and yields an empty dataset with the entity's schema.
//!
//! ## Quick example: ingest data
//!
//! ```no_run
//! use finance_etl::ingestion::{ingest_from_path, IngestionOptions};
//! use finance_etl::types::{DataType, Field, Schema};
//!
//! # fn main() -> Result<(), finance_etl::IngestionError> {
//! let schema = Schema::new(vec![
//!     Field::new("customer_id", DataType::Utf8),
//!     Field::new("name", DataType::Utf8),
//! ]);
//! let ds = ingest_from_path("customers_raw.csv", &schema, &IngestionOptions::default())?;
//! println!("rows={}", ds.row_count());
//! # Ok(())
//! # }
//! ```
//!
//! ## Running the pipeline
//!
//! ```no_run
//! use finance_etl::config::PipelineConfig;
//! use finance_etl::pipeline::run_pipeline;
//!
//! # fn main() -> anyhow::Result<()> {
//! let config = PipelineConfig::load(Some("finance-etl.toml".as_ref()))?;
//! let report = run_pipeline(&config)?;
//! println!("{}", report.metrics);
//! # Ok(())
//! # }
//! ```
//!
//! ## Modules
//!
//! - [`types`]: schema + in-memory dataset types
//! - [`domain`]: entities, column names and categorical vocabularies
//! - [`ingestion`]: format readers and the fault-tolerant [`ingestion::Extractor`]
//! - [`processing`]: row transformations and per-entity normalization
//! - [`quality`]: validation rules, partitioning and quarantine sinks
//! - [`warehouse`]: SQLite schema, chunked loads and confirmed-id reads
//! - [`pipeline`]: the phase state machine, cross-filter and run report
//! - [`config`] / [`logging`]: TOML configuration and `tracing` setup
//! - [`error`]: error types

pub mod config;
pub mod domain;
pub mod error;
pub mod ingestion;
pub mod logging;
pub mod pipeline;
pub mod processing;
pub mod quality;
pub mod types;
pub mod warehouse;

pub use error::{
    ConfigError, IngestionError, IngestionResult, PipelineError, QuarantineError, WarehouseError,
};
