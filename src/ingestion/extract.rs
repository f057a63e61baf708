//! Fault-tolerant extraction of one configured source.
//!
//! [`Extractor::extract`] never fails: an unreadable source becomes
//! [`Extraction::Unavailable`] carrying an empty dataset with the requested schema, so downstream
//! stages always receive a table.

use std::path::PathBuf;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::error::IngestionError;
use crate::types::{DataSet, Schema};

use super::observability::{IngestionObserver, IngestionSeverity, TracingObserver};
use super::unified::{ingest_from_path, IngestionFormat, IngestionOptions};

/// Where and how to read a raw source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceDescriptor {
    /// File to read.
    pub path: PathBuf,
    /// Explicit format; inferred from the extension when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub format: Option<IngestionFormat>,
    /// Workbook sheet (Excel only); first sheet when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sheet: Option<String>,
}

impl SourceDescriptor {
    /// Describe a source by path only.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            format: None,
            sheet: None,
        }
    }
}

/// Outcome of extracting one source.
#[derive(Debug)]
pub enum Extraction {
    /// The source was read.
    Loaded(DataSet),
    /// The source could not be read. `dataset` is empty and carries the requested schema.
    Unavailable {
        dataset: DataSet,
        reason: IngestionError,
    },
}

impl Extraction {
    /// Borrow the extracted (possibly empty) dataset.
    pub fn dataset(&self) -> &DataSet {
        match self {
            Extraction::Loaded(ds) => ds,
            Extraction::Unavailable { dataset, .. } => dataset,
        }
    }

    /// Take the extracted (possibly empty) dataset.
    pub fn into_dataset(self) -> DataSet {
        match self {
            Extraction::Loaded(ds) => ds,
            Extraction::Unavailable { dataset, .. } => dataset,
        }
    }

    pub fn is_available(&self) -> bool {
        matches!(self, Extraction::Loaded(_))
    }
}

/// Reads sources and reports every outcome to an [`IngestionObserver`].
#[derive(Clone)]
pub struct Extractor {
    observer: Arc<dyn IngestionObserver>,
    alert_at_or_above: IngestionSeverity,
}

impl Default for Extractor {
    fn default() -> Self {
        Self::new(Arc::new(TracingObserver))
    }
}

impl std::fmt::Debug for Extractor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Extractor")
            .field("alert_at_or_above", &self.alert_at_or_above)
            .finish_non_exhaustive()
    }
}

impl Extractor {
    pub fn new(observer: Arc<dyn IngestionObserver>) -> Self {
        Self {
            observer,
            alert_at_or_above: IngestionSeverity::Critical,
        }
    }

    /// Change the severity at which failures are escalated through `on_alert`.
    pub fn with_alert_threshold(mut self, severity: IngestionSeverity) -> Self {
        self.alert_at_or_above = severity;
        self
    }

    /// Read `source` into a dataset shaped by `schema`.
    pub fn extract(&self, source: &SourceDescriptor, schema: &Schema) -> Extraction {
        let options = IngestionOptions {
            format: source.format,
            sheet: source.sheet.clone(),
            observer: Some(Arc::clone(&self.observer)),
            alert_at_or_above: self.alert_at_or_above,
        };

        match ingest_from_path(&source.path, schema, &options) {
            Ok(ds) => Extraction::Loaded(ds),
            Err(reason) => Extraction::Unavailable {
                dataset: DataSet::empty(schema.clone()),
                reason,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{DataType, Field};

    #[test]
    fn missing_file_yields_empty_dataset_with_schema() {
        let schema = Schema::new(vec![Field::new("customer_id", DataType::Utf8)]);
        let out = Extractor::default().extract(&SourceDescriptor::new("definitely/missing.csv"), &schema);

        assert!(!out.is_available());
        assert!(matches!(
            out,
            Extraction::Unavailable {
                reason: IngestionError::Csv(_) | IngestionError::Io(_),
                ..
            }
        ));
        let ds = out.into_dataset();
        assert!(ds.is_empty());
        assert_eq!(ds.schema, schema);
    }

    #[test]
    fn descriptor_deserializes_with_optional_fields() {
        let d: SourceDescriptor =
            toml::from_str("path = \"data/raw/products_master.xlsx\"\nsheet = \"master\"").unwrap();
        assert_eq!(d.format, None);
        assert_eq!(d.sheet.as_deref(), Some("master"));
    }
}
