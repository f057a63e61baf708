//! Quarantine sinks for rejected rows.

use std::fs::{self, File};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use chrono::Utc;

use crate::domain::Entity;
use crate::error::QuarantineError;
use crate::types::DataSet;

/// Destination for rejected rows, keyed by entity.
pub trait QuarantineSink {
    /// Persist `rejected` (which carries a `reject_reason` column) for `entity`.
    fn write(&self, entity: Entity, rejected: &DataSet) -> Result<(), QuarantineError>;
}

impl<T: QuarantineSink + ?Sized> QuarantineSink for Arc<T> {
    fn write(&self, entity: Entity, rejected: &DataSet) -> Result<(), QuarantineError> {
        (**self).write(entity, rejected)
    }
}

/// Writes one CSV file per entity per run: `<dir>/<entity>_rejected_<run_id>.csv`.
///
/// Files are created with `create_new`; an existing file is never overwritten.
#[derive(Debug, Clone)]
pub struct CsvQuarantine {
    dir: PathBuf,
    run_id: String,
}

impl CsvQuarantine {
    /// Quarantine into `dir` with a timestamp-derived run id.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self::with_run_id(dir, Utc::now().format("%Y%m%dT%H%M%S%3f").to_string())
    }

    pub fn with_run_id(dir: impl Into<PathBuf>, run_id: impl Into<String>) -> Self {
        Self {
            dir: dir.into(),
            run_id: run_id.into(),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn run_id(&self) -> &str {
        &self.run_id
    }

    /// File that rejected rows of `entity` are written to.
    pub fn path_for(&self, entity: Entity) -> PathBuf {
        self.dir
            .join(format!("{}_rejected_{}.csv", entity.name(), self.run_id))
    }
}

impl QuarantineSink for CsvQuarantine {
    fn write(&self, entity: Entity, rejected: &DataSet) -> Result<(), QuarantineError> {
        fs::create_dir_all(&self.dir)?;
        let file = File::options()
            .write(true)
            .create_new(true)
            .open(self.path_for(entity))?;

        let mut wtr = csv::Writer::from_writer(file);
        wtr.write_record(rejected.schema.field_names())?;
        for row in &rejected.rows {
            wtr.write_record(row.iter().map(|v| v.to_string()))?;
        }
        wtr.flush()?;
        Ok(())
    }
}

/// Keeps rejected datasets in memory. Useful for embedding and tests.
#[derive(Debug, Default)]
pub struct MemoryQuarantine {
    batches: Mutex<Vec<(Entity, DataSet)>>,
}

impl MemoryQuarantine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rejected rows recorded for `entity`, concatenated in write order.
    pub fn rejected(&self, entity: Entity) -> Option<DataSet> {
        let batches = self.batches.lock().ok()?;
        let mut matching = batches.iter().filter(|(e, _)| *e == entity);
        let (_, first) = matching.next()?;
        let mut out = first.clone();
        for (_, ds) in matching {
            out.rows.extend(ds.rows.iter().cloned());
        }
        Some(out)
    }
}

impl QuarantineSink for MemoryQuarantine {
    fn write(&self, entity: Entity, rejected: &DataSet) -> Result<(), QuarantineError> {
        let mut batches = self
            .batches
            .lock()
            .map_err(|_| QuarantineError::Io(std::io::Error::other("quarantine lock poisoned")))?;
        batches.push((entity, rejected.clone()));
        Ok(())
    }
}
