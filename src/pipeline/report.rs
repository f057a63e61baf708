use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::domain::Entity;
use crate::warehouse::LoadReport;

use super::observer::PipelineMetricsSnapshot;
use super::state::PipelineState;

/// Per-entity counts for one run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EntityReport {
    pub entity: Entity,
    pub source_available: bool,
    pub extracted: usize,
    pub approved: usize,
    pub rejected: usize,
    /// Rejected rows per reason code.
    pub reasons: BTreeMap<String, usize>,
    /// Rows dropped because a foreign key was not confirmed (transactions only).
    pub orphaned: usize,
    pub load: Option<LoadReport>,
}

impl EntityReport {
    pub fn new(entity: Entity) -> Self {
        Self {
            entity,
            source_available: false,
            extracted: 0,
            approved: 0,
            rejected: 0,
            reasons: BTreeMap::new(),
            orphaned: 0,
            load: None,
        }
    }

    pub fn committed(&self) -> usize {
        self.load.as_ref().map_or(0, |l| l.committed)
    }
}

/// Size of the post-commit identifier snapshot.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SnapshotReport {
    pub customers: usize,
    pub products: usize,
}

/// Summary of a completed run, written by the CLI as JSON on request.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunReport {
    pub run_id: String,
    pub started_at: DateTime<Utc>,
    pub elapsed_ms: u64,
    pub final_state: PipelineState,
    pub phases: Vec<PipelineState>,
    pub reset_ok: bool,
    pub customers: EntityReport,
    pub products: EntityReport,
    pub transactions: EntityReport,
    pub snapshot: SnapshotReport,
    pub metrics: PipelineMetricsSnapshot,
    /// `COUNT(*)` per table after the run.
    pub warehouse_rows: BTreeMap<String, usize>,
}

impl RunReport {
    pub fn entity(&self, entity: Entity) -> &EntityReport {
        match entity {
            Entity::Customer => &self.customers,
            Entity::FinancialProduct => &self.products,
            Entity::Transaction => &self.transactions,
        }
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}
