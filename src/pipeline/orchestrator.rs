use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Instant;

use chrono::Utc;
use tracing::{info, info_span, warn};

use crate::config::PipelineConfig;
use crate::domain::Entity;
use crate::error::PipelineError;
use crate::ingestion::Extractor;
use crate::processing::normalize;
use crate::quality::{CsvQuarantine, Validator};
use crate::types::DataSet;
use crate::warehouse::{LoadReport, Table, Warehouse};

use super::cross_filter::{cross_filter, ConfirmedIds};
use super::observer::{PipelineEvent, PipelineMetrics, PipelineObserver, TracingPipelineObserver};
use super::report::{EntityReport, RunReport, SnapshotReport};
use super::state::{PipelineState, StateMachine};

/// Drives one run through the phase sequence against an open [`Warehouse`].
pub struct Pipeline<'a> {
    config: &'a PipelineConfig,
    warehouse: Warehouse,
    extractor: Extractor,
    validator: Validator,
    observer: Arc<dyn PipelineObserver>,
    machine: StateMachine,
    metrics: PipelineMetrics,
    run_id: String,
}

impl std::fmt::Debug for Pipeline<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pipeline")
            .field("run_id", &self.run_id)
            .field("state", &self.machine.state())
            .finish_non_exhaustive()
    }
}

impl<'a> Pipeline<'a> {
    pub fn new(config: &'a PipelineConfig, warehouse: Warehouse, validator: Validator) -> Self {
        Self {
            config,
            warehouse,
            extractor: Extractor::default(),
            validator,
            observer: Arc::new(TracingPipelineObserver),
            machine: StateMachine::new(),
            metrics: PipelineMetrics::new(),
            run_id: new_run_id(),
        }
    }

    pub fn with_observer(mut self, observer: Arc<dyn PipelineObserver>) -> Self {
        self.observer = observer;
        self
    }

    pub fn with_extractor(mut self, extractor: Extractor) -> Self {
        self.extractor = extractor;
        self
    }

    pub fn with_run_id(mut self, run_id: impl Into<String>) -> Self {
        self.run_id = run_id.into();
        self
    }

    pub fn state(&self) -> PipelineState {
        self.machine.state()
    }

    pub fn warehouse(&self) -> &Warehouse {
        &self.warehouse
    }

    pub fn into_warehouse(self) -> Warehouse {
        self.warehouse
    }

    fn emit(&self, event: PipelineEvent) {
        self.observer.on_event(&event);
    }

    fn advance(&mut self, to: PipelineState) -> Result<(), PipelineError> {
        let from = self.machine.transition(to)?;
        self.emit(PipelineEvent::PhaseChanged { from, to });
        Ok(())
    }

    /// Run every phase once.
    ///
    /// Source, quality and persistence problems are logged and reflected in the report; only a
    /// phase-order violation (e.g. running the same pipeline twice) returns an error.
    pub fn run(&mut self) -> Result<RunReport, PipelineError> {
        let _span = info_span!("pipeline_run", run_id = %self.run_id).entered();
        let started_at = Utc::now();
        let start = Instant::now();
        self.emit(PipelineEvent::RunStarted {
            run_id: self.run_id.clone(),
        });

        self.advance(PipelineState::Reset)?;
        let reset_ok = match self.warehouse.reset_schema() {
            Ok(()) => true,
            Err(err) => {
                warn!(error = %err, "reset failed; continuing with existing rows");
                false
            }
        };

        self.advance(PipelineState::LoadCustomers)?;
        let customers = self.load_entity(Entity::Customer);

        self.advance(PipelineState::LoadProducts)?;
        let products = self.load_entity(Entity::FinancialProduct);

        self.advance(PipelineState::SnapshotIds)?;
        let ids = ConfirmedIds::snapshot(&self.warehouse);
        let snapshot = SnapshotReport {
            customers: ids.customers.len(),
            products: ids.products.len(),
        };
        self.emit(PipelineEvent::Snapshot {
            customers: snapshot.customers,
            products: snapshot.products,
        });

        self.advance(PipelineState::LoadTransactions)?;
        let transactions = self.load_transactions(&ids);

        self.advance(PipelineState::Done)?;
        let elapsed = start.elapsed();
        let metrics = self.metrics.snapshot();
        self.emit(PipelineEvent::RunFinished { elapsed, metrics });

        Ok(RunReport {
            run_id: self.run_id.clone(),
            started_at,
            elapsed_ms: u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX),
            final_state: self.machine.state(),
            phases: self.machine.history().to_vec(),
            reset_ok,
            customers,
            products,
            transactions,
            snapshot,
            metrics,
            warehouse_rows: self.warehouse_rows(),
        })
    }

    /// Extract, normalize and validate one entity. Returns the approved rows.
    fn stage(&self, entity: Entity, report: &mut EntityReport) -> DataSet {
        let _span = info_span!("stage", entity = %entity).entered();

        let source = self.config.sources.for_entity(entity);
        let extraction = self.extractor.extract(source, &entity.raw_schema());
        report.source_available = extraction.is_available();
        let raw = extraction.into_dataset();
        report.extracted = raw.row_count();
        self.metrics.on_extracted(report.extracted);
        self.emit(PipelineEvent::Extracted {
            entity,
            rows: report.extracted,
            available: report.source_available,
        });

        let normalized = normalize(entity, &raw);
        let partition = self.validator.validate_with_source(entity, &normalized, &raw);
        report.approved = partition.approved.row_count();
        report.rejected = partition.rejected.row_count();
        report.reasons = partition.reason_counts();
        self.metrics.on_validated(report.approved, report.rejected);
        self.emit(PipelineEvent::Validated {
            entity,
            approved: report.approved,
            rejected: report.rejected,
        });

        if partition.approved.is_empty() {
            warn!(entity = %entity, "no approved rows");
        }
        partition.approved
    }

    fn load_entity(&mut self, entity: Entity) -> EntityReport {
        let mut report = EntityReport::new(entity);
        let approved = self.stage(entity, &mut report);
        report.load = Some(self.load(&approved, Table::for_entity(entity)));
        report
    }

    fn load_transactions(&mut self, ids: &ConfirmedIds) -> EntityReport {
        let mut report = EntityReport::new(Entity::Transaction);
        let approved = self.stage(Entity::Transaction, &mut report);

        let filtered = cross_filter(&approved, ids);
        report.orphaned = filtered.orphaned.row_count();
        self.metrics.on_orphaned(report.orphaned);
        self.emit(PipelineEvent::CrossFiltered {
            retained: filtered.retained.row_count(),
            orphaned: report.orphaned,
        });

        report.load = Some(self.load(&filtered.retained, Table::Transactions));
        report
    }

    /// Project onto the table's columns and load.
    fn load(&mut self, approved: &DataSet, table: Table) -> LoadReport {
        let projected = approved.select(table.columns());
        let report = self.warehouse.load(projected.as_ref().unwrap_or(approved), table);
        self.metrics.on_committed(report.committed);
        self.emit(PipelineEvent::Loaded { report: report.clone() });
        report
    }

    fn warehouse_rows(&self) -> BTreeMap<String, usize> {
        Table::DELETE_ORDER
            .iter()
            .filter_map(|&t| match self.warehouse.row_count(t) {
                Ok(n) => Some((t.name().to_string(), n)),
                Err(err) => {
                    warn!(table = %t, error = %err, "row count unavailable");
                    None
                }
            })
            .collect()
    }
}

fn new_run_id() -> String {
    Utc::now().format("%Y%m%dT%H%M%S%3f").to_string()
}

/// Open the configured warehouse and run the pipeline with default collaborators.
pub fn run_pipeline(config: &PipelineConfig) -> Result<RunReport, PipelineError> {
    run_pipeline_with_observer(config, Arc::new(TracingPipelineObserver))
}

/// [`run_pipeline`] with a caller-supplied observer.
///
/// A warehouse that cannot be opened moves the run to `Failed` and returns
/// [`PipelineError::Setup`].
pub fn run_pipeline_with_observer(
    config: &PipelineConfig,
    observer: Arc<dyn PipelineObserver>,
) -> Result<RunReport, PipelineError> {
    config.validate()?;
    let run_id = new_run_id();

    let warehouse = match Warehouse::open(&config.warehouse) {
        Ok(wh) => wh,
        Err(err) => {
            let mut machine = StateMachine::new();
            let from = machine.transition(PipelineState::Failed)?;
            observer.on_event(&PipelineEvent::PhaseChanged {
                from,
                to: PipelineState::Failed,
            });
            observer.on_event(&PipelineEvent::RunFailed {
                state: from,
                message: err.to_string(),
            });
            return Err(PipelineError::Setup(err));
        }
    };

    let validator = Validator::new(CsvQuarantine::with_run_id(&config.quarantine.dir, &run_id));
    let report = Pipeline::new(config, warehouse, validator)
        .with_observer(observer)
        .with_run_id(run_id)
        .run()?;

    info!(
        run_id = %report.run_id,
        customers = report.customers.committed(),
        products = report.products.committed(),
        transactions = report.transactions.committed(),
        orphaned = report.transactions.orphaned,
        "run complete"
    );
    Ok(report)
}
