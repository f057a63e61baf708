use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use tracing::{error, info, warn};

use crate::domain::Entity;
use crate::warehouse::LoadReport;

use super::state::PipelineState;

/// Events emitted by the orchestrator.
#[derive(Debug, Clone)]
pub enum PipelineEvent {
    RunStarted { run_id: String },
    PhaseChanged { from: PipelineState, to: PipelineState },
    Extracted { entity: Entity, rows: usize, available: bool },
    Validated { entity: Entity, approved: usize, rejected: usize },
    Loaded { report: LoadReport },
    Snapshot { customers: usize, products: usize },
    CrossFiltered { retained: usize, orphaned: usize },
    RunFinished {
        elapsed: Duration,
        metrics: PipelineMetricsSnapshot,
    },
    RunFailed { state: PipelineState, message: String },
}

/// Observer hook for pipeline events.
pub trait PipelineObserver: Send + Sync {
    fn on_event(&self, event: &PipelineEvent);
}

/// Logs pipeline events through `tracing`.
#[derive(Debug, Default)]
pub struct TracingPipelineObserver;

impl PipelineObserver for TracingPipelineObserver {
    fn on_event(&self, event: &PipelineEvent) {
        match event {
            PipelineEvent::RunStarted { run_id } => info!(%run_id, "pipeline started"),
            PipelineEvent::PhaseChanged { from, to } => info!(%from, %to, "phase"),
            PipelineEvent::Extracted { entity, rows, available } => {
                info!(entity = %entity, rows, available, "extracted")
            }
            PipelineEvent::Validated { entity, approved, rejected } => {
                info!(entity = %entity, approved, rejected, "validated")
            }
            PipelineEvent::Loaded { report } => match &report.failure {
                None => info!(table = %report.table, committed = report.committed, "loaded"),
                Some(f) => warn!(
                    table = %report.table,
                    committed = report.committed,
                    attempted = report.attempted,
                    chunk = ?f.chunk,
                    "partially loaded"
                ),
            },
            PipelineEvent::Snapshot { customers, products } => {
                info!(customers, products, "confirmed ids snapshot")
            }
            PipelineEvent::CrossFiltered { retained, orphaned } => {
                info!(retained, orphaned, "cross-filtered transactions")
            }
            PipelineEvent::RunFinished { elapsed, metrics } => {
                info!(elapsed_ms = elapsed.as_millis() as u64, %metrics, "pipeline finished")
            }
            PipelineEvent::RunFailed { state, message } => error!(%state, %message, "pipeline failed"),
        }
    }
}

/// Records every event in memory.
#[derive(Debug, Default)]
pub struct RecordingPipelineObserver {
    events: Mutex<Vec<PipelineEvent>>,
}

impl RecordingPipelineObserver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<PipelineEvent> {
        self.events.lock().map(|e| e.clone()).unwrap_or_default()
    }

    /// Target phases of every `PhaseChanged` event, in order.
    pub fn phases(&self) -> Vec<PipelineState> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                PipelineEvent::PhaseChanged { to, .. } => Some(to),
                _ => None,
            })
            .collect()
    }
}

impl PipelineObserver for RecordingPipelineObserver {
    fn on_event(&self, event: &PipelineEvent) {
        if let Ok(mut events) = self.events.lock() {
            events.push(event.clone());
        }
    }
}

/// Row counters for a run.
///
/// The orchestrator updates these as rows move through the stages; callers can snapshot them at
/// any time.
#[derive(Debug, Default)]
pub struct PipelineMetrics {
    rows_extracted: AtomicU64,
    rows_approved: AtomicU64,
    rows_rejected: AtomicU64,
    rows_orphaned: AtomicU64,
    rows_committed: AtomicU64,
}

impl PipelineMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on_extracted(&self, rows: usize) {
        self.rows_extracted.fetch_add(rows as u64, Ordering::SeqCst);
    }

    pub fn on_validated(&self, approved: usize, rejected: usize) {
        self.rows_approved.fetch_add(approved as u64, Ordering::SeqCst);
        self.rows_rejected.fetch_add(rejected as u64, Ordering::SeqCst);
    }

    pub fn on_orphaned(&self, rows: usize) {
        self.rows_orphaned.fetch_add(rows as u64, Ordering::SeqCst);
    }

    pub fn on_committed(&self, rows: usize) {
        self.rows_committed.fetch_add(rows as u64, Ordering::SeqCst);
    }

    pub fn snapshot(&self) -> PipelineMetricsSnapshot {
        PipelineMetricsSnapshot {
            rows_extracted: self.rows_extracted.load(Ordering::SeqCst),
            rows_approved: self.rows_approved.load(Ordering::SeqCst),
            rows_rejected: self.rows_rejected.load(Ordering::SeqCst),
            rows_orphaned: self.rows_orphaned.load(Ordering::SeqCst),
            rows_committed: self.rows_committed.load(Ordering::SeqCst),
        }
    }
}

/// Immutable snapshot of [`PipelineMetrics`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, serde::Serialize)]
pub struct PipelineMetricsSnapshot {
    pub rows_extracted: u64,
    pub rows_approved: u64,
    pub rows_rejected: u64,
    pub rows_orphaned: u64,
    pub rows_committed: u64,
}

impl fmt::Display for PipelineMetricsSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "extracted={}, approved={}, rejected={}, orphaned={}, committed={}",
            self.rows_extracted, self.rows_approved, self.rows_rejected, self.rows_orphaned, self.rows_committed
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn metrics_accumulate_across_entities() {
        let m = PipelineMetrics::new();
        m.on_extracted(100);
        m.on_validated(97, 3);
        m.on_extracted(4);
        m.on_validated(4, 0);
        m.on_committed(101);

        let s = m.snapshot();
        assert_eq!(s.rows_extracted, 104);
        assert_eq!(s.rows_approved, 101);
        assert_eq!(s.rows_rejected, 3);
        assert_eq!(
            s.to_string(),
            "extracted=104, approved=101, rejected=3, orphaned=0, committed=101"
        );
    }

    #[test]
    fn recording_observer_lists_phase_targets() {
        let obs = RecordingPipelineObserver::new();
        obs.on_event(&PipelineEvent::RunStarted { run_id: "r".into() });
        obs.on_event(&PipelineEvent::PhaseChanged {
            from: PipelineState::Init,
            to: PipelineState::Reset,
        });
        assert_eq!(obs.phases(), vec![PipelineState::Reset]);
        assert_eq!(obs.events().len(), 2);
    }
}
