//! Pipeline orchestration.
//!
//! A run moves through `Init → Reset → LoadCustomers → LoadProducts → SnapshotIds →
//! LoadTransactions → Done`. Transactions are admitted only if their customer and product ids are
//! among the identifiers the warehouse reports after the parent loads committed, not merely those
//! present in the in-memory batch.
//!
//! - [`state`]: phase enum and transition rules
//! - [`cross_filter`]: post-commit id snapshot and the referential filter
//! - [`observer`]: events, metrics and observer hooks
//! - [`report`]: serializable run summary
//! - [`orchestrator`]: [`Pipeline`] and [`run_pipeline`]

pub mod cross_filter;
pub mod observer;
pub mod orchestrator;
pub mod report;
pub mod state;

pub use cross_filter::{cross_filter, ConfirmedIds, CrossFilter};
pub use observer::{
    PipelineEvent, PipelineMetrics, PipelineMetricsSnapshot, PipelineObserver, RecordingPipelineObserver,
    TracingPipelineObserver,
};
pub use orchestrator::{run_pipeline, run_pipeline_with_observer, Pipeline};
pub use report::{EntityReport, RunReport, SnapshotReport};
pub use state::{PipelineState, StateMachine};
