use std::fmt;

use serde::Serialize;

use crate::error::PipelineError;

/// Phases of one pipeline run, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PipelineState {
    Init,
    Reset,
    LoadCustomers,
    LoadProducts,
    SnapshotIds,
    LoadTransactions,
    Done,
    Failed,
}

impl PipelineState {
    /// The phase that follows on success, if any.
    pub fn next(self) -> Option<Self> {
        use PipelineState::*;
        match self {
            Init => Some(Reset),
            Reset => Some(LoadCustomers),
            LoadCustomers => Some(LoadProducts),
            LoadProducts => Some(SnapshotIds),
            SnapshotIds => Some(LoadTransactions),
            LoadTransactions => Some(Done),
            Done | Failed => None,
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, PipelineState::Done | PipelineState::Failed)
    }

    /// Forward by one phase, or to `Failed` from any non-terminal phase.
    pub fn can_transition_to(self, to: PipelineState) -> bool {
        self.next() == Some(to) || (to == PipelineState::Failed && !self.is_terminal())
    }
}

impl fmt::Display for PipelineState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// Current phase plus the phases visited so far.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StateMachine {
    state: PipelineState,
    history: Vec<PipelineState>,
}

impl Default for StateMachine {
    fn default() -> Self {
        Self {
            state: PipelineState::Init,
            history: vec![PipelineState::Init],
        }
    }
}

impl StateMachine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> PipelineState {
        self.state
    }

    pub fn history(&self) -> &[PipelineState] {
        &self.history
    }

    /// Move to `to`; returns the phase left behind.
    pub fn transition(&mut self, to: PipelineState) -> Result<PipelineState, PipelineError> {
        let from = self.state;
        if !from.can_transition_to(to) {
            return Err(PipelineError::InvalidTransition { from, to });
        }
        self.state = to;
        self.history.push(to);
        Ok(from)
    }
}
