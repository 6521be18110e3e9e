//! State of one user-initiated scan.

use crate::report::{render_aggregate, HostOutcome};
use crate::types::ScanId;
use serde::Serialize;
use tokio_util::sync::CancellationToken;

/// Observable orchestrator state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum SessionState {
    Idle,
    Running { id: ScanId, remaining: usize },
}

/// Bookkeeping for the scan that currently owns the orchestrator.
#[derive(Debug)]
pub struct ScanSession {
    id: ScanId,
    remaining: usize,
    outcomes: Vec<HostOutcome>,
    cancel: CancellationToken,
}

impl ScanSession {
    pub(crate) fn new(hosts: usize) -> Self {
        Self {
            id: ScanId::new(),
            remaining: hosts,
            outcomes: Vec::with_capacity(hosts),
            cancel: CancellationToken::new(),
        }
    }

    pub fn id(&self) -> ScanId {
        self.id
    }

    pub fn remaining(&self) -> usize {
        self.remaining
    }

    pub fn outcomes(&self) -> &[HostOutcome] {
        &self.outcomes
    }

    pub(crate) fn cancel_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    pub(crate) fn cancel(&self) {
        self.cancel.cancel();
    }

    /// Record a finished host. Returns true once the last host is in.
    pub(crate) fn complete_host(&mut self, outcome: HostOutcome) -> bool {
        self.remaining = self.remaining.saturating_sub(1);
        self.outcomes.push(outcome);
        self.remaining == 0
    }

    pub(crate) fn aggregate(&self) -> String {
        render_aggregate(&self.outcomes)
    }

    pub(crate) fn state(&self) -> SessionState {
        SessionState::Running {
            id: self.id,
            remaining: self.remaining,
        }
    }
}
