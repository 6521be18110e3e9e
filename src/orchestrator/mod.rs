//! Host scan orchestration.
//!
//! One scan session at a time. A single driver task walks the session's
//! hosts in order, hands each to the port scan coordinator, and records
//! the outcome under the session lock. The last outcome flushes the
//! aggregate report to the sink; `cancel` discards everything instead.
//! Exactly one of the two happens per session.

mod session;
mod sink;

pub use session::{ScanSession, SessionState};
pub use sink::{ReportStore, ResultSink};

use crate::error::SessionError;
use crate::report::HostOutcome;
use crate::scanner::{PortScanCoordinator, ScanMode};
use crate::types::{Port, ScanId, Target};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// A validated scan request.
#[derive(Debug, Clone)]
pub struct ScanRequest {
    pub hosts: Vec<Target>,
    pub ports: Vec<Port>,
    pub mode: ScanMode,
}

impl ScanRequest {
    pub fn new(hosts: Vec<Target>, ports: Vec<Port>, mode: ScanMode) -> Self {
        Self { hosts, ports, mode }
    }
}

/// How a session ended, as seen by its driver.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEnd {
    Completed { aggregate: String },
    Cancelled,
}

/// Handle to a running session.
#[derive(Debug)]
pub struct ScanHandle {
    id: ScanId,
    cancel: CancellationToken,
    driver: JoinHandle<SessionEnd>,
}

impl ScanHandle {
    pub fn id(&self) -> ScanId {
        self.id
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Wait for the driver to stop.
    pub async fn wait(self) -> SessionEnd {
        match self.driver.await {
            Ok(end) => end,
            Err(e) => {
                error!(scan_id = %self.id, error = %e, "scan driver stopped unexpectedly");
                SessionEnd::Cancelled
            }
        }
    }
}

/// Result of recording one host outcome.
enum Recorded {
    Pending,
    Flushed(String),
    /// The session was cancelled or replaced; the outcome was dropped.
    Stale,
}

struct Shared {
    coordinator: PortScanCoordinator,
    sink: Arc<dyn ResultSink>,
    store: Option<Arc<dyn ReportStore>>,
    session: Mutex<Option<ScanSession>>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl Shared {
    fn record(&self, id: ScanId, outcome: HostOutcome) -> Recorded {
        let mut slot = lock(&self.session);
        let Some(session) = slot.as_mut().filter(|s| s.id() == id) else {
            debug!(scan_id = %id, host = outcome.host(), "dropping outcome of stale session");
            return Recorded::Stale;
        };

        self.sink.on_host(&outcome);
        if !session.complete_host(outcome) {
            return Recorded::Pending;
        }

        let aggregate = session.aggregate();
        self.sink.on_complete(&aggregate);
        *slot = None;
        info!(scan_id = %id, "scan complete");
        Recorded::Flushed(aggregate)
    }

    async fn persist(&self, address: String, lines: Vec<String>) {
        let Some(store) = self.store.clone() else {
            return;
        };
        let host = address.clone();
        let saved = tokio::task::spawn_blocking(move || store.insert_ports(&address, &lines)).await;
        match saved {
            Ok(Ok(())) => debug!(address = %host, "stored host report"),
            Ok(Err(e)) => warn!(address = %host, error = %e, "failed to store host report"),
            Err(e) => warn!(address = %host, error = %e, "store task failed"),
        }
    }
}

/// Serializes host scans and owns the current session.
#[derive(Clone)]
pub struct Orchestrator {
    shared: Arc<Shared>,
}

impl Orchestrator {
    pub fn new(coordinator: PortScanCoordinator, sink: Arc<dyn ResultSink>) -> Self {
        Self {
            shared: Arc::new(Shared {
                coordinator,
                sink,
                store: None,
                session: Mutex::new(None),
            }),
        }
    }

    /// Offer every completed host report to `store`.
    pub fn with_store(
        coordinator: PortScanCoordinator,
        sink: Arc<dyn ResultSink>,
        store: Arc<dyn ReportStore>,
    ) -> Self {
        Self {
            shared: Arc::new(Shared {
                coordinator,
                sink,
                store: Some(store),
                session: Mutex::new(None),
            }),
        }
    }

    /// Start a session. Must be called inside a tokio runtime.
    pub fn run_scan(&self, request: ScanRequest) -> Result<ScanHandle, SessionError> {
        if request.hosts.is_empty() {
            return Err(SessionError::NoHosts);
        }
        if request.ports.is_empty() {
            return Err(SessionError::NoPorts);
        }

        let mut slot = lock(&self.shared.session);
        if slot.is_some() {
            return Err(SessionError::AlreadyRunning);
        }

        let session = ScanSession::new(request.hosts.len());
        let id = session.id();
        let cancel = session.cancel_token();
        *slot = Some(session);

        info!(
            scan_id = %id,
            hosts = request.hosts.len(),
            ports = request.ports.len(),
            mode = %request.mode,
            "scan started"
        );

        // Spawned with the lock held so the driver cannot record before the
        // session is in place.
        let driver = tokio::spawn(drive(
            Arc::clone(&self.shared),
            id,
            cancel.clone(),
            request,
        ));
        drop(slot);

        Ok(ScanHandle { id, cancel, driver })
    }

    /// Cancel the running session, if any.
    ///
    /// Returns false when there was nothing to cancel, including when the
    /// session had already flushed.
    pub fn cancel(&self) -> bool {
        let mut slot = lock(&self.shared.session);
        let Some(session) = slot.take() else {
            return false;
        };
        session.cancel();
        self.shared.sink.on_cancelled();
        info!(
            scan_id = %session.id(),
            discarded = session.outcomes().len(),
            "scan cancelled"
        );
        true
    }

    pub fn state(&self) -> SessionState {
        lock(&self.shared.session)
            .as_ref()
            .map_or(SessionState::Idle, ScanSession::state)
    }

    /// Hosts still outstanding in the current session; zero when idle.
    pub fn remaining(&self) -> usize {
        lock(&self.shared.session)
            .as_ref()
            .map_or(0, ScanSession::remaining)
    }

    pub fn is_running(&self) -> bool {
        lock(&self.shared.session).is_some()
    }
}

async fn drive(
    shared: Arc<Shared>,
    id: ScanId,
    cancel: CancellationToken,
    request: ScanRequest,
) -> SessionEnd {
    for target in &request.hosts {
        // Dropping the scan future aborts the host's probe tasks.
        let scanned = tokio::select! {
            biased;
            _ = cancel.cancelled() => return SessionEnd::Cancelled,
            result = shared.coordinator.scan_host(target, &request.ports, request.mode) => result,
        };

        let outcome = match scanned {
            Ok(report) => HostOutcome::Scanned(report),
            Err(e) => {
                warn!(scan_id = %id, host = %target, error = %e, "host scan failed");
                HostOutcome::Failed {
                    host: target.to_string(),
                    error: e.to_string(),
                }
            }
        };
        let stored = outcome
            .report()
            .map(|report| (report.address().to_string(), report.port_lines()));

        let flushed = match shared.record(id, outcome) {
            Recorded::Stale => return SessionEnd::Cancelled,
            Recorded::Pending => None,
            Recorded::Flushed(aggregate) => Some(aggregate),
        };

        if let Some((address, lines)) = stored {
            shared.persist(address, lines).await;
        }
        if let Some(aggregate) = flushed {
            return SessionEnd::Completed { aggregate };
        }
    }

    // Only reachable if the host list was empty, which run_scan rejects.
    SessionEnd::Cancelled
}
