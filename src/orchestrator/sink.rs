//! Where finished scans go.

use crate::error::StorageResult;
use crate::report::HostOutcome;

/// Receives the output of a scan session.
///
/// Called with the session lock held, so implementations must not call
/// back into the orchestrator.
pub trait ResultSink: Send + Sync {
    /// A host finished, successfully or not.
    fn on_host(&self, _outcome: &HostOutcome) {}

    /// Every host finished; `aggregate` is the full report text.
    fn on_complete(&self, aggregate: &str);

    /// The session was cancelled; nothing else will be delivered for it.
    fn on_cancelled(&self);
}

/// Persistence for completed host reports.
pub trait ReportStore: Send + Sync {
    /// Store the ordered `port\t\tlabel` lines reported for `address`.
    fn insert_ports(&self, address: &str, lines: &[String]) -> StorageResult<()>;
}
