//! Scanner module - the TCP port-state probing engine.
//!
//! Leaves first: target resolution, the raw-socket probe executor, the
//! response classifier, and the per-host coordinator that fans ports out
//! over a bounded pool of probe tasks.

pub mod classify;
pub mod coordinator;
pub mod mode;
pub mod raw;
pub mod resolver;
pub mod traits;

pub use classify::{classify, PortVerdict, ProbeOutcome, ReplyLayer};
pub use coordinator::{
    CoordinatorConfig, PortScanCoordinator, DEFAULT_TIMEOUT, DEFAULT_WORKERS, FAST_TIMEOUT,
};
pub use mode::ScanMode;
pub use raw::RawProber;
pub use resolver::{resolve_target, DnsResolver};
pub use traits::{NameResolver, Prober};
