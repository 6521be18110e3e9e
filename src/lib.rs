//! # tcprobe - a TCP port-state prober
//!
//! tcprobe sends one crafted TCP segment per port (ACK, FIN, NULL or SYN),
//! classifies the reply, or its absence, and reports each host's
//! reachable ports in the order they were requested.
//!
//! ## Example Usage
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use tcprobe::orchestrator::{Orchestrator, ScanRequest};
//! use tcprobe::scanner::{CoordinatorConfig, DnsResolver, PortScanCoordinator, RawProber, ScanMode};
//! use tcprobe::types::{PortSpec, TargetSpec};
//!
//! let coordinator = PortScanCoordinator::new(
//!     Arc::new(RawProber::open()?),
//!     Arc::new(DnsResolver::new()),
//!     CoordinatorConfig::default(),
//! );
//! let orchestrator = Orchestrator::new(coordinator, sink);
//! let hosts = TargetSpec::parse("192.168.1.1,example.com")?.into_targets();
//! let ports = "22,80,443".parse::<PortSpec>()?.to_ports();
//! let handle = orchestrator.run_scan(ScanRequest::new(hosts, ports, ScanMode::Syn))?;
//! let end = handle.wait().await;
//! ```
//!
//! ## Architecture
//!
//! - [`types`] - Ports, host targets and identifiers
//! - [`scanner`] - Resolver, raw prober, classifier and per-host coordinator
//! - [`orchestrator`] - Single-session host serialization, cancellation and sinks
//! - [`report`] - Host reports and their text rendering
//! - [`storage`] - JSON persistence of host reports
//! - [`config`] - Settings and XDG paths
//! - [`cli`] / [`output`] - Command-line front end
//! - [`error`] - Error types

pub mod cli;
pub mod config;
pub mod error;
pub mod logging;
pub mod orchestrator;
pub mod output;
pub mod report;
pub mod scanner;
pub mod storage;
pub mod types;

// Re-export commonly used types
pub use error::{CliError, ScanError, SessionError};
pub use orchestrator::{Orchestrator, ResultSink, ScanRequest, SessionEnd};
pub use report::{HostOutcome, HostReport};
pub use scanner::{classify, PortScanCoordinator, PortVerdict, ProbeOutcome, ScanMode};
pub use types::{Port, PortSpec, ScanId, Target, TargetSpec};
