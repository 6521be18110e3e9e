//! Host reports and their text rendering.

use crate::scanner::{PortVerdict, ScanMode};
use crate::types::Port;
use serde::Serialize;
use std::fmt::Write as _;
use std::net::IpAddr;

/// Rendered in place of a port table when every port was suppressed.
pub const IGNORED_SENTINEL: &str = "all scanned ports are in an ignored state";

/// Column header above the port lines of a report.
pub const REPORT_HEADER: &str = "PORT\t\tSTATUS";

/// One reported port.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PortEntry {
    pub port: Port,
    pub verdict: PortVerdict,
}

impl PortEntry {
    /// The `port<TAB><TAB>label` line for this entry, newline terminated.
    pub fn line(&self) -> String {
        format!("{}\t\t{}\n", self.port, self.verdict)
    }
}

/// Result of scanning one host: only non-suppressed ports, in port-list order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HostReport {
    host: String,
    address: IpAddr,
    mode: ScanMode,
    entries: Vec<PortEntry>,
}

impl HostReport {
    pub fn new(host: impl Into<String>, address: IpAddr, mode: ScanMode) -> Self {
        Self {
            host: host.into(),
            address,
            mode,
            entries: Vec::new(),
        }
    }

    /// Build a report from verdicts that line up index for index with `ports`.
    pub fn from_verdicts(
        host: impl Into<String>,
        address: IpAddr,
        mode: ScanMode,
        ports: &[Port],
        verdicts: &[PortVerdict],
    ) -> Self {
        let mut report = Self::new(host, address, mode);
        for (&port, &verdict) in ports.iter().zip(verdicts) {
            report.push(port, verdict);
        }
        report
    }

    /// Append a verdict; suppressed verdicts are dropped.
    pub fn push(&mut self, port: Port, verdict: PortVerdict) {
        if verdict.is_reported() {
            self.entries.push(PortEntry { port, verdict });
        }
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn address(&self) -> IpAddr {
        self.address
    }

    pub fn mode(&self) -> ScanMode {
        self.mode
    }

    pub fn entries(&self) -> &[PortEntry] {
        &self.entries
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Report lines in port order, as handed to the store.
    pub fn port_lines(&self) -> Vec<String> {
        self.entries.iter().map(PortEntry::line).collect()
    }

    /// The port table, or the sentinel when nothing is reportable.
    pub fn body(&self) -> String {
        if self.entries.is_empty() {
            return format!("{IGNORED_SENTINEL}\n");
        }
        let mut body = format!("{REPORT_HEADER}\n");
        for entry in &self.entries {
            body.push_str(&entry.line());
        }
        body
    }
}

/// What happened to one host of a session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum HostOutcome {
    Scanned(HostReport),
    Failed { host: String, error: String },
}

impl HostOutcome {
    pub fn host(&self) -> &str {
        match self {
            Self::Scanned(report) => report.host(),
            Self::Failed { host, .. } => host,
        }
    }

    pub fn report(&self) -> Option<&HostReport> {
        match self {
            Self::Scanned(report) => Some(report),
            Self::Failed { .. } => None,
        }
    }

    /// Block for this host in the aggregate text, ending with a blank line.
    pub fn render(&self) -> String {
        let mut block = String::new();
        let _ = writeln!(block, "Host: {}", self.host());
        match self {
            Self::Scanned(report) => block.push_str(&report.body()),
            Self::Failed { host, error } => {
                let _ = writeln!(block, "Error: error scanning host {host}: {error}");
            }
        }
        block.push('\n');
        block
    }
}

/// Join host blocks in submission order.
pub fn render_aggregate(outcomes: &[HostOutcome]) -> String {
    outcomes.iter().map(HostOutcome::render).collect()
}
