//! Scan subcommand implementation.
//!
//! Handles the `tcprobe scan <hosts>` command.

use crate::cli::OutputFormat;
use crate::config::AppSettings;
use crate::error::{CliError, CliResult};
use crate::orchestrator::{Orchestrator, ResultSink, ScanRequest, SessionEnd};
use crate::output::{self, SessionOutput};
use crate::report::HostOutcome;
use crate::scanner::{DnsResolver, PortScanCoordinator, RawProber, ScanMode};
use crate::storage::JsonStore;
use crate::types::{PortSpec, TargetSpec};
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tracing::debug;

/// Probe ports on one or more hosts.
#[derive(Parser, Debug)]
pub struct ScanCommand {
    /// Hosts to scan, comma separated
    ///
    /// Examples:
    ///   192.168.1.1                 Single IP address
    ///   example.com                 Hostname
    ///   10.0.0.1-10.0.0.20          Inclusive IPv4 range
    ///   192.168.1.0/24              CIDR block (host addresses only)
    #[arg(value_name = "HOSTS")]
    pub hosts: String,

    /// Scan mode (defaults to the configured mode)
    #[arg(short, long, value_enum)]
    pub mode: Option<ScanMode>,

    /// Ports to scan, e.g. "22,80,8000-8100" (defaults to common service ports)
    #[arg(short, long)]
    pub ports: Option<String>,

    /// Probes in flight per host
    #[arg(short, long)]
    pub workers: Option<usize>,

    /// Output format for results
    #[arg(short, long, value_enum)]
    pub output: Option<OutputFormat>,

    /// Don't store host reports
    #[arg(long)]
    pub no_save: bool,
}

impl ScanCommand {
    /// Execute the scan command.
    pub async fn execute(&self, settings: &AppSettings, quiet: bool) -> CliResult<()> {
        let mode = self.mode.unwrap_or(settings.default_mode);
        let format = self.output.unwrap_or(settings.default_output_format);

        let port_spec = match &self.ports {
            Some(ports) => ports.parse::<PortSpec>()?,
            None => PortSpec::defaults(),
        };
        let ports = port_spec.to_ports();
        let hosts = TargetSpec::parse(&self.hosts)?.into_targets();

        if matches!(self.workers, Some(0)) {
            return Err(CliError::Other("workers must be at least 1".to_string()));
        }

        if !is_root() {
            output::print_warning("raw TCP probes require root/sudo privileges.");
        }

        let prober = RawProber::open()?;
        let coordinator = PortScanCoordinator::new(
            Arc::new(prober),
            Arc::new(DnsResolver::new()),
            settings.coordinator_config(self.workers),
        );

        let show_progress = !quiet && format == OutputFormat::Plain;
        if show_progress {
            output::print_scan_header(hosts.len(), ports.len(), mode);
        }
        let sink = Arc::new(TerminalSink::new(hosts.len(), show_progress));

        let orchestrator = if settings.persist_results && !self.no_save {
            Orchestrator::with_store(coordinator, sink.clone(), Arc::new(JsonStore::new()?))
        } else {
            Orchestrator::new(coordinator, sink.clone())
        };

        let handle = orchestrator.run_scan(ScanRequest::new(hosts, ports, mode))?;
        let scan_id = handle.id();

        let wait = handle.wait();
        tokio::pin!(wait);
        let end = tokio::select! {
            end = &mut wait => end,
            _ = tokio::signal::ctrl_c() => {
                debug!("interrupt received");
                orchestrator.cancel();
                wait.await
            }
        };

        match end {
            SessionEnd::Completed { aggregate } => {
                let outcomes = sink.outcomes();
                let session = SessionOutput {
                    scan_id,
                    mode,
                    aggregate: &aggregate,
                    outcomes: &outcomes,
                };
                output::print_session(&session, format)?;
                Ok(())
            }
            SessionEnd::Cancelled => {
                if !quiet {
                    output::print_warning("scan cancelled; partial results discarded.");
                }
                Ok(())
            }
        }
    }
}

/// Shows progress on the terminal and keeps host outcomes for structured output.
pub struct TerminalSink {
    progress: Option<ProgressBar>,
    outcomes: Mutex<Vec<HostOutcome>>,
}

impl TerminalSink {
    pub fn new(hosts: usize, show_progress: bool) -> Self {
        let progress = show_progress.then(|| {
            let pb = ProgressBar::new(hosts as u64);
            let template = "{spinner:.green} [{elapsed_precise}] {pos}/{len} hosts {msg}";
            if let Ok(style) = ProgressStyle::default_spinner().template(template) {
                pb.set_style(style);
            }
            pb.enable_steady_tick(Duration::from_millis(100));
            pb
        });

        Self {
            progress,
            outcomes: Mutex::new(Vec::new()),
        }
    }

    /// Outcomes delivered so far, in delivery order.
    pub fn outcomes(&self) -> Vec<HostOutcome> {
        self.outcomes
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl ResultSink for TerminalSink {
    fn on_host(&self, outcome: &HostOutcome) {
        if let Some(pb) = &self.progress {
            pb.inc(1);
            pb.set_message(format!("last: {}", outcome.host()));
        }
        self.outcomes
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(outcome.clone());
    }

    fn on_complete(&self, _aggregate: &str) {
        if let Some(pb) = &self.progress {
            pb.finish_and_clear();
        }
    }

    fn on_cancelled(&self) {
        if let Some(pb) = &self.progress {
            pb.abandon_with_message("cancelled");
        }
        self.outcomes
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }
}

/// Check if running with root privileges.
fn is_root() -> bool {
    #[cfg(unix)]
    {
        unsafe { libc::geteuid() == 0 }
    }
    #[cfg(not(unix))]
    {
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::HostReport;

    #[test]
    fn test_sink_keeps_outcomes_until_cancelled() {
        let sink = TerminalSink::new(2, false);
        sink.on_host(&HostOutcome::Scanned(HostReport::new(
            "web",
            "10.0.0.1".parse().unwrap(),
            ScanMode::Syn,
        )));
        assert_eq!(sink.outcomes().len(), 1);

        sink.on_cancelled();
        assert!(sink.outcomes().is_empty());
    }

    #[test]
    fn test_sink_with_progress_completes() {
        let sink = TerminalSink::new(1, true);
        sink.on_host(&HostOutcome::Failed {
            host: "gone".into(),
            error: "NXDOMAIN".into(),
        });
        sink.on_complete("Host: gone\n");
        assert_eq!(sink.outcomes()[0].host(), "gone");
    }
}
