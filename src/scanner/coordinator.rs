//! Per-host port scanning.
//!
//! The coordinator resolves a target once, fans its ports out over a
//! bounded pool of probe tasks, and joins the verdicts back in port-list
//! order, whatever order the probes happened to finish in.

use super::classify::{classify, PortVerdict};
use super::mode::ScanMode;
use super::resolver::resolve_target;
use super::traits::{NameResolver, Prober};
use crate::error::{ProbeError, ScanResult};
use crate::report::HostReport;
use crate::types::{Port, Target};
use std::collections::HashMap;
use std::net::IpAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Semaphore;
use tokio::task::{Id, JoinSet};
use tracing::{debug, info, warn};

/// Default number of probes in flight for one host.
pub const DEFAULT_WORKERS: usize = 15;

/// Default wait for a reply to a stateful probe.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Wait used by best-effort deployments scanning many default ports.
pub const FAST_TIMEOUT: Duration = Duration::from_millis(500);

/// Settings fixed for the lifetime of a coordinator.
#[derive(Debug, Clone)]
pub struct CoordinatorConfig {
    pub workers: usize,
    pub timeout: Duration,
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        Self {
            workers: DEFAULT_WORKERS,
            timeout: DEFAULT_TIMEOUT,
        }
    }
}

impl CoordinatorConfig {
    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers.max(1);
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

/// Scans the ports of one host at a time.
///
/// The worker semaphore lives as long as the coordinator and is shared by
/// every host it scans.
pub struct PortScanCoordinator {
    prober: Arc<dyn Prober>,
    resolver: Arc<dyn NameResolver>,
    workers: Arc<Semaphore>,
    timeout: Duration,
}

impl PortScanCoordinator {
    pub fn new(
        prober: Arc<dyn Prober>,
        resolver: Arc<dyn NameResolver>,
        config: CoordinatorConfig,
    ) -> Self {
        Self {
            prober,
            resolver,
            workers: Arc::new(Semaphore::new(config.workers.max(1))),
            timeout: config.timeout,
        }
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Probe every port of `target` and build its report.
    ///
    /// Fails if the target cannot be resolved or if the local probe
    /// transport breaks; in the latter case all remaining probes for this
    /// host are aborted.
    pub async fn scan_host(
        &self,
        target: &Target,
        ports: &[Port],
        mode: ScanMode,
    ) -> ScanResult<HostReport> {
        let started = Instant::now();
        let address = resolve_target(target, self.resolver.as_ref()).await?;
        info!(host = %target, %address, %mode, ports = ports.len(), "scanning host");

        let verdicts = self.probe_all(address, ports, mode).await?;

        let report = HostReport::from_verdicts(target.to_string(), address, mode, ports, &verdicts);
        info!(
            host = %target,
            reported = report.entries().len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "host scan complete"
        );
        Ok(report)
    }

    /// Run one probe task per port; returns verdicts indexed like `ports`.
    async fn probe_all(
        &self,
        address: IpAddr,
        ports: &[Port],
        mode: ScanMode,
    ) -> Result<Vec<PortVerdict>, ProbeError> {
        let mut tasks = JoinSet::new();
        let mut slots: HashMap<Id, usize> = HashMap::with_capacity(ports.len());

        for (index, &port) in ports.iter().enumerate() {
            let prober = Arc::clone(&self.prober);
            let workers = Arc::clone(&self.workers);
            let timeout = self.timeout;

            let handle = tasks.spawn(async move {
                // The semaphore is never closed, so acquire only fails on shutdown.
                let _permit = workers.acquire_owned().await.ok();
                let outcome = prober.probe(address, port, mode, timeout).await?;
                let verdict = classify(mode, outcome);
                debug!(%address, port = port.as_u16(), ?outcome, %verdict, "probe classified");
                Ok::<_, ProbeError>((index, verdict))
            });
            slots.insert(handle.id(), index);
        }

        let mut verdicts = vec![PortVerdict::Suppressed; ports.len()];
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok(Ok((index, verdict))) => verdicts[index] = verdict,
                Ok(Err(e)) => {
                    warn!(%address, error = %e, "probe transport failed, aborting host");
                    tasks.abort_all();
                    return Err(e);
                }
                Err(e) => {
                    // A crashed probe only costs its own port.
                    if let Some(&index) = slots.get(&e.id()) {
                        warn!(%address, port = ports[index].as_u16(), error = %e, "probe task failed");
                        verdicts[index] = PortVerdict::Filtered;
                    }
                }
            }
        }

        Ok(verdicts)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{ResolutionError, ScanError};
    use crate::scanner::classify::{ProbeOutcome, ReplyLayer};
    use async_trait::async_trait;
    use rand::Rng;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Replies from a per-port script after a random delay.
    #[derive(Default)]
    struct ScriptedProber {
        replies: HashMap<u16, ProbeOutcome>,
        max_delay_ms: u64,
        fail_port: Option<u16>,
        panic_port: Option<u16>,
        in_flight: AtomicUsize,
        peak: AtomicUsize,
        sent: AtomicUsize,
    }

    impl ScriptedProber {
        fn reply(mut self, port: u16, flags: u8) -> Self {
            self.replies
                .insert(port, ProbeOutcome::Responded(ReplyLayer::Tcp { flags }));
            self
        }
    }

    #[async_trait]
    impl Prober for ScriptedProber {
        async fn probe(
            &self,
            _address: IpAddr,
            port: Port,
            _mode: ScanMode,
            _timeout: Duration,
        ) -> Result<ProbeOutcome, ProbeError> {
            self.sent.fetch_add(1, Ordering::SeqCst);
            let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak.fetch_max(now, Ordering::SeqCst);

            if self.fail_port == Some(port.as_u16()) {
                self.in_flight.fetch_sub(1, Ordering::SeqCst);
                return Err(ProbeError::PermissionDenied("no raw sockets".to_string()));
            }

            let delay = if self.max_delay_ms > 0 {
                rand::thread_rng().gen_range(0..=self.max_delay_ms)
            } else {
                0
            };
            tokio::time::sleep(Duration::from_millis(delay)).await;
            self.in_flight.fetch_sub(1, Ordering::SeqCst);

            if self.panic_port == Some(port.as_u16()) {
                panic!("probe crashed");
            }
            Ok(self
                .replies
                .get(&port.as_u16())
                .copied()
                .unwrap_or(ProbeOutcome::NoResponse))
        }
    }

    struct NoDns;

    #[async_trait]
    impl NameResolver for NoDns {
        async fn lookup(&self, name: &str) -> Result<IpAddr, ResolutionError> {
            Err(ResolutionError::new(name, "NXDOMAIN"))
        }
    }

    fn coordinator(prober: Arc<ScriptedProber>, workers: usize) -> PortScanCoordinator {
        PortScanCoordinator::new(
            prober,
            Arc::new(NoDns),
            CoordinatorConfig::default()
                .with_workers(workers)
                .with_timeout(Duration::from_millis(50)),
        )
    }

    fn ports(list: &[u16]) -> Vec<Port> {
        list.iter().map(|&p| Port::new(p).unwrap()).collect()
    }

    fn local() -> Target {
        Target::Address("127.0.0.1".parse().unwrap())
    }

    #[tokio::test]
    async fn test_syn_ack_renders_single_open_line() {
        let prober = Arc::new(ScriptedProber::default().reply(22, 0x12).reply(80, 0x14));
        let report = coordinator(prober, 15)
            .scan_host(&local(), &ports(&[80, 22]), ScanMode::Syn)
            .await
            .unwrap();

        // Port 80 reset, port 22 answered SYN+ACK; only 22 is listed.
        assert_eq!(report.port_lines(), vec!["22\t\tOpen\n".to_string()]);
    }

    #[tokio::test]
    async fn test_fin_silence_is_open_or_filtered() {
        let prober = Arc::new(ScriptedProber::default());
        let report = coordinator(prober, 15)
            .scan_host(&local(), &ports(&[8080]), ScanMode::Fin)
            .await
            .unwrap();

        assert_eq!(report.port_lines(), vec!["8080\t\tOpen/Filtered\n".to_string()]);
    }

    #[tokio::test]
    async fn test_order_follows_port_list_not_completion() {
        let list: Vec<u16> = (1000..1060).rev().collect();
        let expected: Vec<String> = list.iter().map(|p| format!("{p}\t\tFiltered\n")).collect();

        for _ in 0..5 {
            let prober = Arc::new(ScriptedProber {
                max_delay_ms: 15,
                ..Default::default()
            });
            let report = coordinator(prober, 15)
                .scan_host(&local(), &ports(&list), ScanMode::Ack)
                .await
                .unwrap();
            assert_eq!(report.port_lines(), expected);
        }
    }

    #[tokio::test]
    async fn test_worker_limit_is_respected() {
        let prober = Arc::new(ScriptedProber {
            max_delay_ms: 5,
            ..Default::default()
        });
        let list: Vec<u16> = (1..=60).collect();
        coordinator(Arc::clone(&prober), 4)
            .scan_host(&local(), &ports(&list), ScanMode::Syn)
            .await
            .unwrap();

        assert!(prober.peak.load(Ordering::SeqCst) <= 4);
        assert_eq!(prober.sent.load(Ordering::SeqCst), 60);
    }

    #[tokio::test]
    async fn test_resolution_failure_is_host_error() {
        let prober = Arc::new(ScriptedProber::default());
        let err = coordinator(Arc::clone(&prober), 15)
            .scan_host(&Target::Name("gone.invalid".into()), &ports(&[80]), ScanMode::Syn)
            .await
            .unwrap_err();

        assert!(matches!(err, ScanError::Resolution(ref e) if e.target == "gone.invalid"));
        assert_eq!(prober.sent.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_transport_failure_aborts_host() {
        let prober = Arc::new(ScriptedProber {
            fail_port: Some(1),
            max_delay_ms: 20,
            ..Default::default()
        });
        let all: Vec<u16> = (1..=200).collect();
        let err = coordinator(Arc::clone(&prober), 2)
            .scan_host(&local(), &ports(&all), ScanMode::Syn)
            .await
            .unwrap_err();

        assert!(matches!(err, ScanError::Transport(ProbeError::PermissionDenied(_))));

        // Queued probes were aborted rather than sent after the failure.
        let sent = prober.sent.load(Ordering::SeqCst);
        assert!(sent < all.len(), "sent {} of {} probes", sent, all.len());
        tokio::time::sleep(Duration::from_millis(100)).await;
        assert_eq!(prober.sent.load(Ordering::SeqCst), sent);
    }

    #[tokio::test]
    async fn test_panicked_probe_only_costs_its_port() {
        let prober = Arc::new(
            ScriptedProber {
                panic_port: Some(25),
                ..Default::default()
            }
            .reply(22, 0x12)
            .reply(80, 0x04),
        );
        let report = coordinator(prober, 15)
            .scan_host(&local(), &ports(&[22, 25, 80]), ScanMode::Syn)
            .await
            .unwrap();

        assert_eq!(
            report.port_lines(),
            vec!["22\t\tOpen\n".to_string(), "25\t\tFiltered\n".to_string()]
        );
    }
}
