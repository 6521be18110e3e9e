//! Seams between the coordinator and the outside world.
//!
//! The coordinator only talks to the network through these traits, so the
//! raw-socket prober and the DNS resolver can be swapped for scripted
//! doubles in tests.

use super::classify::ProbeOutcome;
use super::mode::ScanMode;
use crate::error::{ProbeError, ResolutionError};
use crate::types::Port;
use async_trait::async_trait;
use std::net::IpAddr;
use std::time::Duration;

/// Sends one probe and waits for at most one reply.
///
/// Implementations transmit exactly one packet per call and never retry;
/// `NoResponse` after `timeout` is a valid outcome, not an error.
#[async_trait]
pub trait Prober: Send + Sync {
    async fn probe(
        &self,
        address: IpAddr,
        port: Port,
        mode: ScanMode,
        timeout: Duration,
    ) -> Result<ProbeOutcome, ProbeError>;
}

/// Resolves host names that are not literal addresses.
#[async_trait]
pub trait NameResolver: Send + Sync {
    async fn lookup(&self, name: &str) -> Result<IpAddr, ResolutionError>;
}
