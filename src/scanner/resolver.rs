//! Target resolution.

use super::traits::NameResolver;
use crate::error::ResolutionError;
use crate::types::Target;
use async_trait::async_trait;
use std::net::IpAddr;
use tracing::debug;
use trust_dns_resolver::config::{ResolverConfig, ResolverOpts};
use trust_dns_resolver::TokioAsyncResolver;

/// Turn a target into an address, consulting `resolver` only for names.
pub async fn resolve_target(
    target: &Target,
    resolver: &dyn NameResolver,
) -> Result<IpAddr, ResolutionError> {
    match target {
        Target::Address(ip) => Ok(*ip),
        Target::Name(name) => {
            let ip = resolver.lookup(name).await?;
            debug!(host = %name, address = %ip, "resolved target");
            Ok(ip)
        }
    }
}

/// DNS-backed resolver using the system-independent default configuration.
pub struct DnsResolver {
    inner: TokioAsyncResolver,
}

impl DnsResolver {
    pub fn new() -> Self {
        Self {
            inner: TokioAsyncResolver::tokio(ResolverConfig::default(), ResolverOpts::default()),
        }
    }
}

impl Default for DnsResolver {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl NameResolver for DnsResolver {
    async fn lookup(&self, name: &str) -> Result<IpAddr, ResolutionError> {
        // "localhost" is not served by public resolvers.
        if name.eq_ignore_ascii_case("localhost") {
            return Ok(IpAddr::V4(std::net::Ipv4Addr::LOCALHOST));
        }

        let response = self
            .inner
            .lookup_ip(name)
            .await
            .map_err(|e| ResolutionError::new(name, e.to_string()))?;

        // Raw probes are IPv4 only, so prefer an IPv4 answer when there is one.
        let mut addresses: Vec<IpAddr> = response.iter().collect();
        addresses.sort_by_key(|ip| ip.is_ipv6());
        addresses
            .into_iter()
            .next()
            .ok_or_else(|| ResolutionError::new(name, "no addresses found"))
    }
}
