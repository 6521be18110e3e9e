//! Scan target types and host list parsing.
//!
//! A host list is a comma separated string whose entries may be:
//! - Single IP addresses (IPv4 and IPv6)
//! - Inclusive IPv4 ranges (192.168.0.2-192.168.0.9)
//! - CIDR notation (192.168.1.0/24)
//! - Hostnames (example.com, localhost)
//!
//! Names are kept unresolved here; resolution happens once per host when
//! that host's scan starts.

use ipnetwork::IpNetwork;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::net::{IpAddr, Ipv4Addr};
use std::str::FromStr;

/// A single host to scan: a literal address or a name to resolve.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Target {
    Address(IpAddr),
    Name(String),
}

impl Target {
    /// Classify a single host identifier.
    pub fn parse(s: &str) -> Result<Self, TargetError> {
        let s = s.trim();
        if let Ok(ip) = s.parse::<IpAddr>() {
            return Ok(Self::Address(ip));
        }
        if is_valid_hostname(s) && !looks_numeric(s) {
            return Ok(Self::Name(s.to_string()));
        }
        Err(TargetError::InvalidFormat(s.to_string()))
    }

    /// The literal address, if this target needs no resolution.
    pub fn as_address(&self) -> Option<IpAddr> {
        match self {
            Self::Address(ip) => Some(*ip),
            Self::Name(_) => None,
        }
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Address(ip) => write!(f, "{}", ip),
            Self::Name(name) => write!(f, "{}", name),
        }
    }
}

impl FromStr for Target {
    type Err = TargetError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl From<IpAddr> for Target {
    fn from(ip: IpAddr) -> Self {
        Self::Address(ip)
    }
}

/// Error type for target parsing.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TargetError {
    #[error("host is not specified")]
    Empty,
    #[error("invalid target format: {0}")]
    InvalidFormat(String),
    #[error("invalid IP range: {0}")]
    InvalidRange(String),
    #[error("invalid CIDR notation: {0}")]
    InvalidCidr(String),
    #[error("target list too large: {0} hosts (max: {1})")]
    TooManyHosts(u128, u128),
}

/// A parsed host list, expanded to individual targets in input order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TargetSpec {
    targets: Vec<Target>,
}

impl TargetSpec {
    /// Maximum number of hosts a single host list may expand to.
    pub const MAX_HOSTS: u128 = 65536;

    pub fn parse(s: &str) -> Result<Self, TargetError> {
        let compact: String = s.chars().filter(|c| !c.is_whitespace()).collect();
        if compact.is_empty() {
            return Err(TargetError::Empty);
        }

        let mut targets = Vec::new();
        for part in compact.split(',') {
            if part.is_empty() {
                return Err(TargetError::InvalidFormat(s.trim().to_string()));
            }

            if part.contains('/') {
                expand_cidr(part, &mut targets)?;
            } else if let Some((start, end)) = split_ip_range(part) {
                expand_range(part, start, end, &mut targets)?;
            } else if is_malformed_range(part) {
                return Err(TargetError::InvalidRange(part.to_string()));
            } else {
                targets.push(Target::parse(part)?);
            }

            let count = targets.len() as u128;
            if count > Self::MAX_HOSTS {
                return Err(TargetError::TooManyHosts(count, Self::MAX_HOSTS));
            }
        }

        Ok(Self { targets })
    }

    pub fn targets(&self) -> &[Target] {
        &self.targets
    }

    pub fn into_targets(self) -> Vec<Target> {
        self.targets
    }

    pub fn len(&self) -> usize {
        self.targets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.targets.is_empty()
    }
}

impl FromStr for TargetSpec {
    type Err = TargetError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

/// Split `a.b.c.d-e.f.g.h` into its two IPv4 endpoints.
///
/// Hostnames may contain hyphens too, so anything that is not two IPv4
/// literals is left for hostname parsing.
fn split_ip_range(part: &str) -> Option<(Ipv4Addr, Ipv4Addr)> {
    let (start, end) = part.split_once('-')?;
    Some((start.parse().ok()?, end.parse().ok()?))
}

/// A hyphenated part with a numeric side that did not split into two addresses.
fn is_malformed_range(part: &str) -> bool {
    part.split_once('-')
        .is_some_and(|(start, end)| looks_numeric(start) || looks_numeric(end))
}

/// Digits and dots only, so an address attempt rather than a name.
fn looks_numeric(s: &str) -> bool {
    !s.is_empty() && s.chars().all(|c| c.is_ascii_digit() || c == '.')
}

fn expand_range(
    part: &str,
    start: Ipv4Addr,
    end: Ipv4Addr,
    targets: &mut Vec<Target>,
) -> Result<(), TargetError> {
    let (start, end) = (u32::from(start), u32::from(end));
    if start > end {
        return Err(TargetError::InvalidRange(part.to_string()));
    }

    let count = u128::from(end - start) + 1;
    if count > TargetSpec::MAX_HOSTS {
        return Err(TargetError::TooManyHosts(count, TargetSpec::MAX_HOSTS));
    }

    targets.extend((start..=end).map(|ip| Target::Address(IpAddr::V4(Ipv4Addr::from(ip)))));
    Ok(())
}

fn expand_cidr(part: &str, targets: &mut Vec<Target>) -> Result<(), TargetError> {
    let network: IpNetwork = part
        .parse()
        .map_err(|_| TargetError::InvalidCidr(part.to_string()))?;

    let size = match network {
        IpNetwork::V4(net) => u128::from(net.size()),
        IpNetwork::V6(net) => {
            let prefix = u32::from(net.prefix());
            if prefix >= 128 {
                1
            } else if prefix == 0 {
                u128::MAX
            } else {
                1u128 << (128 - prefix)
            }
        }
    };
    if size > TargetSpec::MAX_HOSTS {
        return Err(TargetError::TooManyHosts(size, TargetSpec::MAX_HOSTS));
    }

    // Network and broadcast addresses are skipped for IPv4 blocks wider than /31.
    let hosts = network.iter().filter(|ip| match (network, ip) {
        (IpNetwork::V4(net), IpAddr::V4(addr)) if net.prefix() < 31 => {
            *addr != net.network() && *addr != net.broadcast()
        }
        _ => true,
    });
    targets.extend(hosts.map(Target::Address));
    Ok(())
}

/// Check if a string is a valid hostname.
fn is_valid_hostname(s: &str) -> bool {
    if s.is_empty() || s.len() > 253 {
        return false;
    }

    s.split('.').all(|label| {
        !label.is_empty()
            && label.len() <= 63
            && label.chars().next().is_some_and(char::is_alphanumeric)
            && label.chars().last().is_some_and(char::is_alphanumeric)
            && label.chars().all(|c| c.is_alphanumeric() || c == '-')
    })
}
