//! Port types with validation and parsing.
//!
//! The `Port` newtype ensures values are always valid port numbers (1-65535).
//! `PortSpec` keeps the order ports were written in, because reports list
//! ports in exactly that order.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Ports probed when the user does not name any.
const DEFAULT_PORTS: &[u16] = &[
    21, 22, 23, 25, 53, 80, 81, 88, 110, 111, 135, 139, 143, 179, 389, 443, 445, 465, 514, 587,
    631, 873, 993, 995, 1025, 1080, 1433, 1521, 1723, 2049, 2375, 3000, 3128, 3306, 3389, 5000,
    5060, 5432, 5900, 5985, 6379, 6443, 8000, 8008, 8080, 8081, 8443, 8888, 9000, 9090, 9200,
    9418, 10000, 11211, 27017,
];

/// A validated network port number (1-65535).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u16", into = "u16")]
pub struct Port(u16);

impl Port {
    pub const MIN: u16 = 1;
    pub const MAX: u16 = 65535;

    /// Create a new Port from a u16, returning None for port 0.
    #[inline]
    pub const fn new(port: u16) -> Option<Self> {
        if port >= Self::MIN {
            Some(Self(port))
        } else {
            None
        }
    }

    #[inline]
    pub const fn as_u16(self) -> u16 {
        self.0
    }
}

impl fmt::Display for Port {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl TryFrom<u16> for Port {
    type Error = PortError;

    fn try_from(value: u16) -> Result<Self, Self::Error> {
        Self::new(value).ok_or(PortError::OutOfRange(value))
    }
}

impl From<Port> for u16 {
    fn from(port: Port) -> Self {
        port.0
    }
}

impl FromStr for Port {
    type Err = PortError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let value: u16 = s
            .parse()
            .map_err(|_| PortError::InvalidFormat(s.to_string()))?;
        Self::try_from(value)
    }
}

/// Error type for port parsing and validation.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PortError {
    #[error("port {0} is out of valid range (1-65535)")]
    OutOfRange(u16),
    #[error("invalid port number: {0}")]
    InvalidFormat(String),
    #[error("invalid port range: start ({0}) > end ({1})")]
    InvalidRange(u16, u16),
    #[error("empty port specification")]
    Empty,
}

/// An inclusive range of ports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PortRange {
    start: Port,
    end: Port,
}

impl PortRange {
    pub fn new(start: Port, end: Port) -> Result<Self, PortError> {
        if start > end {
            Err(PortError::InvalidRange(start.0, end.0))
        } else {
            Ok(Self { start, end })
        }
    }

    pub const fn single(port: Port) -> Self {
        Self {
            start: port,
            end: port,
        }
    }

    pub const fn len(&self) -> usize {
        (self.end.0 - self.start.0) as usize + 1
    }

    /// A valid range always holds at least one port.
    pub const fn is_empty(&self) -> bool {
        false
    }

    pub fn iter(&self) -> impl Iterator<Item = Port> {
        (self.start.0..=self.end.0).map(Port)
    }
}

impl fmt::Display for PortRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.start == self.end {
            write!(f, "{}", self.start)
        } else {
            write!(f, "{}-{}", self.start, self.end)
        }
    }
}

/// An ordered port specification such as `"22,80,8000-8010"`.
///
/// Entries expand in the order they were written. Duplicates are kept: a
/// port listed twice is probed twice and reported twice.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PortSpec {
    ranges: Vec<PortRange>,
}

impl PortSpec {
    pub const fn new() -> Self {
        Self { ranges: Vec::new() }
    }

    pub fn add_range(&mut self, range: PortRange) {
        self.ranges.push(range);
    }

    pub fn add_port(&mut self, port: Port) {
        self.ranges.push(PortRange::single(port));
    }

    /// Expand to the ordered list of ports to probe.
    pub fn to_ports(&self) -> Vec<Port> {
        self.ranges.iter().flat_map(|r| r.iter()).collect()
    }

    /// Number of probes this specification expands to.
    pub fn count(&self) -> usize {
        self.ranges.iter().map(PortRange::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.ranges.is_empty()
    }

    /// The fixed set of commonly exposed service ports.
    pub fn defaults() -> Self {
        let mut spec = Self::new();
        for port in DEFAULT_PORTS.iter().filter_map(|&p| Port::new(p)) {
            spec.add_port(port);
        }
        spec
    }
}

impl FromStr for PortSpec {
    type Err = PortError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.is_empty() {
            return Err(PortError::Empty);
        }

        let mut spec = Self::new();

        for part in s.split(',').map(str::trim) {
            if part.is_empty() {
                return Err(PortError::InvalidFormat(s.to_string()));
            }
            match part.split_once('-') {
                Some((start, end)) => {
                    let range = PortRange::new(start.parse()?, end.parse()?)?;
                    spec.add_range(range);
                }
                None => spec.add_port(part.parse()?),
            }
        }

        Ok(spec)
    }
}

impl fmt::Display for PortSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self.ranges.iter().map(|r| r.to_string()).collect();
        write!(f, "{}", parts.join(","))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ports(spec: &str) -> Vec<u16> {
        spec.parse::<PortSpec>()
            .unwrap()
            .to_ports()
            .into_iter()
            .map(u16::from)
            .collect()
    }

    #[test]
    fn test_port_validation() {
        assert!(Port::new(0).is_none());
        assert!(Port::new(1).is_some());
        assert!(Port::new(65535).is_some());
        assert_eq!(Port::try_from(0), Err(PortError::OutOfRange(0)));
    }

    #[test]
    fn test_port_range() {
        let range = PortRange::new(Port::new(1).unwrap(), Port::new(100).unwrap()).unwrap();
        assert_eq!(range.len(), 100);
        assert!(PortRange::new(Port::new(9).unwrap(), Port::new(3).unwrap()).is_err());
    }

    #[test]
    fn test_port_spec_parsing() {
        assert_eq!(ports("80"), vec![80]);
        assert_eq!(ports("80, 443"), vec![80, 443]);
        assert_eq!(ports("1-5"), vec![1, 2, 3, 4, 5]);
        assert_eq!("22,80,443,8000-8010".parse::<PortSpec>().unwrap().count(), 14);
    }

    #[test]
    fn test_port_spec_keeps_order_and_duplicates() {
        assert_eq!(ports("443,22,80,22"), vec![443, 22, 80, 22]);
        assert_eq!(ports("10-12,1"), vec![10, 11, 12, 1]);
    }

    #[test]
    fn test_port_spec_rejects_bad_input() {
        assert_eq!("".parse::<PortSpec>(), Err(PortError::Empty));
        assert!("abc".parse::<PortSpec>().is_err());
        assert!("80,,443".parse::<PortSpec>().is_err());
        assert!("0".parse::<PortSpec>().is_err());
        assert!("70000".parse::<PortSpec>().is_err());
        assert_eq!(
            "100-50".parse::<PortSpec>(),
            Err(PortError::InvalidRange(100, 50))
        );
    }

    #[test]
    fn test_default_ports() {
        let defaults = PortSpec::defaults();
        assert_eq!(defaults.count(), DEFAULT_PORTS.len());
        assert_eq!(defaults.to_ports()[0].as_u16(), 21);
    }

    #[test]
    fn test_port_serde_rejects_zero() {
        assert!(serde_json::from_str::<Port>("0").is_err());
        assert_eq!(serde_json::from_str::<Port>("8080").unwrap().as_u16(), 8080);
    }
}
