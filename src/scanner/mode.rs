//! Scan modes and the TCP flags each one sends.

use pnet::packet::tcp::TcpFlags;
use serde::{Deserialize, Serialize};
use std::fmt;

/// TCP control-flag template used for every probe of one scan.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum ScanMode {
    /// ACK probes; maps firewall rules rather than open ports.
    Ack,
    /// FIN probes; closed ports answer with RST, open ports stay silent.
    Fin,
    /// Probes with no flags set at all.
    Null,
    /// Half-open SYN probes.
    #[default]
    Syn,
}

impl ScanMode {
    pub const ALL: [ScanMode; 4] = [Self::Ack, Self::Fin, Self::Null, Self::Syn];

    /// Flag bits placed in the probe's TCP header.
    pub const fn tcp_flags(self) -> u8 {
        match self {
            Self::Ack => TcpFlags::ACK,
            Self::Fin => TcpFlags::FIN,
            Self::Null => 0,
            Self::Syn => TcpFlags::SYN,
        }
    }
}

impl fmt::Display for ScanMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Ack => write!(f, "ACK"),
            Self::Fin => write!(f, "FIN"),
            Self::Null => write!(f, "NULL"),
            Self::Syn => write!(f, "SYN"),
        }
    }
}

impl std::str::FromStr for ScanMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "ack" => Ok(Self::Ack),
            "fin" => Ok(Self::Fin),
            "null" => Ok(Self::Null),
            "syn" | "stealth" => Ok(Self::Syn),
            _ => Err(format!("unknown scan mode: {}", s)),
        }
    }
}
