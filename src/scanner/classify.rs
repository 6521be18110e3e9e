//! Response classification.
//!
//! Every probe ends in one of five signals: silence, a reset, a SYN+ACK, an
//! ICMP "administratively unreachable" style error, or something else. A
//! single table maps (mode, signal) to the verdict shown in reports.

use super::mode::ScanMode;
use serde::{Deserialize, Serialize};
use std::fmt;

/// ICMP destination-unreachable type.
const ICMP_DEST_UNREACHABLE: u8 = 3;

/// Unreachable codes that indicate a filtering device rather than a dead port:
/// host, protocol, port, net prohibited, host prohibited, communication prohibited.
const FILTERING_ICMP_CODES: [u8; 6] = [1, 2, 3, 9, 10, 13];

const FLAGS_RST: u8 = 0x04;
const FLAGS_RST_ACK: u8 = 0x14;
const FLAGS_SYN_ACK: u8 = 0x12;

/// The protocol layer of a reply to a probe.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReplyLayer {
    /// A TCP segment from the probed port, carrying its flag byte.
    Tcp { flags: u8 },
    /// An ICMP error quoting the probe.
    Icmp { icmp_type: u8, code: u8 },
}

/// Raw result of one probe.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProbeOutcome {
    NoResponse,
    Responded(ReplyLayer),
}

/// Classified reachability state of a port.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PortVerdict {
    Open,
    Filtered,
    OpenOrFiltered,
    /// Closed or unfiltered; never shown in a report.
    Suppressed,
}

impl PortVerdict {
    pub fn is_reported(self) -> bool {
        self != Self::Suppressed
    }

    /// Label used in report lines.
    pub fn label(self) -> &'static str {
        match self {
            Self::Open => "Open",
            Self::Filtered => "Filtered",
            Self::OpenOrFiltered => "Open/Filtered",
            Self::Suppressed => "Suppressed",
        }
    }
}

impl fmt::Display for PortVerdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// What a probe outcome tells us, independent of the mode that sent it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Signal {
    NoReply,
    Reset,
    SynAck,
    IcmpFiltered,
    Other,
}

impl From<ProbeOutcome> for Signal {
    fn from(outcome: ProbeOutcome) -> Self {
        match outcome {
            ProbeOutcome::NoResponse => Self::NoReply,
            ProbeOutcome::Responded(ReplyLayer::Tcp { flags }) => match flags {
                FLAGS_RST | FLAGS_RST_ACK => Self::Reset,
                FLAGS_SYN_ACK => Self::SynAck,
                _ => Self::Other,
            },
            ProbeOutcome::Responded(ReplyLayer::Icmp { icmp_type, code })
                if icmp_type == ICMP_DEST_UNREACHABLE && FILTERING_ICMP_CODES.contains(&code) =>
            {
                Self::IcmpFiltered
            }
            ProbeOutcome::Responded(ReplyLayer::Icmp { .. }) => Self::Other,
        }
    }
}

/// One row of the decision table.
struct Decision {
    no_reply: PortVerdict,
    reset: PortVerdict,
    syn_ack: PortVerdict,
    icmp_filtered: PortVerdict,
    other: PortVerdict,
}

impl Decision {
    const fn verdict(&self, signal: Signal) -> PortVerdict {
        match signal {
            Signal::NoReply => self.no_reply,
            Signal::Reset => self.reset,
            Signal::SynAck => self.syn_ack,
            Signal::IcmpFiltered => self.icmp_filtered,
            Signal::Other => self.other,
        }
    }
}

use PortVerdict::{Filtered, Open, OpenOrFiltered, Suppressed};

const ACK_ROW: Decision = Decision {
    no_reply: Filtered,
    reset: Suppressed,
    syn_ack: Suppressed,
    icmp_filtered: Filtered,
    other: Suppressed,
};

const FIN_ROW: Decision = Decision {
    no_reply: OpenOrFiltered,
    reset: Suppressed,
    syn_ack: Suppressed,
    icmp_filtered: Filtered,
    other: Suppressed,
};

const NULL_ROW: Decision = Decision {
    no_reply: OpenOrFiltered,
    reset: Suppressed,
    syn_ack: Suppressed,
    icmp_filtered: Filtered,
    other: Suppressed,
};

const SYN_ROW: Decision = Decision {
    no_reply: Filtered,
    reset: Suppressed,
    syn_ack: Open,
    icmp_filtered: Filtered,
    other: Suppressed,
};

const fn decision(mode: ScanMode) -> &'static Decision {
    match mode {
        ScanMode::Ack => &ACK_ROW,
        ScanMode::Fin => &FIN_ROW,
        ScanMode::Null => &NULL_ROW,
        ScanMode::Syn => &SYN_ROW,
    }
}

/// Map a probe outcome to the verdict for `mode`.
pub fn classify(mode: ScanMode, outcome: ProbeOutcome) -> PortVerdict {
    decision(mode).verdict(Signal::from(outcome))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tcp(flags: u8) -> ProbeOutcome {
        ProbeOutcome::Responded(ReplyLayer::Tcp { flags })
    }

    fn icmp(icmp_type: u8, code: u8) -> ProbeOutcome {
        ProbeOutcome::Responded(ReplyLayer::Icmp { icmp_type, code })
    }

    #[test]
    fn test_no_response() {
        assert_eq!(classify(ScanMode::Ack, ProbeOutcome::NoResponse), Filtered);
        assert_eq!(classify(ScanMode::Fin, ProbeOutcome::NoResponse), OpenOrFiltered);
        assert_eq!(classify(ScanMode::Null, ProbeOutcome::NoResponse), OpenOrFiltered);
        assert_eq!(classify(ScanMode::Syn, ProbeOutcome::NoResponse), Filtered);
    }

    #[test]
    fn test_reset_is_always_suppressed() {
        for mode in ScanMode::ALL {
            assert_eq!(classify(mode, tcp(0x04)), Suppressed, "{mode} RST");
            assert_eq!(classify(mode, tcp(0x14)), Suppressed, "{mode} RST+ACK");
        }
    }

    #[test]
    fn test_syn_ack_only_opens_for_syn() {
        assert_eq!(classify(ScanMode::Syn, tcp(0x12)), Open);
        assert_eq!(classify(ScanMode::Ack, tcp(0x12)), Suppressed);
        assert_eq!(classify(ScanMode::Fin, tcp(0x12)), Suppressed);
        assert_eq!(classify(ScanMode::Null, tcp(0x12)), Suppressed);
    }

    #[test]
    fn test_icmp_unreachable_codes() {
        for mode in ScanMode::ALL {
            for code in FILTERING_ICMP_CODES {
                assert_eq!(classify(mode, icmp(3, code)), Filtered, "{mode} code {code}");
            }
            assert_eq!(classify(mode, icmp(3, 0)), Suppressed);
            assert_eq!(classify(mode, icmp(3, 4)), Suppressed);
            assert_eq!(classify(mode, icmp(11, 1)), Suppressed);
        }
    }

    #[test]
    fn test_unexpected_flags_are_suppressed() {
        for mode in ScanMode::ALL {
            // SYN+ACK+PSH is not an exact SYN+ACK.
            assert_eq!(classify(mode, tcp(0x1a)), Suppressed);
            assert_eq!(classify(mode, tcp(0x10)), Suppressed);
        }
    }

    #[test]
    fn test_labels() {
        assert_eq!(Open.to_string(), "Open");
        assert_eq!(Filtered.to_string(), "Filtered");
        assert_eq!(OpenOrFiltered.to_string(), "Open/Filtered");
        assert!(!Suppressed.is_reported());
    }
}
