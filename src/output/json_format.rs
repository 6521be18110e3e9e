//! JSON output formatting.

use crate::report::HostOutcome;
use crate::scanner::ScanMode;
use crate::types::ScanId;
use serde::Serialize;
use std::io::{self, Write};

#[derive(Serialize)]
struct SessionDocument<'a> {
    scan_id: ScanId,
    mode: ScanMode,
    hosts: &'a [HostOutcome],
}

/// Write one session as a pretty-printed JSON document.
pub fn write_json<W: Write>(
    out: &mut W,
    scan_id: ScanId,
    mode: ScanMode,
    outcomes: &[HostOutcome],
) -> io::Result<()> {
    let document = SessionDocument {
        scan_id,
        mode,
        hosts: outcomes,
    };
    serde_json::to_writer_pretty(&mut *out, &document).map_err(io::Error::other)?;
    writeln!(out)
}

/// Print results in JSON format.
pub fn print_json(scan_id: ScanId, mode: ScanMode, outcomes: &[HostOutcome]) -> io::Result<()> {
    write_json(&mut io::stdout().lock(), scan_id, mode, outcomes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::HostReport;
    use crate::scanner::PortVerdict;
    use crate::types::Port;

    #[test]
    fn test_json_document_shape() {
        let mut report = HostReport::new("web", "10.0.0.1".parse().unwrap(), ScanMode::Syn);
        report.push(Port::new(22).unwrap(), PortVerdict::Open);
        let outcomes = vec![
            HostOutcome::Scanned(report),
            HostOutcome::Failed {
                host: "gone".into(),
                error: "NXDOMAIN".into(),
            },
        ];

        let mut buffer = Vec::new();
        write_json(&mut buffer, ScanId::new(), ScanMode::Syn, &outcomes).unwrap();
        let value: serde_json::Value = serde_json::from_slice(&buffer).unwrap();

        assert_eq!(value["mode"], "syn");
        assert_eq!(value["hosts"][0]["status"], "scanned");
        assert_eq!(value["hosts"][0]["entries"][0]["port"], 22);
        assert_eq!(value["hosts"][0]["entries"][0]["verdict"], "open");
        assert_eq!(value["hosts"][1]["status"], "failed");
        assert_eq!(value["hosts"][1]["error"], "NXDOMAIN");
    }
}
