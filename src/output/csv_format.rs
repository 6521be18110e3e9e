//! CSV output formatting.

use crate::report::HostOutcome;
use std::io::{self, Write};

/// Write one row per reported port; failed hosts get a single error row.
pub fn write_csv<W: Write>(out: W, outcomes: &[HostOutcome]) -> io::Result<()> {
    let mut wtr = csv::Writer::from_writer(out);

    wtr.write_record(["host", "address", "mode", "port", "status", "error"])?;

    for outcome in outcomes {
        match outcome {
            HostOutcome::Scanned(report) => {
                let address = report.address().to_string();
                let mode = report.mode().to_string();
                for entry in report.entries() {
                    let port = entry.port.to_string();
                    wtr.write_record([
                        report.host(),
                        address.as_str(),
                        mode.as_str(),
                        port.as_str(),
                        entry.verdict.label(),
                        "",
                    ])?;
                }
            }
            HostOutcome::Failed { host, error } => {
                wtr.write_record([host.as_str(), "", "", "", "", error.as_str()])?;
            }
        }
    }

    wtr.flush()?;
    Ok(())
}

/// Print results in CSV format.
pub fn print_csv(outcomes: &[HostOutcome]) -> io::Result<()> {
    write_csv(io::stdout().lock(), outcomes)
}
