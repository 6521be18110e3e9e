//! Output formatting module.
//!
//! Provides formatters for plain text, JSON, and CSV output of scan sessions.

mod csv_format;
mod json_format;
mod plain;

pub use csv_format::{print_csv, write_csv};
pub use json_format::{print_json, write_json};
pub use plain::{
    print_error, print_info, print_plain, print_scan_header, print_success, print_warning,
    write_plain,
};

use crate::cli::OutputFormat;
use crate::report::HostOutcome;
use crate::scanner::ScanMode;
use crate::types::ScanId;
use std::io;

/// A finished session, ready to print.
pub struct SessionOutput<'a> {
    pub scan_id: ScanId,
    pub mode: ScanMode,
    pub aggregate: &'a str,
    pub outcomes: &'a [HostOutcome],
}

/// Format and print a session according to the specified format.
pub fn print_session(session: &SessionOutput<'_>, format: OutputFormat) -> io::Result<()> {
    match format {
        OutputFormat::Plain => print_plain(session.aggregate),
        OutputFormat::Json => print_json(session.scan_id, session.mode, session.outcomes),
        OutputFormat::Csv => print_csv(session.outcomes),
    }
}
