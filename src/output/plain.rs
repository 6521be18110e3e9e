//! Plain text output formatting.
//!
//! Prints the aggregate report with colors where the terminal supports them.

use crate::report::{IGNORED_SENTINEL, REPORT_HEADER};
use crate::scanner::ScanMode;
use console::{style, Style};
use std::io::{self, Write};

/// Write the aggregate report, styling each line by its role.
pub fn write_plain<W: Write>(out: &mut W, aggregate: &str) -> io::Result<()> {
    for line in aggregate.lines() {
        writeln!(out, "{}", style_line(line))?;
    }
    Ok(())
}

/// Print the aggregate report to stdout.
pub fn print_plain(aggregate: &str) -> io::Result<()> {
    let stdout = io::stdout();
    let mut out = stdout.lock();
    write_plain(&mut out, aggregate)?;
    out.flush()
}

fn style_line(line: &str) -> String {
    if let Some(host) = line.strip_prefix("Host: ") {
        return format!("{} {}", style("Host:").bold(), style(host).white().bold());
    }
    if line.starts_with("Error:") {
        return style(line).red().to_string();
    }
    if line == REPORT_HEADER {
        return style(line).bold().to_string();
    }
    if line == IGNORED_SENTINEL {
        return style(line).dim().to_string();
    }

    match line.split_once("\t\t") {
        Some((port, label)) => {
            let label_style = match label {
                "Open" => Style::new().green().bold(),
                "Open/Filtered" => Style::new().cyan(),
                _ => Style::new().yellow(),
            };
            format!("{}\t\t{}", port, label_style.apply_to(label))
        }
        None => line.to_string(),
    }
}

/// Print a scan header before scanning begins.
pub fn print_scan_header(hosts: usize, ports: usize, mode: ScanMode) {
    eprintln!();
    eprintln!(
        "{} {} v{}",
        style("Starting").cyan(),
        style("tcprobe").cyan().bold(),
        env!("CARGO_PKG_VERSION")
    );
    eprintln!("{} Scan mode: {}", style("•").dim(), style(mode).yellow());
    eprintln!(
        "{} Scanning {} ports on {} host(s)...",
        style("•").dim(),
        style(ports).white().bold(),
        style(hosts).white().bold()
    );
    eprintln!();
}

/// Print an error message.
pub fn print_error(msg: &str) {
    eprintln!("{} {}", style("Error:").red().bold(), msg);
}

/// Print a warning message.
pub fn print_warning(msg: &str) {
    eprintln!("{} {}", style("Warning:").yellow().bold(), msg);
}

/// Print a success message.
pub fn print_success(msg: &str) {
    println!("{} {}", style("✓").green().bold(), msg);
}

/// Print an info message.
pub fn print_info(msg: &str) {
    println!("{} {}", style("ℹ").blue().bold(), msg);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_text_survives_styling() {
        console::set_colors_enabled(false);
        let aggregate = "Host: web\nPORT\t\tSTATUS\n22\t\tOpen\n\n\
                         Host: db\nall scanned ports are in an ignored state\n\n";

        let mut buffer = Vec::new();
        write_plain(&mut buffer, aggregate).unwrap();

        assert_eq!(String::from_utf8(buffer).unwrap(), aggregate);
    }
}
