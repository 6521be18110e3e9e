//! History subcommand implementation.
//!
//! Handles `tcprobe history [host]` for viewing and pruning stored reports.

use crate::error::{CliResult, StorageError};
use crate::output;
use crate::report::REPORT_HEADER;
use crate::storage::{HostRecord, JsonStore};
use clap::Parser;
use console::style;

/// View stored host reports.
#[derive(Parser, Debug)]
pub struct HistoryCommand {
    /// Only show reports for this address
    #[arg(value_name = "HOST")]
    pub host: Option<String>,

    /// Number of recent reports to show
    #[arg(short = 'n', long, default_value = "10")]
    pub count: usize,

    /// Delete reports older than N days
    #[arg(long, value_name = "DAYS")]
    pub prune: Option<u32>,
}

impl HistoryCommand {
    /// Execute the history command.
    pub fn execute(&self) -> CliResult<()> {
        let store = JsonStore::new()?;

        if let Some(days) = self.prune {
            let max_age =
                chrono::Duration::try_days(i64::from(days)).unwrap_or(chrono::Duration::MAX);
            let deleted = store.cleanup(max_age)?;
            output::print_success(&format!(
                "Deleted {} report(s) older than {} day(s)",
                deleted, days
            ));
            return Ok(());
        }

        match &self.host {
            Some(address) => self.show_host(&store, address),
            None => self.show_recent(&store),
        }
    }

    fn show_host(&self, store: &JsonStore, address: &str) -> CliResult<()> {
        let latest = match store.ports_by_host(address) {
            Ok(lines) => lines,
            Err(StorageError::HostNotFound(_)) => {
                output::print_info(&format!("No stored reports for {}", address));
                return Ok(());
            }
            Err(e) => return Err(e.into()),
        };

        println!("{} {}", style("Latest report for").bold(), style(address).white().bold());
        print_lines(&latest);

        let older = store.history(Some(address), self.count)?;
        if older.len() > 1 {
            println!();
            println!("{}", style("Earlier reports:").bold());
            for record in older.iter().skip(1) {
                print_summary(record);
            }
        }
        Ok(())
    }

    fn show_recent(&self, store: &JsonStore) -> CliResult<()> {
        let records = store.history(None, self.count)?;
        if records.is_empty() {
            output::print_info("No stored reports.");
            return Ok(());
        }

        for record in &records {
            print_summary(record);
        }
        Ok(())
    }
}

fn print_lines(lines: &[String]) {
    if lines.is_empty() {
        println!("  {}", style("no ports were reported").dim());
        return;
    }
    println!("{}", REPORT_HEADER);
    for line in lines {
        println!("{}", line);
    }
}

fn print_summary(record: &HostRecord) {
    println!(
        "  {}  {}  {}",
        style(record.id.short()).dim(),
        record.recorded_at.format("%Y-%m-%d %H:%M:%S"),
        record.summary()
    );
}
