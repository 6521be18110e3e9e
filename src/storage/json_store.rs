//! JSON-based host report storage.
//!
//! Stores each completed host report as a separate JSON file.

use crate::config::Paths;
use crate::error::{StorageError, StorageResult};
use crate::orchestrator::ReportStore;
use crate::types::{Port, ScanId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Separator between a port and its status in report lines.
const LINE_SEPARATOR: &str = "\t\t";

/// One stored port line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PortRecord {
    pub port: Port,
    pub status: String,
}

impl PortRecord {
    /// Parse a `port\t\tstatus` report line; a trailing newline is allowed.
    pub fn parse_line(line: &str) -> StorageResult<Self> {
        let trimmed = line.trim_end_matches(['\r', '\n']);
        let (port, status) = trimmed
            .split_once(LINE_SEPARATOR)
            .ok_or_else(|| StorageError::MalformedLine(line.to_string()))?;

        let port = port
            .trim()
            .parse::<Port>()
            .map_err(|_| StorageError::MalformedLine(line.to_string()))?;
        let status = status.trim();
        if status.is_empty() {
            return Err(StorageError::MalformedLine(line.to_string()));
        }

        Ok(Self {
            port,
            status: status.to_string(),
        })
    }

    pub fn line(&self) -> String {
        format!("{}{}{}", self.port, LINE_SEPARATOR, self.status)
    }
}

/// A persisted host report.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HostRecord {
    pub id: ScanId,
    pub address: String,
    pub recorded_at: DateTime<Utc>,
    /// Reported ports in scan order.
    pub ports: Vec<PortRecord>,
}

impl HostRecord {
    pub fn new(address: impl Into<String>, ports: Vec<PortRecord>) -> Self {
        Self {
            id: ScanId::new(),
            address: address.into(),
            recorded_at: Utc::now(),
            ports,
        }
    }

    pub fn lines(&self) -> Vec<String> {
        self.ports.iter().map(PortRecord::line).collect()
    }

    /// Get a short summary of the record.
    pub fn summary(&self) -> String {
        let open = self.ports.iter().filter(|p| p.status == "Open").count();
        format!(
            "{} - {} reported, {} open",
            self.address,
            self.ports.len(),
            open
        )
    }
}

/// JSON file-based host report storage.
pub struct JsonStore {
    reports_dir: PathBuf,
}

impl JsonStore {
    /// Open the store in the default data directory.
    pub fn new() -> StorageResult<Self> {
        let paths = Paths::get().map_err(|e| StorageError::DirectoryError(e.to_string()))?;
        Self::open(paths.reports_dir())
    }

    /// Open the store in `dir`, creating it if needed.
    pub fn open(dir: impl Into<PathBuf>) -> StorageResult<Self> {
        let reports_dir = dir.into();
        fs::create_dir_all(&reports_dir)
            .map_err(|e| StorageError::DirectoryError(e.to_string()))?;
        Ok(Self { reports_dir })
    }

    pub fn dir(&self) -> &Path {
        &self.reports_dir
    }

    /// Save a host record.
    pub fn save(&self, record: &HostRecord) -> StorageResult<()> {
        let file = self.record_file(&record.id);
        let content = serde_json::to_string_pretty(record)?;

        fs::write(&file, content).map_err(|e| StorageError::SaveFailed(e.to_string()))
    }

    /// Load a host record by ID.
    pub fn load(&self, id: &ScanId) -> StorageResult<HostRecord> {
        let content = fs::read_to_string(self.record_file(id))
            .map_err(|e| StorageError::LoadFailed(e.to_string()))?;

        serde_json::from_str(&content).map_err(|e| StorageError::LoadFailed(e.to_string()))
    }

    /// Lines of the most recent record for `address`.
    pub fn ports_by_host(&self, address: &str) -> StorageResult<Vec<String>> {
        self.list()?
            .into_iter()
            .find(|record| record.address == address)
            .map(|record| record.lines())
            .ok_or_else(|| StorageError::HostNotFound(address.to_string()))
    }

    /// List all record IDs.
    pub fn list_ids(&self) -> StorageResult<Vec<ScanId>> {
        let mut ids = Vec::new();

        for entry in fs::read_dir(&self.reports_dir)
            .map_err(|e| StorageError::DirectoryError(e.to_string()))?
        {
            let entry = entry.map_err(|e| StorageError::DirectoryError(e.to_string()))?;
            let path = entry.path();

            if path.extension().is_some_and(|ext| ext == "json") {
                if let Some(stem) = path.file_stem() {
                    if let Ok(id) = stem.to_string_lossy().parse::<ScanId>() {
                        ids.push(id);
                    }
                }
            }
        }

        Ok(ids)
    }

    /// List all records, most recent first. Unreadable files are skipped.
    pub fn list(&self) -> StorageResult<Vec<HostRecord>> {
        let mut records = Vec::new();

        for id in self.list_ids()? {
            match self.load(&id) {
                Ok(record) => records.push(record),
                Err(e) => debug!(%id, error = %e, "skipping unreadable record"),
            }
        }

        records.sort_by(|a, b| b.recorded_at.cmp(&a.recorded_at));

        Ok(records)
    }

    /// Most recent `count` records, optionally only those for `address`.
    pub fn history(&self, address: Option<&str>, count: usize) -> StorageResult<Vec<HostRecord>> {
        Ok(self
            .list()?
            .into_iter()
            .filter(|record| address.map_or(true, |a| record.address == a))
            .take(count)
            .collect())
    }

    /// Delete a record.
    pub fn delete(&self, id: &ScanId) -> StorageResult<()> {
        fs::remove_file(self.record_file(id)).map_err(|e| StorageError::SaveFailed(e.to_string()))
    }

    /// Delete records older than `max_age`; returns how many were removed.
    pub fn cleanup(&self, max_age: chrono::Duration) -> StorageResult<usize> {
        // An age reaching past the earliest representable time matches nothing.
        let Some(cutoff) = Utc::now().checked_sub_signed(max_age) else {
            return Ok(0);
        };
        let mut deleted = 0;

        for record in self.list()? {
            if record.recorded_at < cutoff {
                self.delete(&record.id)?;
                deleted += 1;
            }
        }

        Ok(deleted)
    }

    fn record_file(&self, id: &ScanId) -> PathBuf {
        self.reports_dir.join(format!("{}.json", id))
    }
}

impl ReportStore for JsonStore {
    fn insert_ports(&self, address: &str, lines: &[String]) -> StorageResult<()> {
        let ports = lines
            .iter()
            .map(|line| PortRecord::parse_line(line))
            .collect::<StorageResult<Vec<_>>>()?;

        let record = HostRecord::new(address, ports);
        self.save(&record)?;
        debug!(%address, id = %record.id, "saved host record");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn store() -> (TempDir, JsonStore) {
        let dir = TempDir::new().unwrap();
        let store = JsonStore::open(dir.path().join("reports")).unwrap();
        (dir, store)
    }

    fn lines(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_parse_line() {
        let record = PortRecord::parse_line("8080\t\tOpen/Filtered\n").unwrap();
        assert_eq!(record.port.as_u16(), 8080);
        assert_eq!(record.status, "Open/Filtered");
        assert_eq!(record.line(), "8080\t\tOpen/Filtered");

        assert!(PortRecord::parse_line("8080 Open").is_err());
        assert!(PortRecord::parse_line("0\t\tOpen").is_err());
        assert!(PortRecord::parse_line("22\t\t\n").is_err());
    }

    #[test]
    fn test_insert_and_lookup() {
        let (_dir, store) = store();
        store
            .insert_ports("10.0.0.5", &lines(&["22\t\tOpen\n", "443\t\tFiltered\n"]))
            .unwrap();

        assert_eq!(
            store.ports_by_host("10.0.0.5").unwrap(),
            vec!["22\t\tOpen".to_string(), "443\t\tFiltered".to_string()]
        );
        assert!(matches!(
            store.ports_by_host("10.0.0.6"),
            Err(StorageError::HostNotFound(_))
        ));
    }

    #[test]
    fn test_most_recent_record_wins() {
        let (_dir, store) = store();
        store.insert_ports("10.0.0.5", &lines(&["22\t\tOpen\n"])).unwrap();
        std::thread::sleep(std::time::Duration::from_millis(5));
        store.insert_ports("10.0.0.5", &lines(&["80\t\tOpen\n"])).unwrap();

        assert_eq!(store.ports_by_host("10.0.0.5").unwrap(), vec!["80\t\tOpen".to_string()]);
        assert_eq!(store.list().unwrap().len(), 2);
        assert_eq!(store.history(Some("10.0.0.5"), 1).unwrap().len(), 1);
        assert!(store.history(Some("10.9.9.9"), 10).unwrap().is_empty());
    }

    #[test]
    fn test_malformed_lines_are_rejected() {
        let (_dir, store) = store();
        let err = store.insert_ports("10.0.0.5", &lines(&["garbage"])).unwrap_err();
        assert!(matches!(err, StorageError::MalformedLine(_)));
        assert!(store.list().unwrap().is_empty());
    }

    #[test]
    fn test_empty_report_is_stored() {
        let (_dir, store) = store();
        store.insert_ports("10.0.0.7", &[]).unwrap();
        assert!(store.ports_by_host("10.0.0.7").unwrap().is_empty());
    }

    #[test]
    fn test_cleanup_removes_old_records() {
        let (_dir, store) = store();
        let mut old = HostRecord::new("10.0.0.1", Vec::new());
        old.recorded_at = Utc::now() - chrono::Duration::days(40);
        store.save(&old).unwrap();
        store.insert_ports("10.0.0.2", &lines(&["22\t\tOpen\n"])).unwrap();

        assert_eq!(store.cleanup(chrono::Duration::days(30)).unwrap(), 1);
        let remaining = store.list().unwrap();
        assert_eq!(remaining.len(), 1);
        assert_eq!(remaining[0].address, "10.0.0.2");
    }

    #[test]
    fn test_cleanup_with_huge_age_deletes_nothing() {
        let (_dir, store) = store();
        store.insert_ports("10.0.0.4", &lines(&["80\t\tOpen\n"])).unwrap();

        for days in [100_000_000, 200_000_000, 4_000_000_000] {
            assert_eq!(store.cleanup(chrono::Duration::days(days)).unwrap(), 0);
        }
        assert_eq!(store.cleanup(chrono::Duration::MAX).unwrap(), 0);
        assert_eq!(store.list().unwrap().len(), 1);
    }

    #[test]
    fn test_unreadable_files_are_skipped() {
        let (_dir, store) = store();
        fs::write(store.dir().join(format!("{}.json", ScanId::new())), "{").unwrap();
        fs::write(store.dir().join("notes.txt"), "ignored").unwrap();
        store.insert_ports("10.0.0.3", &[]).unwrap();

        assert_eq!(store.list().unwrap().len(), 1);
    }
}
