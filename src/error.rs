//! Error types for tcprobe.
//!
//! Uses `thiserror` for ergonomic error definitions.

use std::path::PathBuf;
use thiserror::Error;

/// Name lookup failed for a scan target.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("failed to resolve '{target}': {reason}")]
pub struct ResolutionError {
    /// The identifier exactly as it was given.
    pub target: String,
    pub reason: String,
}

impl ResolutionError {
    pub fn new(target: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            target: target.into(),
            reason: reason.into(),
        }
    }
}

/// Local failure while sending or receiving a probe.
#[derive(Error, Debug)]
pub enum ProbeError {
    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    #[error("Raw socket error: {0}")]
    RawSocket(String),

    #[error("Invalid packet: {0}")]
    InvalidPacket(String),

    #[error("Unsupported target: {0}")]
    Unsupported(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl ProbeError {
    /// Classify an I/O error raised while opening a raw channel.
    pub fn from_channel_error(err: std::io::Error) -> Self {
        let text = err.to_string().to_lowercase();
        if err.kind() == std::io::ErrorKind::PermissionDenied
            || text.contains("permission")
            || text.contains("operation not permitted")
        {
            Self::PermissionDenied("raw socket access requires root/sudo privileges".to_string())
        } else {
            Self::RawSocket(err.to_string())
        }
    }
}

/// Host-level scan failure. Never affects sibling hosts.
#[derive(Error, Debug)]
pub enum ScanError {
    #[error(transparent)]
    Resolution(#[from] ResolutionError),

    #[error("probe transport failed: {0}")]
    Transport(#[from] ProbeError),
}

/// Result type alias for host scans.
pub type ScanResult<T> = Result<T, ScanError>;

/// Rejected scan session requests.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SessionError {
    #[error("a scan is already running")]
    AlreadyRunning,

    #[error("no hosts to scan")]
    NoHosts,

    #[error("no ports to scan")]
    NoPorts,
}

/// Configuration loading and validation errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("could not determine configuration directories")]
    DirectoryNotFound,

    #[error("failed to read {path}: {reason}")]
    ReadFailed { path: PathBuf, reason: String },

    #[error("failed to write {path}: {reason}")]
    WriteFailed { path: PathBuf, reason: String },

    #[error("invalid configuration format: {0}")]
    InvalidFormat(String),

    #[error("invalid setting: {0}")]
    InvalidValue(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type ConfigResult<T> = Result<T, ConfigError>;

/// Persistence errors. Reported, never fatal to a scan.
#[derive(Error, Debug)]
pub enum StorageError {
    #[error("storage directory error: {0}")]
    DirectoryError(String),

    #[error("failed to save record: {0}")]
    SaveFailed(String),

    #[error("failed to load record: {0}")]
    LoadFailed(String),

    #[error("malformed port line: {0:?}")]
    MalformedLine(String),

    #[error("no stored results for host {0}")]
    HostNotFound(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type StorageResult<T> = Result<T, StorageError>;

/// Errors surfaced by command-line handlers.
#[derive(Error, Debug)]
pub enum CliError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error(transparent)]
    Session(#[from] SessionError),

    #[error(transparent)]
    Port(#[from] crate::types::PortError),

    #[error(transparent)]
    Target(#[from] crate::types::TargetError),

    #[error(transparent)]
    Probe(#[from] ProbeError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Other(String),
}

pub type CliResult<T> = Result<T, CliError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolution_error_wraps_into_scan_error() {
        let err: ScanError = ResolutionError::new("nowhere.invalid", "no records").into();
        assert!(matches!(err, ScanError::Resolution(_)));
        assert_eq!(
            err.to_string(),
            "failed to resolve 'nowhere.invalid': no records"
        );
    }

    #[test]
    fn test_channel_permission_error() {
        let io = std::io::Error::from(std::io::ErrorKind::PermissionDenied);
        assert!(matches!(
            ProbeError::from_channel_error(io),
            ProbeError::PermissionDenied(_)
        ));

        let io = std::io::Error::new(std::io::ErrorKind::Other, "no buffer space");
        assert!(matches!(
            ProbeError::from_channel_error(io),
            ProbeError::RawSocket(_)
        ));
    }
}
