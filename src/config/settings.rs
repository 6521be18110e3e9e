//! Application settings and paths.
//!
//! Manages XDG-compliant paths for configuration and stored results.

use crate::cli::OutputFormat;
use crate::error::{ConfigError, ConfigResult};
use crate::scanner::{CoordinatorConfig, ScanMode, DEFAULT_TIMEOUT, DEFAULT_WORKERS, FAST_TIMEOUT};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use std::time::Duration;

/// Global paths singleton.
static PATHS: OnceLock<Paths> = OnceLock::new();

/// Application directory paths following the XDG Base Directory Specification.
#[derive(Debug, Clone)]
pub struct Paths {
    /// Configuration directory (~/.config/tcprobe)
    pub config_dir: PathBuf,
    /// Data directory (~/.local/share/tcprobe)
    pub data_dir: PathBuf,
}

impl Paths {
    /// Get the global paths instance, creating the directories on first use.
    pub fn get() -> ConfigResult<&'static Paths> {
        if let Some(paths) = PATHS.get() {
            return Ok(paths);
        }
        let paths = Self::discover()?;
        Ok(PATHS.get_or_init(|| paths))
    }

    fn discover() -> ConfigResult<Self> {
        let project =
            ProjectDirs::from("com", "tcprobe", "tcprobe").ok_or(ConfigError::DirectoryNotFound)?;
        Self::at(project.config_dir(), project.data_dir())
    }

    /// Use explicit directories, creating them if needed.
    pub fn at(config_dir: impl Into<PathBuf>, data_dir: impl Into<PathBuf>) -> ConfigResult<Self> {
        let paths = Self {
            config_dir: config_dir.into(),
            data_dir: data_dir.into(),
        };

        fs::create_dir_all(&paths.config_dir)?;
        fs::create_dir_all(&paths.data_dir)?;

        Ok(paths)
    }

    /// Get the path to the settings file.
    pub fn settings_file(&self) -> PathBuf {
        self.config_dir.join("settings.json")
    }

    /// Get the path to the host report storage directory.
    pub fn reports_dir(&self) -> PathBuf {
        self.data_dir.join("reports")
    }
}

/// Application-wide settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppSettings {
    /// Probes in flight per host.
    pub max_workers: usize,
    /// Reply timeout for stateful deployments, in milliseconds.
    pub timeout_ms: u64,
    /// Reply timeout used when `best_effort` is set, in milliseconds.
    pub fast_timeout_ms: u64,
    /// Trade accuracy for speed on large port lists.
    pub best_effort: bool,
    pub default_mode: ScanMode,
    /// Store each completed host report.
    pub persist_results: bool,
    pub default_output_format: OutputFormat,
}

impl Default for AppSettings {
    fn default() -> Self {
        Self {
            max_workers: DEFAULT_WORKERS,
            timeout_ms: DEFAULT_TIMEOUT.as_millis() as u64,
            fast_timeout_ms: FAST_TIMEOUT.as_millis() as u64,
            best_effort: false,
            default_mode: ScanMode::default(),
            persist_results: true,
            default_output_format: OutputFormat::default(),
        }
    }
}

impl AppSettings {
    /// Load settings from the default location, or defaults if none are saved.
    pub fn load() -> ConfigResult<Self> {
        let file = Paths::get()?.settings_file();
        if !file.exists() {
            return Ok(Self::default());
        }
        Self::load_from(&file)
    }

    /// Load settings from a specific file.
    pub fn load_from(path: &Path) -> ConfigResult<Self> {
        let content = fs::read_to_string(path).map_err(|e| ConfigError::ReadFailed {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        let settings: Self =
            serde_json::from_str(&content).map_err(|e| ConfigError::InvalidFormat(e.to_string()))?;
        settings.validate()?;
        Ok(settings)
    }

    /// Load from `custom` when given, otherwise from the default location.
    pub fn resolve(custom: Option<&Path>) -> ConfigResult<Self> {
        match custom {
            Some(path) => Self::load_from(path),
            None => Self::load(),
        }
    }

    /// Save settings to the default location.
    pub fn save(&self) -> ConfigResult<PathBuf> {
        let file = Paths::get()?.settings_file();
        self.save_to(&file)?;
        Ok(file)
    }

    /// Save settings to a specific file.
    pub fn save_to(&self, path: &Path) -> ConfigResult<()> {
        self.validate()?;
        let content = serde_json::to_string_pretty(self)?;
        fs::write(path, content).map_err(|e| ConfigError::WriteFailed {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })
    }

    pub fn validate(&self) -> ConfigResult<()> {
        if self.max_workers == 0 {
            return Err(ConfigError::InvalidValue(
                "max_workers must be at least 1".to_string(),
            ));
        }
        if self.timeout_ms == 0 || self.fast_timeout_ms == 0 {
            return Err(ConfigError::InvalidValue(
                "timeouts must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }

    /// Reply timeout for this deployment.
    pub fn probe_timeout(&self) -> Duration {
        if self.best_effort {
            Duration::from_millis(self.fast_timeout_ms)
        } else {
            Duration::from_millis(self.timeout_ms)
        }
    }

    /// Coordinator settings, with an optional per-run worker override.
    pub fn coordinator_config(&self, workers: Option<usize>) -> CoordinatorConfig {
        CoordinatorConfig::default()
            .with_workers(workers.unwrap_or(self.max_workers))
            .with_timeout(self.probe_timeout())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_default_settings() {
        let settings = AppSettings::default();
        assert_eq!(settings.max_workers, 15);
        assert_eq!(settings.timeout_ms, 10_000);
        assert_eq!(settings.fast_timeout_ms, 500);
        assert_eq!(settings.default_mode, ScanMode::Syn);
        assert!(settings.persist_results);
        assert!(settings.validate().is_ok());
    }

    #[test]
    fn test_best_effort_uses_fast_timeout() {
        let mut settings = AppSettings::default();
        assert_eq!(settings.probe_timeout(), Duration::from_secs(10));
        settings.best_effort = true;
        assert_eq!(settings.probe_timeout(), Duration::from_millis(500));

        let config = settings.coordinator_config(Some(4));
        assert_eq!(config.workers, 4);
        assert_eq!(config.timeout, Duration::from_millis(500));
    }

    #[test]
    fn test_partial_file_fills_defaults() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("settings.json");
        fs::write(&path, r#"{ "max_workers": 32, "default_mode": "fin" }"#).unwrap();

        let settings = AppSettings::load_from(&path).unwrap();
        assert_eq!(settings.max_workers, 32);
        assert_eq!(settings.default_mode, ScanMode::Fin);
        assert_eq!(settings.timeout_ms, 10_000);
    }

    #[test]
    fn test_zero_values_rejected() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("settings.json");
        fs::write(&path, r#"{ "max_workers": 0 }"#).unwrap();
        assert!(matches!(
            AppSettings::load_from(&path),
            Err(ConfigError::InvalidValue(_))
        ));

        let settings = AppSettings {
            fast_timeout_ms: 0,
            ..Default::default()
        };
        assert!(settings.save_to(&path).is_err());
    }

    #[test]
    fn test_save_and_reload() {
        let dir = TempDir::new().unwrap();
        let paths = Paths::at(dir.path().join("config"), dir.path().join("data")).unwrap();
        assert!(paths.data_dir.is_dir());

        let settings = AppSettings {
            best_effort: true,
            default_output_format: OutputFormat::Json,
            ..Default::default()
        };
        settings.save_to(&paths.settings_file()).unwrap();

        let loaded = AppSettings::load_from(&paths.settings_file()).unwrap();
        assert_eq!(loaded, settings);
    }

    #[test]
    fn test_malformed_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("settings.json");
        fs::write(&path, "not json").unwrap();
        assert!(matches!(
            AppSettings::load_from(&path),
            Err(ConfigError::InvalidFormat(_))
        ));
    }
}
