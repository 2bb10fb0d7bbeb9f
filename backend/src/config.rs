//! Application configuration
//!
//! Loaded from an optional JSON file; `PERIO_FLOW_DATA_DIR` overrides the
//! data directory.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::domain::{DomainError, DomainResult, DEEP_POCKET_THRESHOLD_MM};

pub const DATA_DIR_ENV: &str = "PERIO_FLOW_DATA_DIR";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Directory holding the database (and logs unless `log_dir` is set)
    pub data_dir: PathBuf,
    pub db_file_name: String,
    pub log_dir: Option<PathBuf>,
    /// Log file name stem
    pub app_name: String,
    /// Probing depth (mm) from which a pocket is offered for SRP
    pub deep_pocket_threshold_mm: u8,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("data"),
            db_file_name: "perio_flow.db".to_string(),
            log_dir: None,
            app_name: "PerioFlow".to_string(),
            deep_pocket_threshold_mm: DEEP_POCKET_THRESHOLD_MM,
        }
    }
}

impl AppConfig {
    /// Read `path` if it exists, otherwise use defaults; then apply the environment
    pub fn load(path: &Path) -> DomainResult<Self> {
        let config = if path.exists() {
            let raw = std::fs::read_to_string(path)
                .map_err(|e| DomainError::Persistence(format!("Cannot read {}: {}", path.display(), e)))?;
            serde_json::from_str(&raw)
                .map_err(|e| DomainError::Validation(format!("Invalid config {}: {}", path.display(), e)))?
        } else {
            log::info!("No config at {}, using defaults", path.display());
            Self::default()
        };
        Ok(config.with_data_dir_override(std::env::var(DATA_DIR_ENV).ok()))
    }

    pub fn with_data_dir_override(mut self, data_dir: Option<String>) -> Self {
        if let Some(dir) = data_dir.filter(|d| !d.trim().is_empty()) {
            self.data_dir = PathBuf::from(dir);
        }
        self
    }

    pub fn db_path(&self) -> PathBuf {
        self.data_dir.join(&self.db_file_name)
    }

    pub fn log_dir(&self) -> PathBuf {
        self.log_dir.clone().unwrap_or_else(|| self.data_dir.join("logs"))
    }
}

/// Serializes tests that read or write `PERIO_FLOW_DATA_DIR`
#[cfg(test)]
pub(crate) static ENV_LOCK: std::sync::Mutex<()> = std::sync::Mutex::new(());

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = AppConfig::default();
        assert_eq!(config.db_path(), PathBuf::from("data").join("perio_flow.db"));
        assert_eq!(config.log_dir(), PathBuf::from("data").join("logs"));
        assert_eq!(config.deep_pocket_threshold_mm, 4);
    }

    #[test]
    fn test_load_partial_file_keeps_defaults() {
        let _env = ENV_LOCK.lock().unwrap_or_else(|e| e.into_inner());
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, r#"{ "data_dir": "/var/perio", "deep_pocket_threshold_mm": 5 }"#).unwrap();

        let config = AppConfig::load(&path).unwrap();
        assert_eq!(config.data_dir, PathBuf::from("/var/perio"));
        assert_eq!(config.deep_pocket_threshold_mm, 5);
        assert_eq!(config.app_name, "PerioFlow");
        assert_eq!(config.db_file_name, "perio_flow.db");
    }

    #[test]
    fn test_load_missing_file_uses_defaults() {
        let _env = ENV_LOCK.lock().unwrap_or_else(|e| e.into_inner());
        let dir = tempfile::tempdir().unwrap();
        let config = AppConfig::load(&dir.path().join("absent.json")).unwrap();
        assert_eq!(config, AppConfig::default());
    }

    #[test]
    fn test_load_applies_env_override() {
        let _env = ENV_LOCK.lock().unwrap_or_else(|e| e.into_inner());
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, r#"{ "data_dir": "/var/perio" }"#).unwrap();

        std::env::set_var(DATA_DIR_ENV, "/srv/perio");
        let loaded = AppConfig::load(&path);
        std::env::remove_var(DATA_DIR_ENV);

        assert_eq!(loaded.unwrap().data_dir, PathBuf::from("/srv/perio"));
    }

    #[test]
    fn test_invalid_file_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, "{ not json").unwrap();
        assert!(AppConfig::load(&path).unwrap_err().is_validation());
    }

    #[test]
    fn test_unreadable_path_is_persistence_error() {
        // A directory exists but cannot be read as a file
        let dir = tempfile::tempdir().unwrap();
        let err = AppConfig::load(dir.path()).unwrap_err();
        assert!(matches!(err, DomainError::Persistence(_)));
    }

    #[test]
    fn test_data_dir_override() {
        let config = AppConfig::default().with_data_dir_override(Some("/tmp/perio".to_string()));
        assert_eq!(config.data_dir, PathBuf::from("/tmp/perio"));

        let unchanged = AppConfig::default().with_data_dir_override(Some("  ".to_string()));
        assert_eq!(unchanged.data_dir, PathBuf::from("data"));
    }
}
