//! Perio-Flow Backend
//!
//! Layered architecture:
//! - domain: Core entities and business rules
//! - workflow: Periodontal phase engine
//! - repository: Data access abstractions and implementations
//! - commands: Command handlers a desktop shell binds to

use std::path::{Path, PathBuf};
use std::sync::Arc;

pub mod commands;
pub mod config;
pub mod domain;
pub mod repository;
pub mod workflow;

use config::AppConfig;
use repository::{init_db, DbState, TreatmentPlanRepository};
use workflow::PeriodontalWorkflow;

/// Application state shared across commands
#[derive(Debug)]
pub struct AppState {
    pub db_state: DbState,
    pub db_path: PathBuf,
    pub plan_repo: Arc<TreatmentPlanRepository>,
    pub workflow: PeriodontalWorkflow<TreatmentPlanRepository>,
    pub config: AppConfig,
}

impl AppState {
    /// Wire repositories and the workflow over an opened database
    pub fn new(db_state: DbState, config: AppConfig) -> Self {
        let plan_repo = Arc::new(TreatmentPlanRepository::new(db_state.conn.clone()));
        let workflow = PeriodontalWorkflow::new(plan_repo.clone()).with_threshold(config.deep_pocket_threshold_mm);
        Self {
            db_path: db_state.db_path.clone(),
            db_state,
            plan_repo,
            workflow,
            config,
        }
    }

    /// Create the data dir, start logging and open the database
    pub async fn bootstrap(config: AppConfig) -> Result<Self, String> {
        std::fs::create_dir_all(&config.data_dir)
            .map_err(|e| format!("Failed to create {}: {}", config.data_dir.display(), e))?;

        // A second bootstrap in the same process keeps the first subscriber
        if let Err(e) = rolling_logger::init_logger(config.log_dir(), &config.app_name) {
            log::warn!("{}", e);
        }

        let db_path = config.db_path();
        match init_db(&db_path).await {
            Ok(db_state) => {
                let _ = rolling_logger::info(&format!("DB init success: {}", db_path.display()));
                Ok(Self::new(db_state, config))
            }
            Err(e) => {
                let _ = rolling_logger::error(&format!("DB init failed: {}", e));
                Err(e.to_string())
            }
        }
    }

    /// Load the config file at `config_path` (defaults when absent), then bootstrap
    pub async fn bootstrap_from(config_path: &Path) -> Result<Self, String> {
        let config = AppConfig::load(config_path).map_err(|e| e.to_string())?;
        Self::bootstrap(config).await
    }

    /// State over a fresh in-memory database, without logging
    pub async fn in_memory() -> Result<Self, String> {
        let db_state = init_db(Path::new(":memory:")).await.map_err(|e| e.to_string())?;
        Ok(Self::new(db_state, AppConfig::default()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_bootstrap_creates_database_and_logs() {
        let dir = tempfile::tempdir().unwrap();
        let config = AppConfig {
            data_dir: dir.path().join("data"),
            ..AppConfig::default()
        };

        let state = AppState::bootstrap(config).await.expect("bootstrap");
        assert!(state.db_state.is_ready().await);
        assert!(state.db_path.ends_with("perio_flow.db"));
        assert!(state.db_path.exists());
    }

    #[tokio::test]
    async fn test_bootstrap_from_config_file() {
        let dir = tempfile::tempdir().unwrap();
        let data_dir = dir.path().join("clinic");
        let config_path = dir.path().join("perio_flow.json");
        let raw = serde_json::json!({
            "data_dir": data_dir,
            "db_file_name": "clinic.db",
            "deep_pocket_threshold_mm": 6,
        });
        std::fs::write(&config_path, raw.to_string()).unwrap();

        let state = {
            let _env = config::ENV_LOCK.lock().unwrap_or_else(|e| e.into_inner());
            AppState::bootstrap_from(&config_path).await.expect("bootstrap")
        };
        assert_eq!(state.db_path, data_dir.join("clinic.db"));
        assert!(state.db_path.exists());
        assert_eq!(state.config.deep_pocket_threshold_mm, 6);
    }

    #[tokio::test]
    async fn test_bootstrap_from_invalid_config_fails() {
        let dir = tempfile::tempdir().unwrap();
        let config_path = dir.path().join("perio_flow.json");
        std::fs::write(&config_path, "[").unwrap();

        let err = AppState::bootstrap_from(&config_path).await.unwrap_err();
        assert!(err.starts_with("Invalid input"));
    }
}
