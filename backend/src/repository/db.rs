//! Database Connection and Setup
//!
//! Manages SQLite database connection and migrations.

use rusqlite::Connection;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::Mutex;

use crate::domain::{DomainError, DomainResult};

impl From<rusqlite::Error> for DomainError {
    fn from(e: rusqlite::Error) -> Self {
        DomainError::Persistence(e.to_string())
    }
}

/// Database state wrapper
///
/// The connection slot stays `None` until [`init_db`] has run, so repositories
/// can be built before the database is ready.
#[derive(Debug, Clone)]
pub struct DbState {
    pub conn: Arc<Mutex<Option<Connection>>>,
    pub db_path: PathBuf,
}

impl DbState {
    pub fn new(db_path: PathBuf) -> Self {
        Self {
            conn: Arc::new(Mutex::new(None)),
            db_path,
        }
    }

    pub async fn is_ready(&self) -> bool {
        self.conn.lock().await.is_some()
    }
}

/// Open the database at `db_path` (`:memory:` for tests) and run migrations
pub async fn init_db(db_path: &Path) -> DomainResult<DbState> {
    let conn = Connection::open(db_path)
        .map_err(|e| DomainError::Persistence(format!("Failed to open {}: {}", db_path.display(), e)))?;

    run_migrations(&conn)?;

    let state = DbState::new(db_path.to_path_buf());
    *state.conn.lock().await = Some(conn);
    log::info!("Database ready at {}", db_path.display());
    Ok(state)
}

/// Check if a column exists in a table
fn column_exists(conn: &Connection, table: &str, column: &str) -> DomainResult<bool> {
    let mut stmt = conn.prepare(&format!("PRAGMA table_info({})", table))?;
    let names = stmt.query_map([], |row| row.get::<_, String>(1))?;
    for name in names {
        if name? == column {
            return Ok(true);
        }
    }
    Ok(false)
}

/// Run database migrations
fn run_migrations(conn: &Connection) -> DomainResult<()> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS treatment_plans (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            patient_id TEXT NOT NULL,
            staff_type TEXT NOT NULL DEFAULT 'hygienist',
            periodontal_phase TEXT,
            tooth_numbers TEXT NOT NULL DEFAULT '',
            content TEXT NOT NULL,
            priority INTEGER NOT NULL DEFAULT 2,
            sort_order INTEGER NOT NULL,
            status TEXT NOT NULL DEFAULT 'planned',
            completed_at INTEGER,
            created_at INTEGER,
            updated_at INTEGER
        );
        CREATE TABLE IF NOT EXISTS patient_sort_counters (
            patient_id TEXT PRIMARY KEY,
            last_sort_order INTEGER NOT NULL DEFAULT 0
        );
        CREATE INDEX IF NOT EXISTS idx_treatment_plans_patient
            ON treatment_plans(patient_id, sort_order);",
    )?;

    // Memo column arrived after the first schema
    if !column_exists(conn, "treatment_plans", "memo")? {
        conn.execute("ALTER TABLE treatment_plans ADD COLUMN memo TEXT", [])
            .map_err(|e| DomainError::Persistence(format!("Failed to add memo: {}", e)))?;
    }

    Ok(())
}
