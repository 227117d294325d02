use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::Duration;

use crate::data::migrations;
use crate::error::AppError;
use crate::services::navigation_service::NavigationController;

/// Per-session state: the cache connection and the navigation controller.
/// The connection lock is the single-writer discipline for the cache and is
/// never held across an await.
pub struct AppState {
    pub db: Mutex<rusqlite::Connection>,
    pub db_path: PathBuf,
    pub navigation: Mutex<NavigationController>,
}

impl AppState {
    /// Open (or create) the cache database at `path` and run migrations.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, AppError> {
        let db_path = path.as_ref().to_path_buf();
        if let Some(parent) = db_path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let conn = rusqlite::Connection::open(&db_path)?;
        conn.busy_timeout(Duration::from_secs(5))?;
        migrations::run_migrations(&conn)?;

        Ok(Self {
            db: Mutex::new(conn),
            db_path,
            navigation: Mutex::new(NavigationController::new()),
        })
    }

    /// Ephemeral state for tests and previews; nothing survives the
    /// process.
    pub fn open_in_memory() -> Result<Self, AppError> {
        let conn = rusqlite::Connection::open_in_memory()?;
        migrations::run_migrations(&conn)?;
        Ok(Self {
            db: Mutex::new(conn),
            db_path: PathBuf::new(),
            navigation: Mutex::new(NavigationController::new()),
        })
    }
}
