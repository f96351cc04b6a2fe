//! SQLite state database
//!
//! Tracks installed packages and an append-only history of operations.

use std::path::{Path, PathBuf};

use pour_core::InstalledState;
use pour_schema::{PackageName, Sha256Digest, Version};
use rusqlite::{Connection, OptionalExtension, Row, params};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum DbError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("Corrupt state row for {name}: {reason}")]
    Corrupt { name: String, reason: String },

    #[error("State database thread stopped")]
    ActorDied,
}

/// One recorded install, upgrade or uninstall.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HistoryEvent {
    pub timestamp: i64,
    pub action: String, // "install", "upgrade", "uninstall"
    pub package: String,
    pub version_from: Option<String>,
    pub version_to: Option<String>,
    pub success: bool,
}

impl HistoryEvent {
    pub fn now(
        action: &str,
        package: &PackageName,
        version_from: Option<&Version>,
        version_to: Option<&Version>,
        success: bool,
    ) -> Self {
        Self {
            timestamp: chrono::Utc::now().timestamp(),
            action: action.to_string(),
            package: package.to_string(),
            version_from: version_from.map(ToString::to_string),
            version_to: version_to.map(ToString::to_string),
            success,
        }
    }
}

/// State database for tracking installations
#[derive(Debug)]
pub struct StateDb {
    conn: Connection,
}

impl StateDb {
    /// Open database at `path`, creating it and its parent directory if needed
    pub fn open_at(path: &Path) -> Result<Self, DbError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).ok();
        }
        let conn = Connection::open(path)?;

        // Enable WAL mode for better concurrency
        conn.execute_batch("PRAGMA journal_mode=WAL;")?;

        let db = Self { conn };
        db.init_schema()?;
        Ok(db)
    }

    fn init_schema(&self) -> Result<(), DbError> {
        self.conn.execute_batch(
            "
            CREATE TABLE IF NOT EXISTS installed (
                name TEXT PRIMARY KEY,
                version TEXT NOT NULL,
                checksum TEXT NOT NULL,
                install_path TEXT NOT NULL,
                installed_at INTEGER NOT NULL
            );

            CREATE TABLE IF NOT EXISTS history (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                timestamp INTEGER NOT NULL,
                action TEXT NOT NULL,
                package TEXT NOT NULL,
                version_from TEXT,
                version_to TEXT,
                success INTEGER NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_history_package ON history(package);
            ",
        )?;
        Ok(())
    }

    /// Record (or replace) the installed state of a package
    pub fn put_installed(&self, state: &InstalledState) -> Result<(), DbError> {
        self.conn.execute(
            "INSERT OR REPLACE INTO installed (name, version, checksum, install_path, installed_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                state.name.as_str(),
                state.version.as_str(),
                state.checksum.as_str(),
                state.install_path.to_string_lossy(),
                state.installed_at
            ],
        )?;
        Ok(())
    }

    pub fn get_installed(&self, name: &str) -> Result<Option<InstalledState>, DbError> {
        let row = self
            .conn
            .query_row(
                "SELECT name, version, checksum, install_path, installed_at
                 FROM installed WHERE name = ?1",
                params![name],
                RawState::from_row,
            )
            .optional()?;
        row.map(RawState::into_state).transpose()
    }

    /// Forget a package. Returns whether it was recorded.
    pub fn remove_installed(&self, name: &str) -> Result<bool, DbError> {
        let deleted = self
            .conn
            .execute("DELETE FROM installed WHERE name = ?1", params![name])?;
        Ok(deleted > 0)
    }

    pub fn list_installed(&self) -> Result<Vec<InstalledState>, DbError> {
        let mut stmt = self.conn.prepare(
            "SELECT name, version, checksum, install_path, installed_at
             FROM installed ORDER BY name",
        )?;
        let rows = stmt.query_map([], RawState::from_row)?;

        let mut states = Vec::new();
        for row in rows {
            states.push(row?.into_state()?);
        }
        Ok(states)
    }

    pub fn add_history(&self, event: &HistoryEvent) -> Result<(), DbError> {
        self.conn.execute(
            "INSERT INTO history (timestamp, action, package, version_from, version_to, success)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                event.timestamp,
                event.action,
                event.package,
                event.version_from,
                event.version_to,
                event.success
            ],
        )?;
        Ok(())
    }

    /// History of one package, oldest first
    pub fn history(&self, package: &str) -> Result<Vec<HistoryEvent>, DbError> {
        let mut stmt = self.conn.prepare(
            "SELECT timestamp, action, package, version_from, version_to, success
             FROM history WHERE package = ?1 ORDER BY id",
        )?;
        let rows = stmt.query_map(params![package], |row| {
            Ok(HistoryEvent {
                timestamp: row.get(0)?,
                action: row.get(1)?,
                package: row.get(2)?,
                version_from: row.get(3)?,
                version_to: row.get(4)?,
                success: row.get(5)?,
            })
        })?;
        rows.collect::<Result<Vec<_>, _>>().map_err(DbError::from)
    }
}

/// Row as stored, before the typed fields are re-validated.
struct RawState {
    name: String,
    version: String,
    checksum: String,
    install_path: String,
    installed_at: i64,
}

impl RawState {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            name: row.get(0)?,
            version: row.get(1)?,
            checksum: row.get(2)?,
            install_path: row.get(3)?,
            installed_at: row.get(4)?,
        })
    }

    fn into_state(self) -> Result<InstalledState, DbError> {
        let corrupt = |reason: String| DbError::Corrupt {
            name: self.name.clone(),
            reason,
        };
        let version = Version::parse(&self.version).map_err(|e| corrupt(e.to_string()))?;
        let checksum = Sha256Digest::parse(&self.checksum).map_err(|e| corrupt(e.to_string()))?;

        Ok(InstalledState {
            name: PackageName::new(&self.name),
            version,
            checksum,
            install_path: PathBuf::from(self.install_path),
            installed_at: self.installed_at,
        })
    }
}
