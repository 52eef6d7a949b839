//! Database connection management and migrations

use rusqlite::Connection;
use std::path::{Path, PathBuf};
use tracing::info;

/// Database error type
#[derive(Debug)]
pub enum DatabaseError {
    ConnectionFailed(String),
    MigrationFailed(String),
    QueryFailed(String),
    JsonParseError(String),
}

impl std::fmt::Display for DatabaseError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DatabaseError::ConnectionFailed(msg) => write!(f, "Connection failed: {}", msg),
            DatabaseError::MigrationFailed(msg) => write!(f, "Migration failed: {}", msg),
            DatabaseError::QueryFailed(msg) => write!(f, "Query failed: {}", msg),
            DatabaseError::JsonParseError(msg) => write!(f, "JSON parse error: {}", msg),
        }
    }
}

impl std::error::Error for DatabaseError {}

impl From<rusqlite::Error> for DatabaseError {
    fn from(err: rusqlite::Error) -> Self {
        DatabaseError::QueryFailed(err.to_string())
    }
}

impl From<serde_json::Error> for DatabaseError {
    fn from(err: serde_json::Error) -> Self {
        DatabaseError::JsonParseError(err.to_string())
    }
}

/// Wrapper around SQLite connection
pub struct Database {
    pub conn: Connection,
    pub path: Option<PathBuf>,
}

impl Database {
    /// Database file inside a data directory
    pub fn db_path(data_dir: &Path) -> PathBuf {
        data_dir.join("hooked.sqlite")
    }
}

/// Open or create the database file in `data_dir`
pub fn open_database(data_dir: &Path) -> Result<Database, DatabaseError> {
    std::fs::create_dir_all(data_dir)
        .map_err(|e| DatabaseError::ConnectionFailed(format!("Failed to create {:?}: {}", data_dir, e)))?;

    let db_path = Database::db_path(data_dir);
    info!("Opening database at {:?}", db_path);

    let conn = Connection::open(&db_path)
        .map_err(|e| DatabaseError::ConnectionFailed(e.to_string()))?;
    run_migrations(&conn)?;

    Ok(Database {
        conn,
        path: Some(db_path),
    })
}

/// Open a private in-memory database
pub fn open_in_memory() -> Result<Database, DatabaseError> {
    let conn = Connection::open_in_memory()
        .map_err(|e| DatabaseError::ConnectionFailed(e.to_string()))?;
    run_migrations(&conn)?;
    Ok(Database { conn, path: None })
}

fn run_migrations(conn: &Connection) -> Result<(), DatabaseError> {
    let current_version: i32 = conn
        .query_row(
            "SELECT version FROM schema_version ORDER BY version DESC LIMIT 1",
            [],
            |row| row.get(0),
        )
        .unwrap_or(0);

    if current_version < 1 {
        info!("Applying migration v1: Initial schema");
        conn.execute_batch(include_str!("schema.sql"))
            .map_err(|e| DatabaseError::MigrationFailed(format!("Failed to apply v1 schema: {}", e)))?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_open_new_database() {
        let dir = tempdir().unwrap();
        let result = open_database(dir.path());
        assert!(result.is_ok());

        let db_path = Database::db_path(dir.path());
        assert!(db_path.exists());
    }

    #[test]
    fn test_reopen_does_not_reapply_schema() {
        let dir = tempdir().unwrap();
        drop(open_database(dir.path()).unwrap());
        let db = open_database(dir.path()).unwrap();

        let versions: i64 = db
            .conn
            .query_row("SELECT COUNT(*) FROM schema_version", [], |row| row.get(0))
            .unwrap();
        assert_eq!(versions, 1);
    }

    #[test]
    fn test_in_memory_schema_version() {
        let db = open_in_memory().unwrap();
        let version: i32 = db
            .conn
            .query_row("SELECT version FROM schema_version", [], |row| row.get(0))
            .unwrap();
        assert_eq!(version, 1);
        assert!(db.path.is_none());
    }
}
