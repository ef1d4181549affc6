use std::env;
use std::fs;
use std::path::PathBuf;

use rusqlite::Connection;

use crate::error::FmsError;

use super::migrations;

pub const DATA_DIR: &str = ".fms";

/// Find the directory holding `.fms` by walking up from the current directory.
pub fn find_root() -> Result<PathBuf, FmsError> {
    let mut dir = env::current_dir().map_err(|e| FmsError::database(e.to_string()))?;
    loop {
        if dir.join(DATA_DIR).is_dir() {
            return Ok(dir);
        }
        if !dir.pop() {
            return Err(FmsError::not_initialized());
        }
    }
}

/// Get the path to the fms database.
pub fn db_path() -> Result<PathBuf, FmsError> {
    Ok(find_root()?.join(DATA_DIR).join("fms.db"))
}

/// Get the config file path.
pub fn config_path() -> Result<PathBuf, FmsError> {
    Ok(find_root()?.join(DATA_DIR).join("config.json"))
}

/// Open a connection to the database. Returns error if not initialized.
pub fn open_db() -> Result<Connection, FmsError> {
    let path = db_path()?;
    if !path.exists() {
        return Err(FmsError::not_initialized());
    }
    let conn = Connection::open(&path)?;
    configure_connection(&conn)?;
    Ok(conn)
}

/// Initialize `.fms/` in the current directory: database, migrations, config.
pub fn init_db() -> Result<PathBuf, FmsError> {
    let dir = env::current_dir()
        .map_err(|e| FmsError::database(e.to_string()))?
        .join(DATA_DIR);
    fs::create_dir_all(&dir).map_err(|e| FmsError::database(e.to_string()))?;
    let path = dir.join("fms.db");
    let conn = Connection::open(&path)?;
    configure_connection(&conn)?;
    migrations::run_migrations(&conn)?;
    Ok(path)
}

/// In-memory database with the full schema.
pub fn open_in_memory() -> Result<Connection, FmsError> {
    let conn = Connection::open_in_memory()?;
    conn.execute_batch("PRAGMA foreign_keys=ON;")?;
    migrations::run_migrations(&conn)?;
    Ok(conn)
}

fn configure_connection(conn: &Connection) -> Result<(), FmsError> {
    conn.execute_batch(
        "PRAGMA journal_mode=WAL;
         PRAGMA busy_timeout=5000;
         PRAGMA foreign_keys=ON;",
    )?;
    Ok(())
}

/// Run `f` inside `BEGIN IMMEDIATE`; commit on success, roll back on error.
pub fn with_transaction<T>(
    conn: &Connection,
    f: impl FnOnce() -> Result<T, FmsError>,
) -> Result<T, FmsError> {
    conn.execute_batch("BEGIN IMMEDIATE")?;
    match f() {
        Ok(value) => {
            conn.execute_batch("COMMIT")?;
            Ok(value)
        }
        Err(e) => {
            let _ = conn.execute_batch("ROLLBACK");
            Err(e)
        }
    }
}
