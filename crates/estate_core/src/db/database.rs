//! Process-wide database handle.
//!
//! # Responsibility
//! - Run migrations exactly once at startup (`Database::init`).
//! - Hand out configured per-request connections without re-migrating.
//!
//! # Invariants
//! - A `Database` only exists for a file whose schema was migrated by `init`.
//! - `connect` never changes the schema; a drifted version is an error.

use super::migrations::{current_user_version, latest_version};
use super::open::{open_db, open_file_without_migrations};
use super::{DbError, DbResult};
use log::info;
use rusqlite::Connection;
use std::path::{Path, PathBuf};

/// Shared handle to the listing database file.
///
/// Cheap to share behind an `Arc`; every caller gets its own connection so
/// readers proceed in parallel while writers serialise on SQLite's lock.
#[derive(Debug, Clone)]
pub struct Database {
    path: PathBuf,
}

impl Database {
    /// Opens (creating if needed) and migrates the database at `path`.
    pub fn init(path: impl Into<PathBuf>) -> DbResult<Self> {
        let path = path.into();
        let conn = open_db(&path)?;
        let version = current_user_version(&conn)?;
        drop(conn);

        info!(
            "event=db_init module=db status=ok path={} schema_version={}",
            path.display(),
            version
        );
        Ok(Self { path })
    }

    /// Returns the database file path.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Opens a fresh connection to the already migrated database.
    pub fn connect(&self) -> DbResult<Connection> {
        let conn = open_file_without_migrations(&self.path)?;
        let db_version = current_user_version(&conn)?;
        let expected = latest_version();
        if db_version != expected {
            return Err(DbError::SchemaNotCurrent {
                db_version,
                expected,
            });
        }
        Ok(conn)
    }
}
