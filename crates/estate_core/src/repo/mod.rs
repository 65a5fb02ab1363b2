//! Repository layer: location/property stores and the relationship maintainer.
//!
//! # Responsibility
//! - Define use-case oriented data access contracts for both stores.
//! - Keep SQLite query details away from services and the HTTP layer.
//! - Apply every two-sided reference change inside one write transaction.
//!
//! # Invariants
//! - Write paths validate input before any SQL mutation.
//! - Every mutation holds SQLite's write lock (`BEGIN IMMEDIATE`) from its
//!   first read to commit, so reference updates never interleave.
//! - Multi-query reads run inside one read transaction and observe a single
//!   committed snapshot.

use crate::db::DbError;
use crate::model::location::LocationId;
use crate::model::property::PropertyId;
use crate::model::validation::ValidationError;
use rusqlite::ErrorCode;
use serde::Serialize;
use std::error::Error;
use std::fmt::{Display, Formatter};

pub mod location_repo;
pub mod property_repo;
pub mod relation;
mod rows;

pub type RepoResult<T> = Result<T, RepoError>;

/// Client-facing error category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ErrorKind {
    NotFound,
    DuplicateKey,
    DanglingReference,
    ValidationError,
    ConcurrentModification,
    Internal,
}

impl ErrorKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::NotFound => "NotFound",
            Self::DuplicateKey => "DuplicateKey",
            Self::DanglingReference => "DanglingReference",
            Self::ValidationError => "ValidationError",
            Self::ConcurrentModification => "ConcurrentModification",
            Self::Internal => "Internal",
        }
    }
}

/// Error for store, maintainer and service operations.
#[derive(Debug)]
pub enum RepoError {
    /// Input failed field-level validation.
    Validation(ValidationError),
    /// Underlying SQLite/bootstrap error.
    Db(DbError),
    /// Target location does not exist.
    LocationNotFound(LocationId),
    /// Target property does not exist.
    PropertyNotFound(PropertyId),
    /// Another location already uses this city name.
    DuplicateCityName(String),
    /// A property would reference a location that does not exist.
    DanglingReference(LocationId),
    /// A concurrent writer changed the records or held the write lock.
    ConcurrentModification(String),
    /// Connection schema is not at the expected migrated version.
    UninitializedConnection {
        expected_version: u32,
        actual_version: u32,
    },
    /// Persisted data cannot be converted to a valid record.
    InvalidData(String),
}

impl RepoError {
    /// Category reported to clients.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Validation(_) => ErrorKind::ValidationError,
            Self::LocationNotFound(_) | Self::PropertyNotFound(_) => ErrorKind::NotFound,
            Self::DuplicateCityName(_) => ErrorKind::DuplicateKey,
            Self::DanglingReference(_) => ErrorKind::DanglingReference,
            Self::ConcurrentModification(_) => ErrorKind::ConcurrentModification,
            Self::Db(_) | Self::UninitializedConnection { .. } | Self::InvalidData(_) => {
                ErrorKind::Internal
            }
        }
    }

    /// Whether one internal retry with fresh reads may succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::ConcurrentModification(_))
    }
}

impl Display for RepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Validation(err) => write!(f, "{err}"),
            Self::Db(err) => write!(f, "{err}"),
            Self::LocationNotFound(id) => write!(f, "location not found: {id}"),
            Self::PropertyNotFound(id) => write!(f, "property not found: {id}"),
            Self::DuplicateCityName(name) => {
                write!(f, "a location with cityName `{name}` already exists")
            }
            Self::DanglingReference(id) => {
                write!(f, "referenced location does not exist: {id}")
            }
            Self::ConcurrentModification(message) => {
                write!(f, "concurrent modification: {message}")
            }
            Self::UninitializedConnection {
                expected_version,
                actual_version,
            } => write!(
                f,
                "listing repository requires schema version {expected_version}, got {actual_version}"
            ),
            Self::InvalidData(message) => write!(f, "invalid persisted listing data: {message}"),
        }
    }
}

impl Error for RepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Validation(err) => Some(err),
            Self::Db(err) => Some(err),
            _ => None,
        }
    }
}

impl From<ValidationError> for RepoError {
    fn from(value: ValidationError) -> Self {
        Self::Validation(value)
    }
}

impl From<DbError> for RepoError {
    fn from(value: DbError) -> Self {
        match value {
            DbError::Sqlite(err) => err.into(),
            other => Self::Db(other),
        }
    }
}

impl From<rusqlite::Error> for RepoError {
    fn from(value: rusqlite::Error) -> Self {
        match value.sqlite_error_code() {
            Some(ErrorCode::DatabaseBusy | ErrorCode::DatabaseLocked) => {
                Self::ConcurrentModification(format!("write lock unavailable: {value}"))
            }
            _ => Self::Db(DbError::Sqlite(value)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{ErrorKind, RepoError};
    use crate::model::validation::ValidationError;
    use rusqlite::ffi;
    use uuid::Uuid;

    #[test]
    fn kinds_follow_error_taxonomy() {
        let id = Uuid::new_v4();
        assert_eq!(RepoError::LocationNotFound(id).kind(), ErrorKind::NotFound);
        assert_eq!(RepoError::PropertyNotFound(id).kind(), ErrorKind::NotFound);
        assert_eq!(
            RepoError::DuplicateCityName("Pune".to_string()).kind(),
            ErrorKind::DuplicateKey
        );
        assert_eq!(
            RepoError::DanglingReference(id).kind(),
            ErrorKind::DanglingReference
        );
        assert_eq!(
            RepoError::from(ValidationError::BlankCityName).kind(),
            ErrorKind::ValidationError
        );
        assert_eq!(
            RepoError::InvalidData("bad".to_string()).kind(),
            ErrorKind::Internal
        );
    }

    #[test]
    fn busy_sqlite_error_maps_to_retryable_concurrent_modification() {
        let busy = rusqlite::Error::SqliteFailure(ffi::Error::new(ffi::SQLITE_BUSY), None);
        let err = RepoError::from(busy);
        assert_eq!(err.kind(), ErrorKind::ConcurrentModification);
        assert!(err.is_retryable());

        let other = rusqlite::Error::SqliteFailure(ffi::Error::new(ffi::SQLITE_CORRUPT), None);
        let err = RepoError::from(other);
        assert_eq!(err.kind(), ErrorKind::Internal);
        assert!(!err.is_retryable());
    }
}
