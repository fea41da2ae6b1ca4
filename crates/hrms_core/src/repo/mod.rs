//! Repository layer abstractions and persistence implementations.
//!
//! # Responsibility
//! - Define use-case oriented data access contracts for the directory and
//!   the attendance ledger.
//! - Isolate SQLite query details from service orchestration.
//! - Translate SQLite constraint failures into semantic errors.
//!
//! # Invariants
//! - Repositories refuse connections whose schema is not fully migrated.
//! - Storage-level uniqueness is the backstop for application-level checks.
//! - Row ids are UUIDv7, so `id` order follows creation order within a
//!   process even when two rows share a millisecond.

use crate::db::migrations::{current_user_version, latest_version};
use crate::db::DbError;
use crate::model::attendance::AttendanceId;
use crate::model::employee::{EmployeeId, EmployeeValidationError, IdentifierKind};
use chrono::Utc;
use rusqlite::{ffi, Connection, ErrorCode};
use std::error::Error;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

pub mod attendance_repo;
pub mod employee_repo;

pub type RepoResult<T> = Result<T, RepoError>;

/// Storage-layer error shared by directory and ledger repositories.
#[derive(Debug)]
pub enum RepoError {
    Db(DbError),
    Validation(EmployeeValidationError),
    EmployeeNotFound(EmployeeId),
    AttendanceNotFound(AttendanceId),
    /// Unique employee code or email already taken.
    DuplicateIdentifier(IdentifierKind),
    /// Any other storage constraint breach, e.g. a second row for the same
    /// `(employee, date)`.
    ConstraintViolation(String),
    /// Connection schema is not at the expected migrated version.
    UninitializedConnection {
        expected_version: u32,
        actual_version: u32,
    },
    MissingRequiredTable(&'static str),
    /// Persisted row cannot be decoded into a valid domain record.
    InvalidData(String),
}

impl Display for RepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Db(err) => write!(f, "{err}"),
            Self::Validation(err) => write!(f, "{err}"),
            Self::EmployeeNotFound(id) => write!(f, "employee not found: {id}"),
            Self::AttendanceNotFound(id) => write!(f, "attendance record not found: {id}"),
            Self::DuplicateIdentifier(kind) => {
                write!(f, "an employee with this {kind} already exists")
            }
            Self::ConstraintViolation(detail) => write!(f, "constraint violation: {detail}"),
            Self::UninitializedConnection {
                expected_version,
                actual_version,
            } => write!(
                f,
                "repository requires schema version {expected_version}, got {actual_version}"
            ),
            Self::MissingRequiredTable(table) => {
                write!(f, "repository requires table `{table}`")
            }
            Self::InvalidData(message) => write!(f, "invalid persisted data: {message}"),
        }
    }
}

impl Error for RepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Db(err) => Some(err),
            Self::Validation(err) => Some(err),
            _ => None,
        }
    }
}

impl From<DbError> for RepoError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for RepoError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

impl From<EmployeeValidationError> for RepoError {
    fn from(value: EmployeeValidationError) -> Self {
        Self::Validation(value)
    }
}

/// Kind of SQLite constraint that rejected a write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum ConstraintKind {
    Unique(String),
    ForeignKey,
    Check(String),
    Other(String),
}

/// Classifies a SQLite error as a constraint failure, if it is one.
pub(crate) fn constraint_kind(err: &rusqlite::Error) -> Option<ConstraintKind> {
    let rusqlite::Error::SqliteFailure(failure, message) = err else {
        return None;
    };
    if failure.code != ErrorCode::ConstraintViolation {
        return None;
    }

    let detail = message.clone().unwrap_or_else(|| failure.to_string());
    let kind = match failure.extended_code {
        ffi::SQLITE_CONSTRAINT_UNIQUE | ffi::SQLITE_CONSTRAINT_PRIMARYKEY => {
            ConstraintKind::Unique(detail)
        }
        ffi::SQLITE_CONSTRAINT_FOREIGNKEY => ConstraintKind::ForeignKey,
        ffi::SQLITE_CONSTRAINT_CHECK => ConstraintKind::Check(detail),
        _ => ConstraintKind::Other(detail),
    };
    Some(kind)
}

/// Verifies schema version and required tables before a repository is handed
/// out.
pub(crate) fn ensure_connection_ready(
    conn: &Connection,
    tables: &[&'static str],
) -> RepoResult<()> {
    let expected_version = latest_version();
    let actual_version = current_user_version(conn)?;
    if actual_version != expected_version {
        return Err(RepoError::UninitializedConnection {
            expected_version,
            actual_version,
        });
    }

    for &table in tables {
        if !table_exists(conn, table)? {
            return Err(RepoError::MissingRequiredTable(table));
        }
    }

    Ok(())
}

fn table_exists(conn: &Connection, table: &str) -> RepoResult<bool> {
    let exists: i64 = conn.query_row(
        "SELECT EXISTS(
            SELECT 1
            FROM sqlite_master
            WHERE type = 'table' AND name = ?1
        );",
        [table],
        |row| row.get(0),
    )?;
    Ok(exists == 1)
}

/// Wall-clock time in epoch milliseconds, the unit of every `*_at` column.
pub(crate) fn now_epoch_ms() -> i64 {
    Utc::now().timestamp_millis()
}

pub(crate) fn parse_uuid(value: &str, column: &str) -> RepoResult<Uuid> {
    Uuid::parse_str(value)
        .map_err(|_| RepoError::InvalidData(format!("invalid uuid value `{value}` in {column}")))
}
