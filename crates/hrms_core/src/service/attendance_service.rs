//! Attendance reconciliation service.
//!
//! # Responsibility
//! - Upsert one status per `(employee, date)`, singly or in batches.
//! - Join the directory with one day of attendance.
//!
//! # Invariants
//! - Every upsert runs in an IMMEDIATE transaction: the write lock is taken
//!   before the existence check, so two writers for the same pair cannot
//!   both observe "no record" and both insert.
//! - Single marks fail on an unknown employee; batch marks skip unknown
//!   employees silently and keep going.
//! - A batch commits all surviving entries or none.
//! - The day view has exactly one entry per employee, ordered by
//!   `full_name ASC, id ASC`.
//! - Nothing is cached between calls.

use crate::model::attendance::{
    AttendanceFilter, AttendanceMark, AttendanceRecord, DailyAttendanceSummary,
    EmployeeWithAttendance, InvalidStatus,
};
use crate::model::employee::{
    EmployeeId, EmployeeListQuery, EmployeeOrderField, SortDirection,
};
use crate::repo::attendance_repo::{AttendanceRepository, SqliteAttendanceRepository};
use crate::repo::employee_repo::{EmployeeRepository, SqliteEmployeeRepository};
use crate::repo::{ensure_connection_ready, RepoError, RepoResult};
use chrono::NaiveDate;
use log::{debug, error, info};
use rusqlite::{Connection, TransactionBehavior};
use std::collections::HashMap;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::time::Instant;

/// Errors from attendance reconciliation.
#[derive(Debug)]
pub enum AttendanceServiceError {
    /// Single mark referenced an employee that does not exist.
    EmployeeNotFound(EmployeeId),
    /// Batch mark called with no entries.
    EmptyBatch,
    InvalidStatus(InvalidStatus),
    /// Storage rejected the write; the transaction was rolled back.
    ConstraintViolation(String),
    Repo(RepoError),
    /// Write succeeded but read-back did not find the row.
    InconsistentState(&'static str),
}

impl Display for AttendanceServiceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EmployeeNotFound(id) => write!(f, "employee not found: {id}"),
            Self::EmptyBatch => write!(f, "no attendance records provided"),
            Self::InvalidStatus(err) => write!(f, "{err}"),
            Self::ConstraintViolation(detail) => {
                write!(f, "attendance write rejected: {detail}")
            }
            Self::Repo(err) => write!(f, "{err}"),
            Self::InconsistentState(details) => {
                write!(f, "inconsistent attendance state: {details}")
            }
        }
    }
}

impl Error for AttendanceServiceError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::InvalidStatus(err) => Some(err),
            Self::Repo(err) => Some(err),
            _ => None,
        }
    }
}

impl From<InvalidStatus> for AttendanceServiceError {
    fn from(value: InvalidStatus) -> Self {
        Self::InvalidStatus(value)
    }
}

impl From<RepoError> for AttendanceServiceError {
    fn from(value: RepoError) -> Self {
        match value {
            RepoError::EmployeeNotFound(id) => Self::EmployeeNotFound(id),
            RepoError::ConstraintViolation(detail) => Self::ConstraintViolation(detail),
            other => Self::Repo(other),
        }
    }
}

impl From<rusqlite::Error> for AttendanceServiceError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Repo(RepoError::from(value))
    }
}

/// Whether an upsert created a row or changed an existing one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum UpsertOutcome {
    Inserted,
    Updated,
}

impl UpsertOutcome {
    fn as_str(self) -> &'static str {
        match self {
            Self::Inserted => "inserted",
            Self::Updated => "updated",
        }
    }
}

/// Attendance reconciler over one SQLite connection.
///
/// Holds the connection mutably because every write opens its own
/// transaction on it.
pub struct AttendanceService<'conn> {
    conn: &'conn mut Connection,
}

impl<'conn> AttendanceService<'conn> {
    /// Creates the service from a migrated connection.
    pub fn try_new(conn: &'conn mut Connection) -> RepoResult<Self> {
        ensure_connection_ready(conn, &["employees", "attendance"])?;
        Ok(Self { conn })
    }

    /// Records `mark.status` for `(mark.employee_id, mark.attendance_date)`.
    ///
    /// Updates the existing record in place when one exists, otherwise
    /// inserts. Returns the record as committed.
    ///
    /// # Errors
    /// - `EmployeeNotFound` when the employee does not resolve.
    /// - `ConstraintViolation` when storage rejects the write; nothing is
    ///   persisted and the call is not retried.
    pub fn mark_attendance(
        &mut self,
        mark: &AttendanceMark,
    ) -> Result<AttendanceRecord, AttendanceServiceError> {
        let started_at = Instant::now();
        let result = self.mark_attendance_in_tx(mark);
        match &result {
            Ok((record, outcome)) => info!(
                "event=attendance_mark module=reconciler status=ok outcome={} attendance_id={} employee_id={} duration_ms={}",
                outcome.as_str(),
                record.id,
                record.employee_id,
                started_at.elapsed().as_millis()
            ),
            Err(err) => error!(
                "event=attendance_mark module=reconciler status=error employee_id={} duration_ms={} error={err}",
                mark.employee_id,
                started_at.elapsed().as_millis()
            ),
        }
        result.map(|(record, _)| record)
    }

    fn mark_attendance_in_tx(
        &mut self,
        mark: &AttendanceMark,
    ) -> Result<(AttendanceRecord, UpsertOutcome), AttendanceServiceError> {
        // Why: a DEFERRED transaction only takes the write lock at the first
        // write, so two connections could both read "no record" and race to
        // insert. IMMEDIATE makes the find-then-write pair one critical section.
        let tx = self
            .conn
            .transaction_with_behavior(TransactionBehavior::Immediate)?;
        let upserted = {
            let directory = SqliteEmployeeRepository::within(&tx);
            if !directory.employee_exists(mark.employee_id)? {
                return Err(AttendanceServiceError::EmployeeNotFound(mark.employee_id));
            }
            upsert(&SqliteAttendanceRepository::within(&tx), mark)?
        };
        tx.commit()?;
        Ok(upserted)
    }

    /// Records many statuses in one transaction.
    ///
    /// Entries whose employee does not resolve are dropped without error.
    /// The rest are upserted in input order and returned in that order,
    /// each reflecting the committed row. A storage failure rolls back the
    /// whole batch.
    ///
    /// # Errors
    /// - `EmptyBatch` when `marks` is empty; storage is not touched.
    pub fn mark_attendance_bulk(
        &mut self,
        marks: &[AttendanceMark],
    ) -> Result<Vec<AttendanceRecord>, AttendanceServiceError> {
        if marks.is_empty() {
            return Err(AttendanceServiceError::EmptyBatch);
        }

        let started_at = Instant::now();
        let result = self.mark_attendance_bulk_in_tx(marks);
        match &result {
            Ok(records) => info!(
                "event=attendance_mark_bulk module=reconciler status=ok requested={} written={} skipped={} duration_ms={}",
                marks.len(),
                records.len(),
                marks.len() - records.len(),
                started_at.elapsed().as_millis()
            ),
            Err(err) => error!(
                "event=attendance_mark_bulk module=reconciler status=error requested={} duration_ms={} error={err}",
                marks.len(),
                started_at.elapsed().as_millis()
            ),
        }
        result
    }

    fn mark_attendance_bulk_in_tx(
        &mut self,
        marks: &[AttendanceMark],
    ) -> Result<Vec<AttendanceRecord>, AttendanceServiceError> {
        // Same locking as single marks; the whole batch is one critical section.
        let tx = self
            .conn
            .transaction_with_behavior(TransactionBehavior::Immediate)?;
        let records = {
            let directory = SqliteEmployeeRepository::within(&tx);
            let ledger = SqliteAttendanceRepository::within(&tx);

            let mut written = Vec::with_capacity(marks.len());
            for mark in marks {
                if !directory.employee_exists(mark.employee_id)? {
                    debug!(
                        "event=attendance_mark_bulk module=reconciler status=skip reason=employee_not_found employee_id={}",
                        mark.employee_id
                    );
                    continue;
                }
                let (record, _) = upsert(&ledger, mark)?;
                written.push(record.id);
            }

            // Re-read so repeated pairs in one batch all show the final state.
            let mut records = Vec::with_capacity(written.len());
            for id in written {
                let record = ledger
                    .get_attendance(id)?
                    .ok_or(AttendanceServiceError::InconsistentState(
                        "batch record missing in read-back",
                    ))?;
                records.push(record);
            }
            records
        };
        tx.commit()?;
        Ok(records)
    }

    /// Lists ledger records matching the optional date/employee filters.
    pub fn query(
        &self,
        filter: &AttendanceFilter,
    ) -> Result<Vec<AttendanceRecord>, AttendanceServiceError> {
        Ok(SqliteAttendanceRepository::within(&*self.conn).query_attendance(filter)?)
    }

    /// Returns every employee, in name order, with the records kept for
    /// `attendance_date`. Employees without a record get an empty list.
    pub fn employees_with_attendance(
        &self,
        attendance_date: NaiveDate,
    ) -> Result<Vec<EmployeeWithAttendance>, AttendanceServiceError> {
        let directory = SqliteEmployeeRepository::within(&*self.conn);
        let ledger = SqliteAttendanceRepository::within(&*self.conn);

        let employees = directory.list_employees(&EmployeeListQuery {
            order_by: EmployeeOrderField::FullName,
            direction: SortDirection::Asc,
        })?;

        let mut by_employee: HashMap<EmployeeId, Vec<AttendanceRecord>> = HashMap::new();
        ledger.for_each_attendance(&AttendanceFilter::on_date(attendance_date), &mut |record| {
            by_employee
                .entry(record.employee_id)
                .or_default()
                .push(record);
            Ok(())
        })?;

        Ok(employees
            .into_iter()
            .map(|employee| {
                let attendance = by_employee.remove(&employee.id).unwrap_or_default();
                EmployeeWithAttendance {
                    employee,
                    attendance,
                }
            })
            .collect())
    }

    /// Present/absent/unmarked head counts for one date.
    pub fn daily_summary(
        &self,
        attendance_date: NaiveDate,
    ) -> Result<DailyAttendanceSummary, AttendanceServiceError> {
        let roster = self.employees_with_attendance(attendance_date)?;
        Ok(DailyAttendanceSummary::from_roster(attendance_date, &roster))
    }
}

/// Applies the insert-or-update decision for one mark.
///
/// Must run inside a transaction that already holds the write lock.
fn upsert<L: AttendanceRepository>(
    ledger: &L,
    mark: &AttendanceMark,
) -> RepoResult<(AttendanceRecord, UpsertOutcome)> {
    match ledger.find_by_employee_and_date(mark.employee_id, mark.attendance_date)? {
        Some(existing) => Ok((
            ledger.update_status(existing.id, mark.status)?,
            UpsertOutcome::Updated,
        )),
        None => Ok((ledger.insert_attendance(mark)?, UpsertOutcome::Inserted)),
    }
}
