//! Attendance ledger repository contracts and SQLite implementation.
//!
//! # Responsibility
//! - Store one status row per `(employee, date)` and expose keyed lookups.
//! - Surface storage constraint breaches as semantic errors.
//!
//! # Invariants
//! - The ledger never decides between insert and update; callers do.
//! - A second insert for an existing `(employee, date)` fails with
//!   `ConstraintViolation` instead of creating a duplicate.
//! - "No record" from `find_by_employee_and_date` is `Ok(None)`, not an error.
//! - Query results are ordered by `attendance_date ASC, employee_id ASC`.
//! - `update_status` always advances `updated_at`, even within one
//!   millisecond of the previous write.

use crate::model::attendance::{
    AttendanceFilter, AttendanceId, AttendanceMark, AttendanceRecord, AttendanceStatus,
};
use crate::model::employee::EmployeeId;
use crate::repo::{
    constraint_kind, ensure_connection_ready, now_epoch_ms, parse_uuid, ConstraintKind, RepoError,
    RepoResult,
};
use chrono::NaiveDate;
use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, Connection, Row};
use uuid::Uuid;

const ATTENDANCE_SELECT_SQL: &str = "SELECT
    id,
    employee_id,
    attendance_date,
    status,
    created_at,
    updated_at
FROM attendance";

/// Repository interface for the attendance ledger.
pub trait AttendanceRepository {
    /// Inserts a new record for a pair that has none yet.
    fn insert_attendance(&self, mark: &AttendanceMark) -> RepoResult<AttendanceRecord>;
    fn find_by_employee_and_date(
        &self,
        employee_id: EmployeeId,
        attendance_date: NaiveDate,
    ) -> RepoResult<Option<AttendanceRecord>>;
    fn get_attendance(&self, id: AttendanceId) -> RepoResult<Option<AttendanceRecord>>;
    /// Changes status in place and refreshes `updated_at`.
    fn update_status(
        &self,
        id: AttendanceId,
        status: AttendanceStatus,
    ) -> RepoResult<AttendanceRecord>;
    /// Streams matching records to `visit` one row at a time.
    ///
    /// An error returned by `visit` stops iteration and is propagated.
    fn for_each_attendance(
        &self,
        filter: &AttendanceFilter,
        visit: &mut dyn FnMut(AttendanceRecord) -> RepoResult<()>,
    ) -> RepoResult<()>;

    /// Collects matching records.
    fn query_attendance(&self, filter: &AttendanceFilter) -> RepoResult<Vec<AttendanceRecord>> {
        let mut records = Vec::new();
        self.for_each_attendance(filter, &mut |record| {
            records.push(record);
            Ok(())
        })?;
        Ok(records)
    }
}

/// SQLite-backed attendance ledger.
pub struct SqliteAttendanceRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteAttendanceRepository<'conn> {
    /// Creates a repository from a migrated connection.
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        ensure_connection_ready(conn, &["employees", "attendance"])?;
        Ok(Self { conn })
    }

    /// Wraps a connection (or open transaction) already verified by the
    /// caller.
    pub(crate) fn within(conn: &'conn Connection) -> Self {
        Self { conn }
    }
}

impl AttendanceRepository for SqliteAttendanceRepository<'_> {
    fn insert_attendance(&self, mark: &AttendanceMark) -> RepoResult<AttendanceRecord> {
        let id = Uuid::now_v7();

        self.conn
            .execute(
                "INSERT INTO attendance (
                    id,
                    employee_id,
                    attendance_date,
                    status,
                    created_at,
                    updated_at
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?5);",
                params![
                    id.to_string(),
                    mark.employee_id.to_string(),
                    mark.attendance_date,
                    mark.status.as_str(),
                    now_epoch_ms(),
                ],
            )
            .map_err(|err| match constraint_kind(&err) {
                Some(ConstraintKind::ForeignKey) => RepoError::EmployeeNotFound(mark.employee_id),
                Some(ConstraintKind::Unique(detail))
                | Some(ConstraintKind::Check(detail))
                | Some(ConstraintKind::Other(detail)) => RepoError::ConstraintViolation(detail),
                None => RepoError::from(err),
            })?;

        self.get_attendance(id)?
            .ok_or(RepoError::AttendanceNotFound(id))
    }

    fn find_by_employee_and_date(
        &self,
        employee_id: EmployeeId,
        attendance_date: NaiveDate,
    ) -> RepoResult<Option<AttendanceRecord>> {
        let mut stmt = self.conn.prepare(&format!(
            "{ATTENDANCE_SELECT_SQL}
             WHERE employee_id = ?1
               AND attendance_date = ?2;"
        ))?;
        let mut rows = stmt.query(params![employee_id.to_string(), attendance_date])?;
        if let Some(row) = rows.next()? {
            return Ok(Some(parse_attendance_row(row)?));
        }
        Ok(None)
    }

    fn get_attendance(&self, id: AttendanceId) -> RepoResult<Option<AttendanceRecord>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{ATTENDANCE_SELECT_SQL} WHERE id = ?1;"))?;
        let mut rows = stmt.query([id.to_string()])?;
        if let Some(row) = rows.next()? {
            return Ok(Some(parse_attendance_row(row)?));
        }
        Ok(None)
    }

    fn update_status(
        &self,
        id: AttendanceId,
        status: AttendanceStatus,
    ) -> RepoResult<AttendanceRecord> {
        let changed = self.conn.execute(
            "UPDATE attendance
             SET
                status = ?2,
                updated_at = max(?3, updated_at + 1)
             WHERE id = ?1;",
            params![id.to_string(), status.as_str(), now_epoch_ms()],
        )?;

        if changed == 0 {
            return Err(RepoError::AttendanceNotFound(id));
        }

        self.get_attendance(id)?
            .ok_or(RepoError::AttendanceNotFound(id))
    }

    fn for_each_attendance(
        &self,
        filter: &AttendanceFilter,
        visit: &mut dyn FnMut(AttendanceRecord) -> RepoResult<()>,
    ) -> RepoResult<()> {
        let mut sql = format!("{ATTENDANCE_SELECT_SQL} WHERE 1 = 1");
        let mut bind_values: Vec<Value> = Vec::new();

        if let Some(attendance_date) = filter.attendance_date {
            sql.push_str(" AND attendance_date = ?");
            bind_values.push(Value::Text(attendance_date.format("%F").to_string()));
        }

        if let Some(employee_id) = filter.employee_id {
            sql.push_str(" AND employee_id = ?");
            bind_values.push(Value::Text(employee_id.to_string()));
        }

        sql.push_str(" ORDER BY attendance_date ASC, employee_id ASC");

        let mut stmt = self.conn.prepare(&sql)?;
        let mut rows = stmt.query(params_from_iter(bind_values))?;
        while let Some(row) = rows.next()? {
            visit(parse_attendance_row(row)?)?;
        }

        Ok(())
    }
}

fn parse_attendance_row(row: &Row<'_>) -> RepoResult<AttendanceRecord> {
    let id_text: String = row.get("id")?;
    let employee_text: String = row.get("employee_id")?;

    let status_text: String = row.get("status")?;
    let status = status_text.parse::<AttendanceStatus>().map_err(|_| {
        RepoError::InvalidData(format!(
            "invalid status `{status_text}` in attendance.status"
        ))
    })?;

    Ok(AttendanceRecord {
        id: parse_uuid(&id_text, "attendance.id")?,
        employee_id: parse_uuid(&employee_text, "attendance.employee_id")?,
        attendance_date: row.get("attendance_date")?,
        status,
        created_at: row.get("created_at")?,
        updated_at: row.get("updated_at")?,
    })
}
