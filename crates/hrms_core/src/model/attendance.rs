//! Attendance domain model.
//!
//! # Responsibility
//! - Define the ledger record, its closed status set and write/read inputs.
//! - Define the per-date employee roster view and its summary.
//!
//! # Invariants
//! - `status` is exactly one of `Present | Absent`; any other text is rejected.
//! - At most one record exists per `(employee_id, attendance_date)`.

use crate::model::employee::{Employee, EmployeeId};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::str::FromStr;
use uuid::Uuid;

/// Opaque internal attendance record identifier.
pub type AttendanceId = Uuid;

/// Closed attendance status set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AttendanceStatus {
    Present,
    Absent,
}

impl AttendanceStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Present => "Present",
            Self::Absent => "Absent",
        }
    }
}

impl Display for AttendanceStatus {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AttendanceStatus {
    type Err = InvalidStatus;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "Present" => Ok(Self::Present),
            "Absent" => Ok(Self::Absent),
            other => Err(InvalidStatus(other.to_string())),
        }
    }
}

/// Status text outside the closed `Present | Absent` set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvalidStatus(pub String);

impl Display for InvalidStatus {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "invalid attendance status `{}`; expected Present|Absent",
            self.0
        )
    }
}

impl Error for InvalidStatus {}

/// One persisted ledger row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttendanceRecord {
    pub id: AttendanceId,
    /// Owning employee.
    pub employee_id: EmployeeId,
    pub attendance_date: NaiveDate,
    pub status: AttendanceStatus,
    /// Epoch milliseconds.
    pub created_at: i64,
    /// Epoch milliseconds. Refreshed on every status change.
    pub updated_at: i64,
}

/// Write request for one `(employee, date)` status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttendanceMark {
    pub employee_id: EmployeeId,
    pub attendance_date: NaiveDate,
    pub status: AttendanceStatus,
}

impl AttendanceMark {
    pub fn new(
        employee_id: EmployeeId,
        attendance_date: NaiveDate,
        status: AttendanceStatus,
    ) -> Self {
        Self {
            employee_id,
            attendance_date,
            status,
        }
    }

    /// Builds a request from raw status text, rejecting unknown statuses.
    pub fn parse(
        employee_id: EmployeeId,
        attendance_date: NaiveDate,
        status: &str,
    ) -> Result<Self, InvalidStatus> {
        Ok(Self::new(employee_id, attendance_date, status.parse()?))
    }
}

/// Optional ledger filters. Both `None` means every record.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AttendanceFilter {
    pub attendance_date: Option<NaiveDate>,
    pub employee_id: Option<EmployeeId>,
}

impl AttendanceFilter {
    pub fn on_date(attendance_date: NaiveDate) -> Self {
        Self {
            attendance_date: Some(attendance_date),
            employee_id: None,
        }
    }

    pub fn for_employee(employee_id: EmployeeId) -> Self {
        Self {
            attendance_date: None,
            employee_id: Some(employee_id),
        }
    }
}

/// Employee attributes joined with the attendance recorded for one date.
///
/// `attendance` is a list so the shape survives if multiple records per day
/// are ever allowed; today it holds zero or one entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmployeeWithAttendance {
    #[serde(flatten)]
    pub employee: Employee,
    pub attendance: Vec<AttendanceRecord>,
}

impl EmployeeWithAttendance {
    /// Status recorded for the view date, if any.
    pub fn status(&self) -> Option<AttendanceStatus> {
        self.attendance.first().map(|record| record.status)
    }
}

/// Head counts for one date. Every employee lands in exactly one bucket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DailyAttendanceSummary {
    pub attendance_date: NaiveDate,
    pub total: usize,
    pub present: usize,
    pub absent: usize,
    pub not_marked: usize,
}

impl DailyAttendanceSummary {
    pub fn from_roster(attendance_date: NaiveDate, roster: &[EmployeeWithAttendance]) -> Self {
        let mut summary = Self {
            attendance_date,
            total: roster.len(),
            present: 0,
            absent: 0,
            not_marked: 0,
        };
        for entry in roster {
            match entry.status() {
                Some(AttendanceStatus::Present) => summary.present += 1,
                Some(AttendanceStatus::Absent) => summary.absent += 1,
                None => summary.not_marked += 1,
            }
        }
        summary
    }
}
