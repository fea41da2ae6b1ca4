//! Core domain logic for the HR attendance system.
//! This crate is the single source of truth for directory and ledger
//! invariants.

pub mod config;
pub mod db;
pub mod logging;
pub mod model;
pub mod repo;
pub mod service;

pub use config::{ConfigError, CoreConfig};
pub use logging::{default_log_level, init_logging, logging_status, LoggingError};
pub use model::attendance::{
    AttendanceFilter, AttendanceId, AttendanceMark, AttendanceRecord, AttendanceStatus,
    DailyAttendanceSummary, EmployeeWithAttendance, InvalidStatus,
};
pub use model::employee::{
    Employee, EmployeeChanges, EmployeeField, EmployeeId, EmployeeListQuery, EmployeeOrderField,
    EmployeeValidationError, IdentifierKind, NewEmployee, SortDirection,
};
pub use repo::attendance_repo::{AttendanceRepository, SqliteAttendanceRepository};
pub use repo::employee_repo::{EmployeeRepository, SqliteEmployeeRepository};
pub use repo::{RepoError, RepoResult};
pub use service::attendance_service::{AttendanceService, AttendanceServiceError};
pub use service::employee_service::{EmployeeService, EmployeeServiceError};

/// Minimal health-check API.
pub fn ping() -> &'static str {
    "pong"
}

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::{core_version, ping};

    #[test]
    fn ping_returns_pong() {
        assert_eq!(ping(), "pong");
    }

    #[test]
    fn version_is_not_empty() {
        assert!(!core_version().is_empty());
    }
}
