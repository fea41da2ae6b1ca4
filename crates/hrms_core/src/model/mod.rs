//! Domain model for the employee directory and the attendance ledger.
//!
//! # Invariants
//! - Every employee is identified by a stable, system-generated `EmployeeId`;
//!   the human-facing `employee_code` is a separate, caller-owned attribute.
//! - Attendance records are owned by their employee and keyed by
//!   `(employee_id, attendance_date)`.

pub mod attendance;
pub mod employee;
