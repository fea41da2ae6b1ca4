//! Employee directory repository contracts and SQLite implementation.
//!
//! # Responsibility
//! - Provide CRUD over the canonical `employees` table.
//! - Map storage uniqueness failures to `DuplicateIdentifier`.
//!
//! # Invariants
//! - Write paths normalize input before SQL mutations, so stored values and
//!   uniqueness comparisons share one form.
//! - Deleting an employee removes its attendance rows in the same statement
//!   (`ON DELETE CASCADE`).
//! - List order is total: the requested key first, then `id` in the same
//!   direction.
//! - Every write stamps `updated_at` in epoch milliseconds and never moves it
//!   backwards.

use crate::model::employee::{
    Employee, EmployeeId, EmployeeListQuery, IdentifierKind, NewEmployee,
};
use crate::repo::{
    constraint_kind, ensure_connection_ready, now_epoch_ms, parse_uuid, ConstraintKind, RepoError,
    RepoResult,
};
use rusqlite::{params, Connection, Row};
use uuid::Uuid;

const EMPLOYEE_SELECT_SQL: &str = "SELECT
    id,
    employee_code,
    full_name,
    email,
    department,
    created_at,
    updated_at
FROM employees";

/// Repository interface for the employee directory.
pub trait EmployeeRepository {
    /// Inserts one employee and returns the stored record.
    fn create_employee(&self, employee: &NewEmployee) -> RepoResult<Employee>;
    fn get_employee(&self, id: EmployeeId) -> RepoResult<Option<Employee>>;
    /// Exact match on the normalized code.
    fn find_by_code(&self, employee_code: &str) -> RepoResult<Option<Employee>>;
    /// Match on the normalized (lowercase) email.
    fn find_by_email(&self, email: &str) -> RepoResult<Option<Employee>>;
    fn employee_exists(&self, id: EmployeeId) -> RepoResult<bool>;
    fn list_employees(&self, query: &EmployeeListQuery) -> RepoResult<Vec<Employee>>;
    /// Persists all mutable attributes of `employee` and refreshes
    /// `updated_at`.
    fn update_employee(&self, employee: &Employee) -> RepoResult<Employee>;
    /// Deletes one employee together with its attendance records.
    fn delete_employee(&self, id: EmployeeId) -> RepoResult<()>;
}

/// SQLite-backed employee directory.
pub struct SqliteEmployeeRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteEmployeeRepository<'conn> {
    /// Creates a repository from a migrated connection.
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        ensure_connection_ready(conn, &["employees"])?;
        Ok(Self { conn })
    }

    /// Wraps a connection (or open transaction) already verified by the
    /// caller.
    pub(crate) fn within(conn: &'conn Connection) -> Self {
        Self { conn }
    }

    fn fetch_one(&self, filter_sql: &str, value: &str) -> RepoResult<Option<Employee>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{EMPLOYEE_SELECT_SQL} WHERE {filter_sql};"))?;
        let mut rows = stmt.query([value])?;
        if let Some(row) = rows.next()? {
            return Ok(Some(parse_employee_row(row)?));
        }
        Ok(None)
    }
}

impl EmployeeRepository for SqliteEmployeeRepository<'_> {
    fn create_employee(&self, employee: &NewEmployee) -> RepoResult<Employee> {
        let normalized = employee.normalized()?;
        let id = Uuid::now_v7();

        self.conn
            .execute(
                "INSERT INTO employees (
                    id,
                    employee_code,
                    full_name,
                    email,
                    department,
                    created_at,
                    updated_at
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?6);",
                params![
                    id.to_string(),
                    normalized.employee_code.as_str(),
                    normalized.full_name.as_str(),
                    normalized.email.as_str(),
                    normalized.department.as_str(),
                    now_epoch_ms(),
                ],
            )
            .map_err(map_employee_write_error)?;

        self.get_employee(id)?.ok_or_else(|| {
            RepoError::InvalidData(format!("employee {id} missing after insert"))
        })
    }

    fn get_employee(&self, id: EmployeeId) -> RepoResult<Option<Employee>> {
        self.fetch_one("id = ?1", id.to_string().as_str())
    }

    fn find_by_code(&self, employee_code: &str) -> RepoResult<Option<Employee>> {
        self.fetch_one("employee_code = ?1", employee_code)
    }

    fn find_by_email(&self, email: &str) -> RepoResult<Option<Employee>> {
        self.fetch_one("email = ?1", email.to_lowercase().as_str())
    }

    fn employee_exists(&self, id: EmployeeId) -> RepoResult<bool> {
        let exists: i64 = self.conn.query_row(
            "SELECT EXISTS(SELECT 1 FROM employees WHERE id = ?1);",
            [id.to_string()],
            |row| row.get(0),
        )?;
        Ok(exists == 1)
    }

    fn list_employees(&self, query: &EmployeeListQuery) -> RepoResult<Vec<Employee>> {
        // Column and keyword come from closed enums, never from caller text.
        // Why: ids are time-ordered, so tying on `id` in the requested
        // direction keeps same-millisecond registrations in creation order.
        let sql = format!(
            "{EMPLOYEE_SELECT_SQL} ORDER BY {column} {direction}, id {direction};",
            column = query.order_by.column(),
            direction = query.direction.keyword()
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let mut rows = stmt.query([])?;
        let mut employees = Vec::new();
        while let Some(row) = rows.next()? {
            employees.push(parse_employee_row(row)?);
        }
        Ok(employees)
    }

    fn update_employee(&self, employee: &Employee) -> RepoResult<Employee> {
        let normalized = NewEmployee::new(
            employee.employee_code.as_str(),
            employee.full_name.as_str(),
            employee.email.as_str(),
            employee.department.as_str(),
        )
        .normalized()?;

        let changed = self
            .conn
            .execute(
                "UPDATE employees
                 SET
                    employee_code = ?2,
                    full_name = ?3,
                    email = ?4,
                    department = ?5,
                    updated_at = max(?6, updated_at + 1)
                 WHERE id = ?1;",
                params![
                    employee.id.to_string(),
                    normalized.employee_code.as_str(),
                    normalized.full_name.as_str(),
                    normalized.email.as_str(),
                    normalized.department.as_str(),
                    now_epoch_ms(),
                ],
            )
            .map_err(map_employee_write_error)?;

        if changed == 0 {
            return Err(RepoError::EmployeeNotFound(employee.id));
        }

        self.get_employee(employee.id)?
            .ok_or(RepoError::EmployeeNotFound(employee.id))
    }

    fn delete_employee(&self, id: EmployeeId) -> RepoResult<()> {
        let changed = self
            .conn
            .execute("DELETE FROM employees WHERE id = ?1;", [id.to_string()])?;

        if changed == 0 {
            return Err(RepoError::EmployeeNotFound(id));
        }

        Ok(())
    }
}

fn map_employee_write_error(err: rusqlite::Error) -> RepoError {
    match constraint_kind(&err) {
        Some(ConstraintKind::Unique(detail)) if detail.contains("employees.email") => {
            RepoError::DuplicateIdentifier(IdentifierKind::Email)
        }
        Some(ConstraintKind::Unique(detail)) if detail.contains("employees.employee_code") => {
            RepoError::DuplicateIdentifier(IdentifierKind::Code)
        }
        Some(ConstraintKind::Unique(detail))
        | Some(ConstraintKind::Check(detail))
        | Some(ConstraintKind::Other(detail)) => RepoError::ConstraintViolation(detail),
        Some(ConstraintKind::ForeignKey) => {
            RepoError::ConstraintViolation("foreign key constraint failed".to_string())
        }
        None => RepoError::from(err),
    }
}

fn parse_employee_row(row: &Row<'_>) -> RepoResult<Employee> {
    let id_text: String = row.get("id")?;
    Ok(Employee {
        id: parse_uuid(&id_text, "employees.id")?,
        employee_code: row.get("employee_code")?,
        full_name: row.get("full_name")?,
        email: row.get("email")?,
        department: row.get("department")?,
        created_at: row.get("created_at")?,
        updated_at: row.get("updated_at")?,
    })
}
