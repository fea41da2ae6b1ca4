//! Employee directory use-case service.
//!
//! # Responsibility
//! - Register, look up, list, edit and remove employees.
//! - Enforce code/email uniqueness with a precise conflict kind.
//!
//! # Invariants
//! - Input is normalized before uniqueness checks, so `" EMP-1 "` and
//!   `"EMP-1"` collide, as do emails differing only in case.
//! - Validation and not-found failures happen before any mutation.
//! - Storage uniqueness remains the backstop when a concurrent writer wins
//!   the race between check and insert.

use crate::model::employee::{
    Employee, EmployeeChanges, EmployeeId, EmployeeListQuery, EmployeeValidationError,
    IdentifierKind, NewEmployee,
};
use crate::repo::employee_repo::EmployeeRepository;
use crate::repo::RepoError;
use log::{info, warn};
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Errors from employee directory operations.
#[derive(Debug)]
pub enum EmployeeServiceError {
    /// Required field empty or malformed.
    Validation(EmployeeValidationError),
    /// Code or email already belongs to another employee.
    DuplicateIdentifier(IdentifierKind),
    NotFound(EmployeeId),
    Repo(RepoError),
}

impl Display for EmployeeServiceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Validation(err) => write!(f, "{err}"),
            Self::DuplicateIdentifier(kind) => {
                write!(f, "an employee with this {kind} already exists")
            }
            Self::NotFound(id) => write!(f, "employee not found: {id}"),
            Self::Repo(err) => write!(f, "{err}"),
        }
    }
}

impl Error for EmployeeServiceError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Validation(err) => Some(err),
            Self::Repo(err) => Some(err),
            _ => None,
        }
    }
}

impl From<EmployeeValidationError> for EmployeeServiceError {
    fn from(value: EmployeeValidationError) -> Self {
        Self::Validation(value)
    }
}

impl From<RepoError> for EmployeeServiceError {
    fn from(value: RepoError) -> Self {
        match value {
            RepoError::Validation(err) => Self::Validation(err),
            RepoError::DuplicateIdentifier(kind) => Self::DuplicateIdentifier(kind),
            RepoError::EmployeeNotFound(id) => Self::NotFound(id),
            other => Self::Repo(other),
        }
    }
}

/// Employee directory facade over repository implementations.
pub struct EmployeeService<R: EmployeeRepository> {
    repo: R,
}

impl<R: EmployeeRepository> EmployeeService<R> {
    pub fn new(repo: R) -> Self {
        Self { repo }
    }

    /// Registers a new employee.
    ///
    /// # Errors
    /// - `Validation` when a field is blank or the email is malformed.
    /// - `DuplicateIdentifier(Code)` / `DuplicateIdentifier(Email)` when the
    ///   normalized value is taken. Code is checked first.
    pub fn register(&self, input: &NewEmployee) -> Result<Employee, EmployeeServiceError> {
        let normalized = input.normalized()?;

        if self.repo.find_by_code(&normalized.employee_code)?.is_some() {
            warn!("event=employee_register module=directory status=error error_code=duplicate_code");
            return Err(EmployeeServiceError::DuplicateIdentifier(IdentifierKind::Code));
        }
        if self.repo.find_by_email(&normalized.email)?.is_some() {
            warn!("event=employee_register module=directory status=error error_code=duplicate_email");
            return Err(EmployeeServiceError::DuplicateIdentifier(IdentifierKind::Email));
        }

        let employee = self.repo.create_employee(&normalized)?;
        info!(
            "event=employee_register module=directory status=ok employee_id={}",
            employee.id
        );
        Ok(employee)
    }

    /// Resolves one employee reference.
    pub fn lookup(&self, id: EmployeeId) -> Result<Employee, EmployeeServiceError> {
        self.repo
            .get_employee(id)?
            .ok_or(EmployeeServiceError::NotFound(id))
    }

    /// Lists the directory. Unknown order fields were already mapped to the
    /// default by `EmployeeListQuery`.
    pub fn list(&self, query: &EmployeeListQuery) -> Result<Vec<Employee>, EmployeeServiceError> {
        Ok(self.repo.list_employees(query)?)
    }

    /// Applies a partial attribute edit.
    ///
    /// A new code or email must not belong to a different employee.
    pub fn update(
        &self,
        id: EmployeeId,
        changes: &EmployeeChanges,
    ) -> Result<Employee, EmployeeServiceError> {
        let changes = changes.normalized()?;
        let current = self.lookup(id)?;
        if changes.is_empty() {
            return Ok(current);
        }

        if let Some(code) = changes.employee_code.as_deref() {
            if let Some(other) = self.repo.find_by_code(code)? {
                if other.id != id {
                    return Err(EmployeeServiceError::DuplicateIdentifier(IdentifierKind::Code));
                }
            }
        }
        if let Some(email) = changes.email.as_deref() {
            if let Some(other) = self.repo.find_by_email(email)? {
                if other.id != id {
                    return Err(EmployeeServiceError::DuplicateIdentifier(
                        IdentifierKind::Email,
                    ));
                }
            }
        }

        let updated = self.repo.update_employee(&changes.apply_to(&current))?;
        info!("event=employee_update module=directory status=ok employee_id={id}");
        Ok(updated)
    }

    /// Deletes an employee and, atomically, all of its attendance records.
    pub fn remove(&self, id: EmployeeId) -> Result<(), EmployeeServiceError> {
        self.repo.delete_employee(id)?;
        info!("event=employee_remove module=directory status=ok employee_id={id}");
        Ok(())
    }
}
