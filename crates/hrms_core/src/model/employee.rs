//! Employee domain model.
//!
//! # Responsibility
//! - Define the canonical employee record and its write-side inputs.
//! - Own text normalization so uniqueness checks and storage agree on one form.
//!
//! # Invariants
//! - All text attributes are trimmed before they are compared or stored.
//! - `email` is stored lowercase.
//! - No attribute may be empty after trimming.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

/// Opaque internal employee identifier used for all relational references.
pub type EmployeeId = Uuid;

static EMAIL_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").expect("valid email regex"));

/// Canonical employee record as persisted in the directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Employee {
    /// System-generated identity. Never changes.
    pub id: EmployeeId,
    /// Caller-supplied code, unique across the directory.
    pub employee_code: String,
    pub full_name: String,
    /// Lowercase, unique across the directory.
    pub email: String,
    pub department: String,
    /// Epoch milliseconds.
    pub created_at: i64,
    /// Epoch milliseconds.
    pub updated_at: i64,
}

/// Registration input for one employee.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewEmployee {
    pub employee_code: String,
    pub full_name: String,
    pub email: String,
    pub department: String,
}

impl NewEmployee {
    pub fn new(
        employee_code: impl Into<String>,
        full_name: impl Into<String>,
        email: impl Into<String>,
        department: impl Into<String>,
    ) -> Self {
        Self {
            employee_code: employee_code.into(),
            full_name: full_name.into(),
            email: email.into(),
            department: department.into(),
        }
    }

    /// Returns the trimmed/lowercased form used for both uniqueness checks
    /// and storage.
    pub fn normalized(&self) -> Result<Self, EmployeeValidationError> {
        Ok(Self {
            employee_code: normalize_text(&self.employee_code, EmployeeField::EmployeeCode)?,
            full_name: normalize_text(&self.full_name, EmployeeField::FullName)?,
            email: normalize_email(&self.email)?,
            department: normalize_text(&self.department, EmployeeField::Department)?,
        })
    }
}

/// Partial attribute edit. `None` leaves the stored value untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmployeeChanges {
    pub employee_code: Option<String>,
    pub full_name: Option<String>,
    pub email: Option<String>,
    pub department: Option<String>,
}

impl EmployeeChanges {
    pub fn normalized(&self) -> Result<Self, EmployeeValidationError> {
        Ok(Self {
            employee_code: self
                .employee_code
                .as_deref()
                .map(|value| normalize_text(value, EmployeeField::EmployeeCode))
                .transpose()?,
            full_name: self
                .full_name
                .as_deref()
                .map(|value| normalize_text(value, EmployeeField::FullName))
                .transpose()?,
            email: self.email.as_deref().map(normalize_email).transpose()?,
            department: self
                .department
                .as_deref()
                .map(|value| normalize_text(value, EmployeeField::Department))
                .transpose()?,
        })
    }

    pub fn is_empty(&self) -> bool {
        self.employee_code.is_none()
            && self.full_name.is_none()
            && self.email.is_none()
            && self.department.is_none()
    }

    /// Applies the changes on top of an existing record.
    pub fn apply_to(&self, employee: &Employee) -> Employee {
        let mut next = employee.clone();
        if let Some(value) = &self.employee_code {
            next.employee_code = value.clone();
        }
        if let Some(value) = &self.full_name {
            next.full_name = value.clone();
        }
        if let Some(value) = &self.email {
            next.email = value.clone();
        }
        if let Some(value) = &self.department {
            next.department = value.clone();
        }
        next
    }
}

/// Required employee text attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EmployeeField {
    EmployeeCode,
    FullName,
    Email,
    Department,
}

impl EmployeeField {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::EmployeeCode => "employee_code",
            Self::FullName => "full_name",
            Self::Email => "email",
            Self::Department => "department",
        }
    }
}

/// Unique employee identifier that collided on write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdentifierKind {
    /// Human-facing employee code.
    Code,
    Email,
}

impl Display for IdentifierKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Code => write!(f, "employee code"),
            Self::Email => write!(f, "email"),
        }
    }
}

/// Input validation failure for employee writes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EmployeeValidationError {
    /// Field is empty after trimming.
    EmptyField(EmployeeField),
    /// Email does not look like `local@domain.tld`.
    InvalidEmail(String),
}

impl Display for EmployeeValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EmptyField(field) => write!(f, "`{}` must not be empty", field.as_str()),
            Self::InvalidEmail(value) => write!(f, "invalid email address `{value}`"),
        }
    }
}

impl Error for EmployeeValidationError {}

/// Directory list ordering key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EmployeeOrderField {
    EmployeeCode,
    FullName,
    #[default]
    CreatedAt,
}

impl EmployeeOrderField {
    /// Parses a caller-supplied field name.
    ///
    /// Unknown names fall back to `CreatedAt` instead of failing; callers rely
    /// on this for compatibility.
    pub fn parse_or_default(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "employee_code" | "employee_id" | "code" => Self::EmployeeCode,
            "full_name" | "name" => Self::FullName,
            _ => Self::CreatedAt,
        }
    }

    pub(crate) fn column(self) -> &'static str {
        match self {
            Self::EmployeeCode => "employee_code",
            Self::FullName => "full_name",
            Self::CreatedAt => "created_at",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortDirection {
    Asc,
    #[default]
    Desc,
}

impl SortDirection {
    /// `asc` (any case) is ascending; everything else is descending.
    pub fn parse_or_default(value: &str) -> Self {
        if value.trim().eq_ignore_ascii_case("asc") {
            Self::Asc
        } else {
            Self::Desc
        }
    }

    pub(crate) fn keyword(self) -> &'static str {
        match self {
            Self::Asc => "ASC",
            Self::Desc => "DESC",
        }
    }
}

/// Query options for listing the directory. Defaults to newest first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct EmployeeListQuery {
    pub order_by: EmployeeOrderField,
    pub direction: SortDirection,
}

impl EmployeeListQuery {
    /// Builds a query from raw transport parameters.
    pub fn from_params(order_by: &str, direction: &str) -> Self {
        Self {
            order_by: EmployeeOrderField::parse_or_default(order_by),
            direction: SortDirection::parse_or_default(direction),
        }
    }
}

/// Trims one required text attribute.
pub fn normalize_text(
    value: &str,
    field: EmployeeField,
) -> Result<String, EmployeeValidationError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(EmployeeValidationError::EmptyField(field));
    }
    Ok(trimmed.to_string())
}

/// Trims and lowercases an email, then checks its shape.
pub fn normalize_email(value: &str) -> Result<String, EmployeeValidationError> {
    let normalized = normalize_text(value, EmployeeField::Email)?.to_lowercase();
    if !EMAIL_RE.is_match(&normalized) {
        return Err(EmployeeValidationError::InvalidEmail(normalized));
    }
    Ok(normalized)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalized_trims_fields_and_lowercases_email() {
        let input = NewEmployee::new("  EMP-1 ", " Ada Lovelace ", " Ada@Example.COM ", " R&D ");
        let normalized = input.normalized().unwrap();
        assert_eq!(normalized.employee_code, "EMP-1");
        assert_eq!(normalized.full_name, "Ada Lovelace");
        assert_eq!(normalized.email, "ada@example.com");
        assert_eq!(normalized.department, "R&D");
    }

    #[test]
    fn normalized_rejects_blank_fields() {
        let input = NewEmployee::new("EMP-1", "   ", "a@b.io", "Ops");
        assert_eq!(
            input.normalized().unwrap_err(),
            EmployeeValidationError::EmptyField(EmployeeField::FullName)
        );
    }

    #[test]
    fn email_shape_is_checked() {
        assert!(matches!(
            normalize_email("not-an-email"),
            Err(EmployeeValidationError::InvalidEmail(_))
        ));
        assert!(matches!(
            normalize_email("a b@c.io"),
            Err(EmployeeValidationError::InvalidEmail(_))
        ));
        assert_eq!(normalize_email("X@Y.Z").unwrap(), "x@y.z");
    }

    #[test]
    fn unknown_order_field_falls_back_to_created_at() {
        assert_eq!(
            EmployeeOrderField::parse_or_default("salary"),
            EmployeeOrderField::CreatedAt
        );
        assert_eq!(
            EmployeeOrderField::parse_or_default("Full_Name"),
            EmployeeOrderField::FullName
        );
        assert_eq!(
            EmployeeOrderField::parse_or_default("employee_id"),
            EmployeeOrderField::EmployeeCode
        );
    }

    #[test]
    fn direction_defaults_to_descending() {
        assert_eq!(SortDirection::parse_or_default("ASC"), SortDirection::Asc);
        assert_eq!(SortDirection::parse_or_default("up"), SortDirection::Desc);
        assert_eq!(EmployeeListQuery::default().direction, SortDirection::Desc);
    }

    #[test]
    fn changes_apply_only_provided_fields() {
        let employee = Employee {
            id: Uuid::new_v4(),
            employee_code: "EMP-1".to_string(),
            full_name: "Ada".to_string(),
            email: "ada@example.com".to_string(),
            department: "R&D".to_string(),
            created_at: 1,
            updated_at: 1,
        };
        let changes = EmployeeChanges {
            department: Some(" Ops ".to_string()),
            ..EmployeeChanges::default()
        }
        .normalized()
        .unwrap();

        let next = changes.apply_to(&employee);
        assert_eq!(next.department, "Ops");
        assert_eq!(next.full_name, "Ada");
        assert!(!changes.is_empty());
        assert!(EmployeeChanges::default().is_empty());
    }
}
