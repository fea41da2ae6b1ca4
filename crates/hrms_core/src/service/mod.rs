//! Core use-case services.
//!
//! # Responsibility
//! - Orchestrate repository calls into directory and attendance use cases.
//! - Own transaction boundaries for multi-step writes.
//! - Keep transport layers decoupled from storage details.

pub mod attendance_service;
pub mod employee_service;
