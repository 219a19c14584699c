//! Error types for the prize draw core engine

use pyo3::exceptions::{PyKeyError, PyRuntimeError, PyValueError};
use pyo3::PyErr;
use thiserror::Error;

/// Main error type for the prize draw core engine
#[derive(Error, Debug)]
pub enum DrawCoreError {
    #[error("Insufficient candidates: need {required}, have {available}")]
    InsufficientCandidates { required: usize, available: usize },

    #[error("Invalid range: {0}")]
    InvalidRange(String),

    #[error("Invalid grade: {0}")]
    InvalidGrade(i32),

    #[error("Class already exists: grade {grade} class {class_number}")]
    DuplicateClass { grade: i32, class_number: i32 },

    #[error("Class not found: {0}")]
    ClassNotFound(String),

    #[error("Student not found: {0}")]
    StudentNotFound(String),

    #[error("Range not found: {0}")]
    RangeNotFound(String),

    #[error("Roster not initialized")]
    RosterNotInitialized,

    #[error("Deserialization error: {0}")]
    DeserializationError(String),

    #[error("Session error: {0}")]
    SessionError(String),
}

impl From<DrawCoreError> for PyErr {
    fn from(err: DrawCoreError) -> PyErr {
        match err {
            DrawCoreError::InsufficientCandidates { required, available } => {
                PyValueError::new_err(format!(
                    "Insufficient candidates: need {}, have {}",
                    required, available
                ))
            }
            DrawCoreError::InvalidRange(msg) => {
                PyValueError::new_err(format!("Invalid range: {}", msg))
            }
            DrawCoreError::InvalidGrade(grade) => {
                PyValueError::new_err(format!("Invalid grade: {}", grade))
            }
            DrawCoreError::DuplicateClass { grade, class_number } => PyValueError::new_err(
                format!("Class already exists: grade {} class {}", grade, class_number),
            ),
            DrawCoreError::ClassNotFound(id) => {
                PyKeyError::new_err(format!("Class not found: {}", id))
            }
            DrawCoreError::StudentNotFound(id) => {
                PyKeyError::new_err(format!("Student not found: {}", id))
            }
            DrawCoreError::RangeNotFound(id) => {
                PyKeyError::new_err(format!("Range not found: {}", id))
            }
            DrawCoreError::RosterNotInitialized => {
                PyRuntimeError::new_err("Roster not initialized. Call init_roster() first.")
            }
            DrawCoreError::DeserializationError(msg) => {
                PyValueError::new_err(format!("Deserialization error: {}", msg))
            }
            DrawCoreError::SessionError(msg) => {
                PyRuntimeError::new_err(format!("Session error: {}", msg))
            }
        }
    }
}

/// Result type alias for the prize draw core engine
pub type Result<T> = std::result::Result<T, DrawCoreError>;
