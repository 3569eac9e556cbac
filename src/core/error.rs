//! Error types for admission operations.

use thiserror::Error;

use crate::core::model::{CourseId, EnrollmentId, EnrollmentStatus};

/// Errors produced by the admission controller and its stores.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AdmissionError {
    /// Malformed request; never retried.
    #[error("validation error: {0}")]
    Validation(String),
    /// Course is unknown, closed, or has no capacity ledger.
    #[error("course unavailable: {0}")]
    CourseUnavailable(CourseId),
    /// Course is full and does not keep a waitlist.
    #[error("capacity exceeded for course {0}")]
    CapacityExceeded(CourseId),
    /// Optimistic commit lost the race too many times.
    #[error("concurrency conflict on course {course_id} after {attempts} attempt(s)")]
    ConcurrencyConflict {
        /// Contended course.
        course_id: CourseId,
        /// Attempts made before giving up.
        attempts: u32,
    },
    /// The course row could not be locked within the transaction timeout.
    #[error("transaction timed out on course {course_id} after {waited_ms}ms")]
    Timeout {
        /// Contended course.
        course_id: CourseId,
        /// How long the caller waited.
        waited_ms: u64,
    },
    /// Requested status change is not allowed by the enrollment state machine.
    #[error("invalid transition for enrollment {enrollment_id}: {from:?} -> {to}")]
    InvalidTransition {
        /// Enrollment being changed.
        enrollment_id: EnrollmentId,
        /// Current status, `None` for a not-yet-created enrollment.
        from: Option<EnrollmentStatus>,
        /// Requested status.
        to: EnrollmentStatus,
    },
    /// No enrollment with this identifier exists.
    #[error("enrollment not found: {0}")]
    EnrollmentNotFound(EnrollmentId),
    /// Ledger counters disagree with the rows they account for.
    #[error("ledger drift: {0}")]
    LedgerDrift(String),
    /// Underlying store failure.
    #[error("persistence failure: {0}")]
    Persistence(String),
    /// The course directory could not be consulted.
    #[error("course directory unavailable: {0}")]
    DirectoryUnavailable(String),
}

impl AdmissionError {
    /// HTTP status code this error surfaces as.
    pub const fn status_code(&self) -> u16 {
        match self {
            Self::Validation(_) => 400,
            Self::EnrollmentNotFound(_) => 404,
            Self::CourseUnavailable(_) | Self::CapacityExceeded(_) => 422,
            Self::InvalidTransition { .. } => 409,
            Self::ConcurrencyConflict { .. } | Self::Timeout { .. } | Self::DirectoryUnavailable(_) => {
                503
            }
            Self::LedgerDrift(_) | Self::Persistence(_) => 500,
        }
    }

    /// Whether the caller may retry the same request later.
    pub const fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::ConcurrencyConflict { .. } | Self::Timeout { .. } | Self::DirectoryUnavailable(_)
        )
    }

    /// Stable machine-readable reason string for API bodies.
    pub const fn reason(&self) -> &'static str {
        match self {
            Self::Validation(_) => "validation_error",
            Self::CourseUnavailable(_) => "course_unavailable",
            Self::CapacityExceeded(_) => "capacity_exceeded",
            Self::ConcurrencyConflict { .. } => "concurrency_conflict",
            Self::Timeout { .. } => "timeout",
            Self::InvalidTransition { .. } => "invalid_transition",
            Self::EnrollmentNotFound(_) => "enrollment_not_found",
            Self::LedgerDrift(_) => "ledger_drift",
            Self::Persistence(_) => "persistence_failure",
            Self::DirectoryUnavailable(_) => "directory_unavailable",
        }
    }
}

/// Application-facing result using anyhow for collaborator boundaries.
pub type AppResult<T> = Result<T, anyhow::Error>;
