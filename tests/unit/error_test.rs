//! Tests for error types

use course_admission::core::{AdmissionError, EnrollmentStatus};
use uuid::Uuid;

#[test]
fn test_capacity_exceeded_error() {
    let err = AdmissionError::CapacityExceeded("rust-101".to_string());
    assert_eq!(format!("{}", err), "capacity exceeded for course rust-101");
    assert_eq!(err.status_code(), 422);
    assert!(!err.is_retryable());
}

#[test]
fn test_conflict_is_retryable() {
    let err = AdmissionError::ConcurrencyConflict {
        course_id: "rust-101".to_string(),
        attempts: 5,
    };
    assert_eq!(
        format!("{}", err),
        "concurrency conflict on course rust-101 after 5 attempt(s)"
    );
    assert_eq!(err.status_code(), 503);
    assert!(err.is_retryable());
    assert_eq!(err.reason(), "concurrency_conflict");
}

#[test]
fn test_timeout_is_retryable() {
    let err = AdmissionError::Timeout {
        course_id: "rust-101".to_string(),
        waited_ms: 2000,
    };
    assert_eq!(err.status_code(), 503);
    assert!(err.is_retryable());
}

#[test]
fn test_invalid_transition_error() {
    let id = Uuid::nil();
    let err = AdmissionError::InvalidTransition {
        enrollment_id: id,
        from: Some(EnrollmentStatus::Dropped),
        to: EnrollmentStatus::Active,
    };
    assert_eq!(err.status_code(), 409);
    assert_eq!(err.reason(), "invalid_transition");
    assert!(format!("{}", err).contains("Some(Dropped) -> active"));
}

#[test]
fn test_not_found_and_validation() {
    assert_eq!(AdmissionError::EnrollmentNotFound(Uuid::nil()).status_code(), 404);
    let err = AdmissionError::Validation("student_id must not be empty".to_string());
    assert_eq!(format!("{}", err), "validation error: student_id must not be empty");
    assert_eq!(err.status_code(), 400);
}
