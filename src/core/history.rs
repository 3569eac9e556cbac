//! Append-only history of enrollment status transitions.
//!
//! Records are appended to the staged course partition by the same call that
//! changes the status, so they commit or roll back with it.

use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::core::model::{CourseId, EnrollmentId, EnrollmentStatus};

/// Why a transition happened.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransitionReason {
    /// Seat granted on request.
    Admitted,
    /// Queued on a full course.
    Waitlisted,
    /// Full course without a waitlist.
    CapacityExceeded,
    /// Student dropped the course.
    Dropped,
    /// Student finished the course.
    Completed,
    /// Student left the waitlist.
    Cancelled,
    /// Waitlisted student received a freed seat.
    Promoted,
}

impl TransitionReason {
    /// Wire name.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Admitted => "admitted",
            Self::Waitlisted => "waitlisted",
            Self::CapacityExceeded => "capacity_exceeded",
            Self::Dropped => "dropped",
            Self::Completed => "completed",
            Self::Cancelled => "cancelled",
            Self::Promoted => "promoted",
        }
    }
}

impl fmt::Display for TransitionReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Immutable audit entry for one status transition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryRecord {
    /// Record identifier.
    pub id: Uuid,
    /// Enrollment that changed.
    pub enrollment_id: EnrollmentId,
    /// Course the enrollment belongs to.
    pub course_id: CourseId,
    /// Status before; `None` on creation.
    pub previous_status: Option<EnrollmentStatus>,
    /// Status after.
    pub new_status: EnrollmentStatus,
    /// Cause of the change.
    pub reason: TransitionReason,
    /// Milliseconds since epoch.
    pub timestamp_ms: u128,
}

impl HistoryRecord {
    /// New record with a fresh identifier.
    pub fn new(
        enrollment_id: EnrollmentId,
        course_id: &str,
        previous_status: Option<EnrollmentStatus>,
        new_status: EnrollmentStatus,
        reason: TransitionReason,
        timestamp_ms: u128,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            enrollment_id,
            course_id: course_id.to_owned(),
            previous_status,
            new_status,
            reason,
            timestamp_ms,
        }
    }
}

/// Per-course append-only log.
#[derive(Debug, Clone, Default)]
pub struct HistoryLog {
    records: Vec<HistoryRecord>,
}

impl HistoryLog {
    /// Empty log.
    pub const fn new() -> Self {
        Self {
            records: Vec::new(),
        }
    }

    /// Append a record. There is no way to edit or remove one.
    pub fn record(
        &mut self,
        enrollment_id: EnrollmentId,
        course_id: &str,
        previous_status: Option<EnrollmentStatus>,
        new_status: EnrollmentStatus,
        reason: TransitionReason,
        timestamp_ms: u128,
    ) -> &HistoryRecord {
        self.records.push(HistoryRecord::new(
            enrollment_id,
            course_id,
            previous_status,
            new_status,
            reason,
            timestamp_ms,
        ));
        &self.records[self.records.len() - 1]
    }

    /// Append records produced by a committed transaction, in order.
    pub fn append(&mut self, records: impl IntoIterator<Item = HistoryRecord>) {
        self.records.extend(records);
    }

    /// Records for one enrollment, oldest first.
    pub fn for_enrollment(&self, enrollment_id: EnrollmentId) -> Vec<HistoryRecord> {
        self.records
            .iter()
            .filter(|r| r.enrollment_id == enrollment_id)
            .cloned()
            .collect()
    }

    /// All records, oldest first.
    pub fn records(&self) -> &[HistoryRecord] {
        &self.records
    }

    /// Number of records.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// True when nothing has been recorded.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}
