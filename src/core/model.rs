//! Enrollment records and the status state machine.

use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Course identifier issued by the course directory.
pub type CourseId = String;
/// Student identifier issued by the identity provider.
pub type StudentId = String;
/// Enrollment identifier.
pub type EnrollmentId = Uuid;

/// Lifecycle status of an enrollment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EnrollmentStatus {
    /// Holds a seat.
    Active,
    /// Waiting for a seat.
    Waitlisted,
    /// Finished the course.
    Completed,
    /// Gave up a seat.
    Dropped,
    /// Left the waitlist.
    Cancelled,
    /// Refused because the course was full without a waitlist.
    Rejected,
}

impl EnrollmentStatus {
    /// Statuses an enrollment may be created with.
    pub const fn is_initial(self) -> bool {
        matches!(self, Self::Active | Self::Waitlisted | Self::Rejected)
    }

    /// Live statuses hold a seat or a waitlist slot.
    pub const fn is_live(self) -> bool {
        matches!(self, Self::Active | Self::Waitlisted)
    }

    /// Whether `self -> next` is a legal transition.
    pub const fn can_transition_to(self, next: Self) -> bool {
        matches!(
            (self, next),
            (Self::Active, Self::Dropped | Self::Completed)
                | (Self::Waitlisted, Self::Active | Self::Cancelled)
        )
    }

    /// Wire name.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Waitlisted => "waitlisted",
            Self::Completed => "completed",
            Self::Dropped => "dropped",
            Self::Cancelled => "cancelled",
            Self::Rejected => "rejected",
        }
    }
}

impl fmt::Display for EnrollmentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One student's relationship to one course.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Enrollment {
    /// Enrollment identifier.
    pub id: EnrollmentId,
    /// Student holding the enrollment.
    pub student_id: StudentId,
    /// Course enrolled in.
    pub course_id: CourseId,
    /// Current status.
    pub status: EnrollmentStatus,
    /// Creation time (ms since epoch).
    pub enrolled_at_ms: u128,
    /// Time of the last status change (ms since epoch).
    pub status_changed_at_ms: u128,
}

/// Result of an `enroll` call that did not fail.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Admission {
    /// The live enrollment, either new or pre-existing.
    pub enrollment: Enrollment,
    /// 1-based waitlist position when waitlisted.
    pub waitlist_position: Option<usize>,
    /// True when the request matched an existing live enrollment.
    pub duplicate: bool,
}

impl Admission {
    /// Status the caller was admitted with.
    pub const fn status(&self) -> EnrollmentStatus {
        self.enrollment.status
    }
}
