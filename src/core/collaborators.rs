//! External systems the controller consumes but does not own.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::core::error::AppResult;
use crate::core::model::{CourseId, Enrollment};

/// What the course directory knows about a course.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CourseListing {
    /// Course identifier.
    pub course_id: CourseId,
    /// Published and open for enrollment.
    pub open_for_enrollment: bool,
    /// Seat limit used to seed the ledger at publish time.
    pub max_capacity: u32,
    /// Waitlist default used to seed the ledger at publish time.
    pub allow_waitlist: bool,
}

/// Source of truth for course existence and enrollment windows.
#[async_trait]
pub trait CourseDirectory: Send + Sync + 'static {
    /// Look up a course; `Ok(None)` when it does not exist.
    async fn lookup(&self, course_id: &str) -> AppResult<Option<CourseListing>>;
}

/// Delivers promotion notices to students.
///
/// Delivery failures never undo a promotion; the controller logs them and
/// retries on the background sweep.
#[async_trait]
pub trait Notifier: Send + Sync + 'static {
    /// Tell the student their waitlisted enrollment is now active.
    async fn notify_promoted(&self, enrollment: &Enrollment) -> AppResult<()>;
}
