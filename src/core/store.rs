//! Store abstraction for course partitions.

use crate::core::error::AdmissionError;
use crate::core::ledger::{CapacitySnapshot, CourseCapacity};
use crate::core::model::{CourseId, EnrollmentId};
use crate::core::partition::CoursePartition;

/// Durable home of course partitions.
///
/// Every write goes through [`AdmissionStore::transact`], which runs the closure
/// against a staged copy of one course's partition and commits it atomically.
/// Implementations serialize transactions on the same course (row lock or
/// optimistic revision check) and never serialize across courses.
pub trait AdmissionStore: Send + Sync + 'static {
    /// Create the partition for a newly published course.
    /// Returns `false` if the course already had one; a retired course cannot
    /// be published again.
    fn insert_course(&self, capacity: CourseCapacity) -> Result<bool, AdmissionError>;

    /// Run `f` against a staged partition and commit on `Ok` if it wrote anything.
    ///
    /// Errors: `CourseUnavailable` when the course has no partition or was
    /// retired, `Timeout` when the row cannot be locked in time,
    /// `ConcurrencyConflict` when an optimistic commit loses a race, and any
    /// error returned by `f` (which discards the staged copy).
    fn transact<R, F>(&self, course_id: &str, f: F) -> Result<R, AdmissionError>
    where
        F: FnOnce(&mut CoursePartition) -> Result<R, AdmissionError>;

    /// Consistent read of a committed partition. Retired courses stay readable.
    fn read<R, F>(&self, course_id: &str, f: F) -> Result<R, AdmissionError>
    where
        F: FnOnce(&CoursePartition) -> R;

    /// Last committed capacity figures without touching the partition lock.
    fn capacity(&self, course_id: &str) -> Result<CapacitySnapshot, AdmissionError>;

    /// Course owning an enrollment.
    fn course_of(&self, enrollment_id: EnrollmentId) -> Result<Option<CourseId>, AdmissionError>;

    /// Retire a course once `guard` approves it under the row lock. Retired
    /// courses keep their enrollments and history but accept no writes.
    fn retire_course<F>(&self, course_id: &str, guard: F) -> Result<(), AdmissionError>
    where
        F: FnOnce(&CoursePartition) -> Result<(), AdmissionError>;

    /// Identifiers of all courses that are not retired.
    fn course_ids(&self) -> Vec<CourseId>;
}
