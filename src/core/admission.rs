//! Admission controller: the transactional decision procedure for enroll,
//! drop, complete, and cancel requests.
//!
//! Every mutating operation runs as one course transaction through the
//! [`AdmissionStore`]. The seat, the enrollment row, the waitlist entry, and
//! the history record are written to the same staged partition, so a request
//! either lands completely or not at all. Seat releases commit first and only
//! then hand off to promotion, which runs in transactions of its own.

use std::collections::{BTreeSet, VecDeque};
use std::sync::atomic::AtomicU64;
use std::sync::Arc;

use parking_lot::Mutex;

use crate::config::AdmissionConfig;
use crate::core::collaborators::{CourseDirectory, Notifier};
use crate::core::error::AdmissionError;
use crate::core::history::{HistoryRecord, TransitionReason};
use crate::core::ledger::{CapacitySnapshot, CourseCapacity, SeatReservation};
use crate::core::model::{Admission, CourseId, Enrollment, EnrollmentId, EnrollmentStatus};
use crate::core::partition::{CoursePartition, ReconciliationReport};
use crate::core::store::AdmissionStore;
use crate::core::sweep::PendingNotice;
use crate::core::waitlist::WaitlistEntry;
use crate::util::clock::now_ms;

/// What a single admission transaction decided.
enum AdmitOutcome {
    Admitted(Admission),
    Rejected(Enrollment),
}

/// Admission controller over a store, a course directory, and a notifier.
pub struct AdmissionController<S, D, N> {
    pub(crate) store: Arc<S>,
    pub(crate) directory: D,
    pub(crate) notifier: N,
    pub(crate) config: AdmissionConfig,
    /// Courses whose promotion failed and must be retried by the sweep.
    pub(crate) pending_promotions: Mutex<BTreeSet<CourseId>>,
    /// Promotion notices that could not be delivered yet.
    pub(crate) pending_notices: Mutex<VecDeque<PendingNotice>>,
    pub(crate) abandoned_notices: AtomicU64,
}

impl<S, D, N> AdmissionController<S, D, N>
where
    S: AdmissionStore,
    D: CourseDirectory,
    N: Notifier,
{
    /// Create a controller from its components.
    pub fn new(config: AdmissionConfig, store: Arc<S>, directory: D, notifier: N) -> Self {
        Self {
            store,
            directory,
            notifier,
            config,
            pending_promotions: Mutex::new(BTreeSet::new()),
            pending_notices: Mutex::new(VecDeque::new()),
            abandoned_notices: AtomicU64::new(0),
        }
    }

    /// Backing store.
    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    /// Active configuration.
    pub const fn config(&self) -> &AdmissionConfig {
        &self.config
    }

    /// Course directory collaborator.
    pub const fn directory(&self) -> &D {
        &self.directory
    }

    /// Notification collaborator.
    pub const fn notifier(&self) -> &N {
        &self.notifier
    }

    /// Seed the capacity ledger for a course from the directory.
    ///
    /// Publishing an already-published course is a no-op that returns the
    /// current capacity.
    pub async fn publish_course(&self, course_id: &str) -> Result<CapacitySnapshot, AdmissionError> {
        require_id("course_id", course_id)?;
        let listing = self
            .directory
            .lookup(course_id)
            .await
            .map_err(|e| directory_failure(course_id, &e))?
            .ok_or_else(|| AdmissionError::CourseUnavailable(course_id.to_owned()))?;
        let capacity =
            CourseCapacity::new(course_id, listing.max_capacity, listing.allow_waitlist)?;
        if self.store.insert_course(capacity)? {
            tracing::info!(
                course = %course_id,
                max_capacity = listing.max_capacity,
                allow_waitlist = listing.allow_waitlist,
                "course published"
            );
        }
        self.store.capacity(course_id)
    }

    /// Request a seat for a student.
    ///
    /// Returns the live enrollment (active or waitlisted). A request matching
    /// an existing live enrollment returns it unchanged with `duplicate` set.
    /// A full course without a waitlist records a `rejected` enrollment and
    /// fails with [`AdmissionError::CapacityExceeded`].
    pub async fn enroll(&self, student_id: &str, course_id: &str) -> Result<Admission, AdmissionError> {
        require_id("student_id", student_id)?;
        require_id("course_id", course_id)?;

        match self.store.read(course_id, |p| existing_admission(p, student_id)) {
            Ok(Some(existing)) => {
                tracing::debug!(
                    course = %course_id,
                    student = %student_id,
                    enrollment = %existing.enrollment.id,
                    "duplicate enroll request"
                );
                return Ok(existing);
            }
            Ok(None) | Err(AdmissionError::CourseUnavailable(_)) => {}
            Err(e) => return Err(e),
        }

        self.check_open(course_id).await?;

        let outcome = self
            .with_retry(course_id, || {
                self.store
                    .transact(course_id, |p| admit(p, student_id, now_ms()))
            })
            .await?;

        match outcome {
            AdmitOutcome::Admitted(admission) => {
                if !admission.duplicate {
                    tracing::info!(
                        course = %course_id,
                        student = %student_id,
                        enrollment = %admission.enrollment.id,
                        status = %admission.status(),
                        waitlist_position = ?admission.waitlist_position,
                        "enroll request admitted"
                    );
                }
                Ok(admission)
            }
            AdmitOutcome::Rejected(enrollment) => {
                tracing::warn!(
                    course = %course_id,
                    student = %student_id,
                    enrollment = %enrollment.id,
                    "course full and waitlist disabled"
                );
                Err(AdmissionError::CapacityExceeded(course_id.to_owned()))
            }
        }
    }

    /// Give up an active seat, then promote from the waitlist.
    ///
    /// The drop commits before promotion starts; promotion failures are
    /// queued for the sweep and never reported to the caller.
    pub async fn drop(&self, enrollment_id: EnrollmentId) -> Result<Enrollment, AdmissionError> {
        let released = self
            .release(enrollment_id, EnrollmentStatus::Dropped, TransitionReason::Dropped)
            .await?;
        self.promote_after_release(&released.course_id).await;
        Ok(released)
    }

    /// Mark an active enrollment completed, freeing its seat for the waitlist.
    pub async fn complete(&self, enrollment_id: EnrollmentId) -> Result<Enrollment, AdmissionError> {
        let released = self
            .release(enrollment_id, EnrollmentStatus::Completed, TransitionReason::Completed)
            .await?;
        self.promote_after_release(&released.course_id).await;
        Ok(released)
    }

    /// Leave the waitlist. Seats are not touched.
    pub async fn cancel_waitlisted(&self, enrollment_id: EnrollmentId) -> Result<Enrollment, AdmissionError> {
        let course_id = self.locate(enrollment_id)?;
        let cancelled = self
            .with_retry(&course_id, || {
                self.store.transact(&course_id, |p| {
                    let cancelled = p.transition(
                        enrollment_id,
                        EnrollmentStatus::Cancelled,
                        TransitionReason::Cancelled,
                        now_ms(),
                    )?;
                    p.waitlist_mut().remove(enrollment_id).ok_or_else(|| {
                        AdmissionError::LedgerDrift(format!(
                            "waitlisted enrollment {enrollment_id} has no waitlist entry"
                        ))
                    })?;
                    p.capacity_mut().leave_waitlist()?;
                    Ok(cancelled)
                })
            })
            .await?;
        tracing::info!(course = %course_id, enrollment = %enrollment_id, "waitlist entry cancelled");
        Ok(cancelled)
    }

    /// Change a course's seat limit and promote into any seats it opens.
    pub async fn resize_course(
        &self,
        course_id: &str,
        max_capacity: u32,
    ) -> Result<CapacitySnapshot, AdmissionError> {
        require_id("course_id", course_id)?;
        let snapshot = self
            .with_retry(course_id, || {
                self.store.transact(course_id, |p| {
                    p.capacity_mut().resize(max_capacity)?;
                    Ok(p.capacity().snapshot())
                })
            })
            .await?;
        tracing::info!(course = %course_id, max_capacity, "course capacity changed");
        if snapshot.available_spots > 0 && snapshot.waitlist_count > 0 {
            self.promote_after_release(course_id).await;
            return self.store.capacity(course_id);
        }
        Ok(snapshot)
    }

    /// Stop accepting writes for a course. Refused while anyone is active or waitlisted.
    pub fn retire_course(&self, course_id: &str) -> Result<(), AdmissionError> {
        require_id("course_id", course_id)?;
        self.store.retire_course(course_id, |p| {
            let live = p.live_count();
            if live > 0 {
                return Err(AdmissionError::Validation(format!(
                    "course {course_id} still has {live} active or waitlisted enrollment(s)"
                )));
            }
            Ok(())
        })?;
        self.pending_promotions.lock().remove(course_id);
        tracing::info!(course = %course_id, "course retired");
        Ok(())
    }

    /// Capacity figures from the last committed transaction.
    pub fn capacity(&self, course_id: &str) -> Result<CapacitySnapshot, AdmissionError> {
        self.store.capacity(course_id)
    }

    /// Waitlist in promotion order.
    pub fn waitlist(&self, course_id: &str) -> Result<Vec<WaitlistEntry>, AdmissionError> {
        self.store.read(course_id, |p| p.waitlist().entries())
    }

    /// Enrollment by id.
    pub fn enrollment(&self, enrollment_id: EnrollmentId) -> Result<Enrollment, AdmissionError> {
        let course_id = self.locate(enrollment_id)?;
        self.store
            .read(&course_id, |p| p.enrollment(enrollment_id))?
            .ok_or(AdmissionError::EnrollmentNotFound(enrollment_id))
    }

    /// Status history of an enrollment, oldest first.
    pub fn history(&self, enrollment_id: EnrollmentId) -> Result<Vec<HistoryRecord>, AdmissionError> {
        let course_id = self.locate(enrollment_id)?;
        self.store.read(&course_id, |p| p.history_for(enrollment_id))
    }

    /// Compare ledger counters with enrollment rows and waitlist entries.
    pub fn reconcile(&self, course_id: &str) -> Result<ReconciliationReport, AdmissionError> {
        let report = self.store.read(course_id, CoursePartition::reconcile)?;
        if !report.is_consistent() {
            tracing::error!(course = %course_id, ?report, "capacity ledger out of sync with enrollments");
        }
        Ok(report)
    }

    /// Move an active enrollment to a seat-releasing status in one transaction.
    async fn release(
        &self,
        enrollment_id: EnrollmentId,
        to: EnrollmentStatus,
        reason: TransitionReason,
    ) -> Result<Enrollment, AdmissionError> {
        let course_id = self.locate(enrollment_id)?;
        let released = self
            .with_retry(&course_id, || {
                self.store.transact(&course_id, |p| {
                    let updated = p.transition(enrollment_id, to, reason, now_ms())?;
                    p.capacity_mut().release_seat()?;
                    Ok(updated)
                })
            })
            .await?;
        tracing::info!(course = %course_id, enrollment = %enrollment_id, status = %to, "seat released");
        Ok(released)
    }

    async fn check_open(&self, course_id: &str) -> Result<(), AdmissionError> {
        let listing = self
            .directory
            .lookup(course_id)
            .await
            .map_err(|e| directory_failure(course_id, &e))?;
        match listing {
            Some(listing) if listing.open_for_enrollment => Ok(()),
            _ => {
                tracing::debug!(course = %course_id, "course missing or closed");
                Err(AdmissionError::CourseUnavailable(course_id.to_owned()))
            }
        }
    }

    pub(crate) fn locate(&self, enrollment_id: EnrollmentId) -> Result<CourseId, AdmissionError> {
        self.store
            .course_of(enrollment_id)?
            .ok_or(AdmissionError::EnrollmentNotFound(enrollment_id))
    }

    /// Run `op` until it stops reporting optimistic conflicts or the retry
    /// policy is exhausted. Every retry calls `op` afresh, so `op` must redo
    /// its reads rather than reuse state from a failed attempt.
    pub(crate) async fn with_retry<R, F>(&self, course_id: &str, mut op: F) -> Result<R, AdmissionError>
    where
        F: FnMut() -> Result<R, AdmissionError>,
    {
        let policy = &self.config.retry;
        let mut attempt = 1;
        loop {
            match op() {
                Err(AdmissionError::ConcurrencyConflict { .. }) if attempt < policy.max_attempts => {
                    let delay = policy.delay_for(attempt);
                    tracing::debug!(course = %course_id, attempt, ?delay, "retrying after conflict");
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(AdmissionError::ConcurrencyConflict { .. }) => {
                    tracing::warn!(course = %course_id, attempts = attempt, "conflict retries exhausted");
                    return Err(AdmissionError::ConcurrencyConflict {
                        course_id: course_id.to_owned(),
                        attempts: attempt,
                    });
                }
                other => return other,
            }
        }
    }
}

/// Existing live enrollment of a student, reported as a duplicate admission.
fn existing_admission(p: &CoursePartition, student_id: &str) -> Option<Admission> {
    p.live_enrollment(student_id).map(|e| Admission {
        enrollment: e.clone(),
        waitlist_position: p.waitlist().position_of(e.id),
        duplicate: true,
    })
}

/// The admission decision, run inside a course transaction.
fn admit(p: &mut CoursePartition, student_id: &str, now: u128) -> Result<AdmitOutcome, AdmissionError> {
    if let Some(existing) = existing_admission(p, student_id) {
        return Ok(AdmitOutcome::Admitted(existing));
    }

    // Newcomers never overtake students already waiting for a freed seat.
    let reservation = if p.waitlist().is_empty() && !p.capacity().is_full() {
        p.capacity_mut().reserve_seat()
    } else {
        SeatReservation::Full
    };

    match reservation {
        SeatReservation::Reserved => {
            let enrollment =
                p.open_enrollment(student_id, EnrollmentStatus::Active, TransitionReason::Admitted, now)?;
            Ok(AdmitOutcome::Admitted(Admission {
                enrollment,
                waitlist_position: None,
                duplicate: false,
            }))
        }
        SeatReservation::Full if !p.capacity().allow_waitlist => {
            let enrollment = p.open_enrollment(
                student_id,
                EnrollmentStatus::Rejected,
                TransitionReason::CapacityExceeded,
                now,
            )?;
            Ok(AdmitOutcome::Rejected(enrollment))
        }
        SeatReservation::Full => {
            let enrollment = p.open_enrollment(
                student_id,
                EnrollmentStatus::Waitlisted,
                TransitionReason::Waitlisted,
                now,
            )?;
            p.waitlist_mut().push(student_id, enrollment.id);
            p.capacity_mut().join_waitlist();
            let waitlist_position = p.waitlist().position_of(enrollment.id);
            Ok(AdmitOutcome::Admitted(Admission {
                enrollment,
                waitlist_position,
                duplicate: false,
            }))
        }
    }
}

fn require_id(field: &str, value: &str) -> Result<(), AdmissionError> {
    if value.trim().is_empty() {
        return Err(AdmissionError::Validation(format!("{field} must not be empty")));
    }
    Ok(())
}

fn directory_failure(course_id: &str, err: &anyhow::Error) -> AdmissionError {
    tracing::warn!(course = %course_id, error = %err, "course directory lookup failed");
    AdmissionError::DirectoryUnavailable(err.to_string())
}
