//! Promotion workflow: hands freed seats to the head of the waitlist.
//!
//! Each promotion is its own course transaction and re-verifies capacity and
//! the waitlist head under the row, so a concurrent admission that already
//! took the seat simply ends the loop. Conflicts restart from the ledger read.

use crate::core::admission::AdmissionController;
use crate::core::collaborators::{CourseDirectory, Notifier};
use crate::core::error::AdmissionError;
use crate::core::history::TransitionReason;
use crate::core::ledger::SeatReservation;
use crate::core::model::{Enrollment, EnrollmentStatus};
use crate::core::partition::CoursePartition;
use crate::core::store::AdmissionStore;
use crate::core::sweep::PendingNotice;
use crate::core::waitlist::WaitlistEntry;
use crate::util::clock::now_ms;

/// Outcome of one promotion step.
enum PromotionStep {
    Promoted(Enrollment),
    /// The seat was gone by the time the row was held.
    SeatTaken,
    /// The head changed (cancelled or promoted elsewhere); start over.
    HeadMoved,
    /// No free seat or nobody waiting.
    Idle,
}

impl<S, D, N> AdmissionController<S, D, N>
where
    S: AdmissionStore,
    D: CourseDirectory,
    N: Notifier,
{
    /// Promote waitlisted students into free seats, in sequence order, until
    /// the course is full or the waitlist is empty.
    ///
    /// Returns the enrollments that became active. Notification failures are
    /// queued for the sweep and do not affect the result.
    pub async fn promote(&self, course_id: &str) -> Result<Vec<Enrollment>, AdmissionError> {
        let mut promoted = Vec::new();
        loop {
            let step = self
                .with_retry(course_id, || self.promotion_step(course_id))
                .await?;
            match step {
                PromotionStep::Promoted(enrollment) => {
                    tracing::info!(
                        course = %course_id,
                        student = %enrollment.student_id,
                        enrollment = %enrollment.id,
                        "waitlisted student promoted"
                    );
                    self.deliver_notice(&enrollment).await;
                    promoted.push(enrollment);
                }
                PromotionStep::SeatTaken => {
                    tracing::debug!(course = %course_id, "freed seat already taken");
                    break;
                }
                PromotionStep::HeadMoved => {}
                PromotionStep::Idle => break,
            }
        }
        Ok(promoted)
    }

    /// Promotion after a committed seat release. Failures are logged and the
    /// course is queued for the sweep.
    pub(crate) async fn promote_after_release(&self, course_id: &str) {
        if let Err(e) = self.promote(course_id).await {
            tracing::warn!(course = %course_id, error = %e, "promotion failed; queued for retry sweep");
            self.pending_promotions.lock().insert(course_id.to_owned());
        }
    }

    pub(crate) async fn deliver_notice(&self, enrollment: &Enrollment) {
        if let Err(e) = self.notifier.notify_promoted(enrollment).await {
            tracing::warn!(
                enrollment = %enrollment.id,
                student = %enrollment.student_id,
                error = %e,
                "promotion notice not delivered; queued for retry"
            );
            self.requeue_notice(PendingNotice::new(enrollment.clone()));
        }
    }

    /// Read the ledger and waitlist head, then try to promote that head.
    /// Each call starts from committed state, so a conflict retry restarts here.
    fn promotion_step(&self, course_id: &str) -> Result<PromotionStep, AdmissionError> {
        let ledger = self.store.capacity(course_id)?;
        if ledger.is_full || ledger.waitlist_count == 0 {
            return Ok(PromotionStep::Idle);
        }
        let Some(head) = self
            .store
            .read(course_id, |p| p.waitlist().peek_head().cloned())?
        else {
            return Ok(PromotionStep::Idle);
        };
        self.store
            .transact(course_id, |p| promote_head(p, &head, now_ms()))
    }
}

fn promote_head(
    p: &mut CoursePartition,
    head: &WaitlistEntry,
    now: u128,
) -> Result<PromotionStep, AdmissionError> {
    if p.capacity().is_full() {
        return Ok(PromotionStep::SeatTaken);
    }
    if p.waitlist().peek_head().map(|e| e.id) != Some(head.id) {
        return Ok(PromotionStep::HeadMoved);
    }
    if p.capacity_mut().reserve_seat() == SeatReservation::Full {
        return Ok(PromotionStep::SeatTaken);
    }
    let enrollment = p.transition(
        head.enrollment_id,
        EnrollmentStatus::Active,
        TransitionReason::Promoted,
        now,
    )?;
    p.waitlist_mut().remove_head();
    p.capacity_mut().leave_waitlist()?;
    Ok(PromotionStep::Promoted(enrollment))
}
