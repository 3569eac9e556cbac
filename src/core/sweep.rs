//! Background retry sweep for promotions and promotion notices.
//!
//! Drops never fail because promotion failed; instead the course is queued
//! here. The sweep also scans every course for a free seat with a non-empty
//! waitlist, which covers promotions lost to a crash between the drop commit
//! and the promotion transaction.

use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::core::admission::AdmissionController;
use crate::core::collaborators::{CourseDirectory, Notifier};
use crate::core::error::AdmissionError;
use crate::core::model::{CourseId, Enrollment};
use crate::core::store::AdmissionStore;

/// Abstraction for spawning background work on a runtime.
pub trait Spawn {
    /// Spawn a detached future.
    fn spawn<F>(&self, fut: F)
    where
        F: Future<Output = ()> + Send + 'static;
}

/// A promotion notice waiting to be redelivered.
#[derive(Debug, Clone)]
pub struct PendingNotice {
    /// Promoted enrollment.
    pub enrollment: Enrollment,
    /// Delivery attempts so far.
    pub attempts: u32,
}

impl PendingNotice {
    pub(crate) const fn new(enrollment: Enrollment) -> Self {
        Self {
            enrollment,
            attempts: 1,
        }
    }
}

/// What one sweep pass did.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SweepReport {
    /// Courses examined for promotion.
    pub courses_checked: usize,
    /// Students promoted during the pass.
    pub promoted: usize,
    /// Courses whose promotion failed again.
    pub promotions_failed: usize,
    /// Notices delivered on retry.
    pub notices_delivered: usize,
    /// Notices still undelivered after the pass.
    pub notices_pending: usize,
    /// Notices given up on during the pass.
    pub notices_abandoned: usize,
}

/// Stops a sweeper started by [`AdmissionController::spawn_sweeper`].
#[derive(Debug, Clone)]
pub struct SweeperHandle {
    shutdown: Arc<AtomicBool>,
}

impl SweeperHandle {
    /// Ask the sweeper to exit after its current pass.
    pub fn shutdown(&self) {
        self.shutdown.store(true, Ordering::Release);
    }

    /// Whether shutdown was requested.
    pub fn is_shutdown(&self) -> bool {
        self.shutdown.load(Ordering::Acquire)
    }
}

impl<S, D, N> AdmissionController<S, D, N>
where
    S: AdmissionStore,
    D: CourseDirectory,
    N: Notifier,
{
    /// Courses queued for a promotion retry.
    pub fn pending_promotions(&self) -> Vec<CourseId> {
        self.pending_promotions.lock().iter().cloned().collect()
    }

    /// Number of undelivered promotion notices.
    pub fn pending_notices(&self) -> usize {
        self.pending_notices.lock().len()
    }

    /// Promotion notices given up on since the controller started.
    pub fn abandoned_notices(&self) -> u64 {
        self.abandoned_notices.load(Ordering::Relaxed)
    }

    /// Queue an undelivered notice for the next sweep.
    ///
    /// Returns `false` when the notice is abandoned instead: it has used up
    /// `notice_max_attempts`, or the queue already holds `max_pending_notices`.
    pub(crate) fn requeue_notice(&self, notice: PendingNotice) -> bool {
        let exhausted = notice.attempts >= self.config.notice_max_attempts;
        let queued = {
            let mut queue = self.pending_notices.lock();
            if !exhausted && queue.len() < self.config.max_pending_notices {
                queue.push_back(notice);
                return true;
            }
            queue.len()
        };
        self.abandoned_notices.fetch_add(1, Ordering::Relaxed);
        tracing::error!(
            enrollment = %notice.enrollment.id,
            student = %notice.enrollment.student_id,
            course = %notice.enrollment.course_id,
            attempts = notice.attempts,
            queued,
            "promotion notice abandoned"
        );
        false
    }

    /// Run one sweep pass.
    pub async fn sweep(&self) -> SweepReport {
        let mut report = SweepReport::default();

        let mut candidates = std::mem::take(&mut *self.pending_promotions.lock());
        for course_id in self.store.course_ids() {
            if let Ok(cap) = self.store.capacity(&course_id) {
                if cap.available_spots > 0 && cap.waitlist_count > 0 {
                    candidates.insert(course_id);
                }
            }
        }

        for course_id in candidates {
            report.courses_checked += 1;
            match self.promote(&course_id).await {
                Ok(promoted) => report.promoted += promoted.len(),
                Err(AdmissionError::CourseUnavailable(_)) => {
                    tracing::debug!(course = %course_id, "dropping promotion retry for unavailable course");
                }
                Err(e) => {
                    report.promotions_failed += 1;
                    tracing::warn!(course = %course_id, error = %e, "promotion retry failed");
                    self.pending_promotions.lock().insert(course_id);
                }
            }
        }

        let notices = std::mem::take(&mut *self.pending_notices.lock());
        for mut notice in notices {
            match self.notifier.notify_promoted(&notice.enrollment).await {
                Ok(()) => report.notices_delivered += 1,
                Err(e) => {
                    notice.attempts += 1;
                    tracing::warn!(
                        enrollment = %notice.enrollment.id,
                        attempts = notice.attempts,
                        error = %e,
                        "promotion notice still undeliverable"
                    );
                    if !self.requeue_notice(notice) {
                        report.notices_abandoned += 1;
                    }
                }
            }
        }
        report.notices_pending = self.pending_notices();

        if report.promoted > 0
            || report.notices_delivered > 0
            || report.promotions_failed > 0
            || report.notices_abandoned > 0
        {
            tracing::info!(?report, "retry sweep finished");
        }
        report
    }

    /// Run [`Self::sweep`] every `sweep_interval_secs` until the handle is shut down.
    pub fn spawn_sweeper<Sp: Spawn>(self: &Arc<Self>, spawner: &Sp) -> SweeperHandle {
        let controller = Arc::clone(self);
        let handle = SweeperHandle {
            shutdown: Arc::new(AtomicBool::new(false)),
        };
        let stop = handle.clone();
        let period = self.config.sweep_interval();
        spawner.spawn(async move {
            let mut ticker = tokio::time::interval(period);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            ticker.tick().await;
            loop {
                ticker.tick().await;
                if stop.is_shutdown() {
                    break;
                }
                controller.sweep().await;
            }
            tracing::info!("retry sweeper stopped");
        });
        handle
    }
}
