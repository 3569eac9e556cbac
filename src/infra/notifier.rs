//! In-memory promotion notifier.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, Ordering};

use async_trait::async_trait;
use parking_lot::Mutex;

use crate::core::{AppResult, CourseId, Enrollment, EnrollmentId, Notifier, StudentId};
use crate::util::clock::now_ms;

/// A delivered promotion notice.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PromotionNotice {
    /// Promoted enrollment.
    pub enrollment_id: EnrollmentId,
    /// Course the seat is in.
    pub course_id: CourseId,
    /// Delivery time (ms since epoch).
    pub delivered_at_ms: u128,
}

/// Notifier that stores notices per student, for development and tests.
#[derive(Default)]
pub struct InMemoryNotifier {
    notices: Mutex<HashMap<StudentId, Vec<PromotionNotice>>>,
    failures_remaining: AtomicU32,
}

impl InMemoryNotifier {
    /// Notifier that always delivers.
    pub fn new() -> Self {
        Self::default()
    }

    /// Make the next `count` deliveries fail.
    pub fn fail_next(&self, count: u32) {
        self.failures_remaining.store(count, Ordering::Release);
    }

    /// Notices delivered to a student, oldest first.
    pub fn fetch(&self, student_id: &str) -> Vec<PromotionNotice> {
        self.notices
            .lock()
            .get(student_id)
            .cloned()
            .unwrap_or_default()
    }

    /// Total notices delivered.
    pub fn delivered(&self) -> usize {
        self.notices.lock().values().map(Vec::len).sum()
    }
}

#[async_trait]
impl Notifier for InMemoryNotifier {
    async fn notify_promoted(&self, enrollment: &Enrollment) -> AppResult<()> {
        let failing = self
            .failures_remaining
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |n| n.checked_sub(1))
            .is_ok();
        if failing {
            anyhow::bail!("notification channel unavailable for {}", enrollment.student_id);
        }
        self.notices
            .lock()
            .entry(enrollment.student_id.clone())
            .or_default()
            .push(PromotionNotice {
                enrollment_id: enrollment.id,
                course_id: enrollment.course_id.clone(),
                delivered_at_ms: now_ms(),
            });
        Ok(())
    }
}
