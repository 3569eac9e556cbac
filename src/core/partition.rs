//! Course partition: everything one course transaction may touch.
//!
//! A partition is split in two. The working set (ledger row, live enrollments,
//! the live index, the waitlist) is bounded by seats plus waiters and is what a
//! store copies to stage a transaction. The archive (settled enrollments and the
//! status history) is shared between a partition and its staged copies and only
//! grows when a staged copy is sealed for commit. Rows a transaction settles and
//! the history records it writes wait in the staged copy until then, so an
//! aborted transaction leaves no trace and staging never copies history.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::core::error::AdmissionError;
use crate::core::history::{HistoryLog, HistoryRecord, TransitionReason};
use crate::core::ledger::CourseCapacity;
use crate::core::model::{CourseId, Enrollment, EnrollmentId, EnrollmentStatus, StudentId};
use crate::core::waitlist::WaitlistQueue;

/// Result of comparing ledger counters with the rows they summarize.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReconciliationReport {
    /// Course checked.
    pub course_id: CourseId,
    /// Ledger `current_enrollments`.
    pub ledger_current: u32,
    /// Enrollment rows with status `active`.
    pub active_rows: u32,
    /// Ledger `waitlist_count`.
    pub ledger_waitlist: u32,
    /// Waitlist entries present.
    pub waitlist_entries: u32,
    /// Enrollment rows with status `waitlisted`.
    pub waitlisted_rows: u32,
}

impl ReconciliationReport {
    /// True when all counters agree.
    pub const fn is_consistent(&self) -> bool {
        self.ledger_current == self.active_rows
            && self.ledger_waitlist == self.waitlist_entries
            && self.waitlist_entries == self.waitlisted_rows
    }
}

/// Committed rows that can no longer change.
#[derive(Debug, Default)]
struct CourseArchive {
    settled: HashMap<EnrollmentId, Enrollment>,
    history: HistoryLog,
}

/// All state owned by a single course.
#[derive(Debug, Clone)]
pub struct CoursePartition {
    capacity: CourseCapacity,
    live_rows: HashMap<EnrollmentId, Enrollment>,
    live: HashMap<StudentId, EnrollmentId>,
    waitlist: WaitlistQueue,
    archive: Arc<RwLock<CourseArchive>>,
    pending_settled: Vec<Enrollment>,
    pending_history: Vec<HistoryRecord>,
    revision: u64,
    retired: bool,
    dirty: bool,
    created: Vec<EnrollmentId>,
}

impl CoursePartition {
    /// Partition for a freshly published course.
    pub fn new(capacity: CourseCapacity) -> Self {
        let waitlist = WaitlistQueue::new(capacity.course_id.clone());
        Self {
            capacity,
            live_rows: HashMap::new(),
            live: HashMap::new(),
            waitlist,
            archive: Arc::new(RwLock::new(CourseArchive::default())),
            pending_settled: Vec::new(),
            pending_history: Vec::new(),
            revision: 0,
            retired: false,
            dirty: false,
            created: Vec::new(),
        }
    }

    /// Course identifier.
    pub fn course_id(&self) -> &str {
        &self.capacity.course_id
    }

    /// Ledger row.
    pub const fn capacity(&self) -> &CourseCapacity {
        &self.capacity
    }

    /// Ledger row for mutation.
    pub fn capacity_mut(&mut self) -> &mut CourseCapacity {
        self.dirty = true;
        &mut self.capacity
    }

    /// Waitlist.
    pub const fn waitlist(&self) -> &WaitlistQueue {
        &self.waitlist
    }

    /// Waitlist for mutation.
    pub fn waitlist_mut(&mut self) -> &mut WaitlistQueue {
        self.dirty = true;
        &mut self.waitlist
    }

    /// Enrollment by id, live or settled.
    pub fn enrollment(&self, id: EnrollmentId) -> Option<Enrollment> {
        if let Some(e) = self.live_rows.get(&id) {
            return Some(e.clone());
        }
        if let Some(e) = self.pending_settled.iter().rev().find(|e| e.id == id) {
            return Some(e.clone());
        }
        self.archive.read().settled.get(&id).cloned()
    }

    /// The student's active or waitlisted enrollment, if any.
    pub fn live_enrollment(&self, student_id: &str) -> Option<&Enrollment> {
        self.live
            .get(student_id)
            .and_then(|id| self.live_rows.get(id))
    }

    /// Active and waitlisted enrollments.
    pub fn live_enrollments(&self) -> impl Iterator<Item = &Enrollment> {
        self.live_rows.values()
    }

    /// Every enrollment ever created for this course.
    pub fn enrollments(&self) -> Vec<Enrollment> {
        let archive = self.archive.read();
        self.live_rows
            .values()
            .chain(self.pending_settled.iter())
            .chain(archive.settled.values())
            .cloned()
            .collect()
    }

    /// Create an enrollment in an initial status and record its first transition.
    pub fn open_enrollment(
        &mut self,
        student_id: &str,
        status: EnrollmentStatus,
        reason: TransitionReason,
        now_ms: u128,
    ) -> Result<Enrollment, AdmissionError> {
        let id = Uuid::new_v4();
        if !status.is_initial() {
            tracing::error!(course = %self.course_id(), %status, "enrollment opened in non-initial status");
            return Err(AdmissionError::InvalidTransition {
                enrollment_id: id,
                from: None,
                to: status,
            });
        }
        if status.is_live() {
            if let Some(existing) = self.live_enrollment(student_id) {
                tracing::error!(
                    course = %self.course_id(),
                    student = %student_id,
                    enrollment = %existing.id,
                    "second live enrollment attempted"
                );
                return Err(AdmissionError::InvalidTransition {
                    enrollment_id: existing.id,
                    from: Some(existing.status),
                    to: status,
                });
            }
        }

        let enrollment = Enrollment {
            id,
            student_id: student_id.to_owned(),
            course_id: self.capacity.course_id.clone(),
            status,
            enrolled_at_ms: now_ms,
            status_changed_at_ms: now_ms,
        };
        if status.is_live() {
            self.live.insert(enrollment.student_id.clone(), id);
            self.live_rows.insert(id, enrollment.clone());
        } else {
            self.pending_settled.push(enrollment.clone());
        }
        self.pending_history.push(HistoryRecord::new(
            id,
            &self.capacity.course_id,
            None,
            status,
            reason,
            now_ms,
        ));
        self.created.push(id);
        self.dirty = true;
        Ok(enrollment)
    }

    /// Move an enrollment along the state machine and record the change.
    ///
    /// Settled enrollments have no outgoing transitions, so only live rows can
    /// change; a settled row reaching here is reported with its final status.
    pub fn transition(
        &mut self,
        id: EnrollmentId,
        to: EnrollmentStatus,
        reason: TransitionReason,
        now_ms: u128,
    ) -> Result<Enrollment, AdmissionError> {
        if !self.live_rows.contains_key(&id) {
            return Err(match self.enrollment(id) {
                Some(settled) => illegal_transition(&settled.course_id, id, settled.status, to),
                None => AdmissionError::EnrollmentNotFound(id),
            });
        }
        let enrollment = self
            .live_rows
            .get_mut(&id)
            .ok_or(AdmissionError::EnrollmentNotFound(id))?;
        let from = enrollment.status;
        if !from.can_transition_to(to) {
            return Err(illegal_transition(&self.capacity.course_id, id, from, to));
        }

        enrollment.status = to;
        enrollment.status_changed_at_ms = now_ms;
        let updated = enrollment.clone();
        if !to.is_live() {
            self.live.remove(&updated.student_id);
            self.live_rows.remove(&id);
            self.pending_settled.push(updated.clone());
        }
        self.pending_history.push(HistoryRecord::new(
            id,
            &self.capacity.course_id,
            Some(from),
            to,
            reason,
            now_ms,
        ));
        self.dirty = true;
        Ok(updated)
    }

    /// History for one enrollment, oldest first.
    pub fn history_for(&self, id: EnrollmentId) -> Vec<HistoryRecord> {
        let mut records = self.archive.read().history.for_enrollment(id);
        records.extend(
            self.pending_history
                .iter()
                .filter(|r| r.enrollment_id == id)
                .cloned(),
        );
        records
    }

    /// Number of history records for the whole course.
    pub fn history_len(&self) -> usize {
        self.archive.read().history.len() + self.pending_history.len()
    }

    /// Compare ledger counters against the rows.
    pub fn reconcile(&self) -> ReconciliationReport {
        let count = |status: EnrollmentStatus| {
            u32::try_from(
                self.live_rows
                    .values()
                    .filter(|e| e.status == status)
                    .count(),
            )
            .unwrap_or(u32::MAX)
        };
        ReconciliationReport {
            course_id: self.capacity.course_id.clone(),
            ledger_current: self.capacity.current_enrollments,
            active_rows: count(EnrollmentStatus::Active),
            ledger_waitlist: self.capacity.waitlist_count,
            waitlist_entries: u32::try_from(self.waitlist.len()).unwrap_or(u32::MAX),
            waitlisted_rows: count(EnrollmentStatus::Waitlisted),
        }
    }

    /// Number of live enrollments.
    pub fn live_count(&self) -> usize {
        self.live.len()
    }

    /// Rows a staged copy duplicates: live enrollments plus waitlist entries.
    pub fn working_set_len(&self) -> usize {
        self.live_rows.len() + self.waitlist.len()
    }

    /// Commit counter maintained by the store.
    pub const fn revision(&self) -> u64 {
        self.revision
    }

    /// Whether the course was retired; retired partitions accept no writes.
    pub const fn is_retired(&self) -> bool {
        self.retired
    }

    /// Whether this staged copy holds uncommitted writes.
    pub const fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Seal a staged copy for commit: move settled rows and history into the
    /// archive, bump the revision, clear the dirty flag, and hand back the
    /// enrollments created since the last commit.
    ///
    /// Stores call this only while holding the course row.
    pub fn seal(&mut self) -> Vec<EnrollmentId> {
        if !self.pending_settled.is_empty() || !self.pending_history.is_empty() {
            let mut archive = self.archive.write();
            for e in self.pending_settled.drain(..) {
                archive.settled.insert(e.id, e);
            }
            archive.history.append(self.pending_history.drain(..));
        }
        self.revision += 1;
        self.dirty = false;
        std::mem::take(&mut self.created)
    }

    /// Mark the course retired.
    pub fn retire(&mut self) {
        self.retired = true;
        self.dirty = true;
    }
}

fn illegal_transition(
    course_id: &str,
    id: EnrollmentId,
    from: EnrollmentStatus,
    to: EnrollmentStatus,
) -> AdmissionError {
    tracing::error!(
        course = %course_id,
        enrollment = %id,
        %from,
        %to,
        "illegal enrollment transition"
    );
    AdmissionError::InvalidTransition {
        enrollment_id: id,
        from: Some(from),
        to,
    }
}
