//! Per-course FIFO waitlist.
//!
//! Entries are ordered by a sequence number drawn from a per-course counter that
//! lives inside the course transaction. Wall-clock time plays no part.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::core::model::{CourseId, EnrollmentId, StudentId};

/// A waitlisted enrollment's place in line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WaitlistEntry {
    /// Entry identifier.
    pub id: Uuid,
    /// Course waited on.
    pub course_id: CourseId,
    /// Waiting student.
    pub student_id: StudentId,
    /// Enrollment in `waitlisted` status backing this entry.
    pub enrollment_id: EnrollmentId,
    /// FIFO key; strictly increasing per course.
    pub sequence_number: u64,
}

/// Ordered waitlist for one course.
#[derive(Debug, Clone)]
pub struct WaitlistQueue {
    course_id: CourseId,
    next_sequence: u64,
    entries: BTreeMap<u64, WaitlistEntry>,
}

impl WaitlistQueue {
    /// Empty queue; the first entry gets sequence number 1.
    pub fn new(course_id: impl Into<CourseId>) -> Self {
        Self {
            course_id: course_id.into(),
            next_sequence: 1,
            entries: BTreeMap::new(),
        }
    }

    /// Append a student and return the new entry.
    pub fn push(&mut self, student_id: &str, enrollment_id: EnrollmentId) -> WaitlistEntry {
        let sequence_number = self.next_sequence;
        self.next_sequence += 1;
        let entry = WaitlistEntry {
            id: Uuid::new_v4(),
            course_id: self.course_id.clone(),
            student_id: student_id.to_owned(),
            enrollment_id,
            sequence_number,
        };
        self.entries.insert(sequence_number, entry.clone());
        entry
    }

    /// Longest-waiting entry.
    pub fn peek_head(&self) -> Option<&WaitlistEntry> {
        self.entries.values().next()
    }

    /// Remove and return the longest-waiting entry.
    pub fn remove_head(&mut self) -> Option<WaitlistEntry> {
        self.entries.pop_first().map(|(_, entry)| entry)
    }

    /// Remove the entry backing `enrollment_id`, wherever it sits.
    pub fn remove(&mut self, enrollment_id: EnrollmentId) -> Option<WaitlistEntry> {
        let seq = self
            .entries
            .iter()
            .find(|(_, e)| e.enrollment_id == enrollment_id)
            .map(|(seq, _)| *seq)?;
        self.entries.remove(&seq)
    }

    /// 1-based position of `enrollment_id` in line.
    pub fn position_of(&self, enrollment_id: EnrollmentId) -> Option<usize> {
        self.entries
            .values()
            .position(|e| e.enrollment_id == enrollment_id)
            .map(|p| p + 1)
    }

    /// Entries in promotion order.
    pub fn entries(&self) -> Vec<WaitlistEntry> {
        self.entries.values().cloned().collect()
    }

    /// Number of waiting entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True when nobody is waiting.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Sequence number the next entry will receive.
    pub const fn next_sequence(&self) -> u64 {
        self.next_sequence
    }
}
