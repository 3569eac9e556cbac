//! Capacity ledger: per-course seat accounting.
//!
//! The ledger is the single source of truth for how many seats are taken. Its
//! methods mutate a staged copy that belongs to an open course transaction, so
//! a seat is never reserved without the enrollment write that accompanies it.

use serde::{Deserialize, Serialize};

use crate::core::error::AdmissionError;
use crate::core::model::CourseId;

/// Outcome of [`CourseCapacity::reserve_seat`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SeatReservation {
    /// A seat was taken.
    Reserved,
    /// No seat left.
    Full,
}

/// Proof that a seat was returned to the pool.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Released {
    /// Seats in use after the release.
    pub current_enrollments: u32,
}

/// Per-course capacity row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CourseCapacity {
    /// Course this row accounts for.
    pub course_id: CourseId,
    /// Hard seat limit.
    pub max_capacity: u32,
    /// Seats currently held by active enrollments.
    pub current_enrollments: u32,
    /// Whether full courses queue new requests.
    pub allow_waitlist: bool,
    /// Number of waitlist entries.
    pub waitlist_count: u32,
    /// Bumped on every mutation.
    pub version: u64,
}

impl CourseCapacity {
    /// Fresh, empty ledger row.
    pub fn new(
        course_id: impl Into<CourseId>,
        max_capacity: u32,
        allow_waitlist: bool,
    ) -> Result<Self, AdmissionError> {
        let course_id = course_id.into();
        if max_capacity == 0 {
            return Err(AdmissionError::Validation(format!(
                "course {course_id}: max_capacity must be greater than 0"
            )));
        }
        Ok(Self {
            course_id,
            max_capacity,
            current_enrollments: 0,
            allow_waitlist,
            waitlist_count: 0,
            version: 0,
        })
    }

    /// Seats still free.
    pub const fn available(&self) -> u32 {
        self.max_capacity.saturating_sub(self.current_enrollments)
    }

    /// True when no seat is left.
    pub const fn is_full(&self) -> bool {
        self.current_enrollments >= self.max_capacity
    }

    /// Take one seat if one is free.
    pub fn reserve_seat(&mut self) -> SeatReservation {
        if self.is_full() {
            return SeatReservation::Full;
        }
        self.current_enrollments += 1;
        self.version += 1;
        SeatReservation::Reserved
    }

    /// Return one seat.
    ///
    /// Releasing with no seat taken means the ledger and the enrollment rows
    /// have drifted apart; the enclosing transaction must abort.
    pub fn release_seat(&mut self) -> Result<Released, AdmissionError> {
        if self.current_enrollments == 0 {
            tracing::error!(course = %self.course_id, "release_seat called with no seats taken");
            return Err(AdmissionError::LedgerDrift(format!(
                "course {}: release with current_enrollments == 0",
                self.course_id
            )));
        }
        self.current_enrollments -= 1;
        self.version += 1;
        Ok(Released {
            current_enrollments: self.current_enrollments,
        })
    }

    /// Account for a new waitlist entry.
    pub fn join_waitlist(&mut self) {
        self.waitlist_count += 1;
        self.version += 1;
    }

    /// Account for a removed waitlist entry.
    pub fn leave_waitlist(&mut self) -> Result<(), AdmissionError> {
        if self.waitlist_count == 0 {
            tracing::error!(course = %self.course_id, "leave_waitlist called on empty count");
            return Err(AdmissionError::LedgerDrift(format!(
                "course {}: waitlist_count would go negative",
                self.course_id
            )));
        }
        self.waitlist_count -= 1;
        self.version += 1;
        Ok(())
    }

    /// Change the seat limit. Shrinking below the seats in use is refused.
    pub fn resize(&mut self, max_capacity: u32) -> Result<(), AdmissionError> {
        if max_capacity == 0 || max_capacity < self.current_enrollments {
            return Err(AdmissionError::Validation(format!(
                "course {}: max_capacity {max_capacity} must be > 0 and >= {} enrolled",
                self.course_id, self.current_enrollments
            )));
        }
        if max_capacity != self.max_capacity {
            self.max_capacity = max_capacity;
            self.version += 1;
        }
        Ok(())
    }

    /// Read-only view for the capacity endpoint.
    pub fn snapshot(&self) -> CapacitySnapshot {
        CapacitySnapshot {
            course_id: self.course_id.clone(),
            max_capacity: self.max_capacity,
            current_enrollments: self.current_enrollments,
            available_spots: self.available(),
            is_full: self.is_full(),
            allow_waitlist: self.allow_waitlist,
            waitlist_count: self.waitlist_count,
            version: self.version,
        }
    }
}

/// Capacity figures as reported to readers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CapacitySnapshot {
    /// Course identifier.
    pub course_id: CourseId,
    /// Hard seat limit.
    pub max_capacity: u32,
    /// Seats in use.
    pub current_enrollments: u32,
    /// Seats free.
    pub available_spots: u32,
    /// No seat free.
    pub is_full: bool,
    /// Waitlist enabled.
    pub allow_waitlist: bool,
    /// Waitlist length.
    pub waitlist_count: u32,
    /// Ledger version at snapshot time.
    pub version: u64,
}
