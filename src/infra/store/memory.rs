//! In-memory course store with per-course row locking or optimistic commits.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::{Mutex, MutexGuard, RwLock};

use crate::config::{AdmissionConfig, ConcurrencyStrategy};
use crate::core::{
    AdmissionError, AdmissionStore, CapacitySnapshot, CourseCapacity, CourseId, CoursePartition,
    EnrollmentId,
};

/// One course row: the partition behind its lock plus a published capacity view.
struct CourseSlot {
    state: Mutex<CoursePartition>,
    /// Last committed capacity, readable while a transaction holds `state`.
    view: RwLock<CapacitySnapshot>,
    retired: AtomicBool,
}

/// In-memory store for development, tests, and single-process deployments.
///
/// Partitions live behind their own `parking_lot::Mutex`; the course map and
/// the enrollment index are only locked long enough to look up or insert an
/// entry, so courses never contend with each other.
pub struct InMemoryAdmissionStore {
    strategy: ConcurrencyStrategy,
    lock_timeout: Duration,
    courses: RwLock<HashMap<CourseId, Arc<CourseSlot>>>,
    enrollment_index: RwLock<HashMap<EnrollmentId, CourseId>>,
}

impl InMemoryAdmissionStore {
    /// Create a store with an explicit strategy and lock timeout.
    pub fn new(strategy: ConcurrencyStrategy, lock_timeout: Duration) -> Self {
        Self {
            strategy,
            lock_timeout,
            courses: RwLock::new(HashMap::new()),
            enrollment_index: RwLock::new(HashMap::new()),
        }
    }

    /// Create a store from configuration.
    pub fn from_config(cfg: &AdmissionConfig) -> Self {
        Self::new(cfg.concurrency, cfg.transaction_timeout())
    }

    /// Strategy this store serializes with.
    pub const fn strategy(&self) -> ConcurrencyStrategy {
        self.strategy
    }

    fn slot(&self, course_id: &str) -> Result<Arc<CourseSlot>, AdmissionError> {
        self.courses
            .read()
            .get(course_id)
            .cloned()
            .ok_or_else(|| AdmissionError::CourseUnavailable(course_id.to_owned()))
    }

    fn lock<'a>(
        &self,
        course_id: &str,
        slot: &'a CourseSlot,
    ) -> Result<MutexGuard<'a, CoursePartition>, AdmissionError> {
        slot.state.try_lock_for(self.lock_timeout).ok_or_else(|| {
            tracing::warn!(course = %course_id, timeout = ?self.lock_timeout, "course row lock timed out");
            AdmissionError::Timeout {
                course_id: course_id.to_owned(),
                waited_ms: u64::try_from(self.lock_timeout.as_millis()).unwrap_or(u64::MAX),
            }
        })
    }

    fn writable<'a>(
        &self,
        course_id: &str,
        slot: &'a CourseSlot,
    ) -> Result<MutexGuard<'a, CoursePartition>, AdmissionError> {
        let guard = self.lock(course_id, slot)?;
        if guard.is_retired() {
            return Err(AdmissionError::CourseUnavailable(course_id.to_owned()));
        }
        Ok(guard)
    }

    /// Swap a staged partition in. Caller holds the row lock.
    fn commit(
        &self,
        slot: &CourseSlot,
        guard: &mut MutexGuard<'_, CoursePartition>,
        mut staged: CoursePartition,
    ) {
        let created = staged.seal();
        let snapshot = staged.capacity().snapshot();
        if !created.is_empty() {
            let course_id = staged.course_id().to_owned();
            let mut index = self.enrollment_index.write();
            for id in created {
                index.insert(id, course_id.clone());
            }
        }
        **guard = staged;
        *slot.view.write() = snapshot;
    }
}

impl AdmissionStore for InMemoryAdmissionStore {
    fn insert_course(&self, capacity: CourseCapacity) -> Result<bool, AdmissionError> {
        let mut courses = self.courses.write();
        if let Some(existing) = courses.get(&capacity.course_id) {
            if existing.retired.load(Ordering::Acquire) {
                return Err(AdmissionError::Validation(format!(
                    "course {} was retired and cannot be republished",
                    capacity.course_id
                )));
            }
            return Ok(false);
        }
        let course_id = capacity.course_id.clone();
        let slot = CourseSlot {
            view: RwLock::new(capacity.snapshot()),
            state: Mutex::new(CoursePartition::new(capacity)),
            retired: AtomicBool::new(false),
        };
        courses.insert(course_id, Arc::new(slot));
        Ok(true)
    }

    fn transact<R, F>(&self, course_id: &str, f: F) -> Result<R, AdmissionError>
    where
        F: FnOnce(&mut CoursePartition) -> Result<R, AdmissionError>,
    {
        let slot = self.slot(course_id)?;
        match self.strategy {
            ConcurrencyStrategy::RowLock => {
                let mut guard = self.writable(course_id, &slot)?;
                let mut staged = guard.clone();
                let out = f(&mut staged)?;
                if staged.is_dirty() {
                    self.commit(&slot, &mut guard, staged);
                }
                Ok(out)
            }
            ConcurrencyStrategy::Optimistic => {
                let mut staged = self.writable(course_id, &slot)?.clone();
                let base_revision = staged.revision();
                let out = f(&mut staged)?;
                if staged.is_dirty() {
                    let mut guard = self.writable(course_id, &slot)?;
                    if guard.revision() != base_revision {
                        tracing::debug!(
                            course = %course_id,
                            base_revision,
                            current = guard.revision(),
                            "optimistic commit lost the race"
                        );
                        return Err(AdmissionError::ConcurrencyConflict {
                            course_id: course_id.to_owned(),
                            attempts: 1,
                        });
                    }
                    self.commit(&slot, &mut guard, staged);
                }
                Ok(out)
            }
        }
    }

    fn read<R, F>(&self, course_id: &str, f: F) -> Result<R, AdmissionError>
    where
        F: FnOnce(&CoursePartition) -> R,
    {
        let slot = self.slot(course_id)?;
        let guard = self.lock(course_id, &slot)?;
        Ok(f(&*guard))
    }

    fn capacity(&self, course_id: &str) -> Result<CapacitySnapshot, AdmissionError> {
        let slot = self.slot(course_id)?;
        if slot.retired.load(Ordering::Acquire) {
            return Err(AdmissionError::CourseUnavailable(course_id.to_owned()));
        }
        let view = slot.view.read().clone();
        Ok(view)
    }

    fn course_of(&self, enrollment_id: EnrollmentId) -> Result<Option<CourseId>, AdmissionError> {
        Ok(self.enrollment_index.read().get(&enrollment_id).cloned())
    }

    fn retire_course<F>(&self, course_id: &str, guard: F) -> Result<(), AdmissionError>
    where
        F: FnOnce(&CoursePartition) -> Result<(), AdmissionError>,
    {
        let slot = self.slot(course_id)?;
        let mut locked = self.writable(course_id, &slot)?;
        guard(&*locked)?;
        let mut staged = locked.clone();
        staged.retire();
        self.commit(&slot, &mut locked, staged);
        slot.retired.store(true, Ordering::Release);
        Ok(())
    }

    fn course_ids(&self) -> Vec<CourseId> {
        let mut ids: Vec<CourseId> = self
            .courses
            .read()
            .iter()
            .filter(|(_, slot)| !slot.retired.load(Ordering::Acquire))
            .map(|(id, _)| id.clone())
            .collect();
        ids.sort();
        ids
    }
}
