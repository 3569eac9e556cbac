//! In-memory course directory.

use std::collections::HashMap;

use async_trait::async_trait;
use parking_lot::RwLock;

use crate::core::{AppResult, CourseDirectory, CourseId, CourseListing};

/// Course directory backed by a map, for development and tests.
#[derive(Default)]
pub struct InMemoryCourseDirectory {
    courses: RwLock<HashMap<CourseId, CourseListing>>,
}

impl InMemoryCourseDirectory {
    /// Empty directory.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace an open course.
    pub fn open_course(&self, course_id: impl Into<CourseId>, max_capacity: u32, allow_waitlist: bool) {
        let course_id = course_id.into();
        self.upsert(CourseListing {
            course_id,
            open_for_enrollment: true,
            max_capacity,
            allow_waitlist,
        });
    }

    /// Add or replace a listing.
    pub fn upsert(&self, listing: CourseListing) {
        self.courses.write().insert(listing.course_id.clone(), listing);
    }

    /// Close enrollment for a course. Returns false if the course is unknown.
    pub fn close(&self, course_id: &str) -> bool {
        self.courses
            .write()
            .get_mut(course_id)
            .map(|l| l.open_for_enrollment = false)
            .is_some()
    }
}

#[async_trait]
impl CourseDirectory for InMemoryCourseDirectory {
    async fn lookup(&self, course_id: &str) -> AppResult<Option<CourseListing>> {
        Ok(self.courses.read().get(course_id).cloned())
    }
}
