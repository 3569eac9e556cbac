//! Postgres schema for the relational store of record.
//!
//! The in-memory store mirrors these tables one-to-one: the `course_capacity`
//! row is the lock target (`SELECT ... FOR UPDATE`) or the optimistic version
//! check (`UPDATE ... WHERE version = $n`), and every other write of a course
//! transaction happens while that row is held.

/// Postgres schema definitions.
pub struct PostgresSchema;

impl PostgresSchema {
    /// Migration statements, in order.
    pub fn migrations() -> &'static [&'static str] {
        &[
            r"
CREATE TABLE IF NOT EXISTS course_capacity (
    course_id TEXT PRIMARY KEY,
    max_capacity INT NOT NULL CHECK (max_capacity > 0),
    current_enrollments INT NOT NULL DEFAULT 0
        CHECK (current_enrollments >= 0 AND current_enrollments <= max_capacity),
    allow_waitlist BOOLEAN NOT NULL DEFAULT TRUE,
    waitlist_count INT NOT NULL DEFAULT 0 CHECK (waitlist_count >= 0),
    next_waitlist_sequence BIGINT NOT NULL DEFAULT 1,
    version BIGINT NOT NULL DEFAULT 0,
    retired BOOLEAN NOT NULL DEFAULT FALSE
);
",
            r"
CREATE TABLE IF NOT EXISTS enrollments (
    id UUID PRIMARY KEY,
    student_id TEXT NOT NULL,
    course_id TEXT NOT NULL REFERENCES course_capacity (course_id),
    status TEXT NOT NULL
        CHECK (status IN ('active', 'waitlisted', 'completed', 'dropped', 'cancelled', 'rejected')),
    enrolled_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
    status_changed_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
);
CREATE UNIQUE INDEX IF NOT EXISTS uq_enrollments_live
    ON enrollments (student_id, course_id) WHERE status IN ('active', 'waitlisted');
CREATE INDEX IF NOT EXISTS idx_enrollments_course_status ON enrollments (course_id, status);
",
            r"
CREATE TABLE IF NOT EXISTS waitlist_entries (
    id UUID PRIMARY KEY,
    course_id TEXT NOT NULL REFERENCES course_capacity (course_id),
    student_id TEXT NOT NULL,
    enrollment_id UUID NOT NULL UNIQUE REFERENCES enrollments (id),
    sequence_number BIGINT NOT NULL,
    UNIQUE (course_id, sequence_number)
);
",
            r"
CREATE TABLE IF NOT EXISTS enrollment_history (
    id UUID PRIMARY KEY,
    enrollment_id UUID NOT NULL REFERENCES enrollments (id),
    course_id TEXT NOT NULL,
    previous_status TEXT,
    new_status TEXT NOT NULL,
    reason TEXT NOT NULL,
    created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
);
CREATE INDEX IF NOT EXISTS idx_enrollment_history_enrollment
    ON enrollment_history (enrollment_id, created_at);
",
        ]
    }
}
