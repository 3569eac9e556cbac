//! Tests for the in-memory collaborators

use course_admission::core::{CourseDirectory, Enrollment, EnrollmentStatus, Notifier};
use course_admission::infra::{InMemoryCourseDirectory, InMemoryNotifier};
use uuid::Uuid;

fn promoted(student: &str) -> Enrollment {
    Enrollment {
        id: Uuid::new_v4(),
        student_id: student.to_string(),
        course_id: "rust-101".to_string(),
        status: EnrollmentStatus::Active,
        enrolled_at_ms: 1,
        status_changed_at_ms: 2,
    }
}

#[tokio::test]
async fn test_notices_are_kept_per_student() {
    let notifier = InMemoryNotifier::new();
    let first = promoted("s1");
    notifier.notify_promoted(&first).await.unwrap();
    notifier.notify_promoted(&promoted("s2")).await.unwrap();

    let notices = notifier.fetch("s1");
    assert_eq!(notices.len(), 1);
    assert_eq!(notices[0].enrollment_id, first.id);
    assert_eq!(notices[0].course_id, "rust-101");
    assert_eq!(notifier.delivered(), 2);
    assert!(notifier.fetch("nobody").is_empty());
}

#[tokio::test]
async fn test_fail_next_budget() {
    let notifier = InMemoryNotifier::new();
    notifier.fail_next(2);
    let e = promoted("s1");
    assert!(notifier.notify_promoted(&e).await.is_err());
    assert!(notifier.notify_promoted(&e).await.is_err());
    assert!(notifier.notify_promoted(&e).await.is_ok());
    assert_eq!(notifier.delivered(), 1);
}

#[tokio::test]
async fn test_directory_upsert_replaces_listing() {
    let directory = InMemoryCourseDirectory::new();
    directory.open_course("rust-101", 10, false);
    directory.open_course("rust-101", 25, true);
    let listing = directory.lookup("rust-101").await.unwrap().unwrap();
    assert_eq!(listing.max_capacity, 25);
    assert!(listing.allow_waitlist);
}
