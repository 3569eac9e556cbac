//! Tests for the framework-agnostic API handlers

use course_admission::builders::build_in_memory;
use course_admission::config::AdmissionConfig;
use course_admission::core::AdmissionController;
use course_admission::infra::{InMemoryAdmissionStore, InMemoryCourseDirectory, InMemoryNotifier};
use course_admission::runtime::{
    cancel_waitlisted, delete_enrollment, get_capacity, get_waitlist, health, post_enrollment,
    CallerRole,
};
use serde_json::json;

type Controller = AdmissionController<InMemoryAdmissionStore, InMemoryCourseDirectory, InMemoryNotifier>;

async fn controller(max: u32, allow_waitlist: bool) -> Controller {
    let directory = InMemoryCourseDirectory::new();
    directory.open_course("rust-101", max, allow_waitlist);
    let controller =
        build_in_memory(&AdmissionConfig::default(), directory, InMemoryNotifier::new()).unwrap();
    controller.publish_course("rust-101").await.unwrap();
    controller
}

fn body() -> String {
    json!({ "courseId": "rust-101" }).to_string()
}

#[tokio::test]
async fn test_post_enrollment_created_then_duplicate() {
    let c = controller(1, true).await;

    let first = post_enrollment(&c, "s1", &body()).await;
    assert_eq!(first.status, 201);
    assert_eq!(first.body["status"], "active");
    assert!(first.body.get("waitlistPosition").is_none());

    let again = post_enrollment(&c, "s1", &body()).await;
    assert_eq!(again.status, 200);
    assert_eq!(again.body["enrollmentId"], first.body["enrollmentId"]);

    let waiting = post_enrollment(&c, "s2", &body()).await;
    assert_eq!(waiting.status, 201);
    assert_eq!(waiting.body["status"], "waitlisted");
    assert_eq!(waiting.body["waitlistPosition"], 1);
}

#[tokio::test]
async fn test_post_enrollment_capacity_exceeded() {
    let c = controller(1, false).await;
    assert_eq!(post_enrollment(&c, "s1", &body()).await.status, 201);

    let rejected = post_enrollment(&c, "s2", &body()).await;
    assert_eq!(rejected.status, 422);
    assert_eq!(rejected.body["reason"], "capacity_exceeded");
    assert_eq!(rejected.body["retryable"], false);
    assert_eq!(rejected.retry_after_secs, None);
}

#[tokio::test]
async fn test_post_enrollment_bad_input() {
    let c = controller(1, true).await;
    assert_eq!(post_enrollment(&c, "s1", "{").await.status, 400);
    assert_eq!(post_enrollment(&c, "", &body()).await.status, 400);

    let unknown = post_enrollment(&c, "s1", &json!({ "courseId": "nope" }).to_string()).await;
    assert_eq!(unknown.status, 422);
    assert_eq!(unknown.body["reason"], "course_unavailable");
}

#[tokio::test]
async fn test_delete_and_cancel_handlers() {
    let c = controller(1, true).await;
    let active = post_enrollment(&c, "s1", &body()).await;
    let waiting = post_enrollment(&c, "s2", &body()).await;
    let active_id = active.body["enrollmentId"].as_str().unwrap().to_string();
    let waiting_id = waiting.body["enrollmentId"].as_str().unwrap().to_string();

    // Cancelling an active seat is not a waitlist cancel.
    let wrong = cancel_waitlisted(&c, &active_id).await;
    assert_eq!(wrong.status, 409);

    let dropped = delete_enrollment(&c, &active_id).await;
    assert_eq!(dropped.status, 200);
    assert_eq!(dropped.body["status"], "dropped");

    // s2 was promoted by the drop, so it can no longer be cancelled.
    assert_eq!(cancel_waitlisted(&c, &waiting_id).await.status, 409);
    assert_eq!(delete_enrollment(&c, &active_id).await.status, 409);
    assert_eq!(delete_enrollment(&c, "not-a-uuid").await.status, 400);
    assert_eq!(
        delete_enrollment(&c, "00000000-0000-0000-0000-000000000000")
            .await
            .status,
        404
    );
}

#[tokio::test]
async fn test_capacity_and_waitlist_views() {
    let c = controller(1, true).await;
    post_enrollment(&c, "s1", &body()).await;
    post_enrollment(&c, "s2", &body()).await;
    post_enrollment(&c, "s3", &body()).await;

    let cap = get_capacity(&c, "rust-101");
    assert_eq!(cap.status, 200);
    assert_eq!(cap.body["maxCapacity"], 1);
    assert_eq!(cap.body["currentEnrollments"], 1);
    assert_eq!(cap.body["availableSpots"], 0);
    assert_eq!(cap.body["isFull"], true);
    assert_eq!(cap.body["waitlistCount"], 2);
    assert_eq!(get_capacity(&c, "nope").status, 422);

    assert_eq!(get_waitlist(&c, CallerRole::Student, "rust-101").status, 403);
    let list = get_waitlist(&c, CallerRole::Instructor, "rust-101");
    assert_eq!(list.status, 200);
    let entries = list.body.as_array().unwrap();
    assert_eq!(entries.len(), 2);
    assert_eq!(entries[0]["studentId"], "s2");
    assert_eq!(entries[1]["studentId"], "s3");
    assert!(entries[0]["sequenceNumber"].as_u64() < entries[1]["sequenceNumber"].as_u64());
}

#[test]
fn test_health() {
    assert!(health().ok);
}
