//! Tests for controller builders

use std::sync::Arc;
use std::time::Duration;

use course_admission::builders::{build_controller, build_in_memory};
use course_admission::config::{AdmissionConfig, ConcurrencyStrategy, RetryPolicy};
use course_admission::infra::{InMemoryAdmissionStore, InMemoryCourseDirectory, InMemoryNotifier};

#[test]
fn test_build_in_memory_uses_configured_strategy() {
    let cfg = AdmissionConfig {
        concurrency: ConcurrencyStrategy::Optimistic,
        ..AdmissionConfig::default()
    };
    let controller =
        build_in_memory(&cfg, InMemoryCourseDirectory::new(), InMemoryNotifier::new()).unwrap();
    assert_eq!(controller.store().strategy(), ConcurrencyStrategy::Optimistic);
    assert_eq!(controller.config(), &cfg);
}

#[test]
fn test_build_rejects_invalid_config() {
    let cfg = AdmissionConfig {
        retry: RetryPolicy {
            max_attempts: 0,
            ..RetryPolicy::default()
        },
        ..AdmissionConfig::default()
    };
    let result = build_in_memory(&cfg, InMemoryCourseDirectory::new(), InMemoryNotifier::new());
    assert!(result.is_err());
}

#[tokio::test]
async fn test_build_over_shared_store() {
    let store = Arc::new(InMemoryAdmissionStore::new(
        ConcurrencyStrategy::RowLock,
        Duration::from_millis(500),
    ));
    let directory = InMemoryCourseDirectory::new();
    directory.open_course("rust-101", 10, true);
    let controller = build_controller(
        &AdmissionConfig::default(),
        Arc::clone(&store),
        directory,
        InMemoryNotifier::new(),
    )
    .unwrap();

    controller.publish_course("rust-101").await.unwrap();
    assert!(Arc::ptr_eq(controller.store(), &store));
}
