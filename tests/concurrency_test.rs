//! Same-course contention tests for both concurrency strategies.
//!
//! Every test runs on a multi-threaded runtime with requests spawned as
//! separate tasks, so transactions on one course really do overlap.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use course_admission::builders::build_in_memory;
use course_admission::config::{AdmissionConfig, ConcurrencyStrategy, RetryPolicy};
use course_admission::core::{AdmissionController, AdmissionError, AdmissionStore, EnrollmentStatus};
use course_admission::infra::{InMemoryAdmissionStore, InMemoryCourseDirectory, InMemoryNotifier};
use futures::future::join_all;

type Controller = AdmissionController<InMemoryAdmissionStore, InMemoryCourseDirectory, InMemoryNotifier>;

const COURSE: &str = "rust-101";

fn contention_config(strategy: ConcurrencyStrategy) -> AdmissionConfig {
    AdmissionConfig {
        concurrency: strategy,
        transaction_timeout_ms: 5_000,
        retry: RetryPolicy {
            max_attempts: 64,
            base_delay_ms: 1,
            max_delay_ms: 8,
        },
        ..AdmissionConfig::default()
    }
}

async fn setup(strategy: ConcurrencyStrategy, max: u32) -> Arc<Controller> {
    let directory = InMemoryCourseDirectory::new();
    directory.open_course(COURSE, max, true);
    let controller =
        build_in_memory(&contention_config(strategy), directory, InMemoryNotifier::new()).unwrap();
    controller.publish_course(COURSE).await.unwrap();
    Arc::new(controller)
}

fn count(controller: &Controller, status: EnrollmentStatus) -> usize {
    controller
        .store()
        .read(COURSE, |p| p.enrollments().into_iter().filter(|e| e.status == status).count())
        .unwrap()
}

/// Watch the published ledger while a burst runs and flag any overshoot.
fn spawn_watchdog(controller: &Arc<Controller>, max: u32) -> (Arc<AtomicBool>, Arc<AtomicBool>) {
    let stop = Arc::new(AtomicBool::new(false));
    let overshoot = Arc::new(AtomicBool::new(false));
    let (c, s, o) = (Arc::clone(controller), Arc::clone(&stop), Arc::clone(&overshoot));
    tokio::spawn(async move {
        while !s.load(Ordering::Acquire) {
            if let Ok(cap) = c.capacity(COURSE) {
                if cap.current_enrollments > max {
                    o.store(true, Ordering::Release);
                }
            }
            tokio::task::yield_now().await;
        }
    });
    (stop, overshoot)
}

async fn burst(strategy: ConcurrencyStrategy) {
    const SEATS: u32 = 10;
    const STUDENTS: usize = 100;

    let controller = setup(strategy, SEATS).await;
    let (stop, overshoot) = spawn_watchdog(&controller, SEATS);

    let tasks = (0..STUDENTS).map(|i| {
        let c = Arc::clone(&controller);
        tokio::spawn(async move { c.enroll(&format!("student-{i}"), COURSE).await })
    });
    let results = join_all(tasks).await;
    stop.store(true, Ordering::Release);

    let mut admitted = 0;
    for result in results {
        match result.unwrap() {
            Ok(_) => admitted += 1,
            Err(AdmissionError::ConcurrencyConflict { .. }) => {}
            Err(e) => panic!("unexpected error under contention: {e}"),
        }
    }

    let cap = controller.capacity(COURSE).unwrap();
    assert!(!overshoot.load(Ordering::Acquire), "ledger exceeded max capacity");
    assert_eq!(cap.current_enrollments, SEATS);
    assert_eq!(count(&controller, EnrollmentStatus::Active), SEATS as usize);
    assert_eq!(
        count(&controller, EnrollmentStatus::Waitlisted),
        admitted - SEATS as usize
    );
    assert!(controller.reconcile(COURSE).unwrap().is_consistent());

    let sequences: Vec<u64> = controller
        .waitlist(COURSE)
        .unwrap()
        .iter()
        .map(|e| e.sequence_number)
        .collect();
    assert!(sequences.windows(2).all(|w| w[0] < w[1]));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 8)]
async fn test_burst_row_lock_never_oversubscribes() {
    burst(ConcurrencyStrategy::RowLock).await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 8)]
async fn test_burst_optimistic_never_oversubscribes() {
    burst(ConcurrencyStrategy::Optimistic).await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 8)]
async fn test_same_student_burst_creates_one_enrollment() {
    for strategy in [ConcurrencyStrategy::RowLock, ConcurrencyStrategy::Optimistic] {
        let controller = setup(strategy, 5).await;
        let tasks = (0..20).map(|_| {
            let c = Arc::clone(&controller);
            tokio::spawn(async move { c.enroll("s1", COURSE).await })
        });
        let ids: Vec<_> = join_all(tasks)
            .await
            .into_iter()
            .filter_map(|r| r.unwrap().ok())
            .map(|a| a.enrollment.id)
            .collect();

        assert!(!ids.is_empty());
        assert!(ids.iter().all(|id| *id == ids[0]));
        assert_eq!(count(&controller, EnrollmentStatus::Active), 1);
        assert_eq!(controller.capacity(COURSE).unwrap().current_enrollments, 1);
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 8)]
async fn test_drops_and_enrolls_interleave_consistently() {
    for strategy in [ConcurrencyStrategy::RowLock, ConcurrencyStrategy::Optimistic] {
        let controller = setup(strategy, 5).await;
        let mut holders = Vec::new();
        for i in 0..5 {
            holders.push(
                controller
                    .enroll(&format!("holder-{i}"), COURSE)
                    .await
                    .unwrap()
                    .enrollment
                    .id,
            );
        }
        for i in 0..5 {
            controller
                .enroll(&format!("waiter-{i}"), COURSE)
                .await
                .unwrap();
        }

        let drops = holders.into_iter().map(|id| {
            let c = Arc::clone(&controller);
            tokio::spawn(async move { (*c).drop(id).await.map(|_| ()) })
        });
        let enrolls = (0..10).map(|i| {
            let c = Arc::clone(&controller);
            tokio::spawn(async move { c.enroll(&format!("late-{i}"), COURSE).await.map(|_| ()) })
        });
        let all: Vec<_> = drops.chain(enrolls).collect();
        for result in join_all(all).await {
            match result.unwrap() {
                Ok(()) | Err(AdmissionError::ConcurrencyConflict { .. }) => {}
                Err(e) => panic!("unexpected error: {e}"),
            }
        }

        // Anything a racing promotion missed is picked up by the sweep.
        controller.sweep().await;

        let cap = controller.capacity(COURSE).unwrap();
        assert_eq!(cap.current_enrollments, 5);
        assert!(controller.reconcile(COURSE).unwrap().is_consistent());
        let actives = controller
            .store()
            .read(COURSE, |p| {
                p.live_enrollments()
                    .filter(|e| e.status == EnrollmentStatus::Active)
                    .map(|e| e.student_id.clone())
                    .collect::<Vec<_>>()
            })
            .unwrap();
        // Waiters queued first are promoted ahead of latecomers.
        assert!(actives.iter().all(|s| s.starts_with("waiter-")));
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_courses_do_not_contend() {
    let directory = InMemoryCourseDirectory::new();
    for c in 0..4 {
        directory.open_course(format!("course-{c}"), 3, false);
    }
    let controller = Arc::new(
        build_in_memory(
            &contention_config(ConcurrencyStrategy::RowLock),
            directory,
            InMemoryNotifier::new(),
        )
        .unwrap(),
    );
    for c in 0..4 {
        controller.publish_course(&format!("course-{c}")).await.unwrap();
    }

    let tasks = (0..40).map(|i| {
        let c = Arc::clone(&controller);
        tokio::spawn(async move {
            let course = format!("course-{}", i % 4);
            c.enroll(&format!("student-{i}"), &course).await
        })
    });
    let results = join_all(tasks).await;
    let rejected = results
        .into_iter()
        .filter(|r| matches!(r, Ok(Err(AdmissionError::CapacityExceeded(_)))))
        .count();
    assert_eq!(rejected, 40 - 12);

    for c in 0..4 {
        let cap = controller.capacity(&format!("course-{c}")).unwrap();
        assert_eq!(cap.current_enrollments, 3);
        assert_eq!(cap.waitlist_count, 0);
    }
}
