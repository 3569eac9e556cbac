//! Tests for runtime adapters

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use course_admission::core::Spawn;
use course_admission::runtime::TokioSpawner;

#[test]
fn test_current_outside_runtime() {
    assert!(TokioSpawner::current().is_none());
}

#[tokio::test]
async fn test_tokio_spawner_runs_future() {
    let spawner = TokioSpawner::current().expect("inside runtime");
    let ran = Arc::new(AtomicBool::new(false));
    let flag = Arc::clone(&ran);
    spawner.spawn(async move {
        flag.store(true, Ordering::SeqCst);
    });

    for _ in 0..50 {
        if ran.load(Ordering::SeqCst) {
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    assert!(ran.load(Ordering::SeqCst));
}
