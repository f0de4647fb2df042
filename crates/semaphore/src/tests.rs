use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use super::*;

#[test]
fn parses_name_only() {
    let id = SemaphoreId::parse("build").unwrap();
    assert_eq!(id, SemaphoreId { name: "build".to_string(), size: 1 });
}

#[test]
fn parses_name_with_size() {
    let id = SemaphoreId::parse("build:4").unwrap();
    assert_eq!(id, SemaphoreId { name: "build".to_string(), size: 4 });
}

#[test]
fn rejects_zero_size() {
    assert!(SemaphoreId::parse("build:0").is_err());
}

#[test]
fn rejects_non_numeric_size() {
    assert!(SemaphoreId::parse("build:many").is_err());
}

#[tokio::test(flavor = "multi_thread")]
async fn acquire_and_release() {
    let registry = Registry::new();
    let guard = registry.acquire(&["s".to_string()]).await.unwrap();
    drop(guard);
    // a second acquire must not block forever now that the first was released.
    tokio::time::timeout(Duration::from_secs(1), registry.acquire(&["s".to_string()]))
        .await
        .expect("second acquire should not time out")
        .unwrap();
}

#[tokio::test(flavor = "multi_thread")]
async fn at_most_n_acquisitions_concurrently() {
    let registry = Arc::new(Registry::new());
    let concurrent = Arc::new(AtomicUsize::new(0));
    let max_seen = Arc::new(AtomicUsize::new(0));

    let mut handles = Vec::new();
    for _ in 0..8 {
        let registry = registry.clone();
        let concurrent = concurrent.clone();
        let max_seen = max_seen.clone();
        handles.push(tokio::spawn(async move {
            let _guard = registry.acquire(&["limited:2".to_string()]).await.unwrap();
            let now = concurrent.fetch_add(1, Ordering::SeqCst) + 1;
            max_seen.fetch_max(now, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(20)).await;
            concurrent.fetch_sub(1, Ordering::SeqCst);
        }));
    }
    for h in handles {
        h.await.unwrap();
    }
    assert!(max_seen.load(Ordering::SeqCst) <= 2);
}

#[tokio::test(flavor = "multi_thread")]
async fn acquire_sorts_ids_before_taking_locks() {
    let registry = Registry::new();
    // Out-of-order input must not deadlock against a concurrent acquire requesting the same set
    // in a different caller-supplied order; both converge on the sorted order internally.
    let a = registry.acquire(&["b".to_string(), "a".to_string()]).await.unwrap();
    drop(a);
    let b = registry.acquire(&["a".to_string(), "b".to_string()]).await.unwrap();
    drop(b);
}

#[tokio::test(flavor = "multi_thread")]
async fn close_unblocks_waiters() {
    let registry = Arc::new(Registry::new());
    let _held = registry.acquire(&["only:1".to_string()]).await.unwrap();

    let waiter_registry = registry.clone();
    let waiter = tokio::spawn(async move { waiter_registry.acquire(&["only:1".to_string()]).await });

    tokio::time::sleep(Duration::from_millis(20)).await;
    registry.close();

    let result = tokio::time::timeout(Duration::from_secs(1), waiter)
        .await
        .expect("waiter should wake up once closed")
        .unwrap();
    assert!(matches!(result, Err(SemaphoreError::Closed)));
}
