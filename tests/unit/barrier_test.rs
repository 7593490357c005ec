use super::common::*;

#[tokio::test]
async fn test_concurrent_count_down_releases_once() {
    let barrier = Arc::new(CompletionBarrier::new(100));

    let tasks: Vec<_> = (0..100)
        .map(|i| {
            let barrier = Arc::clone(&barrier);
            tokio::spawn(async move {
                if i % 10 == 0 {
                    barrier.count_down_failed();
                } else {
                    barrier.count_down();
                }
            })
        })
        .collect();

    let outcome = barrier.wait(Duration::from_secs(5)).await;
    for task in tasks {
        task.await.unwrap();
    }

    assert_eq!(outcome, BarrierOutcome::Released { failed: 10 });
    assert_eq!(barrier.state(), BarrierState::Released);
    assert_eq!(barrier.remaining(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_expiry_reports_outstanding_records() {
    let barrier = CompletionBarrier::open();
    for _ in 0..5 {
        barrier.dispatched();
    }
    barrier.seal();
    barrier.count_down();
    barrier.count_down();

    let outcome = barrier.wait(Duration::from_secs(60)).await;

    assert_eq!(outcome, BarrierOutcome::Expired { remaining: 3 });
    assert!(!outcome.is_released());
    assert_eq!(barrier.state(), BarrierState::Expired);
}

#[tokio::test]
async fn test_unsealed_barrier_is_not_released_at_zero() {
    let barrier = CompletionBarrier::open();
    assert_eq!(barrier.state(), BarrierState::Armed);

    let outcome = barrier.wait(Duration::from_millis(50)).await;
    assert_eq!(outcome, BarrierOutcome::Expired { remaining: 0 });

    barrier.seal();
    assert_eq!(barrier.state(), BarrierState::Released);
}

#[tokio::test]
async fn test_empty_sealed_batch_releases_immediately() {
    let barrier = CompletionBarrier::open();
    barrier.seal();

    let outcome = barrier.wait(Duration::from_secs(5)).await;
    assert_eq!(outcome, BarrierOutcome::Released { failed: 0 });
}

#[tokio::test]
async fn test_surplus_count_down_does_not_underflow() {
    let barrier = CompletionBarrier::new(1);
    barrier.count_down();
    barrier.count_down();

    assert_eq!(barrier.remaining(), 0);
    assert_eq!(barrier.completed_count(), 2);
    assert!(barrier.wait(Duration::from_millis(10)).await.is_released());
}

#[test]
fn test_registry_lookup_and_discard() {
    let registry = BarrierRegistry::new();
    assert!(registry.is_empty());

    let registered = registry.register("a", CompletionBarrier::new(2));
    registry.register("b", CompletionBarrier::new(1));
    assert_eq!(registry.len(), 2);

    registry.get("a").unwrap().count_down();
    assert_eq!(registered.completed_count(), 1);

    assert!(registry.discard("a").is_some());
    assert!(registry.get("a").is_none());
    assert!(registry.discard("a").is_none());
    assert_eq!(registry.len(), 1);
}
