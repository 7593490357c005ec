use super::common::*;
use mediaflow::mediaflow::pipeline::ListenerId;

fn bus_with_topic(topic: &str, partitions: usize) -> Arc<MemoryBus> {
    let bus = Arc::new(MemoryBus::new());
    bus.create_topic(topic, partitions);
    bus
}

fn record(i: usize) -> MediaRecord {
    MediaRecord::new(
        format!("Title {i}"),
        "2020",
        "2020-01-01",
        format!("description {i}"),
        "1",
        i.to_string(),
    )
}

#[tokio::test]
async fn test_consumed_record_equals_published() {
    init_logger();
    let bus = bus_with_topic("media", 3);
    let capture = Arc::new(CaptureHandler::default());
    let registry = ListenerRegistry::new();
    registry.register("media", capture.clone());

    let group = ConsumerGroup::start(&registry, bus.as_ref(), 3, ShutdownCoordinator::new())
        .unwrap();
    let publisher = Publisher::new(bus.clone());

    let sent = MediaRecord::new("Cost $ Benefit", "2021", "2021-07-04", "an \"audit\"", "31", "203");
    publisher.publish("media", &sent).unwrap();

    assert!(wait_until(Duration::from_secs(5), || capture.len() == 1).await);
    assert_eq!(capture.seen.lock().unwrap()[0].2, sent);

    group.shutdown().await;
}

#[tokio::test]
async fn test_partitions_are_split_disjointly_and_keep_order() {
    init_logger();
    let bus = bus_with_topic("media", 3);
    let capture = Arc::new(CaptureHandler::default());
    let registry = ListenerRegistry::new();
    registry.register("media", capture.clone());

    let group = ConsumerGroup::start(&registry, bus.as_ref(), 3, ShutdownCoordinator::new())
        .unwrap();
    let publisher = Publisher::new(bus.clone());
    for i in 0..30 {
        publisher.publish("media", &record(i)).unwrap();
    }

    assert!(wait_until(Duration::from_secs(5), || capture.len() == 30).await);

    let seen = capture.seen.lock().unwrap().clone();
    let ids: HashSet<String> = seen.iter().map(|(_, _, r)| r.videoid.clone()).collect();
    assert_eq!(ids.len(), 30);

    for partition in 0..3 {
        let offsets: Vec<i64> = seen
            .iter()
            .filter(|(p, _, _)| *p == partition)
            .map(|(_, offset, _)| *offset)
            .collect();
        assert_eq!(offsets, (0..10).collect::<Vec<i64>>());
    }

    // Each listener owns exactly one of the three partitions
    for (id, stats) in group.stats() {
        assert_eq!(id.topic, "media");
        assert_eq!(stats.processed(), 10, "listener {}", id.index);
    }
    assert_eq!(group.total_processed(), 30);

    group.shutdown().await;
}

#[tokio::test]
async fn test_excess_listeners_stay_idle() {
    init_logger();
    let bus = bus_with_topic("media", 2);
    let capture = Arc::new(CaptureHandler::default());
    let registry = ListenerRegistry::new();
    registry.register("media", capture.clone());

    let group = ConsumerGroup::start(&registry, bus.as_ref(), 4, ShutdownCoordinator::new())
        .unwrap();
    assert_eq!(group.listener_count(), 4);

    let publisher = Publisher::new(bus.clone());
    for i in 0..8 {
        publisher.publish("media", &record(i)).unwrap();
    }
    assert!(wait_until(Duration::from_secs(5), || capture.len() == 8).await);

    let idle: Vec<&ListenerId> = group
        .stats()
        .iter()
        .filter(|(_, stats)| stats.processed() == 0)
        .map(|(id, _)| id)
        .collect();
    assert_eq!(idle.len(), 2);
    assert!(idle.iter().all(|id| id.index >= 2));

    // Idle listeners still stop cleanly
    group.shutdown().await;
}

#[tokio::test]
async fn test_one_listener_owns_every_partition() {
    init_logger();
    let bus = bus_with_topic("media", 3);
    let capture = Arc::new(CaptureHandler::default());
    let registry = ListenerRegistry::new();
    registry.register("media", capture.clone());

    let group = ConsumerGroup::start(&registry, bus.as_ref(), 1, ShutdownCoordinator::new())
        .unwrap();
    let publisher = Publisher::new(bus.clone());
    for i in 0..6 {
        publisher.publish("media", &record(i)).unwrap();
    }

    assert!(wait_until(Duration::from_secs(5), || capture.len() == 6).await);
    assert_eq!(group.stats().len(), 1);
    assert_eq!(group.stats()[0].1.processed(), 6);

    group.shutdown().await;
}

struct FailFirst {
    calls: AtomicUsize,
}

#[async_trait]
impl MessageHandler for FailFirst {
    async fn handle(&self, message: &RawMessage) -> Result<(), ListenerError> {
        if self.calls.fetch_add(1, Ordering::SeqCst) == 0 {
            let broken = serde_json::from_slice::<MediaRecord>(b"{").unwrap_err();
            return Err(mediaflow::SerializationError::json_error(
                format!("offset {}", message.offset()),
                broken,
            )
            .into());
        }
        Ok(())
    }
}

#[tokio::test]
async fn test_handler_error_does_not_stop_listener() {
    init_logger();
    let bus = bus_with_topic("media", 1);
    let handler = Arc::new(FailFirst {
        calls: AtomicUsize::new(0),
    });
    let registry = ListenerRegistry::new();
    registry.register("media", handler.clone());

    let group = ConsumerGroup::start(&registry, bus.as_ref(), 1, ShutdownCoordinator::new())
        .unwrap();
    let publisher = Publisher::new(bus.clone());
    for i in 0..3 {
        publisher.publish("media", &record(i)).unwrap();
    }

    assert!(wait_until(Duration::from_secs(5), || group.total_processed() == 3).await);
    assert_eq!(group.total_failed(), 1);

    group.shutdown().await;
}

#[tokio::test]
async fn test_undecodable_payload_is_skipped_by_media_listener() {
    init_logger();
    let harness = Harness::new(test_config());
    let group = harness.start();
    harness.service.sessions().ensure_open().await.unwrap();

    let publisher = harness.service.publisher();
    publisher.send_raw(&harness.topic(), b"not json").unwrap();
    publisher
        .publish(&harness.topic(), &record(7))
        .unwrap();

    assert!(wait_until(Duration::from_secs(5), || harness.executor.row_count() == 1).await);
    assert!(wait_until(Duration::from_secs(5), || group.total_failed() == 1).await);
    assert_eq!(harness.executor.rows()[0].video_id, 7);

    group.shutdown().await;
}

#[tokio::test]
async fn test_probe_topic_messages_are_dropped() {
    init_logger();
    let harness = Harness::new(test_config());
    let group = harness.start();

    let probe = harness.service.config().kafka.probe_topic();
    assert_eq!(probe, "test_media");
    harness.service.publisher().publish(&probe, &record(1)).unwrap();

    assert!(wait_until(Duration::from_secs(5), || group.total_processed() == 1).await);
    assert_eq!(harness.executor.row_count(), 0);
    assert_eq!(group.total_failed(), 0);

    group.shutdown().await;
}

#[tokio::test]
async fn test_start_fails_when_partitions_already_claimed() {
    init_logger();
    let bus = bus_with_topic("media", 2);
    let registry = ListenerRegistry::new();
    registry.register("media", Arc::new(CaptureHandler::default()));

    let first = ConsumerGroup::start(&registry, bus.as_ref(), 2, ShutdownCoordinator::new())
        .unwrap();
    let second = ConsumerGroup::start(&registry, bus.as_ref(), 2, ShutdownCoordinator::new());
    assert!(second.is_err());

    first.shutdown().await;
}

#[tokio::test]
async fn test_start_fails_for_unknown_topic() {
    let bus = Arc::new(MemoryBus::new());
    let registry = ListenerRegistry::new();
    registry.register("missing", Arc::new(CaptureHandler::default()));

    let result = ConsumerGroup::start(&registry, bus.as_ref(), 1, ShutdownCoordinator::new());
    assert!(result.is_err());
}

#[tokio::test]
async fn test_failed_start_leaves_topics_usable() {
    init_logger();
    let bus = bus_with_topic("media", 3);
    let broken = ListenerRegistry::new();
    broken.register("media", Arc::new(CaptureHandler::default()));
    broken.register("media_missing", Arc::new(CaptureHandler::default()));

    let failed = ConsumerGroup::start(&broken, bus.as_ref(), 3, ShutdownCoordinator::new());
    assert!(matches!(failed, Err(KafkaClientError::UnknownTopic(_))));

    let registry = ListenerRegistry::new();
    let capture = Arc::new(CaptureHandler::default());
    registry.register("media", capture.clone());
    let group = ConsumerGroup::start(&registry, bus.as_ref(), 3, ShutdownCoordinator::new())
        .expect("partitions should be free again");

    let publisher = Publisher::new(bus.clone());
    for i in 0..6 {
        publisher.publish("media", &record(i)).unwrap();
    }
    assert!(wait_until(Duration::from_secs(5), || capture.len() == 6).await);

    group.shutdown().await;
}
