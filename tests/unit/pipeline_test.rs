//! End-to-end runs of the trigger on the in-process bus

use super::common::*;
use mediaflow::{DeliveryHandle, PublishError};
use std::sync::mpsc;

#[tokio::test]
async fn test_embedded_batch_lands_in_store() {
    init_logger();
    let harness = Harness::new(test_config());
    let group = harness.start();

    let report = harness
        .service
        .trigger()
        .run()
        .await
        .expect("ingestion should succeed");

    let expected = RecordSource::default()
        .parse(EMBEDDED_MEDIA_CSV.as_bytes())
        .unwrap();
    assert_eq!(report.dispatched, expected.len());
    assert_eq!(report.outcome, BarrierOutcome::Released { failed: 0 });
    assert_eq!(harness.bus.published_count(&harness.topic()), expected.len());
    assert_eq!(harness.executor.row_count(), expected.len());
    assert!(harness.service.barriers().is_empty());

    let stored: HashSet<i32> = harness.executor.rows().iter().map(|r| r.video_id).collect();
    let wanted: HashSet<i32> = expected
        .iter()
        .map(|r| r.videoid.parse().unwrap())
        .collect();
    assert_eq!(stored, wanted);

    group.shutdown().await;
}

#[tokio::test]
async fn test_single_row_is_stored_with_typed_columns() {
    init_logger();
    let harness = Harness::new(test_config());
    let group = harness.start();

    let trigger = harness.trigger_for(IngestInput::Text(
        "Movie A$2020$2020-01-01$desc$42$100\n".to_string(),
    ));
    let report = trigger.run().await.unwrap();

    assert_eq!(report.dispatched, 1);
    assert!(report.outcome.is_released());
    assert_eq!(harness.bus.published_count(&harness.topic()), 1);

    let rows = harness.executor.rows();
    assert_eq!(rows.len(), 1);
    let row = &rows[0];
    assert_eq!(row.title, "Movie A");
    assert_eq!(row.added_year, 2020);
    assert_eq!(row.added_date.to_rfc3339(), "2020-01-01T00:00:00+00:00");
    assert_eq!(row.description, "desc");
    assert_eq!(row.user_id, 42);
    assert_eq!(row.video_id, 100);
    assert!(
        harness.executor.statements()[0]
            .starts_with("INSERT INTO KAFKA_EXAMPLES.VIDEOS_BY_TITLE_YEAR")
    );

    group.shutdown().await;
}

#[tokio::test]
async fn test_every_record_is_written_exactly_once() {
    init_logger();
    let harness = Harness::new(test_config());
    let group = harness.start();

    let trigger = harness.trigger_for(IngestInput::Text(media_rows(30)));
    let report = trigger.run().await.unwrap();

    assert_eq!(report.dispatched, 30);
    assert_eq!(report.outcome, BarrierOutcome::Released { failed: 0 });

    let ids: Vec<i32> = harness.executor.rows().iter().map(|r| r.video_id).collect();
    let unique: HashSet<i32> = ids.iter().copied().collect();
    assert_eq!(ids.len(), 30);
    assert_eq!(unique, (0..30).collect());

    group.shutdown().await;
}

#[tokio::test]
async fn test_malformed_row_stops_dispatch() {
    init_logger();
    let harness = Harness::new(test_config());
    let group = harness.start();

    let input = "First$2020$2020-01-01$ok$1$1\nBroken$2020\nThird$2020$2020-01-01$never$3$3\n";
    let trigger = harness.trigger_for(IngestInput::Text(input.to_string()));

    match trigger.run().await {
        Err(IngestError::Parse(e)) => assert_eq!(e.line(), Some(2)),
        other => panic!("expected a parse error, got {:?}", other),
    }

    assert_eq!(harness.bus.published_count(&harness.topic()), 1);
    assert!(wait_until(Duration::from_secs(5), || harness.executor.row_count() == 1).await);
    assert_eq!(harness.executor.rows()[0].title, "First");
    assert!(harness.service.barriers().is_empty());

    group.shutdown().await;
}

#[tokio::test]
async fn test_untrusted_certificate_publishes_nothing() {
    init_logger();
    let mut config = test_config();
    config.cassandra.ca_cert_path = fixture("does_not_exist.pem");
    let harness = Harness::new(config);
    let group = harness.start();

    let result = harness.service.trigger().run().await;

    assert!(matches!(result, Err(IngestError::Connection(_))));
    assert_eq!(harness.bus.published_count(&harness.topic()), 0);
    assert_eq!(harness.connector.connects(), 0);
    assert_eq!(harness.executor.row_count(), 0);

    group.shutdown().await;
}

#[tokio::test]
async fn test_garbage_certificate_publishes_nothing() {
    init_logger();
    let dir = tempfile::tempdir().unwrap();
    let ca = dir.path().join("garbage.pem");
    std::fs::write(&ca, "this is not a certificate\n").unwrap();

    let mut config = test_config();
    config.cassandra.ca_cert_path = ca;
    let harness = Harness::new(config);

    let result = harness.service.trigger().run().await;

    assert!(matches!(result, Err(IngestError::Connection(_))));
    assert_eq!(harness.bus.published_count(&harness.topic()), 0);
}

#[tokio::test]
async fn test_write_failure_is_tallied_not_fatal() {
    init_logger();
    let harness = Harness::new(test_config());
    harness.executor.fail_on("Title 1");
    let group = harness.start();

    // "x" cannot become an INT video id; "Title 1" is rejected by the store
    let input = format!("{}Bad Id$2020$2020-01-01$d$1$x\n", media_rows(3));
    let trigger = harness.trigger_for(IngestInput::Text(input));
    let report = trigger.run().await.unwrap();

    assert_eq!(report.dispatched, 4);
    assert_eq!(report.outcome, BarrierOutcome::Released { failed: 2 });
    assert_eq!(harness.executor.row_count(), 2);
    assert!(wait_until(Duration::from_secs(5), || group.total_failed() == 2).await);

    group.shutdown().await;
}

#[tokio::test]
async fn test_wait_expires_without_listeners() {
    init_logger();
    let harness = Harness::new(test_config());

    let trigger = harness
        .trigger_for(IngestInput::Text(media_rows(4)))
        .with_timeout(Duration::from_millis(100));
    let report = trigger.run().await.unwrap();

    assert_eq!(report.dispatched, 4);
    assert_eq!(report.outcome, BarrierOutcome::Expired { remaining: 4 });
    assert_eq!(harness.bus.published_count(&harness.topic()), 4);
    assert!(harness.service.barriers().is_empty());
}

#[tokio::test]
async fn test_repeated_triggers_share_one_session() {
    init_logger();
    let harness = Harness::new(test_config());
    let group = harness.start();

    let trigger = harness.trigger_for(IngestInput::Text(media_rows(2)));
    let first = trigger.run().await.unwrap();
    let second = trigger.run().await.unwrap();

    assert_ne!(first.batch_id, second.batch_id);
    assert_eq!(harness.connector.connects(), 1);
    assert_eq!(harness.executor.row_count(), 4);

    group.shutdown().await;
}

#[tokio::test]
async fn test_missing_input_file_is_a_parse_error() {
    init_logger();
    let harness = Harness::new(test_config());

    let trigger =
        harness.trigger_for(IngestInput::File(PathBuf::from("/nonexistent/media.csv")));

    assert!(matches!(
        trigger.run().await,
        Err(IngestError::Parse(ParseError::Open { .. }))
    ));
    assert_eq!(harness.bus.published_count(&harness.topic()), 0);
}

#[tokio::test]
async fn test_service_shutdown_closes_session() {
    init_logger();
    let harness = Harness::new(test_config());
    let group = harness.start();

    harness.service.trigger().run().await.unwrap();
    assert!(harness.service.sessions().is_open().await);

    group.shutdown().await;
    harness.service.shutdown(Duration::from_secs(1)).await;

    assert!(!harness.service.sessions().is_open().await);
    assert_eq!(harness.executor.shutdown_count(), 1);
}

/// Forwards to the bus only after a token arrives on `gate`
struct GatedSink {
    bus: Arc<MemoryBus>,
    gate: Mutex<mpsc::Receiver<()>>,
}

impl RecordSink for GatedSink {
    fn send(
        &self,
        topic: &str,
        payload: &[u8],
        headers: &Headers,
    ) -> Result<DeliveryHandle, PublishError> {
        let opened = self
            .gate
            .lock()
            .unwrap()
            .recv_timeout(Duration::from_secs(5))
            .is_ok();
        if !opened {
            return Err(PublishError::Delivery {
                topic: topic.to_string(),
                reason: "gate never opened".to_string(),
            });
        }
        self.bus.send(topic, payload, headers)
    }

    fn flush(&self, _timeout: Duration) -> Result<(), PublishError> {
        Ok(())
    }
}

#[tokio::test(flavor = "current_thread")]
async fn test_file_dispatch_leaves_runtime_free() {
    init_logger();
    let harness = Harness::new(test_config());
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("media.csv");
    std::fs::write(&path, media_rows(2)).unwrap();

    // Publishing waits on a task of this single-threaded runtime.
    let (open, gate) = mpsc::channel();
    tokio::spawn(async move {
        open.send(()).unwrap();
        open.send(()).unwrap();
    });
    let sink = Arc::new(GatedSink {
        bus: harness.bus.clone(),
        gate: Mutex::new(gate),
    });

    let trigger = IngestionTrigger::new(
        Arc::clone(harness.service.sessions()),
        Publisher::new(sink),
        Arc::clone(harness.service.barriers()),
        harness.topic(),
    )
    .with_input(IngestInput::File(path))
    .with_timeout(Duration::from_millis(100));
    let report = trigger.run().await.unwrap();

    assert_eq!(report.dispatched, 2);
    assert_eq!(harness.bus.published_count(&harness.topic()), 2);
}
