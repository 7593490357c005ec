use super::common::*;
use mediaflow::mediaflow::pipeline::MediaListener;

fn manager(config: AppConfig) -> (SecureSessionManager, Arc<RecordingConnector>) {
    let connector = RecordingConnector::new(RecordingExecutor::new());
    (
        SecureSessionManager::new(config.cassandra, connector.clone()),
        connector,
    )
}

#[tokio::test]
async fn test_ensure_open_reuses_session() {
    init_logger();
    let (sessions, connector) = manager(test_config());

    assert!(!sessions.is_open().await);
    sessions.ensure_open().await.unwrap();
    sessions.ensure_open().await.unwrap();

    assert!(sessions.is_open().await);
    assert_eq!(connector.connects(), 1);
}

#[tokio::test]
async fn test_concurrent_ensure_open_connects_once() {
    init_logger();
    let (sessions, connector) = manager(test_config());
    let sessions = Arc::new(sessions);

    let tasks: Vec<_> = (0..8)
        .map(|_| {
            let sessions = Arc::clone(&sessions);
            tokio::spawn(async move { sessions.ensure_open().await.map(|_| ()) })
        })
        .collect();
    for task in tasks {
        task.await.unwrap().unwrap();
    }

    assert_eq!(connector.connects(), 1);
}

#[tokio::test]
async fn test_open_replaces_existing_session() {
    init_logger();
    let (sessions, connector) = manager(test_config());

    sessions.open().await.unwrap();
    sessions.open().await.unwrap();

    assert_eq!(connector.connects(), 2);
    assert_eq!(connector.executor.shutdown_count(), 1);
}

#[tokio::test]
async fn test_close_leaves_held_handles_usable() {
    init_logger();
    let (sessions, connector) = manager(test_config());
    let held = sessions.ensure_open().await.unwrap();

    assert!(sessions.close().await);
    assert!(matches!(
        sessions.session().await,
        Err(ConnectionError::NotEstablished)
    ));

    let record = MediaRecord::new("Movie A", "2020", "2020-01-01", "desc", "42", "100");
    let row = VideoRow::from_record(&record).unwrap();
    held.execute("INSERT", &row).await.unwrap();
    assert_eq!(connector.executor.row_count(), 1);
}

#[tokio::test]
async fn test_close_twice_is_harmless() {
    init_logger();
    let (sessions, connector) = manager(test_config());

    sessions.ensure_open().await.unwrap();
    assert!(sessions.close().await);
    assert!(!sessions.close().await);

    assert!(!sessions.is_open().await);
    assert_eq!(connector.executor.shutdown_count(), 1);
    assert!(matches!(
        sessions.session().await,
        Err(ConnectionError::NotEstablished)
    ));
}

#[tokio::test]
async fn test_missing_ca_fails_before_connecting() {
    init_logger();
    let mut config = test_config();
    config.cassandra.ca_cert_path = fixture("missing_ca.pem");
    let (sessions, connector) = manager(config);

    assert!(matches!(
        sessions.ensure_open().await,
        Err(ConnectionError::CertificateLoad { .. })
    ));
    assert!(!sessions.is_open().await);
    assert_eq!(connector.connects(), 0);
}

#[tokio::test]
async fn test_client_certificate_requires_matching_key() {
    init_logger();
    let mut config = test_config();
    config.cassandra.client_cert_path = Some(fixture("client.pem"));
    config.cassandra.client_key_path = Some(fixture("test_ca.pem"));
    let (sessions, connector) = manager(config);

    assert!(matches!(
        sessions.ensure_open().await,
        Err(ConnectionError::PrivateKey { .. })
    ));
    assert_eq!(connector.connects(), 0);
}

#[tokio::test]
async fn test_mutual_tls_session_opens() {
    init_logger();
    let mut config = test_config();
    config.cassandra.client_cert_path = Some(fixture("client.pem"));
    config.cassandra.client_key_path = Some(fixture("client.key"));
    let (sessions, connector) = manager(config);

    sessions.ensure_open().await.unwrap();
    assert_eq!(connector.connects(), 1);
}

#[tokio::test]
async fn test_listener_without_session_fails_and_signals_barrier() {
    init_logger();
    let (sessions, _connector) = manager(test_config());
    let sessions = Arc::new(sessions);
    let barriers = Arc::new(BarrierRegistry::new());
    let barrier = barriers.register("batch-1", CompletionBarrier::new(1));
    let listener = MediaListener::new(sessions, barriers.clone());

    let record = MediaRecord::new("Movie A", "2020", "2020-01-01", "desc", "42", "100");
    let headers = Headers::new()
        .insert(TYPE_ID_HEADER, MediaRecord::TYPE_ID)
        .insert(BATCH_ID_HEADER, "batch-1");
    let message = RawMessage::new(
        None,
        serde_json::to_vec(&record).unwrap(),
        headers,
        0,
        0,
        None,
    );

    let result = listener.handle(&message).await;

    assert!(matches!(
        result,
        Err(ListenerError::Write(WriteError::SessionUnavailable(
            ConnectionError::NotEstablished
        )))
    ));
    assert_eq!(barrier.failed_count(), 1);
    assert_eq!(barrier.state(), BarrierState::Released);
}

#[tokio::test]
async fn test_listener_rejects_foreign_type() {
    init_logger();
    let (sessions, connector) = manager(test_config());
    let sessions = Arc::new(sessions);
    sessions.ensure_open().await.unwrap();
    let listener = MediaListener::new(sessions, Arc::new(BarrierRegistry::new()));

    let headers = Headers::new().insert(TYPE_ID_HEADER, "Invoice");
    let message = RawMessage::new(None, b"{}".to_vec(), headers, 0, 0, None);

    assert!(matches!(
        listener.handle(&message).await,
        Err(ListenerError::Deserialize(_))
    ));
    assert_eq!(connector.executor.row_count(), 0);
}
