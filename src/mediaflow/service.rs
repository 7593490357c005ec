//! Explicit wiring of the pipeline from an [`AppConfig`]

use crate::mediaflow::bus::{RecordSink, SourceFactory};
use crate::mediaflow::cassandra::SecureSessionManager;
use crate::mediaflow::config::AppConfig;
use crate::mediaflow::error::IngestError;
use crate::mediaflow::kafka::KafkaClientError;
use crate::mediaflow::media::RecordSource;
use crate::mediaflow::pipeline::{
    BarrierRegistry, ConsumerGroup, IngestInput, IngestionTrigger, ListenerRegistry,
    MediaListener, NoopListener, Publisher,
};
use crate::mediaflow::server::ShutdownCoordinator;
use std::sync::Arc;
use std::time::Duration;

/// Every long-lived pipeline component, built once at start-up
pub struct MediaService {
    config: AppConfig,
    sessions: Arc<SecureSessionManager>,
    barriers: Arc<BarrierRegistry>,
    publisher: Publisher,
    registry: ListenerRegistry,
    trigger: Arc<IngestionTrigger>,
}

impl MediaService {
    /// Builds the publisher, the trigger and the listener registry
    ///
    /// The media listener is bound to the configured topic, the no-op probe
    /// listener to `test_<topic>`.
    pub fn new(
        config: AppConfig,
        sink: Arc<dyn RecordSink>,
        sessions: Arc<SecureSessionManager>,
    ) -> Result<Self, IngestError> {
        let barriers = Arc::new(BarrierRegistry::new());
        let publisher = Publisher::new(sink);

        let input = match &config.ingest.resource_path {
            Some(path) => IngestInput::File(path.clone()),
            None => IngestInput::Embedded,
        };
        let trigger = IngestionTrigger::new(
            Arc::clone(&sessions),
            publisher.clone(),
            Arc::clone(&barriers),
            config.kafka.topic.clone(),
        )
        .with_input(input)
        .with_source(RecordSource::new(config.ingest.delimiter_byte()?))
        .with_timeout(config.ingest.barrier_timeout());

        let registry = ListenerRegistry::new();
        registry.register(
            config.kafka.topic.clone(),
            Arc::new(MediaListener::new(
                Arc::clone(&sessions),
                Arc::clone(&barriers),
            )),
        );
        registry.register(config.kafka.probe_topic(), Arc::new(NoopListener));

        Ok(Self {
            config,
            sessions,
            barriers,
            publisher,
            registry,
            trigger: Arc::new(trigger),
        })
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn sessions(&self) -> &Arc<SecureSessionManager> {
        &self.sessions
    }

    pub fn barriers(&self) -> &Arc<BarrierRegistry> {
        &self.barriers
    }

    pub fn publisher(&self) -> &Publisher {
        &self.publisher
    }

    pub fn registry(&self) -> &ListenerRegistry {
        &self.registry
    }

    pub fn trigger(&self) -> Arc<IngestionTrigger> {
        Arc::clone(&self.trigger)
    }

    /// Spawns `kafka.concurrency` listeners per registered topic
    pub fn start_consumers(
        &self,
        factory: &dyn SourceFactory,
        shutdown: ShutdownCoordinator,
    ) -> Result<ConsumerGroup, KafkaClientError> {
        ConsumerGroup::start(
            &self.registry,
            factory,
            self.config.kafka.concurrency,
            shutdown,
        )
    }

    /// Flushes outstanding publishes, then closes the store session
    pub async fn shutdown(&self, timeout: Duration) {
        if let Err(e) = self.publisher.flush(timeout) {
            log::warn!("Producer flush incomplete: {}", e);
        }
        self.sessions.close().await;
    }
}
