use crate::mediaflow::kafka::client_config_builder::ClientConfigBuilder;
use crate::mediaflow::kafka::common_config::CommonKafkaConfig;
use crate::mediaflow::kafka::headers::Headers;
use crate::mediaflow::kafka::kafka_error::PublishError;
use crate::mediaflow::kafka::producer_context::{
    DeliveryHandle, DeliveryResultSender, LoggingProducerContext,
};
use log::{error, info};
use rdkafka::error::KafkaError;
use rdkafka::producer::{BaseRecord, Producer, ThreadedProducer};
use std::time::Duration;

/// How long librdkafka keeps retrying a message before reporting it failed
const MESSAGE_TIMEOUT: Duration = Duration::from_secs(30);

/// Non-blocking Kafka producer
///
/// Wraps rdkafka's `ThreadedProducer`: `send` enqueues into librdkafka's
/// buffer and returns immediately, a background thread polls for delivery
/// reports and resolves each [`DeliveryHandle`]. No key is set on outgoing
/// records, so librdkafka's default partitioner spreads them across the
/// topic's partitions.
pub struct KafkaProducer {
    producer: ThreadedProducer<LoggingProducerContext>,
}

impl KafkaProducer {
    pub fn new(brokers: &str) -> Result<Self, KafkaError> {
        Self::with_config(&CommonKafkaConfig::new(brokers))
    }

    pub fn with_config(common: &CommonKafkaConfig) -> Result<Self, KafkaError> {
        let producer: ThreadedProducer<LoggingProducerContext> =
            ClientConfigBuilder::from_common(common)
                .set("message.timeout.ms", MESSAGE_TIMEOUT.as_millis().to_string())
                .build()
                .create_with_context(LoggingProducerContext)?;

        info!(
            "Created KafkaProducer connected to {} (client id {:?})",
            common.brokers, common.client_id
        );

        Ok(KafkaProducer { producer })
    }

    /// Enqueues a keyless message; the returned handle resolves on broker acknowledgment
    pub fn send(
        &self,
        topic: &str,
        payload: &[u8],
        headers: &Headers,
    ) -> Result<DeliveryHandle, PublishError> {
        let (sender, handle) = DeliveryHandle::pending(topic);
        let record = BaseRecord::<(), [u8], Box<DeliveryResultSender>>::with_opaque_to(
            topic,
            Box::new(sender),
        )
        .payload(payload)
        .headers(headers.to_rdkafka_headers());

        match self.producer.send(record) {
            Ok(()) => Ok(handle),
            Err((err, _record)) => {
                error!("Failed to enqueue message for topic '{}': {}", topic, err);
                Err(PublishError::Enqueue {
                    topic: topic.to_string(),
                    source: err,
                })
            }
        }
    }

    /// Blocks until every enqueued message is delivered or the timeout elapses
    pub fn flush(&self, timeout: Duration) -> Result<(), KafkaError> {
        self.producer.flush(timeout)
    }

    pub fn in_flight_count(&self) -> i32 {
        self.producer.in_flight_count()
    }
}
