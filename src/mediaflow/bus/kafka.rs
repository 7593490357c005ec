use super::{MessageSource, RecordSink, SourceFactory};
use crate::mediaflow::kafka::{
    BytesSerializer, CommonKafkaConfig, ConsumerConfig, DeliveryHandle, Headers, KafkaClientError,
    KafkaConsumer, KafkaProducer, PublishError, RawMessage, StringSerializer,
};
use async_trait::async_trait;
use std::time::Duration;

const POLL_INTERVAL: Duration = Duration::from_millis(500);

impl RecordSink for KafkaProducer {
    fn send(
        &self,
        topic: &str,
        payload: &[u8],
        headers: &Headers,
    ) -> Result<DeliveryHandle, PublishError> {
        KafkaProducer::send(self, topic, payload, headers)
    }

    fn flush(&self, timeout: Duration) -> Result<(), PublishError> {
        KafkaProducer::flush(self, timeout).map_err(PublishError::Flush)
    }
}

/// One consumer-group member reading undecoded payloads
pub struct KafkaMessageSource {
    consumer: KafkaConsumer<String, Vec<u8>, StringSerializer, BytesSerializer>,
}

impl KafkaMessageSource {
    pub fn new(config: ConsumerConfig, topic: &str) -> Result<Self, KafkaClientError> {
        let consumer = KafkaConsumer::with_config(config, StringSerializer, BytesSerializer)?;
        consumer.subscribe(&[topic])?;
        Ok(Self { consumer })
    }
}

#[async_trait]
impl MessageSource for KafkaMessageSource {
    async fn next_message(&mut self) -> Option<Result<RawMessage, KafkaClientError>> {
        loop {
            match self.consumer.poll(POLL_INTERVAL).await {
                Ok(message) => return Some(Ok(message)),
                // Idle partitions and tombstones are not errors for a listener.
                Err(KafkaClientError::Timeout) | Err(KafkaClientError::NoMessage) => continue,
                Err(e) => return Some(Err(e)),
            }
        }
    }
}

/// Creates group members that share one group id
///
/// Member `i` on `topic` gets client id `<prefix>-<topic>-<i>`; the broker
/// spreads the topic's partitions over the members.
pub struct KafkaSourceFactory {
    common: CommonKafkaConfig,
    group_id: String,
    client_id_prefix: String,
}

impl KafkaSourceFactory {
    pub fn new(
        common: CommonKafkaConfig,
        group_id: impl Into<String>,
        client_id_prefix: impl Into<String>,
    ) -> Self {
        Self {
            common,
            group_id: group_id.into(),
            client_id_prefix: client_id_prefix.into(),
        }
    }

    pub fn client_id(&self, topic: &str, index: usize) -> String {
        format!("{}-{}-{}", self.client_id_prefix, topic, index)
    }
}

impl SourceFactory for KafkaSourceFactory {
    fn create(
        &self,
        topic: &str,
        index: usize,
        concurrency: usize,
    ) -> Result<Box<dyn MessageSource>, KafkaClientError> {
        let config = ConsumerConfig::from_common(self.common.clone(), self.group_id.clone())
            .client_id(self.client_id(topic, index));

        log::debug!(
            "Creating consumer {}/{} for topic '{}' in group '{}'",
            index + 1,
            concurrency,
            topic,
            self.group_id
        );

        Ok(Box::new(KafkaMessageSource::new(config, topic)?))
    }
}
