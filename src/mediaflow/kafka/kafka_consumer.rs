use crate::mediaflow::kafka::client_config_builder::ClientConfigBuilder;
use crate::mediaflow::kafka::consumer_config::ConsumerConfig;
use crate::mediaflow::kafka::headers::Headers;
use crate::mediaflow::kafka::kafka_error::ConsumerError;
use crate::mediaflow::kafka::message::Message;
use crate::mediaflow::kafka::serialization::Serde;
use crate::mediaflow::kafka::utils::convert_kafka_log_level;
use futures::StreamExt;
use rdkafka::config::RDKafkaLogLevel;
use rdkafka::consumer::{Consumer, ConsumerContext, Rebalance, StreamConsumer};
use rdkafka::error::KafkaError;
use rdkafka::message::{BorrowedMessage, Message as KafkaMessage};
use rdkafka::ClientContext;
use std::marker::PhantomData;
use std::time::Duration;

/// Consumer context that logs librdkafka output and partition rebalances
#[derive(Debug, Clone, Default)]
pub struct LoggingConsumerContext {
    client_id: String,
}

impl LoggingConsumerContext {
    pub fn new(client_id: impl Into<String>) -> Self {
        Self {
            client_id: client_id.into(),
        }
    }
}

impl ClientContext for LoggingConsumerContext {
    fn log(&self, level: RDKafkaLogLevel, fac: &str, message: &str) {
        log::log!(
            target: "mediaflow::listener",
            convert_kafka_log_level(level),
            "[{}] Kafka log ({}): {}",
            self.client_id,
            fac,
            message
        );
    }

    fn error(&self, error: KafkaError, reason: &str) {
        log::error!(
            target: "mediaflow::listener",
            "[{}] Kafka client error: {:?}, reason: {}",
            self.client_id,
            error,
            reason
        );
    }
}

impl ConsumerContext for LoggingConsumerContext {
    fn post_rebalance(
        &self,
        _base_consumer: &rdkafka::consumer::BaseConsumer<Self>,
        rebalance: &Rebalance<'_>,
    ) {
        match rebalance {
            Rebalance::Assign(partitions) => {
                let assigned: Vec<String> = partitions
                    .elements()
                    .iter()
                    .map(|e| format!("{}[{}]", e.topic(), e.partition()))
                    .collect();
                log::info!(
                    target: "mediaflow::listener",
                    "[{}] Assigned partitions: {}",
                    self.client_id,
                    assigned.join(", ")
                );
            }
            Rebalance::Revoke(partitions) => {
                log::info!(
                    target: "mediaflow::listener",
                    "[{}] Revoked {} partition(s)",
                    self.client_id,
                    partitions.count()
                );
            }
            Rebalance::Error(e) => {
                log::warn!(target: "mediaflow::listener", "[{}] Rebalance error: {}", self.client_id, e);
            }
        }
    }
}

/// A group member that deserializes keys and values as it reads
///
/// Every member created with the same `group_id` shares the topic's
/// partitions with the others: the broker assigns each partition to exactly
/// one member, so `C` members on a `P`-partition topic give
/// `min(C, P)` concurrent readers.
pub struct KafkaConsumer<K, V, KS, VS>
where
    KS: Serde<K>,
    VS: Serde<V>,
{
    consumer: StreamConsumer<LoggingConsumerContext>,
    key_serde: KS,
    value_serde: VS,
    _phantom_key: PhantomData<K>,
    _phantom_value: PhantomData<V>,
}

impl<K, V, KS, VS> KafkaConsumer<K, V, KS, VS>
where
    KS: Serde<K>,
    VS: Serde<V>,
{
    pub fn with_config(
        config: ConsumerConfig,
        key_serializer: KS,
        value_serializer: VS,
    ) -> Result<Self, KafkaError> {
        let mut client_config = ClientConfigBuilder::from_common(&config.common).build();

        client_config
            .set("group.id", &config.group_id)
            .set("auto.offset.reset", config.auto_offset_reset.as_str())
            .set("enable.auto.commit", config.enable_auto_commit.to_string())
            .set(
                "auto.commit.interval.ms",
                config.auto_commit_interval.as_millis().to_string(),
            )
            .set(
                "session.timeout.ms",
                config.session_timeout.as_millis().to_string(),
            )
            .set(
                "heartbeat.interval.ms",
                config.heartbeat_interval.as_millis().to_string(),
            );

        let context = LoggingConsumerContext::new(
            config
                .common
                .client_id
                .clone()
                .unwrap_or_else(|| config.group_id.clone()),
        );
        let consumer: StreamConsumer<LoggingConsumerContext> =
            client_config.create_with_context(context)?;

        Ok(KafkaConsumer {
            consumer,
            key_serde: key_serializer,
            value_serde: value_serializer,
            _phantom_key: PhantomData,
            _phantom_value: PhantomData,
        })
    }

    pub fn subscribe(&self, topics: &[&str]) -> Result<(), KafkaError> {
        self.consumer.subscribe(topics)
    }

    /// Waits up to `timeout` for the next message
    pub async fn poll(&self, timeout: Duration) -> Result<Message<K, V>, ConsumerError> {
        let mut stream = self.consumer.stream();

        match tokio::time::timeout(timeout, stream.next()).await {
            Ok(Some(Ok(msg))) => self.decode(&msg),
            Ok(Some(Err(e))) => Err(ConsumerError::KafkaError(e)),
            Ok(None) => Err(ConsumerError::NoMessage),
            Err(_) => Err(ConsumerError::Timeout),
        }
    }

    fn decode(&self, msg: &BorrowedMessage<'_>) -> Result<Message<K, V>, ConsumerError> {
        let payload = msg.payload().ok_or(ConsumerError::NoMessage)?;

        let value = match self.value_serde.deserialize(payload) {
            Ok(v) => {
                log::debug!(
                    target: "mediaflow::listener",
                    topic = msg.topic(),
                    partition = msg.partition(),
                    offset = msg.offset(),
                    payload_size = payload.len();
                    "Message received"
                );
                v
            }
            Err(e) => {
                log::error!(
                    target: "mediaflow::listener",
                    "Failed to deserialize message value: topic={} partition={} offset={} payload_size={} error={:?}",
                    msg.topic(),
                    msg.partition(),
                    msg.offset(),
                    payload.len(),
                    e
                );
                return Err(ConsumerError::SerializationError(e));
            }
        };

        let key = match msg.key() {
            Some(key_bytes) => Some(self.key_serde.deserialize(key_bytes)?),
            None => None,
        };

        let headers = match msg.headers() {
            Some(kafka_headers) => Headers::from_rdkafka_headers(kafka_headers),
            None => Headers::new(),
        };

        let timestamp = match msg.timestamp() {
            rdkafka::Timestamp::NotAvailable => None,
            rdkafka::Timestamp::CreateTime(t) | rdkafka::Timestamp::LogAppendTime(t) => Some(t),
        };

        Ok(Message::new(
            key,
            value,
            headers,
            msg.partition(),
            msg.offset(),
            timestamp,
        ))
    }
}
