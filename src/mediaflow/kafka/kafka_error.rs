use crate::mediaflow::kafka::serialization::SerializationError;
use rdkafka::error::KafkaError;

/// Unified error type for bus producer and consumer operations
#[derive(Debug)]
pub enum KafkaClientError {
    /// Underlying Kafka library error
    KafkaError(KafkaError),
    /// Serialization/deserialization error
    SerializationError(SerializationError),
    /// Operation timed out
    Timeout,
    /// No message available
    NoMessage,
    /// The topic was never provisioned
    UnknownTopic(String),
    /// Another group member already owns the requested partitions
    AlreadyClaimed(String),
}

impl std::fmt::Display for KafkaClientError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            KafkaClientError::KafkaError(e) => write!(f, "Kafka error: {}", e),
            KafkaClientError::SerializationError(e) => write!(f, "Serialization error: {}", e),
            KafkaClientError::Timeout => write!(f, "Timeout waiting for operation"),
            KafkaClientError::NoMessage => write!(f, "No message available"),
            KafkaClientError::UnknownTopic(topic) => write!(f, "Unknown topic '{}'", topic),
            KafkaClientError::AlreadyClaimed(topic) => {
                write!(f, "Partitions of topic '{}' are already claimed", topic)
            }
        }
    }
}

impl std::error::Error for KafkaClientError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            KafkaClientError::KafkaError(e) => Some(e),
            KafkaClientError::SerializationError(e) => Some(e),
            KafkaClientError::Timeout
            | KafkaClientError::NoMessage
            | KafkaClientError::UnknownTopic(_)
            | KafkaClientError::AlreadyClaimed(_) => None,
        }
    }
}

impl From<KafkaError> for KafkaClientError {
    fn from(err: KafkaError) -> Self {
        KafkaClientError::KafkaError(err)
    }
}

impl From<SerializationError> for KafkaClientError {
    fn from(err: SerializationError) -> Self {
        KafkaClientError::SerializationError(err)
    }
}

pub type ConsumerError = KafkaClientError;

/// Failure to hand a message to the bus
///
/// Sends are not acknowledged to the triggering caller, so this error only
/// surfaces when the local enqueue itself fails (queue full, unknown topic,
/// serialization) or when a caller chooses to await a delivery handle.
#[derive(Debug, thiserror::Error)]
pub enum PublishError {
    #[error("Failed to enqueue message for topic '{topic}': {source}")]
    Enqueue {
        topic: String,
        #[source]
        source: KafkaError,
    },

    #[error("Delivery to topic '{topic}' failed: {reason}")]
    Delivery { topic: String, reason: String },

    #[error("Delivery report for topic '{topic}' was dropped before completion")]
    Cancelled { topic: String },

    #[error("Unknown topic '{0}'")]
    UnknownTopic(String),

    #[error("Failed to serialize message: {0}")]
    Serialization(#[from] SerializationError),

    #[error("Flush did not complete: {0}")]
    Flush(#[source] KafkaError),
}
