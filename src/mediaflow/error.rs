use crate::mediaflow::cassandra::{ConnectionError, WriteError};
use crate::mediaflow::config::ConfigError;
use crate::mediaflow::kafka::{KafkaClientError, PublishError};
use crate::mediaflow::media::ParseError;

/// Top-level error for the trigger path and the service binary
///
/// An expired completion barrier is not an error; it is reported through
/// [`BarrierOutcome::Expired`](crate::mediaflow::pipeline::BarrierOutcome).
#[derive(Debug, thiserror::Error)]
pub enum IngestError {
    #[error("Parse error: {0}")]
    Parse(#[from] ParseError),

    #[error("Connection error: {0}")]
    Connection(#[from] ConnectionError),

    #[error("Publish error: {0}")]
    Publish(#[from] PublishError),

    #[error("Write error: {0}")]
    Write(#[from] WriteError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Bus error: {0}")]
    Kafka(#[from] KafkaClientError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
