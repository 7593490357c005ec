//! Publish and consume seams between the pipeline and a partitioned bus
//!
//! The pipeline only talks to these traits. [`kafka`] backs them with
//! librdkafka, [`memory`] with an in-process partitioned store that keeps the
//! same ordering and ownership rules.

pub mod kafka;
pub mod memory;

use crate::mediaflow::kafka::{DeliveryHandle, Headers, KafkaClientError, PublishError, RawMessage};
use async_trait::async_trait;
use std::time::Duration;

pub use kafka::{KafkaMessageSource, KafkaSourceFactory};
pub use memory::{MemoryBus, MemorySource};

/// Publish side of the bus
pub trait RecordSink: Send + Sync {
    /// Enqueues one keyless message without waiting for acknowledgment
    fn send(
        &self,
        topic: &str,
        payload: &[u8],
        headers: &Headers,
    ) -> Result<DeliveryHandle, PublishError>;

    /// Waits for outstanding messages, bounded by `timeout`
    fn flush(&self, timeout: Duration) -> Result<(), PublishError>;
}

/// Consume side of the bus, one per listener
#[async_trait]
pub trait MessageSource: Send {
    /// Next message from the partitions this listener owns
    ///
    /// Returns `None` once the source can never yield again.
    async fn next_message(&mut self) -> Option<Result<RawMessage, KafkaClientError>>;
}

/// Builds the source for listener `index` of `concurrency` on `topic`
pub trait SourceFactory: Send + Sync {
    fn create(
        &self,
        topic: &str,
        index: usize,
        concurrency: usize,
    ) -> Result<Box<dyn MessageSource>, KafkaClientError>;
}
