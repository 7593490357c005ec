use crate::mediaflow::bus::RecordSink;
use crate::mediaflow::kafka::{
    BATCH_ID_HEADER, DeliveryHandle, Headers, JsonSerializer, PublishError, Serde, TYPE_ID_HEADER,
};
use crate::mediaflow::media::MediaRecord;
use std::sync::Arc;
use std::time::Duration;

/// Sends records as JSON messages onto a topic
///
/// Sends do not wait for broker acknowledgment and carry no key, so the
/// bus's default partitioner chooses the partition.
#[derive(Clone)]
pub struct Publisher {
    sink: Arc<dyn RecordSink>,
    serializer: JsonSerializer,
}

impl Publisher {
    pub fn new(sink: Arc<dyn RecordSink>) -> Self {
        Self {
            sink,
            serializer: JsonSerializer,
        }
    }

    pub fn publish(&self, topic: &str, record: &MediaRecord) -> Result<DeliveryHandle, PublishError> {
        self.send_record(topic, record, Headers::with_capacity(1))
    }

    /// Publishes `record` tagged with the trigger batch it belongs to
    pub fn publish_in_batch(
        &self,
        topic: &str,
        record: &MediaRecord,
        batch_id: &str,
    ) -> Result<DeliveryHandle, PublishError> {
        self.send_record(
            topic,
            record,
            Headers::with_capacity(2).insert(BATCH_ID_HEADER, batch_id),
        )
    }

    fn send_record(
        &self,
        topic: &str,
        record: &MediaRecord,
        headers: Headers,
    ) -> Result<DeliveryHandle, PublishError> {
        let payload = self.serializer.serialize(record)?;
        let headers = headers.insert(TYPE_ID_HEADER, MediaRecord::TYPE_ID);

        log::debug!(
            target: "mediaflow::publisher",
            "sending data='{}' to topic='{}'",
            record,
            topic
        );

        self.sink.send(topic, &payload, &headers)
    }

    /// Sends an arbitrary payload with no type id
    pub fn send_raw(&self, topic: &str, payload: &[u8]) -> Result<DeliveryHandle, PublishError> {
        log::debug!(
            target: "mediaflow::publisher",
            "sending {} byte(s) to topic='{}'",
            payload.len(),
            topic
        );
        self.sink.send(topic, payload, &Headers::new())
    }

    pub fn flush(&self, timeout: Duration) -> Result<(), PublishError> {
        self.sink.flush(timeout)
    }
}
