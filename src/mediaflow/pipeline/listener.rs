//! Message handlers and the topic → handler registry

use super::barrier::BarrierRegistry;
use crate::mediaflow::cassandra::{SecureSessionManager, StorageWriter, WriteError};
use crate::mediaflow::kafka::{
    BATCH_ID_HEADER, JsonSerializer, RawMessage, Serde, SerializationError, TYPE_ID_HEADER,
    UNKNOWN_TYPE_ID, type_id_header,
};
use crate::mediaflow::media::MediaRecord;
use async_trait::async_trait;
use dashmap::DashMap;
use std::sync::Arc;

#[derive(Debug, thiserror::Error)]
pub enum ListenerError {
    #[error("Failed to decode message: {0}")]
    Deserialize(#[from] SerializationError),

    #[error("Failed to persist record: {0}")]
    Write(#[from] WriteError),
}

/// Processes one message from a subscribed topic
#[async_trait]
pub trait MessageHandler: Send + Sync {
    async fn handle(&self, message: &RawMessage) -> Result<(), ListenerError>;
}

/// Topic name → handler, built explicitly at start-up
#[derive(Default)]
pub struct ListenerRegistry {
    handlers: DashMap<String, Arc<dyn MessageHandler>>,
}

impl ListenerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Binds `handler` to `topic`, replacing any earlier binding
    pub fn register(&self, topic: impl Into<String>, handler: Arc<dyn MessageHandler>) {
        let topic = topic.into();
        if self.handlers.insert(topic.clone(), handler).is_some() {
            log::warn!("Replaced handler for topic '{}'", topic);
        }
    }

    pub fn handler_for(&self, topic: &str) -> Option<Arc<dyn MessageHandler>> {
        self.handlers.get(topic).map(|h| Arc::clone(h.value()))
    }

    /// Registered topics in name order
    pub fn topics(&self) -> Vec<String> {
        let mut topics: Vec<String> = self.handlers.iter().map(|e| e.key().clone()).collect();
        topics.sort();
        topics
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }
}

/// Deserializes media messages and writes them through the shared session
///
/// Each handled message is reported to the barrier of the trigger that
/// published it, whether or not the write succeeded.
pub struct MediaListener {
    sessions: Arc<SecureSessionManager>,
    writer: StorageWriter,
    barriers: Arc<BarrierRegistry>,
    serializer: JsonSerializer,
}

impl MediaListener {
    pub fn new(sessions: Arc<SecureSessionManager>, barriers: Arc<BarrierRegistry>) -> Self {
        Self {
            sessions,
            writer: StorageWriter::new(),
            barriers,
            serializer: JsonSerializer,
        }
    }

    fn decode(&self, message: &RawMessage) -> Result<MediaRecord, SerializationError> {
        let type_id = type_id_header(message.headers());
        if type_id != MediaRecord::TYPE_ID && type_id != UNKNOWN_TYPE_ID {
            return Err(SerializationError::UnexpectedType {
                expected: MediaRecord::TYPE_ID.to_string(),
                found: type_id.to_string(),
            });
        }
        self.serializer.deserialize(message.value())
    }

    async fn persist(&self, message: &RawMessage) -> Result<(), ListenerError> {
        let record = self.decode(message)?;

        log::info!(
            target: "mediaflow::listener",
            "received data='{}' (partition {}, offset {}, type {})",
            record,
            message.partition(),
            message.offset(),
            message.headers().get(TYPE_ID_HEADER).unwrap_or(UNKNOWN_TYPE_ID)
        );

        let session = self.sessions.session().await.map_err(WriteError::from)?;
        self.writer.write(&record, session.as_ref()).await?;
        Ok(())
    }

    fn signal(&self, message: &RawMessage, succeeded: bool) {
        let Some(batch_id) = message.headers().get(BATCH_ID_HEADER) else {
            return;
        };

        match self.barriers.get(batch_id) {
            Some(barrier) if succeeded => barrier.count_down(),
            Some(barrier) => barrier.count_down_failed(),
            None => log::debug!(
                target: "mediaflow::listener",
                "No live barrier for batch {}; its trigger already returned",
                batch_id
            ),
        }
    }
}

#[async_trait]
impl MessageHandler for MediaListener {
    async fn handle(&self, message: &RawMessage) -> Result<(), ListenerError> {
        let result = self.persist(message).await;
        self.signal(message, result.is_ok());
        result
    }
}

/// Accepts and drops every message; bound to the probe topic
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopListener;

#[async_trait]
impl MessageHandler for NoopListener {
    async fn handle(&self, message: &RawMessage) -> Result<(), ListenerError> {
        log::debug!(
            target: "mediaflow::listener",
            "Probe message received (partition {}, offset {})",
            message.partition(),
            message.offset()
        );
        Ok(())
    }
}
