use super::{MessageSource, RecordSink, SourceFactory};
use crate::mediaflow::kafka::{
    DeliveryHandle, DeliveryReport, Headers, KafkaClientError, Message, PublishError, RawMessage,
};
use async_trait::async_trait;
use dashmap::DashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::task::{Context, Poll};
use std::time::Duration;
use tokio::sync::mpsc;

struct MemoryPartition {
    sender: mpsc::UnboundedSender<RawMessage>,
    receiver: Mutex<Option<mpsc::UnboundedReceiver<RawMessage>>>,
    // Guards offset assignment and enqueue together so offsets follow channel order.
    next_offset: Mutex<i64>,
}

struct MemoryTopic {
    partitions: Vec<MemoryPartition>,
    next_partition: AtomicUsize,
    published: AtomicUsize,
}

/// In-process partitioned bus
///
/// Keyless publishes are spread round-robin over the topic's partitions and
/// each partition keeps publish order. Listener `i` of a group of `C` owns
/// every partition `p` with `p % C == i`. A partition is held by at most one
/// live source, so no message reaches two listeners; dropping the source
/// hands its partitions back with any undelivered messages.
#[derive(Default)]
pub struct MemoryBus {
    topics: DashMap<String, Arc<MemoryTopic>>,
}

impl MemoryBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates the topic; an existing topic keeps its partitions
    pub fn create_topic(&self, name: &str, partitions: usize) {
        self.topics.entry(name.to_string()).or_insert_with(|| {
            let partitions = (0..partitions.max(1))
                .map(|_| {
                    let (sender, receiver) = mpsc::unbounded_channel();
                    MemoryPartition {
                        sender,
                        receiver: Mutex::new(Some(receiver)),
                        next_offset: Mutex::new(0),
                    }
                })
                .collect();

            Arc::new(MemoryTopic {
                partitions,
                next_partition: AtomicUsize::new(0),
                published: AtomicUsize::new(0),
            })
        });
    }

    pub fn partition_count(&self, topic: &str) -> Option<usize> {
        self.topics.get(topic).map(|t| t.partitions.len())
    }

    /// Messages accepted on `topic` so far
    pub fn published_count(&self, topic: &str) -> usize {
        self.topics
            .get(topic)
            .map(|t| t.published.load(Ordering::SeqCst))
            .unwrap_or(0)
    }

    /// Takes ownership of listener `index`'s share of the partitions
    pub fn claim(
        &self,
        topic: &str,
        index: usize,
        concurrency: usize,
    ) -> Result<MemorySource, KafkaClientError> {
        let topic_ref = self
            .topics
            .get(topic)
            .map(|t| Arc::clone(t.value()))
            .ok_or_else(|| KafkaClientError::UnknownTopic(topic.to_string()))?;

        let concurrency = concurrency.max(1);
        let mut source = MemorySource {
            topic: Arc::clone(&topic_ref),
            partitions: Vec::new(),
            receivers: Vec::new(),
            cursor: 0,
        };

        for (p, partition) in topic_ref.partitions.iter().enumerate() {
            if p % concurrency != index {
                continue;
            }
            // On failure `source` is dropped and returns what it took so far.
            let receiver = partition
                .receiver
                .lock()
                .map_err(|_| KafkaClientError::AlreadyClaimed(topic.to_string()))?
                .take()
                .ok_or_else(|| KafkaClientError::AlreadyClaimed(topic.to_string()))?;

            source.partitions.push(p as i32);
            source.receivers.push(receiver);
        }

        log::debug!(
            "Listener {}/{} on '{}' owns partitions {:?}",
            index + 1,
            concurrency,
            topic,
            source.partitions
        );

        Ok(source)
    }
}

impl RecordSink for MemoryBus {
    fn send(
        &self,
        topic: &str,
        payload: &[u8],
        headers: &Headers,
    ) -> Result<DeliveryHandle, PublishError> {
        let topic_ref = self
            .topics
            .get(topic)
            .map(|t| Arc::clone(t.value()))
            .ok_or_else(|| PublishError::UnknownTopic(topic.to_string()))?;

        let index =
            topic_ref.next_partition.fetch_add(1, Ordering::SeqCst) % topic_ref.partitions.len();
        let partition = &topic_ref.partitions[index];

        let mut next_offset = partition
            .next_offset
            .lock()
            .map_err(|_| PublishError::Delivery {
                topic: topic.to_string(),
                reason: "partition lock poisoned".to_string(),
            })?;
        let offset = *next_offset;

        let message = Message::new(
            None,
            payload.to_vec(),
            headers.clone(),
            index as i32,
            offset,
            Some(chrono::Utc::now().timestamp_millis()),
        );

        partition
            .sender
            .send(message)
            .map_err(|_| PublishError::Delivery {
                topic: topic.to_string(),
                reason: format!("partition {} has no consumer", index),
            })?;

        *next_offset += 1;
        topic_ref.published.fetch_add(1, Ordering::SeqCst);

        Ok(DeliveryHandle::completed(DeliveryReport {
            topic: topic.to_string(),
            partition: index as i32,
            offset,
        }))
    }

    fn flush(&self, _timeout: Duration) -> Result<(), PublishError> {
        Ok(())
    }
}

impl SourceFactory for MemoryBus {
    fn create(
        &self,
        topic: &str,
        index: usize,
        concurrency: usize,
    ) -> Result<Box<dyn MessageSource>, KafkaClientError> {
        Ok(Box::new(self.claim(topic, index, concurrency)?))
    }
}

/// The partitions one listener owns, read as a single feed
pub struct MemorySource {
    topic: Arc<MemoryTopic>,
    partitions: Vec<i32>,
    receivers: Vec<mpsc::UnboundedReceiver<RawMessage>>,
    cursor: usize,
}

impl MemorySource {
    pub fn partitions(&self) -> &[i32] {
        &self.partitions
    }

    fn poll_partitions(&mut self, cx: &mut Context<'_>) -> Poll<Option<RawMessage>> {
        let count = self.receivers.len();
        let mut closed = 0;

        // Start after the last partition served so a busy one cannot starve the rest.
        for step in 0..count {
            let i = (self.cursor + step) % count;
            match self.receivers[i].poll_recv(cx) {
                Poll::Ready(Some(message)) => {
                    self.cursor = (i + 1) % count;
                    return Poll::Ready(Some(message));
                }
                Poll::Ready(None) => closed += 1,
                Poll::Pending => {}
            }
        }

        if closed == count {
            Poll::Ready(None)
        } else {
            Poll::Pending
        }
    }
}

#[async_trait]
impl MessageSource for MemorySource {
    async fn next_message(&mut self) -> Option<Result<RawMessage, KafkaClientError>> {
        if self.receivers.is_empty() {
            // More listeners than partitions: this one never receives anything.
            std::future::pending::<()>().await;
        }
        futures::future::poll_fn(|cx| self.poll_partitions(cx))
            .await
            .map(Ok)
    }
}

impl Drop for MemorySource {
    fn drop(&mut self) {
        for (p, receiver) in self.partitions.iter().zip(self.receivers.drain(..)) {
            if let Ok(mut slot) = self.topic.partitions[*p as usize].receiver.lock() {
                *slot = Some(receiver);
            }
        }
    }
}
