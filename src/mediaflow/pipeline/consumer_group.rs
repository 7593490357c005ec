use super::listener::{ListenerRegistry, MessageHandler};
use crate::mediaflow::bus::{MessageSource, SourceFactory};
use crate::mediaflow::kafka::KafkaClientError;
use crate::mediaflow::server::shutdown::{ShutdownCoordinator, ShutdownSignal};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::broadcast;
use tokio::task::JoinHandle;

/// Per-listener counters
#[derive(Debug, Default)]
pub struct ListenerStats {
    processed: AtomicU64,
    failed: AtomicU64,
}

impl ListenerStats {
    pub fn processed(&self) -> u64 {
        self.processed.load(Ordering::Relaxed)
    }

    pub fn failed(&self) -> u64 {
        self.failed.load(Ordering::Relaxed)
    }
}

/// Identifies one listener task in a group
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListenerId {
    pub topic: String,
    pub index: usize,
}

/// `concurrency` listener tasks per registered topic
///
/// Each listener owns its own [`MessageSource`]; the bus decides which
/// partitions it reads. A listener handles one message at a time, so a
/// slow write holds back only that listener's partitions.
pub struct ConsumerGroup {
    shutdown: ShutdownCoordinator,
    tasks: Vec<JoinHandle<()>>,
    stats: Vec<(ListenerId, Arc<ListenerStats>)>,
}

impl ConsumerGroup {
    /// Creates every source up front, then spawns the listeners
    ///
    /// Fails without spawning anything if any source cannot be created. The
    /// sources built before the failure are dropped, which releases whatever
    /// they had claimed, so a later start can succeed.
    pub fn start(
        registry: &ListenerRegistry,
        factory: &dyn SourceFactory,
        concurrency: usize,
        shutdown: ShutdownCoordinator,
    ) -> Result<Self, KafkaClientError> {
        let concurrency = concurrency.max(1);
        let mut pending = Vec::new();

        for topic in registry.topics() {
            let Some(handler) = registry.handler_for(&topic) else {
                continue;
            };
            for index in 0..concurrency {
                let source = factory.create(&topic, index, concurrency)?;
                let id = ListenerId {
                    topic: topic.clone(),
                    index,
                };
                pending.push((id, source, Arc::clone(&handler)));
            }
        }

        let mut tasks = Vec::with_capacity(pending.len());
        let mut stats = Vec::with_capacity(pending.len());

        for (id, source, handler) in pending {
            let listener_stats = Arc::new(ListenerStats::default());
            tasks.push(tokio::spawn(run_listener(
                id.clone(),
                source,
                handler,
                Arc::clone(&listener_stats),
                shutdown.subscribe(),
            )));
            stats.push((id, listener_stats));
        }

        log::info!(
            "Started {} listener(s) across {} topic(s), concurrency {}",
            tasks.len(),
            registry.len(),
            concurrency
        );

        Ok(Self {
            shutdown,
            tasks,
            stats,
        })
    }

    pub fn listener_count(&self) -> usize {
        self.tasks.len()
    }

    pub fn stats(&self) -> &[(ListenerId, Arc<ListenerStats>)] {
        &self.stats
    }

    pub fn total_processed(&self) -> u64 {
        self.stats.iter().map(|(_, s)| s.processed()).sum()
    }

    pub fn total_failed(&self) -> u64 {
        self.stats.iter().map(|(_, s)| s.failed()).sum()
    }

    /// Stops every listener after its current message and waits for them
    pub async fn shutdown(self) {
        self.shutdown.trigger(ShutdownSignal::Requested);
        for task in self.tasks {
            if let Err(e) = task.await {
                log::error!("Listener task ended abnormally: {}", e);
            }
        }
        log::info!("Consumer group stopped");
    }
}

async fn run_listener(
    id: ListenerId,
    mut source: Box<dyn MessageSource>,
    handler: Arc<dyn MessageHandler>,
    stats: Arc<ListenerStats>,
    mut shutdown: broadcast::Receiver<ShutdownSignal>,
) {
    log::debug!("Listener {}#{} running", id.topic, id.index);

    loop {
        let next = tokio::select! {
            signal = shutdown.recv() => {
                log::debug!(
                    "Listener {}#{} stopping on {:?}",
                    id.topic,
                    id.index,
                    signal
                );
                break;
            }
            next = source.next_message() => next,
        };

        let message = match next {
            Some(Ok(message)) => message,
            Some(Err(e)) => {
                log::error!("Listener {}#{} failed to receive: {}", id.topic, id.index, e);
                continue;
            }
            None => {
                log::info!("Listener {}#{} source closed", id.topic, id.index);
                break;
            }
        };

        stats.processed.fetch_add(1, Ordering::Relaxed);
        if let Err(e) = handler.handle(&message).await {
            stats.failed.fetch_add(1, Ordering::Relaxed);
            log::error!(
                target: "mediaflow::listener",
                "Listener {}#{} failed on partition {} offset {}: {}",
                id.topic,
                id.index,
                message.partition(),
                message.offset(),
                e
            );
        }
    }
}
