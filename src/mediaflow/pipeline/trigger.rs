use super::barrier::{BarrierOutcome, BarrierRegistry, CompletionBarrier, DEFAULT_BARRIER_TIMEOUT};
use super::publisher::Publisher;
use crate::mediaflow::cassandra::SecureSessionManager;
use crate::mediaflow::error::IngestError;
use crate::mediaflow::media::{EMBEDDED_MEDIA_CSV, ParseError, RecordSource};
use std::fmt;
use std::io::Read;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

/// Where a trigger reads its batch from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IngestInput {
    /// The sample batch compiled into the binary
    Embedded,
    File(PathBuf),
    Text(String),
}

impl IngestInput {
    fn open(&self) -> Result<Box<dyn Read + Send + '_>, ParseError> {
        match self {
            IngestInput::Embedded => Ok(Box::new(EMBEDDED_MEDIA_CSV.as_bytes())),
            IngestInput::File(path) => std::fs::File::open(path)
                .map(|file| Box::new(std::io::BufReader::new(file)) as Box<dyn Read + Send>)
                .map_err(|source| ParseError::Open {
                    path: path.display().to_string(),
                    source,
                }),
            IngestInput::Text(text) => Ok(Box::new(text.as_bytes())),
        }
    }
}

/// What one trigger run did
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IngestReport {
    pub batch_id: String,
    /// Records handed to the bus
    pub dispatched: usize,
    pub outcome: BarrierOutcome,
}

/// Parses a batch, publishes every record and waits (bounded) for the listeners
pub struct IngestionTrigger {
    sessions: Arc<SecureSessionManager>,
    publisher: Publisher,
    barriers: Arc<BarrierRegistry>,
    source: RecordSource,
    input: IngestInput,
    topic: String,
    timeout: Duration,
}

impl IngestionTrigger {
    pub fn new(
        sessions: Arc<SecureSessionManager>,
        publisher: Publisher,
        barriers: Arc<BarrierRegistry>,
        topic: impl Into<String>,
    ) -> Self {
        Self {
            sessions,
            publisher,
            barriers,
            source: RecordSource::default(),
            input: IngestInput::Embedded,
            topic: topic.into(),
            timeout: DEFAULT_BARRIER_TIMEOUT,
        }
    }

    pub fn with_input(mut self, input: IngestInput) -> Self {
        self.input = input;
        self
    }

    pub fn with_source(mut self, source: RecordSource) -> Self {
        self.source = source;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn topic(&self) -> &str {
        &self.topic
    }

    /// Runs one ingestion
    ///
    /// Fails before publishing anything when the session cannot be
    /// established. A malformed row stops dispatch and fails the run; rows
    /// already published stay published. An expired wait is reported in the
    /// outcome, not as an error.
    pub async fn run(&self) -> Result<IngestReport, IngestError> {
        self.sessions.ensure_open().await?;

        let batch_id = uuid::Uuid::new_v4().to_string();
        let barrier = self
            .barriers
            .register(batch_id.clone(), CompletionBarrier::open());

        // Reading and parsing block; they run on the blocking pool.
        let job = DispatchJob {
            input: self.input.clone(),
            source: self.source,
            publisher: self.publisher.clone(),
            topic: self.topic.clone(),
            batch_id: batch_id.clone(),
            barrier: Arc::clone(&barrier),
        };
        let dispatched = match tokio::task::spawn_blocking(move || job.run()).await {
            Ok(Ok(dispatched)) => dispatched,
            Ok(Err(e)) => {
                self.abandon(&batch_id, &barrier, &e);
                return Err(e.into());
            }
            Err(e) => {
                let e = std::io::Error::other(e);
                self.abandon(&batch_id, &barrier, &e);
                return Err(e.into());
            }
        };

        barrier.seal();
        log::info!(
            "Dispatched {} record(s) to topic '{}' for batch {}",
            dispatched,
            self.topic,
            batch_id
        );

        let outcome = barrier.wait(self.timeout).await;
        self.barriers.discard(&batch_id);

        match outcome {
            BarrierOutcome::Released { failed: 0 } => {
                log::info!("Batch {} fully processed", batch_id)
            }
            BarrierOutcome::Released { failed } => log::warn!(
                "Batch {} processed, {} of {} record(s) failed to persist",
                batch_id,
                failed,
                dispatched
            ),
            BarrierOutcome::Expired { remaining } => log::warn!(
                "Batch {}: wait of {:?} expired with {} record(s) outstanding",
                batch_id,
                self.timeout,
                remaining
            ),
        }

        Ok(IngestReport {
            batch_id,
            dispatched,
            outcome,
        })
    }

    fn abandon(&self, batch_id: &str, barrier: &CompletionBarrier, cause: &dyn fmt::Display) {
        barrier.seal();
        self.barriers.discard(batch_id);
        log::error!(
            "Batch {} stopped after {} record(s): {}",
            batch_id,
            barrier.dispatched_count(),
            cause
        );
    }
}

/// Everything one batch's dispatch needs, owned so it can run on the blocking pool
struct DispatchJob {
    input: IngestInput,
    source: RecordSource,
    publisher: Publisher,
    topic: String,
    batch_id: String,
    barrier: Arc<CompletionBarrier>,
}

impl DispatchJob {
    fn run(self) -> Result<usize, ParseError> {
        let reader = self.input.open()?;
        let mut dispatched = 0;

        for record in self.source.records(reader) {
            let record = record?;
            match self
                .publisher
                .publish_in_batch(&self.topic, &record, &self.batch_id)
            {
                Ok(_) => {
                    self.barrier.dispatched();
                    dispatched += 1;
                }
                Err(e) => log::error!(
                    target: "mediaflow::publisher",
                    "Failed to publish '{}': {}",
                    record.title,
                    e
                ),
            }
        }

        Ok(dispatched)
    }
}
