//! # mediaflow
//!
//! A media ingestion pipeline: delimited batch input is parsed into
//! [`MediaRecord`]s, published as JSON onto a partitioned Kafka topic,
//! consumed by a group of concurrent listeners and written to Cassandra over
//! a pinned-CA TLS session.
//!
//! ## Components
//!
//! - **RecordSource**: streaming `$`-delimited parser built on `csv`
//! - **Publisher**: fire-and-forget sends with optional delivery handles
//! - **ConsumerGroup**: `C` listener tasks per topic, one partition owner each
//! - **SecureSessionManager**: one shared, authenticated, keyspace-bound session
//! - **StorageWriter**: one bound INSERT per record
//! - **CompletionBarrier**: lets a trigger wait (bounded) for its records to land
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use mediaflow::{AppConfig, MediaService, MemoryBus, SecureSessionManager, ShutdownCoordinator};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = AppConfig::load(None)?;
//!     config.validate()?;
//!
//!     let bus = Arc::new(MemoryBus::new());
//!     bus.create_topic(&config.kafka.topic, config.kafka.partitions as usize);
//!     bus.create_topic(&config.kafka.probe_topic(), config.kafka.partitions as usize);
//!
//!     let sessions = Arc::new(SecureSessionManager::scylla(config.cassandra.clone()));
//!     let service = MediaService::new(config, bus.clone(), sessions)?;
//!     let group = service.start_consumers(bus.as_ref(), ShutdownCoordinator::new())?;
//!
//!     let report = service.trigger().run().await?;
//!     println!("batch {} dispatched {} record(s): {:?}", report.batch_id, report.dispatched, report.outcome);
//!
//!     group.shutdown().await;
//!     Ok(())
//! }
//! ```

#![allow(clippy::new_without_default)]

pub mod mediaflow;

pub use mediaflow::bus::{
    KafkaMessageSource, KafkaSourceFactory, MemoryBus, MessageSource, RecordSink, SourceFactory,
};
pub use mediaflow::cassandra::{
    ConnectionError, CqlExecutor, ScyllaConnector, SecureSessionManager, SessionConnector,
    StorageWriter, VideoRow, WriteError,
};
pub use mediaflow::config::{
    AppConfig, BusKind, CassandraConfig, ConfigError, IngestSettings, KafkaSettings,
    ServerSettings,
};
pub use mediaflow::error::IngestError;
pub use mediaflow::kafka::{
    BytesSerializer, CommonKafkaConfig, ConsumerConfig, DeliveryHandle, DeliveryReport, Headers,
    JsonSerializer, KafkaAdminClient, KafkaClientError, KafkaConsumer, KafkaProducer, Message,
    PublishError, RawMessage, Serde, SerializationError, StringSerializer,
};
pub use mediaflow::media::{MediaRecord, ParseError, RecordSource};
pub use mediaflow::pipeline::{
    BarrierOutcome, BarrierRegistry, BarrierState, CompletionBarrier, ConsumerGroup,
    IngestInput, IngestReport, IngestionTrigger, ListenerRegistry, MediaListener,
    MessageHandler, NoopListener, Publisher,
};
pub use mediaflow::server::{ShutdownCoordinator, ShutdownSignal};
pub use mediaflow::service::MediaService;
