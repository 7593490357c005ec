pub mod admin_client;
pub mod client_config_builder;
pub mod common_config;
pub mod consumer_config;
pub mod headers;
pub mod kafka_consumer;
pub mod kafka_error;
pub mod kafka_producer;
pub mod message;
pub mod producer_context;
pub mod serialization;
pub mod utils;

pub use admin_client::KafkaAdminClient;
pub use client_config_builder::ClientConfigBuilder;
pub use common_config::{BrokerAddressFamily, CommonKafkaConfig};
pub use consumer_config::{ConsumerConfig, OffsetReset};
pub use headers::{
    BATCH_ID_HEADER, Headers, TYPE_ID_HEADER, UNKNOWN_TYPE_ID, type_id_header,
};
pub use kafka_consumer::{KafkaConsumer, LoggingConsumerContext};
pub use kafka_error::{ConsumerError, KafkaClientError, PublishError};
pub use kafka_producer::KafkaProducer;
pub use message::{Message, RawMessage};
pub use producer_context::{DeliveryHandle, DeliveryReport, LoggingProducerContext};
pub use serialization::{
    BytesSerializer, JsonSerializer, Serde, SerializationError, StringSerializer,
};
