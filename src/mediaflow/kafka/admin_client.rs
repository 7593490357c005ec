//! Topic provisioning through the rdkafka admin client

use crate::mediaflow::kafka::client_config_builder::ClientConfigBuilder;
use crate::mediaflow::kafka::common_config::CommonKafkaConfig;
use crate::mediaflow::kafka::kafka_error::KafkaClientError;
use rdkafka::admin::{AdminClient, AdminOptions, NewTopic, TopicReplication};
use rdkafka::client::DefaultClientContext;
use rdkafka::error::KafkaError;
use rdkafka::types::RDKafkaErrorCode;
use std::time::Duration;

const ADMIN_TIMEOUT: Duration = Duration::from_secs(30);
const METADATA_TIMEOUT: Duration = Duration::from_secs(10);

pub struct KafkaAdminClient {
    admin: AdminClient<DefaultClientContext>,
}

impl KafkaAdminClient {
    pub fn new(common: &CommonKafkaConfig) -> Result<Self, KafkaError> {
        let admin: AdminClient<DefaultClientContext> = ClientConfigBuilder::from_common(common)
            .client_id("mediaflow-admin")
            .build()
            .create()?;

        Ok(Self { admin })
    }

    /// Creates the topic unless it already exists
    ///
    /// An existing topic is left untouched, whatever its partition count;
    /// [`partition_count`](Self::partition_count) reports what the broker has.
    pub async fn ensure_topic(
        &self,
        topic_name: &str,
        partitions: i32,
        replication_factor: i32,
    ) -> Result<(), KafkaClientError> {
        let new_topic = NewTopic::new(
            topic_name,
            partitions,
            TopicReplication::Fixed(replication_factor),
        );

        let admin_opts = AdminOptions::new()
            .operation_timeout(Some(ADMIN_TIMEOUT))
            .request_timeout(Some(ADMIN_TIMEOUT));

        let results = self.admin.create_topics(&[new_topic], &admin_opts).await?;

        for result in results {
            match result {
                Ok(topic) => {
                    log::info!(
                        "Created topic '{}' with {} partition(s), replication factor {}",
                        topic,
                        partitions,
                        replication_factor
                    );
                }
                Err((topic, RDKafkaErrorCode::TopicAlreadyExists)) => {
                    log::info!("Topic '{}' already exists, continuing", topic);
                }
                Err((topic, code)) => {
                    log::error!("Failed to create topic '{}': {}", topic, code);
                    return Err(KafkaError::AdminOp(code).into());
                }
            }
        }

        Ok(())
    }

    pub fn topic_exists(&self, topic_name: &str) -> Result<bool, KafkaClientError> {
        let metadata = self
            .admin
            .inner()
            .fetch_metadata(Some(topic_name), METADATA_TIMEOUT)?;

        Ok(metadata
            .topics()
            .iter()
            .any(|topic| topic.name() == topic_name && topic.error().is_none()))
    }

    pub fn partition_count(&self, topic_name: &str) -> Result<usize, KafkaClientError> {
        let metadata = self
            .admin
            .inner()
            .fetch_metadata(Some(topic_name), METADATA_TIMEOUT)?;

        metadata
            .topics()
            .iter()
            .find(|topic| topic.name() == topic_name && topic.error().is_none())
            .map(|topic| topic.partitions().len())
            .ok_or_else(|| KafkaClientError::UnknownTopic(topic_name.to_string()))
    }
}
