use super::common_config::CommonKafkaConfig;
use rdkafka::config::ClientConfig;

/// Translates a [`CommonKafkaConfig`] into librdkafka properties
///
/// Role-specific settings (`group.id`, `message.timeout.ms`, ...) are layered
/// on with [`set`](Self::set) before [`build`](Self::build).
pub struct ClientConfigBuilder {
    config: ClientConfig,
}

impl ClientConfigBuilder {
    pub fn from_common(common: &CommonKafkaConfig) -> Self {
        let mut config = ClientConfig::new();
        config
            .set("bootstrap.servers", &common.brokers)
            .set(
                "request.timeout.ms",
                common.request_timeout.as_millis().to_string(),
            );

        if let Some(family) = common.address_family.librdkafka_value() {
            config.set("broker.address.family", family);
        }
        if let Some(client_id) = &common.client_id {
            config.set("client.id", client_id);
        }
        for (key, value) in &common.properties {
            config.set(key, value);
        }

        Self { config }
    }

    /// Overrides the client id set by the common settings
    pub fn client_id(self, client_id: &str) -> Self {
        self.set("client.id", client_id)
    }

    pub fn set(mut self, key: &str, value: impl Into<String>) -> Self {
        self.config.set(key, value);
        self
    }

    pub fn build(self) -> ClientConfig {
        self.config
    }
}
