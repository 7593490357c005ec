//! Service configuration
//!
//! Layered, lowest to highest precedence:
//! 1. Defaults (local Kafka on `localhost:9092`, Cassandra on `localhost:9042`)
//! 2. YAML file passed with `--config`
//! 3. `MEDIAFLOW_*` environment variables
//! 4. Command-line flags (applied by the binary)
//!
//! ```yaml
//! kafka:
//!   brokers: "broker1:9092,broker2:9092"
//!   topic: media
//!   concurrency: 3
//! cassandra:
//!   endpoint: cassandra.internal
//!   datacenter: dc1
//!   username: ingest
//!   password: secret
//!   ca_cert_path: /etc/mediaflow/myca.pem
//! ```

use crate::mediaflow::kafka::{BrokerAddressFamily, CommonKafkaConfig};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::env;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file '{path}': {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid YAML in '{path}': {source}")]
    Yaml {
        path: String,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Which bus implementation the service runs on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BusKind {
    #[default]
    Kafka,
    /// In-process partitioned bus, for local runs without a broker
    Memory,
}

impl FromStr for BusKind {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "kafka" => Ok(BusKind::Kafka),
            "memory" => Ok(BusKind::Memory),
            other => Err(ConfigError::Invalid(format!(
                "unknown bus '{}', expected 'kafka' or 'memory'",
                other
            ))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct KafkaSettings {
    pub bus: BusKind,
    pub brokers: String,
    pub topic: String,
    pub group_id: String,
    /// Listener tasks per subscribed topic
    pub concurrency: usize,
    pub partitions: i32,
    pub replication_factor: i32,
    pub client_id_prefix: String,
    pub address_family: BrokerAddressFamily,
    /// Passed verbatim to librdkafka
    pub custom_properties: HashMap<String, String>,
}

impl Default for KafkaSettings {
    fn default() -> Self {
        Self {
            bus: BusKind::Kafka,
            brokers: "localhost:9092".to_string(),
            topic: "media".to_string(),
            group_id: "media-group".to_string(),
            concurrency: 3,
            partitions: 3,
            replication_factor: 1,
            client_id_prefix: "media-json".to_string(),
            address_family: BrokerAddressFamily::default(),
            custom_properties: HashMap::new(),
        }
    }
}

impl KafkaSettings {
    /// Topic bound to the no-op probe listener
    pub fn probe_topic(&self) -> String {
        format!("test_{}", self.topic)
    }

    pub fn common_config(&self) -> CommonKafkaConfig {
        CommonKafkaConfig::new(self.brokers.clone())
            .client_id(self.client_id_prefix.clone())
            .address_family(self.address_family)
            .properties(self.custom_properties.clone())
    }
}

#[derive(Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CassandraConfig {
    /// Contact point host name or address
    pub endpoint: String,
    pub port: u16,
    pub datacenter: String,
    pub username: String,
    pub password: String,
    /// Pinned CA bundle; the only trust anchor for the store connection
    pub ca_cert_path: PathBuf,
    pub client_cert_path: Option<PathBuf>,
    pub client_key_path: Option<PathBuf>,
    /// Also require the server certificate to name `endpoint`
    ///
    /// Off by default: a certificate chaining to the pinned CA is enough.
    pub verify_hostname: bool,
    pub connect_timeout_secs: u64,
}

impl Default for CassandraConfig {
    fn default() -> Self {
        Self {
            endpoint: "localhost".to_string(),
            port: 9042,
            datacenter: "datacenter1".to_string(),
            username: String::new(),
            password: String::new(),
            ca_cert_path: PathBuf::from("resources/myca.pem"),
            client_cert_path: None,
            client_key_path: None,
            verify_hostname: false,
            connect_timeout_secs: 10,
        }
    }
}

impl fmt::Debug for CassandraConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CassandraConfig")
            .field("endpoint", &self.endpoint)
            .field("port", &self.port)
            .field("datacenter", &self.datacenter)
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .field("ca_cert_path", &self.ca_cert_path)
            .field("client_cert_path", &self.client_cert_path)
            .field("client_key_path", &self.client_key_path)
            .field("verify_hostname", &self.verify_hostname)
            .field("connect_timeout_secs", &self.connect_timeout_secs)
            .finish()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IngestSettings {
    /// Batch file to ingest; the embedded sample when unset
    pub resource_path: Option<PathBuf>,
    pub delimiter: char,
    pub barrier_timeout_secs: u64,
}

impl Default for IngestSettings {
    fn default() -> Self {
        Self {
            resource_path: None,
            delimiter: '$',
            barrier_timeout_secs: 60,
        }
    }
}

impl IngestSettings {
    pub fn barrier_timeout(&self) -> Duration {
        Duration::from_secs(self.barrier_timeout_secs)
    }

    /// Delimiter as the single byte the parser splits on
    pub fn delimiter_byte(&self) -> Result<u8, ConfigError> {
        if self.delimiter.is_ascii() {
            Ok(self.delimiter as u8)
        } else {
            Err(ConfigError::Invalid(format!(
                "delimiter '{}' is not a single ASCII character",
                self.delimiter
            )))
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerSettings {
    pub bind: String,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            bind: "0.0.0.0:8080".to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub kafka: KafkaSettings,
    pub cassandra: CassandraConfig,
    pub ingest: IngestSettings,
    pub server: ServerSettings,
}

fn env_string(name: &str, target: &mut String) {
    if let Ok(value) = env::var(name) {
        *target = value;
    }
}

fn env_parsed<T: FromStr>(name: &str, target: &mut T) {
    if let Ok(value) = env::var(name) {
        match value.parse() {
            Ok(parsed) => *target = parsed,
            Err(_) => log::warn!("Ignoring {}='{}': not a valid value", name, value),
        }
    }
}

fn env_path(name: &str, target: &mut Option<PathBuf>) {
    if let Ok(value) = env::var(name) {
        *target = Some(PathBuf::from(value));
    }
}

impl AppConfig {
    pub fn from_yaml_str(yaml: &str, origin: &str) -> Result<Self, ConfigError> {
        serde_yaml::from_str(yaml).map_err(|source| ConfigError::Yaml {
            path: origin.to_string(),
            source,
        })
    }

    pub fn from_yaml_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_yaml_str(&content, &path.display().to_string())
    }

    /// Defaults, then the YAML file if given, then the environment
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut config = match path {
            Some(path) => Self::from_yaml_file(path)?,
            None => Self::default(),
        };
        config.apply_env();
        Ok(config)
    }

    /// Overlays `MEDIAFLOW_*` environment variables
    pub fn apply_env(&mut self) {
        env_parsed("MEDIAFLOW_BUS", &mut self.kafka.bus);
        env_string("MEDIAFLOW_KAFKA_BROKERS", &mut self.kafka.brokers);
        env_string("MEDIAFLOW_KAFKA_TOPIC", &mut self.kafka.topic);
        env_string("MEDIAFLOW_KAFKA_GROUP_ID", &mut self.kafka.group_id);
        env_parsed("MEDIAFLOW_KAFKA_CONCURRENCY", &mut self.kafka.concurrency);
        env_parsed("MEDIAFLOW_KAFKA_PARTITIONS", &mut self.kafka.partitions);
        env_parsed(
            "MEDIAFLOW_KAFKA_REPLICATION_FACTOR",
            &mut self.kafka.replication_factor,
        );
        env_string(
            "MEDIAFLOW_KAFKA_CLIENT_ID_PREFIX",
            &mut self.kafka.client_id_prefix,
        );
        env_parsed(
            "MEDIAFLOW_KAFKA_ADDRESS_FAMILY",
            &mut self.kafka.address_family,
        );

        env_string("MEDIAFLOW_CASSANDRA_ENDPOINT", &mut self.cassandra.endpoint);
        env_parsed("MEDIAFLOW_CASSANDRA_PORT", &mut self.cassandra.port);
        env_string(
            "MEDIAFLOW_CASSANDRA_DATACENTER",
            &mut self.cassandra.datacenter,
        );
        env_string("MEDIAFLOW_CASSANDRA_USERNAME", &mut self.cassandra.username);
        env_string("MEDIAFLOW_CASSANDRA_PASSWORD", &mut self.cassandra.password);
        if let Ok(path) = env::var("MEDIAFLOW_CASSANDRA_CA_CERT") {
            self.cassandra.ca_cert_path = PathBuf::from(path);
        }
        env_path(
            "MEDIAFLOW_CASSANDRA_CLIENT_CERT",
            &mut self.cassandra.client_cert_path,
        );
        env_path(
            "MEDIAFLOW_CASSANDRA_CLIENT_KEY",
            &mut self.cassandra.client_key_path,
        );
        env_parsed(
            "MEDIAFLOW_CASSANDRA_VERIFY_HOSTNAME",
            &mut self.cassandra.verify_hostname,
        );
        env_parsed(
            "MEDIAFLOW_CASSANDRA_CONNECT_TIMEOUT_SECS",
            &mut self.cassandra.connect_timeout_secs,
        );

        env_path("MEDIAFLOW_INGEST_RESOURCE", &mut self.ingest.resource_path);
        env_parsed("MEDIAFLOW_INGEST_DELIMITER", &mut self.ingest.delimiter);
        env_parsed(
            "MEDIAFLOW_INGEST_BARRIER_TIMEOUT_SECS",
            &mut self.ingest.barrier_timeout_secs,
        );

        env_string("MEDIAFLOW_SERVER_BIND", &mut self.server.bind);
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let required = [
            ("kafka.brokers", &self.kafka.brokers),
            ("kafka.topic", &self.kafka.topic),
            ("cassandra.endpoint", &self.cassandra.endpoint),
            ("cassandra.datacenter", &self.cassandra.datacenter),
            ("cassandra.username", &self.cassandra.username),
        ];
        for (name, value) in required {
            if value.trim().is_empty() {
                return Err(ConfigError::Invalid(format!("{} must not be empty", name)));
            }
        }

        if self.kafka.concurrency == 0 {
            return Err(ConfigError::Invalid(
                "kafka.concurrency must be at least 1".to_string(),
            ));
        }
        if self.kafka.partitions < 1 {
            return Err(ConfigError::Invalid(
                "kafka.partitions must be at least 1".to_string(),
            ));
        }
        if self.kafka.concurrency > self.kafka.partitions as usize {
            log::warn!(
                "kafka.concurrency ({}) exceeds kafka.partitions ({}); {} listener(s) per topic will stay idle",
                self.kafka.concurrency,
                self.kafka.partitions,
                self.kafka.concurrency - self.kafka.partitions as usize
            );
        }

        if self.cassandra.client_cert_path.is_some() != self.cassandra.client_key_path.is_some() {
            return Err(ConfigError::Invalid(
                "cassandra.client_cert_path and cassandra.client_key_path must be set together"
                    .to_string(),
            ));
        }

        self.ingest.delimiter_byte()?;
        Ok(())
    }
}
