use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::str::FromStr;
use std::time::Duration;

/// Address family librdkafka uses when resolving broker hostnames
///
/// Defaults to `v4`: inside Docker `localhost` may resolve to `::1` while the
/// broker only listens on IPv4.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BrokerAddressFamily {
    #[default]
    V4,
    V6,
    /// librdkafka's own default; nothing is set
    Any,
}

impl BrokerAddressFamily {
    /// Value for `broker.address.family`, `None` when librdkafka should decide
    pub fn librdkafka_value(&self) -> Option<&'static str> {
        match self {
            BrokerAddressFamily::V4 => Some("v4"),
            BrokerAddressFamily::V6 => Some("v6"),
            BrokerAddressFamily::Any => None,
        }
    }
}

impl FromStr for BrokerAddressFamily {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "v4" | "ipv4" => Ok(BrokerAddressFamily::V4),
            "v6" | "ipv6" => Ok(BrokerAddressFamily::V6),
            "any" | "both" => Ok(BrokerAddressFamily::Any),
            other => Err(format!(
                "unknown address family '{}', expected v4, v6 or any",
                other
            )),
        }
    }
}

/// Client settings shared by the producer, the listeners' consumers and the admin client
#[derive(Debug, Clone)]
pub struct CommonKafkaConfig {
    /// Comma-separated bootstrap list
    pub brokers: String,
    pub client_id: Option<String>,
    pub request_timeout: Duration,
    pub address_family: BrokerAddressFamily,
    /// Passed verbatim to librdkafka (e.g. `security.protocol`)
    pub properties: HashMap<String, String>,
}

impl CommonKafkaConfig {
    pub fn new(brokers: impl Into<String>) -> Self {
        Self {
            brokers: brokers.into(),
            client_id: None,
            request_timeout: Duration::from_secs(30),
            address_family: BrokerAddressFamily::default(),
            properties: HashMap::new(),
        }
    }

    pub fn client_id(mut self, client_id: impl Into<String>) -> Self {
        self.client_id = Some(client_id.into());
        self
    }

    pub fn request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    pub fn address_family(mut self, family: BrokerAddressFamily) -> Self {
        self.address_family = family;
        self
    }

    pub fn property(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.properties.insert(key.into(), value.into());
        self
    }

    pub fn properties(mut self, properties: HashMap<String, String>) -> Self {
        self.properties.extend(properties);
        self
    }
}
