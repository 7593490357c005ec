use rdkafka::message::Headers as KafkaHeaders;
use std::collections::HashMap;
use std::sync::Arc;

/// Header carrying the logical payload type, read by listeners before deserializing.
pub const TYPE_ID_HEADER: &str = "__TypeId__";

/// Header carrying the id of the ingestion trigger that dispatched the message.
pub const BATCH_ID_HEADER: &str = "x-mediaflow-batch";

/// Value reported by [`type_id_header`] when a message carries no type id.
pub const UNKNOWN_TYPE_ID: &str = "N/A";

/// Message headers with a small builder-style API
///
/// `Headers` wraps an `Arc<HashMap<String, Option<String>>>`, so cloning a
/// message's headers while it is handed between the consumer and a listener
/// is an atomic increment. Null headers (present key, no value) are kept
/// distinct from absent ones.
///
/// # Examples
///
/// ```rust
/// # use mediaflow::Headers;
/// let headers = Headers::new()
///     .insert("__TypeId__", "MediaRecord")
///     .insert("x-mediaflow-batch", "4b1c0e9e")
///     .insert_null("optional-field");
///
/// assert_eq!(headers.get("__TypeId__"), Some("MediaRecord"));
/// assert!(headers.contains_key("optional-field"));
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct Headers {
    inner: Arc<HashMap<String, Option<String>>>,
}

impl Headers {
    /// Creates a new empty headers collection
    pub fn new() -> Self {
        Self {
            inner: Arc::new(HashMap::new()),
        }
    }

    /// Creates a new headers collection with specified capacity
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            inner: Arc::new(HashMap::with_capacity(capacity)),
        }
    }

    /// Inserts a header with a value (copy-on-write when shared)
    pub fn insert(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        Arc::make_mut(&mut self.inner).insert(key.into(), Some(value.into()));
        self
    }

    /// Inserts a header with no value
    pub fn insert_null(mut self, key: impl Into<String>) -> Self {
        Arc::make_mut(&mut self.inner).insert(key.into(), None);
        self
    }

    /// Gets a header value by key
    pub fn get(&self, key: &str) -> Option<&str> {
        self.inner.get(key).and_then(|v| v.as_deref())
    }

    /// Checks if a header exists (regardless of value)
    pub fn contains_key(&self, key: &str) -> bool {
        self.inner.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Option<String>)> {
        self.inner.as_ref().iter()
    }

    /// Converts to rdkafka OwnedHeaders for the producer
    pub(crate) fn to_rdkafka_headers(&self) -> rdkafka::message::OwnedHeaders {
        let mut headers = rdkafka::message::OwnedHeaders::new_with_capacity(self.inner.len());

        for (key, value) in self.inner.as_ref() {
            headers = headers.insert(rdkafka::message::Header {
                key,
                value: value.as_deref(),
            });
        }

        headers
    }

    /// Creates Headers from rdkafka headers, decoding values lossily as UTF-8
    pub(crate) fn from_rdkafka_headers<H: KafkaHeaders>(kafka_headers: &H) -> Self {
        let mut headers = HashMap::with_capacity(kafka_headers.count());

        for i in 0..kafka_headers.count() {
            let header = kafka_headers.get(i);
            let value = header
                .value
                .map(|v| String::from_utf8_lossy(v).into_owned());
            headers.insert(header.key.to_string(), value);
        }

        Self {
            inner: Arc::new(headers),
        }
    }
}

impl Default for Headers {
    fn default() -> Self {
        Self::new()
    }
}

/// Returns the logical type id of a message, or [`UNKNOWN_TYPE_ID`] when absent.
pub fn type_id_header(headers: &Headers) -> &str {
    headers.get(TYPE_ID_HEADER).unwrap_or(UNKNOWN_TYPE_ID)
}
