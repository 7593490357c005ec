use crate::mediaflow::kafka::headers::Headers;

/// A consumed message: deserialized key and value, headers, and its position in the topic
#[derive(Debug, Clone)]
pub struct Message<K, V> {
    key: Option<K>,
    value: V,
    headers: Headers,
    partition: i32,
    offset: i64,
    timestamp: Option<i64>,
}

/// What listeners receive: string key, undecoded payload
pub type RawMessage = Message<String, Vec<u8>>;

impl<K, V> Message<K, V> {
    pub fn new(
        key: Option<K>,
        value: V,
        headers: Headers,
        partition: i32,
        offset: i64,
        timestamp: Option<i64>,
    ) -> Self {
        Self {
            key,
            value,
            headers,
            partition,
            offset,
            timestamp,
        }
    }

    pub fn key(&self) -> Option<&K> {
        self.key.as_ref()
    }

    pub fn value(&self) -> &V {
        &self.value
    }

    pub fn headers(&self) -> &Headers {
        &self.headers
    }

    pub fn partition(&self) -> i32 {
        self.partition
    }

    pub fn offset(&self) -> i64 {
        self.offset
    }

    /// Milliseconds since the Unix epoch, when the broker reported one
    pub fn timestamp(&self) -> Option<i64> {
        self.timestamp
    }

    pub fn into_value(self) -> V {
        self.value
    }

    pub fn into_parts(self) -> (Option<K>, V, Headers) {
        (self.key, self.value, self.headers)
    }
}
