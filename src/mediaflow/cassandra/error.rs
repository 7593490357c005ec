use std::error::Error as StdError;

/// Failure to establish (or find) the secure store session
#[derive(Debug, thiserror::Error)]
pub enum ConnectionError {
    #[error("Failed to read certificate file '{path}': {source}")]
    CertificateLoad {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("No PEM certificate found in '{path}'")]
    NoCertificate { path: String },

    #[error("Certificate in '{path}' is not a usable trust anchor: {reason}")]
    InvalidCertificate { path: String, reason: String },

    #[error("Endpoint '{endpoint}' is not a valid certificate name")]
    EndpointName { endpoint: String },

    #[error("Failed to load private key from '{path}': {reason}")]
    PrivateKey { path: String, reason: String },

    #[error("TLS configuration error: {0}")]
    Tls(#[from] rustls::Error),

    #[error("Failed to open session to {endpoint}: {source}")]
    Session {
        endpoint: String,
        #[source]
        source: Box<dyn StdError + Send + Sync>,
    },

    #[error("Session has not been established")]
    NotEstablished,
}

/// Failure to persist one record
#[derive(Debug, thiserror::Error)]
pub enum WriteError {
    #[error("Value '{value}' cannot be stored in column {column}")]
    InvalidValue { column: &'static str, value: String },

    #[error("Statement execution failed: {0}")]
    Execution(#[source] Box<dyn StdError + Send + Sync>),

    #[error("No session available: {0}")]
    SessionUnavailable(#[from] ConnectionError),
}
