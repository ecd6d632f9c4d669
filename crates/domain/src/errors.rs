use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DomainError {
    #[error("Query timeout")]
    QueryTimeout,

    #[error("Query cancelled")]
    Cancelled,

    #[error("Upstream {server} failed: {reason}")]
    Upstream { server: String, reason: String },

    #[error("Invalid DNS message: {0}")]
    InvalidDnsMessage(String),

    #[error("Failed to write DNS response: {0}")]
    ResponseWrite(String),

    #[error("Invalid topic tag: {0}")]
    InvalidTag(String),

    #[error("Unknown topic tag: {0}")]
    UnknownTag(String),

    #[error("Delivery channel closed")]
    ChannelClosed,

    #[error("Delivery channel not ready: {0}")]
    ChannelNotReady(String),

    #[error("Delivery rejected: {0}")]
    DeliveryRejected(String),

    #[error("Ingest handshake failed with {target}: {reason}")]
    Handshake { target: String, reason: String },

    #[error("I/O error: {0}")]
    IoError(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),
}

impl From<std::io::Error> for DomainError {
    fn from(e: std::io::Error) -> Self {
        DomainError::IoError(e.to_string())
    }
}
