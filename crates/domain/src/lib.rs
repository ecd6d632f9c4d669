//! Ferrous DNS Audit domain layer
pub mod config;
pub mod encoding;
pub mod endpoint;
pub mod errors;
pub mod topic;

pub use config::{
    CliOverrides, Config, ConfigError, IngestConfig, IngestTarget, LogLevel, LoggingConfig,
    ServerConfig, UpstreamConfig,
};
pub use encoding::EncodingMode;
pub use endpoint::{Endpoint, NetProtocol};
pub use errors::DomainError;
pub use topic::TopicTag;
