pub mod directives;
pub mod errors;
pub mod ingest;
pub mod logging;
pub mod root;
pub mod server;
pub mod target;
pub mod upstream;

pub use directives::{parse_directive_block, BLOCK_NAME};
pub use errors::ConfigError;
pub use ingest::{IngestConfig, DEFAULT_TAG};
pub use logging::{LogLevel, LoggingConfig};
pub use root::{CliOverrides, Config};
pub use server::ServerConfig;
pub use target::IngestTarget;
pub use upstream::UpstreamConfig;
