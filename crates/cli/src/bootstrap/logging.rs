use ferrous_dns_audit_domain::Config;
use tracing_subscriber::EnvFilter;

/// Log target of the ingest client; its verbosity is configured separately.
const INGEST_TARGET: &str = "ferrous_dns_audit_infrastructure::ingest";

fn default_directives(config: &Config) -> String {
    format!(
        "{},{}={}",
        config.logging.level.trim().to_ascii_lowercase(),
        INGEST_TARGET,
        config.ingest.log_level
    )
}

/// Installs the global subscriber. `RUST_LOG` takes precedence over the configuration.
pub fn init_logging(config: &Config) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directives(config)));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}
