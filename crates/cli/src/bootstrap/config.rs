use ferrous_dns_audit_domain::{CliOverrides, Config};

/// Loads the configuration file, applies CLI overrides and validates the result.
///
/// Runs before logging is initialised, so failures are reported through the returned error.
pub fn load_config(path: Option<&str>, overrides: CliOverrides) -> anyhow::Result<Config> {
    let config = Config::load(path, overrides)?;
    config.validate()?;
    Ok(config)
}
