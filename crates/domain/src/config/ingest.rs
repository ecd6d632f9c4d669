use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

use super::errors::ConfigError;
use super::logging::LogLevel;
use super::target::IngestTarget;
use crate::{EncodingMode, TopicTag};

/// Topic used when no tag is configured.
pub const DEFAULT_TAG: &str = "dns";

const DEFAULT_CACHE_DEPTH: usize = 128;

/// Settings for the audit pipeline and the ingest client it feeds.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct IngestConfig {
    /// `host:port` destinations reached over plain TCP.
    pub cleartext_targets: Vec<String>,

    /// `host:port` destinations reached over TLS.
    pub ciphertext_targets: Vec<String>,

    pub ingest_secret: String,

    pub tag: String,

    pub encoding: EncodingMode,

    pub log_level: LogLevel,

    /// Local file that holds records while no target is reachable.
    pub ingest_cache_path: Option<PathBuf>,

    /// Upper bound for the spill file; 0 means unbounded.
    pub max_cache_size_mb: u64,

    pub insecure_novalidate_tls: bool,

    /// Bound on a single write to an ingest target; unset waits indefinitely.
    pub write_timeout_ms: Option<u64>,

    /// Records that may wait in memory before submitters are held back.
    pub cache_depth: usize,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            cleartext_targets: Vec::new(),
            ciphertext_targets: Vec::new(),
            ingest_secret: String::new(),
            tag: DEFAULT_TAG.to_string(),
            encoding: EncodingMode::default(),
            log_level: LogLevel::default(),
            ingest_cache_path: None,
            max_cache_size_mb: 0,
            insecure_novalidate_tls: false,
            write_timeout_ms: None,
            cache_depth: DEFAULT_CACHE_DEPTH,
        }
    }
}

impl IngestConfig {
    /// All destinations, cleartext first, in configuration order.
    pub fn targets(&self) -> Result<Vec<IngestTarget>, ConfigError> {
        let cleartext = self
            .cleartext_targets
            .iter()
            .map(|t| IngestTarget::cleartext(t));
        let ciphertext = self
            .ciphertext_targets
            .iter()
            .map(|t| IngestTarget::ciphertext(t));

        cleartext
            .chain(ciphertext)
            .collect::<Result<Vec<_>, _>>()
            .map_err(ConfigError::Validation)
    }

    pub fn max_cache_size_bytes(&self) -> u64 {
        self.max_cache_size_mb.saturating_mul(1024 * 1024)
    }

    pub fn write_timeout(&self) -> Option<Duration> {
        self.write_timeout_ms.map(Duration::from_millis)
    }

    pub fn verify_tls(&self) -> bool {
        !self.insecure_novalidate_tls
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_cache_size_mb > 0 && self.ingest_cache_path.is_none() {
            return Err(ConfigError::Validation(
                "max_cache_size_mb may not be set without an ingest_cache_path".to_string(),
            ));
        }

        TopicTag::validate_name(&self.tag).map_err(|e| {
            ConfigError::Validation(format!(
                "Tag not appropriately defined. Exactly one tag must be specified: {}",
                e
            ))
        })?;

        if self.targets()?.is_empty() {
            return Err(ConfigError::Validation(
                "Invalid destination count, > 0 destinations must be specified".to_string(),
            ));
        }

        if self.ingest_secret.is_empty() {
            return Err(ConfigError::Validation(
                "Invalid ingest secret. An auth token is required".to_string(),
            ));
        }

        if self.cache_depth == 0 {
            return Err(ConfigError::Validation(
                "cache_depth must be greater than 0".to_string(),
            ));
        }

        Ok(())
    }
}
