use super::frame::Entry;
use bytes::BytesMut;
use ferrous_dns_audit_domain::DomainError;
use std::path::{Path, PathBuf};
use tokio::fs::{self, OpenOptions};
use tokio::io::AsyncWriteExt;
use tracing::{debug, warn};

/// File-backed overflow for entries that could not be shipped.
///
/// Entries are appended in wire form and handed back in order by [`drain`](Self::drain).
pub struct SpillCache {
    path: PathBuf,
    max_bytes: u64,
    size: u64,
}

impl SpillCache {
    /// Opens (or creates) the cache file. `max_bytes == 0` means unbounded.
    pub async fn open(path: impl AsRef<Path>, max_bytes: u64) -> Result<Self, DomainError> {
        let path = path.as_ref().to_path_buf();

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).await.map_err(|e| {
                DomainError::IoError(format!(
                    "Failed to create cache directory {}: {}",
                    parent.display(),
                    e
                ))
            })?;
        }

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .await
            .map_err(|e| {
                DomainError::IoError(format!(
                    "Failed to open ingest cache {}: {}",
                    path.display(),
                    e
                ))
            })?;
        let size = file.metadata().await?.len();

        debug!(path = %path.display(), size, max_bytes, "Ingest cache opened");

        Ok(Self {
            path,
            max_bytes,
            size,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn size(&self) -> u64 {
        self.size
    }

    pub fn is_empty(&self) -> bool {
        self.size == 0
    }

    /// Appends `entry`. Returns `false` when the size bound would be exceeded and
    /// the entry was not written.
    pub async fn append(&mut self, entry: &Entry) -> Result<bool, DomainError> {
        let len = entry.encoded_len() as u64;
        if self.max_bytes > 0 && self.size + len > self.max_bytes {
            return Ok(false);
        }

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await?;
        file.write_all(&entry.to_bytes()).await?;
        file.flush().await?;

        self.size += len;
        Ok(true)
    }

    /// Reads every cached entry and empties the file.
    ///
    /// A truncated or corrupt tail is discarded with a warning.
    pub async fn drain(&mut self) -> Result<Vec<Entry>, DomainError> {
        if self.size == 0 {
            return Ok(Vec::new());
        }

        let mut buf = BytesMut::from(&fs::read(&self.path).await?[..]);
        let mut entries = Vec::new();
        loop {
            match Entry::decode(&mut buf) {
                Ok(Some(entry)) => entries.push(entry),
                Ok(None) => break,
                Err(e) => {
                    warn!(error = %e, path = %self.path.display(), "Corrupt ingest cache entry");
                    buf.clear();
                    break;
                }
            }
        }
        if !buf.is_empty() {
            warn!(
                bytes = buf.len(),
                path = %self.path.display(),
                "Discarding truncated ingest cache tail"
            );
        }

        fs::write(&self.path, b"").await?;
        self.size = 0;

        debug!(entries = entries.len(), "Ingest cache drained");
        Ok(entries)
    }
}
