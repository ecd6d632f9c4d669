use super::frame::{Entry, Handshake, ACK_ACCEPTED, MAX_PAYLOAD_LEN};
use super::spill::SpillCache;
use super::tls;
use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use ferrous_dns_audit_application::ports::DeliveryChannel;
use ferrous_dns_audit_domain::{DomainError, IngestConfig, IngestTarget, TopicTag};
use rustls::pki_types::ServerName;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tokio_rustls::TlsConnector;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

const RECONNECT_INTERVAL: Duration = Duration::from_secs(1);
const CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

trait IngestStream: AsyncRead + AsyncWrite + Unpin + Send {}

impl<T: AsyncRead + AsyncWrite + Unpin + Send> IngestStream for T {}

type Connection = Box<dyn IngestStream>;

/// Delivery channel that multiplexes audit records onto the first reachable
/// ingest target.
///
/// Submissions go through a bounded queue; a single worker task owns the
/// connection, reconnects at most once per second and spills to the cache file
/// while no target accepts data.
pub struct IngestMuxer {
    tags: Vec<String>,
    queue: mpsc::Sender<Entry>,
    hot: watch::Receiver<bool>,
    worker: Mutex<Option<JoinHandle<()>>>,
}

impl IngestMuxer {
    /// Validates the target list, opens the spill cache and spawns the worker.
    ///
    /// The worker runs until `shutdown` is cancelled.
    pub async fn start(
        config: &IngestConfig,
        shutdown: CancellationToken,
    ) -> Result<Arc<Self>, DomainError> {
        let targets = config
            .targets()
            .map_err(|e| DomainError::ConfigError(e.to_string()))?;
        if targets.is_empty() {
            return Err(DomainError::ConfigError(
                "No ingest targets configured".to_string(),
            ));
        }

        let tags = vec![config.tag.clone()];
        for tag in &tags {
            TopicTag::validate_name(tag)?;
        }
        let handshake = Handshake::new(config.ingest_secret.clone(), tags.clone()).encode()?;

        let spill = match &config.ingest_cache_path {
            Some(path) => Some(SpillCache::open(path, config.max_cache_size_bytes()).await?),
            None => None,
        };

        let tls = targets
            .iter()
            .any(IngestTarget::is_tls)
            .then(|| tls::client_config(config.verify_tls()));

        let (queue, rx) = mpsc::channel(config.cache_depth.max(1));
        let (hot_tx, hot) = watch::channel(false);

        let worker = Worker {
            targets,
            handshake,
            tls,
            write_timeout: config.write_timeout(),
            spill,
            conn: None,
            last_attempt: None,
            hot: hot_tx,
            shutdown,
        };

        info!(
            targets = worker.targets.len(),
            tag = %config.tag,
            cache = config.ingest_cache_path.is_some(),
            "Starting ingest muxer"
        );

        let handle = tokio::spawn(worker.run(rx));

        Ok(Arc::new(Self {
            tags,
            queue,
            hot,
            worker: Mutex::new(Some(handle)),
        }))
    }

    /// Waits until at least one target accepted the handshake.
    pub async fn wait_for_hot(&self, timeout: Duration) -> Result<(), DomainError> {
        let mut hot = self.hot.clone();
        let result = tokio::time::timeout(timeout, hot.wait_for(|h| *h))
            .await
            .map(|r| r.map(|_| ()));
        match result {
            Ok(Ok(())) => Ok(()),
            Ok(Err(_)) => Err(DomainError::ChannelClosed),
            Err(_) => Err(DomainError::ChannelNotReady(format!(
                "no ingest target connected within {:?}",
                timeout
            ))),
        }
    }

    pub fn is_hot(&self) -> bool {
        *self.hot.borrow()
    }

    /// Waits for the worker to finish after the shutdown token was cancelled.
    pub async fn join(&self) {
        let handle = self.worker.lock().ok().and_then(|mut w| w.take());
        if let Some(handle) = handle {
            if let Err(e) = handle.await {
                error!(error = %e, "Ingest worker terminated abnormally");
            }
        }
    }
}

#[async_trait]
impl DeliveryChannel for IngestMuxer {
    async fn resolve_tag(&self, name: &str) -> Result<TopicTag, DomainError> {
        TopicTag::validate_name(name)?;
        self.tags
            .iter()
            .position(|t| t == name)
            .and_then(|i| u16::try_from(i).ok())
            .map(TopicTag::new)
            .ok_or_else(|| DomainError::UnknownTag(name.to_string()))
    }

    async fn submit(
        &self,
        timestamp: DateTime<Utc>,
        tag: TopicTag,
        payload: Vec<u8>,
    ) -> Result<(), DomainError> {
        if usize::from(tag.id()) >= self.tags.len() {
            return Err(DomainError::UnknownTag(tag.to_string()));
        }
        if payload.len() > MAX_PAYLOAD_LEN {
            return Err(DomainError::DeliveryRejected(format!(
                "record of {} bytes exceeds the {} byte limit",
                payload.len(),
                MAX_PAYLOAD_LEN
            )));
        }
        self.queue
            .send(Entry::new(timestamp, tag, payload))
            .await
            .map_err(|_| DomainError::ChannelClosed)
    }
}

struct Worker {
    targets: Vec<IngestTarget>,
    handshake: Bytes,
    tls: Option<Arc<rustls::ClientConfig>>,
    write_timeout: Option<Duration>,
    spill: Option<SpillCache>,
    conn: Option<Connection>,
    last_attempt: Option<Instant>,
    hot: watch::Sender<bool>,
    shutdown: CancellationToken,
}

impl Worker {
    async fn run(mut self, mut rx: mpsc::Receiver<Entry>) {
        let shutdown = self.shutdown.clone();
        self.reconnect().await;

        let mut ticker = tokio::time::interval(RECONNECT_INTERVAL);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                biased;
                _ = shutdown.cancelled() => break,
                entry = rx.recv() => match entry {
                    Some(entry) => self.deliver(entry).await,
                    None => break,
                },
                _ = ticker.tick(), if self.conn.is_none() => self.reconnect().await,
            }
        }

        self.drain(&mut rx).await;
        debug!("Ingest worker stopped");
    }

    async fn deliver(&mut self, entry: Entry) {
        if self.conn.is_none() {
            self.reconnect().await;
        }
        if let Err(e) = self.write(&entry).await {
            debug!(error = %e, "Ingest write failed");
            self.spill_or_drop(entry).await;
        }
    }

    /// Writes `entry` on the current connection, dropping the connection on failure.
    async fn write(&mut self, entry: &Entry) -> Result<(), DomainError> {
        let Some(conn) = self.conn.as_mut() else {
            return Err(DomainError::ChannelNotReady("no ingest connection".to_string()));
        };

        let result = write_with_timeout(conn, &entry.to_bytes(), self.write_timeout).await;
        if let Err(e) = &result {
            warn!(error = %e, "Ingest connection lost");
            self.disconnect();
        }
        result
    }

    fn disconnect(&mut self) {
        self.conn = None;
        self.hot.send_replace(false);
    }

    async fn reconnect(&mut self) {
        if let Some(last) = self.last_attempt {
            if last.elapsed() < RECONNECT_INTERVAL {
                return;
            }
        }
        self.last_attempt = Some(Instant::now());

        let targets = self.targets.clone();
        for target in &targets {
            let attempt = tokio::select! {
                biased;
                _ = self.shutdown.cancelled() => {
                    debug!(destination = %target, "Connect abandoned on shutdown");
                    return;
                }
                attempt = connect(target, &self.handshake, self.tls.as_ref()) => attempt,
            };
            match attempt {
                Ok(conn) => {
                    info!(destination = %target, "Connected to ingest target");
                    self.conn = Some(conn);
                    self.hot.send_replace(true);
                    self.replay().await;
                    return;
                }
                Err(e) => warn!(destination = %target, error = %e, "Ingest target unavailable"),
            }
        }
    }

    /// Ships everything held in the spill cache over the fresh connection.
    async fn replay(&mut self) {
        let entries = match self.spill.as_mut() {
            Some(spill) if !spill.is_empty() => match spill.drain().await {
                Ok(entries) => entries,
                Err(e) => {
                    error!(error = %e, "Failed to read ingest cache");
                    return;
                }
            },
            _ => return,
        };

        let total = entries.len();
        let mut pending = entries.into_iter();
        let mut sent = 0usize;
        while let Some(entry) = pending.next() {
            if self.write(&entry).await.is_err() {
                self.spill_or_drop(entry).await;
                for rest in pending.by_ref() {
                    self.spill_or_drop(rest).await;
                }
                break;
            }
            sent += 1;
        }

        info!(sent, total, "Replayed ingest cache");
    }

    async fn spill_or_drop(&mut self, entry: Entry) {
        let Some(spill) = self.spill.as_mut() else {
            warn!(tag = %entry.tag, bytes = entry.payload.len(), "No ingest target available, dropping record");
            return;
        };

        match spill.append(&entry).await {
            Ok(true) => {}
            Ok(false) => warn!(
                path = %spill.path().display(),
                size = spill.size(),
                "Ingest cache full, dropping record"
            ),
            Err(e) => error!(error = %e, "Failed to write ingest cache, dropping record"),
        }
    }

    /// Flushes whatever is still queued: to the live connection if there is one,
    /// otherwise into the spill cache.
    async fn drain(&mut self, rx: &mut mpsc::Receiver<Entry>) {
        rx.close();
        let mut flushed = 0usize;
        while let Ok(entry) = rx.try_recv() {
            if self.write(&entry).await.is_err() {
                self.spill_or_drop(entry).await;
            }
            flushed += 1;
        }

        if let Some(conn) = self.conn.as_mut() {
            if let Err(e) = conn.shutdown().await {
                debug!(error = %e, "Ingest connection shutdown failed");
            }
        }
        self.disconnect();

        if flushed > 0 {
            info!(flushed, "Flushed queued audit records on shutdown");
        }
    }
}

async fn connect(
    target: &IngestTarget,
    handshake: &[u8],
    tls: Option<&Arc<rustls::ClientConfig>>,
) -> Result<Connection, DomainError> {
    let tcp = tokio::time::timeout(
        CONNECT_TIMEOUT,
        TcpStream::connect((target.host(), target.port())),
    )
    .await
    .map_err(|_| handshake_error(target, "connect timed out"))?
    .map_err(|e| handshake_error(target, e))?;
    tcp.set_nodelay(true)?;

    let mut conn: Connection = match (target.is_tls(), tls) {
        (true, Some(config)) => {
            let server_name = ServerName::try_from(target.host().to_string())
                .map_err(|e| handshake_error(target, e))?;
            let stream = tokio::time::timeout(
                CONNECT_TIMEOUT,
                TlsConnector::from(Arc::clone(config)).connect(server_name, tcp),
            )
            .await
            .map_err(|_| handshake_error(target, "TLS handshake timed out"))?
            .map_err(|e| handshake_error(target, e))?;
            Box::new(stream)
        }
        (true, None) => return Err(handshake_error(target, "TLS is not configured")),
        (false, _) => Box::new(tcp),
    };

    write_with_timeout(&mut conn, handshake, Some(CONNECT_TIMEOUT)).await?;

    let mut ack = [0u8; 1];
    tokio::time::timeout(CONNECT_TIMEOUT, conn.read_exact(&mut ack))
        .await
        .map_err(|_| handshake_error(target, "no acknowledgement"))?
        .map_err(|e| handshake_error(target, e))?;
    if ack[0] != ACK_ACCEPTED {
        return Err(handshake_error(
            target,
            format!("rejected with status {}", ack[0]),
        ));
    }

    Ok(conn)
}

async fn write_with_timeout(
    conn: &mut Connection,
    bytes: &[u8],
    timeout: Option<Duration>,
) -> Result<(), DomainError> {
    let write = async {
        conn.write_all(bytes).await?;
        conn.flush().await
    };
    match timeout {
        Some(limit) => tokio::time::timeout(limit, write)
            .await
            .map_err(|_| DomainError::IoError(format!("Ingest write timed out after {:?}", limit)))?
            .map_err(DomainError::from),
        None => write.await.map_err(DomainError::from),
    }
}

fn handshake_error(target: &IngestTarget, reason: impl std::fmt::Display) -> DomainError {
    DomainError::Handshake {
        target: target.to_string(),
        reason: reason.to_string(),
    }
}
