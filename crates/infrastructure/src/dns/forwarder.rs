use super::wire;
use async_trait::async_trait;
use ferrous_dns_audit_application::ports::{DnsHandler, ResponseWriter, ServeOutcome};
use ferrous_dns_audit_domain::{DomainError, UpstreamConfig};
use hickory_proto::op::{Message, ResponseCode};
use std::net::SocketAddr;
use std::time::Duration;
use tokio::net::UdpSocket;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

/// Maximum UDP DNS response size with EDNS(0)
const MAX_UDP_RESPONSE_SIZE: usize = 4096;

/// Terminal handler that relays each request to one upstream resolver over UDP.
///
/// Failures are answered with SERVFAIL so the client is never left waiting.
pub struct UpstreamForwarder {
    server: SocketAddr,
    timeout: Duration,
}

impl UpstreamForwarder {
    pub fn new(server: SocketAddr, timeout: Duration) -> Self {
        Self { server, timeout }
    }

    pub fn from_config(config: &UpstreamConfig) -> Result<Self, DomainError> {
        let server = config
            .socket_addr()
            .map_err(|e| DomainError::ConfigError(e.to_string()))?;
        Ok(Self::new(server, config.query_timeout()))
    }

    pub fn server(&self) -> SocketAddr {
        self.server
    }

    async fn exchange(
        &self,
        cancel: &CancellationToken,
        request: &Message,
    ) -> Result<Message, DomainError> {
        let query = wire::pack(request)?;

        tokio::select! {
            _ = cancel.cancelled() => Err(DomainError::Cancelled),
            result = tokio::time::timeout(self.timeout, self.round_trip(request.id(), &query)) => {
                result.map_err(|_| DomainError::QueryTimeout)?
            }
        }
    }

    async fn round_trip(&self, id: u16, query: &[u8]) -> Result<Message, DomainError> {
        let bind_addr: SocketAddr = if self.server.is_ipv4() {
            SocketAddr::from(([0, 0, 0, 0], 0))
        } else {
            SocketAddr::from(([0u16; 8], 0))
        };

        let socket = UdpSocket::bind(bind_addr)
            .await
            .map_err(|e| self.upstream_error(format!("bind failed: {}", e)))?;
        socket
            .send_to(query, self.server)
            .await
            .map_err(|e| self.upstream_error(format!("send failed: {}", e)))?;

        let mut buf = vec![0u8; MAX_UDP_RESPONSE_SIZE];
        loop {
            let (len, from) = socket
                .recv_from(&mut buf)
                .await
                .map_err(|e| self.upstream_error(format!("receive failed: {}", e)))?;

            if from != self.server {
                warn!(expected = %self.server, received_from = %from, "UDP response from unexpected source");
                continue;
            }

            let response = Message::from_vec(&buf[..len]).map_err(|e| {
                DomainError::InvalidDnsMessage(format!(
                    "Malformed response from {}: {}",
                    self.server, e
                ))
            })?;

            if response.id() != id {
                debug!(expected = id, received = response.id(), "Ignoring mismatched upstream response");
                continue;
            }

            return Ok(response);
        }
    }

    fn upstream_error(&self, reason: String) -> DomainError {
        DomainError::Upstream {
            server: self.server.to_string(),
            reason,
        }
    }
}

#[async_trait]
impl DnsHandler for UpstreamForwarder {
    async fn serve_dns(
        &self,
        cancel: &CancellationToken,
        writer: &mut dyn ResponseWriter,
        request: &Message,
    ) -> ServeOutcome {
        match self.exchange(cancel, request).await {
            Ok(response) => {
                let code = response.response_code();
                match writer.write_msg(&response).await {
                    Ok(()) => ServeOutcome::success(code),
                    Err(e) => ServeOutcome::failure(code, DomainError::ResponseWrite(e.to_string())),
                }
            }
            Err(e) => {
                debug!(server = %self.server, error = %e, "Upstream query failed");
                let reply = wire::error_response(request, ResponseCode::ServFail);
                if let Err(write_err) = writer.write_msg(&reply).await {
                    debug!(error = %write_err, "Failed to write SERVFAIL");
                }
                ServeOutcome::failure(ResponseCode::ServFail, e)
            }
        }
    }

    fn name(&self) -> &'static str {
        "forward"
    }
}
