use super::ResponseWriter;
use async_trait::async_trait;
use ferrous_dns_audit_domain::DomainError;
use hickory_proto::op::{Message, ResponseCode};
use tokio_util::sync::CancellationToken;

/// Result of serving one request: the DNS status code is always present,
/// the error only when something along the chain failed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServeOutcome {
    pub code: ResponseCode,
    pub error: Option<DomainError>,
}

impl ServeOutcome {
    pub fn success(code: ResponseCode) -> Self {
        Self { code, error: None }
    }

    pub fn failure(code: ResponseCode, error: DomainError) -> Self {
        Self {
            code,
            error: Some(error),
        }
    }

    pub fn is_success(&self) -> bool {
        self.error.is_none()
    }
}

/// A link in the DNS handling chain: resolves `request` and writes the answer to `writer`.
#[async_trait]
pub trait DnsHandler: Send + Sync {
    async fn serve_dns(
        &self,
        cancel: &CancellationToken,
        writer: &mut dyn ResponseWriter,
        request: &Message,
    ) -> ServeOutcome;

    fn name(&self) -> &'static str;
}
