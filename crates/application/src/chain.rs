//! Explicit registration of DNS middlewares around a terminal handler.

use crate::encoding::RecordEncoder;
use crate::ports::{DeliveryChannel, DnsHandler};
use crate::use_cases::AuditHandler;
use ferrous_dns_audit_domain::{DomainError, IngestConfig, TopicTag};
use std::sync::Arc;
use tracing::info;

/// Something that wraps the next handler of the chain.
pub trait Middleware: Send + Sync {
    fn name(&self) -> &'static str;

    fn wrap(&self, next: Arc<dyn DnsHandler>) -> Arc<dyn DnsHandler>;
}

/// Ordered list of middlewares. The first one registered sees requests first.
#[derive(Default)]
pub struct HandlerChain {
    middlewares: Vec<Arc<dyn Middleware>>,
}

impl HandlerChain {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(mut self, middleware: Arc<dyn Middleware>) -> Self {
        info!(middleware = middleware.name(), "Registered DNS middleware");
        self.middlewares.push(middleware);
        self
    }

    pub fn names(&self) -> Vec<&'static str> {
        self.middlewares.iter().map(|m| m.name()).collect()
    }

    pub fn len(&self) -> usize {
        self.middlewares.len()
    }

    pub fn is_empty(&self) -> bool {
        self.middlewares.is_empty()
    }

    /// Wraps `terminal` so that the first registered middleware ends up outermost.
    pub fn build(&self, terminal: Arc<dyn DnsHandler>) -> Arc<dyn DnsHandler> {
        self.middlewares
            .iter()
            .rev()
            .fold(terminal, |next, middleware| middleware.wrap(next))
    }
}

/// Registers an [`AuditHandler`] in a [`HandlerChain`].
pub struct AuditMiddleware {
    channel: Arc<dyn DeliveryChannel>,
    tag: TopicTag,
    encoder: RecordEncoder,
}

impl AuditMiddleware {
    /// Resolves the configured tag against `channel` once; every record of
    /// every transaction reuses it.
    pub async fn setup(
        config: &IngestConfig,
        channel: Arc<dyn DeliveryChannel>,
    ) -> Result<Self, DomainError> {
        let tag = channel.resolve_tag(&config.tag).await?;
        let encoder = RecordEncoder::for_mode(config.encoding);

        info!(
            tag = %config.tag,
            encoding = %config.encoding,
            "Audit middleware ready"
        );

        Ok(Self {
            channel,
            tag,
            encoder,
        })
    }

    pub fn tag(&self) -> TopicTag {
        self.tag
    }

    pub fn encoder(&self) -> RecordEncoder {
        self.encoder
    }
}

impl Middleware for AuditMiddleware {
    fn name(&self) -> &'static str {
        "audit"
    }

    fn wrap(&self, next: Arc<dyn DnsHandler>) -> Arc<dyn DnsHandler> {
        Arc::new(AuditHandler::new(
            next,
            Arc::clone(&self.channel),
            self.tag,
            self.encoder,
        ))
    }
}
