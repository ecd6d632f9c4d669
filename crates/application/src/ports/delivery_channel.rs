use async_trait::async_trait;
use chrono::{DateTime, Utc};
use ferrous_dns_audit_domain::{DomainError, TopicTag};

/// Durable, asynchronous transport for audit records.
///
/// Implementations must be safe to share between concurrently running handlers.
#[async_trait]
pub trait DeliveryChannel: Send + Sync {
    /// Resolve a topic name once at startup. Fails when the name is invalid or unknown.
    async fn resolve_tag(&self, name: &str) -> Result<TopicTag, DomainError>;

    /// Queue one record. May wait when the channel applies backpressure.
    async fn submit(
        &self,
        timestamp: DateTime<Utc>,
        tag: TopicTag,
        payload: Vec<u8>,
    ) -> Result<(), DomainError>;
}
