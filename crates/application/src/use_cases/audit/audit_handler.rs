use crate::encoding::RecordEncoder;
use crate::interceptor::Interceptor;
use crate::ports::{DeliveryChannel, DnsHandler, ResponseWriter, ServeOutcome};
use crate::transaction::Transaction;
use async_trait::async_trait;
use chrono::Utc;
use ferrous_dns_audit_domain::TopicTag;
use hickory_proto::op::Message;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

/// Middleware that lets the rest of the chain answer a request untouched, then
/// encodes what was answered and submits it to the delivery channel.
///
/// The DNS status code from the chain is always returned. A submission failure
/// stops the remaining records of the transaction and becomes the outcome's error.
pub struct AuditHandler {
    next: Arc<dyn DnsHandler>,
    channel: Arc<dyn DeliveryChannel>,
    tag: TopicTag,
    encoder: RecordEncoder,
}

impl AuditHandler {
    pub fn new(
        next: Arc<dyn DnsHandler>,
        channel: Arc<dyn DeliveryChannel>,
        tag: TopicTag,
        encoder: RecordEncoder,
    ) -> Self {
        Self {
            next,
            channel,
            tag,
            encoder,
        }
    }

    pub fn tag(&self) -> TopicTag {
        self.tag
    }

    pub fn encoder(&self) -> RecordEncoder {
        self.encoder
    }
}

#[async_trait]
impl DnsHandler for AuditHandler {
    async fn serve_dns(
        &self,
        cancel: &CancellationToken,
        writer: &mut dyn ResponseWriter,
        request: &Message,
    ) -> ServeOutcome {
        let tx = Transaction::new(Utc::now(), writer.local_endpoint(), writer.remote_endpoint());

        let mut interceptor = if self.encoder.needs_response() {
            Interceptor::retaining_response(writer)
        } else {
            Interceptor::new(writer)
        };
        let outcome = self.next.serve_dns(cancel, &mut interceptor, request).await;

        let tx = tx
            .with_capture(interceptor.into_capture())
            .with_error(outcome.error.clone());
        let records = self.encoder.records(&tx, request);

        for (index, payload) in records.into_iter().enumerate() {
            if let Err(e) = self.channel.submit(tx.timestamp, self.tag, payload).await {
                warn!(
                    error = %e,
                    record = index,
                    remote = %tx.remote,
                    "Failed to submit audit record"
                );
                if let Some(downstream) = &outcome.error {
                    debug!(error = %downstream, "Downstream error superseded by delivery failure");
                }
                return ServeOutcome::failure(outcome.code, e);
            }
        }

        outcome
    }

    fn name(&self) -> &'static str {
        "audit"
    }
}
