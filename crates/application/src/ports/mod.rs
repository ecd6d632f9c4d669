mod delivery_channel;
mod dns_handler;
mod response_writer;

pub use delivery_channel::DeliveryChannel;
pub use dns_handler::{DnsHandler, ServeOutcome};
pub use response_writer::ResponseWriter;

// Re-export for convenience
pub use ferrous_dns_audit_domain::{Endpoint, TopicTag};
