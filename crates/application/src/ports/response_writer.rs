use async_trait::async_trait;
use ferrous_dns_audit_domain::Endpoint;
use hickory_proto::op::Message;
use std::io;

/// Sends a response back to the client that asked.
#[async_trait]
pub trait ResponseWriter: Send {
    fn local_endpoint(&self) -> Endpoint;

    fn remote_endpoint(&self) -> Endpoint;

    /// Write an already packed message. Used for malformed or low-level replies.
    async fn write(&mut self, bytes: &[u8]) -> io::Result<usize>;

    /// Pack and write a structured message.
    async fn write_msg(&mut self, message: &Message) -> io::Result<()>;
}
