#![allow(dead_code)]

mod mock_ingest;
mod mock_upstream;

pub use mock_ingest::{IngestBehaviour, MockIngestServer};
pub use mock_upstream::{a_query, MockUpstream, UpstreamBehaviour};

use ferrous_dns_audit_domain::IngestConfig;
use std::net::SocketAddr;

pub fn ingest_config(targets: &[SocketAddr]) -> IngestConfig {
    IngestConfig {
        cleartext_targets: targets.iter().map(|a| a.to_string()).collect(),
        ingest_secret: "testing".to_string(),
        ..IngestConfig::default()
    }
}

/// An address on which nothing is listening.
pub async fn closed_port() -> SocketAddr {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    addr
}

use async_trait::async_trait;
use ferrous_dns_audit_application::ports::ResponseWriter;
use ferrous_dns_audit_domain::Endpoint;
use hickory_proto::op::Message;
use std::io;

/// Writer that keeps every message instead of sending it.
pub struct RecordingWriter {
    pub messages: Vec<Message>,
}

impl RecordingWriter {
    pub fn new() -> Self {
        Self {
            messages: Vec::new(),
        }
    }
}

#[async_trait]
impl ResponseWriter for RecordingWriter {
    fn local_endpoint(&self) -> Endpoint {
        Endpoint::udp("127.0.0.1:53".parse().unwrap())
    }

    fn remote_endpoint(&self) -> Endpoint {
        Endpoint::udp("127.0.0.1:40000".parse().unwrap())
    }

    async fn write(&mut self, bytes: &[u8]) -> io::Result<usize> {
        Ok(bytes.len())
    }

    async fn write_msg(&mut self, message: &Message) -> io::Result<()> {
        self.messages.push(message.clone());
        Ok(())
    }
}
