//! Response writers over the listener sockets.

use super::wire;
use async_trait::async_trait;
use ferrous_dns_audit_application::ports::ResponseWriter;
use ferrous_dns_audit_domain::Endpoint;
use hickory_proto::op::Message;
use std::io;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::io::AsyncWriteExt;
use tokio::net::tcp::OwnedWriteHalf;
use tokio::net::UdpSocket;

fn pack_io(message: &Message) -> io::Result<Vec<u8>> {
    wire::pack(message).map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e.to_string()))
}

/// Sends datagrams back to the client through the shared listening socket.
pub struct UdpResponseWriter {
    socket: Arc<UdpSocket>,
    local: SocketAddr,
    peer: SocketAddr,
}

impl UdpResponseWriter {
    pub fn new(socket: Arc<UdpSocket>, local: SocketAddr, peer: SocketAddr) -> Self {
        Self {
            socket,
            local,
            peer,
        }
    }
}

#[async_trait]
impl ResponseWriter for UdpResponseWriter {
    fn local_endpoint(&self) -> Endpoint {
        Endpoint::udp(self.local)
    }

    fn remote_endpoint(&self) -> Endpoint {
        Endpoint::udp(self.peer)
    }

    async fn write(&mut self, bytes: &[u8]) -> io::Result<usize> {
        self.socket.send_to(bytes, self.peer).await
    }

    async fn write_msg(&mut self, message: &Message) -> io::Result<()> {
        let bytes = pack_io(message)?;
        self.socket.send_to(&bytes, self.peer).await?;
        Ok(())
    }
}

/// Writes length-prefixed messages (RFC 1035 §4.2.2) on a client TCP connection.
pub struct TcpResponseWriter<'a> {
    stream: &'a mut OwnedWriteHalf,
    local: SocketAddr,
    peer: SocketAddr,
}

impl<'a> TcpResponseWriter<'a> {
    pub fn new(stream: &'a mut OwnedWriteHalf, local: SocketAddr, peer: SocketAddr) -> Self {
        Self {
            stream,
            local,
            peer,
        }
    }

    async fn send_framed(&mut self, bytes: &[u8]) -> io::Result<()> {
        let length = u16::try_from(bytes.len()).map_err(|_| {
            io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("DNS message of {} bytes exceeds TCP frame limit", bytes.len()),
            )
        })?;
        self.stream.write_all(&length.to_be_bytes()).await?;
        self.stream.write_all(bytes).await?;
        self.stream.flush().await
    }
}

#[async_trait]
impl<'a> ResponseWriter for TcpResponseWriter<'a> {
    fn local_endpoint(&self) -> Endpoint {
        Endpoint::tcp(self.local)
    }

    fn remote_endpoint(&self) -> Endpoint {
        Endpoint::tcp(self.peer)
    }

    async fn write(&mut self, bytes: &[u8]) -> io::Result<usize> {
        self.send_framed(bytes).await?;
        Ok(bytes.len())
    }

    async fn write_msg(&mut self, message: &Message) -> io::Result<()> {
        let bytes = pack_io(message)?;
        self.send_framed(&bytes).await
    }
}
