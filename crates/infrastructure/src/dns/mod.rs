pub mod forwarder;
pub mod wire;
pub mod writer;

pub use forwarder::UpstreamForwarder;
pub use writer::{TcpResponseWriter, UdpResponseWriter};
