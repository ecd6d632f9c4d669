use std::fmt;
use std::net::SocketAddr;
use std::str::FromStr;

/// Transport protocol of a DNS listener, as reported in audit records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NetProtocol {
    Udp,
    Tcp,
}

impl NetProtocol {
    pub fn as_str(&self) -> &'static str {
        match self {
            NetProtocol::Udp => "udp",
            NetProtocol::Tcp => "tcp",
        }
    }
}

impl fmt::Display for NetProtocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for NetProtocol {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "udp" => Ok(NetProtocol::Udp),
            "tcp" => Ok(NetProtocol::Tcp),
            other => Err(format!("Unknown network protocol '{}'", other)),
        }
    }
}

/// One side of a DNS connection: the protocol it was received on plus the socket address.
///
/// `Display` renders only the address, so `udp/10.0.0.1:53` prints as `10.0.0.1:53`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Endpoint {
    pub protocol: NetProtocol,
    pub addr: SocketAddr,
}

impl Endpoint {
    pub fn new(protocol: NetProtocol, addr: SocketAddr) -> Self {
        Self { protocol, addr }
    }

    pub fn udp(addr: SocketAddr) -> Self {
        Self::new(NetProtocol::Udp, addr)
    }

    pub fn tcp(addr: SocketAddr) -> Self {
        Self::new(NetProtocol::Tcp, addr)
    }

    pub fn network(&self) -> &'static str {
        self.protocol.as_str()
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.addr)
    }
}

/// Parses `proto/addr` (e.g. `udp/10.0.0.1:53`). A bare address is taken as UDP.
impl FromStr for Endpoint {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (protocol, addr_str) = match s.split_once('/') {
            Some((proto, rest)) => (proto.parse::<NetProtocol>()?, rest),
            None => (NetProtocol::Udp, s),
        };
        let addr = addr_str
            .parse::<SocketAddr>()
            .map_err(|e| format!("Invalid endpoint address '{}': {}", addr_str, e))?;
        Ok(Endpoint { protocol, addr })
    }
}
