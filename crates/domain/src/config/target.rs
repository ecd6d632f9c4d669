use std::fmt;
use std::sync::Arc;

/// An ingest destination. Cleartext targets speak plain TCP, ciphertext targets TLS.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum IngestTarget {
    Cleartext { host: Arc<str>, port: u16 },
    Ciphertext { host: Arc<str>, port: u16 },
}

impl IngestTarget {
    pub fn cleartext(addr: &str) -> Result<Self, String> {
        let (host, port) = split_host_port(addr)?;
        Ok(IngestTarget::Cleartext {
            host: host.into(),
            port,
        })
    }

    pub fn ciphertext(addr: &str) -> Result<Self, String> {
        let (host, port) = split_host_port(addr)?;
        Ok(IngestTarget::Ciphertext {
            host: host.into(),
            port,
        })
    }

    pub fn host(&self) -> &str {
        match self {
            IngestTarget::Cleartext { host, .. } | IngestTarget::Ciphertext { host, .. } => host,
        }
    }

    pub fn port(&self) -> u16 {
        match self {
            IngestTarget::Cleartext { port, .. } | IngestTarget::Ciphertext { port, .. } => *port,
        }
    }

    pub fn is_tls(&self) -> bool {
        matches!(self, IngestTarget::Ciphertext { .. })
    }

    pub fn scheme(&self) -> &'static str {
        match self {
            IngestTarget::Cleartext { .. } => "tcp",
            IngestTarget::Ciphertext { .. } => "tls",
        }
    }
}

impl fmt::Display for IngestTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.host().contains(':') {
            write!(f, "{}://[{}]:{}", self.scheme(), self.host(), self.port())
        } else {
            write!(f, "{}://{}:{}", self.scheme(), self.host(), self.port())
        }
    }
}

/// Splits `host:port` or `[v6-host]:port`. An unbracketed host may not contain colons.
fn split_host_port(s: &str) -> Result<(&str, u16), String> {
    let (host, port_str) = if let Some(rest) = s.strip_prefix('[') {
        let end = rest
            .find(']')
            .ok_or_else(|| format!("Missing ']' in address '{}'", s))?;
        let port_str = rest[end + 1..]
            .strip_prefix(':')
            .ok_or_else(|| format!("Missing port in address '{}'", s))?;
        (&rest[..end], port_str)
    } else {
        let (host, port_str) = s
            .rsplit_once(':')
            .ok_or_else(|| format!("Missing port in address '{}'", s))?;
        if host.contains(':') {
            return Err(format!("Too many colons in address '{}'", s));
        }
        (host, port_str)
    };

    let port = port_str
        .parse::<u16>()
        .map_err(|e| format!("Invalid port in address '{}': {}", s, e))?;
    Ok((host, port))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_targets_are_built_from_host_port() {
        let plain = IngestTarget::cleartext("192.168.1.1:4024").unwrap();
        let tls = IngestTarget::ciphertext("[dead::beef]:4025").unwrap();

        assert!(!plain.is_tls());
        assert_eq!(plain.to_string(), "tcp://192.168.1.1:4024");
        assert!(tls.is_tls());
        assert_eq!(tls.host(), "dead::beef");
        assert_eq!(tls.to_string(), "tls://[dead::beef]:4025");
    }

    #[test]
    fn test_scheme_prefixed_addresses_are_rejected() {
        assert!(IngestTarget::cleartext("tcp://192.168.1.1:4024").is_err());
        assert!(IngestTarget::cleartext("dead::beef:4024").is_err());
        assert!(IngestTarget::ciphertext("ingest.example.net").is_err());
    }
}
