use crate::driver::{guess_port, parse_url};
use crate::errors::DomainError;
use std::fmt;
use std::net::SocketAddr;
use std::str::FromStr;
use std::sync::Arc;

/// Represents a wire-protocol address that may or may not be resolved to an IP.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum UpstreamAddr {
    Resolved(SocketAddr),
    Unresolved { hostname: Arc<str>, port: u16 },
}

impl UpstreamAddr {
    pub fn socket_addr(&self) -> Option<SocketAddr> {
        match self {
            UpstreamAddr::Resolved(addr) => Some(*addr),
            UpstreamAddr::Unresolved { .. } => None,
        }
    }

    pub fn port(&self) -> u16 {
        match self {
            UpstreamAddr::Resolved(addr) => addr.port(),
            UpstreamAddr::Unresolved { port, .. } => *port,
        }
    }

    pub fn is_unresolved(&self) -> bool {
        matches!(self, UpstreamAddr::Unresolved { .. })
    }

    /// Returns (hostname, port) if this address is unresolved.
    pub fn unresolved_parts(&self) -> Option<(&str, u16)> {
        match self {
            UpstreamAddr::Unresolved { hostname, port } => Some((hostname, *port)),
            UpstreamAddr::Resolved(_) => None,
        }
    }
}

impl fmt::Display for UpstreamAddr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UpstreamAddr::Resolved(addr) => write!(f, "{}", addr),
            UpstreamAddr::Unresolved { hostname, port } => write!(f, "{}:{}", hostname, port),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WireScheme {
    Udp,
    Tcp,
    TcpTls,
}

impl WireScheme {
    pub fn as_str(&self) -> &'static str {
        match self {
            WireScheme::Udp => "udp",
            WireScheme::Tcp => "tcp",
            WireScheme::TcpTls => "tcp-tls",
        }
    }
}

impl FromStr for WireScheme {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "udp" => Ok(WireScheme::Udp),
            "tcp" => Ok(WireScheme::Tcp),
            "tcp-tls" => Ok(WireScheme::TcpTls),
            other => Err(DomainError::UnsupportedScheme(other.to_string())),
        }
    }
}

/// A DNS wire endpoint (`udp://`, `tcp://`, `tcp-tls://`) with its port defaulted.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DnsEndpoint {
    pub scheme: WireScheme,
    pub addr: UpstreamAddr,
    /// Host part of the URL, used as TLS server name.
    pub hostname: Arc<str>,
}

impl DnsEndpoint {
    pub fn parse(raw: &str) -> Result<Self, DomainError> {
        let mut url = parse_url(raw)?;
        let scheme: WireScheme = url.scheme().parse()?;
        guess_port(&mut url);

        let host = url
            .host_str()
            .filter(|h| !h.is_empty())
            .ok_or_else(|| DomainError::InvalidUrl {
                url: raw.to_string(),
                reason: "missing host".to_string(),
            })?;
        let port = url.port().ok_or_else(|| DomainError::InvalidUrl {
            url: raw.to_string(),
            reason: "missing port".to_string(),
        })?;

        let bare_host = host.trim_start_matches('[').trim_end_matches(']');
        let addr = match bare_host.parse::<std::net::IpAddr>() {
            Ok(ip) => UpstreamAddr::Resolved(SocketAddr::new(ip, port)),
            Err(_) => UpstreamAddr::Unresolved {
                hostname: bare_host.into(),
                port,
            },
        };

        Ok(Self {
            scheme,
            addr,
            hostname: bare_host.into(),
        })
    }
}

impl fmt::Display for DnsEndpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}://{}", self.scheme.as_str(), self.addr)
    }
}
