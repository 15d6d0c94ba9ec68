pub mod resolver;
pub mod tcp;
pub mod tls;
pub mod udp;

use async_trait::async_trait;
use dohgate_domain::{DnsEndpoint, DomainError, WireScheme};
use std::time::Duration;

#[derive(Debug)]
pub struct TransportResponse {
    pub bytes: Vec<u8>,
}

#[async_trait]
pub trait DnsTransport: Send + Sync {
    async fn send(
        &self,
        message_bytes: &[u8],
        timeout: Duration,
    ) -> Result<TransportResponse, DomainError>;

    fn protocol_name(&self) -> &'static str;
}

pub enum Transport {
    Udp(udp::UdpTransport),
    Tcp(tcp::TcpTransport),
    Tls(tls::TlsTransport),
}

impl Transport {
    pub async fn send(
        &self,
        message_bytes: &[u8],
        timeout: Duration,
    ) -> Result<TransportResponse, DomainError> {
        match self {
            Self::Udp(t) => DnsTransport::send(t, message_bytes, timeout).await,
            Self::Tcp(t) => DnsTransport::send(t, message_bytes, timeout).await,
            Self::Tls(t) => DnsTransport::send(t, message_bytes, timeout).await,
        }
    }

    pub fn protocol_name(&self) -> &'static str {
        match self {
            Self::Udp(_) => "UDP",
            Self::Tcp(_) => "TCP",
            Self::Tls(_) => "TLS",
        }
    }
}

pub fn create_transport(endpoint: &DnsEndpoint, insecure: bool) -> Result<Transport, DomainError> {
    match endpoint.scheme {
        WireScheme::Udp => Ok(Transport::Udp(udp::UdpTransport::new(endpoint.addr.clone()))),
        WireScheme::Tcp => Ok(Transport::Tcp(tcp::TcpTransport::new(endpoint.addr.clone()))),
        WireScheme::TcpTls => Ok(Transport::Tls(tls::TlsTransport::new(
            endpoint.addr.clone(),
            endpoint.hostname.to_string(),
            crate::dns::tls::client_config(insecure)?,
        ))),
    }
}
