//! TLS Transport for DNS queries, DNS-over-TLS (RFC 7858)
//!
//! Same framing as TCP. Idle TLS sessions are pooled per upstream address so
//! repeated exchanges skip the handshake.

use super::resolver::resolve_one;
use super::tcp::{connect_tcp, framing_error, read_with_length_prefix, send_with_length_prefix};
use super::{DnsTransport, TransportResponse};
use async_trait::async_trait;
use dashmap::DashMap;
use dohgate_domain::{DomainError, UpstreamAddr};
use rustls::pki_types::ServerName;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpStream;
use tokio_rustls::client::TlsStream;
use tracing::debug;

/// Maximum idle connections per upstream address.
const MAX_IDLE_PER_HOST: usize = 2;

/// DNS-over-TLS transport (RFC 7858)
pub struct TlsTransport {
    upstream_addr: UpstreamAddr,
    hostname: String,
    connector: tokio_rustls::TlsConnector,
    pool: DashMap<SocketAddr, Vec<TlsStream<TcpStream>>>,
}

impl TlsTransport {
    pub fn new(upstream_addr: UpstreamAddr, hostname: String, config: Arc<rustls::ClientConfig>) -> Self {
        Self {
            upstream_addr,
            hostname,
            connector: tokio_rustls::TlsConnector::from(config),
            pool: DashMap::new(),
        }
    }

    fn take_pooled(&self, server_addr: SocketAddr) -> Option<TlsStream<TcpStream>> {
        self.pool.get_mut(&server_addr)?.pop()
    }

    fn return_to_pool(&self, server_addr: SocketAddr, stream: TlsStream<TcpStream>) {
        let mut entry = self.pool.entry(server_addr).or_default();
        if entry.len() < MAX_IDLE_PER_HOST {
            entry.push(stream);
        }
    }

    /// TCP connect + TLS handshake.
    async fn connect_new(
        &self,
        server_addr: SocketAddr,
        timeout: Duration,
    ) -> Result<TlsStream<TcpStream>, DomainError> {
        let server_name = ServerName::try_from(self.hostname.clone()).map_err(|e| {
            DomainError::ConfigError(format!("Invalid TLS hostname '{}': {}", self.hostname, e))
        })?;

        let tcp_stream = connect_tcp(server_addr, timeout).await?;

        let tls_stream = tokio::time::timeout(timeout, self.connector.connect(server_name, tcp_stream))
            .await
            .map_err(|_| DomainError::TransportTimeout {
                server: server_addr.to_string(),
            })?
            .map_err(|e| {
                DomainError::Transport(format!("TLS handshake failed with {}: {}", server_addr, e))
            })?;

        debug!(server = %server_addr, hostname = %self.hostname, "TLS connection established");
        Ok(tls_stream)
    }

    async fn send_on_stream(
        stream: &mut TlsStream<TcpStream>,
        server_addr: SocketAddr,
        message_bytes: &[u8],
        timeout: Duration,
    ) -> Result<Vec<u8>, DomainError> {
        tokio::time::timeout(timeout, async {
            send_with_length_prefix(stream, message_bytes).await?;
            read_with_length_prefix(stream).await
        })
        .await
        .map_err(|_| DomainError::TransportTimeout {
            server: server_addr.to_string(),
        })?
        .map_err(|e| framing_error(server_addr, e))
    }
}

#[async_trait]
impl DnsTransport for TlsTransport {
    async fn send(
        &self,
        message_bytes: &[u8],
        timeout: Duration,
    ) -> Result<TransportResponse, DomainError> {
        let server_addr = resolve_one(&self.upstream_addr, timeout).await?;

        if let Some(mut stream) = self.take_pooled(server_addr) {
            match Self::send_on_stream(&mut stream, server_addr, message_bytes, timeout).await {
                Ok(response_bytes) => {
                    debug!(server = %server_addr, "TLS query via pooled connection");
                    self.return_to_pool(server_addr, stream);
                    return Ok(TransportResponse {
                        bytes: response_bytes,
                    });
                }
                Err(_) => {
                    debug!(server = %server_addr, "Pooled TLS connection stale, reconnecting");
                }
            }
        }

        let mut stream = self.connect_new(server_addr, timeout).await?;
        let response_bytes =
            Self::send_on_stream(&mut stream, server_addr, message_bytes, timeout).await?;

        debug!(
            server = %server_addr,
            response_len = response_bytes.len(),
            "TLS response received"
        );

        self.return_to_pool(server_addr, stream);

        Ok(TransportResponse {
            bytes: response_bytes,
        })
    }

    fn protocol_name(&self) -> &'static str {
        "TLS"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tls_transport_creation() {
        let addr: SocketAddr = "1.1.1.1:853".parse().unwrap();
        let config = crate::dns::tls::client_config(false).unwrap();
        let transport = TlsTransport::new(
            UpstreamAddr::Resolved(addr),
            "cloudflare-dns.com".to_string(),
            config,
        );
        assert_eq!(transport.hostname, "cloudflare-dns.com");
        assert_eq!(transport.protocol_name(), "TLS");
    }
}
