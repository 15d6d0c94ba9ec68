//! UDP Transport for DNS queries (RFC 1035 §4.2.1)
//!
//! Messages are sent as-is (no framing). A fresh ephemeral socket is used per
//! exchange and connected to the upstream, so datagrams from other sources are
//! discarded by the kernel. Truncated replies are returned as-is; the caller
//! decides whether to retry over TCP.

use super::resolver::resolve_one;
use super::{DnsTransport, TransportResponse};
use async_trait::async_trait;
use dohgate_domain::{DomainError, UpstreamAddr};
use std::net::{Ipv4Addr, Ipv6Addr, SocketAddr};
use std::time::Duration;
use tokio::net::UdpSocket;
use tracing::debug;

/// Maximum UDP DNS response size accepted with EDNS(0)
const MAX_UDP_RESPONSE_SIZE: usize = 4096;

/// DNS over UDP transport
pub struct UdpTransport {
    upstream_addr: UpstreamAddr,
}

impl UdpTransport {
    pub fn new(upstream_addr: UpstreamAddr) -> Self {
        Self { upstream_addr }
    }
}

#[async_trait]
impl DnsTransport for UdpTransport {
    async fn send(
        &self,
        message_bytes: &[u8],
        timeout: Duration,
    ) -> Result<TransportResponse, DomainError> {
        let server_addr = resolve_one(&self.upstream_addr, timeout).await?;
        let server = server_addr.to_string();

        let bind_addr: SocketAddr = if server_addr.is_ipv4() {
            (Ipv4Addr::UNSPECIFIED, 0).into()
        } else {
            (Ipv6Addr::UNSPECIFIED, 0).into()
        };

        let socket = UdpSocket::bind(bind_addr)
            .await
            .map_err(|e| DomainError::from_io(&server, &e))?;
        socket
            .connect(server_addr)
            .await
            .map_err(|e| DomainError::from_io(&server, &e))?;

        let exchange = async {
            let bytes_sent = socket.send(message_bytes).await?;
            debug!(server = %server_addr, bytes_sent, "UDP query sent");

            let mut recv_buf = vec![0u8; MAX_UDP_RESPONSE_SIZE];
            let bytes_received = socket.recv(&mut recv_buf).await?;
            recv_buf.truncate(bytes_received);
            Ok::<_, std::io::Error>(recv_buf)
        };

        let recv_buf = tokio::time::timeout(timeout, exchange)
            .await
            .map_err(|_| DomainError::TransportTimeout {
                server: server.clone(),
            })?
            .map_err(|e| DomainError::from_io(&server, &e))?;

        debug!(
            server = %server_addr,
            bytes_received = recv_buf.len(),
            "UDP response received"
        );

        Ok(TransportResponse {
            bytes: recv_buf,
        })
    }

    fn protocol_name(&self) -> &'static str {
        "UDP"
    }
}
