//! TCP Transport for DNS queries (RFC 1035 §4.2.2, RFC 7766)
//!
//! Two-byte length prefix framing. Idle connections are kept per upstream
//! address and reused by later exchanges on the same transport.

use super::resolver::resolve_one;
use super::{DnsTransport, TransportResponse};
use crate::dns::wire::MAX_TCP_MESSAGE_SIZE;
use async_trait::async_trait;
use dashmap::DashMap;
use dohgate_domain::{DomainError, UpstreamAddr};
use std::net::SocketAddr;
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::net::TcpStream;
use tracing::debug;

const MAX_IDLE_TCP_PER_HOST: usize = 2;

type TcpConnectionPool = DashMap<SocketAddr, Vec<TcpStream>>;

pub struct TcpTransport {
    upstream_addr: UpstreamAddr,
    pool: TcpConnectionPool,
}

impl TcpTransport {
    pub fn new(upstream_addr: UpstreamAddr) -> Self {
        Self {
            upstream_addr,
            pool: TcpConnectionPool::new(),
        }
    }

    fn take_pooled(&self, server_addr: SocketAddr) -> Option<TcpStream> {
        self.pool.get_mut(&server_addr)?.pop()
    }

    fn return_to_pool(&self, server_addr: SocketAddr, stream: TcpStream) {
        let mut entry = self.pool.entry(server_addr).or_default();
        if entry.len() < MAX_IDLE_TCP_PER_HOST {
            entry.push(stream);
        }
    }

    async fn exchange_on(
        stream: &mut TcpStream,
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

pub(crate) async fn connect_tcp(
    server_addr: SocketAddr,
    timeout: Duration,
) -> Result<TcpStream, DomainError> {
    let stream = tokio::time::timeout(timeout, TcpStream::connect(server_addr))
        .await
        .map_err(|_| DomainError::TransportTimeout {
            server: server_addr.to_string(),
        })?
        .map_err(|e| DomainError::from_io(server_addr.to_string(), &e))?;

    stream
        .set_nodelay(true)
        .map_err(|e| DomainError::from_io(server_addr.to_string(), &e))?;

    Ok(stream)
}

#[async_trait]
impl DnsTransport for TcpTransport {
    async fn send(
        &self,
        message_bytes: &[u8],
        timeout: Duration,
    ) -> Result<TransportResponse, DomainError> {
        let server_addr = resolve_one(&self.upstream_addr, timeout).await?;

        if let Some(mut stream) = self.take_pooled(server_addr) {
            match Self::exchange_on(&mut stream, server_addr, message_bytes, timeout).await {
                Ok(response_bytes) => {
                    debug!(server = %server_addr, "TCP query via pooled connection");
                    self.return_to_pool(server_addr, stream);
                    return Ok(TransportResponse {
                        bytes: response_bytes,
                    });
                }
                Err(_) => {
                    debug!(server = %server_addr, "Pooled TCP connection stale, reconnecting");
                }
            }
        }

        let mut stream = connect_tcp(server_addr, timeout).await?;
        let response_bytes =
            Self::exchange_on(&mut stream, server_addr, message_bytes, timeout).await?;

        debug!(
            server = %server_addr,
            response_len = response_bytes.len(),
            "TCP response received"
        );

        self.return_to_pool(server_addr, stream);

        Ok(TransportResponse {
            bytes: response_bytes,
        })
    }

    fn protocol_name(&self) -> &'static str {
        "TCP"
    }
}

pub(crate) fn framing_error(server_addr: SocketAddr, err: std::io::Error) -> DomainError {
    match err.kind() {
        std::io::ErrorKind::InvalidData => {
            DomainError::InvalidDnsMessage(format!("Bad framing from {}: {}", server_addr, err))
        }
        _ => DomainError::from_io(server_addr.to_string(), &err),
    }
}

pub async fn send_with_length_prefix<S>(stream: &mut S, message_bytes: &[u8]) -> std::io::Result<()>
where
    S: AsyncWrite + Unpin,
{
    let length = u16::try_from(message_bytes.len()).map_err(|_| {
        std::io::Error::new(
            std::io::ErrorKind::InvalidInput,
            format!("message of {} bytes exceeds TCP framing", message_bytes.len()),
        )
    })?;

    let mut frame = Vec::with_capacity(2 + message_bytes.len());
    frame.extend_from_slice(&length.to_be_bytes());
    frame.extend_from_slice(message_bytes);

    stream.write_all(&frame).await?;
    stream.flush().await
}

/// Reads one length-prefixed message. A zero length prefix is rejected as
/// invalid data.
pub async fn read_with_length_prefix<S>(stream: &mut S) -> std::io::Result<Vec<u8>>
where
    S: AsyncRead + Unpin,
{
    let mut len_buf = [0u8; 2];
    stream.read_exact(&mut len_buf).await?;

    let response_len = u16::from_be_bytes(len_buf) as usize;
    if response_len == 0 || response_len > MAX_TCP_MESSAGE_SIZE {
        return Err(std::io::Error::new(
            std::io::ErrorKind::InvalidData,
            format!("invalid length prefix {}", response_len),
        ));
    }

    let mut response = vec![0u8; response_len];
    stream.read_exact(&mut response).await?;

    Ok(response)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_length_prefix_round_trip() {
        let (mut client, mut server) = tokio::io::duplex(1024);

        send_with_length_prefix(&mut client, b"hello dns").await.unwrap();
        let received = read_with_length_prefix(&mut server).await.unwrap();

        assert_eq!(received, b"hello dns");
    }

    #[tokio::test]
    async fn test_short_body_is_unexpected_eof() {
        let (mut client, mut server) = tokio::io::duplex(1024);
        client.write_all(&[0x00, 0x10, 0xAA]).await.unwrap();
        drop(client);

        let err = read_with_length_prefix(&mut server).await.unwrap_err();
        assert_eq!(err.kind(), std::io::ErrorKind::UnexpectedEof);
    }

    #[tokio::test]
    async fn test_zero_length_is_invalid() {
        let (mut client, mut server) = tokio::io::duplex(1024);
        client.write_all(&[0x00, 0x00]).await.unwrap();

        let err = read_with_length_prefix(&mut server).await.unwrap_err();
        assert_eq!(err.kind(), std::io::ErrorKind::InvalidData);
    }
}
