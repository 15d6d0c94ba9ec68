//! DNS-wire listener (`udp://`, `tcp://`, `tcp-tls://`).
//!
//! Every datagram and every stream connection gets its own task, so a slow
//! upstream exchange only holds up the requester that asked for it.

use super::socket::{create_tcp_listener, create_udp_socket};
use crate::dns::transport::resolver::resolve_one;
use crate::dns::transport::tcp::{read_with_length_prefix, send_with_length_prefix};
use crate::dns::wire::{
    decode, encode, encode_for_udp, formerr_for_raw, requester_payload_limit, MAX_TCP_MESSAGE_SIZE,
};
use dohgate_application::services::error_response;
use dohgate_application::use_cases::ForwardQueryUseCase;
use dohgate_domain::{DnsEndpoint, DomainError, WireScheme};
use hickory_proto::op::{Message, MessageType, ResponseCode};
use std::io;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::{TcpListener, UdpSocket};
use tokio_rustls::TlsAcceptor;
use tracing::{debug, info, warn};

const MAX_UDP_DATAGRAM: usize = 4096;
const STREAM_IDLE_TIMEOUT: Duration = Duration::from_secs(10);
const TLS_HANDSHAKE_TIMEOUT: Duration = Duration::from_secs(5);

pub struct WireServer {
    url: String,
    endpoint: DnsEndpoint,
    tls: Option<Arc<rustls::ServerConfig>>,
    forward: Arc<ForwardQueryUseCase>,
}

impl WireServer {
    /// `tls` is required for `tcp-tls` URLs and ignored otherwise.
    pub fn new(
        url: &str,
        tls: Option<Arc<rustls::ServerConfig>>,
        forward: Arc<ForwardQueryUseCase>,
    ) -> Result<Self, DomainError> {
        let endpoint = DnsEndpoint::parse(url)?;
        if endpoint.scheme == WireScheme::TcpTls && tls.is_none() {
            return Err(DomainError::ConfigError(format!(
                "{} needs certfile and keyfile",
                url
            )));
        }

        Ok(Self {
            url: endpoint.to_string(),
            endpoint,
            tls,
            forward,
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// Binds the listening socket without serving yet.
    pub async fn bind(&self) -> Result<BoundWireServer, DomainError> {
        let addr = resolve_one(&self.endpoint.addr, Duration::from_secs(5)).await?;
        let bind_error = |e: io::Error| DomainError::Bind {
            addr: addr.to_string(),
            reason: e.to_string(),
        };

        let listener = match (self.endpoint.scheme, &self.tls) {
            (WireScheme::Udp, _) => Listener::Udp(Arc::new(create_udp_socket(addr).map_err(bind_error)?)),
            (WireScheme::Tcp, _) => Listener::Tcp(create_tcp_listener(addr).map_err(bind_error)?, None),
            (WireScheme::TcpTls, Some(tls)) => Listener::Tcp(
                create_tcp_listener(addr).map_err(bind_error)?,
                Some(TlsAcceptor::from(tls.clone())),
            ),
            (WireScheme::TcpTls, None) => {
                return Err(DomainError::ConfigError(format!(
                    "{} needs certfile and keyfile",
                    self.url
                )))
            }
        };

        let local_addr = listener.local_addr().map_err(bind_error)?;
        info!(
            bind_address = %local_addr,
            protocol = self.endpoint.scheme.as_str(),
            upstream = %self.forward.upstream(),
            "DNS listener ready"
        );

        Ok(BoundWireServer {
            listener,
            local_addr,
            forward: self.forward.clone(),
        })
    }

    pub async fn run(&self) -> Result<(), DomainError> {
        self.bind().await?.serve().await
    }
}

enum Listener {
    Udp(Arc<UdpSocket>),
    Tcp(TcpListener, Option<TlsAcceptor>),
}

impl Listener {
    fn local_addr(&self) -> io::Result<SocketAddr> {
        match self {
            Listener::Udp(socket) => socket.local_addr(),
            Listener::Tcp(listener, _) => listener.local_addr(),
        }
    }
}

pub struct BoundWireServer {
    listener: Listener,
    local_addr: SocketAddr,
    forward: Arc<ForwardQueryUseCase>,
}

impl BoundWireServer {
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    pub async fn serve(self) -> Result<(), DomainError> {
        match self.listener {
            Listener::Udp(socket) => serve_udp(socket, self.forward, self.local_addr).await,
            Listener::Tcp(listener, acceptor) => {
                serve_tcp(listener, acceptor, self.forward).await;
                Ok(())
            }
        }
    }
}

async fn serve_udp(
    socket: Arc<UdpSocket>,
    forward: Arc<ForwardQueryUseCase>,
    local_addr: SocketAddr,
) -> Result<(), DomainError> {
    let mut recv_buf = vec![0u8; MAX_UDP_DATAGRAM];

    loop {
        let (len, peer) = match socket.recv_from(&mut recv_buf).await {
            Ok(received) => received,
            Err(e)
                if matches!(
                    e.kind(),
                    io::ErrorKind::Interrupted | io::ErrorKind::WouldBlock | io::ErrorKind::ConnectionReset
                ) =>
            {
                continue
            }
            Err(e) => return Err(DomainError::from_io(local_addr.to_string(), &e)),
        };

        let packet = recv_buf[..len].to_vec();
        let socket = socket.clone();
        let forward = forward.clone();
        tokio::spawn(async move {
            if let Some(reply) = answer_datagram(&forward, &packet).await {
                if let Err(e) = socket.send_to(&reply, peer).await {
                    debug!(client = %peer, error = %e, "UDP reply not sent");
                }
            }
        });
    }
}

/// Reply bytes for one UDP datagram, or `None` when it should be dropped.
async fn answer_datagram(forward: &ForwardQueryUseCase, packet: &[u8]) -> Option<Vec<u8>> {
    let query = match decode(packet) {
        Ok(query) => query,
        Err(e) => {
            debug!(error = %e, len = packet.len(), "Undecodable datagram");
            return formerr_for_raw(packet);
        }
    };
    if query.message_type() != MessageType::Query {
        return None;
    }

    let response = forward.execute(&query).await;
    reply_bytes(&query, &response, requester_payload_limit(&query))
}

fn reply_bytes(query: &Message, response: &Message, limit: usize) -> Option<Vec<u8>> {
    match encode_for_udp(response, limit) {
        Ok(bytes) => Some(bytes),
        Err(e) => {
            warn!(error = %e, id = query.id(), "Failed to encode reply, sending SERVFAIL");
            encode(&error_response(query, ResponseCode::ServFail)).ok()
        }
    }
}

async fn serve_tcp(listener: TcpListener, acceptor: Option<TlsAcceptor>, forward: Arc<ForwardQueryUseCase>) {
    loop {
        let (stream, peer) = match listener.accept().await {
            Ok(conn) => conn,
            Err(e) => {
                warn!(error = %e, "Failed to accept connection");
                continue;
            }
        };

        let forward = forward.clone();
        let acceptor = acceptor.clone();
        tokio::spawn(async move {
            match acceptor {
                None => serve_stream(stream, peer, &forward).await,
                Some(acceptor) => {
                    match tokio::time::timeout(TLS_HANDSHAKE_TIMEOUT, acceptor.accept(stream)).await {
                        Ok(Ok(tls)) => serve_stream(tls, peer, &forward).await,
                        Ok(Err(e)) => debug!(client = %peer, error = %e, "TLS handshake failed"),
                        Err(_) => debug!(client = %peer, "TLS handshake timed out"),
                    }
                }
            }
        });
    }
}

/// Answers length-prefixed queries on one connection until EOF or idle timeout.
async fn serve_stream<S>(mut stream: S, peer: SocketAddr, forward: &ForwardQueryUseCase)
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    loop {
        let query_bytes =
            match tokio::time::timeout(STREAM_IDLE_TIMEOUT, read_with_length_prefix(&mut stream)).await {
                Ok(Ok(bytes)) => bytes,
                Ok(Err(e)) if e.kind() == io::ErrorKind::UnexpectedEof => break,
                Ok(Err(e)) => {
                    debug!(client = %peer, error = %e, "Stream read failed");
                    break;
                }
                Err(_) => {
                    debug!(client = %peer, "Idle stream closed");
                    break;
                }
            };

        let reply = match decode(&query_bytes) {
            Ok(query) => {
                let response = forward.execute(&query).await;
                reply_bytes(&query, &response, MAX_TCP_MESSAGE_SIZE)
            }
            Err(e) => {
                debug!(client = %peer, error = %e, "Undecodable stream query");
                formerr_for_raw(&query_bytes)
            }
        };

        let Some(reply) = reply else { break };
        if let Err(e) = send_with_length_prefix(&mut stream, &reply).await {
            debug!(client = %peer, error = %e, "Stream write failed");
            break;
        }
    }
}
