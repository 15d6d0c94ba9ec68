use crate::dns::transport::{create_transport, tcp::TcpTransport, DnsTransport, Transport};
use crate::dns::wire::{decode, encode, validate_response_id};
use async_trait::async_trait;
use dohgate_application::ports::{DnsClient, ExchangeContext};
use dohgate_domain::{DnsEndpoint, DomainError, WireScheme};
use hickory_proto::op::Message;
use std::time::Duration;
use tracing::debug;

/// Classic DNS client over `udp://`, `tcp://` or `tcp-tls://`.
pub struct WireClient {
    url: String,
    transport: Transport,
    /// Used when a UDP answer comes back truncated.
    tcp_fallback: Option<TcpTransport>,
    timeout: Duration,
}

impl WireClient {
    pub fn new(url: &str, insecure: bool, timeout: Duration) -> Result<Self, DomainError> {
        let endpoint = DnsEndpoint::parse(url)?;
        let transport = create_transport(&endpoint, insecure)?;
        let tcp_fallback =
            (endpoint.scheme == WireScheme::Udp).then(|| TcpTransport::new(endpoint.addr.clone()));

        Ok(Self {
            url: endpoint.to_string(),
            transport,
            tcp_fallback,
            timeout,
        })
    }

    async fn round_trip(&self, ctx: &ExchangeContext, query_bytes: &[u8]) -> Result<Message, DomainError> {
        let response = self.transport.send(query_bytes, ctx.remaining()).await?;
        validate_response_id(query_bytes, &response.bytes, &self.url)?;
        let message = decode(&response.bytes)?;

        match &self.tcp_fallback {
            Some(tcp) if message.truncated() => {
                debug!(server = %self.url, "Truncated UDP answer, retrying over TCP");
                let response = tcp.send(query_bytes, ctx.remaining()).await?;
                validate_response_id(query_bytes, &response.bytes, &self.url)?;
                decode(&response.bytes)
            }
            _ => Ok(message),
        }
    }
}

#[async_trait]
impl DnsClient for WireClient {
    fn url(&self) -> &str {
        &self.url
    }

    async fn exchange(&self, ctx: &ExchangeContext, query: &Message) -> Result<Message, DomainError> {
        let ctx = ctx.narrowed(self.timeout);
        let query_bytes = encode(query)?;

        let answer = ctx.run(&self.url, self.round_trip(&ctx, &query_bytes)).await?;

        debug!(
            server = %self.url,
            protocol = self.transport.protocol_name(),
            answers = answer.answers().len(),
            "Wire exchange complete"
        );
        Ok(answer)
    }
}
