use super::dns_server_mock::answer_for;
use async_trait::async_trait;
use dohgate_application::ports::{DnsClient, ExchangeContext};
use dohgate_domain::DomainError;
use hickory_proto::op::Message;
use std::net::Ipv4Addr;

/// In-process upstream answering every A question with a fixed address.
pub struct StaticClient {
    addr: Ipv4Addr,
    fail: bool,
}

impl StaticClient {
    pub fn new(addr: Ipv4Addr) -> Self {
        Self { addr, fail: false }
    }

    pub fn failing() -> Self {
        Self {
            addr: Ipv4Addr::UNSPECIFIED,
            fail: true,
        }
    }
}

#[async_trait]
impl DnsClient for StaticClient {
    fn url(&self) -> &str {
        "static://upstream"
    }

    async fn exchange(&self, _ctx: &ExchangeContext, query: &Message) -> Result<Message, DomainError> {
        if self.fail {
            return Err(DomainError::TransportConnectionRefused {
                server: self.url().to_string(),
            });
        }
        Ok(answer_for(query, self.addr))
    }
}
