//! Outbound drivers. The set is closed; `create_client` picks one from a
//! `client` config block.

pub mod google;
pub mod http;
pub mod rfc8484;
pub mod wire;

use async_trait::async_trait;
use dohgate_application::ports::{DnsClient, ExchangeContext};
use dohgate_domain::{AliasTable, DomainError, DriverConfig, DriverKind};
use hickory_proto::op::Message;
use tracing::info;

pub use google::GoogleClient;
pub use rfc8484::Rfc8484Client;
pub use wire::WireClient;

pub enum Client {
    Dns(WireClient),
    Google(GoogleClient),
    Rfc8484(Rfc8484Client),
}

impl Client {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Dns(_) => "dns",
            Self::Google(_) => "google",
            Self::Rfc8484(_) => "rfc8484",
        }
    }
}

#[async_trait]
impl DnsClient for Client {
    fn url(&self) -> &str {
        match self {
            Self::Dns(c) => c.url(),
            Self::Google(c) => c.url(),
            Self::Rfc8484(c) => c.url(),
        }
    }

    async fn exchange(&self, ctx: &ExchangeContext, query: &Message) -> Result<Message, DomainError> {
        match self {
            Self::Dns(c) => c.exchange(ctx, query).await,
            Self::Google(c) => c.exchange(ctx, query).await,
            Self::Rfc8484(c) => c.exchange(ctx, query).await,
        }
    }
}

/// Builds the client named by `config`, applying `aliases` to its URL first.
pub fn create_client(config: &DriverConfig, aliases: &AliasTable) -> Result<Client, DomainError> {
    let resolved = config.descriptor().resolve(aliases)?;
    let timeout = config.timeout();

    let client = match resolved.kind {
        DriverKind::Dns => Client::Dns(WireClient::new(&resolved.url, config.insecure, timeout)?),
        DriverKind::Google => {
            Client::Google(GoogleClient::new(&resolved.url, config.insecure, timeout)?)
        }
        DriverKind::Rfc8484 | DriverKind::Doh => {
            Client::Rfc8484(Rfc8484Client::new(&resolved.url, config.insecure, timeout)?)
        }
    };

    info!(driver = client.kind(), url = %resolved.url, insecure = config.insecure, "Client created");
    Ok(client)
}
