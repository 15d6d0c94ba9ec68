//! Inbound drivers. `create_service` picks one from a `service` config block
//! and binds it to the client answering its queries.

pub mod doh;
pub mod socket;
pub mod wire;

use crate::dns::tls::ServerTlsConfig;
use async_trait::async_trait;
use dohgate_application::ports::{DnsClient, DnsService};
use dohgate_application::use_cases::ForwardQueryUseCase;
use dohgate_domain::{AliasTable, DomainError, DriverConfig, DriverKind};
use std::sync::Arc;
use tracing::info;

pub use doh::DohServer;
pub use wire::WireServer;

const DOT_ALPN: &[&[u8]] = &[b"dot"];
const DOH_ALPN: &[&[u8]] = &[b"h2", b"http/1.1"];

pub enum Service {
    Wire(WireServer),
    Doh(DohServer),
}

#[async_trait]
impl DnsService for Service {
    fn url(&self) -> &str {
        match self {
            Self::Wire(s) => s.url(),
            Self::Doh(s) => s.url(),
        }
    }

    async fn run(&self) -> Result<(), DomainError> {
        match self {
            Self::Wire(s) => s.run().await,
            Self::Doh(s) => s.run().await,
        }
    }
}

/// Builds the listener named by `config`. Queries it receives are answered
/// through `client`.
pub fn create_service(
    config: &DriverConfig,
    aliases: &AliasTable,
    client: Arc<dyn DnsClient>,
) -> Result<Service, DomainError> {
    let resolved = config.descriptor().resolve(aliases)?;
    let forward = Arc::new(ForwardQueryUseCase::new(client, config.timeout()));

    let service = match resolved.kind {
        DriverKind::Dns => Service::Wire(WireServer::new(
            &resolved.url,
            server_tls(config, DOT_ALPN)?,
            forward,
        )?),
        DriverKind::Google | DriverKind::Rfc8484 | DriverKind::Doh => Service::Doh(DohServer::new(
            &resolved.url,
            server_tls(config, DOH_ALPN)?,
            forward,
        )?),
    };

    info!(driver = resolved.kind.as_str(), url = %resolved.url, "Service created");
    Ok(service)
}

fn server_tls(
    config: &DriverConfig,
    alpn: &[&[u8]],
) -> Result<Option<Arc<rustls::ServerConfig>>, DomainError> {
    match (&config.certfile, &config.keyfile) {
        (Some(cert), Some(key)) => Ok(Some(
            ServerTlsConfig::from_files(cert, key)?.build_server_config(alpn)?,
        )),
        _ => Ok(None),
    }
}
