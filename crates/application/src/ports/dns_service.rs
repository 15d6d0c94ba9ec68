use async_trait::async_trait;
use dohgate_domain::DomainError;

/// Inbound capability: listen and answer queries until the process stops.
#[async_trait]
pub trait DnsService: Send + Sync {
    fn url(&self) -> &str;

    /// Binds the listener and serves. Returns only on a fatal error.
    async fn run(&self) -> Result<(), DomainError>;
}
