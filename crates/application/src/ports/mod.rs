mod dns_client;
mod dns_service;

pub use dns_client::{DnsClient, ExchangeContext};
pub use dns_service::DnsService;
