//! dohgate Domain Layer
pub mod config;
pub mod dns_query;
pub mod driver;
pub mod endpoint;
pub mod errors;
pub mod record_type;
pub mod subnet;

pub use config::{
    AliasTable, CliOverrides, Config, ConfigError, DriverConfig, LoggingConfig, DEFAULT_SEARCH_PATH,
};
pub use dns_query::DnsQuery;
pub use driver::{
    default_port, guess_driver, guess_port, DriverDescriptor, DriverKind, ResolvedDriver,
    DNS_QUERY_PATH, RESOLVE_PATH,
};
pub use endpoint::{DnsEndpoint, UpstreamAddr, WireScheme};
pub use errors::{DomainError, ErrorKind};
pub use record_type::RecordType;
pub use subnet::EcsSubnet;
