use thiserror::Error;

/// Coarse classification used to decide how an error is surfaced.
///
/// * `Config` and `Listener` errors are fatal for the component being built.
/// * `Parameter` errors terminate only the offending invocation.
/// * `Transport` and `Decode` errors are isolated to a single exchange.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Config,
    Parameter,
    Transport,
    Decode,
    Listener,
}

#[derive(Error, Debug, Clone)]
pub enum DomainError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Unknown driver: {0}")]
    UnknownDriver(String),

    #[error("Unsupported URL scheme '{0}'")]
    UnsupportedScheme(String),

    #[error("Invalid URL '{url}': {reason}")]
    InvalidUrl { url: String, reason: String },

    #[error("Invalid subnet: {0}")]
    InvalidSubnet(String),

    #[error("Unknown record type: {0}")]
    UnknownRecordType(String),

    #[error("Invalid domain name: {0}")]
    InvalidDomainName(String),

    #[error("Transport timeout talking to {server}")]
    TransportTimeout { server: String },

    #[error("Transport connection refused by {server}")]
    TransportConnectionRefused { server: String },

    #[error("Transport connection reset by {server}")]
    TransportConnectionReset { server: String },

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Upstream {url} returned HTTP {status}")]
    HttpStatus { url: String, status: u16 },

    #[error("Query cancelled")]
    Cancelled,

    #[error("Invalid DNS message: {0}")]
    InvalidDnsMessage(String),

    #[error("Invalid JSON document: {0}")]
    InvalidJson(String),

    #[error("Failed to bind {addr}: {reason}")]
    Bind { addr: String, reason: String },

    #[error("I/O error: {0}")]
    IoError(String),
}

impl DomainError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            DomainError::ConfigError(_)
            | DomainError::UnknownDriver(_)
            | DomainError::UnsupportedScheme(_)
            | DomainError::InvalidUrl { .. } => ErrorKind::Config,

            DomainError::InvalidSubnet(_)
            | DomainError::UnknownRecordType(_)
            | DomainError::InvalidDomainName(_) => ErrorKind::Parameter,

            DomainError::TransportTimeout { .. }
            | DomainError::TransportConnectionRefused { .. }
            | DomainError::TransportConnectionReset { .. }
            | DomainError::Transport(_)
            | DomainError::HttpStatus { .. }
            | DomainError::Cancelled
            | DomainError::IoError(_) => ErrorKind::Transport,

            DomainError::InvalidDnsMessage(_) | DomainError::InvalidJson(_) => ErrorKind::Decode,

            DomainError::Bind { .. } => ErrorKind::Listener,
        }
    }

    /// Maps an `io::Error` raised while talking to `server` onto the transport taxonomy.
    pub fn from_io(server: impl Into<String>, err: &std::io::Error) -> Self {
        let server = server.into();
        match err.kind() {
            std::io::ErrorKind::TimedOut => DomainError::TransportTimeout { server },
            std::io::ErrorKind::ConnectionRefused => {
                DomainError::TransportConnectionRefused { server }
            }
            std::io::ErrorKind::ConnectionReset
            | std::io::ErrorKind::ConnectionAborted
            | std::io::ErrorKind::BrokenPipe
            | std::io::ErrorKind::UnexpectedEof => DomainError::TransportConnectionReset { server },
            _ => DomainError::Transport(format!("{}: {}", server, err)),
        }
    }
}
