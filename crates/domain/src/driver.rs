use crate::config::AliasTable;
use crate::errors::DomainError;
use std::fmt;
use std::str::FromStr;
use url::Url;

pub const RESOLVE_PATH: &str = "/resolve";
pub const DNS_QUERY_PATH: &str = "/dns-query";

/// Closed set of transport drivers a descriptor can select.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DriverKind {
    /// Classic DNS wire format over `udp`, `tcp` or `tcp-tls`.
    Dns,
    /// Google-style JSON resolution API (`GET /resolve?name=&type=`).
    Google,
    /// RFC 8484 binary DNS messages over HTTP(S).
    Rfc8484,
    /// HTTP(S) endpoint on a non-standard path; format is negotiated per request.
    Doh,
}

impl DriverKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            DriverKind::Dns => "dns",
            DriverKind::Google => "google",
            DriverKind::Rfc8484 => "rfc8484",
            DriverKind::Doh => "doh",
        }
    }
}

impl fmt::Display for DriverKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DriverKind {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "dns" => Ok(DriverKind::Dns),
            "google" => Ok(DriverKind::Google),
            "rfc8484" => Ok(DriverKind::Rfc8484),
            "doh" | "http" | "https" => Ok(DriverKind::Doh),
            _ => Err(DomainError::UnknownDriver(s.to_string())),
        }
    }
}

pub(crate) fn parse_url(raw: &str) -> Result<Url, DomainError> {
    Url::parse(raw).map_err(|e| DomainError::InvalidUrl {
        url: raw.to_string(),
        reason: e.to_string(),
    })
}

/// Infers the driver from a URL's scheme and, for HTTP(S), its path.
pub fn guess_driver(raw: &str) -> Result<DriverKind, DomainError> {
    let url = parse_url(raw)?;

    match url.scheme() {
        "udp" | "tcp" | "tcp-tls" => Ok(DriverKind::Dns),
        "http" | "https" => match url.path() {
            RESOLVE_PATH => Ok(DriverKind::Google),
            DNS_QUERY_PATH => Ok(DriverKind::Rfc8484),
            _ => Ok(DriverKind::Doh),
        },
        other => Err(DomainError::UnsupportedScheme(other.to_string())),
    }
}

/// Well-known port for the DNS wire schemes. HTTP(S) ports are left to the URL parser.
pub fn default_port(scheme: &str) -> Option<u16> {
    match scheme {
        "udp" | "tcp" => Some(53),
        "tcp-tls" => Some(853),
        _ => None,
    }
}

/// Fills in the scheme's default port when the URL has none. Explicit ports are kept.
pub fn guess_port(url: &mut Url) {
    if url.port().is_some() {
        return;
    }
    if let Some(port) = default_port(url.scheme()) {
        // set_port only fails for URLs without a host, which have nothing to default.
        let _ = url.set_port(Some(port));
    }
}

/// An unresolved `(driver, url)` pair as it appears in configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DriverDescriptor {
    pub driver: Option<String>,
    pub url: String,
}

/// A descriptor after alias substitution and driver inference.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedDriver {
    pub kind: DriverKind,
    pub url: String,
}

impl DriverDescriptor {
    pub fn new(driver: Option<String>, url: impl Into<String>) -> Self {
        Self {
            driver,
            url: url.into(),
        }
    }

    /// Applies the alias table to the URL token, then honours an explicit driver
    /// name or falls back to inference.
    pub fn resolve(self, aliases: &AliasTable) -> Result<ResolvedDriver, DomainError> {
        let url = aliases.resolve(&self.url).to_string();

        let kind = match self.driver.as_deref().map(str::trim) {
            Some(name) if !name.is_empty() => name.parse()?,
            _ => guess_driver(&url)?,
        };

        Ok(ResolvedDriver { kind, url })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_guess_port_keeps_http_default() {
        let mut url = Url::parse("https://dns.google/resolve").unwrap();
        guess_port(&mut url);
        assert_eq!(url.as_str(), "https://dns.google/resolve");
    }

    #[test]
    fn test_driver_names_are_case_insensitive() {
        assert_eq!("RFC8484".parse::<DriverKind>().unwrap(), DriverKind::Rfc8484);
        assert_eq!("Google".parse::<DriverKind>().unwrap(), DriverKind::Google);
    }
}
