use crate::errors::DomainError;
use ipnetwork::IpNetwork;
use std::fmt;
use std::net::IpAddr;
use std::str::FromStr;

pub const FAMILY_IPV4: u16 = 1;
pub const FAMILY_IPV6: u16 = 2;

/// Source network announced in an EDNS0 Client-Subnet option (RFC 7871).
///
/// Parsed from CIDR notation (`192.0.2.0/24`) or a bare address, in which case
/// the prefix covers the whole address. IPv4-mapped IPv6 addresses are stored
/// as plain IPv4 so the family tag always matches the address version.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct EcsSubnet {
    addr: IpAddr,
    prefix: u8,
}

impl EcsSubnet {
    pub fn new(addr: IpAddr, prefix: u8) -> Result<Self, DomainError> {
        let (addr, prefix) = match addr {
            IpAddr::V6(v6) => match v6.to_ipv4_mapped() {
                Some(v4) if prefix >= 96 => (IpAddr::V4(v4), prefix - 96),
                _ => (addr, prefix),
            },
            IpAddr::V4(_) => (addr, prefix),
        };

        if prefix > max_prefix(&addr) {
            return Err(DomainError::InvalidSubnet(format!(
                "prefix /{} too long for {}",
                prefix, addr
            )));
        }

        Ok(Self { addr, prefix })
    }

    pub fn addr(&self) -> IpAddr {
        self.addr
    }

    pub fn prefix(&self) -> u8 {
        self.prefix
    }

    pub fn family(&self) -> u16 {
        match self.addr {
            IpAddr::V4(_) => FAMILY_IPV4,
            IpAddr::V6(_) => FAMILY_IPV6,
        }
    }
}

fn max_prefix(addr: &IpAddr) -> u8 {
    match addr {
        IpAddr::V4(_) => 32,
        IpAddr::V6(_) => 128,
    }
}

impl FromStr for EcsSubnet {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();

        if s.contains('/') {
            let network = IpNetwork::from_str(s)
                .map_err(|e| DomainError::InvalidSubnet(format!("'{}': {}", s, e)))?;
            return Self::new(network.network(), network.prefix());
        }

        let addr: IpAddr = s
            .parse()
            .map_err(|_| DomainError::InvalidSubnet(format!("'{}' is neither CIDR nor IP", s)))?;
        let addr = match addr {
            IpAddr::V6(v6) => v6.to_ipv4_mapped().map(IpAddr::V4).unwrap_or(addr),
            v4 => v4,
        };
        Self::new(addr, max_prefix(&addr))
    }
}

impl fmt::Display for EcsSubnet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.addr, self.prefix)
    }
}
