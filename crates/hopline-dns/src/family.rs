//! Address families a lookup can be restricted to.

use std::fmt;
use std::net::IpAddr;
use std::str::FromStr;

use crate::error::DnsError;

/// Address family requested from a resolver.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Family {
    /// IPv4 and IPv6.
    #[default]
    Ip,
    /// IPv4 only (A records).
    Ip4,
    /// IPv6 only (AAAA records).
    Ip6,
}

impl Family {
    /// Whether `ip` belongs to this family.
    pub fn matches(self, ip: IpAddr) -> bool {
        match self {
            Self::Ip => true,
            Self::Ip4 => ip.is_ipv4(),
            Self::Ip6 => ip.is_ipv6(),
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Ip => "ip",
            Self::Ip4 => "ip4",
            Self::Ip6 => "ip6",
        }
    }
}

impl fmt::Display for Family {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Family {
    type Err = DnsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "ip" => Ok(Self::Ip),
            "ip4" => Ok(Self::Ip4),
            "ip6" => Ok(Self::Ip6),
            _ => Err(DnsError::UnsupportedFamily(s.to_string())),
        }
    }
}
