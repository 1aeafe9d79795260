//! Network tokens accepted by dialers.

use std::fmt;
use std::str::FromStr;

use hopline_dns::Family;

use crate::error::DialError;

/// Transport requested from a dialer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Network {
    Tcp,
    Tcp4,
    Tcp6,
    Udp,
    Udp4,
    Udp6,
    Unix,
}

impl Network {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Tcp => "tcp",
            Self::Tcp4 => "tcp4",
            Self::Tcp6 => "tcp6",
            Self::Udp => "udp",
            Self::Udp4 => "udp4",
            Self::Udp6 => "udp6",
            Self::Unix => "unix",
        }
    }

    /// Whether this is one of the TCP variants.
    pub fn is_tcp(self) -> bool {
        matches!(self, Self::Tcp | Self::Tcp4 | Self::Tcp6)
    }

    /// Resolution family for this network, `None` if it has no IP addresses.
    pub fn family(self) -> Option<Family> {
        match self {
            Self::Tcp | Self::Udp => Some(Family::Ip),
            Self::Tcp4 | Self::Udp4 => Some(Family::Ip4),
            Self::Tcp6 | Self::Udp6 => Some(Family::Ip6),
            Self::Unix => None,
        }
    }
}

impl fmt::Display for Network {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Network {
    type Err = DialError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "tcp" => Ok(Self::Tcp),
            "tcp4" => Ok(Self::Tcp4),
            "tcp6" => Ok(Self::Tcp6),
            "udp" => Ok(Self::Udp),
            "udp4" => Ok(Self::Udp4),
            "udp6" => Ok(Self::Udp6),
            "unix" => Ok(Self::Unix),
            other => Err(DialError::UnsupportedNetwork(other.to_string())),
        }
    }
}
