//! Dial error types.

use hopline_core::errors::{
    ERROR_BLOCKED, ERROR_CANCELLED, ERROR_IO, ERROR_RESOLVE, ERROR_TIMEOUT, ERROR_TLS,
    ERROR_TUNNEL, ERROR_UNSUPPORTED,
};
use hopline_dns::DnsError;

/// Errors that can occur while establishing a connection.
#[derive(Debug, thiserror::Error)]
pub enum DialError {
    #[error("unsupported network: {0}")]
    UnsupportedNetwork(String),

    #[error("invalid address: {0}")]
    InvalidAddress(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{0} timed out")]
    Timeout(&'static str),

    #[error("dial cancelled")]
    Cancelled,

    #[error("resolve failed: {0}")]
    Resolve(DnsError),

    #[error("no addresses for {0}")]
    NoAddresses(String),

    #[error("TLS error: {0}")]
    Tls(#[from] rustls::Error),

    #[error("tunnel error: {0}")]
    Tunnel(#[from] TunnelError),
}

impl From<DnsError> for DialError {
    fn from(e: DnsError) -> Self {
        match e {
            DnsError::Cancelled => Self::Cancelled,
            other => Self::Resolve(other),
        }
    }
}

impl DialError {
    /// Error kind label for structured logging.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::UnsupportedNetwork(_) | Self::InvalidAddress(_) => ERROR_UNSUPPORTED,
            Self::Io(_) => ERROR_IO,
            Self::Timeout(_) => ERROR_TIMEOUT,
            Self::Cancelled => ERROR_CANCELLED,
            Self::Resolve(_) | Self::NoAddresses(_) => ERROR_RESOLVE,
            Self::Tls(_) => ERROR_TLS,
            Self::Tunnel(TunnelError::UpstreamBlocked) => ERROR_BLOCKED,
            Self::Tunnel(_) => ERROR_TUNNEL,
        }
    }

    /// Whether the proxy hop explicitly refused the destination.
    pub fn is_upstream_blocked(&self) -> bool {
        matches!(self, Self::Tunnel(TunnelError::UpstreamBlocked))
    }
}

/// CONNECT tunnel establishment failures.
#[derive(Debug, thiserror::Error)]
pub enum TunnelError {
    /// The proxy answered CONNECT with a non-200 status.
    #[error("CONNECT rejected: {code} {reason}")]
    Status { code: u16, reason: String },

    /// The proxy refused to reach the requested destination.
    #[error("proxy refused to reach the destination")]
    UpstreamBlocked,

    #[error("malformed CONNECT response: {0}")]
    MalformedResponse(String),

    #[error("CONNECT response head exceeds {0} bytes")]
    ResponseTooLarge(usize),

    #[error("proxy closed the connection before completing the CONNECT response")]
    UnexpectedEof,

    #[error("credentials unavailable: {0}")]
    Credentials(String),
}
