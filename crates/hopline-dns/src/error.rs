//! DNS resolver errors.

use std::fmt;
use std::net::AddrParseError;

/// Errors from DNS resolution.
#[derive(Debug, thiserror::Error)]
pub enum DnsError {
    /// DNS lookup returned no results.
    #[error("dns lookup returned no results for {0}")]
    NoResults(String),

    /// DNS lookup failed.
    #[error("dns lookup failed: {0}")]
    Lookup(#[from] hickory_resolver::ResolveError),

    /// Invalid address format (missing port, bad IP, etc.).
    #[error("invalid address: {0}")]
    InvalidAddress(String),

    /// Failed to parse IP address.
    #[error("invalid IP address: {0}")]
    AddrParse(#[from] AddrParseError),

    /// The system resolver could not resolve a host.
    #[error("system lookup of {host} failed: {source}")]
    SystemLookup {
        host: String,
        #[source]
        source: std::io::Error,
    },

    /// A DNS message could not be built or parsed.
    #[error("dns message error: {0}")]
    Protocol(#[from] hickory_proto::ProtoError),

    /// A plain DoH exchange failed at the HTTP layer.
    #[error("doh request failed: {0}")]
    Http(String),

    /// The server answered with a failure code.
    #[error("dns server answered {0}")]
    Response(String),

    /// No answer within the configured timeout.
    #[error("dns lookup timed out")]
    Timeout,

    /// Invalid DNS server URL.
    #[error("invalid dns server url: {0}")]
    InvalidServer(String),

    /// Unknown address family token.
    #[error("unsupported address family: {0}")]
    UnsupportedFamily(String),

    /// The caller cancelled the lookup.
    #[error("dns lookup cancelled")]
    Cancelled,

    /// Every raced backend failed.
    #[error("all {} resolvers failed: {}", .0.len(), DisplayList(.0))]
    AllFailed(Vec<DnsError>),
}

impl DnsError {
    /// Component errors of an aggregated failure, or just `self`.
    pub fn errors(&self) -> &[DnsError] {
        match self {
            Self::AllFailed(errors) => errors,
            other => std::slice::from_ref(other),
        }
    }
}

struct DisplayList<'a>(&'a [DnsError]);

impl fmt::Display for DisplayList<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, err) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str("; ")?;
            }
            write!(f, "#{}: {err}", i + 1)?;
        }
        Ok(())
    }
}
