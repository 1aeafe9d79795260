//! Error kind labels for structured logging.
//!
//! These constants provide consistent error classification across all crates.

/// TLS handshake or certificate verification error.
pub const ERROR_TLS: &str = "tls";
/// I/O error.
pub const ERROR_IO: &str = "io";
/// DNS/address resolution error.
pub const ERROR_RESOLVE: &str = "resolve";
/// Timeout error.
pub const ERROR_TIMEOUT: &str = "timeout";
/// Operation cancelled by the caller.
pub const ERROR_CANCELLED: &str = "cancelled";
/// Requested network or address is not supported.
pub const ERROR_UNSUPPORTED: &str = "unsupported";
/// CONNECT tunnel establishment error.
pub const ERROR_TUNNEL: &str = "tunnel";
/// Destination refused by the proxy hop.
pub const ERROR_BLOCKED: &str = "blocked";
/// Configuration error.
pub const ERROR_CONFIG: &str = "config";
