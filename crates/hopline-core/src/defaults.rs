//! Default configuration values.
//!
//! Centralized default constants for use across all crates.

// ============================================================================
// Timeout Defaults
// ============================================================================

/// Default timeout for network operations (resolution, selection) in seconds.
pub const DEFAULT_NETWORK_TIMEOUT_SECS: u64 = 10;
/// Default TCP connect timeout in seconds.
pub const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 30;
/// Default TLS handshake timeout in seconds.
pub const DEFAULT_TLS_HANDSHAKE_TIMEOUT_SECS: u64 = 10;
/// Default per-query DNS timeout in seconds.
pub const DEFAULT_DNS_TIMEOUT_SECS: u64 = 5;

// ============================================================================
// Buffer/Size Defaults
// ============================================================================

/// Default relay buffer size (128 KiB).
pub const DEFAULT_RELAY_BUFFER_SIZE: usize = 128 * 1024;
/// Maximum size of a CONNECT response head, status line included.
pub const DEFAULT_MAX_HEADER_BYTES: usize = 8192;
/// Maximum number of headers parsed from a CONNECT response.
pub const DEFAULT_MAX_HEADERS: usize = 64;
/// Default DNS cache capacity per resolver backend.
pub const DEFAULT_DNS_CACHE_SIZE: usize = 256;

// ============================================================================
// TCP Socket Defaults
// ============================================================================

/// Default TCP_NODELAY (disable Nagle's algorithm for lower latency).
pub const DEFAULT_TCP_NO_DELAY: bool = true;
/// Default TCP Keep-Alive interval in seconds (0 = disabled).
pub const DEFAULT_TCP_KEEPALIVE_SECS: u64 = 30;

// ============================================================================
// Selection Defaults
// ============================================================================

/// Default server selection policy.
pub const DEFAULT_SELECTION_POLICY: &str = "fastest";
/// Default benchmark URL fetched by the fastest-server probe.
pub const DEFAULT_BENCHMARK_URL: &str = "https://ajax.googleapis.com/ajax/libs/angularjs/1.8.2/angular.min.js";
/// Default probe download cap in bytes (0 = unlimited).
pub const DEFAULT_BENCHMARK_DOWNLOAD_LIMIT: u64 = 0;

// ============================================================================
// DNS Defaults
// ============================================================================

/// Default bootstrap resolvers raced against each other.
pub const DEFAULT_BOOTSTRAP_DNS: &[&str] = &[
    "https://1.1.1.3/dns-query",
    "https://8.8.8.8/dns-query",
    "https://dns.google/dns-query",
    "https://security.cloudflare-dns.com/dns-query",
    "https://dns.quad9.net/dns-query",
];

// ============================================================================
// Protocol Constants
// ============================================================================

/// Header attached by the proxy hop when it refuses a destination.
pub const UPSTREAM_ERROR_HEADER: &str = "X-Hola-Error";
/// Value of [`UPSTREAM_ERROR_HEADER`] signalling a refused destination.
pub const UPSTREAM_FORBIDDEN_HOST: &str = "Forbidden Host";
