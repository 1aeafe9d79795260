//! DNS resolver configuration.

use serde::{Deserialize, Serialize};

use hopline_core::{DEFAULT_BOOTSTRAP_DNS, DEFAULT_DNS_CACHE_SIZE, DEFAULT_DNS_TIMEOUT_SECS};

/// DNS resolver configuration.
///
/// One backend is built per server URL and the backends are raced. By default
/// the public bootstrap resolvers are raced; an explicitly empty `servers`
/// list selects the system resolver configuration instead.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DnsConfig {
    /// Resolver URLs.
    ///
    /// Supported formats:
    /// - `"8.8.8.8"`, `"8.8.8.8:53"`, `"udp://8.8.8.8"`, `"dns://8.8.8.8"`: plain UDP
    /// - `"tcp://8.8.8.8"`: plain TCP
    /// - `"tls://1.1.1.1"`, `"dot://dns.name:853"`: DNS-over-TLS
    /// - `"https://dns.google/dns-query"`, `"doh://dns.google"`: DNS-over-HTTPS
    /// - `"http://10.0.0.53/dns-query"`: DoH over cleartext HTTP
    ///
    /// When a port is omitted, the standard port for that protocol is used
    /// (53 for UDP/TCP, 853 for TLS, 443 for HTTPS, 80 for HTTP). Server
    /// host names are resolved by the system resolver on first use.
    #[serde(default = "default_servers")]
    pub servers: Vec<String>,

    /// Per-query timeout in seconds.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// DNS cache capacity per backend (number of entries). 0 disables caching.
    #[serde(default = "default_cache_size")]
    pub cache_size: usize,
}

impl Default for DnsConfig {
    fn default() -> Self {
        Self {
            servers: default_servers(),
            timeout_secs: default_timeout_secs(),
            cache_size: default_cache_size(),
        }
    }
}

fn default_servers() -> Vec<String> {
    DEFAULT_BOOTSTRAP_DNS.iter().map(|s| s.to_string()).collect()
}

fn default_timeout_secs() -> u64 {
    DEFAULT_DNS_TIMEOUT_SECS
}

fn default_cache_size() -> usize {
    DEFAULT_DNS_CACHE_SIZE
}
