//! Configuration type definitions for dialing, endpoints, selection, and logging.

use std::collections::HashMap;

use hopline_dns::DnsConfig;
use hopline_select::SelectionPolicy;
use serde::{Deserialize, Serialize};

use crate::defaults::*;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub dialer: DialerConfig,
    #[serde(default)]
    pub dns: DnsConfig,
    #[serde(default)]
    pub endpoints: Vec<EndpointConfig>,
    #[serde(default)]
    pub selection: SelectionConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Base TCP dialer and optional upstream proxy beneath every endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DialerConfig {
    #[serde(default = "default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,
    /// TLS + CONNECT handshake timeout per hop.
    #[serde(default = "default_handshake_timeout_secs")]
    pub handshake_timeout_secs: u64,
    /// TCP keep-alive interval (0 = disabled).
    #[serde(default = "default_keepalive_secs")]
    pub keepalive_secs: u64,
    #[serde(default = "default_no_delay")]
    pub no_delay: bool,
    /// `http://` or `https://` proxy URL, with optional `user:pass@`.
    #[serde(default)]
    pub base_proxy: Option<String>,
}

impl Default for DialerConfig {
    fn default() -> Self {
        Self {
            connect_timeout_secs: default_connect_timeout_secs(),
            handshake_timeout_secs: default_handshake_timeout_secs(),
            keepalive_secs: default_keepalive_secs(),
            no_delay: default_no_delay(),
            base_proxy: None,
        }
    }
}

/// One proxy hop.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EndpointConfig {
    /// `host:port` of the hop.
    pub address: String,
    /// Connect to this IP instead of resolving the address host.
    #[serde(default)]
    pub fixed_ip: Option<String>,
    /// Expected certificate identity. Plain CONNECT when unset.
    #[serde(default)]
    pub tls_name: Option<String>,
    /// SNI sent instead of `tls_name`. No SNI when unset or empty.
    #[serde(default)]
    pub fake_sni: Option<String>,
    #[serde(default)]
    pub login: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
    #[serde(default = "default_true")]
    pub cert_chain_workaround: bool,
    /// PEM CA bundle replacing the built-in roots.
    #[serde(default)]
    pub ca_file: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SelectionConfig {
    #[serde(default = "default_policy")]
    pub policy: SelectionPolicy,
    /// Fetched through each candidate by the `fastest` policy.
    #[serde(default = "default_benchmark_url")]
    pub benchmark_url: String,
    /// Probe body cap in bytes (0 = read the whole body).
    #[serde(default = "default_download_limit")]
    pub download_limit: u64,
    #[serde(default = "default_selection_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for SelectionConfig {
    fn default() -> Self {
        Self {
            policy: default_policy(),
            benchmark_url: default_benchmark_url(),
            download_limit: default_download_limit(),
            timeout_secs: default_selection_timeout_secs(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error).
    pub level: Option<String>,
    /// Log format: json, pretty, or compact. Default: pretty.
    pub format: Option<String>,
    /// Output target: stdout or stderr. Default: stderr.
    pub output: Option<String>,
    /// Per-module log level filters (e.g., {"hopline_tunnel": "debug", "rustls": "warn"}).
    #[serde(default)]
    pub filters: HashMap<String, String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_defaults() {
        let cfg: Config = toml::from_str("").unwrap();
        assert!(cfg.endpoints.is_empty());
        assert_eq!(cfg.dialer.connect_timeout_secs, 30);
        assert_eq!(cfg.dialer.keepalive_secs, 30);
        assert!(cfg.dialer.no_delay);
        assert!(cfg.dialer.base_proxy.is_none());
        assert_eq!(cfg.selection.policy, SelectionPolicy::Fastest);
        assert_eq!(cfg.selection.download_limit, 0);
        assert_eq!(cfg.dns.servers.len(), hopline_core::DEFAULT_BOOTSTRAP_DNS.len());

        let cfg: Config = toml::from_str("[dns]\nservers = []").unwrap();
        assert!(cfg.dns.servers.is_empty());
    }

    #[test]
    fn endpoint_deserialize_minimal() {
        let cfg: EndpointConfig = toml::from_str(r#"address = "10.0.0.1:443""#).unwrap();
        assert_eq!(cfg.address, "10.0.0.1:443");
        assert!(cfg.fixed_ip.is_none());
        assert!(cfg.tls_name.is_none());
        assert!(cfg.fake_sni.is_none());
        assert!(cfg.cert_chain_workaround);
        assert!(cfg.ca_file.is_none());
    }

    #[test]
    fn endpoint_deserialize_full() {
        let toml_str = r#"
address = "zagent90.hola.org:443"
fixed_ip = "203.0.113.90"
tls_name = "zagent90.hola.org"
fake_sni = ""
login = "user-uuid-abc"
password = "secret"
cert_chain_workaround = false
ca_file = "/etc/ssl/hops.pem"
"#;
        let cfg: EndpointConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(cfg.fixed_ip.as_deref(), Some("203.0.113.90"));
        assert_eq!(cfg.tls_name.as_deref(), Some("zagent90.hola.org"));
        assert_eq!(cfg.fake_sni.as_deref(), Some(""));
        assert_eq!(cfg.login.as_deref(), Some("user-uuid-abc"));
        assert_eq!(cfg.password.as_deref(), Some("secret"));
        assert!(!cfg.cert_chain_workaround);
        assert_eq!(cfg.ca_file.as_deref(), Some("/etc/ssl/hops.pem"));
    }

    #[test]
    fn selection_policy_names() {
        let cfg: SelectionConfig = toml::from_str(r#"policy = "random""#).unwrap();
        assert_eq!(cfg.policy, SelectionPolicy::Random);
        assert!(toml::from_str::<SelectionConfig>(r#"policy = "round_robin""#).is_err());
    }
}
