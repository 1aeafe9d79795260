//! Resolver backends built from server URLs.

use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use hickory_proto::xfer::Protocol;
use hickory_resolver::Resolver;
use hickory_resolver::config::{
    NameServerConfig, NameServerConfigGroup, ResolverConfig, ResolverOpts,
};
use hickory_resolver::name_server::TokioConnectionProvider;
use tokio::sync::OnceCell;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::config::DnsConfig;
use crate::doh::PlainDoh;
use crate::error::DnsError;
use crate::family::Family;
use crate::lookup::LookupIp;

/// A single resolver backend.
///
/// Wraps `hickory_resolver::Resolver` with:
/// - Built-in async caching with TTL
/// - One nameserver transport per instance (UDP/TCP/DoH/DoT) so that
///   several instances can be raced against each other
/// - Family-restricted lookups
///
/// A server given by host name is resolved through the system resolver on
/// the first query, not at construction. `http://` servers speak DoH over
/// plain HTTP, which hickory has no transport for, and are not cached.
///
/// Thread-safe and cheaply cloneable (wraps `Arc` internally).
#[derive(Clone)]
pub struct DnsResolver {
    inner: Arc<Inner>,
}

struct Inner {
    backend: Backend,
    label: String,
}

enum Backend {
    System(Resolver<TokioConnectionProvider>),
    Server {
        server: ServerUrl,
        opts: ResolverOpts,
        resolver: OnceCell<Resolver<TokioConnectionProvider>>,
    },
    PlainDoh(PlainDoh),
}

impl std::fmt::Debug for DnsResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DnsResolver")
            .field("server", &self.inner.label)
            .finish()
    }
}

impl DnsResolver {
    /// Build a resolver from the system configuration
    /// (`/etc/resolv.conf` on Unix).
    pub fn system(config: &DnsConfig) -> Result<Self, DnsError> {
        let mut builder = Resolver::builder_tokio()
            .map_err(|e| DnsError::InvalidServer(format!("system config: {e}")))?;
        *builder.options_mut() = options(config);

        Ok(Self {
            inner: Arc::new(Inner {
                backend: Backend::System(builder.build()),
                label: "system".to_string(),
            }),
        })
    }

    /// Build a resolver that queries the single server described by `url`.
    ///
    /// Only parses `url`; no network access happens until the first lookup.
    /// See [`DnsConfig::servers`] for the accepted formats.
    pub fn from_url(url: &str, config: &DnsConfig) -> Result<Self, DnsError> {
        let server = parse_server_url(url)?;
        let backend = match server.transport {
            Transport::Http => {
                Backend::PlainDoh(PlainDoh::new(server, Duration::from_secs(config.timeout_secs)))
            }
            _ => Backend::Server {
                server,
                opts: options(config),
                resolver: OnceCell::new(),
            },
        };

        Ok(Self {
            inner: Arc::new(Inner {
                backend,
                label: url.to_string(),
            }),
        })
    }

    /// Server this backend queries, for logging.
    pub fn label(&self) -> &str {
        &self.inner.label
    }

    async fn query(&self, family: Family, host: &str) -> Result<Vec<IpAddr>, DnsError> {
        let resolver = match &self.inner.backend {
            Backend::System(resolver) => resolver,
            Backend::Server {
                server,
                opts,
                resolver,
            } => resolver.get_or_try_init(|| connect(server, opts)).await?,
            Backend::PlainDoh(doh) => return doh.lookup(family, host).await,
        };

        let addrs = match family {
            Family::Ip => resolver.lookup_ip(host).await?.iter().collect(),
            Family::Ip4 => resolver
                .ipv4_lookup(host)
                .await?
                .iter()
                .map(|a| IpAddr::V4(a.0))
                .collect(),
            Family::Ip6 => resolver
                .ipv6_lookup(host)
                .await?
                .iter()
                .map(|aaaa| IpAddr::V6(aaaa.0))
                .collect(),
        };
        Ok(addrs)
    }
}

#[async_trait]
impl LookupIp for DnsResolver {
    async fn lookup_ip(
        &self,
        family: Family,
        host: &str,
        cancel: &CancellationToken,
    ) -> Result<Vec<IpAddr>, DnsError> {
        // Fast path: host is an IP literal
        if let Ok(ip) = host.parse::<IpAddr>() {
            return Ok(if family.matches(ip) { vec![ip] } else { Vec::new() });
        }

        let addrs = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(DnsError::Cancelled),
            res = self.query(family, host) => res?,
        };

        debug!(
            server = %self.inner.label,
            host = %host,
            family = %family,
            count = addrs.len(),
            "dns resolved"
        );
        Ok(addrs)
    }
}

fn options(config: &DnsConfig) -> ResolverOpts {
    let mut opts = ResolverOpts::default();
    opts.timeout = Duration::from_secs(config.timeout_secs);
    opts.cache_size = config.cache_size;
    opts.preserve_intermediates = true;
    opts
}

/// Build the hickory resolver for `server` once its address is known.
async fn connect(
    server: &ServerUrl,
    opts: &ResolverOpts,
) -> Result<Resolver<TokioConnectionProvider>, DnsError> {
    let (protocol, tls_dns_name) = match server.transport {
        Transport::Udp => (Protocol::Udp, None),
        Transport::Tcp => (Protocol::Tcp, None),
        Transport::Tls => (Protocol::Tls, Some(server.host.clone())),
        Transport::Https => (Protocol::Https, Some(server.host.clone())),
        Transport::Http => {
            return Err(DnsError::InvalidServer(
                "plain http is served by its own backend".to_string(),
            ));
        }
    };

    let socket_addr = lookup_server(&server.host, server.port).await?;
    let name_server = NameServerConfig {
        socket_addr,
        protocol,
        tls_dns_name,
        http_endpoint: server.path.clone(),
        trust_negative_responses: false,
        bind_addr: None,
    };
    debug!(host = %server.host, addr = %socket_addr, protocol = ?protocol, "dns server ready");

    let resolver_config =
        ResolverConfig::from_parts(None, vec![], NameServerConfigGroup::from(vec![name_server]));
    let mut builder =
        Resolver::builder_with_config(resolver_config, TokioConnectionProvider::default());
    *builder.options_mut() = opts.clone();
    Ok(builder.build())
}

/// Resolve a DNS server host with the system resolver.
pub(crate) async fn lookup_server(host: &str, port: u16) -> Result<SocketAddr, DnsError> {
    if let Ok(ip) = host.parse::<IpAddr>() {
        return Ok(SocketAddr::new(ip, port));
    }

    tokio::net::lookup_host((host, port))
        .await
        .map_err(|source| DnsError::SystemLookup {
            host: host.to_string(),
            source,
        })?
        .next()
        .ok_or_else(|| DnsError::NoResults(host.to_string()))
}

/// Check that `url` names a resolver this crate can build.
///
/// Syntax only; host names are not resolved.
pub fn check_server_url(url: &str) -> Result<(), DnsError> {
    parse_server_url(url).map(|_| ())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Transport {
    Udp,
    Tcp,
    Tls,
    Https,
    /// DoH without TLS.
    Http,
}

/// A parsed resolver URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct ServerUrl {
    pub(crate) transport: Transport,
    pub(crate) host: String,
    pub(crate) port: u16,
    /// DoH request path.
    pub(crate) path: Option<String>,
}

/// Parse a server URL.
///
/// A URL without a scheme is a plain UDP server.
pub(crate) fn parse_server_url(url: &str) -> Result<ServerUrl, DnsError> {
    let (scheme, rest) = match url.split_once("://") {
        Some((scheme, rest)) => (scheme.to_ascii_lowercase(), rest),
        None => ("udp".to_string(), url.strip_prefix("//").unwrap_or(url)),
    };

    let (transport, default_port) = match scheme.as_str() {
        "udp" | "dns" => (Transport::Udp, 53),
        "tcp" => (Transport::Tcp, 53),
        "tls" | "dot" => (Transport::Tls, 853),
        "https" | "doh" => (Transport::Https, 443),
        "http" => (Transport::Http, 80),
        _ => {
            return Err(DnsError::InvalidServer(format!(
                "unsupported protocol: {scheme}"
            )));
        }
    };

    let (authority, path) = match transport {
        Transport::Https | Transport::Http => {
            // https://dns.google/dns-query
            match rest.split_once('/') {
                Some((authority, path)) if !path.is_empty() => (authority, Some(format!("/{path}"))),
                Some((authority, _)) => (authority, Some("/dns-query".to_string())),
                None => (rest, Some("/dns-query".to_string())),
            }
        }
        _ => {
            let rest = rest.trim_end_matches('/');
            if rest.contains('/') {
                return Err(DnsError::InvalidServer(format!(
                    "unexpected path for {scheme} server: {url}"
                )));
            }
            (rest, None)
        }
    };

    let (host, port) = parse_host_port(authority, default_port)?;
    Ok(ServerUrl {
        transport,
        host: host.to_string(),
        port,
        path,
    })
}

/// Parse "host:port", "[ipv6]:port", "host", or "[ipv6]" with a default port.
fn parse_host_port(s: &str, default_port: u16) -> Result<(&str, u16), DnsError> {
    // Bracketed IPv6: [::1]:853 or [::1]
    if let Some(rest) = s.strip_prefix('[') {
        let (host, tail) = rest
            .split_once(']')
            .ok_or_else(|| DnsError::InvalidServer(format!("invalid IPv6 host in: {s}")))?;
        if host.is_empty() {
            return Err(DnsError::InvalidServer(format!("empty host in: {s}")));
        }
        if tail.is_empty() {
            return Ok((host, default_port));
        }
        let port_str = tail.strip_prefix(':').ok_or_else(|| {
            DnsError::InvalidServer(format!("invalid port separator in bracketed host: {s}"))
        })?;
        let port = port_str
            .parse::<u16>()
            .map_err(|_| DnsError::InvalidServer(format!("invalid port in: {s}")))?;
        return Ok((host, port));
    }

    // Raw IPv6 literal without a port.
    if s.parse::<std::net::Ipv6Addr>().is_ok() {
        return Ok((s, default_port));
    }

    if let Some((host, port_str)) = s.rsplit_once(':') {
        if host.is_empty() {
            return Err(DnsError::InvalidServer(format!("empty host in: {s}")));
        }
        let port = port_str
            .parse::<u16>()
            .map_err(|_| DnsError::InvalidServer(format!("invalid port in: {s}")))?;
        return Ok((host, port));
    }

    if s.is_empty() {
        return Err(DnsError::InvalidServer("empty host".to_string()));
    }

    Ok((s, default_port))
}
