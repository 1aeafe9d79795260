//! Dialer chains assembled from configuration.
//!
//! Every endpoint gets its own tunnel dialer on top of a shared hop dialer:
//!
//! ```text
//! TunnelDialer(endpoint) -> [FixedAddressDialer(fixed_ip)]
//!     -> ResolvingDialer(racing resolver) -> [TunnelDialer(base proxy)] -> TcpDialer
//! ```

use std::sync::Arc;
use std::time::Duration;

use hopline_config::{Config, DialerConfig, EndpointConfig, SelectionConfig};
use hopline_dial::{Dialer, FixedAddressDialer, ResolvingDialer, TcpDialer};
use hopline_dns::{DnsError, LookupIp, RacingResolver};
use hopline_select::{HttpProbe, ProbeError, SelectionPolicy, ServerSelector};
use hopline_tunnel::{Endpoint, StaticCredentials, TrustRoots, TunnelDialer, TunnelSetupError};
use tracing::{debug, info};

#[derive(Debug, thiserror::Error)]
pub enum ChainError {
    #[error("resolver setup failed: {0}")]
    Dns(#[from] DnsError),

    #[error("base proxy: {0}")]
    BaseProxy(TunnelSetupError),

    #[error("endpoint #{index} ({address}): {source}")]
    Endpoint {
        index: usize,
        address: String,
        #[source]
        source: TunnelSetupError,
    },

    #[error("benchmark probe: {0}")]
    Probe(#[from] ProbeError),
}

/// One ready-to-use dialer per configured endpoint.
pub struct DialerChain {
    resolver: Arc<dyn LookupIp>,
    addresses: Vec<String>,
    dialers: Vec<Arc<dyn Dialer>>,
}

impl DialerChain {
    pub fn from_config(config: &Config) -> Result<Self, ChainError> {
        let resolver = RacingResolver::from_config(&config.dns)?;
        let hop = hop_dialer(&config.dialer, Arc::clone(&resolver))?;
        let handshake_timeout = Duration::from_secs(config.dialer.handshake_timeout_secs);

        let mut addresses = Vec::with_capacity(config.endpoints.len());
        let mut dialers = Vec::with_capacity(config.endpoints.len());
        for (index, endpoint) in config.endpoints.iter().enumerate() {
            let dialer = endpoint_dialer(endpoint, &hop, handshake_timeout).map_err(|source| {
                ChainError::Endpoint {
                    index,
                    address: endpoint.address.clone(),
                    source,
                }
            })?;
            debug!(index, address = %endpoint.address, "endpoint dialer ready");
            addresses.push(endpoint.address.clone());
            dialers.push(dialer);
        }

        Ok(Self {
            resolver,
            addresses,
            dialers,
        })
    }

    pub fn resolver(&self) -> &Arc<dyn LookupIp> {
        &self.resolver
    }

    /// Candidate dialers, in configuration order.
    pub fn dialers(&self) -> &[Arc<dyn Dialer>] {
        &self.dialers
    }

    /// Address of the endpoint behind `dialers()[index]`.
    pub fn address(&self, index: usize) -> Option<&str> {
        self.addresses.get(index).map(String::as_str)
    }
}

/// Selector for the configured policy; `fastest` gets an HTTP probe.
pub fn build_selector(config: &SelectionConfig) -> Result<ServerSelector, ChainError> {
    let mut selector =
        ServerSelector::new(config.policy).with_timeout(Duration::from_secs(config.timeout_secs));
    if config.policy == SelectionPolicy::Fastest {
        let probe =
            HttpProbe::new(&config.benchmark_url)?.with_download_limit(config.download_limit);
        selector = selector.with_probe(probe);
    }
    Ok(selector)
}

fn hop_dialer(
    config: &DialerConfig,
    resolver: Arc<dyn LookupIp>,
) -> Result<Arc<dyn Dialer>, ChainError> {
    let keepalive =
        (config.keepalive_secs > 0).then(|| Duration::from_secs(config.keepalive_secs));
    let tcp = TcpDialer::new()
        .with_connect_timeout(Duration::from_secs(config.connect_timeout_secs))
        .with_no_delay(config.no_delay)
        .with_keepalive(keepalive);

    let base: Arc<dyn Dialer> = match &config.base_proxy {
        Some(url) => {
            let proxy = TunnelDialer::from_url(url, tcp).map_err(ChainError::BaseProxy)?;
            info!(proxy = proxy.address(), "chaining through base proxy");
            Arc::new(proxy)
        }
        None => Arc::new(tcp),
    };
    Ok(Arc::new(ResolvingDialer::new(resolver, base)))
}

fn endpoint_dialer(
    config: &EndpointConfig,
    hop: &Arc<dyn Dialer>,
    handshake_timeout: Duration,
) -> Result<Arc<dyn Dialer>, TunnelSetupError> {
    let mut endpoint = Endpoint::new(config.address.clone());
    endpoint.tls_name = config.tls_name.clone();
    endpoint.fake_sni = config.fake_sni.clone();
    endpoint.chain_workaround = config.cert_chain_workaround;
    if let (Some(login), Some(password)) = (&config.login, &config.password) {
        endpoint.credentials = Some(Arc::new(StaticCredentials::basic(login, password)));
    }
    if let Some(path) = &config.ca_file {
        endpoint.roots = Some(TrustRoots::from_pem_file(path)?);
    }

    let next: Arc<dyn Dialer> = match &config.fixed_ip {
        Some(ip) => Arc::new(FixedAddressDialer::new(ip.clone(), Arc::clone(hop))),
        None => Arc::clone(hop),
    };
    let dialer = endpoint
        .builder()
        .handshake_timeout(handshake_timeout)
        .build(next)?;
    Ok(Arc::new(dialer))
}
