//! Dialer that resolves host names before handing off.

use std::net::SocketAddr;
use std::sync::Arc;

use async_trait::async_trait;
use hopline_dns::LookupIp;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::addr::split_host_port;
use crate::dialer::{Connection, Dialer};
use crate::error::DialError;
use crate::network::Network;

/// Resolves the destination host and dials each address in turn.
///
/// Addresses are tried in the order the resolver returned them. The first
/// successful dial wins; otherwise the last dial error is returned, or
/// [`DialError::NoAddresses`] if the resolver answered with nothing.
#[derive(Clone)]
pub struct ResolvingDialer<D> {
    resolver: Arc<dyn LookupIp>,
    next: D,
}

impl<D> std::fmt::Debug for ResolvingDialer<D> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResolvingDialer").finish_non_exhaustive()
    }
}

impl<D: Dialer> ResolvingDialer<D> {
    pub fn new(resolver: Arc<dyn LookupIp>, next: D) -> Self {
        Self { resolver, next }
    }
}

#[async_trait]
impl<D: Dialer> Dialer for ResolvingDialer<D> {
    async fn dial(
        &self,
        network: Network,
        address: &str,
        cancel: &CancellationToken,
    ) -> Result<Connection, DialError> {
        let family = network
            .family()
            .ok_or_else(|| DialError::UnsupportedNetwork(network.to_string()))?;
        let (host, port) = split_host_port(address)?;

        let addrs = self.resolver.lookup_ip(family, host, cancel).await?;
        debug!(host = %host, family = %family, count = addrs.len(), "resolved dial target");

        let mut last_err = None;
        for ip in addrs {
            let target = SocketAddr::new(ip, port).to_string();
            match self.next.dial(network, &target, cancel).await {
                Ok(conn) => return Ok(conn),
                Err(DialError::Cancelled) => return Err(DialError::Cancelled),
                Err(e) => {
                    debug!(target = %target, error = %e, "dial attempt failed");
                    last_err = Some(e);
                }
            }
        }

        Err(last_err.unwrap_or_else(|| DialError::NoAddresses(host.to_string())))
    }
}
