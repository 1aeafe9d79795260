//! Dialer that pins the destination host.

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;
use tracing::trace;

use crate::addr::{join_host_port, split_host_port};
use crate::dialer::{Connection, Dialer};
use crate::error::DialError;
use crate::network::Network;

/// Replaces the host of every dial with a fixed one, keeping the port.
#[derive(Debug, Clone)]
pub struct FixedAddressDialer<D> {
    host: String,
    next: D,
}

impl<D: Dialer> FixedAddressDialer<D> {
    pub fn new(host: impl Into<String>, next: D) -> Self {
        Self {
            host: host.into(),
            next,
        }
    }

    pub fn host(&self) -> &str {
        &self.host
    }
}

#[async_trait]
impl<D: Dialer> Dialer for FixedAddressDialer<D> {
    async fn dial(
        &self,
        network: Network,
        address: &str,
        cancel: &CancellationToken,
    ) -> Result<Connection, DialError> {
        let (_, port) = split_host_port(address)?;
        let fixed = join_host_port(&self.host, port);
        trace!(requested = %address, fixed = %fixed, "rewriting destination host");
        self.next.dial(network, &fixed, cancel).await
    }
}
