//! Candidate proxy endpoints.

use std::sync::Arc;

use hopline_dial::Dialer;

use crate::credentials::CredentialSupplier;
use crate::dialer::{TunnelDialer, TunnelDialerBuilder};
use crate::error::TunnelSetupError;
use crate::roots::TrustRoots;

/// One discovered proxy hop, as handed over by endpoint discovery.
///
/// Immutable once built; turn it into a dialer with
/// [`into_dialer`](Self::into_dialer).
#[derive(Clone)]
pub struct Endpoint {
    /// `host:port` of the hop.
    pub address: String,
    /// Identity the hop's certificate must match. `None` means plain CONNECT.
    pub tls_name: Option<String>,
    /// SNI sent in place of the real identity. `None` or empty sends no SNI.
    pub fake_sni: Option<String>,
    pub credentials: Option<Arc<dyn CredentialSupplier>>,
    /// Repair chains missing the bundled cross-sign intermediate.
    pub chain_workaround: bool,
    /// Trust anchors; the bundled Mozilla set when `None`.
    pub roots: Option<TrustRoots>,
}

impl std::fmt::Debug for Endpoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Endpoint")
            .field("address", &self.address)
            .field("tls_name", &self.tls_name)
            .field("fake_sni", &self.fake_sni)
            .field("credentials", &self.credentials.is_some())
            .field("chain_workaround", &self.chain_workaround)
            .finish_non_exhaustive()
    }
}

impl Endpoint {
    pub fn new(address: impl Into<String>) -> Self {
        Self {
            address: address.into(),
            tls_name: None,
            fake_sni: None,
            credentials: None,
            chain_workaround: true,
            roots: None,
        }
    }

    pub fn builder(&self) -> TunnelDialerBuilder {
        let mut builder = TunnelDialerBuilder::new(self.address.clone())
            .chain_workaround(self.chain_workaround);
        if let Some(name) = &self.tls_name {
            builder = builder.tls_name(name.clone());
        }
        if let Some(sni) = &self.fake_sni {
            builder = builder.fake_sni(sni.clone());
        }
        if let Some(credentials) = &self.credentials {
            builder = builder.credentials(Arc::clone(credentials));
        }
        if let Some(roots) = &self.roots {
            builder = builder.roots(roots.clone());
        }
        builder
    }

    /// Tunnel dialer reaching this endpoint through `next`.
    pub fn into_dialer<D: Dialer>(self, next: D) -> Result<TunnelDialer<D>, TunnelSetupError> {
        self.builder().build(next)
    }
}
