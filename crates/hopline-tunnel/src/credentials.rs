//! `Proxy-Authorization` values for CONNECT requests.

use std::sync::Arc;

use arc_swap::ArcSwapOption;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use hopline_dial::TunnelError;

/// Produces the `Proxy-Authorization` header value for a CONNECT request.
///
/// Called once per dial, so implementations may hand out credentials that
/// change over time.
pub trait CredentialSupplier: Send + Sync {
    fn proxy_authorization(&self) -> Result<String, TunnelError>;
}

impl<T: CredentialSupplier + ?Sized> CredentialSupplier for Arc<T> {
    fn proxy_authorization(&self) -> Result<String, TunnelError> {
        (**self).proxy_authorization()
    }
}

/// `Basic base64(login:password)`.
pub fn basic_auth_header(login: &str, password: &str) -> String {
    format!("Basic {}", STANDARD.encode(format!("{login}:{password}")))
}

/// A fixed header value.
#[derive(Debug, Clone)]
pub struct StaticCredentials(String);

impl StaticCredentials {
    pub fn new(header: impl Into<String>) -> Self {
        Self(header.into())
    }

    pub fn basic(login: &str, password: &str) -> Self {
        Self(basic_auth_header(login, password))
    }
}

impl CredentialSupplier for StaticCredentials {
    fn proxy_authorization(&self) -> Result<String, TunnelError> {
        Ok(self.0.clone())
    }
}

/// Login/password pair that can be replaced while dials are in flight.
///
/// An external refresh job calls [`update`](Self::update); every dial reads
/// whatever pair is current at that moment. Dialing before the first update
/// fails with [`TunnelError::Credentials`].
#[derive(Debug, Default)]
pub struct SharedCredentials {
    header: ArcSwapOption<String>,
}

impl SharedCredentials {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_login(login: &str, password: &str) -> Self {
        let creds = Self::new();
        creds.update(login, password);
        creds
    }

    pub fn update(&self, login: &str, password: &str) {
        self.header
            .store(Some(Arc::new(basic_auth_header(login, password))));
    }

    pub fn clear(&self) {
        self.header.store(None);
    }
}

impl CredentialSupplier for SharedCredentials {
    fn proxy_authorization(&self) -> Result<String, TunnelError> {
        self.header
            .load_full()
            .map(|header| header.as_ref().clone())
            .ok_or_else(|| TunnelError::Credentials("no credentials loaded yet".into()))
    }
}
