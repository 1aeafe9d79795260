//! Trusted root certificate pools.

use std::io::Cursor;
use std::path::Path;
use std::sync::{Arc, OnceLock};

use rustls::RootCertStore;
use rustls::pki_types::CertificateDer;

use crate::error::TunnelSetupError;

/// Read-only pool of trust anchors, shared by every verification.
#[derive(Debug, Clone)]
pub struct TrustRoots(Arc<RootCertStore>);

impl TrustRoots {
    /// The bundled Mozilla root set.
    pub fn system() -> Self {
        static INSTANCE: OnceLock<Arc<RootCertStore>> = OnceLock::new();
        let store = INSTANCE.get_or_init(|| {
            Arc::new(RootCertStore {
                roots: webpki_roots::TLS_SERVER_ROOTS.to_vec(),
            })
        });
        Self(Arc::clone(store))
    }

    /// Roots from DER certificates.
    pub fn from_der_certs<I>(certs: I) -> Result<Self, TunnelSetupError>
    where
        I: IntoIterator<Item = CertificateDer<'static>>,
    {
        let mut store = RootCertStore::empty();
        for cert in certs {
            store.add(cert)?;
        }
        if store.is_empty() {
            return Err(TunnelSetupError::Certificate("no root certificates".into()));
        }
        Ok(Self(Arc::new(store)))
    }

    /// Roots from a PEM bundle.
    pub fn from_pem(pem: &[u8]) -> Result<Self, TunnelSetupError> {
        let certs = rustls_pemfile::certs(&mut Cursor::new(pem))
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| TunnelSetupError::Certificate(format!("failed to parse CA bundle: {e}")))?;
        Self::from_der_certs(certs)
    }

    /// Roots from a PEM bundle on disk.
    pub fn from_pem_file(path: impl AsRef<Path>) -> Result<Self, TunnelSetupError> {
        let path = path.as_ref();
        let data = std::fs::read(path).map_err(|e| {
            TunnelSetupError::Config(format!("failed to read CA file {}: {e}", path.display()))
        })?;
        Self::from_pem(&data)
    }

    pub fn store(&self) -> Arc<RootCertStore> {
        Arc::clone(&self.0)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl Default for TrustRoots {
    fn default() -> Self {
        Self::system()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn ca_pem() -> String {
        let key = rcgen::KeyPair::generate().unwrap();
        let mut params = rcgen::CertificateParams::new(Vec::<String>::new()).unwrap();
        params.is_ca = rcgen::IsCa::Ca(rcgen::BasicConstraints::Unconstrained);
        params.self_signed(&key).unwrap().pem()
    }

    #[test]
    fn system_roots_not_empty() {
        assert!(!TrustRoots::system().is_empty());
    }

    #[test]
    fn loads_pem_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "{}{}", ca_pem(), ca_pem()).unwrap();

        let roots = TrustRoots::from_pem_file(file.path()).unwrap();
        assert_eq!(roots.len(), 2);
    }

    #[test]
    fn empty_bundle_rejected() {
        TrustRoots::from_pem(b"").unwrap_err();
        TrustRoots::from_pem_file("/nonexistent/ca.pem").unwrap_err();
    }
}
