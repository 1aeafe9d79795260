//! Post-handshake chain verification against a configured identity.
//!
//! The name sent in the ClientHello (empty or fake) is never the name a
//! tunnel endpoint is checked against. [`ChainVerifier`] ignores the server
//! name rustls hands it and verifies the peer chain against the expected
//! identity instead, optionally repairing the chain with a
//! [`FallbackIntermediate`].

use std::sync::{Arc, OnceLock};

use rustls::client::WebPkiServerVerifier;
use rustls::client::danger::{HandshakeSignatureValid, ServerCertVerified, ServerCertVerifier};
use rustls::crypto::{CryptoProvider, WebPkiSupportedAlgorithms};
use rustls::pki_types::{CertificateDer, ServerName, UnixTime};
use rustls::{DigitallySignedStruct, SignatureScheme};
use tracing::debug;

use crate::cross_sign::FallbackIntermediate;
use crate::error::TunnelSetupError;
use crate::roots::TrustRoots;

/// Process-wide aws-lc-rs provider used for every hop and probe TLS session.
pub fn crypto_provider() -> Arc<CryptoProvider> {
    static INSTANCE: OnceLock<Arc<CryptoProvider>> = OnceLock::new();
    INSTANCE
        .get_or_init(|| Arc::new(rustls::crypto::aws_lc_rs::default_provider()))
        .clone()
}

/// Verifies peer chains against a fixed expected identity.
#[derive(Debug)]
pub struct ChainVerifier {
    expected: ServerName<'static>,
    webpki: Arc<WebPkiServerVerifier>,
    fallback: Option<FallbackIntermediate>,
    supported_algs: WebPkiSupportedAlgorithms,
}

impl ChainVerifier {
    pub fn new(
        expected: &str,
        roots: &TrustRoots,
        fallback: Option<FallbackIntermediate>,
    ) -> Result<Self, TunnelSetupError> {
        let expected = ServerName::try_from(expected.to_string())
            .map_err(|e| TunnelSetupError::Config(format!("invalid TLS name '{expected}': {e}")))?;
        let provider = crypto_provider();
        let webpki = WebPkiServerVerifier::builder_with_provider(roots.store(), provider.clone())
            .build()
            .map_err(|e| TunnelSetupError::Certificate(e.to_string()))?;

        Ok(Self {
            expected,
            webpki,
            fallback,
            supported_algs: provider.signature_verification_algorithms,
        })
    }

    pub fn expected(&self) -> &ServerName<'static> {
        &self.expected
    }

    /// Presented intermediates, plus the fallback when one of them needs it.
    fn intermediates<'a>(&self, presented: &[CertificateDer<'a>]) -> Vec<CertificateDer<'a>> {
        let mut chain = presented.to_vec();
        if let Some(fallback) = &self.fallback
            && presented.iter().any(|cert| fallback.completes(cert))
        {
            debug!(expected = ?self.expected, "adding cross-sign intermediate to peer chain");
            chain.push(fallback.der().clone());
        }
        chain
    }
}

impl ServerCertVerifier for ChainVerifier {
    fn verify_server_cert(
        &self,
        end_entity: &CertificateDer<'_>,
        intermediates: &[CertificateDer<'_>],
        _server_name: &ServerName<'_>,
        ocsp_response: &[u8],
        now: UnixTime,
    ) -> Result<ServerCertVerified, rustls::Error> {
        let chain = self.intermediates(intermediates);
        self.webpki
            .verify_server_cert(end_entity, &chain, &self.expected, ocsp_response, now)
    }

    fn verify_tls12_signature(
        &self,
        message: &[u8],
        cert: &CertificateDer<'_>,
        dss: &DigitallySignedStruct,
    ) -> Result<HandshakeSignatureValid, rustls::Error> {
        rustls::crypto::verify_tls12_signature(message, cert, dss, &self.supported_algs)
    }

    fn verify_tls13_signature(
        &self,
        message: &[u8],
        cert: &CertificateDer<'_>,
        dss: &DigitallySignedStruct,
    ) -> Result<HandshakeSignatureValid, rustls::Error> {
        rustls::crypto::verify_tls13_signature(message, cert, dss, &self.supported_algs)
    }

    fn supported_verify_schemes(&self) -> Vec<SignatureScheme> {
        self.supported_algs.supported_schemes()
    }
}
