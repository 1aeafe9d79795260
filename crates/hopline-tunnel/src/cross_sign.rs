//! Bundled cross-signing intermediate for the legacy chain workaround.
//!
//! Some proxy hops present chains issued under "USERTrust ECC Certification
//! Authority" without the certificate that cross-signs it from "AAA
//! Certificate Services". Trust stores that only carry the older root cannot
//! build a path without it. When a presented intermediate was issued by the
//! key below, the verifier appends this certificate to the chain.

use std::io::Cursor;
use std::sync::LazyLock;

use rustls::pki_types::CertificateDer;
use tracing::warn;
use x509_parser::extensions::ParsedExtension;

use crate::error::TunnelSetupError;

/// USERTrust ECC Certification Authority, cross-signed by AAA Certificate Services.
pub const LEGACY_CROSS_SIGN_PEM: &str = "-----BEGIN CERTIFICATE-----
MIID0zCCArugAwIBAgIQVmcdBOpPmUxvEIFHWdJ1lDANBgkqhkiG9w0BAQwFADB7
MQswCQYDVQQGEwJHQjEbMBkGA1UECAwSR3JlYXRlciBNYW5jaGVzdGVyMRAwDgYD
VQQHDAdTYWxmb3JkMRowGAYDVQQKDBFDb21vZG8gQ0EgTGltaXRlZDEhMB8GA1UE
AwwYQUFBIENlcnRpZmljYXRlIFNlcnZpY2VzMB4XDTE5MDMxMjAwMDAwMFoXDTI4
MTIzMTIzNTk1OVowgYgxCzAJBgNVBAYTAlVTMRMwEQYDVQQIEwpOZXcgSmVyc2V5
MRQwEgYDVQQHEwtKZXJzZXkgQ2l0eTEeMBwGA1UEChMVVGhlIFVTRVJUUlVTVCBO
ZXR3b3JrMS4wLAYDVQQDEyVVU0VSVHJ1c3QgRUNDIENlcnRpZmljYXRpb24gQXV0
aG9yaXR5MHYwEAYHKoZIzj0CAQYFK4EEACIDYgAEGqxUWqn5aCPnetUkb1PGWthL
q8bVttHmc3Gu3ZzWDGH926CJA7gFFOxXzu5dP+Ihs8731Ip54KODfi2X0GHE8Znc
JZFjq38wo7Rw4sehM5zzvy5cU7Ffs30yf4o043l5o4HyMIHvMB8GA1UdIwQYMBaA
FKARCiM+lvEH7OKvKe+CpX/QMKS0MB0GA1UdDgQWBBQ64QmG1M8ZwpZ2dEl23OA1
xmNjmjAOBgNVHQ8BAf8EBAMCAYYwDwYDVR0TAQH/BAUwAwEB/zARBgNVHSAECjAI
MAYGBFUdIAAwQwYDVR0fBDwwOjA4oDagNIYyaHR0cDovL2NybC5jb21vZG9jYS5j
b20vQUFBQ2VydGlmaWNhdGVTZXJ2aWNlcy5jcmwwNAYIKwYBBQUHAQEEKDAmMCQG
CCsGAQUFBzABhhhodHRwOi8vb2NzcC5jb21vZG9jYS5jb20wDQYJKoZIhvcNAQEM
BQADggEBABns652JLCALBIAdGN5CmXKZFjK9Dpx1WywV4ilAbe7/ctvbq5AfjJXy
ij0IckKJUAfiORVsAYfZFhr1wHUrxeZWEQff2Ji8fJ8ZOd+LygBkc7xGEJuTI42+
FsMuCIKchjN0djsoTI0DQoWz4rIjQtUfenVqGtF8qmchxDM6OW1TyaLtYiKou+JV
bJlsQ2uRl9EMC5MCHdK8aXdJ5htN978UeAOwproLtOGFfy/cQjutdAFI3tZs4RmY
CV4Ks2dH/hzg1cEo70qLRDEmBDeNiXQ2Lu+lIg+DdEmSx/cQwgwp+7e9un/jX9Wf
8qn0dNW44bOwgeThpWOjzOoEeJBuv/c=
-----END CERTIFICATE-----
";

static BUNDLED: LazyLock<Option<FallbackIntermediate>> = LazyLock::new(|| {
    match FallbackIntermediate::from_pem(LEGACY_CROSS_SIGN_PEM.as_bytes()) {
        Ok(fallback) => Some(fallback),
        Err(e) => {
            warn!(error = %e, "bundled cross-sign certificate unusable, chain workaround disabled");
            None
        }
    }
});

/// An intermediate certificate added to a peer chain when a presented
/// intermediate names it as issuer.
#[derive(Debug, Clone)]
pub struct FallbackIntermediate {
    der: CertificateDer<'static>,
    subject_key_id: Vec<u8>,
}

impl FallbackIntermediate {
    /// The bundled cross-sign certificate, parsed on first use.
    pub fn bundled() -> Option<&'static FallbackIntermediate> {
        BUNDLED.as_ref()
    }

    /// Use a DER certificate as the fallback.
    ///
    /// The certificate must carry a subject key identifier.
    pub fn from_der(der: CertificateDer<'static>) -> Result<Self, TunnelSetupError> {
        let subject_key_id = subject_key_id(&der).ok_or_else(|| {
            TunnelSetupError::Certificate("fallback certificate has no subject key identifier".into())
        })?;
        Ok(Self {
            der,
            subject_key_id,
        })
    }

    /// Use the first certificate of a PEM bundle as the fallback.
    pub fn from_pem(pem: &[u8]) -> Result<Self, TunnelSetupError> {
        let der = rustls_pemfile::certs(&mut Cursor::new(pem))
            .next()
            .ok_or_else(|| TunnelSetupError::Certificate("no certificate in PEM data".into()))??;
        Self::from_der(der)
    }

    pub fn der(&self) -> &CertificateDer<'static> {
        &self.der
    }

    pub fn subject_key_id(&self) -> &[u8] {
        &self.subject_key_id
    }

    /// Whether `intermediate` was issued by this certificate's key.
    pub fn completes(&self, intermediate: &CertificateDer<'_>) -> bool {
        authority_key_id(intermediate).is_some_and(|aki| aki == self.subject_key_id)
    }
}

fn subject_key_id(der: &[u8]) -> Option<Vec<u8>> {
    let (_, cert) = x509_parser::parse_x509_certificate(der).ok()?;
    cert.extensions()
        .iter()
        .find_map(|ext| match ext.parsed_extension() {
            ParsedExtension::SubjectKeyIdentifier(id) => Some(id.0.to_vec()),
            _ => None,
        })
}

fn authority_key_id(der: &[u8]) -> Option<Vec<u8>> {
    let (_, cert) = x509_parser::parse_x509_certificate(der).ok()?;
    cert.extensions()
        .iter()
        .find_map(|ext| match ext.parsed_extension() {
            ParsedExtension::AuthorityKeyIdentifier(aki) => {
                aki.key_identifier.as_ref().map(|id| id.0.to_vec())
            }
            _ => None,
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bundled_certificate_parses() {
        let bundled = FallbackIntermediate::bundled().expect("bundled cert");
        assert_eq!(
            bundled.subject_key_id(),
            &[
                0x3a, 0xe1, 0x09, 0x86, 0xd4, 0xcf, 0x19, 0xc2, 0x96, 0x76, 0x74, 0x49, 0x76,
                0xdc, 0xe0, 0x35, 0xc6, 0x63, 0x63, 0x9a
            ]
        );
    }

    #[test]
    fn bundled_does_not_complete_itself() {
        let bundled = FallbackIntermediate::bundled().expect("bundled cert");
        // Issued by AAA Certificate Services, not by its own key.
        assert!(!bundled.completes(bundled.der()));
    }

    #[test]
    fn rejects_garbage() {
        FallbackIntermediate::from_pem(b"not a certificate").unwrap_err();
        FallbackIntermediate::from_der(CertificateDer::from(vec![0x30, 0x00])).unwrap_err();
    }
}
