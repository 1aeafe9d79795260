//! Error types for tunnel construction.
//!
//! Failures while dialing are reported as [`hopline_dial::DialError`]; the
//! errors here come from turning configuration into a [`TunnelDialer`].
//!
//! [`TunnelDialer`]: crate::TunnelDialer

use thiserror::Error;

/// Errors that can occur while building a tunnel dialer.
#[derive(Error, Debug)]
pub enum TunnelSetupError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TLS error: {0}")]
    Tls(#[from] rustls::Error),

    #[error("invalid proxy url: {0}")]
    Url(#[from] url::ParseError),

    #[error("unsupported proxy scheme: {0}")]
    UnsupportedScheme(String),

    #[error("invalid certificate: {0}")]
    Certificate(String),

    #[error("config error: {0}")]
    Config(String),
}
