//! Selection and probe errors.

use std::fmt;

use hopline_dial::DialError;

/// Why a single benchmark probe failed.
#[derive(Debug, thiserror::Error)]
pub enum ProbeError {
    #[error("invalid benchmark url: {0}")]
    InvalidUrl(String),

    #[error("dial failed: {0}")]
    Dial(#[from] DialError),

    #[error("TLS handshake failed: {0}")]
    Tls(std::io::Error),

    #[error("TLS configuration error: {0}")]
    TlsConfig(#[from] rustls::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] hyper::Error),

    #[error("benchmark request failed: {0}")]
    Request(#[from] http::Error),

    #[error("unexpected status {0}")]
    Status(http::StatusCode),

    #[error("probe timed out")]
    Timeout,

    #[error("probe cancelled")]
    Cancelled,
}

/// Errors returned by [`ServerSelector`](crate::ServerSelector).
#[derive(Debug, thiserror::Error)]
pub enum SelectionError {
    #[error("no candidates to select from")]
    Empty,

    #[error("fastest selection needs a benchmark probe")]
    MissingProbe,

    #[error("unknown selection policy: {0}")]
    UnknownPolicy(String),

    #[error("all {} probes failed: {}", .0.len(), DisplayList(.0))]
    AllFailed(Vec<ProbeError>),

    #[error("selection timed out")]
    Timeout,

    #[error("selection cancelled")]
    Cancelled,
}

impl SelectionError {
    /// Per-candidate probe failures, empty unless every probe failed.
    pub fn errors(&self) -> &[ProbeError] {
        match self {
            Self::AllFailed(errors) => errors,
            _ => &[],
        }
    }
}

struct DisplayList<'a>(&'a [ProbeError]);

impl fmt::Display for DisplayList<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, err) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str("; ")?;
            }
            write!(f, "#{}: {err}", i + 1)?;
        }
        Ok(())
    }
}
